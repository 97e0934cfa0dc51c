/*!
SSDP client used by the control point.

The client must **not** bind to UDP port 1900: it only sends M-SEARCH and
receives the unicast HTTP/200 replies, so it binds an ephemeral port
(`0.0.0.0:0`). Binding 1900 next to a local SSDP device would let the kernel
load-balance datagrams between both sockets and lose replies at random.
*/

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tracing::{debug, info, warn};

use super::{SSDP_MULTICAST_ADDR, SSDP_PORT};

/// Shortest receive timeout handed to the socket (zero would mean "block forever").
const MIN_RECV_TIMEOUT: Duration = Duration::from_millis(1);

/// One datagram received on the search socket.
#[derive(Debug, Clone)]
pub struct SsdpDatagram {
    pub from: SocketAddr,
    pub payload: String,
}

/// SSDP client sending M-SEARCH requests and collecting replies
pub struct SsdpClient {
    socket: UdpSocket,
    target: SocketAddr,
}

impl SsdpClient {
    /// Creates a client targeting the standard group 239.255.255.250:1900.
    pub fn new() -> io::Result<Self> {
        let group: Ipv4Addr = SSDP_MULTICAST_ADDR
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        Self::with_group(group, SSDP_PORT)
    }

    /// Creates a client for an arbitrary multicast group and port.
    pub fn with_group(group: Ipv4Addr, port: u16) -> io::Result<Self> {
        let socket2 = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket2.set_reuse_address(true)?;

        let bind_addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
        socket2.bind(&bind_addr.into())?;

        let socket: UdpSocket = socket2.into();
        socket.set_multicast_loop_v4(true)?;

        // Joining is optional for a control point (replies are unicast), it only
        // lets us hear NOTIFY announcements as well.
        if group.is_multicast() {
            match get_if_addrs::get_if_addrs() {
                Ok(ifaces) => {
                    for iface in ifaces {
                        if let IpAddr::V4(ipv4) = iface.ip() {
                            if ipv4.is_loopback() {
                                continue;
                            }
                            match socket.join_multicast_v4(&group, &ipv4) {
                                Ok(()) => debug!("SSDP: joined {} on {}", group, ipv4),
                                Err(e) => warn!("SSDP: failed to join {} on {}: {}", group, ipv4, e),
                            }
                        }
                    }
                }
                Err(e) => warn!("SSDP: cannot list network interfaces: {}", e),
            }
        }

        let target = SocketAddr::V4(SocketAddrV4::new(group, port));
        info!("SSDP client ready, searching on {}", target);

        Ok(Self { socket, target })
    }

    /// Local address of the search socket.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sends an M-SEARCH for the given search target.
    pub fn send_msearch(&self, st: &str, mx: u32, user_agent: &str) -> io::Result<()> {
        let msg = build_msearch(&self.target, st, mx, user_agent);

        match self.socket.send_to(msg.as_bytes(), self.target) {
            Ok(_) => {
                debug!("M-SEARCH sent (ST={}, MX={})", st, mx);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to send M-SEARCH: {}", e);
                Err(e)
            }
        }
    }

    /// Waits at most `timeout` for one datagram.
    ///
    /// Returns `Ok(None)` when the timeout elapses without data.
    pub fn recv(&self, timeout: Duration) -> io::Result<Option<SsdpDatagram>> {
        self.socket
            .set_read_timeout(Some(timeout.max(MIN_RECV_TIMEOUT)))?;

        let mut buf = [0u8; 8192];
        match self.socket.recv_from(&mut buf) {
            Ok((n, from)) => Ok(Some(SsdpDatagram {
                from,
                payload: String::from_utf8_lossy(&buf[..n]).into_owned(),
            })),
            Err(e)
                if e.kind() == io::ErrorKind::WouldBlock || e.kind() == io::ErrorKind::TimedOut =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// Builds the M-SEARCH request text.
pub fn build_msearch(target: &SocketAddr, st: &str, mx: u32, user_agent: &str) -> String {
    // MX must be >= 1
    let mx = mx.max(1);
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
         HOST: {}\r\n\
         MAN: \"ssdp:discover\"\r\n\
         MX: {}\r\n\
         ST: {}\r\n\
         USER-AGENT: {}\r\n\
         \r\n",
        target, mx, st, user_agent
    )
}
