//! Periodic SSDP discovery.
//!
//! The engine runs one background worker. Each cycle goes through four phases:
//!
//! - `Searching`: one M-SEARCH per configured search target,
//! - `Collecting`: replies are read until the collection window closes; every
//!   new device id gets its description fetched on a separate thread,
//! - `Publishing`: the registry is replaced by the devices resolved during the
//!   window, so a device silent for a whole cycle disappears,
//! - `Sleeping`: wait for the start of the next cycle.
//!
//! Descriptions of the current cycle that resolve after publication are
//! upserted into the registry; those of older cycles are dropped. `stop()`
//! interrupts the worker within one receive poll and, once it returns, no
//! resolution reaches the registry anymore.

use std::collections::{HashMap, HashSet};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded};
use mdupnp::ssdp::{
    SSDP_ALL, SSDP_PORT, SsdpClient, SsdpDatagram, SsdpMessage, extract_uuid, parse_message,
};
use tracing::{debug, info, trace, warn};

use crate::description::parse_description;
use crate::errors::ControlPointError;
use crate::events::{DiscoveryEvent, DiscoveryEventBus};
use crate::model::Device;
use crate::registry::DeviceRegistry;
use crate::transport::HttpTransport;

/// Socket side of discovery: send searches, receive replies.
pub trait SsdpSearcher: Send {
    fn send_search(&mut self, search_target: &str, mx: u32, user_agent: &str) -> io::Result<()>;

    /// Waits at most `timeout` for one datagram.
    fn receive(&mut self, timeout: Duration) -> io::Result<Option<SsdpDatagram>>;
}

impl SsdpSearcher for SsdpClient {
    fn send_search(&mut self, search_target: &str, mx: u32, user_agent: &str) -> io::Result<()> {
        self.send_msearch(search_target, mx, user_agent)
    }

    fn receive(&mut self, timeout: Duration) -> io::Result<Option<SsdpDatagram>> {
        self.recv(timeout)
    }
}

/// Builds a fresh searcher; called by the worker until one is obtained.
pub type SearcherFactory = Arc<dyn Fn() -> io::Result<Box<dyn SsdpSearcher>> + Send + Sync>;

/// A device that answered a search, before its description is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredEndpoint {
    pub id: String,
    pub location: String,
    pub address: SocketAddr,
    pub server_header: Option<String>,
    pub max_age: u32,
}

/// Turns a discovered endpoint into a full [`Device`].
pub trait DeviceDescriptionProvider: Send + Sync {
    fn describe(&self, endpoint: &DiscoveredEndpoint) -> Result<Device, ControlPointError>;
}

/// Fetches `description.xml` over HTTP and parses it.
pub struct HttpDescriptionProvider {
    transport: Arc<dyn HttpTransport>,
}

impl HttpDescriptionProvider {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DeviceDescriptionProvider for HttpDescriptionProvider {
    fn describe(&self, endpoint: &DiscoveredEndpoint) -> Result<Device, ControlPointError> {
        debug!(
            device = %endpoint.id,
            location = %endpoint.location,
            "Fetching device description"
        );
        let xml = self.transport.get_text(&endpoint.location)?;
        let description = parse_description(&xml, &endpoint.location)?;
        Ok(description.into_device(
            &endpoint.id,
            endpoint.address,
            &endpoint.location,
            endpoint.server_header.clone(),
            endpoint.max_age,
        ))
    }
}

/// Timing and addressing of the search cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    pub group: SocketAddrV4,
    pub search_targets: Vec<String>,
    pub mx: u32,
    pub window: Duration,
    pub interval: Duration,
    pub receive_poll: Duration,
    pub user_agent: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            group: SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), SSDP_PORT),
            search_targets: vec![SSDP_ALL.to_string()],
            mx: 2,
            window: Duration::from_secs(3),
            interval: Duration::from_secs(30),
            receive_poll: Duration::from_millis(200),
            user_agent: "mdcontrol/0.1 UPnP/1.1".to_string(),
        }
    }
}

impl DiscoveryConfig {
    pub fn from_settings(settings: &mdconfig::DiscoverySettings) -> anyhow::Result<Self> {
        let search_targets = if settings.search_targets.is_empty() {
            vec![SSDP_ALL.to_string()]
        } else {
            settings.search_targets.clone()
        };
        Ok(Self {
            group: SocketAddrV4::new(settings.multicast_group()?, settings.port),
            search_targets,
            mx: settings.mx,
            window: settings.window(),
            interval: settings.interval(),
            receive_poll: settings.receive_poll(),
            user_agent: settings.user_agent.clone(),
        })
    }

    fn searcher_factory(&self) -> SearcherFactory {
        let group = *self.group.ip();
        let port = self.group.port();
        Arc::new(move || {
            SsdpClient::with_group(group, port).map(|c| Box::new(c) as Box<dyn SsdpSearcher>)
        })
    }
}

/// Externally visible state of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CyclePhase {
    Searching,
    Collecting,
    Publishing,
    Sleeping,
}

/// Periodic discovery driving a [`DeviceRegistry`].
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
    registry: DeviceRegistry,
    events: DiscoveryEventBus,
    searcher_factory: SearcherFactory,
    provider: Arc<dyn DeviceDescriptionProvider>,
    worker: Mutex<Option<Worker>>,
}

struct Worker {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
    sink: Arc<CycleSink>,
}

impl DiscoveryEngine {
    /// Engine using real SSDP sockets and HTTP description downloads.
    pub fn new(config: DiscoveryConfig, transport: Arc<dyn HttpTransport>) -> Self {
        let factory = config.searcher_factory();
        Self::with_parts(config, factory, Arc::new(HttpDescriptionProvider::new(transport)))
    }

    pub fn with_parts(
        config: DiscoveryConfig,
        searcher_factory: SearcherFactory,
        provider: Arc<dyn DeviceDescriptionProvider>,
    ) -> Self {
        Self {
            config,
            registry: DeviceRegistry::new(),
            events: DiscoveryEventBus::new(),
            searcher_factory,
            provider,
            worker: Mutex::new(None),
        }
    }

    /// Read handle on the device registry.
    pub fn registry(&self) -> DeviceRegistry {
        self.registry.clone()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.registry.snapshot()
    }

    pub fn subscribe(&self) -> Receiver<DiscoveryEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> EngineState {
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        match worker.as_ref() {
            Some(w) if !w.handle.is_finished() => EngineState::Running,
            _ => EngineState::Stopped,
        }
    }

    /// Starts the search cycles. A running engine is stopped and restarted.
    pub fn start(&self) -> Result<(), ControlPointError> {
        let mut slot = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            info!("Discovery already running, restarting");
            previous.shutdown();
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let sink = Arc::new(CycleSink::new(self.registry.clone(), self.events.clone()));
        let ctx = WorkerContext {
            config: self.config.clone(),
            searcher_factory: Arc::clone(&self.searcher_factory),
            provider: Arc::clone(&self.provider),
            sink: Arc::clone(&sink),
            stop_rx,
        };

        let handle = thread::Builder::new()
            .name("md-discovery".into())
            .spawn(move || ctx.run())?;

        info!(
            targets = ?self.config.search_targets,
            window_ms = self.config.window.as_millis() as u64,
            interval_ms = self.config.interval.as_millis() as u64,
            "Discovery started"
        );
        *slot = Some(Worker {
            stop_tx,
            handle,
            sink,
        });
        Ok(())
    }

    /// Stops the search cycles and waits for the worker to exit.
    ///
    /// Descriptions still being fetched are discarded when they complete.
    pub fn stop(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        match worker {
            Some(worker) => {
                worker.shutdown();
                info!("Discovery stopped");
            }
            None => debug!("Discovery not running"),
        }
    }
}

impl Drop for DiscoveryEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Worker {
    fn shutdown(self) {
        self.sink.close();
        // full channel or gone worker both mean the signal is not needed
        let _ = self.stop_tx.try_send(());
        drop(self.stop_tx);
        if self.handle.join().is_err() {
            warn!("Discovery worker panicked");
        }
    }
}

/// Receives resolved devices from description threads.
///
/// Every registry write from a resolver happens under `state`, and `close()`
/// flips `stopped` under the same lock.
struct CycleSink {
    state: Mutex<SinkState>,
    registry: DeviceRegistry,
    events: DiscoveryEventBus,
}

#[derive(Default)]
struct SinkState {
    stopped: bool,
    cycle: u64,
    collecting: bool,
    collected: HashMap<String, Device>,
}

impl CycleSink {
    fn new(registry: DeviceRegistry, events: DiscoveryEventBus) -> Self {
        Self {
            state: Mutex::new(SinkState::default()),
            registry,
            events,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin_cycle(&self, cycle: u64) {
        let mut state = self.lock();
        state.cycle = cycle;
        state.collecting = true;
        state.collected.clear();
    }

    fn deliver(&self, cycle: u64, device: Device) {
        let mut state = self.lock();
        if state.stopped || state.cycle != cycle {
            debug!(device = %device.id, cycle = cycle, "Dropping stale description");
            return;
        }

        if state.collecting {
            trace!(device = %device.id, cycle = cycle, "Device collected");
            state.collected.insert(device.id.clone(), device);
        } else {
            self.registry.upsert(device.clone());
            self.events
                .broadcast(DiscoveryEvent::DeviceUpdated { cycle, device });
        }
    }

    /// Replaces the registry content with the devices of `cycle`.
    fn publish(&self, cycle: u64) {
        let mut state = self.lock();
        if state.stopped || state.cycle != cycle {
            return;
        }
        state.collecting = false;
        let collected = std::mem::take(&mut state.collected);
        self.registry.replace_all(collected);

        let devices = self.registry.snapshot();
        info!(cycle = cycle, devices = devices.len(), "Device list published");
        self.events
            .broadcast(DiscoveryEvent::DevicesChanged { cycle, devices });
    }

    fn close(&self) {
        self.lock().stopped = true;
    }
}

struct WorkerContext {
    config: DiscoveryConfig,
    searcher_factory: SearcherFactory,
    provider: Arc<dyn DeviceDescriptionProvider>,
    sink: Arc<CycleSink>,
    stop_rx: Receiver<()>,
}

impl WorkerContext {
    fn run(self) {
        let mut searcher: Option<Box<dyn SsdpSearcher>> = None;
        let mut cycle: u64 = 0;

        loop {
            cycle += 1;
            let started = Instant::now();

            if searcher.is_none() {
                match (self.searcher_factory)() {
                    Ok(s) => searcher = Some(s),
                    Err(e) => warn!(error = %e, "Cannot open SSDP socket, retrying next cycle"),
                }
            }

            if let Some(s) = searcher.as_mut() {
                if !self.run_cycle(cycle, &mut **s) {
                    break;
                }
            }

            log_phase(cycle, CyclePhase::Sleeping);
            let wait = (started + self.config.interval).saturating_duration_since(Instant::now());
            match self.stop_rx.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!(cycles = cycle, "Discovery worker exiting");
    }

    /// Runs one cycle; returns `false` when a stop was requested.
    fn run_cycle(&self, cycle: u64, searcher: &mut dyn SsdpSearcher) -> bool {
        self.sink.begin_cycle(cycle);

        log_phase(cycle, CyclePhase::Searching);
        for target in &self.config.search_targets {
            if let Err(e) = searcher.send_search(target, self.config.mx, &self.config.user_agent) {
                warn!(target = %target, error = %e, "M-SEARCH failed");
            }
        }

        log_phase(cycle, CyclePhase::Collecting);
        let deadline = Instant::now() + self.config.window;
        let mut seen: HashSet<String> = HashSet::new();

        loop {
            match self.stop_rx.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(()) | Err(TryRecvError::Disconnected) => return false,
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let timeout = remaining.min(self.config.receive_poll);

            match searcher.receive(timeout) {
                Ok(Some(datagram)) => self.handle_datagram(cycle, datagram, &mut seen),
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "SSDP receive failed");
                    // avoid spinning on a broken socket
                    match self.stop_rx.recv_timeout(timeout) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => return false,
                    }
                }
            }
        }

        log_phase(cycle, CyclePhase::Publishing);
        self.sink.publish(cycle);
        true
    }

    fn handle_datagram(&self, cycle: u64, datagram: SsdpDatagram, seen: &mut HashSet<String>) {
        let Some(message) = parse_message(&datagram.payload) else {
            trace!(from = %datagram.from, "Ignoring SSDP datagram");
            return;
        };
        if matches!(message, SsdpMessage::ByeBye { .. }) {
            return;
        }
        let Some(location) = message.location() else {
            return;
        };
        let Some(id) = extract_uuid(message.usn()) else {
            trace!(usn = message.usn(), "USN without uuid");
            return;
        };
        if !seen.insert(id.clone()) {
            return;
        }

        let endpoint = DiscoveredEndpoint {
            id,
            location: location.to_string(),
            address: datagram.from,
            server_header: message.server().map(str::to_string),
            max_age: message.max_age(),
        };
        debug!(
            device = %endpoint.id,
            location = %endpoint.location,
            from = %endpoint.address,
            "Device answered"
        );
        self.spawn_resolver(cycle, endpoint);
    }

    fn spawn_resolver(&self, cycle: u64, endpoint: DiscoveredEndpoint) {
        let provider = Arc::clone(&self.provider);
        let sink = Arc::clone(&self.sink);

        let spawned = thread::Builder::new()
            .name("md-describe".into())
            .spawn(move || match provider.describe(&endpoint) {
                Ok(device) => sink.deliver(cycle, device),
                Err(e) => warn!(
                    device = %endpoint.id,
                    location = %endpoint.location,
                    error = %e,
                    "Cannot resolve device description"
                ),
            });

        if let Err(e) = spawned {
            warn!(error = %e, "Cannot spawn description thread");
        }
    }
}

fn log_phase(cycle: u64, phase: CyclePhase) {
    trace!(cycle = cycle, phase = ?phase, "Discovery cycle phase");
}
