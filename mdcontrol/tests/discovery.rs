mod common;

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::*;
use crossbeam_channel::{Receiver, Sender, bounded};
use mdcontrol::{
    ControlPointError, DeviceDescriptionProvider, DeviceKind, DiscoveredEndpoint, DiscoveryConfig,
    DiscoveryEngine, DiscoveryEvent, EngineState, HttpDescriptionProvider, SearcherFactory,
    SsdpSearcher,
};
use mdupnp::ssdp::SsdpDatagram;

fn reply(id: &str, host: u8) -> SsdpDatagram {
    SsdpDatagram {
        from: format!("10.0.0.{}:1900", host).parse().unwrap(),
        payload: format!(
            "HTTP/1.1 200 OK\r\n\
             CACHE-CONTROL: max-age=1800\r\n\
             LOCATION: http://10.0.0.{}:8200/rootDesc.xml\r\n\
             SERVER: Linux UPnP/1.0 Test/1.0\r\n\
             ST: upnp:rootdevice\r\n\
             USN: uuid:{}::upnp:rootdevice\r\n\r\n",
            host, id
        ),
    }
}

/// Replays one list of datagrams per cycle; the last list repeats forever.
struct ScriptedSearcher {
    script: Vec<Vec<SsdpDatagram>>,
    cycle: usize,
    pending: VecDeque<SsdpDatagram>,
    searches: Arc<AtomicUsize>,
}

impl SsdpSearcher for ScriptedSearcher {
    fn send_search(&mut self, _target: &str, _mx: u32, _user_agent: &str) -> io::Result<()> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let idx = self.cycle.min(self.script.len().saturating_sub(1));
        self.pending = self.script.get(idx).cloned().unwrap_or_default().into();
        self.cycle += 1;
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> io::Result<Option<SsdpDatagram>> {
        match self.pending.pop_front() {
            Some(d) => Ok(Some(d)),
            None => {
                thread::sleep(timeout);
                Ok(None)
            }
        }
    }
}

fn scripted(script: Vec<Vec<SsdpDatagram>>) -> (SearcherFactory, Arc<AtomicUsize>) {
    let searches = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&searches);
    let script = Arc::new(script);
    let factory: SearcherFactory = Arc::new(move || {
        Ok(Box::new(ScriptedSearcher {
            script: script.as_ref().clone(),
            cycle: 0,
            pending: VecDeque::new(),
            searches: Arc::clone(&counter),
        }) as Box<dyn SsdpSearcher>)
    });
    (factory, searches)
}

/// Resolves every endpoint immediately, after an optional per-id delay.
#[derive(Default)]
struct InstantProvider {
    delays: HashMap<String, Duration>,
    calls: AtomicUsize,
}

impl DeviceDescriptionProvider for InstantProvider {
    fn describe(
        &self,
        endpoint: &DiscoveredEndpoint,
    ) -> Result<mdcontrol::Device, ControlPointError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(&endpoint.id) {
            thread::sleep(*delay);
        }
        let mut device = media_server(&endpoint.id);
        device.address = endpoint.address;
        device.description_location = endpoint.location.clone();
        Ok(device)
    }
}

/// Blocks every resolution until the gate opens.
struct GatedProvider {
    entered: Sender<()>,
    gate: Receiver<()>,
}

impl DeviceDescriptionProvider for GatedProvider {
    fn describe(
        &self,
        endpoint: &DiscoveredEndpoint,
    ) -> Result<mdcontrol::Device, ControlPointError> {
        let _ = self.entered.send(());
        let _ = self.gate.recv_timeout(Duration::from_secs(5));
        Ok(media_server(&endpoint.id))
    }
}

fn fast_config(window_ms: u64, interval_ms: u64) -> DiscoveryConfig {
    DiscoveryConfig {
        window: Duration::from_millis(window_ms),
        interval: Duration::from_millis(interval_ms),
        receive_poll: Duration::from_millis(20),
        ..Default::default()
    }
}

fn wait_for_cycle(events: &Receiver<DiscoveryEvent>, wanted: u64) -> Vec<mdcontrol::Device> {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if let Ok(DiscoveryEvent::DevicesChanged { cycle, devices }) =
            events.recv_timeout(Duration::from_millis(100))
        {
            if cycle == wanted {
                return devices;
            }
        }
    }
    panic!("cycle {} was never published", wanted);
}

fn ids(devices: &[mdcontrol::Device]) -> Vec<String> {
    devices.iter().map(|d| d.id.clone()).collect()
}

#[test]
fn test_silent_device_disappears_after_next_cycle() {
    let (factory, _) = scripted(vec![
        vec![reply("A", 2), reply("B", 3)],
        vec![reply("A", 2)],
    ]);
    let engine = DiscoveryEngine::with_parts(
        fast_config(300, 500),
        factory,
        Arc::new(InstantProvider::default()),
    );
    let events = engine.subscribe();
    engine.start().unwrap();

    let first = wait_for_cycle(&events, 1);
    assert_eq!(ids(&first), vec!["A", "B"]);

    let second = wait_for_cycle(&events, 2);
    assert_eq!(ids(&second), vec!["A"]);
    assert!(engine.registry().get("B").is_none());

    engine.stop();
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn test_duplicate_replies_are_resolved_once_per_cycle() {
    let (factory, _) = scripted(vec![vec![reply("A", 2), reply("A", 2), reply("A", 2)]]);
    let provider = Arc::new(InstantProvider::default());
    let engine = DiscoveryEngine::with_parts(fast_config(200, 5_000), factory, provider.clone());
    let events = engine.subscribe();
    engine.start().unwrap();

    let devices = wait_for_cycle(&events, 1);
    engine.stop();

    assert_eq!(devices.len(), 1);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    let a = &devices[0];
    assert_eq!(a.address, "10.0.0.2:1900".parse::<std::net::SocketAddr>().unwrap());
    assert_eq!(a.description_location, "http://10.0.0.2:8200/rootDesc.xml");
}

#[test]
fn test_late_resolution_of_current_cycle_is_kept() {
    let (factory, _) = scripted(vec![vec![reply("fast", 2), reply("slow", 3)]]);
    let mut provider = InstantProvider::default();
    provider
        .delays
        .insert("slow".to_string(), Duration::from_millis(400));
    let engine = DiscoveryEngine::with_parts(fast_config(150, 10_000), factory, Arc::new(provider));
    let events = engine.subscribe();
    engine.start().unwrap();

    let published = wait_for_cycle(&events, 1);
    assert_eq!(ids(&published), vec!["fast"]);

    let late = events.recv_timeout(Duration::from_secs(3)).unwrap();
    match late {
        DiscoveryEvent::DeviceUpdated { cycle, device } => {
            assert_eq!(cycle, 1);
            assert_eq!(device.id, "slow");
        }
        other => panic!("unexpected event: {other:?}"),
    }
    assert_eq!(engine.devices().len(), 2);
    engine.stop();
}

#[test]
fn test_stop_is_prompt_and_discards_pending_resolutions() {
    let (factory, _) = scripted(vec![vec![reply("A", 2)]]);
    let (entered_tx, entered_rx) = bounded(4);
    let (gate_tx, gate_rx) = bounded(4);
    let engine = DiscoveryEngine::with_parts(
        fast_config(5_000, 10_000),
        factory,
        Arc::new(GatedProvider {
            entered: entered_tx,
            gate: gate_rx,
        }),
    );
    engine.start().unwrap();
    assert_eq!(engine.state(), EngineState::Running);

    entered_rx.recv_timeout(Duration::from_secs(3)).unwrap();

    let started = Instant::now();
    engine.stop();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(engine.state(), EngineState::Stopped);

    gate_tx.send(()).unwrap();
    thread::sleep(Duration::from_millis(200));
    assert!(engine.devices().is_empty());
}

#[test]
fn test_start_twice_restarts_cleanly() {
    let (factory, searches) = scripted(vec![vec![reply("A", 2)]]);
    let engine = DiscoveryEngine::with_parts(
        fast_config(100, 10_000),
        factory,
        Arc::new(InstantProvider::default()),
    );
    let events = engine.subscribe();

    engine.start().unwrap();
    wait_for_cycle(&events, 1);
    engine.start().unwrap();
    assert_eq!(engine.state(), EngineState::Running);

    // the new worker numbers its cycles from 1 again
    let devices = wait_for_cycle(&events, 1);
    assert_eq!(ids(&devices), vec!["A"]);
    assert_eq!(searches.load(Ordering::SeqCst), 2);

    engine.stop();
    engine.stop();
    assert_eq!(engine.state(), EngineState::Stopped);
}

#[test]
fn test_socket_failure_keeps_engine_alive() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let factory: SearcherFactory = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Err(io::Error::new(io::ErrorKind::AddrNotAvailable, "no network"))
    });
    let engine = DiscoveryEngine::with_parts(
        fast_config(50, 50),
        factory,
        Arc::new(InstantProvider::default()),
    );

    engine.start().unwrap();
    thread::sleep(Duration::from_millis(300));
    assert_eq!(engine.state(), EngineState::Running);
    assert!(attempts.load(Ordering::SeqCst) >= 2);
    engine.stop();
}

#[test]
fn test_malformed_datagrams_are_ignored() {
    let noise = SsdpDatagram {
        from: "10.0.0.9:1900".parse().unwrap(),
        payload: "garbage\r\n\r\n".to_string(),
    };
    let no_uuid = SsdpDatagram {
        from: "10.0.0.9:1900".parse().unwrap(),
        payload: "HTTP/1.1 200 OK\r\nLOCATION: http://10.0.0.9/d.xml\r\nUSN: urn:x\r\n\r\n".to_string(),
    };
    let (factory, _) = scripted(vec![vec![noise, no_uuid, reply("A", 2)]]);
    let engine = DiscoveryEngine::with_parts(
        fast_config(200, 10_000),
        factory,
        Arc::new(InstantProvider::default()),
    );
    let events = engine.subscribe();
    engine.start().unwrap();

    assert_eq!(ids(&wait_for_cycle(&events, 1)), vec!["A"]);
    engine.stop();
}

#[test]
fn test_http_provider_builds_device_from_description() {
    let xml = r#"<?xml version="1.0"?>
<root xmlns="urn:schemas-upnp-org:device-1-0">
  <device>
    <deviceType>urn:schemas-upnp-org:device:MediaServer:1</deviceType>
    <friendlyName>Basement NAS</friendlyName>
    <modelName>MiniDLNA</modelName>
    <UDN>uuid:nas-1</UDN>
    <iconList>
      <icon><mimetype>image/png</mimetype><width>48</width><height>48</height><url>/icons/sm.png</url></icon>
    </iconList>
    <serviceList>
      <service>
        <serviceType>urn:schemas-upnp-org:service:ContentDirectory:1</serviceType>
        <controlURL>/ctl/ContentDir</controlURL>
        <eventSubURL>/evt/ContentDir</eventSubURL>
      </service>
    </serviceList>
  </device>
</root>"#;
    let transport = Arc::new(FakeTransport::new().with_page("http://10.0.0.2:80/rootDesc.xml", xml));
    let provider = HttpDescriptionProvider::new(transport);
    let endpoint = DiscoveredEndpoint {
        id: "nas-1".to_string(),
        location: "http://10.0.0.2:80/rootDesc.xml".to_string(),
        address: "10.0.0.2:1900".parse().unwrap(),
        server_header: Some("Linux UPnP/1.0 MiniDLNA/1.3".to_string()),
        max_age: 900,
    };

    let device = provider.describe(&endpoint).unwrap();

    assert_eq!(device.id, "nas-1");
    assert_eq!(device.display_name, "Basement NAS");
    assert_eq!(device.manufacturer, None);
    assert_eq!(device.kind, DeviceKind::MediaServer);
    assert_eq!(device.icon_url.as_deref(), Some("http://10.0.0.2:80/icons/sm.png"));
    assert_eq!(device.max_age, 900);
    assert_eq!(device.server_header.as_deref(), Some("Linux UPnP/1.0 MiniDLNA/1.3"));
    assert_eq!(
        device.service(mdcontrol::ServiceKind::ContentDirectory).unwrap().control_url,
        "http://10.0.0.2:80/ctl/ContentDir"
    );
}

#[test]
fn test_http_provider_reports_unreachable_description() {
    let provider = HttpDescriptionProvider::new(Arc::new(FakeTransport::new()));
    let endpoint = DiscoveredEndpoint {
        id: "x".to_string(),
        location: "http://10.0.0.3/missing.xml".to_string(),
        address: "10.0.0.3:1900".parse().unwrap(),
        server_header: None,
        max_age: 1800,
    };
    assert!(matches!(
        provider.describe(&endpoint),
        Err(ControlPointError::TransportError(_))
    ));
}
