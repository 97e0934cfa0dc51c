mod common;

use std::sync::Arc;

use common::*;
use mdcontrol::{
    ActionState, ContentBrowser, ControlPoint, DeviceDescriptionProvider, DiscoveredEndpoint,
    DiscoveryConfig, DiscoveryEngine, EngineState, SearcherFactory, TransportController,
};

struct NeverCalled;

impl DeviceDescriptionProvider for NeverCalled {
    fn describe(
        &self,
        endpoint: &DiscoveredEndpoint,
    ) -> Result<mdcontrol::Device, mdcontrol::ControlPointError> {
        panic!("unexpected resolution of {}", endpoint.id);
    }
}

fn control_point(transport: Arc<FakeTransport>) -> ControlPoint {
    let factory: SearcherFactory = Arc::new(|| {
        Err(std::io::Error::new(
            std::io::ErrorKind::AddrNotAvailable,
            "offline",
        ))
    });
    let discovery = DiscoveryEngine::with_parts(DiscoveryConfig::default(), factory, Arc::new(NeverCalled));
    ControlPoint::with_parts(
        discovery,
        ContentBrowser::new(transport.clone()),
        TransportController::new(transport),
    )
}

#[test]
fn test_facade_browse_and_play() {
    let didl = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/"><item id="7" parentID="0"><dc:title>Clip</dc:title><upnp:class>object.item.videoItem</upnp:class><res protocolInfo="http-get:*:video/mp4:*">http://10.0.0.5:8200/MediaItems/7.mp4</res></item></DIDL-Lite>"#;
    let transport = Arc::new(
        FakeTransport::new()
            .respond_ok(soap_response(
                "Browse",
                CONTENT_DIRECTORY,
                &[("Result", didl), ("NumberReturned", "1"), ("TotalMatches", "1")],
            ))
            .respond_ok(soap_response("SetAVTransportURI", AV_TRANSPORT, &[]))
            .respond_ok(soap_response("Play", AV_TRANSPORT, &[])),
    );
    let cp = control_point(transport.clone());

    let state: ActionState<_> = cp.browse(&media_server("nas"), None).into();
    let nodes = state.success().unwrap();
    let clip = &nodes[0];
    assert!(clip.is_playable());

    let played: ActionState<()> = cp
        .play_on_device(&renderer("tv"), clip.media_url().unwrap(), &clip.title)
        .into();
    assert!(played.success().is_some());
    assert_eq!(transport.call_count(), 3);
}

#[test]
fn test_facade_reports_errors_as_state() {
    let transport = Arc::new(FakeTransport::new());
    let cp = control_point(transport.clone());

    let state: ActionState<_> = cp.browse(&renderer("tv"), None).into();
    assert!(matches!(
        state.error(),
        Some(mdcontrol::ControlPointError::UnsupportedByDevice { .. })
    ));
    assert_eq!(transport.call_count(), 0);
}

#[test]
fn test_facade_discovery_lifecycle() {
    let cp = control_point(Arc::new(FakeTransport::new()));
    assert_eq!(cp.discovery_state(), EngineState::Stopped);

    cp.start_discovery().unwrap();
    assert_eq!(cp.discovery_state(), EngineState::Running);
    assert!(cp.devices().is_empty());
    assert!(cp.renderers().is_empty());

    cp.stop_discovery();
    assert_eq!(cp.discovery_state(), EngineState::Stopped);
}
