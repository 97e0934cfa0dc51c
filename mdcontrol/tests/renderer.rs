mod common;

use std::sync::Arc;

use common::*;
use mdcontrol::{ControlPointError, TransportController};

fn ok_response(action: &str) -> String {
    soap_response(action, AV_TRANSPORT, &[])
}

#[test]
fn test_play_sends_uri_then_play_on_same_endpoint() {
    let transport = Arc::new(
        FakeTransport::new()
            .respond_ok(ok_response("SetAVTransportURI"))
            .respond_ok(ok_response("Play")),
    );
    let controller = TransportController::new(transport.clone());

    controller
        .play_on_device(&renderer("tv"), "http://10.0.0.5:8200/MediaItems/2.mp4", "Tom & Jerry")
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].url, calls[1].url);
    assert_eq!(
        calls[0].soap_action.as_deref(),
        Some("\"urn:schemas-upnp-org:service:AVTransport:1#SetAVTransportURI\"")
    );
    assert_eq!(
        calls[1].soap_action.as_deref(),
        Some("\"urn:schemas-upnp-org:service:AVTransport:1#Play\"")
    );

    let set_uri = &calls[0].body;
    assert!(set_uri.contains("<InstanceID>0</InstanceID>"));
    assert!(set_uri.contains("<CurrentURI>http://10.0.0.5:8200/MediaItems/2.mp4</CurrentURI>"));
    // the DIDL-Lite metadata travels escaped inside the envelope
    assert!(set_uri.contains("&lt;DIDL-Lite"));
    assert!(set_uri.contains("Tom &amp;amp; Jerry"));

    let play = &calls[1].body;
    assert!(play.contains("<InstanceID>0</InstanceID>"));
    assert!(play.contains("<Speed>1</Speed>"));
}

#[test]
fn test_play_is_not_sent_when_set_uri_fails() {
    let transport = Arc::new(
        FakeTransport::new()
            .respond_err("SetAVTransportURI failed with HTTP status 500: UPnP error 714: Illegal MIME-type")
            .respond_ok(ok_response("Play")),
    );
    let controller = TransportController::new(transport.clone());

    let err = controller
        .play_on_device(&renderer("tv"), "http://10.0.0.5/x.bin", "x")
        .unwrap_err();

    assert!(matches!(err, ControlPointError::TransportError(_)));
    assert_eq!(transport.call_count(), 1);
}

#[test]
fn test_play_failure_is_reported() {
    let transport = Arc::new(
        FakeTransport::new()
            .respond_ok(ok_response("SetAVTransportURI"))
            .respond_err("Play failed with HTTP status 500"),
    );
    let controller = TransportController::new(transport.clone());

    let result = controller.play_on_device(&renderer("tv"), "http://10.0.0.5/a.mp4", "a");

    assert!(matches!(result, Err(ControlPointError::TransportError(_))));
    assert_eq!(transport.call_count(), 2);
}

#[test]
fn test_server_without_av_transport_is_unsupported() {
    let transport = Arc::new(FakeTransport::new());
    let controller = TransportController::new(transport.clone());

    let err = controller
        .play_on_device(&media_server("nas"), "http://10.0.0.5/a.mp4", "a")
        .unwrap_err();

    assert!(matches!(
        err,
        ControlPointError::UnsupportedByDevice { ref service, .. } if service == "AVTransport"
    ));
    assert_eq!(transport.call_count(), 0);
}

#[test]
fn test_pause_and_stop() {
    let transport = Arc::new(
        FakeTransport::new()
            .respond_ok(ok_response("Pause"))
            .respond_ok(ok_response("Stop")),
    );
    let controller = TransportController::new(transport.clone());
    let tv = renderer("tv");

    controller.pause(&tv).unwrap();
    controller.stop(&tv).unwrap();

    let actions: Vec<String> = transport
        .calls()
        .into_iter()
        .filter_map(|c| c.soap_action)
        .collect();
    assert!(actions[0].ends_with("#Pause\""));
    assert!(actions[1].ends_with("#Stop\""));
}
