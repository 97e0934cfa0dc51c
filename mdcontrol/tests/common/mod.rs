#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::time::SystemTime;

use mdcontrol::{ControlPointError, Device, DeviceKind, HttpTransport, ServiceEndpoint, ServiceKind};

pub const CONTENT_DIRECTORY: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";
pub const AV_TRANSPORT: &str = "urn:schemas-upnp-org:service:AVTransport:1";

/// One request seen by [`FakeTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub url: String,
    pub soap_action: Option<String>,
    pub body: String,
}

/// Scripted transport: GET answers come from a URL map, POST answers are
/// consumed in order.
#[derive(Default)]
pub struct FakeTransport {
    pages: Mutex<HashMap<String, String>>,
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, body: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), body.to_string());
        self
    }

    pub fn respond_ok(self, body: String) -> Self {
        self.responses.lock().unwrap().push_back(Ok(body));
        self
    }

    pub fn respond_err(self, message: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl HttpTransport for FakeTransport {
    fn get_text(&self, url: &str) -> Result<String, ControlPointError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: url.to_string(),
            soap_action: None,
            body: String::new(),
        });
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| {
                ControlPointError::TransportError(format!(
                    "GET {} returned HTTP status 404",
                    url
                ))
            })
    }

    fn post_action(
        &self,
        endpoint: &str,
        soap_action: &str,
        body: String,
    ) -> Result<String, ControlPointError> {
        self.calls.lock().unwrap().push(RecordedCall {
            url: endpoint.to_string(),
            soap_action: Some(soap_action.to_string()),
            body,
        });
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(body)) => Ok(body),
            Some(Err(message)) => Err(ControlPointError::TransportError(message)),
            None => Err(ControlPointError::TransportError(
                "no scripted response".to_string(),
            )),
        }
    }
}

/// SOAP response envelope built with the request encoder (same shape).
pub fn soap_response(action: &str, service_type: &str, args: &[(&str, &str)]) -> String {
    mdupnp::soap::encode(&format!("{}Response", action), service_type, args).unwrap()
}

pub fn device_with(id: &str, kind: DeviceKind, services: &[(ServiceKind, &str, &str)]) -> Device {
    let services: BTreeMap<ServiceKind, ServiceEndpoint> = services
        .iter()
        .map(|(kind, service_type, control_url)| {
            (
                *kind,
                ServiceEndpoint {
                    service_type: service_type.to_string(),
                    control_url: control_url.to_string(),
                    event_sub_url: None,
                },
            )
        })
        .collect();

    Device {
        id: id.to_string(),
        display_name: format!("Device {}", id),
        manufacturer: None,
        model_name: None,
        kind,
        device_type: String::new(),
        description_location: "http://10.0.0.5:8200/rootDesc.xml".to_string(),
        address: "10.0.0.5:1900".parse().unwrap(),
        services,
        icon_url: None,
        server_header: None,
        max_age: 1800,
        last_seen_at: SystemTime::now(),
    }
}

pub fn media_server(id: &str) -> Device {
    device_with(
        id,
        DeviceKind::MediaServer,
        &[(ServiceKind::ContentDirectory, CONTENT_DIRECTORY, "/ctl/ContentDir")],
    )
}

pub fn renderer(id: &str) -> Device {
    device_with(
        id,
        DeviceKind::MediaRenderer,
        &[(ServiceKind::AvTransport, AV_TRANSPORT, "http://10.0.0.7:9197/upnp/control/AVTransport1")],
    )
}
