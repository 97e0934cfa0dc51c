use mdupnp::resolve_url;
use mdupnp::soap::{SoapActionResponse, encode, parse_action_response, soap_action_header};
use tracing::debug;

use crate::errors::ControlPointError;
use crate::model::{Device, ServiceEndpoint, ServiceKind};
use crate::transport::HttpTransport;

/// Invokes one UPnP action and returns the raw response body.
///
/// - `endpoint`: service endpoint from the device description
/// - `action`: action name, e.g. "Browse"
/// - `args`: ordered (name, value) pairs, e.g. `&[("InstanceID", "0")]`
///
/// No retry is attempted.
pub fn invoke_action(
    transport: &dyn HttpTransport,
    endpoint: &ServiceEndpoint,
    action: &str,
    args: &[(&str, &str)],
) -> Result<String, ControlPointError> {
    let body = encode(action, &endpoint.service_type, args)?;
    let header = soap_action_header(&endpoint.service_type, action);

    debug!(
        control_url = %endpoint.control_url,
        action = action,
        args = args.len(),
        "Invoking UPnP action"
    );
    transport.post_action(&endpoint.control_url, &header, body)
}

/// Invokes an action of `device` on the service `kind` and parses the output
/// arguments.
///
/// Fails with `UnsupportedByDevice` before touching the network when the
/// device does not expose that service.
pub fn call_action(
    transport: &dyn HttpTransport,
    device: &Device,
    kind: ServiceKind,
    action: &str,
    args: &[(&str, &str)],
) -> Result<SoapActionResponse, ControlPointError> {
    let endpoint = resolve_endpoint(device, device.require_service(kind)?);
    let text = invoke_action(transport, &endpoint, action, args)?;
    Ok(parse_action_response(&text)?)
}

/// Makes the control URL of `service` absolute against the description location.
pub fn resolve_endpoint(device: &Device, service: &ServiceEndpoint) -> ServiceEndpoint {
    ServiceEndpoint {
        control_url: resolve_url(&device.description_location, &service.control_url),
        ..service.clone()
    }
}
