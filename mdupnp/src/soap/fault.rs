//! SOAP Faults returned by UPnP devices

use std::fmt;

use super::{SoapEnvelope, error_codes};
use super::envelope::{element_text, find_child};

/// SOAP error (Fault)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    /// Fault code (e.g. "s:Client")
    pub fault_code: String,

    /// Fault string (usually "UPnPError")
    pub fault_string: String,

    /// UPnP details, when the device provides them
    pub upnp_error: Option<UpnpError>,
}

/// UPnP-specific error carried in the fault detail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpnpError {
    pub error_code: u32,
    pub error_description: String,
}

impl fmt::Display for SoapFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.upnp_error {
            Some(err) if err.error_description.is_empty() => {
                match error_codes::standard_description(err.error_code) {
                    Some(meaning) => write!(f, "UPnP error {}: {}", err.error_code, meaning),
                    None => write!(f, "UPnP error {}", err.error_code),
                }
            }
            Some(err) => write!(f, "UPnP error {}: {}", err.error_code, err.error_description),
            None => write!(f, "{} ({})", self.fault_string, self.fault_code),
        }
    }
}

/// Extracts the Fault carried by an envelope body, if any.
pub fn parse_soap_fault(envelope: &SoapEnvelope) -> Option<SoapFault> {
    let fault = find_child(&envelope.body.content, "Fault")?;

    let fault_code = find_child(fault, "faultcode")
        .map(|e| element_text(e).trim().to_string())
        .unwrap_or_default();
    let fault_string = find_child(fault, "faultstring")
        .map(|e| element_text(e).trim().to_string())
        .unwrap_or_default();

    let upnp_error = find_child(fault, "detail")
        .and_then(|detail| find_child(detail, "UPnPError"))
        .and_then(|upnp| {
            let code = find_child(upnp, "errorCode")?;
            let error_code = element_text(code).trim().parse::<u32>().ok()?;
            let error_description = find_child(upnp, "errorDescription")
                .map(|e| element_text(e).trim().to_string())
                .unwrap_or_default();
            Some(UpnpError {
                error_code,
                error_description,
            })
        });

    Some(SoapFault {
        fault_code,
        fault_string,
        upnp_error,
    })
}
