use std::io;

use mddidl::DidlError;
use mdupnp::soap::SoapError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ControlPointError {
    #[error("Malformed device description: {0}")]
    MalformedDescription(String),
    #[error("Malformed SOAP response: {0}")]
    MalformedResponse(String),
    #[error("Malformed DIDL-Lite content: {0}")]
    MalformedContent(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("{device} does not expose a {service} service")]
    UnsupportedByDevice { device: String, service: String },
    #[error("Socket error: {0}")]
    Socket(#[from] io::Error),
}

impl ControlPointError {
    pub fn unsupported(device: &str, service: &str) -> Self {
        ControlPointError::UnsupportedByDevice {
            device: device.to_string(),
            service: service.to_string(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        ControlPointError::TransportError(message.into())
    }
}

impl From<SoapError> for ControlPointError {
    fn from(err: SoapError) -> Self {
        ControlPointError::MalformedResponse(err.to_string())
    }
}

impl From<DidlError> for ControlPointError {
    fn from(err: DidlError) -> Self {
        ControlPointError::MalformedContent(err.to_string())
    }
}
