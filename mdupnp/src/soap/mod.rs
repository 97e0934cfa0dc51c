//! # SOAP module - envelope codec for UPnP actions
//!
//! Every remote action of the control point (Browse, SetAVTransportURI, Play, ...)
//! goes through the same envelope mechanism:
//!
//! - [`encode`] builds the request body for one action,
//! - [`decode`] extracts one named output argument from the response body,
//! - [`parse_action_response`] gives access to every output argument,
//! - [`parse_soap_fault`] extracts the UPnP error carried by a SOAP Fault.
//!
//! The codec is pure: no socket is ever touched here.
//!
//! ## Example
//!
//! ```
//! use mdupnp::soap::{decode, encode};
//!
//! let body = encode(
//!     "Browse",
//!     "urn:schemas-upnp-org:service:ContentDirectory:1",
//!     &[("ObjectID", "0"), ("BrowseFlag", "BrowseDirectChildren")],
//! )
//! .unwrap();
//! assert!(body.contains("<ObjectID>0</ObjectID>"));
//!
//! let response = r#"<?xml version="1.0"?>
//! <s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
//!   <s:Body>
//!     <u:BrowseResponse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
//!       <Result>hello</Result>
//!     </u:BrowseResponse>
//!   </s:Body>
//! </s:Envelope>"#;
//! assert_eq!(decode(response, "Result").unwrap(), "hello");
//! ```

mod builder;
mod envelope;
mod fault;
mod parser;

pub use builder::{encode, soap_action_header};
pub use envelope::{SoapBody, SoapEnvelope};
pub use fault::{SoapFault, UpnpError, parse_soap_fault};
pub use parser::{SoapActionResponse, decode, parse_action_response, parse_soap_envelope};

/// SOAP envelope namespace.
pub const SOAP_ENVELOPE_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";

/// SOAP encoding style required by UPnP.
pub const SOAP_ENCODING_STYLE: &str = "http://schemas.xmlsoap.org/soap/encoding/";

/// Errors raised while building or reading a SOAP envelope.
#[derive(Debug, thiserror::Error)]
pub enum SoapError {
    #[error("XML parse error: {0}")]
    Xml(#[from] xmltree::ParseError),

    #[error("XML emit error: {0}")]
    Emit(#[from] xmltree::Error),

    #[error("Envelope is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("Missing SOAP Envelope")]
    MissingEnvelope,

    #[error("Missing SOAP Body")]
    MissingBody,

    #[error("No action element found in SOAP Body")]
    NoAction,

    #[error("Missing {field} element in {action}")]
    MissingField { action: String, field: String },

    #[error("SOAP fault: {0}")]
    Fault(SoapFault),
}

/// Standard UPnP action error codes
pub mod error_codes {
    /// Invalid action
    pub const INVALID_ACTION: u32 = 401;

    /// Invalid arguments
    pub const INVALID_ARGS: u32 = 402;

    /// Action failed
    pub const ACTION_FAILED: u32 = 501;

    /// Argument value invalid
    pub const ARGUMENT_VALUE_INVALID: u32 = 600;

    /// Argument value out of range
    pub const ARGUMENT_VALUE_OUT_OF_RANGE: u32 = 601;

    /// Optional action not implemented
    pub const OPTIONAL_ACTION_NOT_IMPLEMENTED: u32 = 602;

    /// Standard meaning of the codes shared by every UPnP service.
    ///
    /// Service-specific codes (700 and above) mean different things per
    /// service and are not mapped.
    pub fn standard_description(code: u32) -> Option<&'static str> {
        match code {
            INVALID_ACTION => Some("Invalid Action"),
            INVALID_ARGS => Some("Invalid Args"),
            ACTION_FAILED => Some("Action Failed"),
            ARGUMENT_VALUE_INVALID => Some("Argument Value Invalid"),
            ARGUMENT_VALUE_OUT_OF_RANGE => Some("Argument Value Out of Range"),
            OPTIONAL_ACTION_NOT_IMPLEMENTED => Some("Optional Action Not Implemented"),
            _ => None,
        }
    }
}
