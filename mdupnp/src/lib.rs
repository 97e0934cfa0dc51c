//! # mdupnp - UPnP protocol primitives for the media-device control point
//!
//! This crate holds the wire-level pieces shared by the control point:
//!
//! - [`soap`] : SOAP envelope codec (request building, response decoding, faults)
//! - [`ssdp`] : SSDP search client and message parsing
//! - [`url`]  : resolution of relative URLs found in device descriptions

pub mod soap;
pub mod ssdp;
pub mod url;

pub use url::resolve_url;
