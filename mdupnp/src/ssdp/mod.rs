//! # SSDP module - Simple Service Discovery Protocol (control point side)
//!
//! - [`SsdpClient`] : sends M-SEARCH requests and receives the unicast replies
//! - [`parse_message`] : turns a received datagram into an [`SsdpMessage`]
//! - [`extract_uuid`] : pulls the device identifier out of a `USN` value
//!
//! ## SSDP constants
//!
//! - **Multicast Address**: 239.255.255.250:1900
//! - **Default Max-Age**: 1800 seconds

mod client;
mod message;

pub use client::{SsdpClient, SsdpDatagram, build_msearch};
pub use message::{SsdpMessage, extract_uuid, parse_message};

/// SSDP multicast address
pub const SSDP_MULTICAST_ADDR: &str = "239.255.255.250";

/// SSDP port
pub const SSDP_PORT: u16 = 1900;

/// Validity of an announcement when CACHE-CONTROL is missing (seconds)
pub const MAX_AGE: u32 = 1800;

/// Search target matching every device and service
pub const SSDP_ALL: &str = "ssdp:all";
