//! # mddidl - DIDL-Lite parser
//!
//! DIDL-Lite is the XML document a ContentDirectory returns inside the
//! `Result` argument of a Browse response, and the metadata format a renderer
//! expects alongside a media URL. This crate parses the former and builds
//! minimal instances of the latter.

mod protocol_info;

use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};

pub use protocol_info::ProtocolInfo;

/// DIDL-Lite namespaces
pub const DIDL_NS: &str = "urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/";
pub const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
pub const UPNP_NS: &str = "urn:schemas-upnp-org:metadata-1-0/upnp/";

/// Errors raised while reading a DIDL-Lite document.
#[derive(Debug, thiserror::Error)]
pub enum DidlError {
    #[error("invalid DIDL-Lite document: {0}")]
    Deserialize(#[from] quick_xml::de::DeError),
}

// ============= DIDL-Lite structures =============

/// Root of a DIDL-Lite document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename = "DIDL-Lite")]
pub struct DIDLLite {
    #[serde(rename = "container", default)]
    pub containers: Vec<Container>,

    #[serde(rename = "item", default)]
    pub items: Vec<Item>,
}

/// Container holding other containers or items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID", default)]
    pub parent_id: String,

    #[serde(rename = "@restricted", skip_serializing_if = "Option::is_none")]
    pub restricted: Option<String>,

    #[serde(rename = "@childCount", skip_serializing_if = "Option::is_none")]
    pub child_count: Option<String>,

    #[serde(rename = "dc:title", alias = "title", default)]
    pub title: String,

    #[serde(rename = "upnp:class", alias = "class", default)]
    pub class: String,
}

/// Playable object (video, audio, image)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@parentID", default)]
    pub parent_id: String,

    #[serde(rename = "@restricted", skip_serializing_if = "Option::is_none")]
    pub restricted: Option<String>,

    #[serde(rename = "dc:title", alias = "title", default)]
    pub title: String,

    #[serde(
        rename = "dc:creator",
        alias = "creator",
        skip_serializing_if = "Option::is_none"
    )]
    pub creator: Option<String>,

    #[serde(rename = "upnp:class", alias = "class", default)]
    pub class: String,

    #[serde(rename = "upnp:artist", alias = "artist", default)]
    pub artists: Vec<String>,

    #[serde(
        rename = "upnp:album",
        alias = "album",
        skip_serializing_if = "Option::is_none"
    )]
    pub album: Option<String>,

    #[serde(rename = "upnp:albumArtURI", alias = "albumArtURI", default)]
    pub album_art_uris: Vec<String>,

    #[serde(rename = "dc:date", alias = "date", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    #[serde(rename = "res", default)]
    pub resources: Vec<Resource>,
}

/// Media resource (`<res>`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "@protocolInfo", default)]
    pub protocol_info: String,

    #[serde(rename = "@size", skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(rename = "@duration", skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(rename = "@resolution", skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,

    #[serde(rename = "@bitrate", skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,

    #[serde(rename = "$text", default)]
    pub url: String,
}

// ============= Parsing =============

impl DIDLLite {
    /// Parses a DIDL-Lite document.
    ///
    /// Containers and items may be interleaved; unknown elements are ignored.
    pub fn parse(input: &str) -> Result<Self, DidlError> {
        Ok(quick_xml::de::from_str(input)?)
    }

    pub fn is_empty(&self) -> bool {
        self.containers.is_empty() && self.items.is_empty()
    }
}

impl Container {
    pub fn child_count(&self) -> Option<u32> {
        self.child_count.as_deref()?.trim().parse().ok()
    }
}

impl Item {
    /// First resource carrying a non-empty URL.
    pub fn primary_resource(&self) -> Option<&Resource> {
        self.resources.iter().find(|r| !r.url.trim().is_empty())
    }

    pub fn album_art_uri(&self) -> Option<&str> {
        self.album_art_uris
            .iter()
            .map(|u| u.trim())
            .find(|u| !u.is_empty())
    }
}

impl Resource {
    pub fn protocol_info(&self) -> ProtocolInfo {
        ProtocolInfo::parse(&self.protocol_info)
    }

    /// Size in bytes, `None` when absent or not a number.
    pub fn size_bytes(&self) -> Option<u64> {
        self.size.as_deref()?.trim().parse().ok()
    }
}

// ============= Building =============

/// Builds the minimal single-item document renderers expect next to a media URL.
///
/// Title, URL and protocolInfo are escaped; the result is a plain XML fragment
/// (the SOAP layer escapes it again when embedding it in an envelope).
pub fn build_item_metadata(title: &str, url: &str, protocol_info: &str, class: &str) -> String {
    format!(
        concat!(
            r#"<DIDL-Lite xmlns="{didl}" xmlns:dc="{dc}" xmlns:upnp="{upnp}">"#,
            r#"<item id="0" parentID="-1" restricted="1">"#,
            "<dc:title>{title}</dc:title>",
            "<upnp:class>{class}</upnp:class>",
            r#"<res protocolInfo="{pi}">{url}</res>"#,
            "</item></DIDL-Lite>"
        ),
        didl = DIDL_NS,
        dc = DC_NS,
        upnp = UPNP_NS,
        title = escape(title),
        class = escape(class),
        pi = escape(protocol_info),
        url = escape(url),
    )
}
