use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::SystemTime;

use crate::errors::ControlPointError;

/// Role of a device on the network.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    MediaServer,
    MediaRenderer,
    #[default]
    Other,
}

impl DeviceKind {
    /// Classifies a `deviceType` URN, ignoring case.
    pub fn classify(device_type: &str) -> Self {
        let lower = device_type.to_ascii_lowercase();
        if lower.contains("urn:schemas-upnp-org:device:mediaserver:") {
            DeviceKind::MediaServer
        } else if lower.contains("urn:schemas-upnp-org:device:mediarenderer:")
            || lower.contains("urn:av-openhome-org:device:mediarenderer:")
        {
            DeviceKind::MediaRenderer
        } else {
            DeviceKind::Other
        }
    }
}

/// UPnP services the control point knows how to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServiceKind {
    ContentDirectory,
    AvTransport,
    RenderingControl,
    ConnectionManager,
}

impl ServiceKind {
    pub fn from_service_type(service_type: &str) -> Option<Self> {
        let lower = service_type.to_ascii_lowercase();
        let kind = if lower.contains(":service:contentdirectory:") {
            ServiceKind::ContentDirectory
        } else if lower.contains(":service:avtransport:") {
            ServiceKind::AvTransport
        } else if lower.contains(":service:renderingcontrol:") {
            ServiceKind::RenderingControl
        } else if lower.contains(":service:connectionmanager:") {
            ServiceKind::ConnectionManager
        } else {
            return None;
        };
        Some(kind)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::ContentDirectory => "ContentDirectory",
            ServiceKind::AvTransport => "AVTransport",
            ServiceKind::RenderingControl => "RenderingControl",
            ServiceKind::ConnectionManager => "ConnectionManager",
        }
    }
}

/// One `<service>` entry, URLs already absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoint {
    pub service_type: String,
    pub control_url: String,
    pub event_sub_url: Option<String>,
}

/// A device as seen by the control point.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub id: String,
    pub display_name: String,
    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub kind: DeviceKind,
    pub device_type: String,
    pub description_location: String,
    pub address: SocketAddr,
    pub services: BTreeMap<ServiceKind, ServiceEndpoint>,
    pub icon_url: Option<String>,
    pub server_header: Option<String>,
    /// `CACHE-CONTROL: max-age` announced by the device, in seconds.
    pub max_age: u32,
    pub last_seen_at: SystemTime,
}

impl Device {
    pub fn service(&self, kind: ServiceKind) -> Option<&ServiceEndpoint> {
        self.services.get(&kind)
    }

    pub fn has_service(&self, kind: ServiceKind) -> bool {
        self.services.contains_key(&kind)
    }

    pub fn is_media_server(&self) -> bool {
        self.kind == DeviceKind::MediaServer || self.has_service(ServiceKind::ContentDirectory)
    }

    pub fn is_media_renderer(&self) -> bool {
        self.kind == DeviceKind::MediaRenderer || self.has_service(ServiceKind::AvTransport)
    }

    /// Endpoint for `kind`, or `UnsupportedByDevice`.
    pub fn require_service(
        &self,
        kind: ServiceKind,
    ) -> Result<&ServiceEndpoint, ControlPointError> {
        self.service(kind)
            .ok_or_else(|| ControlPointError::unsupported(&self.display_name, kind.name()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Container,
    Video,
    Audio,
    Image,
}

impl ContentKind {
    /// Maps a `upnp:class` of an item; unknown classes count as video.
    pub fn from_item_class(class: &str) -> Self {
        let lower = class.to_ascii_lowercase();
        if lower.contains("videoitem") {
            ContentKind::Video
        } else if lower.contains("audioitem") || lower.contains("musictrack") {
            ContentKind::Audio
        } else if lower.contains("imageitem") || lower.contains("photo") {
            ContentKind::Image
        } else {
            ContentKind::Video
        }
    }
}

/// Resource details of a playable item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayableInfo {
    pub media_url: Option<String>,
    pub duration_text: Option<String>,
    /// 0 when the server did not report a size.
    pub size_bytes: u64,
    pub mime_type: Option<String>,
    pub album_art_url: Option<String>,
}

/// One entry of a ContentDirectory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub kind: ContentKind,
    pub class: String,
    pub child_count: Option<u32>,
    /// Always `None` for containers.
    pub playable: Option<PlayableInfo>,
}

impl ContentNode {
    pub fn is_container(&self) -> bool {
        self.kind == ContentKind::Container
    }

    pub fn is_playable(&self) -> bool {
        self.playable
            .as_ref()
            .is_some_and(|p| p.media_url.is_some())
    }

    pub fn media_url(&self) -> Option<&str> {
        self.playable.as_ref()?.media_url.as_deref()
    }
}

/// One page of a Browse call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BrowsePage {
    pub nodes: Vec<ContentNode>,
    pub number_returned: u32,
    pub total_matches: u32,
    pub update_id: Option<u32>,
}

/// State of an asynchronous operation as presented to a UI.
#[derive(Debug)]
pub enum ActionState<T> {
    Loading,
    Success(T),
    Error(ControlPointError),
}

impl<T> ActionState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, ActionState::Loading)
    }

    pub fn success(&self) -> Option<&T> {
        match self {
            ActionState::Success(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ControlPointError> {
        match self {
            ActionState::Error(err) => Some(err),
            _ => None,
        }
    }
}

impl<T> From<Result<T, ControlPointError>> for ActionState<T> {
    fn from(result: Result<T, ControlPointError>) -> Self {
        match result {
            Ok(value) => ActionState::Success(value),
            Err(err) => ActionState::Error(err),
        }
    }
}
