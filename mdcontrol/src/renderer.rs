use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::ControlPointError;
use crate::model::{Device, ServiceEndpoint, ServiceKind};
use crate::soap_client::{invoke_action, resolve_endpoint};
use crate::transport::HttpTransport;

const INSTANCE_ID: &str = "0";
const NORMAL_SPEED: &str = "1";

/// Drives the AVTransport service of media renderers.
#[derive(Clone)]
pub struct TransportController {
    transport: Arc<dyn HttpTransport>,
}

impl TransportController {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Loads `media_url` on `device` and starts playback.
    ///
    /// Sends SetAVTransportURI then Play to the same endpoint. Play is not sent
    /// when the first action fails.
    pub fn play_on_device(
        &self,
        device: &Device,
        media_url: &str,
        title: &str,
    ) -> Result<(), ControlPointError> {
        let endpoint = self.endpoint(device)?;
        let metadata = build_metadata(media_url, title);

        self.set_av_transport_uri_on(&endpoint, media_url, &metadata)?;
        self.send(&endpoint, "Play", &[("InstanceID", INSTANCE_ID), ("Speed", NORMAL_SPEED)])?;

        info!(
            renderer = %device.display_name,
            url = media_url,
            "Playback started"
        );
        Ok(())
    }

    pub fn set_av_transport_uri(
        &self,
        device: &Device,
        uri: &str,
        metadata: &str,
    ) -> Result<(), ControlPointError> {
        let endpoint = self.endpoint(device)?;
        self.set_av_transport_uri_on(&endpoint, uri, metadata)
    }

    pub fn play(&self, device: &Device) -> Result<(), ControlPointError> {
        let endpoint = self.endpoint(device)?;
        self.send(&endpoint, "Play", &[("InstanceID", INSTANCE_ID), ("Speed", NORMAL_SPEED)])
    }

    pub fn pause(&self, device: &Device) -> Result<(), ControlPointError> {
        let endpoint = self.endpoint(device)?;
        self.send(&endpoint, "Pause", &[("InstanceID", INSTANCE_ID)])
    }

    pub fn stop(&self, device: &Device) -> Result<(), ControlPointError> {
        let endpoint = self.endpoint(device)?;
        self.send(&endpoint, "Stop", &[("InstanceID", INSTANCE_ID)])
    }

    fn endpoint(&self, device: &Device) -> Result<ServiceEndpoint, ControlPointError> {
        let service = device.require_service(ServiceKind::AvTransport)?;
        Ok(resolve_endpoint(device, service))
    }

    fn set_av_transport_uri_on(
        &self,
        endpoint: &ServiceEndpoint,
        uri: &str,
        metadata: &str,
    ) -> Result<(), ControlPointError> {
        self.send(
            endpoint,
            "SetAVTransportURI",
            &[
                ("InstanceID", INSTANCE_ID),
                ("CurrentURI", uri),
                ("CurrentURIMetaData", metadata),
            ],
        )
    }

    // Output arguments of these actions are not used, only the HTTP status.
    fn send(
        &self,
        endpoint: &ServiceEndpoint,
        action: &str,
        args: &[(&str, &str)],
    ) -> Result<(), ControlPointError> {
        invoke_action(self.transport.as_ref(), endpoint, action, args)?;
        debug!(control_url = %endpoint.control_url, action = action, "AVTransport action done");
        Ok(())
    }
}

/// Minimal DIDL-Lite metadata announced with a media URL.
pub fn build_metadata(media_url: &str, title: &str) -> String {
    let mime = guess_mime_type(media_url);
    let class = match mime.split('/').next() {
        Some("audio") => "object.item.audioItem.musicTrack",
        Some("image") => "object.item.imageItem.photo",
        _ => "object.item.videoItem",
    };
    let protocol_info = format!("http-get:*:{}:*", mime);
    mddidl::build_item_metadata(title, media_url, &protocol_info, class)
}

/// MIME type from the extension of the URL path, `*` when unknown.
fn guess_mime_type(media_url: &str) -> &'static str {
    let path = media_url.split(['?', '#']).next().unwrap_or(media_url);
    let file = path.rsplit('/').next().unwrap_or(path);
    let Some((_, ext)) = file.rsplit_once('.') else {
        return "*";
    };

    match ext.to_ascii_lowercase().as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "ts" | "m2ts" => "video/mp2t",
        "mpg" | "mpeg" => "video/mpeg",
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "m4a" | "aac" => "audio/mp4",
        "ogg" => "audio/ogg",
        "wav" => "audio/wav",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "*",
    }
}
