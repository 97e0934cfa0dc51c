use std::sync::Arc;

use crossbeam_channel::Receiver;
use mdconfig::Config;

use crate::discovery::{DiscoveryConfig, DiscoveryEngine, EngineState};
use crate::errors::ControlPointError;
use crate::events::DiscoveryEvent;
use crate::media_server::ContentBrowser;
use crate::model::{ContentNode, Device};
use crate::renderer::TransportController;
use crate::transport::{HttpTransport, UreqTransport};

/// Entry point for the UI layer.
///
/// - `start_discovery` / `stop_discovery` drive the background search cycles,
/// - `devices` returns the current device list,
/// - `browse` and `play_on_device` are plain request/response calls.
pub struct ControlPoint {
    discovery: DiscoveryEngine,
    browser: ContentBrowser,
    controller: TransportController,
}

impl ControlPoint {
    /// Builds a control point from the loaded configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let transport: Arc<dyn HttpTransport> = Arc::new(UreqTransport::from_config(&config.http));
        let discovery = DiscoveryEngine::new(
            DiscoveryConfig::from_settings(&config.discovery)?,
            Arc::clone(&transport),
        );
        Ok(Self {
            discovery,
            browser: ContentBrowser::with_settings(Arc::clone(&transport), &config.browse),
            controller: TransportController::new(transport),
        })
    }

    /// Assembles a control point from already built parts.
    pub fn with_parts(
        discovery: DiscoveryEngine,
        browser: ContentBrowser,
        controller: TransportController,
    ) -> Self {
        Self {
            discovery,
            browser,
            controller,
        }
    }

    pub fn start_discovery(&self) -> Result<(), ControlPointError> {
        self.discovery.start()
    }

    pub fn stop_discovery(&self) {
        self.discovery.stop();
    }

    pub fn discovery_state(&self) -> EngineState {
        self.discovery.state()
    }

    /// Read-only snapshot of the known devices.
    pub fn devices(&self) -> Vec<Device> {
        self.discovery.devices()
    }

    pub fn media_servers(&self) -> Vec<Device> {
        self.devices()
            .into_iter()
            .filter(Device::is_media_server)
            .collect()
    }

    pub fn renderers(&self) -> Vec<Device> {
        self.devices()
            .into_iter()
            .filter(Device::is_media_renderer)
            .collect()
    }

    pub fn subscribe(&self) -> Receiver<DiscoveryEvent> {
        self.discovery.subscribe()
    }

    pub fn browse(
        &self,
        device: &Device,
        node_id: Option<&str>,
    ) -> Result<Vec<ContentNode>, ControlPointError> {
        self.browser.browse(device, node_id)
    }

    pub fn play_on_device(
        &self,
        device: &Device,
        media_url: &str,
        title: &str,
    ) -> Result<(), ControlPointError> {
        self.controller.play_on_device(device, media_url, title)
    }

    pub fn content_browser(&self) -> &ContentBrowser {
        &self.browser
    }

    pub fn transport_controller(&self) -> &TransportController {
        &self.controller
    }
}
