//! # mdcontrol - DLNA/UPnP control point
//!
//! Discovers media servers and renderers on the local network, lists the
//! content of servers and starts playback on renderers.
//!
//! ```no_run
//! use mdcontrol::ControlPoint;
//!
//! let config = mdconfig::Config::load(None)?;
//! let cp = ControlPoint::from_config(&config)?;
//! cp.start_discovery()?;
//!
//! std::thread::sleep(std::time::Duration::from_secs(4));
//! for server in cp.media_servers() {
//!     for node in cp.browse(&server, None)? {
//!         println!("{} / {}", server.display_name, node.title);
//!     }
//! }
//! cp.stop_discovery();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod control_point;
pub mod description;
pub mod discovery;
pub mod errors;
pub mod events;
pub mod media_server;
pub mod model;
pub mod registry;
pub mod renderer;
pub mod soap_client;
pub mod transport;

pub use control_point::ControlPoint;
pub use description::{DeviceDescription, parse_description};
pub use discovery::{
    DeviceDescriptionProvider, DiscoveredEndpoint, DiscoveryConfig, DiscoveryEngine, EngineState,
    HttpDescriptionProvider, SearcherFactory, SsdpSearcher,
};
pub use errors::ControlPointError;
pub use events::DiscoveryEvent;
pub use media_server::{ContentBrowser, ROOT_OBJECT_ID};
pub use model::{
    ActionState, BrowsePage, ContentKind, ContentNode, Device, DeviceKind, PlayableInfo,
    ServiceEndpoint, ServiceKind,
};
pub use registry::{DeviceRegistry, UpsertOutcome};
pub use renderer::TransportController;
pub use transport::{HttpTransport, UreqTransport};
