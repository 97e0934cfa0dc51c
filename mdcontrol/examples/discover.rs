//! Runs a few discovery cycles and prints what answered.
//!
//! ```text
//! RUST_LOG=mdcontrol=debug cargo run -p mdcontrol --example discover -- [config.yaml]
//! ```

use std::path::PathBuf;
use std::thread;

use mdcontrol::{ControlPoint, DiscoveryEvent};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = mdconfig::Config::load(path.as_deref())?;
    let wait = config.discovery.window() * 2;

    let cp = ControlPoint::from_config(&config)?;
    let events = cp.subscribe();
    cp.start_discovery()?;

    if let Ok(DiscoveryEvent::DevicesChanged { cycle, devices }) = events.recv_timeout(wait) {
        println!("cycle {}: {} device(s)", cycle, devices.len());
    }
    thread::sleep(config.discovery.window() / 2);

    for device in cp.devices() {
        println!(
            "{:<14} {:<32} {}",
            format!("{:?}", device.kind),
            device.display_name,
            device.description_location
        );
    }

    for server in cp.media_servers() {
        match cp.browse(&server, None) {
            Ok(nodes) => {
                for node in nodes {
                    println!("  {} / {}", server.display_name, node.title);
                }
            }
            Err(err) => println!("  {}: {}", server.display_name, err),
        }
    }

    cp.stop_discovery();
    Ok(())
}
