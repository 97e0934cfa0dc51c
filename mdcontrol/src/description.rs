//! UPnP device description (`description.xml`) parsing.
//!
//! Only the fields the control point uses are extracted. Services of embedded
//! devices (`deviceList`) are merged into the root device, the first declaration
//! of a given service kind winning.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::SystemTime;

use mdupnp::resolve_url;
use tracing::{debug, trace};
use xmltree::{Element, XMLNode};

use crate::errors::ControlPointError;
use crate::model::{Device, DeviceKind, ServiceEndpoint, ServiceKind};

/// Parsed content of a device description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceDescription {
    pub udn: Option<String>,
    pub device_type: String,
    pub friendly_name: Option<String>,
    pub manufacturer: Option<String>,
    pub model_name: Option<String>,
    pub kind: DeviceKind,
    pub services: BTreeMap<ServiceKind, ServiceEndpoint>,
    pub icon_url: Option<String>,
    pub url_base: Option<String>,
}

#[derive(Debug, Clone)]
struct Icon {
    mime_type: String,
    width: u32,
    height: u32,
    url: String,
}

impl Icon {
    fn area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// Parses a description document fetched from `description_location`.
///
/// Relative URLs are resolved against `URLBase` when the document has one,
/// otherwise against `description_location`.
pub fn parse_description(
    xml: &str,
    description_location: &str,
) -> Result<DeviceDescription, ControlPointError> {
    let root = Element::parse(xml.as_bytes())
        .map_err(|e| ControlPointError::MalformedDescription(e.to_string()))?;

    let device = child(&root, "device").ok_or_else(|| {
        ControlPointError::MalformedDescription(format!(
            "no <device> element in {}",
            description_location
        ))
    })?;

    let url_base = child_text(&root, "URLBase");
    let base = url_base.as_deref().unwrap_or(description_location);

    let device_type = child_text(device, "deviceType").unwrap_or_default();
    let mut description = DeviceDescription {
        udn: child_text(device, "UDN"),
        friendly_name: child_text(device, "friendlyName"),
        manufacturer: child_text(device, "manufacturer"),
        model_name: child_text(device, "modelName"),
        device_type,
        url_base: url_base.clone(),
        ..Default::default()
    };

    collect_services(device, base, &mut description.services);
    description.kind = classify_tree(device);

    let icons = collect_icons(device, base);
    description.icon_url = choose_icon(&icons).map(|icon| icon.url.clone());

    debug!(
        location = description_location,
        device_type = %description.device_type,
        services = description.services.len(),
        icons = icons.len(),
        "Parsed device description"
    );

    Ok(description)
}

impl DeviceDescription {
    /// Name shown to users: friendlyName, then modelName, then `fallback`.
    pub fn display_name(&self, fallback: &str) -> String {
        self.friendly_name
            .as_deref()
            .or(self.model_name.as_deref())
            .unwrap_or(fallback)
            .to_string()
    }

    /// Builds the registry entry for a device answering from `address`.
    pub fn into_device(
        self,
        id: &str,
        address: SocketAddr,
        description_location: &str,
        server_header: Option<String>,
        max_age: u32,
    ) -> Device {
        Device {
            id: id.to_string(),
            display_name: self.display_name(id),
            kind: self.kind,
            manufacturer: self.manufacturer,
            model_name: self.model_name,
            device_type: self.device_type,
            description_location: description_location.to_string(),
            address,
            services: self.services,
            icon_url: self.icon_url,
            server_header,
            max_age,
            last_seen_at: SystemTime::now(),
        }
    }
}

fn classify_tree(device: &Element) -> DeviceKind {
    let kind = DeviceKind::classify(&child_text(device, "deviceType").unwrap_or_default());
    if kind != DeviceKind::Other {
        return kind;
    }
    embedded_devices(device)
        .map(classify_tree)
        .find(|k| *k != DeviceKind::Other)
        .unwrap_or(DeviceKind::Other)
}

fn collect_services(
    device: &Element,
    base: &str,
    services: &mut BTreeMap<ServiceKind, ServiceEndpoint>,
) {
    if let Some(list) = child(device, "serviceList") {
        for service in children(list, "service") {
            let Some(service_type) = child_text(service, "serviceType") else {
                continue;
            };
            let Some(kind) = ServiceKind::from_service_type(&service_type) else {
                trace!(service_type = %service_type, "Ignoring unknown service");
                continue;
            };
            let Some(control_url) = child_text(service, "controlURL") else {
                debug!(service_type = %service_type, "Service without controlURL");
                continue;
            };

            services.entry(kind).or_insert_with(|| ServiceEndpoint {
                service_type,
                control_url: resolve_url(base, &control_url),
                event_sub_url: child_text(service, "eventSubURL").map(|u| resolve_url(base, &u)),
            });
        }
    }

    for embedded in embedded_devices(device) {
        collect_services(embedded, base, services);
    }
}

fn collect_icons(device: &Element, base: &str) -> Vec<Icon> {
    let Some(list) = child(device, "iconList") else {
        return Vec::new();
    };

    children(list, "icon")
        .filter_map(|icon| {
            let url = child_text(icon, "url")?;
            Some(Icon {
                mime_type: child_text(icon, "mimetype").unwrap_or_default(),
                width: child_number(icon, "width"),
                height: child_number(icon, "height"),
                url: resolve_url(base, &url),
            })
        })
        .collect()
}

/// Largest PNG, else the largest icon, else the first one.
fn choose_icon(icons: &[Icon]) -> Option<&Icon> {
    let pngs = icons
        .iter()
        .filter(|i| i.mime_type.eq_ignore_ascii_case("image/png"));
    largest(pngs).or_else(|| largest(icons.iter()))
}

// Ties keep the earliest icon.
fn largest<'a>(icons: impl Iterator<Item = &'a Icon>) -> Option<&'a Icon> {
    let mut best: Option<&Icon> = None;
    for icon in icons {
        if best.is_none_or(|b| icon.area() > b.area()) {
            best = Some(icon);
        }
    }
    best
}

fn embedded_devices(device: &Element) -> impl Iterator<Item = &Element> {
    child(device, "deviceList")
        .into_iter()
        .flat_map(|list| children(list, "device"))
}

fn child<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    children(parent, name).next()
}

fn children<'a, 'n>(parent: &'a Element, name: &'n str) -> impl Iterator<Item = &'a Element> {
    parent.children.iter().filter_map(move |node| match node {
        XMLNode::Element(e) if e.name == name => Some(e),
        _ => None,
    })
}

fn child_text(parent: &Element, name: &str) -> Option<String> {
    let text = child(parent, name)?.get_text()?;
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn child_number(parent: &Element, name: &str) -> u32 {
    child_text(parent, name)
        .and_then(|t| t.parse().ok())
        .unwrap_or(0)
}
