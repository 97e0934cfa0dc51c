//! ContentDirectory browsing.
//!
//! A Browse response is decoded in two stages: the SOAP envelope first
//! (`MalformedResponse` on failure), then the DIDL-Lite document carried as
//! escaped text in its `Result` argument (`MalformedContent` on failure).

use std::sync::Arc;

use mddidl::{Container, DIDLLite, Item};
use mdupnp::soap::SoapActionResponse;
use tracing::{debug, warn};

use crate::errors::ControlPointError;
use crate::model::{BrowsePage, ContentKind, ContentNode, Device, PlayableInfo, ServiceKind};
use crate::soap_client::call_action;
use crate::transport::HttpTransport;

/// Object id of the root container of every ContentDirectory.
pub const ROOT_OBJECT_ID: &str = "0";

const BROWSE_DIRECT_CHILDREN: &str = "BrowseDirectChildren";
const BROWSE_METADATA: &str = "BrowseMetadata";

/// Lists the content of media servers.
#[derive(Clone)]
pub struct ContentBrowser {
    transport: Arc<dyn HttpTransport>,
    page_size: u32,
    max_pages: u32,
}

impl ContentBrowser {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self::with_settings(transport, &mdconfig::BrowseSettings::default())
    }

    pub fn with_settings(
        transport: Arc<dyn HttpTransport>,
        settings: &mdconfig::BrowseSettings,
    ) -> Self {
        Self {
            transport,
            page_size: settings.page_size.max(1),
            max_pages: settings.max_pages.max(1),
        }
    }

    /// Lists the direct children of `node_id` (the root when `None`).
    ///
    /// Pages are requested until the server reports no more entries, bounded
    /// by the configured page count.
    pub fn browse(
        &self,
        device: &Device,
        node_id: Option<&str>,
    ) -> Result<Vec<ContentNode>, ControlPointError> {
        self.browse_all(device, node_id.unwrap_or(ROOT_OBJECT_ID))
    }

    pub fn browse_all(
        &self,
        device: &Device,
        node_id: &str,
    ) -> Result<Vec<ContentNode>, ControlPointError> {
        let mut nodes = Vec::new();
        let mut start = 0u32;

        for _ in 0..self.max_pages {
            let page = self.browse_page(device, node_id, start, self.page_size)?;
            let returned = page.number_returned.max(page.nodes.len() as u32);
            nodes.extend(page.nodes);

            start = start.saturating_add(returned);
            // TotalMatches 0 means the server does not know the total
            let exhausted = page.total_matches > 0 && start >= page.total_matches;
            if returned == 0 || exhausted {
                return Ok(nodes);
            }
        }

        warn!(
            device = %device.display_name,
            node = node_id,
            entries = nodes.len(),
            "Browse stopped after the maximum number of pages"
        );
        Ok(nodes)
    }

    /// One Browse call with `BrowseDirectChildren`.
    pub fn browse_page(
        &self,
        device: &Device,
        node_id: &str,
        start: u32,
        count: u32,
    ) -> Result<BrowsePage, ControlPointError> {
        let response = self.invoke_browse(device, node_id, BROWSE_DIRECT_CHILDREN, start, count)?;
        let page = decode_browse_page(&response, node_id)?;
        debug!(
            device = %device.display_name,
            node = node_id,
            start = start,
            returned = page.number_returned,
            total = page.total_matches,
            "Browse page"
        );
        Ok(page)
    }

    /// The node `node_id` itself, via `BrowseMetadata`.
    pub fn browse_metadata(
        &self,
        device: &Device,
        node_id: &str,
    ) -> Result<Option<ContentNode>, ControlPointError> {
        let response = self.invoke_browse(device, node_id, BROWSE_METADATA, 0, 0)?;
        let page = decode_browse_page(&response, node_id)?;
        Ok(page.nodes.into_iter().next())
    }

    fn invoke_browse(
        &self,
        device: &Device,
        object_id: &str,
        browse_flag: &str,
        start: u32,
        count: u32,
    ) -> Result<SoapActionResponse, ControlPointError> {
        let start_str = start.to_string();
        let count_str = count.to_string();
        let args = [
            ("ObjectID", object_id),
            ("BrowseFlag", browse_flag),
            ("Filter", "*"),
            ("StartingIndex", start_str.as_str()),
            ("RequestedCount", count_str.as_str()),
            ("SortCriteria", ""),
        ];

        call_action(
            self.transport.as_ref(),
            device,
            ServiceKind::ContentDirectory,
            "Browse",
            &args,
        )
    }
}

/// Builds a page from the output arguments of a Browse response.
pub fn decode_browse_page(
    response: &SoapActionResponse,
    browsed_id: &str,
) -> Result<BrowsePage, ControlPointError> {
    let didl_xml = response.get("Result").ok_or_else(|| {
        ControlPointError::MalformedResponse(format!(
            "{} carries no Result argument",
            response.name
        ))
    })?;

    let nodes = map_didl_entries(didl_xml, browsed_id)?;
    let number = |name: &str| response.get(name).and_then(|v| v.trim().parse::<u32>().ok());

    Ok(BrowsePage {
        number_returned: number("NumberReturned").unwrap_or(nodes.len() as u32),
        total_matches: number("TotalMatches").unwrap_or(nodes.len() as u32),
        update_id: number("UpdateID"),
        nodes,
    })
}

/// Maps the DIDL-Lite `Result` document to content nodes, containers first.
pub fn map_didl_entries(
    didl_xml: &str,
    browsed_id: &str,
) -> Result<Vec<ContentNode>, ControlPointError> {
    if didl_xml.trim().is_empty() {
        return Ok(Vec::new());
    }

    let didl = DIDLLite::parse(didl_xml)?;
    let mut nodes = Vec::with_capacity(didl.containers.len() + didl.items.len());
    nodes.extend(didl.containers.iter().map(|c| container_node(c, browsed_id)));
    nodes.extend(didl.items.iter().map(|i| item_node(i, browsed_id)));
    Ok(nodes)
}

fn parent_or(parent_id: &str, browsed_id: &str) -> String {
    if parent_id.is_empty() {
        browsed_id.to_string()
    } else {
        parent_id.to_string()
    }
}

fn container_node(container: &Container, browsed_id: &str) -> ContentNode {
    ContentNode {
        id: container.id.clone(),
        parent_id: parent_or(&container.parent_id, browsed_id),
        title: container.title.clone(),
        kind: ContentKind::Container,
        class: container.class.clone(),
        child_count: container.child_count(),
        playable: None,
    }
}

fn item_node(item: &Item, browsed_id: &str) -> ContentNode {
    let resource = item.primary_resource();
    let playable = PlayableInfo {
        media_url: resource.map(|r| r.url.trim().to_string()),
        duration_text: resource.and_then(|r| r.duration.clone()),
        size_bytes: resource.and_then(|r| r.size_bytes()).unwrap_or(0),
        mime_type: resource
            .and_then(|r| r.protocol_info().mime_type().map(str::to_string)),
        album_art_url: item.album_art_uri().map(str::to_string),
    };

    ContentNode {
        id: item.id.clone(),
        parent_id: parent_or(&item.parent_id, browsed_id),
        title: item.title.clone(),
        kind: ContentKind::from_item_class(&item.class),
        class: item.class.clone(),
        child_count: None,
        playable: Some(playable),
    }
}
