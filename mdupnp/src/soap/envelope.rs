//! SOAP envelope structures

use xmltree::{Element, XMLNode};

/// SOAP envelope as seen by the control point: only the body is kept.
#[derive(Debug, Clone)]
pub struct SoapEnvelope {
    /// SOAP body holding the action, the response or a fault
    pub body: SoapBody,
}

/// SOAP body
#[derive(Debug, Clone)]
pub struct SoapBody {
    pub content: Element,
}

impl SoapBody {
    /// First element child of the body: the action, its response, or a Fault.
    pub fn first_element(&self) -> Option<&Element> {
        self.content.children.iter().find_map(|n| n.as_element())
    }
}

/// Finds the first direct child whose local name is `name`.
///
/// Prefixes are ignored: `u:BrowseResponse` and `BrowseResponse` both match
/// `"BrowseResponse"`.
pub(crate) fn find_child<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent.children.iter().find_map(|node| match node {
        XMLNode::Element(elem) if local_name(&elem.name) == name => Some(elem),
        _ => None,
    })
}

pub(crate) fn local_name(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

pub(crate) fn element_text(elem: &Element) -> String {
    elem.get_text()
        .map(|t| t.into_owned())
        .unwrap_or_default()
}
