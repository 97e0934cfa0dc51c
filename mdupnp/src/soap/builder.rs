//! Building SOAP requests

use xmltree::{Element, XMLNode};

use super::{SOAP_ENCODING_STYLE, SOAP_ENVELOPE_NS, SoapError};

fn build_soap_envelope_with_body(body_child: Element) -> Result<String, SoapError> {
    let mut body = Element::new("s:Body");
    body.children.push(XMLNode::Element(body_child));

    let mut envelope = Element::new("s:Envelope");
    envelope
        .attributes
        .insert("xmlns:s".to_string(), SOAP_ENVELOPE_NS.to_string());
    envelope
        .attributes
        .insert("s:encodingStyle".to_string(), SOAP_ENCODING_STYLE.to_string());
    envelope.children.push(XMLNode::Element(body));

    let mut buf = Vec::new();
    let config = xmltree::EmitterConfig::new()
        .write_document_declaration(true)
        .perform_indent(true)
        .indent_string("  ");
    envelope.write_with_config(&mut buf, config)?;

    Ok(String::from_utf8(buf)?)
}

/// Builds the request envelope for one UPnP action.
///
/// # Arguments
///
/// * `action` - action name (e.g. "Browse")
/// * `namespace` - service URN (e.g. "urn:schemas-upnp-org:service:ContentDirectory:1")
/// * `params` - ordered (name, value) input arguments
///
/// Values are written as character data: `<`, `>` and `&` are escaped by the
/// emitter. A value holding markup (DIDL-Lite metadata) therefore travels as an
/// escaped document that the receiver decodes a second time.
pub fn encode(action: &str, namespace: &str, params: &[(&str, &str)]) -> Result<String, SoapError> {
    let request_name = format!("u:{}", action);
    let mut request_elem = Element::new(&request_name);
    request_elem
        .attributes
        .insert("xmlns:u".to_string(), namespace.to_string());

    for (name, value) in params {
        let mut child = Element::new(name);
        if !value.is_empty() {
            child.children.push(XMLNode::Text((*value).to_string()));
        }
        request_elem.children.push(XMLNode::Element(child));
    }

    build_soap_envelope_with_body(request_elem)
}

/// Value of the `SOAPAction` HTTP header: the quoted `urn#Action` pair.
pub fn soap_action_header(service_urn: &str, action: &str) -> String {
    format!(r#""{}#{}""#, service_urn, action)
}
