//! Parsing SOAP responses

use std::io::BufReader;

use xmltree::Element;

use super::envelope::{element_text, find_child, local_name};
use super::{SoapBody, SoapEnvelope, SoapError, parse_soap_fault};

/// Output arguments of one action response (`<u:ActionResponse>`).
#[derive(Debug, Clone)]
pub struct SoapActionResponse {
    /// Name of the response element, without prefix (e.g. "BrowseResponse")
    pub name: String,

    /// Output arguments in document order
    pub args: Vec<(String, String)>,
}

impl SoapActionResponse {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parses a complete SOAP envelope.
pub fn parse_soap_envelope(xml: &[u8]) -> Result<SoapEnvelope, SoapError> {
    let reader = BufReader::new(xml);
    let root = Element::parse(reader)?;

    if local_name(&root.name) != "Envelope" {
        return Err(SoapError::MissingEnvelope);
    }

    let body_elem = find_child(&root, "Body").ok_or(SoapError::MissingBody)?;

    Ok(SoapEnvelope {
        body: SoapBody {
            content: body_elem.clone(),
        },
    })
}

/// Parses an action response and collects its output arguments.
///
/// A body carrying a Fault is reported as [`SoapError::Fault`].
pub fn parse_action_response(xml: &str) -> Result<SoapActionResponse, SoapError> {
    let envelope = parse_soap_envelope(xml.as_bytes())?;

    if let Some(fault) = parse_soap_fault(&envelope) {
        return Err(SoapError::Fault(fault));
    }

    let response = envelope.body.first_element().ok_or(SoapError::NoAction)?;

    let args = response
        .children
        .iter()
        .filter_map(|n| n.as_element())
        .map(|e| (local_name(&e.name).to_string(), element_text(e)))
        .collect();

    Ok(SoapActionResponse {
        name: local_name(&response.name).to_string(),
        args,
    })
}

/// Extracts the raw text of one output argument.
///
/// The returned text is unescaped once: a `Result` argument holding an
/// escaped DIDL-Lite document comes back as the document itself, ready for
/// a second parse.
pub fn decode(response_text: &str, result_field: &str) -> Result<String, SoapError> {
    let response = parse_action_response(response_text)?;
    response
        .get(result_field)
        .map(str::to_string)
        .ok_or_else(|| SoapError::MissingField {
            action: response.name.clone(),
            field: result_field.to_string(),
        })
}
