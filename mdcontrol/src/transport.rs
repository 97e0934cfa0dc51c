//! HTTP transport used for description downloads and SOAP actions.
//!
//! Everything above this module talks to an [`HttpTransport`], so tests can
//! swap the network for a scripted fake.

use std::time::Duration;

use mdupnp::soap::{parse_soap_envelope, parse_soap_fault};
use tracing::{debug, warn};
use ureq::Agent;

use crate::errors::ControlPointError;

/// Minimal HTTP client needed by the control point.
pub trait HttpTransport: Send + Sync {
    /// GET `url` and return the body of a 2xx response.
    fn get_text(&self, url: &str) -> Result<String, ControlPointError>;

    /// POST a SOAP envelope to `endpoint` and return the body of a 2xx response.
    ///
    /// `soap_action` is the complete header value, quotes included.
    fn post_action(
        &self,
        endpoint: &str,
        soap_action: &str,
        body: String,
    ) -> Result<String, ControlPointError>;
}

/// [`HttpTransport`] backed by a ureq agent.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        // 4xx/5xx are read like any other response so that SOAP fault bodies
        // can be reported.
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: config.into(),
        }
    }

    pub fn from_config(config: &mdconfig::HttpSettings) -> Self {
        Self::new(config.timeout())
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl HttpTransport for UreqTransport {
    fn get_text(&self, url: &str) -> Result<String, ControlPointError> {
        debug!(url = url, "HTTP GET");

        let mut response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| ControlPointError::transport(format!("GET {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ControlPointError::transport(format!("reading {} failed: {}", url, e)))?;

        if !(200..300).contains(&status) {
            return Err(ControlPointError::transport(format!(
                "GET {} returned HTTP status {}",
                url, status
            )));
        }
        Ok(body)
    }

    fn post_action(
        &self,
        endpoint: &str,
        soap_action: &str,
        body: String,
    ) -> Result<String, ControlPointError> {
        debug!(endpoint = endpoint, soap_action = soap_action, "SOAP POST");

        let mut response = self
            .agent
            .post(endpoint)
            .header("Content-Type", r#"text/xml; charset="utf-8""#)
            .header("SOAPAction", soap_action)
            .send(body)
            .map_err(|e| {
                ControlPointError::transport(format!("POST {} failed: {}", endpoint, e))
            })?;

        let status = response.status().as_u16();
        let text = response.body_mut().read_to_string().map_err(|e| {
            ControlPointError::transport(format!("reading response of {} failed: {}", endpoint, e))
        })?;

        if !(200..300).contains(&status) {
            let message = describe_failure(soap_action, status, &text);
            warn!(endpoint = endpoint, status = status, "{}", message);
            return Err(ControlPointError::TransportError(message));
        }
        Ok(text)
    }
}

/// Human readable reason of a failed action, including the UPnP error carried
/// by a SOAP Fault body when there is one.
pub fn describe_failure(soap_action: &str, status: u16, body: &str) -> String {
    let action = soap_action.trim_matches('"');
    let fault = parse_soap_envelope(body.as_bytes())
        .ok()
        .and_then(|envelope| parse_soap_fault(&envelope));

    match fault {
        Some(fault) => format!("{} failed with HTTP status {}: {}", action, status, fault),
        None => format!("{} failed with HTTP status {}", action, status),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAULT: &str = r#"<?xml version="1.0"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <s:Fault>
      <faultcode>s:Client</faultcode>
      <faultstring>UPnPError</faultstring>
      <detail>
        <UPnPError xmlns="urn:schemas-upnp-org:control-1-0">
          <errorCode>714</errorCode>
          <errorDescription>Illegal MIME-type</errorDescription>
        </UPnPError>
      </detail>
    </s:Fault>
  </s:Body>
</s:Envelope>"#;

    #[test]
    fn test_failure_includes_upnp_error() {
        let msg = describe_failure(
            "\"urn:schemas-upnp-org:service:AVTransport:1#SetAVTransportURI\"",
            500,
            FAULT,
        );
        assert!(msg.contains("SetAVTransportURI"));
        assert!(msg.contains("500"));
        assert!(msg.contains("714"));
        assert!(msg.contains("Illegal MIME-type"));
    }

    #[test]
    fn test_failure_names_standard_error_code() {
        let body = FAULT
            .replace("<errorCode>714</errorCode>", "<errorCode>401</errorCode>")
            .replace("<errorDescription>Illegal MIME-type</errorDescription>", "");
        let msg = describe_failure("\"urn:x#Seek\"", 500, &body);
        assert_eq!(
            msg,
            "urn:x#Seek failed with HTTP status 500: UPnP error 401: Invalid Action"
        );
    }

    #[test]
    fn test_failure_without_soap_body() {
        let msg = describe_failure("\"urn:x#Play\"", 404, "<html>not found</html>");
        assert_eq!(msg, "urn:x#Play failed with HTTP status 404");
    }
}
