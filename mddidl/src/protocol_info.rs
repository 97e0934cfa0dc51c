/// Parsed `protocolInfo` attribute: `protocol:network:contentFormat:additionalInfo`.
///
/// Example: `http-get:*:video/mp4:DLNA.ORG_PN=AVC_MP4_BL_CIF15_AAC_520`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProtocolInfo {
    pub protocol: String,
    pub network: String,
    pub content_format: String,
    pub additional_info: String,
}

impl ProtocolInfo {
    /// Splits on the first three colons; missing fields are left empty.
    pub fn parse(value: &str) -> Self {
        let mut parts = value.trim().splitn(4, ':');
        let mut next = || parts.next().unwrap_or_default().trim().to_string();
        Self {
            protocol: next(),
            network: next(),
            content_format: next(),
            additional_info: next(),
        }
    }

    /// MIME type from the content-format field, `None` for wildcards.
    pub fn mime_type(&self) -> Option<&str> {
        match self.content_format.as_str() {
            "" | "*" => None,
            mime => Some(mime),
        }
    }
}
