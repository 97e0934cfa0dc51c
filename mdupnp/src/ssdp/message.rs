use std::collections::HashMap;

use tracing::trace;

use super::MAX_AGE;

/// SSDP messages a control point cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SsdpMessage {
    /// Unicast `HTTP/1.1 200 OK` reply to our M-SEARCH
    SearchResponse {
        usn: String,
        st: String,
        location: String,
        server: Option<String>,
        max_age: u32,
    },
    /// Multicast `NOTIFY` with `NTS: ssdp:alive`
    Alive {
        usn: String,
        nt: String,
        location: String,
        server: Option<String>,
        max_age: u32,
    },
    /// Multicast `NOTIFY` with `NTS: ssdp:byebye`
    ByeBye { usn: String, nt: String },
}

impl SsdpMessage {
    pub fn usn(&self) -> &str {
        match self {
            SsdpMessage::SearchResponse { usn, .. }
            | SsdpMessage::Alive { usn, .. }
            | SsdpMessage::ByeBye { usn, .. } => usn,
        }
    }

    /// Description URL, absent for byebye notifications.
    pub fn location(&self) -> Option<&str> {
        match self {
            SsdpMessage::SearchResponse { location, .. } | SsdpMessage::Alive { location, .. } => {
                Some(location)
            }
            SsdpMessage::ByeBye { .. } => None,
        }
    }

    pub fn server(&self) -> Option<&str> {
        match self {
            SsdpMessage::SearchResponse { server, .. } | SsdpMessage::Alive { server, .. } => {
                server.as_deref()
            }
            SsdpMessage::ByeBye { .. } => None,
        }
    }

    pub fn max_age(&self) -> u32 {
        match self {
            SsdpMessage::SearchResponse { max_age, .. } | SsdpMessage::Alive { max_age, .. } => {
                *max_age
            }
            SsdpMessage::ByeBye { .. } => 0,
        }
    }
}

/// Parses one SSDP datagram.
///
/// Returns `None` for M-SEARCH requests from other control points, unknown
/// message types, and messages missing `USN` or `LOCATION`.
pub fn parse_message(data: &str) -> Option<SsdpMessage> {
    let mut lines = data.lines();
    let first_line = lines.next()?.trim();
    let upper = first_line.to_ascii_uppercase();
    let headers = parse_headers(lines);

    if upper.starts_with("HTTP/") && upper.contains(" 200") {
        handle_search_response(&headers)
    } else if upper.starts_with("NOTIFY ") {
        handle_notify(&headers)
    } else {
        trace!("Ignoring SSDP message: {}", first_line);
        None
    }
}

fn handle_search_response(headers: &HashMap<String, String>) -> Option<SsdpMessage> {
    let usn = headers.get("USN")?.to_string();
    let location = headers.get("LOCATION")?.to_string();
    let st = headers.get("ST").cloned().unwrap_or_default();

    Some(SsdpMessage::SearchResponse {
        usn,
        st,
        location,
        server: headers.get("SERVER").cloned(),
        max_age: parse_max_age(headers.get("CACHE-CONTROL")),
    })
}

fn handle_notify(headers: &HashMap<String, String>) -> Option<SsdpMessage> {
    let nts = headers.get("NTS")?.to_ascii_lowercase();
    let usn = headers.get("USN")?.to_string();
    let nt = headers.get("NT").cloned().unwrap_or_default();

    match nts.as_str() {
        "ssdp:alive" => Some(SsdpMessage::Alive {
            usn,
            nt,
            location: headers.get("LOCATION")?.to_string(),
            server: headers.get("SERVER").cloned(),
            max_age: parse_max_age(headers.get("CACHE-CONTROL")),
        }),
        "ssdp:byebye" => Some(SsdpMessage::ByeBye { usn, nt }),
        _ => {
            trace!("Unknown NTS value: {}", nts);
            None
        }
    }
}

fn parse_headers<'a, I>(lines: I) -> HashMap<String, String>
where
    I: Iterator<Item = &'a str>,
{
    let mut headers = HashMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            break;
        }

        // Values may contain ':' (URLs), split on the first one only
        let Some((name, value)) = line.split_once(':') else {
            trace!("Skipping line without colon: '{}'", line);
            continue;
        };

        let name = name.trim().to_ascii_uppercase();
        let value = value.trim();
        if !name.is_empty() && !value.is_empty() {
            headers.insert(name, value.to_string());
        }
    }
    headers
}

fn parse_max_age(value: Option<&String>) -> u32 {
    let Some(v) = value else {
        return MAX_AGE;
    };

    let lower = v.to_ascii_lowercase();
    if let Some(idx) = lower.find("max-age") {
        let after_eq = lower[idx + 7..]
            .trim_start()
            .trim_start_matches('=')
            .trim_start();
        let digits: String = after_eq.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(age) = digits.parse::<u32>() {
            return age;
        }
    }
    MAX_AGE
}

/// Extracts the device identifier from a `USN` value.
///
/// `uuid:ABC123::urn:schemas-upnp-org:device:MediaServer:1` gives `ABC123`.
/// The identifier keeps its original case.
pub fn extract_uuid(usn: &str) -> Option<String> {
    let usn = usn.trim();
    let idx = usn.to_ascii_lowercase().find("uuid:")?;
    let rest = &usn[idx + "uuid:".len()..];
    let id = match rest.find("::") {
        Some(end) => &rest[..end],
        None => rest,
    };
    let id = id.trim();
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}
