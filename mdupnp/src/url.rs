/// Resolves a possibly relative URL found in a device description.
///
/// - An absolute URL (`http://...`, `https://...`) is returned as-is.
/// - A path starting with `/` is resolved against `scheme://host[:port]` of `base`.
/// - Any other relative path is resolved against the directory of `base`.
///
/// The authority of `base` is kept verbatim, explicit default ports included:
/// `"/icon.png"` against `http://10.0.0.5:80/desc.xml` gives
/// `http://10.0.0.5:80/icon.png`. `.` and `..` segments of the resulting path
/// are collapsed.
pub fn resolve_url(base: &str, relative: &str) -> String {
    let relative = relative.trim();
    if relative.is_empty() {
        return base.to_string();
    }

    let lower = relative.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return relative.to_string();
    }

    let Some((scheme, rest)) = base.split_once("://") else {
        return relative.to_string();
    };

    if let Some(network_path) = relative.strip_prefix("//") {
        return format!("{}://{}", scheme, network_path);
    }

    let (authority, path) = match rest.find('/') {
        Some(pos) => (&rest[..pos], &rest[pos..]),
        None => (rest, "/"),
    };

    if relative.starts_with('/') {
        return format!("{}://{}{}", scheme, authority, remove_dot_segments(relative));
    }

    let path = path.split(['?', '#']).next().unwrap_or("/");
    let dir = match path.rfind('/') {
        Some(pos) => &path[..=pos],
        None => "/",
    };

    let joined = format!("{}{}", dir, relative);
    format!("{}://{}{}", scheme, authority, remove_dot_segments(&joined))
}

/// Collapses `.` and `..` in an absolute path; query and fragment are kept as-is.
fn remove_dot_segments(path: &str) -> String {
    let (path, suffix) = match path.find(['?', '#']) {
        Some(pos) => path.split_at(pos),
        None => (path, ""),
    };

    let segments: Vec<&str> = path.split('/').skip(1).collect();
    let last = segments.len().saturating_sub(1);
    let mut out: Vec<&str> = Vec::with_capacity(segments.len());

    for (i, segment) in segments.iter().enumerate() {
        match *segment {
            "." => {}
            ".." => {
                out.pop();
            }
            other => {
                out.push(other);
                continue;
            }
        }
        // a trailing dot segment still names a directory
        if i == last {
            out.push("");
        }
    }

    format!("/{}{}", out.join("/"), suffix)
}
