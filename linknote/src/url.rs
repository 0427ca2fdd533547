//! URL utilities.
use url::Url;

/// Normalize a link url so that it always carries an explicit scheme.
///
/// Urls that already parse with an `http` or `https` scheme are returned as typed (trimmed),
/// everything else gets `http://` prepended.
/// Normalizing twice gives the same result as normalizing once.
pub fn format_url(link: &str) -> String {
    let link = link.trim();
    match Url::parse(link) {
        Ok(u) if matches!(u.scheme(), "http" | "https") => link.to_owned(),
        // Unparsable, but already prefixed (e.g. `http://` alone)
        _ if has_http_prefix(link) => link.to_owned(),
        _ => format!("http://{}", link),
    }
}

fn has_http_prefix(link: &str) -> bool {
    let lower = link.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
