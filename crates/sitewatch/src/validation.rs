//! Validation of add requests before a site reaches the registry.

use url::Url;

use crate::error::{MonitorError, Result};

/// Validate a site's display name and URL
pub fn validate_site(name: &str, url: &str) -> Result<()> {
    validate_name(name)?;
    validate_url(url)
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(MonitorError::InvalidSite("site name must not be empty".into()));
    }
    Ok(())
}

/// Only absolute http(s) URLs with a host can be checked
fn validate_url(url: &str) -> Result<()> {
    let parsed = Url::parse(url)
        .map_err(|e| MonitorError::InvalidSite(format!("invalid URL {url}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => {}
        other => {
            return Err(MonitorError::InvalidSite(format!("unsupported URL scheme: {other}")));
        }
    }

    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(MonitorError::InvalidSite(format!("URL has no host: {url}")));
    }

    Ok(())
}
