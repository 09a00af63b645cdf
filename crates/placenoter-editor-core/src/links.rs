//! URL validation for the link dialog and quick links.

use url::Url;

/// State of a URL text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlInput {
    /// Nothing typed yet. Not an error, but there is nothing to apply.
    Empty,
    Valid,
    Invalid,
}

impl UrlInput {
    pub fn of(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            UrlInput::Empty
        } else if is_valid_url(trimmed) {
            UrlInput::Valid
        } else {
            UrlInput::Invalid
        }
    }

    /// Whether the field should be shown as an error.
    pub fn is_error(&self) -> bool {
        matches!(self, UrlInput::Invalid)
    }

    /// Whether the submit action is enabled.
    pub fn can_submit(&self) -> bool {
        matches!(self, UrlInput::Valid)
    }
}

/// Accepts absolute web/mail URLs and bare domains such as `example.com/a`.
pub fn is_valid_url(input: &str) -> bool {
    let s = input.trim();
    if s.is_empty() || s.chars().any(char::is_whitespace) {
        return false;
    }
    if let Ok(url) = Url::parse(s) {
        match url.scheme() {
            "http" | "https" | "ftp" => {
                return url.host_str().is_some_and(is_plausible_host);
            }
            "mailto" => return url.path().contains('@'),
            _ => {}
        }
    }
    Url::parse(&format!("https://{s}"))
        .ok()
        .and_then(|url| url.host_str().map(is_plausible_host))
        .unwrap_or(false)
}

fn is_plausible_host(host: &str) -> bool {
    if host == "localhost" || host.starts_with('[') || host.parse::<std::net::Ipv4Addr>().is_ok() {
        return true;
    }
    let Some((name, tld)) = host.rsplit_once('.') else {
        return false;
    };
    !name.is_empty() && tld.len() >= 2 && tld.chars().all(|c| c.is_alphabetic())
}
