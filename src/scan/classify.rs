use url::Url;

/// What a decoded payload looks like to the user.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanKind {
    /// An absolute `http` or `https` link.
    Url,
    Text,
}

pub fn classify(text: &str) -> ScanKind {
    match Url::parse(text) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => ScanKind::Url,
        _ => ScanKind::Text,
    }
}

pub fn is_url(text: &str) -> bool {
    classify(text) == ScanKind::Url
}
