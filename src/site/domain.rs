use url::Url;

/// Extracts the network location (host plus explicit port) from a URL
///
/// The host is lowercased. The port is kept because wget names its output
/// directory after the full network location.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_backup::site::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Strips a leading `www.` from a domain
pub fn bare_domain(domain: &str) -> &str {
    domain.strip_prefix("www.").unwrap_or(domain)
}

/// Returns the two directory layouts a mirror can produce for a domain:
/// the bare domain and its `www.`-prefixed variant
pub fn domain_variants(domain: &str) -> [String; 2] {
    let bare = bare_domain(domain);
    [bare.to_string(), format!("www.{}", bare)]
}
