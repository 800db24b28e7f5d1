//! Site and section values
//!
//! A [`Site`] is built once per run from the target URL and download
//! directory and never changes afterwards. Every reconciliation function
//! takes it by reference together with the [`Section`] it works on.

mod domain;

pub use domain::{bare_domain, domain_variants, extract_domain};

use crate::UrlError;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Immutable description of the site being archived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Site {
    base_url: String,
    domain: String,
    host: String,
    download_dir: PathBuf,
}

impl Site {
    /// Builds a site from its URL and the local download root
    ///
    /// Only the scheme and network location of `url` are kept.
    ///
    /// # Examples
    ///
    /// ```
    /// use site_backup::Site;
    ///
    /// let site = Site::new("https://www.example.com/some/page", "mirror").unwrap();
    /// assert_eq!(site.base_url(), "https://www.example.com");
    /// assert_eq!(site.domain(), "www.example.com");
    /// ```
    pub fn new(url: &str, download_dir: impl Into<PathBuf>) -> Result<Self, UrlError> {
        let parsed = Url::parse(url)?;

        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(UrlError::InvalidScheme(parsed.scheme().to_string()));
        }

        let domain = extract_domain(&parsed).ok_or(UrlError::MissingDomain)?;
        let host = parsed.host_str().ok_or(UrlError::MissingDomain)?.to_lowercase();

        Ok(Self {
            base_url: format!("{}://{}", parsed.scheme(), domain),
            domain,
            host,
            download_dir: download_dir.into(),
        })
    }

    /// `scheme://host[:port]`, without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Host with optional port, lowercase
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Root directory the mirror is written under
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Hostnames passed to wget's `--domains`, bare and `www.`-prefixed
    pub fn host_variants(&self) -> [String; 2] {
        domain_variants(&self.host)
    }

    /// Local directories a mirror of this site may have produced
    pub fn mirror_roots(&self) -> [PathBuf; 2] {
        domain_variants(&self.domain).map(|variant| self.download_dir.join(variant))
    }

    /// `<base>/<section>/`
    pub fn section_index_url(&self, section: &Section) -> String {
        format!("{}/{}/", self.base_url, section.name())
    }

    /// `<base>/<section>/node/<id>`
    pub fn node_url(&self, section: &Section, id: u64) -> String {
        format!("{}/{}/node/{}", self.base_url, section.name(), id)
    }

    /// `<base>/<section>/?page=<page>`
    pub fn page_url(&self, section: &Section, page: u32) -> String {
        format!("{}/{}/?page={}", self.base_url, section.name(), page)
    }

    /// `<base>/<path>` for a site-relative path
    pub fn path_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

/// A path segment under which sequentially numbered nodes live
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Section {
    name: String,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Site-relative node directory, `<section>/node`
    pub fn node_dir(&self) -> PathBuf {
        Path::new(&self.name).join("node")
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/node/", self.name)
    }
}
