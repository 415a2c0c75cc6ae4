//! URL helper functions

use lazy_static::lazy_static;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use std::collections::HashSet;

use crate::config::SiteConfig;
use crate::error::UnresolvedAsset;

/// Characters escaped inside a single path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

lazy_static! {
    static ref SCHEME: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").unwrap();
}

/// Generate a URL with the root path
///
/// # Examples
/// ```ignore
/// url_for(&config, "/css/style.css") // -> "/blog/css/style.css"
/// ```
pub fn url_for(config: &SiteConfig, path: &str) -> String {
    let root = config.root.trim_end_matches('/');
    let path = path.trim_start_matches('/');

    if path.is_empty() {
        format!("{}/", root)
    } else {
        format!("{}/{}", root, path)
    }
}

/// Generate a full URL including the domain
///
/// # Examples
/// ```ignore
/// full_url_for(&config, "/about/") // -> "https://example.com/blog/about/"
/// ```
pub fn full_url_for(config: &SiteConfig, path: &str) -> String {
    let base = config.url.trim_end_matches('/');
    format!("{}{}", base, url_for(config, path))
}

/// Resolves link and image references against the site's base path.
///
/// When built with a set of known assets, image references must name one of
/// them; links are only checked for shape since they usually point at pages.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    base: String,
    known: Option<HashSet<String>>,
}

impl AssetResolver {
    pub fn new(base_path: &str) -> Self {
        let trimmed = base_path.trim_matches('/');
        let base = if trimmed.is_empty() {
            "/".to_string()
        } else {
            format!("/{}/", trimmed)
        };
        Self { base, known: None }
    }

    /// Known asset paths, relative to the site root (`images/a.png`)
    pub fn with_known_assets<I>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        self.known = Some(
            assets
                .into_iter()
                .map(|a| a.trim_start_matches('/').to_string())
                .collect(),
        );
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Resolve a reference to a URL under the base path
    pub fn resolve(&self, reference: &str, image: bool) -> Result<String, UnresolvedAsset> {
        let unresolved = |reason: &str| UnresolvedAsset {
            reference: reference.to_string(),
            image,
            reason: reason.to_string(),
        };

        let trimmed = reference.trim();
        if trimmed.is_empty() {
            return Err(unresolved("empty reference"));
        }
        if trimmed.starts_with('#') || trimmed.starts_with("//") || SCHEME.is_match(trimmed) {
            return Ok(trimmed.to_string());
        }

        let (path, suffix) = match trimmed.find(['?', '#']) {
            Some(pos) => trimmed.split_at(pos),
            None => (trimmed, ""),
        };

        let mut segments: Vec<String> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if segments.pop().is_none() {
                        return Err(unresolved("climbs above the base path"));
                    }
                }
                s => segments.push(percent_decode_str(s).decode_utf8_lossy().into_owned()),
            }
        }

        let relative = segments.join("/");
        if image {
            if let Some(known) = &self.known {
                if !known.contains(&relative) {
                    return Err(unresolved("no such asset"));
                }
            }
        }

        let mut url = self.base.clone();
        url.push_str(
            &segments
                .iter()
                .map(|s| utf8_percent_encode(s, PATH_SEGMENT).to_string())
                .collect::<Vec<_>>()
                .join("/"),
        );
        if path.ends_with('/') && !segments.is_empty() {
            url.push('/');
        }
        url.push_str(suffix);
        Ok(url)
    }
}
