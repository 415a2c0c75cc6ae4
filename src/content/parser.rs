//! Document parser: raw text in, validated [`Post`] out

use chrono_tz::Tz;
use indexmap::IndexSet;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

use super::blocks::parse_blocks;
use super::{FrontMatter, MarkdownRenderer, Post};
use crate::error::{Error, Result};

lazy_static! {
    /// `2023-08-27-fargate.md` style filenames
    static ref DATE_PREFIX: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}[-_]").unwrap();
}

/// Parse one document.
///
/// Fails with [`Error::MalformedFrontMatter`] when the metadata block is
/// missing or unparseable, or lacks a non-empty `title` or a valid `date`.
pub fn parse_post(source_id: &str, text: &str, tz: Tz) -> Result<Post> {
    let (fm, body) = FrontMatter::parse(source_id, text)?;

    let title = match fm.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        Some(_) => return Err(Error::malformed(source_id, "title is empty")),
        None => return Err(Error::malformed(source_id, "missing required field 'title'")),
    };

    let date = match fm.date.as_deref() {
        None => return Err(Error::malformed(source_id, "missing required field 'date'")),
        Some(raw) => fm
            .parse_date(tz)
            .ok_or_else(|| Error::malformed(source_id, format!("unparseable date '{}'", raw)))?,
    };

    let updated = match fm.updated.as_deref() {
        Some(raw) => Some(fm.parse_updated(tz).ok_or_else(|| {
            Error::malformed(source_id, format!("unparseable updated date '{}'", raw))
        })?),
        None => None,
    };

    let tags: IndexSet<String> = fm
        .tags
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    let (excerpt, _) = MarkdownRenderer::split_excerpt(body);

    Ok(Post {
        id: source_id.to_string(),
        slug: slug_for(source_id, &title),
        title,
        date,
        updated,
        tags,
        description: fm.description.filter(|d| !d.trim().is_empty()),
        body: parse_blocks(body),
        raw: body.to_string(),
        excerpt,
        path: String::new(),
        draft: !fm.published,
        extra: fm.extra,
    })
}

/// Slug from the file name (minus any date prefix), falling back to the title
fn slug_for(source_id: &str, title: &str) -> String {
    let stem = Path::new(source_id)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let stem = DATE_PREFIX.replace(stem, "");
    let slug = slug::slugify(stem.as_ref());
    if slug.is_empty() {
        slug::slugify(title)
    } else {
        slug
    }
}
