//! Index builder - read-only views over the post collection
//!
//! The index borrows the posts it is built from and never mutates them.
//! Rebuild it whenever the collection changes.

use chrono::Datelike;
use indexmap::IndexMap;
use serde_json::json;

use crate::content::Post;

/// Date-ordered list plus tag grouping of a post collection
#[derive(Debug, Clone)]
pub struct SiteIndex<'a> {
    ordered: Vec<&'a Post>,
    tags: IndexMap<&'a str, Vec<&'a Post>>,
}

impl<'a> SiteIndex<'a> {
    /// Build the index.
    ///
    /// Posts are ordered newest first; posts with equal dates keep their
    /// input order. Tags appear in first-seen order of that list and each
    /// tag lists its posts newest first.
    pub fn build(posts: &'a [Post]) -> Self {
        let mut ordered: Vec<&Post> = posts.iter().collect();
        // sort_by is stable
        ordered.sort_by(|a, b| b.date.cmp(&a.date));

        let mut tags: IndexMap<&str, Vec<&Post>> = IndexMap::new();
        for &post in &ordered {
            for tag in &post.tags {
                tags.entry(tag.as_str()).or_default().push(post);
            }
        }

        Self { ordered, tags }
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Posts, newest first
    pub fn ordered(&self) -> &[&'a Post] {
        &self.ordered
    }

    pub fn tags(&self) -> &IndexMap<&'a str, Vec<&'a Post>> {
        &self.tags
    }

    /// Posts declaring `tag`, newest first
    pub fn posts_tagged(&self, tag: &str) -> &[&'a Post] {
        self.tags.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Identifiers of the posts declaring `tag`
    pub fn tag_ids(&self, tag: &str) -> Vec<&'a str> {
        self.posts_tagged(tag)
            .iter()
            .map(|&p| p.id.as_str())
            .collect()
    }

    /// Posts grouped by year, newest year first
    pub fn archives(&self) -> Vec<(i32, Vec<&'a Post>)> {
        let mut years: Vec<(i32, Vec<&'a Post>)> = Vec::new();
        for &post in &self.ordered {
            let year = post.date.year();
            match years.last_mut() {
                Some((y, posts)) if *y == year => posts.push(post),
                _ => years.push((year, vec![post])),
            }
        }
        years
    }

    /// Split the ordered list into pages of `per_page`.
    ///
    /// Always yields at least one (possibly empty) page.
    pub fn pages(&self, per_page: usize) -> Vec<&[&'a Post]> {
        let per_page = per_page.max(1);
        if self.ordered.is_empty() {
            return vec![&self.ordered[..]];
        }
        self.ordered.chunks(per_page).collect()
    }

    /// JSON view: ordered post summaries and the tag -> ids mapping
    pub fn to_json(&self, url_for: impl Fn(&str) -> String) -> serde_json::Value {
        let posts: Vec<serde_json::Value> = self
            .ordered
            .iter()
            .map(|p| {
                json!({
                    "id": p.id,
                    "title": p.title,
                    "date": p.date.to_rfc3339(),
                    "tags": p.tags,
                    "description": p.description,
                    "summary": p.summary(),
                    "url": url_for(&p.path),
                    "languages": p.code_languages(),
                })
            })
            .collect();

        let tags: serde_json::Map<String, serde_json::Value> = self
            .tags
            .keys()
            .map(|tag| (tag.to_string(), json!(self.tag_ids(tag))))
            .collect();

        json!({ "posts": posts, "tags": tags })
    }
}
