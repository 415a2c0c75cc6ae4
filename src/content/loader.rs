//! Content loader - loads posts and assets from the source directory

use chrono_tz::Tz;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{parse_post, Post};
use crate::error::{Error, Result};
use crate::Site;

/// Outcome of loading every post
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Successfully parsed posts, in source path order
    pub posts: Vec<Post>,
    /// Documents that failed to parse; none of them are in `posts`
    pub failures: Vec<Error>,
    pub drafts_skipped: usize,
}

/// Loads content from the source directory
pub struct ContentLoader<'a> {
    site: &'a Site,
    exclude: Vec<glob::Pattern>,
    tz: Tz,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Result<Self> {
        let exclude = site
            .config
            .exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| Error::Config(format!("bad exclude pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;
        let tz = site.config.tz()?;
        Ok(Self { site, exclude, tz })
    }

    /// Load all posts from the posts directory.
    ///
    /// A document that fails to parse is recorded in the report and left
    /// out; only I/O on the directory itself aborts the load.
    pub fn load_posts(&self) -> Result<LoadReport> {
        let posts_dir = self.site.posts_dir();
        let mut report = LoadReport::default();
        if !posts_dir.exists() {
            tracing::warn!("Posts directory {:?} does not exist", posts_dir);
            return Ok(report);
        }

        for entry in WalkDir::new(&posts_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || !is_markdown_file(path) {
                continue;
            }
            let id = self.source_id(path);
            if self.is_excluded(&id) {
                tracing::debug!("Excluded: {}", id);
                continue;
            }

            match self.load_post(path, &id) {
                Ok(post) if post.draft && !self.site.config.render_drafts => {
                    tracing::debug!("Skipping draft: {}", id);
                    report.drafts_skipped += 1;
                }
                Ok(post) => report.posts.push(post),
                Err(e) => {
                    tracing::warn!("Failed to load post {}: {}", id, e);
                    report.failures.push(e);
                }
            }
        }

        assign_paths(&mut report.posts, &self.site.config.permalink);
        tracing::debug!(
            "Loaded {} posts ({} failed, {} drafts skipped)",
            report.posts.len(),
            report.failures.len(),
            report.drafts_skipped
        );

        Ok(report)
    }

    /// Load a single post from a file
    fn load_post(&self, path: &Path, id: &str) -> Result<Post> {
        let content = fs::read_to_string(path)?;
        parse_post(id, &content, self.tz)
    }

    /// Static files under the source directory, relative to it.
    ///
    /// Markdown files and anything below an `_`-prefixed directory are not
    /// assets.
    pub fn collect_assets(&self) -> Vec<String> {
        let source_dir = &self.site.source_dir;
        let mut assets = Vec::new();

        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || is_markdown_file(path) {
                continue;
            }
            let relative = self.source_id(path);
            let hidden = relative
                .split('/')
                .any(|c| c.starts_with('_') || c.starts_with('.'));
            if hidden || self.is_excluded(&relative) {
                continue;
            }
            assets.push(relative);
        }

        assets
    }

    fn source_id(&self, path: &Path) -> String {
        path.strip_prefix(&self.site.source_dir)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    fn is_excluded(&self, relative: &str) -> bool {
        self.exclude.iter().any(|p| p.matches(relative))
    }
}

/// Expand the permalink pattern for one post (relative to the site root)
pub fn permalink_path(pattern: &str, post: &Post) -> String {
    let date = &post.date;
    let result = pattern
        .replace(":year", &date.format("%Y").to_string())
        .replace(":month", &date.format("%m").to_string())
        .replace(":day", &date.format("%d").to_string())
        .replace(":i_month", &date.format("%-m").to_string())
        .replace(":i_day", &date.format("%-d").to_string())
        .replace(":title", &post.slug)
        .replace(":slug", &post.slug);

    let trimmed = result.trim_matches('/');
    format!("{}/", trimmed)
}

/// Give every post an output path, suffixing collisions instead of letting
/// one post overwrite another.
///
/// A suffixed path is also checked against the natural paths of the other
/// posts, so `fargate-2/` is never handed out twice.
pub fn assign_paths(posts: &mut [Post], pattern: &str) {
    let natural: Vec<String> = posts.iter().map(|p| permalink_path(pattern, p)).collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut claimed: HashSet<usize> = HashSet::new();

    // Natural paths are claimed first, in source order
    for (i, path) in natural.iter().enumerate() {
        if taken.insert(path.clone()) {
            claimed.insert(i);
        }
    }

    for (i, (post, base)) in posts.iter_mut().zip(natural).enumerate() {
        if claimed.contains(&i) {
            post.path = base;
            continue;
        }
        let stem = base.trim_end_matches('/').to_string();
        let mut n = 2;
        let mut path = format!("{}-{}/", stem, n);
        while taken.contains(&path) {
            n += 1;
            path = format!("{}-{}/", stem, n);
        }
        tracing::warn!(
            "Output path {} already taken, writing {} to {}",
            base,
            post.id,
            path
        );
        taken.insert(path.clone());
        post.path = path;
    }
}

/// Check if a file is a markdown file
fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e == "md" || e == "markdown")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parse_post;

    fn post(id: &str, date: &str) -> Post {
        let text = format!("---\ntitle: Fargate\ndate: {}\n---\nbody\n", date);
        parse_post(id, &text, Tz::UTC).unwrap()
    }

    #[test]
    fn test_permalink_path() {
        let p = post("2023-08-27-aws-fargate.md", "2023-08-27");
        assert_eq!(
            permalink_path(":year/:month/:day/:title/", &p),
            "2023/08/27/aws-fargate/"
        );
        assert_eq!(permalink_path("posts/:slug", &p), "posts/aws-fargate/");
    }

    #[test]
    fn test_colliding_paths_get_suffixes() {
        let mut posts = vec![
            post("a/fargate.md", "2023-08-27"),
            post("b/fargate.md", "2023-08-27"),
            post("c/fargate.md", "2025-02-01"),
        ];
        assign_paths(&mut posts, ":year/:title/");
        let paths: Vec<&str> = posts.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["2023/fargate/", "2023/fargate-2/", "2025/fargate/"]);
    }

    #[test]
    fn test_suffix_never_lands_on_a_natural_path() {
        let mut posts = vec![
            post("a/fargate.md", "2023-08-27"),
            post("b/fargate.md", "2023-08-27"),
            post("c/fargate-2.md", "2023-08-27"),
        ];
        assign_paths(&mut posts, ":title/");
        let paths: Vec<&str> = posts.iter().map(|p| p.path.as_str()).collect();
        assert_eq!(paths, vec!["fargate/", "fargate-3/", "fargate-2/"]);

        let unique: HashSet<&str> = paths.iter().copied().collect();
        assert_eq!(unique.len(), posts.len());
    }
}
