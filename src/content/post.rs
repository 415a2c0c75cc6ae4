//! Post model

use chrono::{DateTime, FixedOffset};
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use super::blocks::Block;

/// A blog post
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Source identifier: path relative to the source directory
    pub id: String,

    /// Post title
    pub title: String,

    /// Publication date
    pub date: DateTime<FixedOffset>,

    /// Last updated date
    pub updated: Option<DateTime<FixedOffset>>,

    /// Post tags, in the order they were declared
    pub tags: IndexSet<String>,

    pub description: Option<String>,

    /// Block outline of the body
    pub body: Vec<Block>,

    /// Raw markdown body (front-matter removed)
    pub raw: String,

    /// Markdown before the `<!-- more -->` marker
    pub excerpt: Option<String>,

    /// Slug (URL-friendly name)
    pub slug: String,

    /// Output path relative to the site root, e.g. `2023/08/27/fargate/`
    pub path: String,

    /// Unpublished post
    pub draft: bool,

    /// Custom front-matter fields
    pub extra: IndexMap<String, serde_yaml::Value>,
}

impl Post {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Languages of the fenced code blocks, first occurrence order
    pub fn code_languages(&self) -> Vec<&str> {
        let mut langs: IndexSet<&str> = IndexSet::new();
        for block in &self.body {
            if let Block::Code { lang, .. } = block {
                langs.insert(lang.as_str());
            }
        }
        langs.into_iter().collect()
    }

    /// Short plain-text summary: description, else the first paragraph
    pub fn summary(&self) -> Option<&str> {
        self.description.as_deref().or_else(|| {
            self.body.iter().find_map(|block| match block {
                Block::Paragraph { text } => Some(text.as_str()),
                _ => None,
            })
        })
    }

    /// Get the previous (older) post in a date-descending list
    pub fn prev<'a>(&self, posts: &[&'a Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.id == self.id)?;
        posts.get(pos + 1).copied()
    }

    /// Get the next (newer) post in a date-descending list
    pub fn next<'a>(&self, posts: &[&'a Post]) -> Option<&'a Post> {
        let pos = posts.iter().position(|p| p.id == self.id)?;
        if pos > 0 {
            Some(posts[pos - 1])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse_post;
    use chrono_tz::Tz;

    const DOC: &str = r#"---
title: CloudWatch alarms
date: 2024-03-01
tags: [aws, cloudwatch, aws]
---

Alarms are cheap.

```hcl
resource "aws_cloudwatch_metric_alarm" "cpu" {}
```

```bash
terraform apply
```

```hcl
# again
```
"#;

    #[test]
    fn test_tags_are_an_ordered_set() {
        let post = parse_post("alarms.md", DOC, Tz::UTC).unwrap();
        let tags: Vec<&str> = post.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["aws", "cloudwatch"]);
        assert!(post.has_tag("cloudwatch"));
        assert!(!post.has_tag("CloudWatch"));
    }

    #[test]
    fn test_code_languages_and_summary() {
        let post = parse_post("alarms.md", DOC, Tz::UTC).unwrap();
        assert_eq!(post.code_languages(), vec!["hcl", "bash"]);
        assert_eq!(post.summary(), Some("Alarms are cheap."));
    }

    #[test]
    fn test_prev_next() {
        let newer = parse_post("b.md", DOC, Tz::UTC).unwrap();
        let older = parse_post("a.md", DOC, Tz::UTC).unwrap();
        let list = vec![&newer, &older];
        assert_eq!(newer.prev(&list).map(|p| p.id.as_str()), Some("a.md"));
        assert!(newer.next(&list).is_none());
        assert_eq!(older.next(&list).map(|p| p.id.as_str()), Some("b.md"));
    }
}
