//! List site content

use anyhow::Result;

use crate::content::loader::ContentLoader;
use crate::index::SiteIndex;
use crate::Site;

/// Print posts, tags or archives to stdout
pub fn run(site: &Site, content_type: &str) -> Result<()> {
    let loader = ContentLoader::new(site)?;
    let report = loader.load_posts()?;
    let index = SiteIndex::build(&report.posts);

    print!("{}", render(&index, content_type, &site.config.date_format)?);

    if !report.failures.is_empty() {
        println!("\nFailed to parse ({}):", report.failures.len());
        for failure in &report.failures {
            println!("  {}", failure);
        }
    }

    Ok(())
}

/// Text listing of one content type
fn render(index: &SiteIndex, content_type: &str, date_format: &str) -> Result<String> {
    let mut out = String::new();
    match content_type {
        "post" | "posts" => {
            out.push_str(&format!("Posts ({}):\n", index.len()));
            for post in index.ordered() {
                out.push_str(&format!(
                    "  {} - {} [{}]\n",
                    post.date.format(date_format),
                    post.title,
                    post.id
                ));
            }
        }
        "tag" | "tags" => {
            out.push_str(&format!("Tags ({}):\n", index.tags().len()));
            let mut tags: Vec<(&str, usize)> = index
                .tags()
                .iter()
                .map(|(tag, posts)| (*tag, posts.len()))
                .collect();
            // most used first, ties keep first-seen order
            tags.sort_by(|a, b| b.1.cmp(&a.1));
            for (tag, count) in tags {
                out.push_str(&format!("  {} ({})\n", tag, count));
            }
        }
        "archive" | "archives" => {
            for (year, posts) in index.archives() {
                out.push_str(&format!("{} ({}):\n", year, posts.len()));
                for post in posts {
                    out.push_str(&format!(
                        "  {} - {}\n",
                        post.date.format(date_format),
                        post.title
                    ));
                }
            }
        }
        _ => {
            anyhow::bail!(
                "Unknown type: {}. Available: post, tag, archive",
                content_type
            );
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{parse_post, Post};
    use chrono_tz::Tz;

    fn posts() -> Vec<Post> {
        vec![
            parse_post(
                "_posts/fargate.md",
                "---\ntitle: AWS Fargate\ndate: 2023-08-27\ntags: [aws, docker]\n---\n",
                Tz::UTC,
            )
            .unwrap(),
            parse_post(
                "_posts/cognito.md",
                "---\ntitle: Cognito\ndate: 2025-02-01\ntags: [aws]\n---\n",
                Tz::UTC,
            )
            .unwrap(),
        ]
    }

    #[test]
    fn test_list_posts_newest_first() {
        let posts = posts();
        let index = SiteIndex::build(&posts);
        let out = render(&index, "posts", "%Y-%m-%d").unwrap();
        let cognito = out.find("2025-02-01 - Cognito").unwrap();
        let fargate = out.find("2023-08-27 - AWS Fargate").unwrap();
        assert!(cognito < fargate);
    }

    #[test]
    fn test_list_tags_by_count() {
        let posts = posts();
        let index = SiteIndex::build(&posts);
        let out = render(&index, "tag", "%Y-%m-%d").unwrap();
        assert!(out.starts_with("Tags (2):\n  aws (2)\n  docker (1)\n"));
    }

    #[test]
    fn test_list_unknown_type() {
        let posts = posts();
        let index = SiteIndex::build(&posts);
        assert!(render(&index, "categories", "%Y-%m-%d").is_err());
    }
}
