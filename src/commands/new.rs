//! Create a new post

use anyhow::Result;
use chrono::{DateTime, TimeZone};
use std::fs;
use std::path::PathBuf;

use crate::content::FrontMatter;
use crate::Site;

/// Create a new post file in the posts directory and return its path
pub fn create_post(site: &Site, title: &str, tags: &[String]) -> Result<PathBuf> {
    let title = title.trim();
    if title.is_empty() {
        anyhow::bail!("A post needs a title");
    }

    let tz = site.config.tz()?;
    let now = chrono::Utc::now().with_timezone(&tz);

    let slug = slug::slugify(title);
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a file name from title {:?}", title);
    }
    let filename = post_filename(&site.config.new_post_name, &slug, &now);

    let target_dir = site.posts_dir();
    fs::create_dir_all(&target_dir)?;
    let file_path = target_dir.join(filename);

    // Check if file already exists
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let front_matter = FrontMatter {
        title: Some(title.to_string()),
        date: Some(now.format("%Y-%m-%d %H:%M:%S").to_string()),
        tags: tags.to_vec(),
        ..FrontMatter::default()
    };
    let content = format!("{}\n", front_matter.to_yaml()?);

    fs::write(&file_path, content)?;
    tracing::info!("Created: {:?}", file_path);

    Ok(file_path)
}

/// Expand the `new_post_name` pattern
fn post_filename<Tz: TimeZone>(pattern: &str, slug: &str, now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let name = pattern
        .replace(":title", slug)
        .replace(":year", &now.format("%Y").to_string())
        .replace(":month", &now.format("%m").to_string())
        .replace(":day", &now.format("%d").to_string())
        .replace(":i_month", &now.format("%-m").to_string())
        .replace(":i_day", &now.format("%-d").to_string());

    if name.ends_with(".md") || name.ends_with(".markdown") {
        name
    } else {
        format!("{}.md", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::parse_post;
    use tempfile::TempDir;

    #[test]
    fn test_post_filename() {
        let now = chrono::Utc.with_ymd_and_hms(2025, 2, 1, 9, 30, 0).unwrap();
        assert_eq!(
            post_filename(":year-:month-:day-:title.md", "cognito-setup", &now),
            "2025-02-01-cognito-setup.md"
        );
        assert_eq!(post_filename(":title", "fargate", &now), "fargate.md");
    }

    #[test]
    fn test_create_post_is_parseable() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        let tags = vec!["aws".to_string(), "terraform".to_string()];

        let path = create_post(&site, "Deploying: Fargate with Terraform", &tags).unwrap();
        assert!(path.starts_with(site.posts_dir()));

        let text = fs::read_to_string(&path).unwrap();
        let post = parse_post("_posts/new.md", &text, chrono_tz::Tz::UTC).unwrap();
        assert_eq!(post.title, "Deploying: Fargate with Terraform");
        assert!(post.has_tag("aws") && post.has_tag("terraform"));

        // same title again collides
        assert!(create_post(&site, "Deploying: Fargate with Terraform", &[]).is_err());
    }

    #[test]
    fn test_create_post_rejects_empty_title() {
        let dir = TempDir::new().unwrap();
        let site = Site::new(dir.path()).unwrap();
        assert!(create_post(&site, "   ", &[]).is_err());
    }
}
