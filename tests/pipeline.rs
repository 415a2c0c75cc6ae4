//! End-to-end generation over a temporary site

use std::fs;
use std::path::Path;

use notesite::config::SiteConfig;
use notesite::{Error, Site};
use tempfile::TempDir;

const FARGATE_2023: &str = r#"---
title: AWS Fargate
date: 2023-08-27
tags: [aws, terraform]
---
Run containers without managing servers.

<!-- more -->

![architecture](/images/arch.png)
![missing](/images/nope.png)

```python
import boto3
client = boto3.client("ecs")
```
"#;

const FARGATE_2025: &str = r#"---
title: AWS Fargate
date: 2025-02-01
tags: [aws]
---
Revisited with Cognito in front.
"#;

const NO_DATE: &str = r#"---
title: CloudWatch alarms
tags: [aws]
---
Body without a date.
"#;

fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn site(dir: &TempDir, allow_malformed: bool) -> Site {
    let source = dir.path().join("source");
    write(&source, "_posts/2023-08-27-aws-fargate.md", FARGATE_2023);
    write(&source, "_posts/2025-02-01-aws-fargate.md", FARGATE_2025);
    write(&source, "_posts/cloudwatch.md", NO_DATE);
    write(&source, "images/arch.png", "png");

    let config = SiteConfig {
        title: "Cloud Notes".to_string(),
        permalink: ":title/".to_string(),
        allow_malformed,
        ..Default::default()
    };
    Site::with_config(dir.path(), config)
}

#[test]
fn malformed_documents_fail_the_build_by_default() {
    let dir = TempDir::new().unwrap();
    let site = site(&dir, false);

    let err = site.generate().unwrap_err();
    assert!(err.to_string().contains("1 document(s) failed to parse"));
    assert!(!site.public_dir.join("index.html").exists());
}

#[test]
fn generates_site_without_malformed_documents() {
    let dir = TempDir::new().unwrap();
    let site = site(&dir, true);

    let summary = site.generate().unwrap();
    assert_eq!(summary.posts, 2);
    assert_eq!(summary.tags, 2);
    assert_eq!(summary.failures.len(), 1);
    match &summary.failures[0] {
        Error::MalformedFrontMatter { source_id, reason } => {
            assert_eq!(source_id, "_posts/cloudwatch.md");
            assert!(reason.contains("date"));
        }
        other => panic!("unexpected failure: {:?}", other),
    }
    // only the missing image
    assert_eq!(summary.warnings, 1);

    let public = &site.public_dir;

    // same titles, distinct pages
    let older = fs::read_to_string(public.join("aws-fargate/index.html")).unwrap();
    let newer = fs::read_to_string(public.join("aws-fargate-2/index.html")).unwrap();
    assert!(older.contains("Run containers without managing servers."));
    assert!(older.contains(r#"class="language-python""#));
    assert!(older.contains(r#"src="/images/arch.png""#));
    assert!(older.contains(r#"class="broken-link""#));
    assert!(newer.contains("Revisited with Cognito in front."));

    // newest first on the index page
    let index = fs::read_to_string(public.join("index.html")).unwrap();
    let newer_pos = index.find(r#"href="/aws-fargate-2/""#).unwrap();
    let older_pos = index.find(r#"href="/aws-fargate/""#).unwrap();
    assert!(newer_pos < older_pos);
    assert!(!index.contains("CloudWatch alarms"));

    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(public.join("posts.json")).unwrap()).unwrap();
    assert_eq!(json["posts"][0]["id"], "_posts/2025-02-01-aws-fargate.md");
    assert_eq!(json["posts"][1]["id"], "_posts/2023-08-27-aws-fargate.md");
    assert_eq!(json["posts"][1]["languages"][0], "python");
    assert_eq!(json["tags"]["aws"].as_array().unwrap().len(), 2);
    assert_eq!(json["tags"]["terraform"][0], "_posts/2023-08-27-aws-fargate.md");

    assert!(public.join("tags/index.html").exists());
    assert!(public.join("tags/aws/index.html").exists());
    assert!(public.join("tags/terraform/index.html").exists());
    assert!(public.join("archives/index.html").exists());
    assert!(public.join("images/arch.png").exists());
    assert!(public.join("css/site.css").exists());

    let feed = fs::read_to_string(public.join("atom.xml")).unwrap();
    assert!(feed.contains("<title>Cloud Notes</title>"));
    assert!(feed.contains("<updated>2025-02-01T00:00:00+00:00</updated>"));
}

#[test]
fn clean_removes_generated_files() {
    let dir = TempDir::new().unwrap();
    let site = site(&dir, true);

    site.generate().unwrap();
    assert!(site.public_dir.exists());
    site.clean().unwrap();
    assert!(!site.public_dir.exists());
}
