//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const DEFAULT_CONFIG: &str = r#"# Site
title: Notes
subtitle: ''
description: ''
author: ''
language: en
timezone: ''

# URL
url: http://example.com
root: /
permalink: :year/:month/:day/:title/

# Directory
source_dir: source
public_dir: public
tag_dir: tags
archive_dir: archives
exclude: []

# Writing
new_post_name: :year-:month-:day-:title.md
render_drafts: false
allow_malformed: false
highlight:
  enable: true
  theme: base16-ocean.dark
  line_number: false

# Date format (strftime)
date_format: '%Y-%m-%d'

# Pagination
per_page: 10
pagination_dir: page

# Feed
feed_limit: 20
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join(CONFIG_FILE);
    if config_path.exists() {
        anyhow::bail!("{:?} already contains a site", target_dir);
    }

    fs::create_dir_all(target_dir.join("source/_posts"))?;
    fs::create_dir_all(target_dir.join("source/images"))?;
    fs::write(&config_path, DEFAULT_CONFIG)?;

    // Create a sample post, dated in UTC like the empty `timezone` above
    let now = chrono::Utc::now();
    let sample_post = format!(
        r#"---
title: Hello World
date: {}
tags: [notes]
---

Welcome to your notes. Posts live in `source/_posts` and start with a
front-matter block.

<!-- more -->

## Writing

Fenced code blocks keep their language:

```python
def handler(event, context):
    return {{"statusCode": 200}}
```

## Generating

```bash
$ notesite generate
$ notesite server
```
"#,
        now.format("%Y-%m-%d %H:%M:%S")
    );

    fs::write(
        target_dir.join("source/_posts/hello-world.md"),
        sample_post,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::loader::ContentLoader;
    use crate::Site;
    use tempfile::TempDir;

    #[test]
    fn test_init_creates_loadable_site() {
        let dir = TempDir::new().unwrap();
        let before = chrono::Utc::now() - chrono::Duration::seconds(2);
        init_site(dir.path()).unwrap();
        let after = chrono::Utc::now() + chrono::Duration::seconds(2);

        let site = Site::new(dir.path()).unwrap();
        assert_eq!(site.config.title, "Notes");
        let report = ContentLoader::new(&site).unwrap().load_posts().unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.posts.len(), 1);
        assert_eq!(report.posts[0].code_languages(), vec!["python", "bash"]);

        // the sample date is read back as the moment it was written
        let date = report.posts[0].date.with_timezone(&chrono::Utc);
        assert!(before <= date && date <= after);

        // a second init does not clobber the site
        assert!(init_site(dir.path()).is_err());
    }
}
