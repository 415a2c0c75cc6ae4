//! Generator module - writes the static site using the built-in Tera templates

use anyhow::{Context as _, Result};
use chrono::Datelike;
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use tera::Context;

use crate::content::{MarkdownRenderer, Post, Rendered};
use crate::error::UnresolvedAsset;
use crate::helpers::{full_url_for, url_for, AssetResolver};
use crate::index::SiteIndex;
use crate::templates::{
    ArchiveYearData, ConfigData, NavPost, PaginationData, PostData, TagData, TagLink,
    TemplateRenderer, SITE_CSS,
};
use crate::Site;

/// What a generation pass produced
#[derive(Debug, Default)]
pub struct GenerateOutput {
    pub files_written: usize,
    /// Unresolved links and images, with the id of the post they occur in
    pub warnings: Vec<(String, UnresolvedAsset)>,
}

/// Static site generator using Tera templates
pub struct Generator {
    site: Site,
    templates: TemplateRenderer,
    markdown: MarkdownRenderer,
}

/// A post rendered once and shared by every page that shows it
struct RenderedPost<'a> {
    post: &'a Post,
    data: PostData,
    rendered: Rendered,
}

impl Generator {
    /// Create a new generator
    pub fn new(site: &Site) -> Result<Self> {
        let templates = TemplateRenderer::new()?;
        let markdown = MarkdownRenderer::with_options(&site.config.highlight);

        Ok(Self {
            site: site.clone(),
            templates,
            markdown,
        })
    }

    /// Generate the entire site.
    ///
    /// `assets` are the static files of the source directory (relative
    /// paths); image references are checked against them.
    pub fn generate(&self, index: &SiteIndex, assets: &[String]) -> Result<GenerateOutput> {
        let mut output = GenerateOutput::default();

        fs::create_dir_all(&self.site.public_dir)
            .with_context(|| format!("Failed to create {:?}", self.site.public_dir))?;

        // Copy source assets (images, etc.)
        output.files_written += self.copy_source_assets(assets)?;
        self.write(&self.site.public_dir.join("css/site.css"), SITE_CSS)?;
        output.files_written += 1;

        let resolver = AssetResolver::new(&self.site.config.base_path())
            .with_known_assets(assets.iter().cloned());

        let tag_slugs = tag_slugs(index);
        let posts = self.render_posts(index, &resolver, &tag_slugs);
        for rp in &posts {
            for warning in &rp.rendered.warnings {
                tracing::warn!("{}: {}", rp.post.id, warning);
                output
                    .warnings
                    .push((rp.post.id.clone(), warning.clone()));
            }
        }

        let config_data = self.build_config_data();

        output.files_written += self.generate_index_pages(index, &posts, &config_data)?;
        output.files_written += self.generate_post_pages(index, &posts, &config_data)?;
        output.files_written += self.generate_tag_pages(index, &tag_slugs, &posts, &config_data)?;
        output.files_written += self.generate_archive_page(index, &posts, &config_data)?;
        output.files_written += self.generate_atom_feed(&posts)?;
        output.files_written += self.generate_json_index(index)?;

        Ok(output)
    }

    /// Render every post once, in index order
    fn render_posts<'a>(
        &self,
        index: &SiteIndex<'a>,
        resolver: &AssetResolver,
        tag_slugs: &IndexMap<&str, String>,
    ) -> Vec<RenderedPost<'a>> {
        index
            .ordered()
            .iter()
            .map(|&post| {
                let rendered = self.markdown.render_post(post, resolver);
                let excerpt = post
                    .excerpt
                    .as_ref()
                    .map(|e| self.markdown.render(e, resolver).html);
                let data = self.post_data(post, &rendered, excerpt, tag_slugs);
                RenderedPost {
                    post,
                    data,
                    rendered,
                }
            })
            .collect()
    }

    fn post_data(
        &self,
        post: &Post,
        rendered: &Rendered,
        excerpt: Option<String>,
        tag_slugs: &IndexMap<&str, String>,
    ) -> PostData {
        let config = &self.site.config;
        PostData {
            id: post.id.clone(),
            title: post.title.clone(),
            date: post.date.format(&config.date_format).to_string(),
            date_iso: post.date.to_rfc3339(),
            url: url_for(config, &post.path),
            tags: post
                .tags
                .iter()
                .filter_map(|t| {
                    tag_slugs.get(t.as_str()).map(|tag_slug| TagLink {
                        name: t.clone(),
                        url: self.tag_url(tag_slug),
                    })
                })
                .collect(),
            description: post.description.clone(),
            excerpt,
            content: rendered.html.clone(),
        }
    }

    fn tag_url(&self, tag_slug: &str) -> String {
        url_for(
            &self.site.config,
            &format!("{}/{}/", self.site.config.tag_dir, tag_slug),
        )
    }

    /// Build config data for templates
    fn build_config_data(&self) -> ConfigData {
        let config = &self.site.config;
        ConfigData {
            title: config.title.clone(),
            subtitle: config.subtitle.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: url_for(config, ""),
            tag_dir: config.tag_dir.clone(),
            archive_dir: config.archive_dir.clone(),
        }
    }

    /// Create a base context with common variables
    fn create_base_context(&self, config_data: &ConfigData) -> Context {
        let mut context = Context::new();
        context.insert("config", config_data);
        context.insert("current_year", &chrono::Utc::now().year().to_string());
        context
    }

    /// Generate index pages with pagination
    fn generate_index_pages(
        &self,
        index: &SiteIndex,
        posts: &[RenderedPost],
        config_data: &ConfigData,
    ) -> Result<usize> {
        let config = &self.site.config;
        let pages = index.pages(config.per_page);
        let total_pages = pages.len();
        let page_url = |n: usize| {
            if n == 1 {
                url_for(config, "")
            } else {
                url_for(config, &format!("{}/{}/", config.pagination_dir, n))
            }
        };

        let mut offset = 0;
        for (i, page) in pages.iter().enumerate() {
            let page_num = i + 1;
            let page_posts: Vec<&PostData> = posts[offset..offset + page.len()]
                .iter()
                .map(|rp| &rp.data)
                .collect();
            offset += page.len();

            let pagination = PaginationData {
                per_page: config.per_page,
                total: total_pages,
                current: page_num,
                current_url: page_url(page_num),
                prev_link: if page_num > 1 {
                    page_url(page_num - 1)
                } else {
                    String::new()
                },
                next_link: if page_num < total_pages {
                    page_url(page_num + 1)
                } else {
                    String::new()
                },
            };

            let mut context = self.create_base_context(config_data);
            context.insert("page_posts", &page_posts);
            context.insert("pagination", &pagination);

            let html = self.templates.render("index.html", &context)?;

            let output_path = if page_num == 1 {
                self.site.public_dir.join("index.html")
            } else {
                self.site
                    .public_dir
                    .join(&config.pagination_dir)
                    .join(page_num.to_string())
                    .join("index.html")
            };
            self.write(&output_path, &html)?;
        }

        Ok(total_pages)
    }

    /// Generate individual post pages
    fn generate_post_pages(
        &self,
        index: &SiteIndex,
        posts: &[RenderedPost],
        config_data: &ConfigData,
    ) -> Result<usize> {
        let config = &self.site.config;
        let nav = |post: &Post| NavPost {
            title: post.title.clone(),
            url: url_for(config, &post.path),
        };

        for rp in posts {
            let prev_post = rp.post.prev(index.ordered()).map(nav);
            let next_post = rp.post.next(index.ordered()).map(nav);

            let mut context = self.create_base_context(config_data);
            context.insert("post", &rp.data);
            context.insert("toc", &rp.rendered.toc);
            context.insert("prev_post", &prev_post);
            context.insert("next_post", &next_post);

            let html = self.templates.render("post.html", &context)?;

            // Strip leading slash from path to avoid creating absolute paths
            let clean_path = rp.post.path.trim_start_matches('/');
            let output_path = self.site.public_dir.join(clean_path).join("index.html");
            self.write(&output_path, &html)?;
            tracing::debug!("Generated post {}: {:?}", rp.post.id, output_path);
        }

        Ok(posts.len())
    }

    /// Generate the tag listing and one page per tag
    fn generate_tag_pages(
        &self,
        index: &SiteIndex,
        tag_slugs: &IndexMap<&str, String>,
        posts: &[RenderedPost],
        config_data: &ConfigData,
    ) -> Result<usize> {
        let by_id: HashMap<&str, &PostData> =
            posts.iter().map(|rp| (rp.post.id.as_str(), &rp.data)).collect();
        let tag_dir = self.site.public_dir.join(&self.site.config.tag_dir);

        let mut all_tags: Vec<TagData> = Vec::new();
        for (&tag, tag_slug) in tag_slugs {
            let tagged = index.posts_tagged(tag);
            all_tags.push(TagData {
                name: tag.to_string(),
                url: self.tag_url(tag_slug),
                slug: tag_slug.clone(),
                count: tagged.len(),
                posts: tagged
                    .iter()
                    .filter_map(|p| by_id.get(p.id.as_str()).map(|d| (*d).clone()))
                    .collect(),
            });
        }

        for tag in &all_tags {
            let mut context = self.create_base_context(config_data);
            context.insert("tag", tag);
            let html = self.templates.render("tag.html", &context)?;
            self.write(&tag_dir.join(&tag.slug).join("index.html"), &html)?;
        }

        let mut sorted: Vec<&TagData> = all_tags.iter().collect();
        sorted.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        let mut context = self.create_base_context(config_data);
        context.insert("all_tags", &sorted);
        let html = self.templates.render("tags.html", &context)?;
        self.write(&tag_dir.join("index.html"), &html)?;

        tracing::info!("Generated {} tag pages", all_tags.len());
        Ok(all_tags.len() + 1)
    }

    /// Generate archive page
    fn generate_archive_page(
        &self,
        index: &SiteIndex,
        posts: &[RenderedPost],
        config_data: &ConfigData,
    ) -> Result<usize> {
        let by_id: HashMap<&str, &PostData> =
            posts.iter().map(|rp| (rp.post.id.as_str(), &rp.data)).collect();

        let archive_years: Vec<ArchiveYearData> = index
            .archives()
            .into_iter()
            .map(|(year, year_posts)| ArchiveYearData {
                year,
                posts: year_posts
                    .iter()
                    .filter_map(|p| by_id.get(p.id.as_str()).map(|d| (*d).clone()))
                    .collect(),
            })
            .collect();

        let mut context = self.create_base_context(config_data);
        context.insert("archive_years", &archive_years);

        let html = self.templates.render("archive.html", &context)?;

        let output_path = self
            .site
            .public_dir
            .join(&self.site.config.archive_dir)
            .join("index.html");
        self.write(&output_path, &html)?;
        tracing::info!("Generated archive page");

        Ok(1)
    }

    /// Generate Atom feed
    fn generate_atom_feed(&self, posts: &[RenderedPost]) -> Result<usize> {
        let config = &self.site.config;
        let home = full_url_for(config, "");
        let updated = posts
            .first()
            .map(|rp| rp.post.updated.unwrap_or(rp.post.date).to_rfc3339())
            .unwrap_or_else(|| chrono::Utc::now().to_rfc3339());

        let mut feed = String::new();
        feed.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        feed.push('\n');
        feed.push_str(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#);
        feed.push('\n');
        feed.push_str(&format!("  <title>{}</title>\n", escape_xml(&config.title)));
        feed.push_str(&format!(
            "  <link href=\"{}\" rel=\"self\"/>\n",
            full_url_for(config, "atom.xml")
        ));
        feed.push_str(&format!("  <link href=\"{}\"/>\n", home));
        feed.push_str(&format!("  <updated>{}</updated>\n", updated));
        feed.push_str(&format!("  <id>{}</id>\n", home));
        feed.push_str(&format!(
            "  <author><name>{}</name></author>\n",
            escape_xml(&config.author)
        ));

        for rp in posts.iter().take(config.feed_limit) {
            let post = rp.post;
            let link = full_url_for(config, &post.path);
            feed.push_str("  <entry>\n");
            feed.push_str(&format!("    <title>{}</title>\n", escape_xml(&post.title)));
            feed.push_str(&format!("    <link href=\"{}\"/>\n", link));
            feed.push_str(&format!("    <id>{}</id>\n", link));
            feed.push_str(&format!(
                "    <published>{}</published>\n",
                post.date.to_rfc3339()
            ));
            feed.push_str(&format!(
                "    <updated>{}</updated>\n",
                post.updated.unwrap_or(post.date).to_rfc3339()
            ));
            for tag in &post.tags {
                feed.push_str(&format!("    <category term=\"{}\"/>\n", escape_xml(tag)));
            }
            if let Some(summary) = post.summary() {
                feed.push_str(&format!("    <summary>{}</summary>\n", escape_xml(summary)));
            }
            // Convert root-relative URLs in content to absolute URLs
            let content = rp.data.excerpt.as_ref().unwrap_or(&rp.data.content);
            let content = convert_relative_urls_to_absolute(content, config.url.trim_end_matches('/'));
            feed.push_str(&format!(
                "    <content type=\"html\"><![CDATA[{}]]></content>\n",
                strip_invalid_xml_chars(&content).replace("]]>", "]]]]><![CDATA[>")
            ));
            feed.push_str("  </entry>\n");
        }

        feed.push_str("</feed>\n");

        self.write(&self.site.public_dir.join("atom.xml"), &feed)?;
        tracing::info!("Generated atom.xml");

        Ok(1)
    }

    /// Write the index as JSON (ordered posts and tag -> post ids)
    fn generate_json_index(&self, index: &SiteIndex) -> Result<usize> {
        let config = &self.site.config;
        let value = index.to_json(|path| url_for(config, path));
        let json = serde_json::to_string_pretty(&value)?;
        self.write(&self.site.public_dir.join("posts.json"), &json)?;
        tracing::info!("Generated posts.json");
        Ok(1)
    }

    /// Copy source assets (images, etc.) to public directory
    fn copy_source_assets(&self, assets: &[String]) -> Result<usize> {
        for relative in assets {
            let src = self.site.source_dir.join(relative);
            let dest = self.site.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&src, &dest)
                .with_context(|| format!("Failed to copy {:?} to {:?}", src, dest))?;
        }
        if !assets.is_empty() {
            tracing::debug!("Copied {} assets", assets.len());
        }
        Ok(assets.len())
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }
}

/// Output directory name for every tag, in index order.
///
/// Tags whose names slugify to the same string get numeric suffixes that
/// never reuse another tag's slug; tags with no usable slug get no page.
fn tag_slugs<'a>(index: &SiteIndex<'a>) -> IndexMap<&'a str, String> {
    let mut natural: IndexMap<&'a str, String> = IndexMap::new();
    for &tag in index.tags().keys() {
        let base = slug::slugify(tag);
        if base.is_empty() {
            tracing::warn!("Tag {:?} has no usable slug, skipping its page", tag);
            continue;
        }
        natural.insert(tag, base);
    }

    // Natural slugs are claimed first, in index order
    let mut taken: HashSet<String> = HashSet::new();
    let mut owners: HashSet<&str> = HashSet::new();
    for (&tag, base) in &natural {
        if taken.insert(base.clone()) {
            owners.insert(tag);
        }
    }

    let mut slugs = IndexMap::new();
    for (tag, base) in natural {
        if owners.contains(tag) {
            slugs.insert(tag, base);
            continue;
        }
        let mut n = 2;
        let mut candidate = format!("{}-{}", base, n);
        while taken.contains(&candidate) {
            n += 1;
            candidate = format!("{}-{}", base, n);
        }
        taken.insert(candidate.clone());
        slugs.insert(tag, candidate);
    }
    slugs
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Convert root-relative URLs in HTML content to absolute URLs
fn convert_relative_urls_to_absolute(content: &str, base_url: &str) -> String {
    content
        .replace("href=\"/", &format!("href=\"{}/", base_url))
        .replace("src=\"/", &format!("src=\"{}/", base_url))
}

/// Strip invalid XML control characters (except tab, newline, carriage return)
fn strip_invalid_xml_chars(s: &str) -> String {
    s.chars()
        .filter(|&c| {
            c == '\t'
                || c == '\n'
                || c == '\r'
                || ('\u{0020}'..='\u{D7FF}').contains(&c)
                || ('\u{E000}'..='\u{FFFD}').contains(&c)
                || ('\u{10000}'..='\u{10FFFF}').contains(&c)
        })
        .collect()
}
