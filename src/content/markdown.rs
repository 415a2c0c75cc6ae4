//! Markdown rendering with syntax highlighting

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use serde::Serialize;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{styled_line_to_highlighted_html, IncludeBackground};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use super::blocks::{fence_language, heading_level, Anchors};
use super::Post;
use crate::config::HighlightConfig;
use crate::error::UnresolvedAsset;
use crate::helpers::AssetResolver;

/// Marker separating a post's excerpt from the rest of its body
pub const MORE_MARKER: &str = "<!-- more -->";

/// Parser options shared by rendering and block extraction.
///
/// YAML metadata blocks stay disabled: front-matter is split off beforehand.
pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION
        | Options::ENABLE_HEADING_ATTRIBUTES
        | Options::ENABLE_GFM
}

/// One heading of the rendered document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub anchor: String,
}

/// Output of a render pass
#[derive(Debug, Clone, Default)]
pub struct Rendered {
    pub html: String,
    pub toc: Vec<TocEntry>,
    pub warnings: Vec<UnresolvedAsset>,
}

/// Markdown renderer with syntax highlighting
pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    theme_name: String,
    highlight: bool,
    line_numbers: bool,
}

impl MarkdownRenderer {
    /// Create a new markdown renderer
    pub fn new() -> Self {
        Self::with_options(&HighlightConfig::default())
    }

    /// Create with custom settings
    pub fn with_options(config: &HighlightConfig) -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            theme_name: config.theme.clone(),
            highlight: config.enable,
            line_numbers: config.line_number,
        }
    }

    /// Render a post body
    pub fn render_post(&self, post: &Post, assets: &AssetResolver) -> Rendered {
        self.render(&post.raw, assets)
    }

    /// Render markdown to HTML.
    ///
    /// Never fails: malformed inline markup comes out as literal text and
    /// unresolvable links or images become placeholders plus a warning.
    pub fn render(&self, markdown: &str, assets: &AssetResolver) -> Rendered {
        let source: Vec<Event> = Parser::new_ext(markdown, markdown_options()).collect();

        let mut events: Vec<Event> = Vec::with_capacity(source.len());
        let mut toc = Vec::new();
        let mut anchors = Anchors::default();
        let mut links = LinkRewriter::new(assets);

        let mut iter = source.into_iter();
        while let Some(event) = iter.next() {
            match event {
                Event::Start(Tag::Heading {
                    level,
                    id,
                    classes,
                    attrs,
                }) => {
                    let inner = take_until(&mut iter, |e| matches!(e, TagEnd::Heading(_)));
                    let text = plain_text(&inner);
                    let anchor = anchors.claim(id.as_deref(), &text);
                    toc.push(TocEntry {
                        level: heading_level(level),
                        text,
                        anchor: anchor.clone(),
                    });
                    events.push(Event::Start(Tag::Heading {
                        level,
                        id: Some(CowStr::from(anchor)),
                        classes,
                        attrs,
                    }));
                    let mut inner = inner.into_iter();
                    while let Some(event) = inner.next() {
                        if let Some(event) = links.rewrite(event, &mut inner, &mut events) {
                            events.push(event);
                        }
                    }
                    events.push(Event::End(TagEnd::Heading(level)));
                }
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = fence_language(&kind);
                    let inner = take_until(&mut iter, |e| matches!(e, TagEnd::CodeBlock));
                    let code = plain_text(&inner);
                    events.push(Event::Html(CowStr::from(self.highlight_code(&code, &lang))));
                }
                other => {
                    if let Some(event) = links.rewrite(other, &mut iter, &mut events) {
                        events.push(event);
                    }
                }
            }
        }

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        Rendered {
            html: html_output,
            toc,
            warnings: links.warnings,
        }
    }

    fn theme(&self) -> Option<&Theme> {
        self.theme_set
            .themes
            .get(&self.theme_name)
            .or_else(|| self.theme_set.themes.values().next())
    }

    /// Highlight a code block, keeping the language tag on the element
    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let body = if self.highlight {
            self.highlight_lines(code, lang)
                .unwrap_or_else(|| html_escape(code))
        } else {
            html_escape(code)
        };

        let lang = html_escape(lang);
        let code_html = format!(
            r#"<code class="language-{}" data-lang="{}">{}</code>"#,
            lang, lang, body
        );

        if self.line_numbers {
            self.add_line_numbers(&code_html, code, &lang)
        } else {
            format!(r#"<pre class="highlight">{}</pre>"#, code_html)
        }
    }

    fn highlight_lines(&self, code: &str, lang: &str) -> Option<String> {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))?;
        let theme = self.theme()?;

        let mut highlighter = HighlightLines::new(syntax, theme);
        let mut output = String::new();
        for line in LinesWithEndings::from(code) {
            let regions = highlighter.highlight_line(line, &self.syntax_set).ok()?;
            let html = styled_line_to_highlighted_html(&regions[..], IncludeBackground::No).ok()?;
            output.push_str(&html);
        }
        Some(output)
    }

    /// Add a line-number gutter next to the code
    fn add_line_numbers(&self, code_html: &str, code: &str, lang: &str) -> String {
        let line_count = code.lines().count().max(1);
        let gutter = (1..=line_count)
            .map(|n| format!(r#"<span class="line-number">{}</span>"#, n))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            r#"<figure class="highlight {}"><table><tr><td class="gutter"><pre>{}</pre></td><td class="code"><pre>{}</pre></td></tr></table></figure>"#,
            lang, gutter, code_html
        )
    }

    /// Parse excerpt from content (split by <!-- more -->)
    pub fn split_excerpt(content: &str) -> (Option<String>, String) {
        if let Some(pos) = content.find(MORE_MARKER) {
            let excerpt = content[..pos].trim().to_string();
            let remaining = content[pos + MORE_MARKER.len()..].trim().to_string();
            let full = format!("{}\n\n{}", excerpt, remaining);
            (Some(excerpt), full)
        } else {
            (None, content.to_string())
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves link and image targets, turning unresolvable ones into
/// placeholders
struct LinkRewriter<'r> {
    assets: &'r AssetResolver,
    warnings: Vec<UnresolvedAsset>,
    /// One entry per open link: whether it was replaced by a placeholder
    broken_links: Vec<bool>,
}

impl<'r> LinkRewriter<'r> {
    fn new(assets: &'r AssetResolver) -> Self {
        Self {
            assets,
            warnings: Vec::new(),
            broken_links: Vec::new(),
        }
    }

    /// Push the rewritten form of `event` to `out`, or hand it back untouched
    /// when it is not part of a link or image
    fn rewrite<'a, I>(
        &mut self,
        event: Event<'a>,
        rest: &mut I,
        out: &mut Vec<Event<'a>>,
    ) -> Option<Event<'a>>
    where
        I: Iterator<Item = Event<'a>>,
    {
        match event {
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => match self.assets.resolve(&dest_url, true) {
                Ok(url) => out.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url: CowStr::from(url),
                    title,
                    id,
                })),
                Err(warning) => {
                    let inner = take_until(rest, |e| matches!(e, TagEnd::Image));
                    let alt = plain_text(&inner);
                    out.push(Event::Html(CowStr::from(format!(
                        r#"<span class="broken-link" data-src="{}">{}</span>"#,
                        html_escape(&dest_url),
                        html_escape(&alt)
                    ))));
                    self.warnings.push(warning);
                }
            },
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => match self.assets.resolve(&dest_url, false) {
                Ok(url) => {
                    self.broken_links.push(false);
                    out.push(Event::Start(Tag::Link {
                        link_type,
                        dest_url: CowStr::from(url),
                        title,
                        id,
                    }));
                }
                Err(warning) => {
                    self.broken_links.push(true);
                    out.push(Event::InlineHtml(CowStr::from(format!(
                        r#"<span class="broken-link" data-href="{}">"#,
                        html_escape(&dest_url)
                    ))));
                    self.warnings.push(warning);
                }
            },
            Event::End(TagEnd::Link) => {
                if self.broken_links.pop().unwrap_or(false) {
                    out.push(Event::InlineHtml(CowStr::from("</span>")));
                } else {
                    out.push(Event::End(TagEnd::Link));
                }
            }
            other => return Some(other),
        }
        None
    }
}

/// Drain events up to (and consuming) the first end tag matching `is_end`
fn take_until<'a, I>(iter: &mut I, is_end: impl Fn(&TagEnd) -> bool) -> Vec<Event<'a>>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut inner = Vec::new();
    for event in iter.by_ref() {
        if let Event::End(end) = &event {
            if is_end(end) {
                break;
            }
        }
        inner.push(event);
    }
    inner
}

fn plain_text(events: &[Event]) -> String {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}

/// Simple HTML escaping
pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain() -> MarkdownRenderer {
        MarkdownRenderer::with_options(&HighlightConfig {
            enable: false,
            ..Default::default()
        })
    }

    fn resolver() -> AssetResolver {
        AssetResolver::new("/blog/")
    }

    #[test]
    fn test_render_basic_markdown() {
        let out = plain().render("# Hello World\n\nThis is a test.", &resolver());
        assert!(out.html.contains(r#"<h1 id="hello-world">Hello World</h1>"#));
        assert!(out.html.contains("<p>This is a test.</p>"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_code_block_keeps_python_tag() {
        let out = plain().render("```python\nprint('hi')\n```\n", &resolver());
        assert!(out.html.contains(r#"class="language-python""#));
        assert!(out.html.contains(r#"data-lang="python""#));
        assert!(out.html.contains("print(&#39;hi&#39;)"));
    }

    #[test]
    fn test_highlighted_code_block_keeps_tag() {
        let out = MarkdownRenderer::new().render("```python\nx = 1\n```\n", &resolver());
        assert!(out.html.contains(r#"class="language-python""#));
        assert!(out.html.contains("<span"));
    }

    #[test]
    fn test_unannotated_fence_renders_as_text() {
        let out = MarkdownRenderer::new().render("```\nterraform apply\n```\n", &resolver());
        assert!(out.html.contains(r#"class="language-text""#));
        assert!(out.html.contains("terraform apply"));
    }

    #[test]
    fn test_line_numbers() {
        let renderer = MarkdownRenderer::with_options(&HighlightConfig {
            enable: false,
            line_number: true,
            ..Default::default()
        });
        let out = renderer.render("```sh\na\nb\n```\n", &resolver());
        assert!(out.html.contains(r#"<span class="line-number">2</span>"#));
        assert!(out.html.contains(r#"data-lang="sh""#));
    }

    #[test]
    fn test_headings_get_unique_anchors_and_toc() {
        let out = plain().render("## Deploy\n\n### Deploy\n\n## Deploy\n", &resolver());
        assert!(out.html.contains(r#"<h2 id="deploy">"#));
        assert!(out.html.contains(r#"<h3 id="deploy-1">"#));
        assert!(out.html.contains(r#"<h2 id="deploy-2">"#));
        let levels: Vec<u8> = out.toc.iter().map(|t| t.level).collect();
        assert_eq!(levels, vec![2, 3, 2]);
    }

    #[test]
    fn test_explicit_heading_id_is_not_reused() {
        let out = plain().render("## Deploy {#deploy}\n\n## Deploy\n", &resolver());
        assert!(out.html.contains(r#"<h2 id="deploy">"#));
        assert!(out.html.contains(r#"<h2 id="deploy-1">"#));
    }

    #[test]
    fn test_heading_anchors_match_block_outline() {
        let md = "## Deploy\n\n## Deploy {#custom}\n\n### Deploy\n";
        let out = plain().render(md, &resolver());
        let outline: Vec<String> = crate::content::parse_blocks(md)
            .into_iter()
            .filter_map(|b| match b {
                crate::content::Block::Heading { anchor, .. } => Some(anchor),
                _ => None,
            })
            .collect();
        let toc: Vec<String> = out.toc.into_iter().map(|t| t.anchor).collect();
        assert_eq!(toc, outline);
        assert_eq!(toc, vec!["deploy", "custom", "deploy-1"]);
    }

    #[test]
    fn test_links_and_images_in_headings_are_resolved() {
        let assets = AssetResolver::new("/blog/").with_known_assets(vec!["images/ok.png".to_string()]);
        let md = "## See [setup](posts/setup/) ![i](images/a.png)\n\nPara [setup](posts/setup/)\n";
        let out = plain().render(md, &assets);
        assert!(out.html.contains(r#"<h2 id="see-setup-i">See <a href="/blog/posts/setup/">setup</a>"#));
        assert!(out.html.contains(r#"<span class="broken-link" data-src="images/a.png">i</span></h2>"#));
        assert!(out.html.contains(r#"<p>Para <a href="/blog/posts/setup/">setup</a></p>"#));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].image);
    }

    #[test]
    fn test_relative_links_and_images_use_base_path() {
        let md = "[next](posts/cognito/) ![arch](/images/fargate.png) [aws](https://aws.amazon.com)";
        let out = plain().render(md, &resolver());
        assert!(out.html.contains(r#"href="/blog/posts/cognito/""#));
        assert!(out.html.contains(r#"src="/blog/images/fargate.png""#));
        assert!(out.html.contains(r#"href="https://aws.amazon.com""#));
    }

    #[test]
    fn test_unresolved_image_becomes_placeholder() {
        let assets = AssetResolver::new("/").with_known_assets(vec!["images/ok.png".to_string()]);
        let out = plain().render("![missing diagram](images/nope.png)", &assets);
        assert!(out.html.contains(r#"class="broken-link""#));
        assert!(out.html.contains("missing diagram"));
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].image);
    }

    #[test]
    fn test_unresolved_link_keeps_text() {
        let out = plain().render("[up](../../etc/passwd) and on", &resolver());
        assert!(out.html.contains(r#"<span class="broken-link" data-href="../../etc/passwd">up</span>"#));
        assert!(out.html.contains("and on"));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_malformed_inline_markup_is_literal() {
        let out = plain().render("Use **bold and [broken link( here", &resolver());
        assert!(out.html.contains("**bold"));
        assert!(out.html.contains("[broken link( here"));
    }

    #[test]
    fn test_split_excerpt() {
        let content = "This is excerpt.\n<!-- more -->\nThis is more content.";
        let (excerpt, full) = MarkdownRenderer::split_excerpt(content);
        assert_eq!(excerpt, Some("This is excerpt.".to_string()));
        assert!(full.contains("This is excerpt."));
        assert!(full.contains("This is more content."));
    }
}
