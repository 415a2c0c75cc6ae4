//! Block-level outline of a Markdown body

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Parser, Tag, TagEnd};
use serde::Serialize;
use std::collections::HashSet;

use super::markdown::markdown_options;

/// Language recorded for fences without an info string
pub const PLAIN_TEXT: &str = "text";

/// One block of a post body.
///
/// Links and images found inside prose are lifted out as their own blocks,
/// in document order, right after the block that carries them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: String, anchor: String },
    Paragraph { text: String },
    Code { lang: String, code: String },
    Image { src: String, alt: String },
    Link { href: String, text: String },
    List { ordered: bool, items: Vec<String> },
    Quote { text: String },
    Rule,
    Html(String),
}

/// Language of a fenced code block: the first word of the info string, verbatim
pub fn fence_language(kind: &CodeBlockKind) -> String {
    match kind {
        CodeBlockKind::Fenced(info) => info
            .split_whitespace()
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| PLAIN_TEXT.to_string()),
        CodeBlockKind::Indented => PLAIN_TEXT.to_string(),
    }
}

/// Heading anchors of one document, unique within it.
///
/// Explicit `{#id}` attributes are kept verbatim; generated anchors are the
/// slugified heading text with `-1`, `-2`, ... appended until unused.
#[derive(Debug, Default)]
pub(crate) struct Anchors {
    issued: HashSet<String>,
}

impl Anchors {
    pub(crate) fn claim(&mut self, explicit: Option<&str>, text: &str) -> String {
        if let Some(id) = explicit {
            self.issued.insert(id.to_string());
            return id.to_string();
        }

        let base = match slug::slugify(text) {
            s if s.is_empty() => "section".to_string(),
            s => s,
        };
        let mut anchor = base.clone();
        let mut n = 0;
        while self.issued.contains(&anchor) {
            n += 1;
            anchor = format!("{}-{}", base, n);
        }
        self.issued.insert(anchor.clone());
        anchor
    }
}

pub(crate) fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Split a Markdown body into its blocks
pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(markdown, markdown_options()) {
        builder.push(event);
    }
    builder.blocks
}

struct ListState {
    ordered: bool,
    items: Vec<String>,
    depth: usize,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    /// Links and images waiting for their enclosing block to close
    inline: Vec<Block>,
    text: String,
    /// Level and explicit `{#id}` of the open heading
    heading: Option<(u8, Option<String>)>,
    anchors: Anchors,
    code: Option<(String, String)>,
    html: Option<String>,
    link: Option<(String, String)>,
    image: Option<(String, String)>,
    list: Option<ListState>,
    quote_end: Option<TagEnd>,
    quote_depth: usize,
}

impl BlockBuilder {
    fn nested(&self) -> bool {
        self.list.is_some() || self.quote_depth > 0
    }

    fn push(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(end) => self.end(end),
            Event::Text(text) | Event::Code(text) => self.push_text(&text),
            Event::InlineHtml(html) => self.push_text(&html),
            Event::Html(html) => match self.html.as_mut() {
                Some(buf) => buf.push_str(&html),
                None => self.push_text(&html),
            },
            Event::SoftBreak | Event::HardBreak => self.push_text(" "),
            Event::Rule => {
                if !self.nested() {
                    self.blocks.push(Block::Rule);
                }
            }
            _ => {}
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some((_, code)) = self.code.as_mut() {
            code.push_str(text);
            return;
        }
        if let Some((_, alt)) = self.image.as_mut() {
            alt.push_str(text);
            return;
        }
        if let Some((_, link_text)) = self.link.as_mut() {
            link_text.push_str(text);
        }
        self.text.push_str(text);
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, id, .. } => {
                self.heading = Some((heading_level(level), id.map(|id| id.to_string())));
                self.text.clear();
            }
            Tag::Paragraph | Tag::Table(_) => {
                if !self.nested() {
                    self.text.clear();
                }
            }
            Tag::CodeBlock(kind) => {
                self.code = Some((fence_language(&kind), String::new()));
            }
            Tag::HtmlBlock => self.html = Some(String::new()),
            Tag::Link { dest_url, .. } => self.link = Some((dest_url.to_string(), String::new())),
            Tag::Image { dest_url, .. } => {
                self.image = Some((dest_url.to_string(), String::new()))
            }
            Tag::List(first) => match self.list.as_mut() {
                Some(list) => list.depth += 1,
                None => {
                    self.list = Some(ListState {
                        ordered: first.is_some(),
                        items: Vec::new(),
                        depth: 1,
                    })
                }
            },
            Tag::Item => {
                if self.list.as_ref().is_some_and(|l| l.depth == 1) {
                    self.text.clear();
                } else {
                    self.text.push(' ');
                }
            }
            tag @ Tag::BlockQuote(_) => {
                if self.quote_depth == 0 {
                    self.quote_end = Some(tag.to_end());
                    if self.list.is_none() {
                        self.text.clear();
                    }
                }
                self.quote_depth += 1;
            }
            _ => {}
        }
    }

    fn end(&mut self, end: TagEnd) {
        match end {
            TagEnd::Heading(_) => {
                if let Some((level, id)) = self.heading.take() {
                    let text = self.take_text();
                    let anchor = self.anchors.claim(id.as_deref(), &text);
                    self.blocks.push(Block::Heading {
                        level,
                        text,
                        anchor,
                    });
                    self.flush_inline();
                }
            }
            TagEnd::Paragraph | TagEnd::Table => {
                if self.nested() {
                    self.text.push(' ');
                } else {
                    let text = self.take_text();
                    if !text.is_empty() {
                        self.blocks.push(Block::Paragraph { text });
                    }
                    self.flush_inline();
                }
            }
            TagEnd::TableCell => self.text.push(' '),
            TagEnd::CodeBlock => {
                if let Some((lang, code)) = self.code.take() {
                    self.blocks.push(Block::Code { lang, code });
                }
            }
            TagEnd::HtmlBlock => {
                if let Some(html) = self.html.take() {
                    self.blocks.push(Block::Html(html));
                }
            }
            TagEnd::Link => {
                if let Some((href, text)) = self.link.take() {
                    self.inline.push(Block::Link {
                        href,
                        text: text.trim().to_string(),
                    });
                }
            }
            TagEnd::Image => {
                if let Some((src, alt)) = self.image.take() {
                    self.inline.push(Block::Image {
                        src,
                        alt: alt.trim().to_string(),
                    });
                }
            }
            TagEnd::Item => {
                if let Some(list) = self.list.as_mut() {
                    if list.depth == 1 {
                        let item = collapse_whitespace(&self.text);
                        list.items.push(item);
                        self.text.clear();
                    }
                }
            }
            TagEnd::List(_) => {
                let finished = match self.list.as_mut() {
                    Some(list) if list.depth > 1 => {
                        list.depth -= 1;
                        None
                    }
                    _ => self.list.take(),
                };
                if let Some(list) = finished {
                    self.blocks.push(Block::List {
                        ordered: list.ordered,
                        items: list.items,
                    });
                    if self.quote_depth == 0 {
                        self.flush_inline();
                    }
                }
            }
            end if self.quote_end.as_ref() == Some(&end) => {
                self.quote_depth = self.quote_depth.saturating_sub(1);
                if self.quote_depth == 0 && self.list.is_none() {
                    self.quote_end = None;
                    let text = self.take_text();
                    self.blocks.push(Block::Quote { text });
                    self.flush_inline();
                }
            }
            _ => {}
        }
    }

    fn take_text(&mut self) -> String {
        let text = collapse_whitespace(&self.text);
        self.text.clear();
        text
    }

    fn flush_inline(&mut self) {
        self.blocks.append(&mut self.inline);
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_language_is_kept_verbatim() {
        let blocks = parse_blocks("```HCL title=main.tf\nresource \"x\" {}\n```\n");
        assert_eq!(
            blocks,
            vec![Block::Code {
                lang: "HCL".to_string(),
                code: "resource \"x\" {}\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_unannotated_fence_is_plain_text() {
        let blocks = parse_blocks("```\naws ecs list-clusters\n```\n");
        assert!(matches!(&blocks[0], Block::Code { lang, .. } if lang == PLAIN_TEXT));
    }

    #[test]
    fn test_headings_keep_level() {
        let blocks = parse_blocks("# Setup\n\n### Create the cluster\n");
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    text: "Setup".to_string(),
                    anchor: "setup".to_string(),
                },
                Block::Heading {
                    level: 3,
                    text: "Create the cluster".to_string(),
                    anchor: "create-the-cluster".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_heading_anchors_are_unique() {
        let blocks = parse_blocks("## Deploy {#deploy-1}\n\n## Deploy\n\n## Deploy\n\n## Deploy\n");
        let anchors: Vec<&str> = blocks
            .iter()
            .filter_map(|b| match b {
                Block::Heading { anchor, .. } => Some(anchor.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(anchors, vec!["deploy-1", "deploy", "deploy-2", "deploy-3"]);
    }

    #[test]
    fn test_links_and_images_follow_their_paragraph() {
        let md = "See [the docs](https://docs.aws.amazon.com) and ![diagram](images/arch.png).\n";
        let blocks = parse_blocks(md);
        assert_eq!(blocks.len(), 3);
        assert!(matches!(&blocks[0], Block::Paragraph { text } if text.starts_with("See the docs and")));
        assert_eq!(
            blocks[1],
            Block::Link {
                href: "https://docs.aws.amazon.com".to_string(),
                text: "the docs".to_string(),
            }
        );
        assert_eq!(
            blocks[2],
            Block::Image {
                src: "images/arch.png".to_string(),
                alt: "diagram".to_string(),
            }
        );
    }

    #[test]
    fn test_lists_and_quotes() {
        let md = "- one\n- two\n  - nested\n\n> careful\n> with IAM\n\n---\n";
        let blocks = parse_blocks(md);
        assert_eq!(
            blocks[0],
            Block::List {
                ordered: false,
                items: vec!["one".to_string(), "two nested".to_string()],
            }
        );
        assert_eq!(
            blocks[1],
            Block::Quote {
                text: "careful with IAM".to_string()
            }
        );
        assert_eq!(blocks[2], Block::Rule);
    }
}
