//! Content module - handles posts, parsing and Markdown rendering

mod blocks;
mod frontmatter;
pub mod loader;
mod markdown;
mod parser;
mod post;

pub use blocks::{fence_language, parse_blocks, Block, PLAIN_TEXT};
pub use frontmatter::{parse_date_string, FrontMatter};
pub use markdown::{markdown_options, MarkdownRenderer, Rendered, TocEntry, MORE_MARKER};
pub use parser::parse_post;
pub use post::Post;
