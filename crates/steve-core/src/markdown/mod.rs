//! Markdown rendering for chat replies.
//!
//! [`render`] is a pure function of its input: the same text always yields the
//! same [`RenderedDocument`]. Streaming callers re-render the whole buffer
//! after every token, so rendering a growing prefix matches a fresh render of
//! that prefix.
//!
//! The dialect is deliberately small: fenced code, headings, rules,
//! blockquotes, flat lists, pipe tables and paragraphs, with code spans,
//! links, bare URLs, strong, emphasis, strikethrough and task markers inline.

mod blocks;
mod html;
mod inline;

pub use html::escape_html;

/// Inline content of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Code(String),
    Link { href: String, children: Vec<Inline> },
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    /// A disabled task checkbox.
    Checkbox { checked: bool },
}

/// Block-level node. List and blockquote nodes hold their items/lines in
/// order; each item is one inline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownNode {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    UnorderedList(Vec<Vec<Inline>>),
    OrderedList(Vec<Vec<Inline>>),
    Blockquote(Vec<Vec<Inline>>),
    HorizontalRule,
    /// Literal body, never interpreted as markup.
    CodeFence {
        language: Option<String>,
        body: String,
    },
    /// Every row has exactly as many cells as the header.
    Table {
        header: Vec<Vec<Inline>>,
        rows: Vec<Vec<Vec<Inline>>>,
    },
}

/// One rendered block: its HTML fragment and its visible text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedBlock {
    pub html: String,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    pub blocks: Vec<RenderedBlock>,
}

impl RenderedDocument {
    /// All fragments joined with newlines.
    pub fn to_html(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.html.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn text_content(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// True when nothing visible would be shown.
    pub fn is_blank(&self) -> bool {
        self.blocks.iter().all(|b| b.text.trim().is_empty())
    }
}

/// Parses text into block nodes.
pub fn parse(text: &str) -> Vec<MarkdownNode> {
    blocks::parse_blocks(text)
}

/// Renders text into an escaped HTML fragment tree.
pub fn render(text: &str) -> RenderedDocument {
    RenderedDocument {
        blocks: parse(text).iter().map(html::render_block).collect(),
    }
}
