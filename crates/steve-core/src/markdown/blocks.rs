//! Block segmentation: fence extraction followed by a line-by-line pass.

use std::sync::LazyLock;

use regex::Regex;

use super::inline::parse_inline;
use super::{Inline, MarkdownNode};

static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(#{1,6})\s+(.+)$").expect("valid heading regex"));
static RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\*(?:\s*\*){2,}|-(?:\s*-){2,}|_(?:\s*_){2,})\s*$").expect("valid rule regex")
});
static QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*>\s?(.*)$").expect("valid blockquote regex"));
static BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*+]\s+(.+)$").expect("valid bullet regex"));
static NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\.\s+(.+)$").expect("valid numbered regex"));

/// A source line after fence extraction. Fences are opaque and can never be
/// matched by a later block rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line<'a> {
    Text(&'a str),
    Fence(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Fence {
    language: Option<String>,
    body: String,
}

/// Parses the opening line of a fence, returning its language tag.
///
/// The tag is limited to `[A-Za-z0-9_+-]`; anything else after the backticks
/// means the line is not a fence opener.
fn fence_open(line: &str) -> Option<Option<String>> {
    let rest = line.trim_start().strip_prefix("```")?;
    let tag_len = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-')))
        .unwrap_or(rest.len());
    let (tag, tail) = rest.split_at(tag_len);
    if !tail.chars().all(|c| c == ' ' || c == '\t') {
        return None;
    }
    Some((!tag.is_empty()).then(|| tag.to_string()))
}

fn is_fence_close(line: &str) -> bool {
    line.trim() == "```"
}

/// Replaces every closed fence with a placeholder line. An opener without a
/// matching close is left as ordinary text.
fn extract_fences<'a>(lines: &[&'a str]) -> (Vec<Line<'a>>, Vec<Fence>) {
    let mut out = Vec::with_capacity(lines.len());
    let mut fences = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        if let Some(language) = fence_open(line)
            && let Some(offset) = lines[i + 1..].iter().position(|l| is_fence_close(l))
        {
            let body = lines[i + 1..i + 1 + offset].join("\n");
            out.push(Line::Fence(fences.len()));
            fences.push(Fence { language, body });
            i += offset + 2;
            continue;
        }
        out.push(Line::Text(line));
        i += 1;
    }
    (out, fences)
}

fn is_table_separator(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty()
        && trimmed
            .chars()
            .all(|c| c.is_whitespace() || matches!(c, '-' | ':' | '|'))
}

fn table_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let trimmed = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix('|').unwrap_or(trimmed);
    trimmed.split('|').map(|c| c.trim().to_string()).collect()
}

/// Tries to parse a table starting at `lines[start]`.
///
/// Returns the node and the number of lines consumed.
fn parse_table(lines: &[Line<'_>], start: usize) -> Option<(MarkdownNode, usize)> {
    let Line::Text(header) = lines[start] else {
        return None;
    };
    let Some(Line::Text(separator)) = lines.get(start + 1) else {
        return None;
    };
    if !is_table_separator(separator) || !(header.contains('|') || separator.contains('|')) {
        return None;
    }

    let header: Vec<_> = table_cells(header).iter().map(|c| parse_inline(c)).collect();
    let width = header.len();
    let mut rows = Vec::new();
    let mut consumed = 2;
    while let Some(Line::Text(row)) = lines.get(start + consumed) {
        if row.trim().is_empty() || !row.contains('|') {
            break;
        }
        let mut cells = table_cells(row);
        cells.resize(width, String::new());
        rows.push(cells.iter().map(|c| parse_inline(c)).collect());
        consumed += 1;
    }
    Some((MarkdownNode::Table { header, rows }, consumed))
}

enum OpenList {
    Unordered(Vec<Vec<Inline>>),
    Ordered(Vec<Vec<Inline>>),
}

/// Open-construct state for the line pass. At most one construct is open at
/// any time.
#[derive(Default)]
struct Builder {
    nodes: Vec<MarkdownNode>,
    paragraph: Vec<String>,
    list: Option<OpenList>,
    quote: Option<Vec<Vec<Inline>>>,
}

impl Builder {
    fn close_paragraph(&mut self) {
        if !self.paragraph.is_empty() {
            let joined = self.paragraph.join(" ");
            self.paragraph.clear();
            self.nodes.push(MarkdownNode::Paragraph(parse_inline(&joined)));
        }
    }

    fn close_list(&mut self) {
        match self.list.take() {
            Some(OpenList::Unordered(items)) => self.nodes.push(MarkdownNode::UnorderedList(items)),
            Some(OpenList::Ordered(items)) => self.nodes.push(MarkdownNode::OrderedList(items)),
            None => {}
        }
    }

    fn close_quote(&mut self) {
        if let Some(lines) = self.quote.take() {
            self.nodes.push(MarkdownNode::Blockquote(lines));
        }
    }

    fn close_all(&mut self) {
        self.close_paragraph();
        self.close_list();
        self.close_quote();
    }

    fn push_block(&mut self, node: MarkdownNode) {
        self.close_all();
        self.nodes.push(node);
    }

    fn push_item(&mut self, ordered: bool, content: &str) {
        self.close_paragraph();
        let item = parse_inline(content);
        match (&mut self.list, ordered) {
            (Some(OpenList::Unordered(items)), false) | (Some(OpenList::Ordered(items)), true) => {
                items.push(item);
            }
            _ => {
                self.close_list();
                self.list = Some(if ordered {
                    OpenList::Ordered(vec![item])
                } else {
                    OpenList::Unordered(vec![item])
                });
            }
        }
    }

    fn push_quote_line(&mut self, content: &str) {
        if self.quote.is_none() {
            self.close_paragraph();
            self.close_list();
        }
        self.quote
            .get_or_insert_with(Vec::new)
            .push(parse_inline(content));
    }

    fn finish(mut self) -> Vec<MarkdownNode> {
        self.close_all();
        self.nodes
    }
}

pub(super) fn parse_blocks(text: &str) -> Vec<MarkdownNode> {
    let normalized = text.replace("\r\n", "\n");
    let raw: Vec<&str> = normalized.split('\n').collect();
    let (lines, fences) = extract_fences(&raw);

    let mut builder = Builder::default();
    let mut i = 0;
    while i < lines.len() {
        let line = match lines[i] {
            Line::Fence(idx) => {
                let fence = &fences[idx];
                builder.push_block(MarkdownNode::CodeFence {
                    language: fence.language.clone(),
                    body: fence.body.clone(),
                });
                i += 1;
                continue;
            }
            Line::Text(line) => line,
        };

        if line.trim().is_empty() {
            builder.close_all();
            i += 1;
            continue;
        }

        if let Some((table, consumed)) = parse_table(&lines, i) {
            builder.push_block(table);
            i += consumed;
            continue;
        }
        i += 1;

        if let Some(caps) = HEADING.captures(line) {
            let level = caps[1].len() as u8;
            builder.push_block(MarkdownNode::Heading {
                level,
                content: parse_inline(&caps[2]),
            });
            continue;
        }
        if RULE.is_match(line) {
            builder.push_block(MarkdownNode::HorizontalRule);
            continue;
        }
        if let Some(caps) = QUOTE.captures(line) {
            builder.push_quote_line(&caps[1]);
            continue;
        }
        builder.close_quote();

        if let Some(caps) = BULLET.captures(line) {
            builder.push_item(false, &caps[1]);
            continue;
        }
        if let Some(caps) = NUMBERED.captures(line) {
            builder.push_item(true, &caps[1]);
            continue;
        }

        builder.close_list();
        builder.paragraph.push(line.trim().to_string());
    }
    builder.finish()
}
