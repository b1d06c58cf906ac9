//! HTML emission. All text is escaped here, never earlier.

use std::fmt::Write as _;

use super::{Inline, MarkdownNode, RenderedBlock};

/// Escapes `&`, `<` and `>`.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;")
}

fn inline_html(spans: &[Inline], out: &mut String) {
    for span in spans {
        match span {
            Inline::Text(t) => out.push_str(&escape_html(t)),
            Inline::Code(c) => {
                let _ = write!(out, "<code>{}</code>", escape_html(c));
            }
            Inline::Link { href, children } => {
                let _ = write!(
                    out,
                    r#"<a href="{}" target="_blank" rel="noopener noreferrer">"#,
                    escape_attr(href)
                );
                inline_html(children, out);
                out.push_str("</a>");
            }
            Inline::Emphasis(children) => wrap("em", children, out),
            Inline::Strong(children) => wrap("strong", children, out),
            Inline::Strikethrough(children) => wrap("del", children, out),
            Inline::Checkbox { checked: true } => {
                out.push_str(r#"<input type="checkbox" disabled checked/>"#);
            }
            Inline::Checkbox { checked: false } => {
                out.push_str(r#"<input type="checkbox" disabled/>"#);
            }
        }
    }
}

fn wrap(tag: &str, children: &[Inline], out: &mut String) {
    let _ = write!(out, "<{tag}>");
    inline_html(children, out);
    let _ = write!(out, "</{tag}>");
}

/// Visible text of an inline run, as a browser's `textContent` would report it.
pub(super) fn inline_text(spans: &[Inline], out: &mut String) {
    for span in spans {
        match span {
            Inline::Text(t) | Inline::Code(t) => out.push_str(t),
            Inline::Link { children, .. }
            | Inline::Emphasis(children)
            | Inline::Strong(children)
            | Inline::Strikethrough(children) => inline_text(children, out),
            Inline::Checkbox { .. } => {}
        }
    }
}

fn text_of(spans: &[Inline]) -> String {
    let mut out = String::new();
    inline_text(spans, &mut out);
    out
}

fn html_of(spans: &[Inline]) -> String {
    let mut out = String::new();
    inline_html(spans, &mut out);
    out
}

fn list(tag: &str, items: &[Vec<Inline>]) -> RenderedBlock {
    let mut html = format!("<{tag}>");
    for item in items {
        let _ = write!(html, "<li>{}</li>", html_of(item));
    }
    let _ = write!(html, "</{tag}>");
    let text = items.iter().map(|i| text_of(i)).collect::<Vec<_>>().join("\n");
    RenderedBlock { html, text }
}

fn table(header: &[Vec<Inline>], rows: &[Vec<Vec<Inline>>]) -> RenderedBlock {
    let mut html = String::from(r#"<table class="md-table"><thead><tr>"#);
    for cell in header {
        let _ = write!(html, "<th>{}</th>", html_of(cell));
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            let _ = write!(html, "<td>{}</td>", html_of(cell));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");

    let line = |cells: &[Vec<Inline>]| {
        cells
            .iter()
            .map(|c| text_of(c))
            .collect::<Vec<_>>()
            .join("\t")
    };
    let mut lines = vec![line(header)];
    lines.extend(rows.iter().map(|r| line(r)));
    RenderedBlock {
        html,
        text: lines.join("\n"),
    }
}

pub(super) fn render_block(node: &MarkdownNode) -> RenderedBlock {
    match node {
        MarkdownNode::Heading { level, content } => RenderedBlock {
            html: format!("<h{level}>{}</h{level}>", html_of(content)),
            text: text_of(content),
        },
        MarkdownNode::Paragraph(content) => RenderedBlock {
            html: format!("<p>{}</p>", html_of(content)),
            text: text_of(content),
        },
        MarkdownNode::UnorderedList(items) => list("ul", items),
        MarkdownNode::OrderedList(items) => list("ol", items),
        MarkdownNode::Blockquote(lines) => RenderedBlock {
            html: format!(
                "<blockquote>{}</blockquote>",
                lines.iter().map(|l| html_of(l)).collect::<Vec<_>>().join("<br/>")
            ),
            text: lines.iter().map(|l| text_of(l)).collect::<Vec<_>>().join("\n"),
        },
        MarkdownNode::HorizontalRule => RenderedBlock {
            html: "<hr/>".to_string(),
            text: String::new(),
        },
        MarkdownNode::CodeFence { language, body } => {
            let class = language
                .as_deref()
                .map(|l| format!(r#" class="lang-{}""#, escape_attr(l)))
                .unwrap_or_default();
            RenderedBlock {
                html: format!("<pre><code{class}>{}</code></pre>", escape_html(body)),
                text: body.clone(),
            }
        }
        MarkdownNode::Table { header, rows } => table(header, rows),
    }
}
