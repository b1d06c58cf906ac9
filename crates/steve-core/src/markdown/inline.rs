//! Inline span parsing.
//!
//! Code spans are split out first and never scanned again. The remaining text
//! is walked left to right; at each position the span rules are tried in a
//! fixed order (link, autolink, strong, emphasis, strikethrough, task marker)
//! and the first match wins. Anything unmatched stays literal text.

use super::Inline;

/// Characters allowed inside a bare URL.
fn is_url_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "-._~:/?#[]@!$&'()*+,;=%".contains(c)
}

/// Appends a node, merging adjacent text runs.
fn push_node(out: &mut Vec<Inline>, node: Inline) {
    if let Inline::Text(next) = &node
        && let Some(Inline::Text(last)) = out.last_mut()
    {
        last.push_str(next);
        return;
    }
    if matches!(&node, Inline::Text(t) if t.is_empty()) {
        return;
    }
    out.push(node);
}

pub(super) fn parse_inline(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let bytes = text.as_bytes();
    let mut plain_start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let Some(len) = text[i + 1..].find('`') else {
                break;
            };
            if len > 0 {
                for node in parse_spans(&text[plain_start..i], true) {
                    push_node(&mut out, node);
                }
                push_node(&mut out, Inline::Code(text[i + 1..i + 1 + len].to_string()));
                i += len + 2;
                plain_start = i;
                continue;
            }
        }
        i += 1;
    }
    for node in parse_spans(&text[plain_start..], true) {
        push_node(&mut out, node);
    }
    out
}

/// Parses formatting spans in text that contains no code spans.
///
/// `links` is false inside link labels so anchors never nest.
fn parse_spans(text: &str, links: bool) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < text.len() {
        if let Some((nodes, consumed)) = match_span(text, i, links) {
            for node in nodes {
                push_node(&mut out, node);
            }
            i += consumed;
            continue;
        }
        let Some(ch) = text[i..].chars().next() else {
            break;
        };
        push_node(&mut out, Inline::Text(ch.to_string()));
        i += ch.len_utf8();
    }
    out
}

fn match_span(text: &str, at: usize, links: bool) -> Option<(Vec<Inline>, usize)> {
    let rest = &text[at..];
    let prev = text[..at].chars().next_back();
    match *rest.as_bytes().first()? {
        b'[' => {
            let link = if links { match_link(rest) } else { None };
            link.map(|(node, n)| (vec![node], n))
                .or_else(|| match_checkbox(rest))
        }
        b'h' if links => match_autolink(rest).map(|(node, n)| (vec![node], n)),
        b'*' => match_pair(rest, '*', links)
            .map(|(c, n)| (Inline::Strong(c), n))
            .or_else(|| match_single(rest, prev, '*', links))
            .map(|(node, n)| (vec![node], n)),
        b'_' => match_pair(rest, '_', links)
            .map(|(c, n)| (Inline::Strong(c), n))
            .or_else(|| match_single(rest, prev, '_', links))
            .map(|(node, n)| (vec![node], n)),
        b'~' => match_pair(rest, '~', links).map(|(c, n)| (vec![Inline::Strikethrough(c)], n)),
        _ => None,
    }
}

/// `[label](http(s):target)`
fn match_link(rest: &str) -> Option<(Inline, usize)> {
    let close = rest.find(']')?;
    if close <= 1 {
        return None;
    }
    let label = &rest[1..close];
    let target = rest[close + 1..].strip_prefix('(')?;
    let end = target.find(|c: char| c == ')' || c.is_whitespace())?;
    if !target[end..].starts_with(')') {
        return None;
    }
    let href = &target[..end];
    let tail = href
        .strip_prefix("https:")
        .or_else(|| href.strip_prefix("http:"))?;
    if tail.is_empty() {
        return None;
    }
    let node = Inline::Link {
        href: href.to_string(),
        children: parse_spans(label, false),
    };
    Some((node, close + 1 + 1 + end + 1))
}

/// Bare `http://` or `https://` URL. Trailing punctuation and unbalanced
/// closing brackets are left outside the link.
fn match_autolink(rest: &str) -> Option<(Inline, usize)> {
    let scheme_len = if rest.starts_with("https://") {
        8
    } else if rest.starts_with("http://") {
        7
    } else {
        return None;
    };
    let len = rest.find(|c: char| !is_url_char(c)).unwrap_or(rest.len());
    let mut url = &rest[..len];
    while let Some(last) = url.chars().next_back() {
        let trim = match last {
            '.' | ',' | ';' | ':' | '!' | '?' | '*' | '_' | '~' | '\'' => true,
            ')' => url.matches(')').count() > url.matches('(').count(),
            ']' => url.matches(']').count() > url.matches('[').count(),
            _ => false,
        };
        if !trim {
            break;
        }
        url = &url[..url.len() - 1];
    }
    if url.len() <= scheme_len {
        return None;
    }
    let node = Inline::Link {
        href: url.to_string(),
        children: vec![Inline::Text(url.to_string())],
    };
    Some((node, url.len()))
}

/// Doubled marker pair with a non-empty body free of the marker:
/// `**x**`, `__x__`, `~~x~~`.
fn match_pair(rest: &str, marker: char, links: bool) -> Option<(Vec<Inline>, usize)> {
    let mut delim = String::with_capacity(2);
    delim.push(marker);
    delim.push(marker);
    let body = rest.strip_prefix(delim.as_str())?;
    let end = body.find(marker)?;
    if end == 0 || !body[end..].starts_with(delim.as_str()) {
        return None;
    }
    Some((parse_spans(&body[..end], links), end + 4))
}

/// Single-marker emphasis that does not touch another marker on either side.
///
/// Complete doubled pairs inside the body are skipped, so `*a **b** c*` is
/// emphasis wrapping strong.
fn match_single(
    rest: &str,
    prev: Option<char>,
    marker: char,
    links: bool,
) -> Option<(Inline, usize)> {
    if prev == Some(marker) {
        return None;
    }
    let body = &rest[1..];
    if body.starts_with(marker) {
        return None;
    }
    let end = find_single_close(body, marker, links)?;
    Some((Inline::Emphasis(parse_spans(&body[..end], links)), end + 2))
}

/// Byte offset of the closing single marker in `body`.
fn find_single_close(body: &str, marker: char, links: bool) -> Option<usize> {
    let mut at = 0;
    while at < body.len() {
        let tail = &body[at..];
        if tail.starts_with(marker) {
            if let Some((_, consumed)) = match_pair(tail, marker, links) {
                at += consumed;
                continue;
            }
            if tail[1..].starts_with(marker) {
                return None;
            }
            return Some(at);
        }
        at += tail.chars().next()?.len_utf8();
    }
    None
}

/// `[ ]`, `[x]` or `[X]` followed by whitespace. The whitespace collapses to
/// one space after the checkbox.
fn match_checkbox(rest: &str) -> Option<(Vec<Inline>, usize)> {
    let bytes = rest.as_bytes();
    if bytes.len() < 4 || bytes[2] != b']' {
        return None;
    }
    let checked = match bytes[1] {
        b' ' => false,
        b'x' | b'X' => true,
        _ => return None,
    };
    let after = &rest[3..];
    let ws = after.len() - after.trim_start().len();
    if ws == 0 {
        return None;
    }
    Some((
        vec![Inline::Checkbox { checked }, Inline::Text(" ".to_string())],
        3 + ws,
    ))
}
