//! Citation deduplication.

use std::collections::HashSet;

use steve_types::Citation;

/// Keeps the first citation per identity key, in input order. Citations with
/// no identity are dropped.
pub fn reconcile(citations: &[Citation]) -> Vec<Citation> {
    let mut seen = HashSet::new();
    citations
        .iter()
        .filter(|c| c.key().is_some_and(|key| seen.insert(key)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<Citation> {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_duplicate_document_ids_collapse() {
        let input = parse(
            r#"[{"document_id":1,"title":"A"},{"document_id":1,"title":"A-dup"},{"source":"x"}]"#,
        );
        let out = reconcile(&input);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].title.as_deref(), Some("A"));
        assert_eq!(out[1].source.as_deref(), Some("x"));
    }

    #[test]
    fn test_records_without_identity_dropped() {
        let input = parse(r#"[{"text":"orphan"},{"title":"T"},{"source":"","title":""}]"#);
        let out = reconcile(&input);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].title.as_deref(), Some("T"));
    }

    #[test]
    fn test_source_and_title_share_key_space() {
        let input = parse(r#"[{"source":"guide"},{"title":"guide"},{"document_id":"guide"}]"#);
        let out = reconcile(&input);
        assert_eq!(out.len(), 2);
        assert!(out[1].document_id.is_some());
    }

    #[test]
    fn test_order_preserved() {
        let input = parse(
            r#"[{"source":"c"},{"source":"a"},{"source":"c"},{"source":"b"},{"source":"a"}]"#,
        );
        let keys: Vec<_> = reconcile(&input)
            .into_iter()
            .filter_map(|c| c.source)
            .collect();
        assert_eq!(keys, ["c", "a", "b"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(reconcile(&[]).is_empty());
    }
}
