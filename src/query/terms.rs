//! Term splitting and quote normalization for search fields.

/// Split a comma-separated field into trimmed, non-empty terms.
pub fn split_terms(field: Option<&str>) -> Vec<&str> {
    field
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .collect()
}

/// Returns the inner text when `term` is wrapped in a matching pair of
/// single or double quotes.
pub fn strip_quotes(term: &str) -> Option<&str> {
    ['"', '\''].into_iter().find_map(|quote| {
        term.strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
    })
}

/// Normalize an exact-phrase term for the search query.
///
/// Quoted terms keep their quotes but always come out double-quoted.
/// Unquoted terms are wrapped only if they contain whitespace, since a
/// single word needs no phrase marker.
pub fn normalize_phrase(term: &str) -> String {
    if let Some(inner) = strip_quotes(term) {
        return format!("\"{}\"", inner.trim());
    }

    if term.contains(char::is_whitespace) {
        format!("\"{}\"", term)
    } else {
        term.to_string()
    }
}

/// Display form of a term: the raw text without surrounding quotes.
pub fn display_term(term: &str) -> &str {
    strip_quotes(term).map(str::trim).unwrap_or(term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_terms_drops_blanks() {
        assert_eq!(split_terms(Some(" consumer, ,recall ,")), vec!["consumer", "recall"]);
        assert!(split_terms(Some("  ")).is_empty());
        assert!(split_terms(None).is_empty());
    }

    #[test]
    fn test_normalize_phrase_wraps_multi_word() {
        assert_eq!(normalize_phrase("product safety"), "\"product safety\"");
        assert_eq!(normalize_phrase("recall"), "recall");
    }

    #[test]
    fn test_normalize_phrase_converts_single_quotes() {
        assert_eq!(normalize_phrase("'product safety'"), "\"product safety\"");
        assert_eq!(normalize_phrase("\"product safety\""), "\"product safety\"");
        assert_eq!(normalize_phrase("'recall'"), "\"recall\"");
    }

    #[test]
    fn test_mismatched_quotes_are_not_stripped() {
        assert_eq!(strip_quotes("\"product safety'"), None);
        assert_eq!(strip_quotes("\""), None);
    }

    #[test]
    fn test_display_term() {
        assert_eq!(display_term("'injury report'"), "injury report");
        assert_eq!(display_term("hazard"), "hazard");
    }
}
