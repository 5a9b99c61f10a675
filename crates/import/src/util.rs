/// Substring containment against any non-empty needle. Callers uppercase both sides.
pub fn contains_any<S: AsRef<str>>(haystack: &str, needles: &[S]) -> bool {
    needles
        .iter()
        .map(AsRef::as_ref)
        .any(|n| !n.is_empty() && haystack.contains(n))
}

/// Header cell as compared against the dialect column names.
pub fn normalize_header(raw: &str) -> &str {
    raw.trim_start_matches('\u{feff}').trim()
}

/// `None` for empty or whitespace-only cells.
pub fn non_blank(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contains_any_finds_substring() {
        assert!(contains_any("PAGAMENTO DE FATURA", &["BOLETO", "FATURA"]));
        assert!(!contains_any("LOJA XYZ", &["BOLETO", "FATURA"]));
    }

    #[test]
    fn contains_any_ignores_empty_needles() {
        assert!(!contains_any("ANYTHING", &[""]));
        assert!(!contains_any::<&str>("ANYTHING", &[]));
    }

    #[test]
    fn normalize_header_strips_bom_and_spaces() {
        assert_eq!(normalize_header("\u{feff}Data "), "Data");
        assert_eq!(normalize_header(" Descrição"), "Descrição");
    }

    #[test]
    fn non_blank_filters_whitespace() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(None), None);
        assert_eq!(non_blank(Some(" x ")), Some("x"));
    }
}
