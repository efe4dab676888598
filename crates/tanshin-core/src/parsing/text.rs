use unicode_normalization::UnicodeNormalization;

/// Fold full-width forms to half-width (NFKC) and trim.
///
/// "１２，３４５" -> "12,345", "（百万円）" -> "(百万円)", "％" -> "%".
/// The ideographic space folds to an ASCII space.
pub fn fold_width(raw: &str) -> String {
    raw.nfkc().collect::<String>().trim().to_string()
}

/// Fold width and drop all whitespace.
///
/// Japanese labels carry no meaningful spaces, and PDF text runs often
/// insert them between characters ("売 上 高").
pub fn compact(raw: &str) -> String {
    raw.nfkc().filter(|c| !c.is_whitespace()).collect()
}

/// Join two text fragments that belong to the same cell.
///
/// Latin words and numbers keep a separating space; CJK text is concatenated.
pub fn join_fragments(left: &str, right: &str) -> String {
    let needs_space = matches!(
        (left.chars().last(), right.chars().next()),
        (Some(a), Some(b)) if (a.is_ascii_alphanumeric() && b.is_ascii_alphabetic())
            || (a.is_ascii_alphabetic() && b.is_ascii_alphanumeric())
    );
    if needs_space {
        format!("{left} {right}")
    } else {
        format!("{left}{right}")
    }
}

/// Strip one trailing bracketed annotation: "売上高(百万円)" -> ("売上高", Some("百万円")).
pub fn split_trailing_bracket(text: &str) -> (&str, Option<&str>) {
    let trimmed = text.trim_end();
    if let Some(body) = trimmed.strip_suffix(')') {
        if let Some(open) = body.rfind('(') {
            let inner = body[open + 1..].trim();
            let head = body[..open].trim_end();
            if !head.is_empty() {
                return (head, Some(inner));
            }
        }
    }
    (trimmed, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_full_width_digits() {
        assert_eq!(fold_width("１２，３４５"), "12,345");
        assert_eq!(fold_width("％"), "%");
    }

    #[test]
    fn test_compact_removes_ideographic_space() {
        assert_eq!(compact("売\u{3000}上 高"), "売上高");
    }

    #[test]
    fn test_join_fragments() {
        assert_eq!(join_fragments("親会社株主に帰属する", "当期純利益"), "親会社株主に帰属する当期純利益");
        assert_eq!(join_fragments("Net", "sales"), "Net sales");
        assert_eq!(join_fragments("12,345", "百万円"), "12,345百万円");
    }

    #[test]
    fn test_split_trailing_bracket() {
        assert_eq!(split_trailing_bracket("売上高(百万円)"), ("売上高", Some("百万円")));
        assert_eq!(split_trailing_bracket("売上高"), ("売上高", None));
        assert_eq!(split_trailing_bracket("(注)"), ("(注)", None));
    }
}
