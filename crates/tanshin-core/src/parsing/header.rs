use crate::model::DocumentHeader;
use crate::parsing::text::fold_width;

/// Extract document identification from the text lines of the first page.
pub fn parse_header(lines: &[&str]) -> DocumentHeader {
    let mut header = DocumentHeader::default();

    for line in lines {
        let line = fold_width(line);

        if header.securities_code.is_none() {
            if let Some(val) = extract_after_label(&line, "コード番号") {
                header.securities_code = parse_securities_code(&val);
            }
        }

        if header.company_name.is_none() {
            if let Some(val) = extract_after_label(&line, "上場会社名") {
                header.company_name = Some(val);
            } else if let Some(val) = extract_after_label(&line, "会社名") {
                header.company_name = Some(val);
            }
        }
    }

    header
}

/// Four-character securities code: four digits ("7203") or three digits
/// and a letter ("130A").
fn parse_securities_code(val: &str) -> Option<String> {
    let code: String = val.chars().take(4).collect();
    let chars: Vec<char> = code.chars().collect();
    if chars.len() != 4 || !chars[..3].iter().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if chars[3].is_ascii_digit() || chars[3].is_ascii_alphabetic() {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

/// Extract a value appearing after a label.
/// Handles "Label: value" and "Label    value"; truncates at the next
/// large whitespace gap (3+ spaces) so trailing fields on the same line
/// ("上場取引所  東") are not captured.
fn extract_after_label(line: &str, label: &str) -> Option<String> {
    let idx = line.find(label)?;
    let after = &line[idx + label.len()..];
    let trimmed = after.trim_start_matches(|c: char| c == ':' || c.is_whitespace());
    let value = match trimmed.find("   ") {
        Some(gap_pos) => trimmed[..gap_pos].trim(),
        None => trimmed.trim(),
    };
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header_basic() {
        let lines = [
            "2025年3月期 決算短信〔日本基準〕(連結)",
            "上場会社名   サンプル工業株式会社   上場取引所   東",
            "コード番号   7203   URL   https://example.co.jp",
        ];
        let h = parse_header(&lines);
        assert_eq!(h.securities_code.as_deref(), Some("7203"));
        assert_eq!(h.company_name.as_deref(), Some("サンプル工業株式会社"));
    }

    #[test]
    fn test_alphanumeric_code_full_width() {
        let lines = ["コード番号：１３０Ａ"];
        let h = parse_header(&lines);
        assert_eq!(h.securities_code.as_deref(), Some("130A"));
    }

    #[test]
    fn test_invalid_code_ignored() {
        let lines = ["コード番号 ABCD"];
        assert!(parse_header(&lines).securities_code.is_none());
    }

    #[test]
    fn test_missing_fields() {
        let lines = ["売上高   12,345"];
        assert_eq!(parse_header(&lines), DocumentHeader::default());
    }
}
