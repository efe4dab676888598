use crate::config::schema::UnitDef;
use crate::error::TanshinError;
use crate::model::{NormalizedValue, ParsedValue, UnitClass};
use crate::parsing::text::compact;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a value cell from a tanshin table into a ParsedValue.
///
/// `expected` is the unit class of the metric the row was matched to, and
/// `hint` is a unit picked up from the surrounding table (header row,
/// label annotation or an adjacent unit-only cell). Handles formats like:
/// - "12,345" with a "百万円" hint -> 12,345,000,000 yen
/// - "△1,200百万円" -> -1,200,000,000 yen
/// - "１２．５％" -> 12.5 %
/// - "1,000～1,200" -> Range
/// - "-" or "―" -> NotApplicable
pub fn parse_value(
    raw: &str,
    expected: UnitClass,
    hint: Option<&UnitDef>,
    units: &[UnitDef],
) -> Result<ParsedValue, TanshinError> {
    let s = compact(raw);

    if s.is_empty() {
        return Err(TanshinError::parse(raw, "empty cell"));
    }

    if s.chars().all(is_dash) {
        return Ok(ParsedValue::NotApplicable);
    }

    if let Some((low, high)) = split_range(&s) {
        let low = parse_single(low, raw, expected, hint, units)?;
        let high = parse_single(high, raw, expected, hint, units)?;
        return Ok(ParsedValue::Range { low, high });
    }

    parse_single(&s, raw, expected, hint, units).map(ParsedValue::Value)
}

fn parse_single(
    s: &str,
    raw: &str,
    expected: UnitClass,
    hint: Option<&UnitDef>,
    units: &[UnitDef],
) -> Result<NormalizedValue, TanshinError> {
    let (negative, rest) = strip_sign(s);
    let body: String = rest.chars().filter(|c| *c != ',').collect();

    let unit = unit_suffix(&body, units);
    let digits = match unit {
        Some(u) => &body[..body.len() - compact(&u.token).len()],
        None => body.as_str(),
    };

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(TanshinError::parse(raw, "no numeric pattern recognized"));
    }

    let number = Decimal::from_str(digits).map_err(|e| TanshinError::parse(raw, e.to_string()))?;

    let (unit_class, scale) = match unit {
        Some(u) if !unit_fits(u.class, expected) => {
            return Err(TanshinError::parse(
                raw,
                format!("unit {} does not fit a {expected} figure", u.token),
            ));
        }
        Some(u) => (expected, u.scale),
        None => match hint {
            Some(h) if h.class == expected => (expected, h.scale),
            _ => (expected, Decimal::ONE),
        },
    };

    let magnitude = number
        .checked_mul(scale)
        .ok_or_else(|| TanshinError::parse(raw, "value out of range"))?;

    Ok(NormalizedValue {
        value: if negative { -magnitude } else { magnitude },
        unit: unit_class,
        scale,
    })
}

/// Whether a unit of class `found` can carry a figure of class `expected`.
/// A bare "円" in a per-share row means yen per share.
pub fn unit_fits(found: UnitClass, expected: UnitClass) -> bool {
    found == expected
        || (found == UnitClass::Currency && expected == UnitClass::PerShareCurrency)
}

fn strip_sign(s: &str) -> (bool, &str) {
    for marker in ['△', '▲', '-', '−'] {
        if let Some(rest) = s.strip_prefix(marker) {
            return (true, rest);
        }
    }
    match s.strip_prefix('+') {
        Some(rest) => (false, rest),
        None => (false, s),
    }
}

fn split_range(s: &str) -> Option<(&str, &str)> {
    let idx = s.find(['~', '〜'])?;
    let sep_len = s[idx..].chars().next()?.len_utf8();
    let (low, high) = (&s[..idx], &s[idx + sep_len..]);
    if low.is_empty() || high.is_empty() {
        None
    } else {
        Some((low, high))
    }
}

fn is_dash(c: char) -> bool {
    matches!(c, '-' | '―' | '—' | '‐' | '−' | '–' | 'ー')
}

/// The longest configured unit token the text ends with.
pub fn unit_suffix<'a>(text: &str, units: &'a [UnitDef]) -> Option<&'a UnitDef> {
    units
        .iter()
        .filter(|u| text.ends_with(compact(&u.token).as_str()))
        .max_by_key(|u| u.token.chars().count())
}

/// Recognize a cell that holds nothing but a unit: "百万円", "(円銭)", "(単位:百万円)".
pub fn unit_only<'a>(text: &str, units: &'a [UnitDef]) -> Option<&'a UnitDef> {
    let s = compact(text);
    let s = s.trim_start_matches(['(', '[']).trim_end_matches([')', ']']);
    let s = s.strip_prefix("単位:").unwrap_or(s);
    units.iter().find(|u| compact(&u.token) == s)
}

/// The longest unit token appearing anywhere in a header or title line.
pub fn find_unit<'a>(text: &str, units: &'a [UnitDef]) -> Option<&'a UnitDef> {
    let s = compact(text);
    units
        .iter()
        .filter(|u| s.contains(compact(&u.token).as_str()))
        .max_by_key(|u| u.token.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn units() -> Vec<UnitDef> {
        let unit = |token: &str, scale: Decimal, class| UnitDef {
            token: token.to_string(),
            scale,
            class,
        };
        vec![
            unit("百万円", dec!(1000000), UnitClass::Currency),
            unit("千円", dec!(1000), UnitClass::Currency),
            unit("円銭", dec!(1), UnitClass::PerShareCurrency),
            unit("円", dec!(1), UnitClass::Currency),
            unit("%", dec!(1), UnitClass::Percentage),
            unit("％", dec!(1), UnitClass::Percentage),
            unit("株", dec!(1), UnitClass::Count),
        ]
    }

    fn value(raw: &str, expected: UnitClass) -> NormalizedValue {
        match parse_value(raw, expected, None, &units()).unwrap() {
            ParsedValue::Value(v) => v,
            other => panic!("expected a value, got {other:?}"),
        }
    }

    #[test]
    fn test_million_yen_suffix() {
        let v = value("12,345百万円", UnitClass::Currency);
        assert_eq!(v.value, dec!(12345000000));
        assert_eq!(v.scale, dec!(1000000));
        assert_eq!(v.unit, UnitClass::Currency);
    }

    #[test]
    fn test_million_yen_positive_for_many_tokens() {
        for digits in ["1", "980", "1,000", "123,456", "0.5"] {
            let expected = Decimal::from_str(&digits.replace(',', "")).unwrap() * dec!(1000000);
            let v = value(&format!("{digits}百万円"), UnitClass::Currency);
            assert_eq!(v.value, expected, "{digits}");
            assert!(!v.is_negative());
        }
    }

    #[test]
    fn test_triangle_is_negative_for_every_unit() {
        let cases = [
            ("△1,200百万円", UnitClass::Currency),
            ("▲1,200千円", UnitClass::Currency),
            ("△3.5%", UnitClass::Percentage),
            ("△12円", UnitClass::PerShareCurrency),
            ("△ 7", UnitClass::Count),
        ];
        for (raw, class) in cases {
            let v = value(raw, class);
            assert!(v.is_negative(), "{raw}");
            assert_eq!(v.unit, class, "{raw}");
        }
        assert_eq!(value("△1,200百万円", UnitClass::Currency).value, dec!(-1200000000));
    }

    #[test]
    fn test_explicit_minus_honored() {
        assert_eq!(value("-45", UnitClass::Currency).value, dec!(-45));
        assert_eq!(value("+45", UnitClass::Currency).value, dec!(45));
    }

    #[test]
    fn test_full_width_digits() {
        let v = value("１２．５％", UnitClass::Percentage);
        assert_eq!(v.value, dec!(12.5));
        assert_eq!(v.unit, UnitClass::Percentage);
    }

    #[test]
    fn test_hint_applies_when_class_matches() {
        let units = units();
        let hint = &units[0];
        let v = parse_value("12,345", UnitClass::Currency, Some(hint), &units).unwrap();
        assert_eq!(v.as_value().unwrap().value, dec!(12345000000));

        // A million-yen table hint does not rescale a percentage column.
        let v = parse_value("12.5", UnitClass::Percentage, Some(hint), &units).unwrap();
        assert_eq!(v.as_value().unwrap().value, dec!(12.5));
    }

    #[test]
    fn test_yen_in_per_share_context() {
        let v = value("123.45円", UnitClass::PerShareCurrency);
        assert_eq!(v.unit, UnitClass::PerShareCurrency);
        assert_eq!(v.value, dec!(123.45));
    }

    #[test]
    fn test_unit_of_another_class_rejected() {
        let units = units();
        let err = parse_value("5.2%", UnitClass::Currency, None, &units).unwrap_err();
        assert!(err.to_string().contains('%'), "{err}");
        assert!(parse_value("12,345百万円", UnitClass::Percentage, None, &units).is_err());
        assert!(parse_value("1,000～1,200%", UnitClass::Currency, None, &units).is_err());
        assert!(parse_value("1,000株", UnitClass::PerShareCurrency, None, &units).is_err());
    }

    #[test]
    fn test_not_applicable_markers() {
        for raw in ["-", "―", "－", "—", " - "] {
            assert_eq!(
                parse_value(raw, UnitClass::Currency, None, &units()).unwrap(),
                ParsedValue::NotApplicable,
                "{raw}"
            );
        }
    }

    #[test]
    fn test_not_applicable_distinct_from_zero_and_error() {
        let zero = parse_value("0", UnitClass::Currency, None, &units()).unwrap();
        assert_eq!(zero.as_value().unwrap().value, Decimal::ZERO);
        assert!(!zero.is_not_applicable());
        assert!(parse_value("n.a.", UnitClass::Currency, None, &units()).is_err());
    }

    #[test]
    fn test_range() {
        let v = parse_value("1,000～1,200", UnitClass::Currency, Some(&units()[0]), &units()).unwrap();
        match v {
            ParsedValue::Range { low, high } => {
                assert_eq!(low.value, dec!(1000000000));
                assert_eq!(high.value, dec!(1200000000));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_returns_error() {
        assert!(parse_value("abc", UnitClass::Currency, None, &units()).is_err());
        assert!(parse_value("百万円", UnitClass::Currency, None, &units()).is_err());
        assert!(parse_value("", UnitClass::Currency, None, &units()).is_err());
    }

    #[test]
    fn test_round_trip_through_canonical_token() {
        let cases = [
            ("△1,200百万円", UnitClass::Currency),
            ("12,345百万円", UnitClass::Currency),
            ("△3.25%", UnitClass::Percentage),
            ("123.45円", UnitClass::PerShareCurrency),
            ("1,000株", UnitClass::Count),
        ];
        for (raw, class) in cases {
            let first = value(raw, class);
            let second = value(&first.to_token(), class);
            assert_eq!(first.value, second.value, "{raw}");
            assert_eq!(first.unit, second.unit, "{raw}");
            assert_eq!(first.is_negative(), second.is_negative(), "{raw}");
        }
    }

    #[test]
    fn test_unit_only_cells() {
        let units = units();
        assert_eq!(unit_only("百万円", &units).map(|u| u.token.as_str()), Some("百万円"));
        assert_eq!(unit_only("（円銭）", &units).map(|u| u.token.as_str()), Some("円銭"));
        assert_eq!(unit_only("(単位：百万円)", &units).map(|u| u.token.as_str()), Some("百万円"));
        assert!(unit_only("12,345", &units).is_none());
    }

    #[test]
    fn test_find_unit_prefers_longest() {
        let units = units();
        let u = find_unit("（単位：百万円、端数切捨て）", &units).unwrap();
        assert_eq!(u.token, "百万円");
    }
}
