//! Total ordering of terms
//!
//! Terms are ranked by kind first:
//!
//! ```text
//! variable < blank node < IRI < simple literal < typed / language literal
//! ```
//!
//! Blank nodes compare by local id and IRIs by their string. Typed literals
//! are grouped by value family (`numeric < temporal < binary < other`) and
//! compared by value inside a family, so that `"10"^^xsd:integer` sorts after
//! `"9"^^xsd:integer`. Literals whose values compare equal fall back to the
//! lexical form, then the datatype IRI, then the language tag. The result is a
//! strict total order that agrees with `Eq`.

use std::cmp::Ordering;

use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use super::{Literal, Term};
use crate::core::namespaces::xsd;

/// Value of a typed literal as used for ordering
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OrderValue {
    Numeric(f64),
    Temporal(NaiveDateTime),
    Binary(Vec<u8>),
    Other,
}

impl OrderValue {
    fn family(&self) -> u8 {
        match self {
            OrderValue::Numeric(_) => 0,
            OrderValue::Temporal(_) => 1,
            OrderValue::Binary(_) => 2,
            OrderValue::Other => 3,
        }
    }

    /// Compare two values of the same family
    fn cmp_within(&self, other: &OrderValue) -> Ordering {
        match (self, other) {
            (OrderValue::Numeric(a), OrderValue::Numeric(b)) => a.total_cmp(b),
            (OrderValue::Temporal(a), OrderValue::Temporal(b)) => a.cmp(b),
            (OrderValue::Binary(a), OrderValue::Binary(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

/// Parse a typed literal into its ordering value. Lexical forms that are not
/// valid for their datatype fall into `Other`.
pub(crate) fn order_value(lit: &Literal) -> OrderValue {
    let dt = match lit.datatype_uri() {
        Some(dt) => dt,
        None => return OrderValue::Other,
    };
    if xsd::is_numeric_type(dt) {
        return lit
            .as_double()
            .map(OrderValue::Numeric)
            .unwrap_or(OrderValue::Other);
    }
    if xsd::is_temporal_type(dt) {
        return parse_temporal(dt, lit.value())
            .map(OrderValue::Temporal)
            .unwrap_or(OrderValue::Other);
    }
    let bytes = match dt {
        xsd::BASE64_BINARY => base64::engine::general_purpose::STANDARD
            .decode(lit.value().trim())
            .ok(),
        xsd::HEX_BINARY => hex::decode(lit.value().trim()).ok(),
        _ => None,
    };
    bytes.map(OrderValue::Binary).unwrap_or(OrderValue::Other)
}

/// Parse an xsd:dateTime, xsd:date or xsd:time lexical form to a comparable
/// instant. Values with a timezone are normalised to UTC, values without one
/// are taken as UTC.
pub(crate) fn parse_temporal(datatype: &str, value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    match datatype {
        xsd::DATE_TIME => DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.naive_utc())
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()),
        xsd::DATE => {
            let (date_part, offset) = split_offset(value);
            let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
            Some(date.and_time(NaiveTime::from_hms_opt(0, 0, 0)?) - chrono::Duration::seconds(offset))
        }
        xsd::TIME => {
            let (time_part, offset) = split_offset(value);
            let time = NaiveTime::parse_from_str(time_part, "%H:%M:%S%.f").ok()?;
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)?;
            Some(epoch.and_time(time) - chrono::Duration::seconds(offset))
        }
        _ => None,
    }
}

/// Split a trailing `Z` / `±hh:mm` timezone off a date or time lexical form,
/// returning the offset in seconds
fn split_offset(value: &str) -> (&str, i64) {
    let (head, offset) = split_timezone(value);
    (head, offset.unwrap_or(0))
}

/// Like [`split_offset`], with `None` when the lexical form has no timezone
pub(crate) fn split_timezone(value: &str) -> (&str, Option<i64>) {
    if let Some(rest) = value.strip_suffix('Z') {
        return (rest, Some(0));
    }
    let split = value.len().saturating_sub(6);
    if split > 0 && value.is_char_boundary(split) {
        let (head, tz) = value.split_at(split);
        let bytes = tz.as_bytes();
        if (bytes[0] == b'+' || bytes[0] == b'-') && bytes[3] == b':' {
            if let (Ok(h), Ok(m)) = (tz[1..3].parse::<i64>(), tz[4..6].parse::<i64>()) {
                let secs = h * 3600 + m * 60;
                return (head, Some(if bytes[0] == b'-' { -secs } else { secs }));
            }
        }
    }
    (value, None)
}

fn kind_rank(term: &Term) -> u8 {
    match term {
        Term::Variable(_) => 0,
        Term::BlankNode(_) => 1,
        Term::Uri(_) => 2,
        Term::Literal(l) if l.is_plain() => 3,
        Term::Literal(_) => 4,
    }
}

fn cmp_literals(a: &Literal, b: &Literal) -> Ordering {
    if !a.is_plain() {
        let (va, vb) = (order_value(a), order_value(b));
        let by_value = va
            .family()
            .cmp(&vb.family())
            .then_with(|| va.cmp_within(&vb));
        if by_value != Ordering::Equal {
            return by_value;
        }
    }
    a.value()
        .cmp(b.value())
        .then_with(|| a.datatype_uri().cmp(&b.datatype_uri()))
        .then_with(|| a.language().cmp(&b.language()))
}

impl Ord for Term {
    fn cmp(&self, other: &Self) -> Ordering {
        kind_rank(self)
            .cmp(&kind_rank(other))
            .then_with(|| match (self, other) {
                (Term::Variable(a), Term::Variable(b)) => a.cmp(b),
                (Term::BlankNode(a), Term::BlankNode(b)) => a.cmp(b),
                (Term::Uri(a), Term::Uri(b)) => a.as_str().cmp(b.as_str()),
                (Term::Literal(a), Term::Literal(b)) => cmp_literals(a, b),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for Term {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Order two optional terms with unbound values lowest, as ORDER BY does
pub fn cmp_optional(a: Option<&Term>, b: Option<&Term>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn int(v: &str) -> Term {
        Term::typed_literal(v, xsd::INTEGER)
    }

    #[test]
    fn test_kind_order() {
        let mut terms = vec![
            Term::typed_literal("1", xsd::INTEGER),
            Term::literal("z"),
            Term::uri("http://example.org/a"),
            Term::blank("b"),
            Term::var("x"),
        ];
        terms.sort();
        assert!(terms[0].is_variable());
        assert!(terms[1].is_blank());
        assert!(terms[2].is_uri());
        assert_eq!(terms[3], Term::literal("z"));
        assert_eq!(terms[4], int("1"));
    }

    #[test]
    fn test_numeric_order() {
        assert!(int("9") < int("10"));
        assert!(int("-3") < Term::typed_literal("2.5", xsd::DECIMAL));
        assert!(Term::typed_literal("1e3", xsd::DOUBLE) > int("999"));
    }

    #[test]
    fn test_equal_values_fall_back_to_lexical() {
        let a = int("1");
        let b = int("01");
        assert_ne!(a, b);
        assert_ne!(a.cmp(&b), Ordering::Equal);
        assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
    }

    #[test]
    fn test_temporal_order() {
        let early = Term::typed_literal("2020-01-01T10:00:00Z", xsd::DATE_TIME);
        let late = Term::typed_literal("2020-01-01T09:00:00-02:00", xsd::DATE_TIME);
        assert!(early < late);

        let d1 = Term::typed_literal("1999-12-31", xsd::DATE);
        let d2 = Term::typed_literal("2000-01-01", xsd::DATE);
        assert!(d1 < d2);
    }

    #[test]
    fn test_multibyte_temporal_lexical_form() {
        let odd = Term::typed_literal("日日a", xsd::DATE);
        let date = Term::typed_literal("2020-01-01", xsd::DATE);
        assert!(date < odd);
        assert_eq!(odd.cmp(&date), Ordering::Greater);

        let time = Term::typed_literal("12:00:00+é1:00", xsd::TIME);
        assert_eq!(time.cmp(&time.clone()), Ordering::Equal);
        assert_eq!(split_offset("10:00:00+01:00"), ("10:00:00", 3600));
        assert_eq!(split_offset("ab日"), ("ab日", 0));
    }

    #[test]
    fn test_binary_order() {
        let a = Term::typed_literal("0aff", xsd::HEX_BINARY);
        let b = Term::typed_literal("0B00", xsd::HEX_BINARY);
        assert!(a < b);
    }

    #[test]
    fn test_family_ranking_keeps_order_transitive() {
        // "2" sorts after "10" lexically, but numerics rank ahead of strings
        let s = Term::typed_literal("2", xsd::STRING);
        assert!(int("3") < s);
        assert!(int("10") < s);
        assert!(int("3") < int("10"));
    }

    #[test]
    fn test_invalid_lexical_form_is_other() {
        let bad = int("abc");
        assert!(int("1000") < bad);
        assert!(bad < Term::typed_literal("abd", xsd::STRING));
    }

    #[test]
    fn test_cmp_optional() {
        let x = Term::literal("x");
        assert_eq!(cmp_optional(None, Some(&x)), Ordering::Less);
        assert_eq!(cmp_optional(Some(&x), Some(&x)), Ordering::Equal);
    }

    fn arb_term() -> impl Strategy<Value = Term> {
        prop_oneof![
            "[a-c]{1,2}".prop_map(|s| Term::var(&s)),
            "[a-c]{1,2}".prop_map(Term::blank),
            "[a-c]{1,2}".prop_map(|s| Term::uri(format!("http://example.org/{}", s))),
            "[a-c0-9]{0,2}".prop_map(Term::literal),
            "[a-c]{1,2}".prop_map(|s| Term::lang_literal("x", s)),
            (-20i64..20).prop_map(|v| int(&v.to_string())),
            "0?[0-9]{1,2}".prop_map(|s| int(&s)),
            (-5.0f64..5.0).prop_map(|v| Term::typed_literal(format!("{:.1}", v), xsd::DOUBLE)),
            "[0-9]{1,2}".prop_map(|s| Term::typed_literal(s, xsd::STRING)),
            (1u32..28).prop_map(|d| Term::typed_literal(format!("2020-02-{:02}", d), xsd::DATE)),
            "([0-9a-f]{2}){0,2}".prop_map(|s| Term::typed_literal(s, xsd::HEX_BINARY)),
        ]
    }

    proptest! {
        #[test]
        fn prop_order_is_antisymmetric(a in arb_term(), b in arb_term()) {
            prop_assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            prop_assert_eq!(a.cmp(&b) == Ordering::Equal, a == b);
        }

        #[test]
        fn prop_order_is_transitive(a in arb_term(), b in arb_term(), c in arb_term()) {
            let terms = [&a, &b, &c];
            for x in terms {
                for y in terms {
                    for z in terms {
                        if x <= y && y <= z {
                            prop_assert!(x <= z, "{} <= {} <= {} but not {} <= {}", x, y, z, x, z);
                        }
                    }
                }
            }
        }
    }
}
