//! Canonical encoder for [`Record`]s.
//!
//! The output is compact JSON text:
//!
//! 1. Object keys are sorted in byte order
//! 2. Array elements are sorted by their own canonical text
//! 3. No whitespace between tokens
//! 4. Strings use minimal escaping (quote, reverse solidus, control characters)
//! 5. Integral numbers are emitted without a fractional part
//! 6. Dates are RFC 3339 UTC strings with millisecond precision

use std::fmt::Write as _;

use chrono::SecondsFormat;
use serde_json::Number;

use super::record::{FieldValue, Record};

/// Largest magnitude at which every integer is exactly representable as an
/// `f64`.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Canonicalizes a record to bytes.
#[must_use]
pub fn canonicalize(record: &Record) -> Vec<u8> {
    canonicalize_to_string(record).into_bytes()
}

/// Canonicalizes a record to a string.
#[must_use]
pub fn canonicalize_to_string(record: &Record) -> String {
    let mut output = String::new();
    emit_record(record, &mut output);
    output
}

/// Canonical text of a single value, or `None` if the value is unsupported.
#[must_use]
pub fn canonical_value(value: &FieldValue) -> Option<String> {
    let mut output = String::new();
    emit_value(value, &mut output).then_some(output)
}

/// Emits `value` and returns `false` if nothing was written.
fn emit_value(value: &FieldValue, output: &mut String) -> bool {
    match value {
        FieldValue::String(s) => emit_string(s, output),
        FieldValue::Number(n) => emit_number(n, output),
        FieldValue::Bool(b) => output.push_str(if *b { "true" } else { "false" }),
        FieldValue::Date(d) => emit_string(&d.to_rfc3339_opts(SecondsFormat::Millis, true), output),
        FieldValue::Array(items) => emit_array(items, output),
        FieldValue::Map(record) => emit_record(record, output),
        FieldValue::Unsupported => return false,
    }
    true
}

#[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
fn emit_number(n: &Number, output: &mut String) {
    if let Some(i) = n.as_i64() {
        let _ = write!(output, "{i}");
    } else if let Some(u) = n.as_u64() {
        let _ = write!(output, "{u}");
    } else if let Some(f) = n.as_f64() {
        // 10.0 and 10 are the same number
        if f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER {
            let _ = write!(output, "{}", f as i64);
        } else {
            output.push_str(&n.to_string());
        }
    }
}

fn emit_string(s: &str, output: &mut String) {
    output.push('"');
    for c in s.chars() {
        match c {
            '"' => output.push_str("\\\""),
            '\\' => output.push_str("\\\\"),
            '\u{0008}' => output.push_str("\\b"),
            '\u{000C}' => output.push_str("\\f"),
            '\n' => output.push_str("\\n"),
            '\r' => output.push_str("\\r"),
            '\t' => output.push_str("\\t"),
            c if ('\u{0000}'..='\u{001F}').contains(&c) => {
                let _ = write!(output, "\\u{:04x}", c as u32);
            },
            c => output.push(c),
        }
    }
    output.push('"');
}

fn emit_array(items: &[FieldValue], output: &mut String) {
    let mut encoded: Vec<String> = items.iter().filter_map(canonical_value).collect();
    encoded.sort_unstable();

    output.push('[');
    output.push_str(&encoded.join(","));
    output.push(']');
}

fn emit_record(record: &Record, output: &mut String) {
    let mut fields: Vec<(&str, &FieldValue)> =
        record.iter().filter(|(_, v)| v.is_supported()).collect();
    fields.sort_unstable_by(|a, b| a.0.cmp(b.0));

    output.push('{');
    for (i, (key, value)) in fields.into_iter().enumerate() {
        if i > 0 {
            output.push(',');
        }
        emit_string(key, output);
        output.push(':');
        emit_value(value, output);
    }
    output.push('}');
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    use super::*;

    fn encode(value: serde_json::Value) -> String {
        canonicalize_to_string(&Record::from_json(value))
    }

    #[test]
    fn sorts_keys() {
        assert_eq!(
            encode(json!({ "name": "object", "id": 1 })),
            r#"{"id":1,"name":"object"}"#
        );
    }

    #[test]
    fn omits_unsupported_values() {
        let record = Record::new()
            .with("name", "object")
            .with("id", 1_i64)
            .with("bark", FieldValue::Unsupported)
            .with("empty", FieldValue::Unsupported);
        assert_eq!(canonicalize_to_string(&record), r#"{"id":1,"name":"object"}"#);
    }

    #[test]
    fn keeps_zero_false_and_empty_string() {
        assert_eq!(
            encode(json!({ "a": 0, "b": false, "c": "" })),
            r#"{"a":0,"b":false,"c":""}"#
        );
    }

    #[test]
    fn nested_records_and_dates() {
        let timestamp = Utc.timestamp_millis_opt(1_662_386_969_260).unwrap();
        let props = Record::new()
            .with("value", 10_i64)
            .with("bad", false)
            .with("timestamp", timestamp)
            .with("nested", Record::new().with("fine", true).with("a", 1_i64));
        let record = Record::new()
            .with("id", 1_i64)
            .with("name", "object")
            .with("props", props);

        assert_eq!(
            canonicalize_to_string(&record),
            r#"{"id":1,"name":"object","props":{"bad":false,"nested":{"a":1,"fine":true},"timestamp":"2022-09-05T14:09:29.260Z","value":10}}"#
        );
    }

    #[test]
    fn arrays_are_value_sorted() {
        let value = json!({
            "id": 1,
            "name": "object",
            "props": {
                "value": 10,
                "properties": [
                    { "id": 1, "bad": false },
                    { "id": 2, "bad": true },
                    { "id": 3, "bad": false, "optional": [1, 4, 2, 6, 3] }
                ],
                "bad": false,
                "nested": { "fine": true, "a": 1 }
            }
        });

        assert_eq!(
            encode(value),
            r#"{"id":1,"name":"object","props":{"bad":false,"nested":{"a":1,"fine":true},"properties":[{"bad":false,"id":1},{"bad":false,"id":3,"optional":[1,2,3,4,6]},{"bad":true,"id":2}],"value":10}}"#
        );
    }

    #[test]
    fn array_sort_is_textual() {
        assert_eq!(encode(json!({ "n": [9, 10, 1] })), r#"{"n":[1,10,9]}"#);
    }

    #[test]
    fn arrays_drop_unsupported_elements() {
        assert_eq!(encode(json!({ "n": [null, 2, null] })), r#"{"n":[2]}"#);
    }

    #[test]
    fn integral_floats_match_integers() {
        assert_eq!(encode(json!({ "v": 10.0 })), encode(json!({ "v": 10 })));
        assert_eq!(encode(json!({ "v": 1.5 })), r#"{"v":1.5}"#);
    }

    #[test]
    fn escapes_control_characters() {
        assert_eq!(
            encode(json!({ "s": "a\"b\\c\n\u{0001}" })),
            r#"{"s":"a\"b\\c\n\u0001"}"#
        );
    }

    #[test]
    fn canonical_value_of_unsupported_is_none() {
        assert!(canonical_value(&FieldValue::Unsupported).is_none());
        assert_eq!(canonical_value(&FieldValue::from("x")).as_deref(), Some("\"x\""));
    }

    #[test]
    fn fractional_numbers_and_dates_in_arrays() {
        let early = Utc.timestamp_millis_opt(1_000).unwrap();
        let late = Utc.timestamp_millis_opt(2_000).unwrap();
        let record = Record::new()
            .with("ratio", 0.25)
            .with("at", vec![late, early]);
        assert_eq!(
            canonicalize_to_string(&record),
            r#"{"at":["1970-01-01T00:00:01.000Z","1970-01-01T00:00:02.000Z"],"ratio":0.25}"#
        );
    }

    fn arb_value() -> impl Strategy<Value = FieldValue> {
        let leaf = prop_oneof![
            any::<bool>().prop_map(FieldValue::Bool),
            any::<i64>().prop_map(FieldValue::from),
            (any::<i32>(), 1u16..1000)
                .prop_map(|(whole, frac)| FieldValue::from(f64::from(whole) + f64::from(frac) / 1000.0)),
            (0i64..4_102_444_800_000).prop_map(|ms| {
                Utc.timestamp_millis_opt(ms)
                    .single()
                    .map_or(FieldValue::Unsupported, FieldValue::Date)
            }),
            "[a-z]{0,6}".prop_map(FieldValue::String),
            Just(FieldValue::Unsupported),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(FieldValue::Array),
                prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                    .prop_map(|m| FieldValue::Map(m.into_iter().collect())),
            ]
        })
    }

    /// Reverses key order and array order at every level.
    fn permute(value: &FieldValue) -> FieldValue {
        match value {
            FieldValue::Array(items) => FieldValue::Array(items.iter().rev().map(permute).collect()),
            FieldValue::Map(record) => FieldValue::Map(permute_record(record)),
            other => other.clone(),
        }
    }

    fn permute_record(record: &Record) -> Record {
        let fields: Vec<(&str, &FieldValue)> = record.iter().collect();
        fields
            .into_iter()
            .rev()
            .map(|(k, v)| (k.to_owned(), permute(v)))
            .collect()
    }

    proptest! {
        #[test]
        fn prop_canonicalize_ignores_key_and_array_order(
            fields in prop::collection::btree_map("[a-z]{1,6}", arb_value(), 0..6)
        ) {
            let record: Record = fields.into_iter().collect();
            let permuted = permute_record(&record);
            prop_assert_eq!(canonicalize(&record), canonicalize(&permuted));
        }
    }
}
