// src/feed/body.rs
//! Helpers over the semi-structured notification body documents.
//!
//! Bodies arrive as YAML-ish text and parse into `serde_yaml::Value`, so
//! every consumer does its own defensive field extraction. The helpers here
//! tolerate the upstream habit of shipping numbers both bare and quoted.

use serde_yaml::Value;

/// Look up a top-level field of a body mapping.
pub fn field<'a>(body: &'a Value, key: &str) -> Option<&'a Value> {
    body.as_mapping()?.get(Value::from(key))
}

/// A top-level field coerced to an integer, if present and scalar.
pub fn field_i64(body: &Value, key: &str) -> Option<i64> {
    field(body, key).and_then(value_i64)
}

/// A field of a nested mapping, coerced to a float.
pub fn nested_f64(body: &Value, outer: &str, key: &str) -> Option<f64> {
    field(body, outer).and_then(|inner| inner.as_mapping()?.get(Value::from(key)).and_then(value_f64))
}

pub fn value_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn value_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Compact single-line dump of a body document, used by the degraded
/// rendering path for kinds with no dedicated narrative.
pub fn dump(body: &Value) -> String {
    let mut out = String::new();
    write_value(body, &mut out);
    out
}

fn write_value(v: &Value, out: &mut String) {
    match v {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(s),
        Value::Sequence(seq) => {
            out.push('[');
            for (i, item) in seq.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(item, out);
            }
            out.push(']');
        }
        Value::Mapping(map) => {
            out.push('{');
            for (i, (k, val)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(k, out);
                out.push_str(": ");
                write_value(val, out);
            }
            out.push('}');
        }
        Value::Tagged(tagged) => write_value(&tagged.value, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn field_i64_accepts_bare_and_quoted_numbers() {
        let b = body("solarSystemID: 30000142\ntypeID: \"16213\"\n");
        assert_eq!(field_i64(&b, "solarSystemID"), Some(30000142));
        assert_eq!(field_i64(&b, "typeID"), Some(16213));
        assert_eq!(field_i64(&b, "moonID"), None);
    }

    #[test]
    fn nested_f64_reads_defense_values() {
        let b = body("aggressorAllianceID:\n  shieldValue: 0.567\n");
        assert_eq!(nested_f64(&b, "aggressorAllianceID", "shieldValue"), Some(0.567));
        assert_eq!(nested_f64(&b, "aggressorAllianceID", "armorValue"), None);
    }

    #[test]
    fn dump_is_single_line_and_ordered() {
        let b = body("corpID: 200\nallianceID: 100\n");
        assert_eq!(dump(&b), "{corpID: 200, allianceID: 100}");
    }
}
