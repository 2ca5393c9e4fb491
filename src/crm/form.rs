//! Form-nested decoder
//!
//! AmoCRM posts webhook bodies as flat form-encoded pairs with bracketed
//! keys (`leads[status][0][id]=42`). This module folds such pairs into a
//! nested `serde_json::Value` and provides the inverse for tests.
//!
//! The decoder is permissive: mixed shapes are never rejected, and the
//! insertion order of non-numeric keys is preserved.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Index(usize),
    Key(String),
}

fn segment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[A-Za-z0-9_]+").expect("static regex"))
}

/// Split a bracketed key into path segments: maximal word runs, numeric
/// runs denoting sequence indices
fn parse_segments(key: &str) -> Vec<Segment> {
    segment_regex()
        .find_iter(key)
        .map(|m| {
            let run = m.as_str();
            match run.parse::<usize>() {
                Ok(index) => Segment::Index(index),
                Err(_) => Segment::Key(run.to_string()),
            }
        })
        .collect()
}

/// Decode flat form pairs into a nested structure
pub fn decode(pairs: &[(String, String)]) -> Value {
    let mut root = Value::Object(Map::new());

    for (key, value) in pairs {
        let segments = parse_segments(key);
        if segments.is_empty() {
            continue;
        }
        assign(&mut root, &segments, value);
    }

    root
}

fn assign(node: &mut Value, segments: &[Segment], value: &str) {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return,
    };

    match head {
        Segment::Key(key) => {
            let map = match node {
                Value::Object(map) => map,
                // Name segment against a sequence: descend into a fresh
                // trailing element rather than reject (CRM payload quirk).
                Value::Array(arr) => {
                    arr.push(Value::Object(Map::new()));
                    match arr.last_mut() {
                        Some(Value::Object(map)) => map,
                        _ => return,
                    }
                }
                other => {
                    *other = Value::Object(Map::new());
                    match other {
                        Value::Object(map) => map,
                        _ => return,
                    }
                }
            };

            let child = map.entry(key.clone()).or_insert(Value::Null);
            descend(child, rest, value);
        }
        Segment::Index(index) => {
            match node {
                Value::Array(arr) => {
                    // Grow with empty mappings until the index is reachable
                    while arr.len() <= *index {
                        arr.push(Value::Object(Map::new()));
                    }
                    descend(&mut arr[*index], rest, value);
                }
                // Numeric segment against a mapping: keep the mapping and
                // use the index as a plain key (lenient, matches CRM's
                // real payloads).
                Value::Object(map) => {
                    let child = map.entry(index.to_string()).or_insert(Value::Null);
                    descend(child, rest, value);
                }
                other => {
                    *other = Value::Array(Vec::new());
                    assign(other, segments, value);
                }
            }
        }
    }
}

fn descend(child: &mut Value, rest: &[Segment], value: &str) {
    if rest.is_empty() {
        *child = Value::String(value.to_string());
        return;
    }

    // Materialize the container the next segment expects, unless one
    // already exists (mismatches are handled leniently in assign)
    if child.is_null() {
        *child = match rest[0] {
            Segment::Index(_) => Value::Array(Vec::new()),
            Segment::Key(_) => Value::Object(Map::new()),
        };
    }

    assign(child, rest, value);
}

/// Encode a nested structure back into flat bracketed pairs.
///
/// Inverse of `decode` for structures the decoder can produce.
pub fn encode(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    encode_walk(value, String::new(), &mut out);
    out
}

fn encode_walk(value: &Value, prefix: String, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}[{}]", prefix, key)
                };
                encode_walk(child, path, out);
            }
        }
        Value::Array(arr) => {
            for (index, child) in arr.iter().enumerate() {
                encode_walk(child, format!("{}[{}]", prefix, index), out);
            }
        }
        Value::String(s) => out.push((prefix, s.clone())),
        other => out.push((prefix, other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_decode_nested_sequence() {
        let decoded = decode(&pairs(&[("a[b][0][c]", "x"), ("a[b][1][c]", "y")]));
        assert_eq!(decoded, json!({"a": {"b": [{"c": "x"}, {"c": "y"}]}}));
    }

    #[test]
    fn test_decode_webhook_shape() {
        let decoded = decode(&pairs(&[
            ("leads[status][0][id]", "1001"),
            ("leads[status][0][status_id]", "63819778"),
            ("leads[status][0][pipeline_id]", "555"),
            ("leads[status][0][old_status_id]", "65736946"),
            ("account[subdomain]", "acme"),
        ]));

        assert_eq!(
            decoded["leads"]["status"][0]["status_id"],
            json!("63819778")
        );
        assert_eq!(decoded["account"]["subdomain"], json!("acme"));
    }

    #[test]
    fn test_decode_grows_sequences_with_empty_mappings() {
        let decoded = decode(&pairs(&[("a[2][b]", "v")]));
        assert_eq!(decoded, json!({"a": [{}, {}, {"b": "v"}]}));
    }

    #[test]
    fn test_decode_preserves_key_order() {
        let decoded = decode(&pairs(&[("z[a]", "1"), ("b[a]", "2"), ("a[a]", "3")]));
        let keys: Vec<&String> = decoded.as_object().unwrap().keys().collect();
        assert_eq!(keys, ["z", "b", "a"]);
    }

    #[test]
    fn test_decode_lenient_on_numeric_segment_against_mapping() {
        // "a[b]" fixes `a` as a mapping; "a[0]" must not reject
        let decoded = decode(&pairs(&[("a[b]", "x"), ("a[0]", "y")]));
        assert_eq!(decoded["a"]["b"], json!("x"));
        assert_eq!(decoded["a"]["0"], json!("y"));
    }

    #[test]
    fn test_decode_ignores_empty_key() {
        let decoded = decode(&pairs(&[("", "x"), ("a", "y")]));
        assert_eq!(decoded, json!({"a": "y"}));
    }

    #[test]
    fn test_encode_round_trip_example() {
        let original = json!({"a": {"b": [{"c": "x"}, {"c": "y"}]}});
        let encoded = encode(&original);
        assert_eq!(
            encoded,
            pairs(&[("a[b][0][c]", "x"), ("a[b][1][c]", "y")])
        );
        assert_eq!(decode(&encoded), original);
    }

    // Strategy over structures the decoder can produce: string leaves,
    // mappings with word keys, sequences of mappings.
    fn decoder_value() -> impl Strategy<Value = Value> {
        let leaf = "[a-z][a-z0-9_]{0,8}".prop_map(Value::String);
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(
                    ("[a-z][a-z0-9_]{0,6}", inner.clone()),
                    1..4
                )
                .prop_map(|entries| {
                    let mut map = Map::new();
                    for (k, v) in entries {
                        map.insert(k, v);
                    }
                    Value::Object(map)
                }),
                prop::collection::vec(
                    prop::collection::vec(("[a-z][a-z0-9_]{0,6}", inner), 1..3).prop_map(
                        |entries| {
                            let mut map = Map::new();
                            for (k, v) in entries {
                                map.insert(k, v);
                            }
                            Value::Object(map)
                        }
                    ),
                    1..3
                )
                .prop_map(Value::Array),
            ]
        })
    }

    proptest! {
        #[test]
        fn prop_encode_decode_round_trip(entries in prop::collection::vec(
            ("[a-z][a-z0-9_]{0,6}", decoder_value()), 1..4)) {
            let mut map = Map::new();
            for (k, v) in entries {
                map.insert(k, v);
            }
            let original = Value::Object(map);

            let decoded = decode(&encode(&original));
            prop_assert_eq!(decoded, original);
        }
    }
}
