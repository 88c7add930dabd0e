use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Property bag of a single entity (bridge, target or auth record), in display order.
pub type LbMap = IndexMap<String, LbValue>;

/// Represents a number that keeps the distinction between I64, U64, and F64 so
/// integer settings (ports, intervals) are written back as integers.
#[derive(Debug, Clone, PartialEq)]
pub enum LbNumber {
    I64(i64),
    U64(u64),
    F64(f64),
}

impl LbNumber {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            LbNumber::I64(v) => Some(*v),
            LbNumber::U64(v) => i64::try_from(*v).ok(),
            LbNumber::F64(_) => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            LbNumber::F64(v) => v.is_finite(),
            LbNumber::I64(_) | LbNumber::U64(_) => true,
        }
    }

    fn write_json(&self, out: &mut String) {
        match self {
            LbNumber::I64(v) => out.push_str(&v.to_string()),
            LbNumber::U64(v) => out.push_str(&v.to_string()),
            LbNumber::F64(v) => {
                // JSON has no spelling for NaN/Infinity.
                if !v.is_finite() {
                    out.push_str("null");
                    return;
                }
                let mut buf = ryu::Buffer::new();
                out.push_str(buf.format_finite(*v));
            }
        }
    }
}

impl Serialize for LbNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LbNumber::I64(v) => serializer.serialize_i64(*v),
            LbNumber::U64(v) => serializer.serialize_u64(*v),
            LbNumber::F64(v) => serializer.serialize_f64(*v),
        }
    }
}

impl<'de> Deserialize<'de> for LbNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NumberVisitor;

        impl<'de> de::Visitor<'de> for NumberVisitor {
            type Value = LbNumber;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a JSON number")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(LbNumber::I64(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(LbNumber::U64(v))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(LbNumber::F64(v))
            }
        }

        deserializer.deserialize_any(NumberVisitor)
    }
}

/// A node of the control data document.
/// Objects keep insertion order so bridges and forms show properties the way the server sent them.
#[derive(Debug, Clone, PartialEq)]
pub enum LbValue {
    Null,
    Bool(bool),
    Number(LbNumber),
    String(String),
    Array(Vec<LbValue>),
    Object(LbMap),
}

impl LbValue {
    pub fn empty_object() -> Self {
        LbValue::Object(IndexMap::new())
    }

    pub fn as_object(&self) -> Option<&LbMap> {
        match self {
            LbValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut LbMap> {
        match self {
            LbValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[LbValue]> {
        match self {
            LbValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<LbValue>> {
        match self {
            LbValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            LbValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            LbValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&LbValue> {
        self.as_object().and_then(|m| m.get(key))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut LbValue> {
        self.as_object_mut().and_then(|m| m.get_mut(key))
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, LbValue::Array(_) | LbValue::Object(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            LbValue::Null => "null",
            LbValue::Bool(_) => "bool",
            LbValue::Number(_) => "number",
            LbValue::String(_) => "string",
            LbValue::Array(_) => "array",
            LbValue::Object(_) => "object",
        }
    }

    /// Independent copy for staging edits. The tree is fully owned, so nothing is shared
    /// with `self` afterwards.
    pub fn deep_clone(&self) -> LbValue {
        self.clone()
    }

    /// Remove `key` from every object in the tree. Returns how many entries were dropped.
    pub fn strip_key(&mut self, key: &str) -> usize {
        match self {
            LbValue::Object(map) => {
                let mut removed = usize::from(map.shift_remove(key).is_some());
                for v in map.values_mut() {
                    removed += v.strip_key(key);
                }
                removed
            }
            LbValue::Array(values) => values.iter_mut().map(|v| v.strip_key(key)).sum(),
            _ => 0,
        }
    }

    /// True if `key` appears in any object of the tree.
    pub fn contains_key_deep(&self, key: &str) -> bool {
        match self {
            LbValue::Object(map) => {
                map.contains_key(key) || map.values().any(|v| v.contains_key_deep(key))
            }
            LbValue::Array(values) => values.iter().any(|v| v.contains_key_deep(key)),
            _ => false,
        }
    }

    /// True if every number in the tree can be written as JSON.
    pub fn is_json_safe(&self) -> bool {
        match self {
            LbValue::Number(n) => n.is_finite(),
            LbValue::Array(values) => values.iter().all(LbValue::is_json_safe),
            LbValue::Object(map) => map.values().all(LbValue::is_json_safe),
            _ => true,
        }
    }

    pub fn parse_json(text: &str) -> Result<LbValue, serde_json::Error> {
        serde_json::from_str::<LbValue>(text)
    }

    /// Relaxed parse for hand-edited text: comments and trailing commas are accepted.
    pub fn parse_json5(text: &str) -> Result<LbValue, json5::Error> {
        json5::from_str::<LbValue>(text)
    }

    pub fn to_json_pretty(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out, 0, true);
        out.push('\n');
        out
    }

    pub fn to_json_compact(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out, 0, false);
        out
    }

    fn write_json(&self, out: &mut String, indent: usize, pretty: bool) {
        match self {
            LbValue::Null => out.push_str("null"),
            LbValue::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
            LbValue::Number(n) => n.write_json(out),
            LbValue::String(s) => write_escaped_string(out, s),
            LbValue::Array(values) => {
                out.push('[');
                if pretty && !values.is_empty() {
                    out.push('\n');
                }
                for (i, v) in values.iter().enumerate() {
                    if pretty {
                        out.push_str(&" ".repeat(indent + 4));
                    }
                    v.write_json(out, indent + 4, pretty);
                    if i + 1 != values.len() {
                        out.push(',');
                    }
                    if pretty {
                        out.push('\n');
                    }
                }
                if pretty && !values.is_empty() {
                    out.push_str(&" ".repeat(indent));
                }
                out.push(']');
            }
            LbValue::Object(map) => {
                out.push('{');
                if pretty && !map.is_empty() {
                    out.push('\n');
                }
                for (i, (k, v)) in map.iter().enumerate() {
                    if pretty {
                        out.push_str(&" ".repeat(indent + 4));
                    }
                    write_escaped_string(out, k);
                    out.push(':');
                    if pretty {
                        out.push(' ');
                    }
                    v.write_json(out, indent + 4, pretty);
                    if i + 1 != map.len() {
                        out.push(',');
                    }
                    if pretty {
                        out.push('\n');
                    }
                }
                if pretty && !map.is_empty() {
                    out.push_str(&" ".repeat(indent));
                }
                out.push('}');
            }
        }
    }
}

impl From<&str> for LbValue {
    fn from(s: &str) -> Self {
        LbValue::String(s.to_string())
    }
}

impl From<String> for LbValue {
    fn from(s: String) -> Self {
        LbValue::String(s)
    }
}

impl From<bool> for LbValue {
    fn from(b: bool) -> Self {
        LbValue::Bool(b)
    }
}

impl From<i64> for LbValue {
    fn from(v: i64) -> Self {
        LbValue::Number(LbNumber::I64(v))
    }
}

impl From<LbMap> for LbValue {
    fn from(map: LbMap) -> Self {
        LbValue::Object(map)
    }
}

fn write_escaped_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write as _;
                write!(out, "\\u{:04x}", c as u32).ok();
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

impl Serialize for LbValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LbValue::Null => serializer.serialize_unit(),
            LbValue::Bool(v) => serializer.serialize_bool(*v),
            LbValue::Number(n) => n.serialize(serializer),
            LbValue::String(s) => serializer.serialize_str(s),
            LbValue::Array(values) => values.serialize(serializer),
            LbValue::Object(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for LbValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ValueVisitor;

        impl<'de> de::Visitor<'de> for ValueVisitor {
            type Value = LbValue;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a JSON value")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(LbValue::Null)
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(LbValue::Null)
            }

            fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
                Ok(LbValue::Bool(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(LbValue::Number(LbNumber::I64(v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(LbValue::Number(LbNumber::U64(v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(LbValue::Number(LbNumber::F64(v)))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                Ok(LbValue::String(v.to_owned()))
            }

            fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
                Ok(LbValue::String(v))
            }

            fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut values = Vec::new();
                while let Some(value) = seq.next_element::<LbValue>()? {
                    values.push(value);
                }
                Ok(LbValue::Array(values))
            }

            fn visit_map<A: de::MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut values = IndexMap::new();
                while let Some((key, value)) = map.next_entry::<String, LbValue>()? {
                    values.insert(key, value);
                }
                Ok(LbValue::Object(values))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::{LbNumber, LbValue};
    use crate::statics;

    #[test]
    fn parse_json_keeps_key_order_and_integer_kinds() {
        let v = LbValue::parse_json(r#"{"z": 1, "n": -3, "a": 2.5, "m": "x"}"#).unwrap();
        let keys: Vec<&str> = v.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "n", "a", "m"]);
        // serde_json hands non-negative integers over as u64
        assert_eq!(v.get("z"), Some(&LbValue::Number(LbNumber::U64(1))));
        assert_eq!(v.get("n"), Some(&LbValue::Number(LbNumber::I64(-3))));
        assert_eq!(v.get("a"), Some(&LbValue::Number(LbNumber::F64(2.5))));
    }

    #[test]
    fn parse_json5_accepts_comments_and_trailing_commas() {
        let v = LbValue::parse_json5("{ // note\n bridges: [], auth: {}, }").unwrap();
        assert!(v.get("bridges").unwrap().as_array().unwrap().is_empty());
        assert!(v.get("auth").unwrap().as_object().unwrap().is_empty());
    }

    #[test]
    fn deep_clone_is_independent() {
        let src = LbValue::parse_json(r#"{"bridges": [{"type": "a", "targets": []}]}"#).unwrap();
        let mut copy = src.deep_clone();
        assert_eq!(copy, src);

        copy.get_mut("bridges").unwrap().as_array_mut().unwrap()[0]
            .as_object_mut()
            .unwrap()
            .insert("label".to_string(), "changed".into());
        assert_ne!(copy, src);
        assert!(src.get("bridges").unwrap().as_array().unwrap()[0].get("label").is_none());
    }

    #[test]
    fn strip_key_removes_marker_at_every_depth() {
        let mut v = LbValue::parse_json(
            r#"{"__edited": true, "bridges": [{"__edited": true, "targets": [{"__edited": false}]}]}"#,
        )
        .unwrap();
        assert_eq!(v.strip_key(statics::LB_EDITED_MARKER), 3);
        assert!(!v.contains_key_deep(statics::LB_EDITED_MARKER));
    }

    #[test]
    fn to_json_pretty_uses_four_space_indent() {
        let v = LbValue::parse_json(r#"{"a": [1, "x"], "b": {}}"#).unwrap();
        assert_eq!(
            v.to_json_pretty(),
            "{\n    \"a\": [\n        1,\n        \"x\"\n    ],\n    \"b\": {}\n}\n"
        );
    }

    #[test]
    fn pretty_output_parses_back_identically() {
        let src = r#"{"s": "tab\there \"q\" \u0001", "f": 0.25, "n": null, "b": false}"#;
        let v = LbValue::parse_json(src).unwrap();
        assert_eq!(LbValue::parse_json(&v.to_json_pretty()).unwrap(), v);
    }

    #[test]
    fn non_finite_numbers_are_not_json_safe() {
        let v = LbValue::parse_json5("{ a: [1, Infinity] }").unwrap();
        assert!(!v.is_json_safe());
        assert_eq!(v.to_json_compact(), "{\"a\":[1,null]}");
        assert!(LbValue::parse_json(r#"{"a": 1.5}"#).unwrap().is_json_safe());
    }
}
