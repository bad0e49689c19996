//! Request parameter bag: path variables, route defaults, query string and body merged by priority.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A request parameter value. Lists come from `name[]=` query keys or JSON arrays.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Null,
    Text(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => ParamValue::Null,
            Value::Bool(b) => ParamValue::Text(if *b { "1" } else { "0" }.into()),
            Value::Number(n) => ParamValue::Text(n.to_string()),
            Value::String(s) => ParamValue::Text(s.clone()),
            Value::Array(items) => ParamValue::List(items.iter().map(ParamValue::from_json).collect()),
            Value::Object(_) => ParamValue::Text(v.to_string()),
        }
    }

    /// Null or empty text; both render as SQL `NULL`.
    pub fn is_blank(&self) -> bool {
        match self {
            ParamValue::Null => true,
            ParamValue::Text(s) => s.is_empty(),
            ParamValue::List(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    pub fn new() -> Self {
        Params(BTreeMap::new())
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// Text value of a parameter; lists and nulls yield `None`.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(ParamValue::as_text)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.0.remove(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ParamValue> {
        self.0.get_mut(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Merge `other` into self; values from `other` win.
    pub fn merge(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    /// Build from a JSON object; any other JSON value yields an empty bag.
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Object(map) => Params::from_map(map),
            _ => Params::new(),
        }
    }

    pub fn from_map(map: &serde_json::Map<String, Value>) -> Self {
        map.iter()
            .map(|(k, v)| (k.clone(), ParamValue::from_json(v)))
            .collect()
    }

    /// Build from url-encoded pairs. Keys ending in `[]` accumulate into a list.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut out = Params::new();
        for (k, v) in pairs {
            let key = k.as_ref();
            let value = ParamValue::Text(v.into());
            match key.strip_suffix("[]") {
                Some(name) => match out.0.get_mut(name) {
                    Some(ParamValue::List(items)) => items.push(value),
                    _ => {
                        out.0.insert(name.to_string(), ParamValue::List(vec![value]));
                    }
                },
                None => {
                    out.0.insert(key.to_string(), value);
                }
            }
        }
        out
    }

    /// Parse a raw query string (`a=1&b[]=2&b[]=3`).
    pub fn from_query(query: &str) -> Self {
        Params::from_pairs(url::form_urlencoded::parse(query.as_bytes()).into_owned())
    }
}

impl FromIterator<(String, ParamValue)> for Params {
    fn from_iter<T: IntoIterator<Item = (String, ParamValue)>>(iter: T) -> Self {
        Params(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_lists_accumulate() {
        let p = Params::from_query("id[]=1&id[]=2&name=Ann&xformat=json");
        assert_eq!(
            p.get("id"),
            Some(&ParamValue::List(vec!["1".into(), "2".into()]))
        );
        assert_eq!(p.text("name"), Some("Ann"));
        assert_eq!(p.text("xformat"), Some("json"));
    }

    #[test]
    fn json_values_become_text() {
        let p = Params::from_json(&serde_json::json!({"n": 4, "b": true, "x": null, "l": [1, "a"]}));
        assert_eq!(p.text("n"), Some("4"));
        assert_eq!(p.text("b"), Some("1"));
        assert_eq!(p.get("x"), Some(&ParamValue::Null));
        assert_eq!(p.get("l"), Some(&ParamValue::List(vec!["1".into(), "a".into()])));
    }

    #[test]
    fn merge_prefers_incoming() {
        let mut a = Params::from_query("a=1&b=1");
        a.merge(Params::from_query("b=2"));
        assert_eq!(a.text("a"), Some("1"));
        assert_eq!(a.text("b"), Some("2"));
    }

    #[test]
    fn blank_values() {
        assert!(ParamValue::Null.is_blank());
        assert!(ParamValue::from("").is_blank());
        assert!(!ParamValue::from("0").is_blank());
        assert!(!ParamValue::List(vec![]).is_blank());
    }
}
