//! Route parameters shared by the codec, the manifest and the store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reserved key holding the hash fragment of a decoded URL.
pub const HASH_PARAM: &str = "#";

/// A single parameter value.
///
/// Catch-all segments and repeated search keys produce `Many`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    One(String),
    Many(Vec<String>),
}

impl ParamValue {
    /// First value, or the only one.
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::One(v) => Some(v),
            Self::Many(vs) => vs.first().map(String::as_str),
        }
    }

    /// All values as a slice-like vector of borrowed strings.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::One(v) => vec![v.as_str()],
            Self::Many(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    /// Appends a value, promoting `One` to `Many`.
    pub fn push(&mut self, value: String) {
        match self {
            Self::One(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Many(vec![first, value]);
            }
            Self::Many(vs) => vs.push(value),
        }
    }

    /// Values joined with `/`, the way a catch-all reads back as a path.
    pub fn joined(&self) -> String {
        self.values().join("/")
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Ordered parameter map. Ordering keeps encoded query strings stable.
pub type Params = BTreeMap<String, ParamValue>;

/// Builds a `Params` map from `(name, value)` pairs.
///
/// ```
/// use vxs_router::params::{params, ParamValue};
///
/// let p = params([("id", "5")]);
/// assert_eq!(p.get("id"), Some(&ParamValue::One("5".into())));
/// ```
pub fn params<I, K, V>(pairs: I) -> Params
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<ParamValue>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_promotes_to_many() {
        let mut value = ParamValue::from("a");
        value.push("b".to_string());
        assert_eq!(value, ParamValue::from(vec!["a", "b"]));
        assert_eq!(value.joined(), "a/b");
    }

    #[test]
    fn test_serde_untagged() {
        let p = params([("id", ParamValue::from("1")), ("rest", ParamValue::from(vec!["a", "b"]))]);
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"id":"1","rest":["a","b"]}"#);
    }
}
