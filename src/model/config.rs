//! Open key/value configuration.
//!
//! Parameters are kept as a string-keyed bag of heterogeneous values. Only a
//! handful of keys are interpreted by the runtime (`objective`, `num_class`,
//! `base_score`, `eval_metric`, `maximize_evaluation_metrics`); everything
//! else is carried verbatim for the grow collaborator and survives save/load.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// =============================================================================
// ParamValue
// =============================================================================

/// A single configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl ParamValue {
    /// Numeric view, parsing strings such as `"0.3"`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Integer view; floats must be integral.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            Self::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Boolean view accepting `true`/`false`/`1`/`0`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(0) => Some(false),
            Self::Int(1) => Some(true),
            Self::Str(s) => match s.trim() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Int(v) => serde_json::Value::from(*v),
            Self::Float(v) => serde_json::Value::from(*v),
            Self::Str(s) => serde_json::Value::String(s.clone()),
        }
    }

    fn from_json(key: &str, value: &serde_json::Value) -> Result<Self, ConfigError> {
        match value {
            serde_json::Value::Bool(b) => Ok(Self::Bool(*b)),
            serde_json::Value::String(s) => Ok(Self::Str(s.clone())),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float))
                .ok_or_else(|| ConfigError::InvalidParam {
                    key: key.to_string(),
                    value: n.to_string(),
                    expected: "a number representable as i64 or f64",
                }),
            other => Err(ConfigError::InvalidParam {
                key: key.to_string(),
                value: other.to_string(),
                expected: "a boolean, number or string",
            }),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_from_param {
    ($($t:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$t> for ParamValue {
                fn from(v: $t) -> Self {
                    Self::$variant(v as $target)
                }
            }
        )*
    };
}

impl_from_param! {
    i32 => Int as i64,
    i64 => Int as i64,
    u32 => Int as i64,
    usize => Int as i64,
    f32 => Float as f64,
    f64 => Float as f64,
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

// =============================================================================
// Config
// =============================================================================

/// String-keyed parameter bag with deterministic (sorted) iteration order.
///
/// ```
/// use treeboost::model::Config;
///
/// let config = Config::new()
///     .with("objective", "binary:logistic")
///     .with("eta", 0.3)
///     .with("max_depth", 2)
///     .with("maximize_evaluation_metrics", "false");
///
/// assert_eq!(config.get_f64("eta").unwrap(), Some(0.3));
/// assert_eq!(config.maximize_metrics().unwrap(), Some(false));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    params: BTreeMap<String, ParamValue>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter (builder pattern).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Set a parameter, returning the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Option<ParamValue> {
        self.params.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<ParamValue> {
        self.params.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    // =========================================================================
    // Typed getters
    // =========================================================================

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(ParamValue::as_str)
    }

    pub fn get_f64(&self, key: &str) -> Result<Option<f64>, ConfigError> {
        self.typed(key, ParamValue::as_f64, "a number")
    }

    pub fn get_i64(&self, key: &str) -> Result<Option<i64>, ConfigError> {
        self.typed(key, ParamValue::as_i64, "an integer")
    }

    pub fn get_u32(&self, key: &str) -> Result<Option<u32>, ConfigError> {
        self.typed(
            key,
            |v| v.as_i64().and_then(|i| u32::try_from(i).ok()),
            "a non-negative integer",
        )
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, ConfigError> {
        self.typed(key, ParamValue::as_bool, "a boolean")
    }

    fn typed<T>(
        &self,
        key: &str,
        convert: impl Fn(&ParamValue) -> Option<T>,
        expected: &'static str,
    ) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            None => Ok(None),
            Some(v) => convert(v).map(Some).ok_or_else(|| ConfigError::InvalidParam {
                key: key.to_string(),
                value: v.to_string(),
                expected,
            }),
        }
    }

    // =========================================================================
    // Recognized keys
    // =========================================================================

    /// Metric names from `eval_metric` (comma separated), in order.
    pub fn eval_metrics(&self) -> Vec<String> {
        self.get("eval_metric")
            .map(|v| {
                v.to_string()
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Explicit direction for early stopping, if configured.
    pub fn maximize_metrics(&self) -> Result<Option<bool>, ConfigError> {
        self.get_bool("maximize_evaluation_metrics")
    }

    /// Global bias in output space (default 0.5).
    pub fn base_score(&self) -> Result<f32, ConfigError> {
        Ok(self.get_f64("base_score")?.unwrap_or(0.5) as f32)
    }

    // =========================================================================
    // JSON
    // =========================================================================

    /// Render as a flat JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.params
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Parse a flat JSON object of scalar values.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        let object = value.as_object().ok_or_else(|| {
            ConfigError::Invalid(format!("configuration must be a JSON object, got {value}"))
        })?;
        object
            .iter()
            .map(|(k, v)| Ok((k.clone(), ParamValue::from_json(k, v)?)))
            .collect::<Result<BTreeMap<_, _>, ConfigError>>()
            .map(|params| Self { params })
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for Config {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> Extend<(K, V)> for Config {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ParamValue::Bool(true), Some(true))]
    #[case(ParamValue::from("false"), Some(false))]
    #[case(ParamValue::from("1"), Some(true))]
    #[case(ParamValue::Int(0), Some(false))]
    #[case(ParamValue::from("maybe"), None)]
    fn bool_parsing(#[case] value: ParamValue, #[case] expected: Option<bool>) {
        assert_eq!(value.as_bool(), expected);
    }

    #[test]
    fn typed_getters_parse_strings() {
        let config = Config::new().with("eta", "0.25").with("max_depth", "3");
        assert_eq!(config.get_f64("eta").unwrap(), Some(0.25));
        assert_eq!(config.get_u32("max_depth").unwrap(), Some(3));
        assert_eq!(config.get_f64("missing").unwrap(), None);
    }

    #[test]
    fn invalid_value_reports_key() {
        let config = Config::new().with("num_class", "three");
        let err = config.get_u32("num_class").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidParam { ref key, .. } if key == "num_class"));
    }

    #[test]
    fn eval_metrics_split_on_commas() {
        let config = Config::new().with("eval_metric", "error, logloss");
        assert_eq!(config.eval_metrics(), vec!["error", "logloss"]);
        assert!(Config::new().eval_metrics().is_empty());
    }

    #[test]
    fn json_round_trip() {
        let config = Config::new()
            .with("objective", "binary:logistic")
            .with("eta", 0.5)
            .with("max_depth", 2)
            .with("silent", true);
        let json = config.to_json();
        assert_eq!(json["max_depth"], serde_json::json!(2));
        assert_eq!(Config::from_json(&json).unwrap(), config);
    }

    #[test]
    fn json_rejects_nested_values() {
        let json = serde_json::json!({ "tree_method": ["hist"] });
        assert!(Config::from_json(&json).is_err());
        assert!(Config::from_json(&serde_json::json!([1, 2])).is_err());
    }
}
