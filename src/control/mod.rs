//! Declarative parameter descriptions and the namespaced schema.
//!
//! Every node type publishes a static table of its remotely settable
//! parameters. The tables serve two purposes: a remote UI generates its
//! controls from them, and inbound values are validated and clamped
//! against them before anything touches the audio graph.
//!
//! Tables are merged into one [`Schema`] keyed `"namespace:name"`:
//!
//! ```text
//! audio-player:period     float   0.05..1     0.1
//! mix:volume              float   -80..12     0
//! feedback-delay:feedback float   0..1        0.8
//! ```

pub mod router;

use std::{borrow::Cow, collections::BTreeMap};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use router::{
    ApplyReport, ControlCtx, Controllable, DispatchTable, ParameterRouter, ParameterUpdate,
    RouteError, Setter,
};

/// A value carried by a remote update.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(untagged))]
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(Cow<'static, str>),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            ParamValue::Int(v) => Some(v as f64),
            ParamValue::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            ParamValue::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Text(v) => Some(v.as_ref()),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<&'static str> for ParamValue {
    fn from(value: &'static str) -> Self {
        ParamValue::Text(Cow::Borrowed(value))
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(Cow::Owned(value))
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize),
    serde(tag = "type", rename_all = "lowercase")
)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamKind {
    Boolean,
    Float { min: f64, max: f64 },
    Integer { min: i64, max: i64 },
    Enum { list: &'static [&'static str] },
}

impl ParamKind {
    pub fn name(&self) -> &'static str {
        match self {
            ParamKind::Boolean => "boolean",
            ParamKind::Float { .. } => "float",
            ParamKind::Integer { .. } => "integer",
            ParamKind::Enum { .. } => "enum",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValueError {
    #[error("expected {expected}, got {got:?}")]
    TypeMismatch {
        expected: &'static str,
        got: ParamValue,
    },

    #[error("{0:?} is not one of the allowed values")]
    UnknownEnumValue(String),
}

/// Descriptor of one remotely settable parameter.
#[cfg_attr(feature = "serde", derive(Serialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub kind: ParamKind,
    pub default: ParamValue,
}

/// A node type's parameters, by name.
pub type ParamTable = &'static [(&'static str, ParamSpec)];

impl ParamSpec {
    pub const fn boolean(default: bool) -> Self {
        Self {
            kind: ParamKind::Boolean,
            default: ParamValue::Bool(default),
        }
    }

    pub const fn float(min: f64, max: f64, default: f64) -> Self {
        Self {
            kind: ParamKind::Float { min, max },
            default: ParamValue::Float(default),
        }
    }

    pub const fn integer(min: i64, max: i64, default: i64) -> Self {
        Self {
            kind: ParamKind::Integer { min, max },
            default: ParamValue::Int(default),
        }
    }

    pub const fn enumeration(list: &'static [&'static str], default: &'static str) -> Self {
        Self {
            kind: ParamKind::Enum { list },
            default: ParamValue::Text(Cow::Borrowed(default)),
        }
    }

    /// Check `value` against the declared type and clamp it into range.
    ///
    /// Integers are accepted for float parameters, and floats are rounded
    /// for integer ones.
    pub fn clamp(&self, value: &ParamValue) -> Result<ParamValue, ValueError> {
        let mismatch = || ValueError::TypeMismatch {
            expected: self.kind.name(),
            got: value.clone(),
        };

        match self.kind {
            ParamKind::Boolean => value.as_bool().map(ParamValue::Bool).ok_or_else(mismatch),
            ParamKind::Float { min, max } => value
                .as_f64()
                .filter(|v| !v.is_nan())
                .map(|v| ParamValue::Float(v.clamp(min, max)))
                .ok_or_else(mismatch),
            ParamKind::Integer { min, max } => value
                .as_f64()
                .filter(|v| !v.is_nan())
                .map(|v| ParamValue::Int((v.round() as i64).clamp(min, max)))
                .ok_or_else(mismatch),
            ParamKind::Enum { list } => {
                let text = value.as_str().ok_or_else(mismatch)?;
                if list.contains(&text) {
                    Ok(value.clone())
                } else {
                    Err(ValueError::UnknownEnumValue(text.to_string()))
                }
            }
        }
    }
}

/// All parameters of a composition, keyed `"namespace:name"`.
#[cfg_attr(feature = "serde", derive(Serialize), serde(transparent))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    params: BTreeMap<String, ParamSpec>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(namespace: &str, table: ParamTable) -> Self {
        let mut schema = Self::new();
        schema.insert_namespace(namespace, table);
        schema
    }

    pub fn insert_namespace(&mut self, namespace: &str, table: ParamTable) {
        for (name, spec) in table {
            self.params.insert(format!("{namespace}:{name}"), spec.clone());
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, spec: ParamSpec) {
        self.params.insert(key.into(), spec);
    }

    pub fn merge(&mut self, other: Schema) {
        self.params.extend(other.params);
    }

    pub fn get(&self, key: &str) -> Option<&ParamSpec> {
        self.params.get(key)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamSpec)> {
        self.params.iter().map(|(key, spec)| (key.as_str(), spec))
    }

    /// The defaults of every parameter, as one update batch.
    pub fn defaults(&self) -> ParameterUpdate {
        self.params
            .iter()
            .map(|(key, spec)| (key.clone(), spec.default.clone()))
            .collect()
    }

    /// Override defaults from a preset object (`{"mix:volume": -6, ...}`).
    ///
    /// Values are clamped like live updates. Returns the keys that were
    /// unknown or held a value of the wrong type.
    #[cfg(feature = "serde")]
    pub fn apply_preset(&mut self, preset: &serde_json::Value) -> Vec<String> {
        let Some(entries) = preset.as_object() else {
            tracing::warn!("preset is not a JSON object");
            return Vec::new();
        };

        let mut rejected = Vec::new();
        for (key, raw) in entries {
            let Some(spec) = self.params.get_mut(key) else {
                rejected.push(key.clone());
                continue;
            };
            let value = serde_json::from_value::<ParamValue>(raw.clone())
                .ok()
                .and_then(|value| spec.clamp(&value).ok());
            match value {
                Some(value) => spec.default = value,
                None => rejected.push(key.clone()),
            }
        }

        if !rejected.is_empty() {
            tracing::warn!(?rejected, "preset entries ignored");
        }
        rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: ParamTable = &[
        ("control", ParamSpec::enumeration(&["start", "stop"], "stop")),
        ("period", ParamSpec::float(0.05, 1.0, 0.1)),
        ("steps", ParamSpec::integer(1, 8, 4)),
        ("mute", ParamSpec::boolean(false)),
    ];

    #[test]
    fn namespaces_prefix_keys() {
        let schema = Schema::with_namespace("audio-player", TABLE);
        assert_eq!(schema.len(), 4);
        assert!(schema.get("audio-player:period").is_some());
        assert!(schema.get("period").is_none());
    }

    #[test]
    fn floats_are_clamped() {
        let spec = ParamSpec::float(0.05, 1.0, 0.1);
        assert_eq!(spec.clamp(&ParamValue::Float(4.0)), Ok(ParamValue::Float(1.0)));
        assert_eq!(spec.clamp(&ParamValue::Int(0)), Ok(ParamValue::Float(0.05)));
    }

    #[test]
    fn integers_round_then_clamp() {
        let spec = ParamSpec::integer(1, 8, 4);
        assert_eq!(spec.clamp(&ParamValue::Float(2.6)), Ok(ParamValue::Int(3)));
        assert_eq!(spec.clamp(&ParamValue::Int(99)), Ok(ParamValue::Int(8)));
    }

    #[test]
    fn wrong_types_are_rejected() {
        let spec = ParamSpec::boolean(false);
        assert!(matches!(
            spec.clamp(&ParamValue::Float(1.0)),
            Err(ValueError::TypeMismatch { expected: "boolean", .. })
        ));
        assert!(ParamSpec::float(0.0, 1.0, 0.5)
            .clamp(&ParamValue::Float(f64::NAN))
            .is_err());
    }

    #[test]
    fn enum_values_must_be_listed() {
        let spec = ParamSpec::enumeration(&["start", "stop"], "stop");
        assert!(spec.clamp(&"start".into()).is_ok());
        assert_eq!(
            spec.clamp(&"pause".into()),
            Err(ValueError::UnknownEnumValue("pause".into()))
        );
    }

    #[test]
    fn defaults_cover_every_key() {
        let schema = Schema::with_namespace("p", TABLE);
        let defaults = schema.defaults();
        assert_eq!(defaults.len(), 4);
        assert!(defaults
            .iter()
            .any(|(key, value)| key == "p:control" && value == &ParamValue::from("stop")));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn preset_overrides_defaults() {
        let mut schema = Schema::with_namespace("p", TABLE);
        let preset = serde_json::json!({
            "p:period": 5.0,
            "p:mute": true,
            "p:steps": "many",
            "q:unknown": 1,
        });

        let mut rejected = schema.apply_preset(&preset);
        rejected.sort();
        assert_eq!(rejected, vec!["p:steps".to_string(), "q:unknown".to_string()]);
        assert_eq!(schema.get("p:period").unwrap().default, ParamValue::Float(1.0));
        assert_eq!(schema.get("p:mute").unwrap().default, ParamValue::Bool(true));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn schema_serializes_for_remote_controls() {
        let schema = Schema::with_namespace("p", &TABLE[..2]);
        let json = serde_json::to_value(&schema).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "p:control": { "type": "enum", "list": ["start", "stop"], "default": "stop" },
                "p:period": { "type": "float", "min": 0.05, "max": 1.0, "default": 0.1 },
            })
        );
    }
}
