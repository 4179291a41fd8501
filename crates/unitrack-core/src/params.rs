//! Run configuration values and their flattening into backend parameters.
//!
//! Any configuration is first converted into a [`ConfigValue`], then
//! [`normalize`] turns it into a single-level [`Params`] mapping whose keys are
//! the `/`-joined paths of the nested keys:
//!
//! ```
//! use unitrack_core::{normalize, ConfigValue};
//!
//! let config = ConfigValue::mapping([
//!     ("model", ConfigValue::mapping([("lr", 0.1)])),
//!     ("layers", ConfigValue::sequence([64, 32])),
//! ]);
//! let params = normalize(Some(&config)).unwrap();
//! assert_eq!(params["model/lr"], 0.1);
//! assert_eq!(params["layers/list_len"], 2);
//! assert_eq!(params["layers/1"], 32);
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::{Result, TrackingError};

/// Flat parameter mapping handed to parameter-logging backends.
pub type Params = Map<String, Value>;

/// Key holding the element count of a sequence converted to a mapping.
pub const LIST_LEN_KEY: &str = "list_len";

/// A configuration value of any shape.
///
/// Mappings and records keep the order their entries were given in.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A filesystem path, logged as its string form.
    Path(PathBuf),
    /// An enumerated value, logged as the value it stores.
    Enum {
        variant: String,
        value: Box<ConfigValue>,
    },
    Sequence(Vec<ConfigValue>),
    Mapping(Vec<(String, ConfigValue)>),
    /// A structured record with named fields.
    Record {
        name: String,
        fields: Vec<(String, ConfigValue)>,
    },
}

impl ConfigValue {
    pub fn mapping<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        ConfigValue::Mapping(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn record<K, V>(name: impl Into<String>, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<ConfigValue>,
    {
        ConfigValue::Record {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn sequence<V: Into<ConfigValue>>(items: impl IntoIterator<Item = V>) -> Self {
        ConfigValue::Sequence(items.into_iter().map(Into::into).collect())
    }

    pub fn enumeration(variant: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        ConfigValue::Enum {
            variant: variant.into(),
            value: Box::new(value.into()),
        }
    }

    /// Convert any serializable value through its JSON representation.
    ///
    /// Paths serialize to strings and unit enum variants to their names, so
    /// the result only needs the plain scalar/sequence/mapping variants.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        Ok(serde_json::to_value(value)?.into())
    }
}

/// Conversion of a structured record into a [`ConfigValue`].
///
/// Implement this for configuration structs that should keep their record
/// shape, paths and enums instead of going through [`ConfigValue::from_serialize`].
pub trait ToConfigValue {
    fn to_config_value(&self) -> ConfigValue;
}

impl ToConfigValue for ConfigValue {
    fn to_config_value(&self) -> ConfigValue {
        self.clone()
    }
}

impl From<bool> for ConfigValue {
    fn from(v: bool) -> Self {
        ConfigValue::Bool(v)
    }
}
impl From<i32> for ConfigValue {
    fn from(v: i32) -> Self {
        ConfigValue::Int(v as i64)
    }
}
impl From<i64> for ConfigValue {
    fn from(v: i64) -> Self {
        ConfigValue::Int(v)
    }
}
impl From<u32> for ConfigValue {
    fn from(v: u32) -> Self {
        ConfigValue::Int(v as i64)
    }
}
impl From<u64> for ConfigValue {
    fn from(v: u64) -> Self {
        i64::try_from(v)
            .map(ConfigValue::Int)
            .unwrap_or(ConfigValue::Float(v as f64))
    }
}
impl From<usize> for ConfigValue {
    fn from(v: usize) -> Self {
        ConfigValue::from(v as u64)
    }
}
impl From<f32> for ConfigValue {
    fn from(v: f32) -> Self {
        ConfigValue::Float(v as f64)
    }
}
impl From<f64> for ConfigValue {
    fn from(v: f64) -> Self {
        ConfigValue::Float(v)
    }
}
impl From<String> for ConfigValue {
    fn from(v: String) -> Self {
        ConfigValue::Str(v)
    }
}
impl From<&str> for ConfigValue {
    fn from(v: &str) -> Self {
        ConfigValue::Str(v.to_string())
    }
}
impl From<PathBuf> for ConfigValue {
    fn from(v: PathBuf) -> Self {
        ConfigValue::Path(v)
    }
}
impl From<&Path> for ConfigValue {
    fn from(v: &Path) -> Self {
        ConfigValue::Path(v.to_path_buf())
    }
}
impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ConfigValue::Null)
    }
}
impl<T: Into<ConfigValue>> From<Vec<T>> for ConfigValue {
    fn from(v: Vec<T>) -> Self {
        ConfigValue::sequence(v)
    }
}
impl<T: Into<ConfigValue>> From<BTreeMap<String, T>> for ConfigValue {
    fn from(v: BTreeMap<String, T>) -> Self {
        ConfigValue::mapping(v)
    }
}

impl From<Value> for ConfigValue {
    fn from(v: Value) -> Self {
        match v {
            Value::Null => ConfigValue::Null,
            Value::Bool(b) => ConfigValue::Bool(b),
            Value::Number(n) => number_to_config(&n),
            Value::String(s) => ConfigValue::Str(s),
            Value::Array(items) => ConfigValue::sequence(items),
            Value::Object(map) => ConfigValue::mapping(map),
        }
    }
}

fn number_to_config(n: &Number) -> ConfigValue {
    if let Some(i) = n.as_i64() {
        ConfigValue::Int(i)
    } else if let Some(u) = n.as_u64() {
        ConfigValue::from(u)
    } else {
        ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

impl From<serde_yaml::Value> for ConfigValue {
    fn from(v: serde_yaml::Value) -> Self {
        use serde_yaml::Value as Yaml;
        match v {
            Yaml::Null => ConfigValue::Null,
            Yaml::Bool(b) => ConfigValue::Bool(b),
            Yaml::Number(n) => {
                if let Some(i) = n.as_i64() {
                    ConfigValue::Int(i)
                } else if let Some(u) = n.as_u64() {
                    ConfigValue::from(u)
                } else {
                    ConfigValue::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Yaml::String(s) => ConfigValue::Str(s),
            Yaml::Sequence(items) => ConfigValue::sequence(items),
            Yaml::Mapping(map) => ConfigValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (yaml_key(k), v.into()))
                    .collect(),
            ),
            // `!Variant value` is how YAML spells an enum
            Yaml::Tagged(tagged) => ConfigValue::Enum {
                variant: tagged.tag.to_string().trim_start_matches('!').to_string(),
                value: Box::new(tagged.value.into()),
            },
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    use serde_yaml::Value as Yaml;
    match key {
        Yaml::String(s) => s,
        Yaml::Null => "null".to_string(),
        Yaml::Bool(b) => b.to_string(),
        Yaml::Number(n) => n.to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

/// Knobs of [`normalize_with`].
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Joins nested keys in the flat mapping.
    pub separator: String,
    /// Turn sequences into `{list_len, "0", "1", ..}` mappings instead of
    /// keeping them as (transformed) arrays.
    pub convert_list_to_dict: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            separator: "/".to_string(),
            convert_list_to_dict: true,
        }
    }
}

impl NormalizeOptions {
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    pub fn preserve_lists(mut self) -> Self {
        self.convert_list_to_dict = false;
        self
    }
}

/// Flatten a configuration into backend parameters with the default options.
///
/// `None` yields an empty mapping.
pub fn normalize(config: Option<&ConfigValue>) -> Result<Params> {
    normalize_with(config, &NormalizeOptions::default())
}

pub fn normalize_with(config: Option<&ConfigValue>, options: &NormalizeOptions) -> Result<Params> {
    let Some(config) = config else {
        return Ok(Params::new());
    };

    match to_json_compatible(config, options.convert_list_to_dict)? {
        Value::Object(nested) => {
            let mut flat = Params::new();
            flatten_into(None, nested, &options.separator, &mut flat);
            Ok(flat)
        }
        other => Err(TrackingError::InvalidParams(format!(
            "configuration must be a mapping or record at the top level, got {}",
            json_kind(&other)
        ))),
    }
}

/// Recursively rewrite a configuration into JSON-compatible values.
///
/// Records become mappings, paths their string form and enums their stored
/// value. Sequences become indexed mappings when `convert_list_to_dict` is
/// set, arrays otherwise; the flag applies at every depth.
pub fn to_json_compatible(value: &ConfigValue, convert_list_to_dict: bool) -> Result<Value> {
    transform(value, convert_list_to_dict, NonFinite::Reject, &mut Vec::new())
}

/// Nested JSON form of a configuration: sequences stay arrays and non-finite
/// floats become `null`, the way `serde_json` writes them.
pub fn to_nested_json(value: &ConfigValue) -> Value {
    transform(value, false, NonFinite::Null, &mut Vec::new()).unwrap_or(Value::Null)
}

#[derive(Clone, Copy)]
enum NonFinite {
    Reject,
    Null,
}

fn transform(
    value: &ConfigValue,
    convert_list_to_dict: bool,
    non_finite: NonFinite,
    path: &mut Vec<String>,
) -> Result<Value> {
    let out = match value {
        ConfigValue::Null => Value::Null,
        ConfigValue::Bool(b) => Value::Bool(*b),
        ConfigValue::Int(i) => Value::from(*i),
        ConfigValue::Float(f) => match (Number::from_f64(*f), non_finite) {
            (Some(n), _) => Value::Number(n),
            (None, NonFinite::Null) => Value::Null,
            (None, NonFinite::Reject) => return Err(TrackingError::NonFiniteParam(path.join("/"))),
        },
        ConfigValue::Str(s) => Value::String(s.clone()),
        ConfigValue::Path(p) => Value::String(p.to_string_lossy().into_owned()),
        ConfigValue::Enum { value, .. } => transform(value, convert_list_to_dict, non_finite, path)?,
        ConfigValue::Mapping(entries) | ConfigValue::Record { fields: entries, .. } => {
            let mut map = Map::with_capacity(entries.len());
            for (key, v) in entries {
                path.push(key.clone());
                let transformed = transform(v, convert_list_to_dict, non_finite, path);
                path.pop();
                map.insert(key.clone(), transformed?);
            }
            Value::Object(map)
        }
        ConfigValue::Sequence(items) if convert_list_to_dict => {
            let mut map = Map::with_capacity(items.len() + 1);
            map.insert(LIST_LEN_KEY.to_string(), Value::from(items.len()));
            for (i, item) in items.iter().enumerate() {
                path.push(i.to_string());
                let transformed = transform(item, convert_list_to_dict, non_finite, path);
                path.pop();
                map.insert(i.to_string(), transformed?);
            }
            Value::Object(map)
        }
        ConfigValue::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                path.push(i.to_string());
                let transformed = transform(item, convert_list_to_dict, non_finite, path);
                path.pop();
                out.push(transformed?);
            }
            Value::Array(out)
        }
    };
    Ok(out)
}

/// Nested objects are joined into their parents' keys; arrays and scalars are
/// leaves. An empty nested object leaves no key behind.
fn flatten_into(prefix: Option<&str>, nested: Map<String, Value>, sep: &str, out: &mut Params) {
    for (key, value) in nested {
        let key = match prefix {
            Some(prefix) => format!("{prefix}{sep}{key}"),
            None => key,
        };
        match value {
            Value::Object(inner) => flatten_into(Some(&key), inner, sep, out),
            leaf => {
                out.insert(key, leaf);
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a sequence",
        Value::Object(_) => "a mapping",
    }
}
