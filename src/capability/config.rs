//! Configuration schemas and their resolution into a [`Config`].

use super::value_type_name;
use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Keyword arguments forwarded from a declarative block to a constructor.
pub type ConfigArgs = Map<String, Value>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigKind {
    Float,
    Int,
    Str,
    Bool,
    StrList,
}

impl ConfigKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigKind::Float => "float",
            ConfigKind::Int => "int",
            ConfigKind::Str => "string",
            ConfigKind::Bool => "bool",
            ConfigKind::StrList => "list of strings",
        }
    }

    /// Normalize `value` to this kind, or `None` when it does not conform.
    ///
    /// Integers are widened for float options; nothing else is converted.
    fn coerce(&self, value: Value) -> Option<Value> {
        match (self, value) {
            (ConfigKind::Float, Value::Number(n)) => n.as_f64().map(Value::from),
            (ConfigKind::Int, Value::Number(n)) if !n.is_f64() => n.as_i64().map(Value::from),
            (ConfigKind::Str, value @ Value::String(_)) => Some(value),
            (ConfigKind::Bool, value @ Value::Bool(_)) => Some(value),
            (ConfigKind::StrList, Value::Array(items)) => {
                if items.iter().all(Value::is_string) {
                    Some(Value::Array(items))
                } else {
                    None
                }
            }
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ParamDefault {
    Required,
    Float(f64),
    Int(i64),
    Str(&'static str),
    Bool(bool),
}

impl ParamDefault {
    fn to_value(self) -> Option<Value> {
        match self {
            ParamDefault::Required => None,
            ParamDefault::Float(v) => Some(Value::from(v)),
            ParamDefault::Int(v) => Some(Value::from(v)),
            ParamDefault::Str(v) => Some(Value::from(v)),
            ParamDefault::Bool(v) => Some(Value::from(v)),
        }
    }
}

/// One declared option of an implementation.
#[derive(Clone, Copy, Debug)]
pub struct ConfigParam {
    pub name: &'static str,
    pub kind: ConfigKind,
    pub default: ParamDefault,
    pub help: &'static str,
}

impl ConfigParam {
    pub const fn required(name: &'static str, kind: ConfigKind, help: &'static str) -> Self {
        Self {
            name,
            kind,
            default: ParamDefault::Required,
            help,
        }
    }

    pub const fn float(name: &'static str, default: f64, help: &'static str) -> Self {
        Self {
            name,
            kind: ConfigKind::Float,
            default: ParamDefault::Float(default),
            help,
        }
    }

    pub const fn int(name: &'static str, default: i64, help: &'static str) -> Self {
        Self {
            name,
            kind: ConfigKind::Int,
            default: ParamDefault::Int(default),
            help,
        }
    }

    pub const fn string(name: &'static str, default: &'static str, help: &'static str) -> Self {
        Self {
            name,
            kind: ConfigKind::Str,
            default: ParamDefault::Str(default),
            help,
        }
    }

    pub const fn flag(name: &'static str, default: bool, help: &'static str) -> Self {
        Self {
            name,
            kind: ConfigKind::Bool,
            default: ParamDefault::Bool(default),
            help,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self.default, ParamDefault::Required)
    }
}

/// Fully resolved configuration of one constructed instance.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Config {
    #[serde(skip)]
    owner: String,
    values: BTreeMap<String, Value>,
}

impl Config {
    /// Resolve caller-supplied arguments against a schema.
    ///
    /// Every declared key takes the supplied value or its default; a missing
    /// required key fails first, then any leftover (undeclared) keys. The
    /// result is all-or-nothing.
    pub fn resolve(owner: &str, schema: &[ConfigParam], mut args: ConfigArgs) -> Result<Self> {
        let mut values = BTreeMap::new();
        for param in schema {
            let value = match args.remove(param.name) {
                Some(supplied) => {
                    let actual = value_type_name(&supplied);
                    param
                        .kind
                        .coerce(supplied)
                        .ok_or_else(|| Error::InvalidConfig {
                            owner: owner.to_string(),
                            key: param.name.to_string(),
                            expected: param.kind.as_str().to_string(),
                            actual: actual.to_string(),
                        })?
                }
                None => param.default.to_value().ok_or_else(|| Error::MissingConfig {
                    owner: owner.to_string(),
                    key: param.name.to_string(),
                })?,
            };
            values.insert(param.name.to_string(), value);
        }
        if !args.is_empty() {
            return Err(Error::UnrecognizedConfig {
                owner: owner.to_string(),
                keys: args.keys().cloned().collect(),
            });
        }
        Ok(Self {
            owner: owner.to_string(),
            values,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn float(&self, key: &str) -> Result<f64> {
        self.typed(key, ConfigKind::Float, Value::as_f64)
    }

    pub fn int(&self, key: &str) -> Result<i64> {
        self.typed(key, ConfigKind::Int, Value::as_i64)
    }

    pub fn string(&self, key: &str) -> Result<&str> {
        self.typed(key, ConfigKind::Str, Value::as_str)
    }

    pub fn flag(&self, key: &str) -> Result<bool> {
        self.typed(key, ConfigKind::Bool, Value::as_bool)
    }

    fn typed<'a, T>(
        &'a self,
        key: &str,
        kind: ConfigKind,
        extract: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<T> {
        let value = self.values.get(key).ok_or_else(|| Error::MissingConfig {
            owner: self.owner.clone(),
            key: key.to_string(),
        })?;
        extract(value).ok_or_else(|| Error::InvalidConfig {
            owner: self.owner.clone(),
            key: key.to_string(),
            expected: kind.as_str().to_string(),
            actual: value_type_name(value).to_string(),
        })
    }
}
