//! Action argument schema and the bound-value store.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::ArgumentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgType {
    String,
    Number,
    Boolean,
}

impl ArgType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }

    /// Converts a raw command-line value into a typed one.
    pub fn parse(self, name: &str, raw: &str) -> Result<ArgValue, ArgumentError> {
        let invalid = || ArgumentError::InvalidValue {
            name: name.to_string(),
            expected: self.as_str(),
            raw: raw.to_string(),
        };
        match self {
            Self::String => Ok(ArgValue::String(raw.to_string())),
            Self::Number => raw
                .trim()
                .parse::<f64>()
                .map(ArgValue::Number)
                .map_err(|_| invalid()),
            Self::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(ArgValue::Boolean(true)),
                "false" | "0" | "no" => Ok(ArgValue::Boolean(false)),
                _ => Err(invalid()),
            },
        }
    }
}

/// A bound argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Boolean(bool),
    Number(f64),
    String(String),
}

impl ArgValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }
}

impl Display for ArgValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// Declaration of a single action argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionArgument {
    pub arg_type: ArgType,
    pub positional: bool,
    pub required: bool,
    pub short: Option<char>,
    pub description: Option<String>,
    pub default_value: Option<ArgValue>,
}

impl ActionArgument {
    pub fn new(arg_type: ArgType) -> Self {
        Self {
            arg_type,
            positional: false,
            required: false,
            short: None,
            description: None,
            default_value: None,
        }
    }

    pub fn positional(mut self) -> Self {
        self.positional = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn short(mut self, alias: char) -> Self {
        self.short = Some(alias);
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn default_value(mut self, value: ArgValue) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Parsed argument values keyed by argument name. `None` marks an
/// argument that was declared but not supplied.
pub type ArgBag = HashMap<String, Option<ArgValue>>;

/// Bound CLI argument values. No coercion or validation happens here.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: ArgBag,
}

impl Args {
    /// Shallow merge: each key in `partial` overwrites the stored entry.
    pub fn update(&mut self, partial: ArgBag) {
        self.values.extend(partial);
    }

    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name).and_then(Option::as_ref)
    }

    pub fn values(&self) -> &ArgBag {
        &self.values
    }

    /// Returns the stored value unless it is missing or unset. Falsy values
    /// such as `false`, `0` and `""` are returned as stored.
    pub fn get_or(&self, name: &str, default: ArgValue) -> ArgValue {
        self.get(name).cloned().unwrap_or(default)
    }
}
