use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use strum_macros::EnumString;

lazy_static! {
    static ref SEPARATORS: Regex = Regex::new(r"[\s_]+").unwrap();
}

/// Canonical form of a variable name: trimmed, lowercased, with every run of whitespace
/// and underscores collapsed into a single `_`.
pub fn canonical_name(name: &str) -> String {
    SEPARATORS
        .replace_all(&name.to_lowercase(), "_")
        .trim_matches('_')
        .to_string()
}

/// Whether two names refer to the same model variable.
///
/// Every name comparison in the crate goes through here.
pub fn same_vars(a: &str, b: &str) -> bool {
    canonical_name(a) == canonical_name(b)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum VariableType {
    Stock,
    Flow,
    #[default]
    Variable,
}

/// Case insensitive; a missing, null or unrecognized type reads as `variable`.
impl<'de> Deserialize<'de> for VariableType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|name| name.trim().parse().ok())
            .unwrap_or_default())
    }
}

/// Strings pass through, numbers are written out, anything else is empty.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(text)) => text,
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    })
}

/// Keeps the string entries of an array; null or any other shape is an empty list.
fn lenient_names<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    #[serde(rename = "+")]
    Positive,
    #[serde(rename = "-")]
    Negative,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: VariableType,
    #[serde(default, deserialize_with = "lenient_text")]
    pub equation: String,
    /// Flow names feeding this variable, only meaningful for stocks
    #[serde(default, deserialize_with = "lenient_names")]
    pub inflows: Vec<String>,
    /// Flow names draining this variable, only meaningful for stocks
    #[serde(default, deserialize_with = "lenient_names")]
    pub outflows: Vec<String>,
    /// Fields the LLM returned that the engine does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Variable {
    pub fn new<S: Into<String>>(name: S, kind: VariableType) -> Self {
        Variable {
            name: name.into(),
            kind,
            equation: String::new(),
            inflows: Vec::new(),
            outflows: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn stock<S: Into<String>>(name: S) -> Self {
        Self::new(name, VariableType::Stock)
    }

    pub fn flow<S: Into<String>>(name: S) -> Self {
        Self::new(name, VariableType::Flow)
    }

    pub fn variable<S: Into<String>>(name: S) -> Self {
        Self::new(name, VariableType::Variable)
    }

    pub fn with_equation<S: Into<String>>(mut self, equation: S) -> Self {
        self.equation = equation.into();
        self
    }

    pub fn with_inflow<S: Into<String>>(mut self, flow: S) -> Self {
        self.inflows.push(flow.into());
        self
    }

    pub fn with_outflow<S: Into<String>>(mut self, flow: S) -> Self {
        self.outflows.push(flow.into());
        self
    }

    /// Whether this variable is a stock listing `flow` among its inflows or outflows
    pub fn references_flow(&self, flow: &str) -> bool {
        self.kind == VariableType::Stock
            && self
                .inflows
                .iter()
                .chain(self.outflows.iter())
                .any(|name| same_vars(name, flow))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub from: String,
    pub to: String,
    pub polarity: Polarity,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Relationship {
    pub fn new<F: Into<String>, T: Into<String>>(from: F, to: T, polarity: Polarity) -> Self {
        Relationship {
            from: from.into(),
            to: to.into(),
            polarity,
            extra: Map::new(),
        }
    }

    pub fn positive<F: Into<String>, T: Into<String>>(from: F, to: T) -> Self {
        Self::new(from, to, Polarity::Positive)
    }

    pub fn negative<F: Into<String>, T: Into<String>>(from: F, to: T) -> Self {
        Self::new(from, to, Polarity::Negative)
    }

    /// Same `(from, to)` pair under the name equivalence
    pub fn same_link(&self, other: &Relationship) -> bool {
        same_vars(&self.from, &other.from) && same_vars(&self.to, &other.to)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
/// A stock and flow model as produced by the LLM
pub struct CausalModel {
    pub variables: Vec<Variable>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CausalModel {
    pub fn new(variables: Vec<Variable>, relationships: Vec<Relationship>) -> Self {
        CausalModel {
            variables,
            relationships,
            ..Default::default()
        }
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| same_vars(&v.name, name))
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| same_vars(&v.name, name))
    }

    /// Whether some stock lists `flow` among its inflows or outflows
    pub fn is_flow_used(&self, flow: &str) -> bool {
        self.variables.iter().any(|v| v.references_flow(flow))
    }
}
