//! Repairs the causal model an LLM returns so it satisfies the structural invariants
//! callers rely on:
//! - no relationship links a variable to itself
//! - every relationship endpoint names a variable of the model
//! - no two relationships share the same `(from, to)` pair, the first one wins
//! - every flow is listed by some stock, otherwise it becomes a plain variable
//!
//! Nothing is reordered; survivors keep their relative order.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::errors::{EngineError, EngineResult};
use crate::models::causal::{same_vars, CausalModel, VariableType};

/// Read a raw LLM reply and normalize it.
///
/// The only hard requirement is a `variables` array. Entries that cannot be read are
/// dropped the same way dangling relationships are, the rest of the model survives.
pub fn normalize(raw: Value) -> EngineResult<CausalModel> {
    let Value::Object(mut fields) = raw else {
        return Err(no_variables());
    };
    let Some(Value::Array(raw_variables)) = fields.remove("variables") else {
        return Err(no_variables());
    };
    let raw_relationships = match fields.remove("relationships") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };

    let model = CausalModel {
        variables: read_entries(raw_variables, "variable"),
        relationships: read_entries(raw_relationships, "relationship"),
        title: take_text(&mut fields, "title"),
        explanation: take_text(&mut fields, "explanation"),
        extra: fields,
    };

    Ok(normalize_model(model))
}

fn no_variables() -> EngineError {
    EngineError::MalformedOutput("the model has no variables array".to_string())
}

fn read_entries<T: DeserializeOwned>(items: Vec<Value>, kind: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "dropping unreadable {}", kind);
                None
            }
        })
        .collect()
}

fn take_text(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}

pub fn normalize_model(mut model: CausalModel) -> CausalModel {
    let mut relationships = std::mem::take(&mut model.relationships);

    for relationship in relationships.iter_mut() {
        relationship.from = relationship.from.trim().to_string();
        relationship.to = relationship.to.trim().to_string();
    }

    let mut valid: Vec<bool> = relationships
        .iter()
        .map(|r| {
            !same_vars(&r.from, &r.to) && model.has_variable(&r.from) && model.has_variable(&r.to)
        })
        .collect();

    for i in 1..relationships.len() {
        for j in 0..i {
            if !valid[i] || !valid[j] {
                continue;
            }
            if relationships[j].same_link(&relationships[i]) {
                valid[i] = false;
            }
        }
    }

    let before = relationships.len();
    model.relationships = relationships
        .into_iter()
        .zip(valid)
        .filter_map(|(relationship, keep)| keep.then_some(relationship))
        .collect();

    if model.relationships.len() != before {
        warn!(
            dropped = before - model.relationships.len(),
            kept = model.relationships.len(),
            "dropped invalid or duplicate relationships"
        );
    }

    let unused_flows: Vec<usize> = model
        .variables
        .iter()
        .enumerate()
        .filter(|(_, v)| v.kind == VariableType::Flow && !model.is_flow_used(&v.name))
        .map(|(index, _)| index)
        .collect();

    for index in unused_flows {
        let variable = &mut model.variables[index];
        debug!(name = %variable.name, "reclassifying unused flow as variable");
        variable.kind = VariableType::Variable;
    }

    model
}
