use serde_json::{json, Value};

/// Name the schema is registered under with providers that want one
pub const SCHEMA_NAME: &str = "stock_flow_model";

/// JSON schema for the stock and flow model the LLM must return.
///
/// Every property is required and no additional properties are allowed, which is what
/// strict structured output modes expect.
pub fn causal_model_schema(mentor_mode: bool) -> Value {
    let explanation = if mentor_mode {
        "Markdown explanation of the model written for a learner. Point out uncertain choices and ask questions that help the learner critique the model. Never name feedback loops directly."
    } else {
        "Markdown summary of the model and the reasoning behind its structure."
    };

    json!({
        "type": "object",
        "properties": {
            "variables": {
                "type": "array",
                "description": "Every variable in the model",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Neutral name of the variable, letters and spaces only"
                        },
                        "type": {
                            "type": "string",
                            "enum": ["stock", "flow", "variable"],
                            "description": "stock accumulates, flow changes a stock, variable is anything else"
                        },
                        "equation": {
                            "type": "string",
                            "description": "XMILE equation referring only to other variables"
                        },
                        "inflows": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Names of the flows feeding this stock, empty for non-stocks"
                        },
                        "outflows": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Names of the flows draining this stock, empty for non-stocks"
                        },
                        "documentation": {
                            "type": "string",
                            "description": "Short description of what the variable represents"
                        }
                    },
                    "required": ["name", "type", "equation", "inflows", "outflows", "documentation"],
                    "additionalProperties": false
                }
            },
            "relationships": {
                "type": "array",
                "description": "Causal links between variables",
                "items": {
                    "type": "object",
                    "properties": {
                        "from": {
                            "type": "string",
                            "description": "Name of the cause"
                        },
                        "to": {
                            "type": "string",
                            "description": "Name of the effect"
                        },
                        "polarity": {
                            "type": "string",
                            "enum": ["+", "-"],
                            "description": "+ when both move in the same direction, - otherwise"
                        },
                        "reasoning": {
                            "type": "string",
                            "description": "Why the text supports this link"
                        }
                    },
                    "required": ["from", "to", "polarity", "reasoning"],
                    "additionalProperties": false
                }
            },
            "title": {
                "type": "string",
                "description": "A short title for the model"
            },
            "explanation": {
                "type": "string",
                "description": explanation
            }
        },
        "required": ["variables", "relationships", "title", "explanation"],
        "additionalProperties": false
    })
}
