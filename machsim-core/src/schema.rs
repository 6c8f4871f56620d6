//! The canonical machine document schema.
//!
//! The embedded schema is compiled once per process and reused for every
//! load that does not supply its own schema.

use crate::error::CoreError;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::sync::OnceLock;

/// Canonical machine schema, embedded at build time.
pub const SCHEMA: &str = r#"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "$id": "https://machsim.dev/machine.schema.json",
  "title": "Machine",
  "description": "A graph datastructure representing a state machine",
  "type": "object",

  "properties": {
    "Type": {
      "description": "The machine family this document declares, e.g. 'DFA'",
      "type": "string"
    },

    "Alphabet": {
      "description": "The symbols accepted by the machine, one character each",
      "type": "string"
    },

    "Start": {
      "description": "The 'Id' field for the starting state of the machine",
      "type": "string",
      "pattern": "q([1-9]\\d*|0)"
    },

    "States": {
      "description": "The collection of states that are part of the machine",
      "type": "array",
      "minItems": 0,
      "uniqueItems": true,
      "items": {
        "type": "object",
        "properties": {
          "Id": {
            "description": "The id (unique) of the state e.g. 'q0', 'q1'. No leading zeros.",
            "type": "string",
            "pattern": "q([1-9]\\d*|0)"
          },
          "Ending": {
            "description": "Whether or not this state is an ending state. If absent, this value should be considered 'false'",
            "type": "boolean"
          }
        },
        "required": ["Id"]
      }
    },

    "Transitions": {
      "description": "The collection of transitions that are part of the machine",
      "type": "array",
      "minItems": 0,
      "uniqueItems": true,
      "items": {
        "type": "object",
        "properties": {
          "Start": {
            "description": "The 'Id' field for the starting state of the transition",
            "type": "string",
            "pattern": "q([1-9]\\d*|0)"
          },
          "End": {
            "description": "The 'Id' field for the ending state of the transition",
            "type": "string",
            "pattern": "q([1-9]\\d*|0)"
          },
          "Symbol": {
            "description": "The symbol(s) that is consumed from the input tape in order to traverse this transition",
            "type": "string"
          }
        },
        "required": ["Start", "End", "Symbol"]
      }
    }
  },

  "required": ["Start", "States", "Transitions"]
}
"#;

static DEFAULT: OnceLock<JSONSchema> = OnceLock::new();

/// Returns the embedded schema as a JSON document.
pub fn schema_document() -> Value {
    serde_json::from_str(SCHEMA).expect("embedded machine schema is valid JSON")
}

/// Returns the compiled default schema, shared process-wide. Compiled on
/// first use, immutable afterwards.
pub fn default_schema() -> &'static JSONSchema {
    DEFAULT.get_or_init(|| compile(&schema_document()).expect("embedded machine schema compiles"))
}

/// Compiles a schema document into a reusable validator.
pub fn compile(schema: &Value) -> Result<JSONSchema, CoreError> {
    JSONSchema::compile(schema).map_err(|e| CoreError::SchemaViolation {
        reason: format!("schema does not compile: {e}"),
    })
}

/// Validates `document` against `schema`, unifying all failures into a
/// single reason.
pub fn validate(schema: &JSONSchema, document: &Value) -> Result<(), CoreError> {
    if let Err(errors) = schema.validate(document) {
        let reason = errors
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CoreError::SchemaViolation { reason });
    }
    Ok(())
}
