//! Loading machine graphs from untrusted documents.
//!
//! Documents arrive as pre-parsed JSON values, byte buffers, readers, or
//! file paths; every form is normalized to a JSON value, validated against
//! the machine schema, and only then turned into a graph. Graph
//! construction is never attempted on a schema-invalid document.

use crate::error::CoreError;
use crate::graph::{Graph, State, Transition};
use crate::schema;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;

/// Raw machine document as transmitted over the boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct MachineDocument {
    #[serde(rename = "Start")]
    pub start: String,

    #[serde(rename = "States")]
    pub states: Vec<State>,

    #[serde(rename = "Transitions")]
    pub transitions: Vec<TransitionDocument>,
}

/// Raw transition entry: endpoints are state ids.
#[derive(Debug, Clone, Deserialize)]
pub struct TransitionDocument {
    #[serde(rename = "Start")]
    pub start: String,

    #[serde(rename = "End")]
    pub end: String,

    #[serde(rename = "Symbol")]
    pub symbol: String,
}

/// Loads and validates a graph from a pre-parsed document using the
/// default schema.
pub fn load_value(document: &Value) -> Result<Graph, CoreError> {
    load_value_with_schema(document, None)
}

/// Loads and validates a graph, optionally against a custom schema.
pub fn load_value_with_schema(
    document: &Value,
    custom: Option<&Value>,
) -> Result<Graph, CoreError> {
    match custom {
        Some(s) => schema::validate(&schema::compile(s)?, document)?,
        None => schema::validate(schema::default_schema(), document)?,
    }
    build_graph(document)
}

/// Loads a graph from a raw byte buffer.
pub fn load_slice(buf: &[u8]) -> Result<Graph, CoreError> {
    load_value(&parse_slice(buf)?)
}

/// Loads a graph from a readable stream.
pub fn load_reader(reader: impl Read) -> Result<Graph, CoreError> {
    load_value(&parse_reader(reader)?)
}

/// Loads a graph from a JSON file.
pub fn load_path(path: impl AsRef<Path>) -> Result<Graph, CoreError> {
    load_value(&parse_path(path)?)
}

/// Parses a byte buffer into a JSON document, rejecting empty input.
pub fn parse_slice(buf: &[u8]) -> Result<Value, CoreError> {
    if buf.is_empty() {
        return Err(CoreError::EmptyDocument);
    }
    Ok(serde_json::from_slice(buf)?)
}

/// Reads a stream to the end and parses it as a JSON document.
pub fn parse_reader(mut reader: impl Read) -> Result<Value, CoreError> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    parse_slice(&buf)
}

/// Reads and parses a JSON file.
pub fn parse_path(path: impl AsRef<Path>) -> Result<Value, CoreError> {
    parse_slice(&std::fs::read(path)?)
}

/// Builds a graph from a schema-valid document: states first, then
/// transitions resolved against them, then the start state.
fn build_graph(document: &Value) -> Result<Graph, CoreError> {
    let doc: MachineDocument =
        serde_json::from_value(document.clone()).map_err(|e| CoreError::SchemaViolation {
            reason: e.to_string(),
        })?;

    let states = doc.states;
    for (i, s) in states.iter().enumerate() {
        if states[..i].iter().any(|other| other.id == s.id) {
            return Err(CoreError::GraphIntegrity {
                reason: format!("duplicate state id '{}'", s.id),
            });
        }
    }

    let mut transitions = Vec::with_capacity(doc.transitions.len());
    for t in &doc.transitions {
        let start = find_state(&states, &t.start)?;
        let end = find_state(&states, &t.end)?;
        transitions.push(Transition {
            start,
            end,
            symbol: t.symbol.clone(),
        });
    }

    let start = find_state(&states, &doc.start)?;
    Graph::from_parts(start, states, transitions)
}

fn find_state(states: &[State], id: &str) -> Result<usize, CoreError> {
    states
        .iter()
        .position(|s| s.id == id)
        .ok_or_else(|| CoreError::GraphIntegrity {
            reason: format!("state with id '{id}' was not found in the state set"),
        })
}
