//! Automaton dispatch: turning typed documents into concrete machines.
//!
//! A document declares its machine family through the `Type` tag. The
//! deterministic variant is fully realized; the other families load like
//! any machine but refuse to simulate (see [`Machine::simulate`]).

use crate::dfa::Dfa;
use crate::error::CoreError;
use crate::graph::Graph;
use crate::loader;
use crate::simulation::Simulation;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// The machine families a document can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineType {
    /// Deterministic finite automaton.
    Dfa,
    /// Non-deterministic finite automaton.
    Nfa,
    /// Pushdown automaton.
    Pda,
    /// Turing machine.
    Tm,
}

impl MachineType {
    /// Parses a type tag, case-insensitively, accepting common synonyms.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.to_lowercase().as_str() {
            "d" | "dfa" | "deterministic finite automaton" => Some(Self::Dfa),
            "n" | "nfa" | "non-deterministic finite automaton" => Some(Self::Nfa),
            "p" | "pd" | "pda" | "pushdown automaton" => Some(Self::Pda),
            "t" | "tm" | "turingmachine" | "turing machine" => Some(Self::Tm),
            _ => None,
        }
    }

    /// Returns the canonical tag for this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dfa => "DFA",
            Self::Nfa => "NFA",
            Self::Pda => "PDA",
            Self::Tm => "TM",
        }
    }
}

impl fmt::Display for MachineType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A machine definition that can spawn simulations over an input tape.
pub trait Machine: Send + Sync {
    /// The declared machine family.
    fn machine_type(&self) -> MachineType;

    /// The underlying graph.
    fn graph(&self) -> &Graph;

    /// Serializes the machine back to the boundary document shape.
    fn to_document(&self) -> Value;

    /// Begins a new simulation over `input`.
    ///
    /// # Panics
    ///
    /// Panics for machine families whose stepping is not implemented (NFA,
    /// PDA, TM). These are declared extension points; calling into them is
    /// a programming-contract violation, not a runtime data error, and it
    /// must never be mistaken for a valid empty simulation.
    fn simulate(self: Arc<Self>, input: &str) -> Box<dyn Simulation>;
}

/// Loads a machine of the declared type from a document, using the
/// default schema.
pub fn load(document: &Value) -> Result<Arc<dyn Machine>, CoreError> {
    load_with_schema(document, None)
}

/// Loads a machine of the declared type, optionally with a custom schema.
pub fn load_with_schema(
    document: &Value,
    schema: Option<&Value>,
) -> Result<Arc<dyn Machine>, CoreError> {
    let tag = extract_type(document)?;
    let machine_type =
        MachineType::parse(&tag).ok_or_else(|| CoreError::UnsupportedMachineType {
            tag: tag.clone(),
        })?;
    match machine_type {
        MachineType::Dfa => Ok(Arc::new(Dfa::load_with_schema(document, schema)?)),
        MachineType::Nfa => Ok(Arc::new(Nfa::load_with_schema(document, schema)?)),
        MachineType::Pda => Ok(Arc::new(Pda::load_with_schema(document, schema)?)),
        MachineType::Tm => Ok(Arc::new(Tm::load_with_schema(document, schema)?)),
    }
}

/// Reads the `Type` tag out of a document before any other validation.
fn extract_type(document: &Value) -> Result<String, CoreError> {
    match document.get("Type") {
        Some(Value::String(tag)) => Ok(tag.clone()),
        Some(_) => Err(CoreError::SchemaViolation {
            reason: "field 'Type' should be a string".to_string(),
        }),
        None => Err(CoreError::SchemaViolation {
            reason: "field 'Type' is required".to_string(),
        }),
    }
}

/// Non-deterministic finite automaton. Declared extension point: loading
/// works, stepping does not.
#[derive(Debug, Clone)]
pub struct Nfa {
    pub graph: Graph,
}

impl Nfa {
    pub fn load_with_schema(document: &Value, schema: Option<&Value>) -> Result<Self, CoreError> {
        Ok(Self {
            graph: loader::load_value_with_schema(document, schema)?,
        })
    }
}

impl Machine for Nfa {
    fn machine_type(&self) -> MachineType {
        MachineType::Nfa
    }

    fn graph(&self) -> &Graph {
        &self.graph
    }

    fn to_document(&self) -> Value {
        let mut doc = self.graph.to_document();
        doc["Type"] = Value::from(MachineType::Nfa.as_str());
        doc
    }

    fn simulate(self: Arc<Self>, _input: &str) -> Box<dyn Simulation> {
        unimplemented!("NFA simulation is not implemented")
    }
}

/// Pushdown automaton. Declared extension point: loading works, stepping
/// does not.
#[derive(Debug, Clone)]
pub struct Pda {
    pub graph: Graph,
}

impl Pda {
    pub fn load_with_schema(document: &Value, schema: Option<&Value>) -> Result<Self, CoreError> {
        Ok(Self {
            graph: loader::load_value_with_schema(document, schema)?,
        })
    }
}

impl Machine for Pda {
    fn machine_type(&self) -> MachineType {
        MachineType::Pda
    }

    fn graph(&self) -> &Graph {
        &self.graph
    }

    fn to_document(&self) -> Value {
        let mut doc = self.graph.to_document();
        doc["Type"] = Value::from(MachineType::Pda.as_str());
        doc
    }

    fn simulate(self: Arc<Self>, _input: &str) -> Box<dyn Simulation> {
        unimplemented!("PDA simulation is not implemented")
    }
}

/// Turing machine. Declared extension point: loading works, stepping does
/// not.
#[derive(Debug, Clone)]
pub struct Tm {
    pub graph: Graph,
}

impl Tm {
    pub fn load_with_schema(document: &Value, schema: Option<&Value>) -> Result<Self, CoreError> {
        Ok(Self {
            graph: loader::load_value_with_schema(document, schema)?,
        })
    }
}

impl Machine for Tm {
    fn machine_type(&self) -> MachineType {
        MachineType::Tm
    }

    fn graph(&self) -> &Graph {
        &self.graph
    }

    fn to_document(&self) -> Value {
        let mut doc = self.graph.to_document();
        doc["Type"] = Value::from(MachineType::Tm.as_str());
        doc
    }

    fn simulate(self: Arc<Self>, _input: &str) -> Box<dyn Simulation> {
        unimplemented!("TM simulation is not implemented")
    }
}
