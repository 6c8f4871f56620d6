//! Deterministic finite automata and their simulations.

use crate::automata::{Machine, MachineType};
use crate::error::CoreError;
use crate::graph::Graph;
use crate::loader;
use crate::simulation::{Report, Simulation, SimulationResult};
use serde_json::Value;
use std::sync::Arc;

/// A deterministic finite automaton: a machine graph plus the alphabet of
/// input symbols it accepts.
#[derive(Debug, Clone)]
pub struct Dfa {
    pub graph: Graph,

    /// Accepted input symbols, one character each.
    pub alphabet: String,
}

impl Dfa {
    /// Loads a DFA from a document using the default schema.
    pub fn load(document: &Value) -> Result<Self, CoreError> {
        Self::load_with_schema(document, None)
    }

    /// Loads a DFA, optionally against a custom schema.
    ///
    /// On top of graph validation this checks the DFA invariants: every
    /// (state, alphabet symbol) pair has exactly one outgoing transition,
    /// and every transition symbol belongs to the alphabet. An absent
    /// `Alphabet` field is inferred from the transition symbols.
    pub fn load_with_schema(document: &Value, schema: Option<&Value>) -> Result<Self, CoreError> {
        let graph = loader::load_value_with_schema(document, schema)?;
        let alphabet = extract_alphabet(document, &graph)?;
        let dfa = Self { graph, alphabet };
        dfa.check_totality()?;
        dfa.check_alphabet_membership()?;
        Ok(dfa)
    }

    /// Every state must have exactly one outgoing transition per alphabet
    /// symbol.
    fn check_totality(&self) -> Result<(), CoreError> {
        for (index, state) in self.graph.states.iter().enumerate() {
            for symbol in self.alphabet.chars() {
                let symbol = symbol.to_string();
                let count = self
                    .graph
                    .transitions
                    .iter()
                    .filter(|t| t.start == index && t.symbol == symbol)
                    .count();
                if count == 0 {
                    return Err(CoreError::GraphIntegrity {
                        reason: format!(
                            "state '{}' is missing a transition for symbol '{symbol}'",
                            state.id
                        ),
                    });
                }
                if count > 1 {
                    return Err(CoreError::GraphIntegrity {
                        reason: format!(
                            "state '{}' has more than one transition for symbol '{symbol}'",
                            state.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    /// Every transition symbol must be a single symbol of the alphabet.
    fn check_alphabet_membership(&self) -> Result<(), CoreError> {
        for t in &self.graph.transitions {
            let in_alphabet = self.alphabet.chars().any(|c| t.symbol == c.to_string());
            if !in_alphabet {
                return Err(CoreError::GraphIntegrity {
                    reason: format!(
                        "transition symbol '{}' is not present in the alphabet",
                        t.symbol
                    ),
                });
            }
        }
        Ok(())
    }
}

impl Machine for Dfa {
    fn machine_type(&self) -> MachineType {
        MachineType::Dfa
    }

    fn graph(&self) -> &Graph {
        &self.graph
    }

    fn to_document(&self) -> Value {
        let mut doc = self.graph.to_document();
        doc["Type"] = Value::from(MachineType::Dfa.as_str());
        doc["Alphabet"] = Value::from(self.alphabet.as_str());
        doc
    }

    fn simulate(self: Arc<Self>, input: &str) -> Box<dyn Simulation> {
        Box::new(DfaSimulation::new(self, input))
    }
}

fn extract_alphabet(document: &Value, graph: &Graph) -> Result<String, CoreError> {
    match document.get("Alphabet") {
        None => Ok(infer_alphabet(graph)),
        Some(Value::String(alphabet)) => Ok(alphabet.clone()),
        Some(_) => Err(CoreError::SchemaViolation {
            reason: "field 'Alphabet' should be a string".to_string(),
        }),
    }
}

/// Builds the alphabet from the first character of each transition symbol,
/// in declaration order, without duplicates.
fn infer_alphabet(graph: &Graph) -> String {
    let mut alphabet = String::new();
    for t in &graph.transitions {
        if let Some(first) = t.symbol.chars().next() {
            if !alphabet.contains(first) {
                alphabet.push(first);
            }
        }
    }
    alphabet
}

/// A stepwise run of a DFA over one input tape.
pub struct DfaSimulation {
    machine: Arc<Dfa>,
    current: usize,
    input: String,
    path: Vec<String>,
    rejected: bool,
}

impl DfaSimulation {
    pub fn new(machine: Arc<Dfa>, input: &str) -> Self {
        Self {
            current: machine.graph.start,
            machine,
            input: input.to_string(),
            path: Vec::new(),
            rejected: false,
        }
    }

    fn accepted(&self) -> bool {
        !self.rejected && self.input.is_empty() && self.machine.graph.states[self.current].ending
    }

    /// Appends the current state onto the path.
    fn log_state(&mut self) {
        self.path
            .push(self.machine.graph.states[self.current].id.clone());
    }

    fn take_next_transition(&mut self) {
        if self.rejected {
            return;
        }
        match self.next_transition() {
            Some(index) => self.take_transition(index),
            None => self.rejected = true,
        }
    }

    fn take_transition(&mut self, index: usize) {
        self.current = self.machine.graph.transitions[index].end;
        let mut rest = self.input.chars();
        rest.next();
        self.input = rest.as_str().to_string();
    }

    /// First transition, in declaration order, leaving the current state on
    /// the next input character. Only the first character of a
    /// multi-character symbol is matched.
    fn next_transition(&self) -> Option<usize> {
        let next_char = self.input.chars().next()?;
        self.machine
            .graph
            .transitions
            .iter()
            .position(|t| t.start == self.current && t.symbol.chars().next() == Some(next_char))
    }

    fn snapshot(&self) -> SimulationResult {
        SimulationResult {
            accepted: self.accepted(),
            path: self.path.clone(),
            remaining_input: self.input.clone(),
        }
    }
}

impl Simulation for DfaSimulation {
    fn step(&mut self) {
        if self.done() {
            return;
        }
        self.log_state();
        self.take_next_transition();
        // Record the exit state of the final symbol as well.
        if self.done() {
            self.log_state();
        }
    }

    fn stat(&self) -> Report {
        Report {
            result: self.snapshot(),
        }
    }

    fn result(&self) -> Result<SimulationResult, CoreError> {
        if !self.done() {
            return Err(CoreError::SimulationIncomplete);
        }
        Ok(self.snapshot())
    }

    fn done(&self) -> bool {
        self.rejected || self.input.is_empty()
    }
}
