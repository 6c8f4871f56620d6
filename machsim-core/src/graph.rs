//! Machine graph model.
//!
//! States and transitions form a labeled directed graph. Transitions refer
//! to their endpoints by index into the owning graph's state sequence, so a
//! graph can be cloned or serialized without invalidating internal
//! references.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single state in a machine graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    /// State id, e.g. "q0". Unique within a graph.
    #[serde(rename = "Id")]
    pub id: String,

    /// Whether this is an accepting state. Absent in a document means false.
    #[serde(rename = "Ending", default)]
    pub ending: bool,
}

impl State {
    pub fn new(id: impl Into<String>, ending: bool) -> Self {
        Self {
            id: id.into(),
            ending,
        }
    }
}

/// A transition between two states of the owning graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// Index of the source state.
    pub start: usize,

    /// Index of the target state.
    pub end: usize,

    /// Symbol consumed from the input tape when this transition is taken.
    pub symbol: String,
}

/// A labeled directed graph: a state set, transitions, and a start state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    /// Index of the start state.
    pub start: usize,

    /// All states, in declaration order.
    pub states: Vec<State>,

    /// All transitions, in declaration order.
    pub transitions: Vec<Transition>,
}

impl Graph {
    /// Builds a graph from parts, checking referential integrity: the start
    /// index and every transition endpoint must be in bounds, and state ids
    /// must be unique.
    pub fn from_parts(
        start: usize,
        states: Vec<State>,
        transitions: Vec<Transition>,
    ) -> Result<Self, CoreError> {
        if start >= states.len() {
            return Err(CoreError::GraphIntegrity {
                reason: format!("start index {start} is out of bounds"),
            });
        }
        for (i, s) in states.iter().enumerate() {
            if states[..i].iter().any(|other| other.id == s.id) {
                return Err(CoreError::GraphIntegrity {
                    reason: format!("duplicate state id '{}'", s.id),
                });
            }
        }
        for t in &transitions {
            if t.start >= states.len() || t.end >= states.len() {
                return Err(CoreError::GraphIntegrity {
                    reason: format!(
                        "transition on '{}' references a state outside the graph",
                        t.symbol
                    ),
                });
            }
        }
        Ok(Self {
            start,
            states,
            transitions,
        })
    }

    /// Returns the start state.
    pub fn start_state(&self) -> &State {
        &self.states[self.start]
    }

    /// Returns the state at `index`.
    pub fn state(&self, index: usize) -> &State {
        &self.states[index]
    }

    /// Finds a state index by id.
    pub fn find_state(&self, id: &str) -> Option<usize> {
        self.states.iter().position(|s| s.id == id)
    }

    /// Serializes the graph back to the boundary document shape, with state
    /// ids in place of indices.
    pub fn to_document(&self) -> Value {
        json!({
            "Start": self.start_state().id,
            "States": self.states,
            "Transitions": self
                .transitions
                .iter()
                .map(|t| {
                    json!({
                        "Start": self.states[t.start].id,
                        "End": self.states[t.end].id,
                        "Symbol": t.symbol,
                    })
                })
                .collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_state_graph() -> Graph {
        Graph::from_parts(
            0,
            vec![State::new("q0", false), State::new("q1", true)],
            vec![
                Transition {
                    start: 0,
                    end: 1,
                    symbol: "a".to_string(),
                },
                Transition {
                    start: 1,
                    end: 0,
                    symbol: "a".to_string(),
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_parts() {
        let graph = two_state_graph();
        assert_eq!(graph.start_state().id, "q0");
        assert_eq!(graph.states.len(), 2);
        assert_eq!(graph.transitions.len(), 2);
        assert_eq!(graph.find_state("q1"), Some(1));
        assert_eq!(graph.find_state("q9"), None);
    }

    #[test]
    fn test_start_out_of_bounds() {
        let result = Graph::from_parts(2, vec![State::new("q0", false)], vec![]);
        assert!(matches!(result, Err(CoreError::GraphIntegrity { .. })));
    }

    #[test]
    fn test_duplicate_state_id() {
        let result = Graph::from_parts(
            0,
            vec![State::new("q0", false), State::new("q0", true)],
            vec![],
        );
        assert!(matches!(result, Err(CoreError::GraphIntegrity { .. })));
    }

    #[test]
    fn test_transition_out_of_bounds() {
        let result = Graph::from_parts(
            0,
            vec![State::new("q0", false)],
            vec![Transition {
                start: 0,
                end: 7,
                symbol: "a".to_string(),
            }],
        );
        assert!(matches!(result, Err(CoreError::GraphIntegrity { .. })));
    }

    #[test]
    fn test_clone_keeps_indices_valid() {
        let graph = two_state_graph();
        let copy = graph.clone();
        assert_eq!(copy, graph);
        assert_eq!(copy.state(copy.transitions[0].end).id, "q1");
    }

    #[test]
    fn test_to_document() {
        let doc = two_state_graph().to_document();
        assert_eq!(doc["Start"], "q0");
        assert_eq!(doc["States"][1]["Id"], "q1");
        assert_eq!(doc["States"][1]["Ending"], true);
        assert_eq!(doc["Transitions"][0]["Start"], "q0");
        assert_eq!(doc["Transitions"][0]["End"], "q1");
        assert_eq!(doc["Transitions"][0]["Symbol"], "a");
    }
}
