//! Simulation interface and result types.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

/// Final result of a simulation, in the boundary document shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Whether the machine finished in an accepting state with the whole
    /// tape consumed.
    #[serde(rename = "Accepted")]
    pub accepted: bool,

    /// Ids of the states visited, in order.
    #[serde(rename = "Path")]
    pub path: Vec<String>,

    /// The unconsumed portion of the input tape.
    #[serde(rename = "RemainingInput")]
    pub remaining_input: String,
}

/// A report of the current state of a simulation. Unlike a result, a
/// report can be taken at any point in the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    #[serde(flatten)]
    pub result: SimulationResult,
}

/// A steppable run of a machine over one input tape.
pub trait Simulation: Send + Sync {
    /// Performs one transition. A no-op once the simulation is done.
    fn step(&mut self);

    /// Returns a progress snapshot without forcing completion.
    fn stat(&self) -> Report;

    /// Returns the final result, or `SimulationIncomplete` if the
    /// simulation has not finished.
    fn result(&self) -> Result<SimulationResult, CoreError>;

    /// Returns true once the simulation can no longer advance.
    fn done(&self) -> bool;
}

/// Drives a simulation until it is done.
pub fn run_to_completion(sim: &mut dyn Simulation) {
    while !sim.done() {
        sim.step();
    }
}

/// Drives a simulation to completion and returns its result.
pub fn result_of(sim: &mut dyn Simulation) -> Result<SimulationResult, CoreError> {
    run_to_completion(sim);
    sim.result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_result_serializes_to_boundary_shape() {
        let result = SimulationResult {
            accepted: true,
            path: vec!["q0".to_string(), "q1".to_string()],
            remaining_input: String::new(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({"Accepted": true, "Path": ["q0", "q1"], "RemainingInput": ""})
        );
    }

    #[test]
    fn test_report_flattens_its_result() {
        let report = Report {
            result: SimulationResult {
                accepted: false,
                path: vec!["q0".to_string()],
                remaining_input: "ab".to_string(),
            },
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["Accepted"], false);
        assert_eq!(value["RemainingInput"], "ab");
    }
}
