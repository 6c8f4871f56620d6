//! Concurrent registry of live simulation sessions.

use crate::automata::Machine;
use crate::error::CoreError;
use crate::simulation::{Report, Simulation, SimulationResult};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Registry of running simulations, keyed by session id.
///
/// Ids are monotonically increasing and never reused within a registry's
/// lifetime. All operations are safe under concurrent callers; no lock is
/// held across a full simulation run.
pub struct SimulationRegistry {
    sessions: DashMap<u64, RwLock<Box<dyn Simulation>>>,
    next_id: AtomicU64,
}

impl SimulationRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            next_id: AtomicU64::new(0),
        }
    }

    /// Begins a new simulation over `input` and returns its session id.
    pub fn start(&self, machine: Arc<dyn Machine>, input: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let sim = machine.simulate(input);
        self.sessions.insert(id, RwLock::new(sim));
        tracing::debug!(id, "simulation session started");
        id
    }

    /// Performs one transition on the session. A no-op on a finished
    /// session.
    pub fn step(&self, id: u64) -> Result<(), CoreError> {
        let entry = self
            .sessions
            .get(&id)
            .ok_or(CoreError::SessionNotFound { id })?;
        entry.write().step();
        Ok(())
    }

    /// Returns a progress snapshot of the session.
    pub fn stat(&self, id: u64) -> Result<Report, CoreError> {
        let entry = self
            .sessions
            .get(&id)
            .ok_or(CoreError::SessionNotFound { id })?;
        let report = entry.read().stat();
        Ok(report)
    }

    /// Returns whether the session has finished.
    pub fn done(&self, id: u64) -> Result<bool, CoreError> {
        let entry = self
            .sessions
            .get(&id)
            .ok_or(CoreError::SessionNotFound { id })?;
        let is_done = entry.read().done();
        Ok(is_done)
    }

    /// Returns the final result of the session, or `SimulationIncomplete`
    /// if it has not finished.
    pub fn result(&self, id: u64) -> Result<SimulationResult, CoreError> {
        let entry = self
            .sessions
            .get(&id)
            .ok_or(CoreError::SessionNotFound { id })?;
        let result = entry.read().result();
        result
    }

    /// Drives the session to completion and returns its result. The
    /// session map is re-entered for every transition, so other sessions
    /// are never blocked behind a long run.
    pub fn run_to_completion(&self, id: u64) -> Result<SimulationResult, CoreError> {
        while !self.done(id)? {
            self.step(id)?;
        }
        self.result(id)
    }

    /// Ends a session. A second end on the same id fails: removal is not
    /// idempotent, and ids are never reused.
    pub fn end(&self, id: u64) -> Result<(), CoreError> {
        match self.sessions.remove(&id) {
            Some(_) => {
                tracing::debug!(id, "simulation session ended");
                Ok(())
            }
            None => Err(CoreError::SessionNotFound { id }),
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SimulationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dfa::Dfa;
    use serde_json::json;
    use std::collections::HashSet;

    fn odd_as_machine() -> Arc<dyn Machine> {
        let doc = json!({
            "Type": "DFA",
            "Alphabet": "ab",
            "Start": "q0",
            "States": [
                {"Id": "q0", "Ending": false},
                {"Id": "q1", "Ending": true}
            ],
            "Transitions": [
                {"Start": "q0", "End": "q1", "Symbol": "a"},
                {"Start": "q0", "End": "q0", "Symbol": "b"},
                {"Start": "q1", "End": "q0", "Symbol": "a"},
                {"Start": "q1", "End": "q1", "Symbol": "b"}
            ]
        });
        Arc::new(Dfa::load(&doc).unwrap())
    }

    #[test]
    fn test_start_drive_result_end() {
        let registry = SimulationRegistry::new();
        let id = registry.start(odd_as_machine(), "aaba");

        let result = registry.run_to_completion(id).unwrap();
        assert!(result.accepted);
        assert_eq!(result.path, vec!["q0", "q1", "q0", "q0", "q1"]);
        assert_eq!(result.remaining_input, "");

        registry.end(id).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_sequential_ids_are_monotonic() {
        let registry = SimulationRegistry::new();
        let machine = odd_as_machine();
        let mut previous = None;
        for _ in 0..16 {
            let id = registry.start(machine.clone(), "ab");
            if let Some(prev) = previous {
                assert!(id > prev);
            }
            previous = Some(id);
        }
        assert_eq!(registry.len(), 16);
    }

    #[test]
    fn test_ids_are_unique_under_concurrent_starts() {
        let registry = Arc::new(SimulationRegistry::new());
        let machine = odd_as_machine();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let machine = machine.clone();
                std::thread::spawn(move || {
                    (0..50)
                        .map(|_| registry.start(machine.clone(), "aaba"))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(ids.insert(id), "id {id} was handed out twice");
            }
        }
        assert_eq!(ids.len(), 400);
        assert_eq!(registry.len(), 400);
    }

    #[test]
    fn test_start_is_visible_to_other_threads() {
        let registry = Arc::new(SimulationRegistry::new());
        let id = registry.start(odd_as_machine(), "aaba");

        let other = registry.clone();
        std::thread::spawn(move || other.run_to_completion(id))
            .join()
            .unwrap()
            .unwrap();

        registry.end(id).unwrap();
    }

    #[test]
    fn test_operations_on_unknown_session() {
        let registry = SimulationRegistry::new();
        assert!(matches!(
            registry.step(7),
            Err(CoreError::SessionNotFound { id: 7 })
        ));
        assert!(matches!(
            registry.stat(7),
            Err(CoreError::SessionNotFound { .. })
        ));
        assert!(matches!(
            registry.result(7),
            Err(CoreError::SessionNotFound { .. })
        ));
        assert!(matches!(
            registry.end(7),
            Err(CoreError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_second_end_fails() {
        let registry = SimulationRegistry::new();
        let id = registry.start(odd_as_machine(), "ab");
        registry.end(id).unwrap();
        assert!(matches!(
            registry.end(id),
            Err(CoreError::SessionNotFound { .. })
        ));
    }

    #[test]
    fn test_ids_are_not_reused_after_end() {
        let registry = SimulationRegistry::new();
        let machine = odd_as_machine();
        let first = registry.start(machine.clone(), "ab");
        registry.end(first).unwrap();
        let second = registry.start(machine, "ab");
        assert!(second > first);
    }

    #[test]
    fn test_result_before_completion_is_incomplete() {
        let registry = SimulationRegistry::new();
        let id = registry.start(odd_as_machine(), "aaba");
        assert!(matches!(
            registry.result(id),
            Err(CoreError::SimulationIncomplete)
        ));
        // A snapshot is still available.
        let report = registry.stat(id).unwrap();
        assert_eq!(report.result.remaining_input, "aaba");
    }

    #[test]
    fn test_idle_sessions_do_not_grow_the_registry() {
        let registry = SimulationRegistry::new();
        let machine = odd_as_machine();
        let ids: Vec<_> = (0..4)
            .map(|_| registry.start(machine.clone(), "aaba"))
            .collect();
        // Never stepped; one entry per open session, nothing more.
        assert_eq!(registry.len(), 4);
        for id in ids {
            registry.end(id).unwrap();
        }
        assert!(registry.is_empty());
    }
}
