//! # machsim-core
//!
//! Simulation core for machsim.
//!
//! This crate provides:
//! - The machine graph model and its document loader/validator
//! - Automaton dispatch across the machine families
//! - The deterministic finite automaton stepper
//! - The concurrent session registry

pub mod automata;
pub mod dfa;
pub mod error;
pub mod graph;
pub mod loader;
pub mod registry;
pub mod schema;
pub mod simulation;

pub use automata::{Machine, MachineType};
pub use dfa::{Dfa, DfaSimulation};
pub use error::CoreError;
pub use graph::{Graph, State, Transition};
pub use registry::SimulationRegistry;
pub use simulation::{Report, Simulation, SimulationResult};
