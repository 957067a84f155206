//! leadopt: population-based optimization of chemical structures.
//!
//! A genetic algorithm evolves a pool of candidate molecules toward lower
//! cost (a docking/binding score) using generate-and-test search. New
//! candidates come from an external structure-mutation service and are
//! scored by an external, possibly slow, black-box cost function.

pub mod analysis;
pub mod core;
pub mod engine;
pub mod solvers;
