// Skill model, the static taxonomy, and the deterministic keyword extractor.
// Everything here is CPU-only; no I/O, no shared mutable state.

pub mod handlers;
pub mod heuristic;
pub mod models;
pub mod taxonomy;
