//! Property-based tests for option resolution, registry and handoff guarantees

mod handoff;
mod options;
