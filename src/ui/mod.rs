// Oxygen - ui/mod.rs
//
// UI layer: console presentation only.
// Dependencies: core (read-only models).
// Must NOT depend on: platform, direct I/O.

pub mod console;
pub mod theme;
