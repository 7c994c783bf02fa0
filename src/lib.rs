// Oxygen - lib.rs
//
// Library entry point, exposing every module to the command-line front end
// and to integration tests.

pub mod app;
pub mod core;
pub mod platform;
pub mod ui;
pub mod util;
