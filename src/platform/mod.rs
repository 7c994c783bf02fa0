// Oxygen - platform/mod.rs
//
// Platform abstraction layer: sockets, filesystem, directories, config.
// Dependencies: core (data model only), util.
// Must NOT depend on: app, ui.

pub mod config;
pub mod fs;
pub mod net;
