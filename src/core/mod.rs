// Oxygen - core/mod.rs
//
// Core layer: data model and pure codecs.
// Must NOT depend on: ui, platform, app. No sockets or file handles here.

pub mod lines;
pub mod model;
pub mod wire;
