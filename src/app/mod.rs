// Oxygen - app/mod.rs
//
// Application layer: executor drivers, dispatch, log watching, and the
// auto-execute folder.
// Dependencies: core, platform, util.
// Must NOT depend on: ui.

pub mod autoexec;
pub mod dispatcher;
pub mod drivers;
pub mod tail;
