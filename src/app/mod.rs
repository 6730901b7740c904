// LogRelay - app/mod.rs
//
// Application layer: tail monitoring, change watching, queries, control
// dispatch.
// Dependencies: core, platform, util.

pub mod broadcast;
pub mod control;
pub mod monitor;
pub mod offsets;
pub mod query;
pub mod reader;
pub mod watcher;
