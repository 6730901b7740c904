// LogRelay - platform/mod.rs
//
// Platform abstraction layer: configuration and filesystem helpers.
// Dependencies: standard library, directories, toml.
// Must NOT depend on: core, app.

pub mod config;
pub mod fs;
