// LogRelay - core/mod.rs
//
// Core business logic layer: parsing, filtering, pagination, data model.
// Dependencies: standard library, chrono, regex, serde.
// Must NOT depend on: app, platform, or perform any I/O.

pub mod filter;
pub mod model;
pub mod paging;
pub mod parser;
