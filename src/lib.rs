//! Cached Graphviz rendering and cross-reference inventory inspection for
//! documentation builds.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
