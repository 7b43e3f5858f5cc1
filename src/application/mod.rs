//! Application services: graph rendering and inventory inspection.

pub mod error;
pub mod inventory;
pub mod render;
