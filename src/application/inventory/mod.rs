//! Decoding and inspection of cross-reference inventories.
//!
//! Inventories arrive as raw bytes from an [`InventoryFetcher`]; the decoder
//! turns them into an [`InventoryIndex`](crate::domain::inventory::InventoryIndex)
//! and the inspector prints that index for humans.

mod decode;
mod encode;
mod error;
mod fetch;
mod inspect;

pub use decode::decode;
pub use encode::encode;
pub use error::InventoryError;
pub use fetch::{FetchError, InventoryFetcher};
pub use inspect::{InspectError, USAGE, format_index, inspect_main};
