//! Command-line inspection of a single inventory.

use std::{
    io::{self, Write},
    time::Instant,
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::inventory::InventoryIndex;

use super::{
    decode::decode,
    error::InventoryError,
    fetch::{FetchError, InventoryFetcher},
};

pub const USAGE: &str =
    "Print out an inventory file.\nError: must specify local path or URL to an inventory file.";

const COLUMN_WIDTH: usize = 40;

#[derive(Debug, Error)]
pub enum InspectError {
    #[error(transparent)]
    Decode(#[from] InventoryError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("cannot serialize inventory: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

/// Text listing: one line per object type, then its entries indented.
///
/// A missing display name prints as blank padding.
pub fn format_index(index: &InventoryIndex, out: &mut dyn Write) -> io::Result<()> {
    for object_type in index.object_types() {
        writeln!(out, "{object_type}")?;
        for (name, item) in index.entries(object_type) {
            let display = item.display_name().unwrap_or_default();
            writeln!(
                out,
                "    {name:<width$} {display:<width$}: {}",
                item.uri,
                width = COLUMN_WIDTH
            )?;
        }
    }
    Ok(())
}

/// Fetch, decode and print the inventory at `location`. Returns the process
/// exit status.
pub async fn inspect_main(
    fetcher: &dyn InventoryFetcher,
    location: Option<&str>,
    json: bool,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> u8 {
    let Some(location) = location else {
        let _ = writeln!(err, "{USAGE}");
        return 1;
    };

    let started = Instant::now();
    match inspect(fetcher, location, json, out).await {
        Ok(()) => {
            debug!(
                target = "application::inventory",
                op = "inventory::inspect",
                result = "ok",
                location,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Inventory printed"
            );
            0
        }
        Err(InspectError::Decode(error)) => {
            warn!(
                target = "application::inventory",
                op = "inventory::inspect",
                result = "invalid",
                location,
                error = %error,
                "Inventory could not be decoded"
            );
            let _ = writeln!(err, "{error}");
            1
        }
        Err(error) => {
            warn!(
                target = "application::inventory",
                op = "inventory::inspect",
                result = "error",
                location,
                error = %error,
                "Inventory inspection failed"
            );
            let _ = writeln!(err, "Unknown error: {error}");
            1
        }
    }
}

async fn inspect(
    fetcher: &dyn InventoryFetcher,
    location: &str,
    json: bool,
    out: &mut dyn Write,
) -> Result<(), InspectError> {
    let raw = fetcher.fetch(location).await?;
    let index = decode(&raw, "")?;

    if json {
        serde_json::to_writer_pretty(&mut *out, &index)?;
        writeln!(out)?;
    } else {
        format_index(&index, out)?;
    }
    out.flush()?;
    Ok(())
}
