use std::io::Write;

use flate2::{Compression, write::ZlibEncoder};

use crate::domain::inventory::{InventoryIndex, NAME_MARKER, NO_DISPLAY_NAME};

use super::error::InventoryError;

/// Serialize `index` as a version 2 inventory.
///
/// URIs are written verbatim apart from the name shortening, so decoding the
/// result with an empty target URI reproduces the original entries.
pub fn encode(
    index: &InventoryIndex,
    project: &str,
    version: &str,
) -> Result<Vec<u8>, InventoryError> {
    let mut out = format!(
        "# Sphinx inventory version 2\n\
         # Project: {project}\n\
         # Version: {version}\n\
         # The remainder of this file is compressed using zlib.\n"
    )
    .into_bytes();

    let mut body = String::new();
    for (object_type, name, item) in index.iter() {
        let uri = match item.uri.strip_suffix(name) {
            Some(stem) if stem.ends_with('#') => format!("{stem}{NAME_MARKER}"),
            _ => item.uri.clone(),
        };
        let display_name = if item.display_name == name {
            NO_DISPLAY_NAME
        } else {
            item.display_name.as_str()
        };
        body.push_str(&format!(
            "{name} {object_type} {} {uri} {display_name}\n",
            item.priority
        ));
    }

    out.extend(compress(body.as_bytes()).map_err(|err| {
        InventoryError::new("cannot compress inventory: {}", vec![err.to_string()])
    })?);
    Ok(out)
}

fn compress(body: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(body)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{application::inventory::decode, domain::inventory::InventoryItem};

    fn item(uri: &str, display_name: &str) -> InventoryItem {
        InventoryItem {
            project_name: "Synthetic".to_string(),
            project_version: "1.0".to_string(),
            uri: uri.to_string(),
            display_name: display_name.to_string(),
            priority: 1,
        }
    }

    #[test]
    fn round_trips_through_decode() {
        let mut index = InventoryIndex::new();
        index.insert(
            "py:function",
            "synthetic.run",
            item("api.html#synthetic.run", NO_DISPLAY_NAME),
        );
        index.insert("std:doc", "guide", item("guide/index.html", "User Guide"));

        let raw = encode(&index, "Synthetic", "1.0").expect("encodes");
        assert!(raw.starts_with(b"# Sphinx inventory version 2\n# Project: Synthetic\n"));

        let decoded = decode(&raw, "").expect("decodes");
        let flatten = |index: &InventoryIndex| {
            index
                .iter()
                .map(|(ty, name, item)| {
                    (
                        ty.to_string(),
                        name.to_string(),
                        item.display_name.clone(),
                        item.uri.clone(),
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(flatten(&decoded), flatten(&index));
    }

    #[test]
    fn shortens_name_suffix_and_display_name() {
        let mut index = InventoryIndex::new();
        index.insert("py:class", "pkg.Thing", item("api.html#pkg.Thing", "pkg.Thing"));

        let raw = encode(&index, "P", "1").expect("encodes");
        let decoded = decode(&raw, "https://example.org/").expect("decodes");
        let thing = decoded.get("py:class", "pkg.Thing").expect("entry");
        assert_eq!(thing.uri, "https://example.org/api.html#pkg.Thing");
        assert_eq!(thing.display_name(), None);
    }
}
