use std::{
    collections::{BTreeSet, HashMap},
    io::Read,
};

use flate2::read::ZlibDecoder;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info};

use crate::domain::inventory::{InventoryIndex, InventoryItem, NAME_MARKER, NO_DISPLAY_NAME};

use super::error::InventoryError;

const VERSION_PREFIX: &str = "# Sphinx inventory version ";
const VERSION_1: &str = "# Sphinx inventory version 1";
const VERSION_2: &str = "# Sphinx inventory version 2";
/// Length of both `# Project: ` and `# Version: `.
const FIELD_PREFIX_LEN: usize = 11;

/// `name type priority location display-name`; names may contain spaces.
static ENTRY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+(\S+)\s+(-?\d+)\s+?(\S*)\s+(.*)")
        .expect("inventory entry pattern must compile")
});

/// Decode raw inventory bytes, joining every location onto `target_uri`.
pub fn decode(raw: &[u8], target_uri: &str) -> Result<InventoryIndex, InventoryError> {
    let (format_line, rest) = split_first_line(raw);
    let format_line = String::from_utf8_lossy(format_line);
    let format_line = format_line.trim_end();

    match format_line {
        VERSION_2 => decode_v2(rest, target_uri),
        VERSION_1 => decode_v1(utf8(rest)?, target_uri),
        line if line.starts_with(VERSION_PREFIX) => Err(InventoryError::new(
            "unknown or unsupported inventory version: {}",
            vec![format!("{line:?}")],
        )),
        line => Err(InventoryError::new(
            "invalid inventory header: {}",
            vec![line.to_string()],
        )),
    }
}

fn decode_v1(content: &str, target_uri: &str) -> Result<InventoryIndex, InventoryError> {
    let mut lines = content.lines();
    let (Some(project_line), Some(version_line)) = (lines.next(), lines.next()) else {
        return Err(missing_project_header());
    };
    let project_name = header_field(project_line);
    let project_version = header_field(version_line);

    let mut index = InventoryIndex::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let (name, item_type, location) = split_v1_entry(line).ok_or_else(|| {
            InventoryError::new("invalid inventory entry: {}", vec![format!("{line:?}")])
        })?;

        // Version 1 locations carry no anchor.
        let mut uri = posix_join(target_uri, location);
        let object_type = if item_type == "mod" {
            uri.push_str(&format!("#module-{name}"));
            "py:module".to_string()
        } else {
            uri.push('#');
            uri.push_str(name);
            format!("py:{item_type}")
        };

        index.insert(
            &object_type,
            name,
            InventoryItem {
                project_name: project_name.clone(),
                project_version: project_version.clone(),
                uri,
                display_name: NO_DISPLAY_NAME.to_string(),
                priority: 1,
            },
        );
    }
    Ok(index)
}

fn decode_v2(data: &[u8], target_uri: &str) -> Result<InventoryIndex, InventoryError> {
    let mut parts = data.splitn(4, |byte| *byte == b'\n');
    let (Some(project_line), Some(version_line), Some(check_line), Some(compressed)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(missing_project_header());
    };

    let project_name = header_field(&String::from_utf8_lossy(project_line));
    let project_version = header_field(&String::from_utf8_lossy(version_line));

    if !contains(check_line, b"zlib") {
        return Err(InventoryError::new(
            "invalid inventory header (not compressed): {}",
            vec![String::from_utf8_lossy(check_line).into_owned()],
        ));
    }

    let mut decompressed = Vec::new();
    ZlibDecoder::new(compressed)
        .read_to_end(&mut decompressed)
        .map_err(|err| {
            InventoryError::new("invalid inventory data: {}", vec![err.to_string()])
        })?;
    let content = utf8(&decompressed)?;

    let mut index = InventoryIndex::new();
    let mut seen_case_insensitive: HashMap<String, (&str, &str, &str)> = HashMap::new();
    let mut ambiguities = BTreeSet::new();

    for line in content.lines() {
        let Some(captures) = ENTRY.captures(line.trim_end()) else {
            continue;
        };
        let field = |i: usize| captures.get(i).map_or("", |m| m.as_str());
        let (name, object_type, priority, location, display_name) =
            (field(1), field(2), field(3), field(4), field(5));

        // Types are always `{domain}:{role}`.
        if !object_type.contains(':') {
            continue;
        }
        let Ok(priority_value) = priority.parse::<i32>() else {
            continue;
        };

        let item = InventoryItem {
            project_name: project_name.clone(),
            project_version: project_version.clone(),
            uri: posix_join(target_uri, &expand_location(location, name)),
            display_name: display_name.to_string(),
            priority: priority_value,
        };

        // Old writers emitted two entries per Python module; the first is
        // the correct one.
        if object_type == "py:module" {
            index.insert_first(object_type, name, item);
            continue;
        }

        if matches!(object_type, "std:label" | "std:term") {
            let definition = format!("{object_type}:{name}");
            let content = (priority, location, display_name);
            match seen_case_insensitive.get(&definition.to_lowercase()) {
                Some(existing) if *existing != content => {
                    ambiguities.insert(definition);
                }
                Some(_) => {
                    debug!(
                        target = "application::inventory",
                        op = "inventory::decode",
                        target_uri,
                        definition = %definition,
                        "Inventory contains duplicate definitions"
                    );
                }
                None => {
                    seen_case_insensitive.insert(definition.to_lowercase(), content);
                }
            }
        }

        index.insert(object_type, name, item);
    }

    for definition in &ambiguities {
        info!(
            target = "application::inventory",
            op = "inventory::decode",
            target_uri,
            definition = %definition,
            "Inventory contains multiple definitions"
        );
    }

    Ok(index)
}

fn missing_project_header() -> InventoryError {
    InventoryError::plain("invalid inventory header: missing project name or version")
}

fn split_first_line(raw: &[u8]) -> (&[u8], &[u8]) {
    match raw.iter().position(|byte| *byte == b'\n') {
        Some(at) => (&raw[..at], &raw[at + 1..]),
        None => (raw, &[]),
    }
}

fn utf8(bytes: &[u8]) -> Result<&str, InventoryError> {
    std::str::from_utf8(bytes).map_err(|err| {
        InventoryError::new("inventory is not valid UTF-8: {}", vec![err.to_string()])
    })
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Value of a `# Project: …` / `# Version: …` header line.
fn header_field(line: &str) -> String {
    line.trim_end()
        .get(FIELD_PREFIX_LEN..)
        .unwrap_or_default()
        .to_string()
}

/// Split a version 1 line into name, type and the remaining location.
fn split_v1_entry(line: &str) -> Option<(&str, &str, &str)> {
    let line = line.trim();
    let (name, rest) = line.split_once(char::is_whitespace)?;
    let (item_type, rest) = rest.trim_start().split_once(char::is_whitespace)?;
    let location = rest.trim_start();
    (!location.is_empty()).then_some((name, item_type, location))
}

fn expand_location(location: &str, name: &str) -> String {
    match location.strip_suffix(NAME_MARKER) {
        Some(stem) => format!("{stem}{name}"),
        None => location.to_string(),
    }
}

/// Join like POSIX paths: a rooted `tail` replaces `base`.
fn posix_join(base: &str, tail: &str) -> String {
    if tail.starts_with('/') || base.is_empty() {
        tail.to_string()
    } else if base.ends_with('/') {
        format!("{base}{tail}")
    } else {
        format!("{base}/{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::ZlibEncoder};
    use std::io::Write;

    fn v2(entries: &str) -> Vec<u8> {
        let mut raw = concat!(
            "# Sphinx inventory version 2\n",
            "# Project: Example\n",
            "# Version: 2.1\n",
            "# The remainder of this file is compressed using zlib.\n"
        )
        .as_bytes()
        .to_vec();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(entries.as_bytes()).expect("compress");
        raw.extend(encoder.finish().expect("finish"));
        raw
    }

    #[test]
    fn decodes_v2_entries() {
        let raw = v2(concat!(
            "example.api py:function 1 api.html#$ -\n",
            "intro std:doc -1 intro.html Introduction\n",
            "multi word name std:label 0 guide.html#multi Multi Word\n",
        ));
        let index = decode(&raw, "https://docs.example.org/").expect("decodes");

        let func = index.get("py:function", "example.api").expect("function entry");
        assert_eq!(func.uri, "https://docs.example.org/api.html#example.api");
        assert_eq!(func.display_name(), None);
        assert_eq!(func.project_name, "Example");
        assert_eq!(func.project_version, "2.1");
        assert_eq!(func.priority, 1);

        let doc = index.get("std:doc", "intro").expect("doc entry");
        assert_eq!(doc.display_name(), Some("Introduction"));
        assert_eq!(doc.priority, -1);

        let label = index.get("std:label", "multi word name").expect("label entry");
        assert_eq!(label.uri, "https://docs.example.org/guide.html#multi");
        assert_eq!(label.display_name, "Multi Word");
    }

    #[test]
    fn skips_malformed_and_untyped_lines() {
        let raw = v2(concat!(
            "garbage\n",
            "name function 1 a.html -\n",
            "ok py:class 1 b.html -\n",
        ));
        let index = decode(&raw, "").expect("decodes");
        assert_eq!(index.len(), 1);
        assert!(index.contains("py:class", "ok"));
    }

    // Pinned regression: the first py:module entry wins, other types overwrite.
    #[test]
    fn keeps_first_python_module_entry() {
        let raw = v2(concat!(
            "pkg py:module 0 pkg.html#module-pkg -\n",
            "pkg py:module 0 wrong.html -\n",
            "thing py:class 1 first.html -\n",
            "thing py:class 1 second.html -\n",
        ));
        let index = decode(&raw, "").expect("decodes");
        assert_eq!(
            index.get("py:module", "pkg").map(|item| item.uri.as_str()),
            Some("pkg.html#module-pkg")
        );
        assert_eq!(
            index.get("py:class", "thing").map(|item| item.uri.as_str()),
            Some("second.html")
        );
    }

    // Pinned regression: only a trailing `$` and an exact `-` are placeholders.
    #[test]
    fn placeholders_match_exact_sentinels_only() {
        let raw = v2(concat!(
            "a.b py:function 1 api.html#$ -\n",
            "c.d py:function 1 api.html#x$y --\n",
            "e.f py:function 1 $ - \n",
        ));
        let index = decode(&raw, "").expect("decodes");

        let trailing = index.get("py:function", "a.b").expect("a.b");
        assert_eq!(trailing.uri, "api.html#a.b");
        assert_eq!(trailing.display_name(), None);

        let embedded = index.get("py:function", "c.d").expect("c.d");
        assert_eq!(embedded.uri, "api.html#x$y");
        assert_eq!(embedded.display_name(), Some("--"));

        let bare = index.get("py:function", "e.f").expect("e.f");
        assert_eq!(bare.uri, "e.f");
        assert_eq!(bare.display_name(), None);
    }

    #[test]
    fn case_variant_labels_are_kept_separately() {
        let raw = v2(concat!(
            "Setup std:label -1 a.html#setup Setup\n",
            "setup std:label -1 b.html#setup setup\n",
        ));
        let index = decode(&raw, "").expect("decodes");
        assert!(index.contains("std:label", "Setup"));
        assert!(index.contains("std:label", "setup"));
    }

    #[test]
    fn decodes_v1_inventories() {
        let raw = concat!(
            "# Sphinx inventory version 1\n",
            "# Project: Legacy\n",
            "# Version: 0.9\n",
            "legacy mod legacy.html\n",
            "legacy.run function legacy.html\n",
        );
        let index = decode(raw.as_bytes(), "https://old.example.org").expect("decodes");

        let module = index.get("py:module", "legacy").expect("module");
        assert_eq!(module.uri, "https://old.example.org/legacy.html#module-legacy");
        assert_eq!(module.project_name, "Legacy");

        let func = index.get("py:function", "legacy.run").expect("function");
        assert_eq!(func.uri, "https://old.example.org/legacy.html#legacy.run");
        assert_eq!(func.display_name(), None);
    }

    #[test]
    fn rejects_unknown_header() {
        let err = decode(b"# Not an inventory\nfoo", "").expect_err("bad header");
        assert_eq!(err.to_string(), "invalid inventory header: # Not an inventory");
        assert_eq!(err.template(), "invalid inventory header: {}");
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = decode(b"# Sphinx inventory version 3\n", "").expect_err("bad version");
        assert_eq!(
            err.to_string(),
            "unknown or unsupported inventory version: \"# Sphinx inventory version 3\""
        );
    }

    #[test]
    fn rejects_uncompressed_v2() {
        let raw = concat!(
            "# Sphinx inventory version 2\n",
            "# Project: Example\n",
            "# Version: 1\n",
            "# The remainder is plain text.\n",
            "a py:class 1 a.html -\n"
        );
        let err = decode(raw.as_bytes(), "").expect_err("not compressed");
        assert_eq!(
            err.to_string(),
            "invalid inventory header (not compressed): # The remainder is plain text."
        );
    }

    #[test]
    fn rejects_truncated_headers() {
        let err = decode(b"# Sphinx inventory version 2\n# Project: X\n", "")
            .expect_err("truncated");
        assert_eq!(
            err.to_string(),
            "invalid inventory header: missing project name or version"
        );

        let err = decode(b"# Sphinx inventory version 1\n# Project: X", "").expect_err("truncated");
        assert_eq!(
            err.to_string(),
            "invalid inventory header: missing project name or version"
        );
    }

    #[test]
    fn rejects_corrupt_stream() {
        let raw = concat!(
            "# Sphinx inventory version 2\n",
            "# Project: Example\n",
            "# Version: 1\n",
            "# The remainder of this file is compressed using zlib.\n",
            "definitely not zlib"
        );
        let err = decode(raw.as_bytes(), "").expect_err("corrupt");
        assert_eq!(err.template(), "invalid inventory data: {}");
    }

    #[test]
    fn posix_join_follows_path_rules() {
        assert_eq!(posix_join("", "a.html"), "a.html");
        assert_eq!(posix_join("https://x.org", "a.html"), "https://x.org/a.html");
        assert_eq!(posix_join("https://x.org/", "a.html"), "https://x.org/a.html");
        assert_eq!(posix_join("https://x.org/", "/abs.html"), "/abs.html");
    }

    #[test]
    fn header_line_tolerates_crlf() {
        let raw = v2("a py:class 1 a.html -\n");
        let mut crlf = b"# Sphinx inventory version 2\r\n".to_vec();
        crlf.extend_from_slice(&raw["# Sphinx inventory version 2\n".len()..]);
        assert!(decode(&crlf, "").expect("decodes").contains("py:class", "a"));
    }
}
