use std::{fs, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;
use sha1::{Digest, Sha1};

use crate::application::render::types::RenderError;

static MAP_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^<map id="(.*?)""#).expect("map tag pattern must compile"));
static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"href=".*?""#).expect("href pattern must compile"));

/// Id graphviz writes when the graph has no name.
const PLACEHOLDER_ID: &str = "%3";
/// Prefix of ids derived for unnamed graphs. The spelling is part of
/// already-published output and must not change.
const DERIVED_ID_TAG: &str = "grapviz";

/// Client-side image map emitted next to raster output.
#[derive(Debug, Clone)]
pub struct ClickableMap {
    id: String,
    filename: String,
    content: Vec<String>,
    clickable: Vec<String>,
}

impl ClickableMap {
    /// Parse a map file's `content`. `dot` is the graph source, used to derive
    /// an id when the tool emitted its placeholder.
    pub fn parse(
        filename: impl Into<String>,
        content: &str,
        dot: &str,
    ) -> Result<Self, RenderError> {
        let filename = filename.into();
        let mut content: Vec<String> = content.lines().map(str::to_string).collect();

        let id = content
            .first()
            .and_then(|first| MAP_TAG.captures(first))
            .and_then(|captures| captures.get(1))
            .map(|id| id.as_str().to_string())
            .ok_or_else(|| RenderError::MalformedMap {
                path: filename.clone(),
            })?;

        let id = if id == PLACEHOLDER_ID {
            let derived = derived_id(dot);
            content[0] = content[0].replace(PLACEHOLDER_ID, &derived);
            derived
        } else {
            id
        };

        let clickable = content
            .iter()
            .filter(|line| HREF.is_match(line))
            .cloned()
            .collect();

        Ok(Self {
            id,
            filename,
            content,
            clickable,
        })
    }

    /// Read and parse the map file at `path`.
    pub fn from_file(path: &Path, dot: &str) -> Result<Self, RenderError> {
        let content = fs::read_to_string(path).map_err(|source| RenderError::MapRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path.display().to_string(), &content, dot)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn clickable(&self) -> &[String] {
        &self.clickable
    }

    pub fn is_clickable(&self) -> bool {
        !self.clickable.is_empty()
    }

    /// Stand-alone `<map>` declaration holding only the linked areas, or an
    /// empty string when no area links anywhere.
    pub fn generate_clickable_map(&self) -> String {
        let (Some(first), Some(last)) = (self.content.first(), self.content.last()) else {
            return String::new();
        };
        if self.clickable.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(self.clickable.len() + 2);
        lines.push(first.as_str());
        lines.extend(self.clickable.iter().map(String::as_str));
        lines.push(last.as_str());
        lines.join("\n")
    }
}

fn derived_id(dot: &str) -> String {
    let hashed = hex::encode(Sha1::digest(dot.as_bytes()));
    format!("{DERIVED_ID_TAG}{}", &hashed[hashed.len() - 10..])
}
