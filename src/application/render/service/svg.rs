//! Relocation of relative links inside rendered SVG files.
//!
//! The layout tool writes `xlink:href` values relative to the referencing
//! document, but the SVG is loaded from the image directory. Links on
//! `svg:image` and `svg:a` elements are rewritten so they resolve from there.

use std::{fs, path::Path, string::FromUtf8Error};

use quick_xml::{
    events::{BytesStart, Event, attributes::AttrError},
    name::{Namespace, ResolveResult},
    reader::NsReader,
    writer::Writer,
};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::application::render::types::RenderError;
use crate::util::paths::{relative_path, to_posix};

const SVG_NS: &[u8] = b"http://www.w3.org/2000/svg";
const XLINK_NS: &[u8] = b"http://www.w3.org/1999/xlink";

#[derive(Debug, Error)]
pub(crate) enum SvgRewriteError {
    #[error(transparent)]
    Xml(#[from] quick_xml::Error),
    #[error(transparent)]
    Attribute(#[from] AttrError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("rewritten svg is not valid utf-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

/// Rewrite relative links in the SVG at `path` in place.
///
/// The file is only written back when at least one link changed. Returns
/// whether it was.
pub(crate) fn fix_relative_paths(
    path: &Path,
    document_dir: &Path,
    image_root: &Path,
) -> Result<bool, RenderError> {
    let content = fs::read_to_string(path).map_err(|err| RenderError::svg(path, err))?;
    let Some(rewritten) = rewrite_svg(&content, document_dir, image_root)
        .map_err(|err| RenderError::svg(path, err))?
    else {
        return Ok(false);
    };

    fs::write(path, rewritten).map_err(|err| RenderError::svg(path, err))?;
    debug!(
        target = "application::render::graphviz",
        op = "svg::fix_relative_paths",
        path = %path.display(),
        "Relocated relative links in svg output"
    );
    Ok(true)
}

/// Returns the rewritten document, or `None` when nothing needed relocating.
pub(crate) fn rewrite_svg(
    content: &str,
    document_dir: &Path,
    image_root: &Path,
) -> Result<Option<String>, SvgRewriteError> {
    let mut reader = NsReader::from_str(content);
    let mut writer = Writer::new(Vec::with_capacity(content.len()));
    let mut modified = false;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let in_svg_ns = matches!(resolved, ResolveResult::Bound(Namespace(ns)) if ns == SVG_NS);

        match event {
            Event::Eof => break,
            Event::Start(start) if in_svg_ns && is_link_element(&start) => {
                let (start, changed) = relocate_links(&reader, &start, document_dir, image_root)?;
                modified |= changed;
                writer.write_event(Event::Start(start))?;
            }
            Event::Empty(start) if in_svg_ns && is_link_element(&start) => {
                let (start, changed) = relocate_links(&reader, &start, document_dir, image_root)?;
                modified |= changed;
                writer.write_event(Event::Empty(start))?;
            }
            other => writer.write_event(other)?,
        }
    }

    if !modified {
        return Ok(None);
    }
    Ok(Some(String::from_utf8(writer.into_inner())?))
}

fn is_link_element(start: &BytesStart<'_>) -> bool {
    matches!(start.local_name().as_ref(), b"image" | b"a")
}

fn relocate_links(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    document_dir: &Path,
    image_root: &Path,
) -> Result<(BytesStart<'static>, bool), SvgRewriteError> {
    let mut rewritten = start.to_owned();
    rewritten.clear_attributes();
    let mut changed = false;

    for attribute in start.attributes() {
        let attribute = attribute?;
        let (namespace, local) = reader.resolve_attribute(attribute.key);
        let is_href = local.as_ref() == b"href"
            && matches!(namespace, ResolveResult::Bound(Namespace(ns)) if ns == XLINK_NS);

        if is_href {
            let value = attribute.unescape_value()?;
            if let Some(relocated) = relocate_reference(&value, document_dir, image_root)
                && relocated != value
            {
                let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
                rewritten.push_attribute((key.as_str(), relocated.as_str()));
                changed = true;
                continue;
            }
        }
        rewritten.push_attribute(attribute);
    }

    Ok((rewritten, changed))
}

/// Re-anchor a document-relative reference onto the image directory.
///
/// Anything that names a host or scheme, is rooted, or only carries a query or
/// fragment is left alone.
pub(crate) fn relocate_reference(
    href: &str,
    document_dir: &Path,
    image_root: &Path,
) -> Option<String> {
    if href.starts_with('/') || Url::parse(href).is_ok() {
        return None;
    }

    let split_at = href.find(['?', '#']).unwrap_or(href.len());
    let (path, suffix) = href.split_at(split_at);
    if path.is_empty() {
        return None;
    }

    let target = document_dir.join(path);
    let relocated = to_posix(&relative_path(&target, image_root));
    Some(format!("{relocated}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DOC_DIR: &str = "/build/html/api";
    const IMAGE_ROOT: &str = "/build/html/_images";

    fn svg(body: &str) -> String {
        format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n",
                "<svg xmlns=\"http://www.w3.org/2000/svg\" ",
                "xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"62pt\">\n",
                "<g id=\"graph0\" class=\"graph\">\n{}\n</g>\n</svg>\n"
            ),
            body
        )
    }

    fn rewrite(content: &str) -> Option<String> {
        rewrite_svg(content, Path::new(DOC_DIR), Path::new(IMAGE_ROOT)).expect("valid svg")
    }

    #[test]
    fn relocates_relative_anchor_links() {
        let input = svg(r#"<a xlink:href="module.html#func" xlink:title="func"><text>f</text></a>"#);
        let output = rewrite(&input).expect("link rewritten");
        assert!(
            output.contains(r#"xlink:href="../api/module.html#func""#),
            "unexpected output: {output}"
        );
        assert!(output.contains(r#"xlink:title="func""#));
        assert!(output.contains(r#"<g id="graph0" class="graph">"#));
    }

    #[test]
    fn keeps_graphviz_preamble_and_escaped_ampersands() {
        let input = concat!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n",
            "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\"\n",
            " \"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\">\n",
            "<!-- Generated by graphviz version 2.43.0 (0)\n -->\n",
            "<!-- Title: deps Pages: 1 -->\n",
            "<svg xmlns=\"http://www.w3.org/2000/svg\" ",
            "xmlns:xlink=\"http://www.w3.org/1999/xlink\" width=\"62pt\">\n",
            "<g id=\"graph0\" class=\"graph\">\n",
            "<a xlink:href=\"x.html?a=1&amp;b=2\" xlink:title=\"a &amp; b\"><text>a</text></a>\n",
            "</g>\n</svg>\n"
        );
        let output = rewrite(input).expect("link rewritten");

        assert!(
            output.contains(r#"xlink:href="../api/x.html?a=1&amp;b=2""#),
            "unexpected output: {output}"
        );
        assert!(output.contains(r#"xlink:title="a &amp; b""#));
        let preamble_end = input.find("<svg").expect("svg start");
        assert!(
            output.starts_with(&input[..preamble_end]),
            "preamble changed: {output}"
        );
    }

    #[test]
    fn relocates_self_closing_images() {
        let input = svg(r#"<image xlink:href="logo.png" width="10"/>"#);
        let output = rewrite(&input).expect("image rewritten");
        assert!(
            output.contains(r#"<image xlink:href="../api/logo.png" width="10"/>"#),
            "unexpected output: {output}"
        );

        // Already valid from the image directory: nothing to do.
        let sibling = svg(r#"<image xlink:href="../static/logo.png"/>"#);
        assert_eq!(rewrite(&sibling), None);

        let nested = rewrite_svg(
            &svg(r#"<image xlink:href="figures/logo.png"/>"#),
            Path::new("/build/html/guide/deep"),
            Path::new(IMAGE_ROOT),
        )
        .expect("valid svg")
        .expect("image rewritten");
        assert!(nested.contains(r#"xlink:href="../guide/deep/figures/logo.png""#));
    }

    #[test]
    fn leaves_network_references_untouched() {
        let input = svg(concat!(
            r#"<a xlink:href="https://example.org/docs/index.html"><text>x</text></a>"#,
            r#"<a xlink:href="//cdn.example.org/x.html"><text>y</text></a>"#
        ));
        assert_eq!(rewrite(&input), None);
    }

    #[test]
    fn leaves_fragment_only_and_rooted_references_untouched() {
        let input = svg(concat!(
            r##"<a xlink:href="#node1"><text>x</text></a>"##,
            r#"<a xlink:href="/abs/page.html"><text>y</text></a>"#
        ));
        assert_eq!(rewrite(&input), None);
    }

    #[test]
    fn ignores_elements_outside_the_svg_namespace() {
        let input = concat!(
            "<root xmlns=\"urn:other\" xmlns:xlink=\"http://www.w3.org/1999/xlink\">",
            "<a xlink:href=\"page.html\"/></root>"
        );
        assert_eq!(rewrite(input), None);
    }

    #[test]
    fn ignores_plain_href_attributes() {
        let input = svg(r#"<a href="page.html"><text>x</text></a>"#);
        assert_eq!(rewrite(&input), None);
    }

    #[test]
    fn relocate_reference_keeps_query_and_fragment() {
        assert_eq!(
            relocate_reference("a/b.html?x=1#frag", Path::new(DOC_DIR), Path::new(IMAGE_ROOT)),
            Some("../api/a/b.html?x=1#frag".to_string())
        );
        assert_eq!(
            relocate_reference("mailto:someone@example.org", Path::new(DOC_DIR), Path::new(IMAGE_ROOT)),
            None
        );
    }

    #[test]
    fn file_without_relative_links_is_not_rewritten() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("graph.svg");
        let original = svg(r#"<a xlink:href="https://example.org/"><text>x</text></a>"#);
        fs::write(&path, &original).expect("write svg");
        let modified_before = fs::metadata(&path).and_then(|m| m.modified()).expect("mtime");

        let changed = fix_relative_paths(&path, Path::new(DOC_DIR), Path::new(IMAGE_ROOT))
            .expect("post-process");

        assert!(!changed);
        assert_eq!(fs::read_to_string(&path).expect("read svg"), original);
        let modified_after = fs::metadata(&path).and_then(|m| m.modified()).expect("mtime");
        assert_eq!(modified_before, modified_after);
    }

    #[test]
    fn file_with_relative_links_is_rewritten_in_place() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("graph.svg");
        fs::write(&path, svg(r#"<a xlink:href="index.html"><text>x</text></a>"#))
            .expect("write svg");

        let changed = fix_relative_paths(&path, Path::new(DOC_DIR), Path::new(IMAGE_ROOT))
            .expect("post-process");

        assert!(changed);
        let content = fs::read_to_string(&path).expect("read svg");
        assert!(content.contains(r#"xlink:href="../api/index.html""#));
    }
}
