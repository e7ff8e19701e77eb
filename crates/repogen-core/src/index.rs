//! Repository index (`addons.xml`) aggregation

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{RepoError, Result};
use crate::package::PackageDescriptor;

pub const INDEX_ROOT: &str = "addons";

/// Render the index document: one manifest root element per addon, in the
/// given order, under a single `<addons>` element.
///
/// Whitespace-only text between elements is dropped and the result is
/// re-indented with two spaces, so the output depends only on manifest content.
/// Text with any other character passes through byte for byte.
/// Addons appearing in both roots are listed twice.
pub fn render_index(packages: &[PackageDescriptor]) -> Result<Vec<u8>> {
    let xml_err = |e: &dyn std::fmt::Display| RepoError::Xml(e.to_string());

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| xml_err(&e))?;
    writer
        .write_event(Event::Start(BytesStart::new(INDEX_ROOT)))
        .map_err(|e| xml_err(&e))?;

    for package in packages {
        let mut reader = Reader::from_str(&package.raw_manifest);
        // whitespace-only text is held back: kept when it is an element's
        // sole content, dropped when it only separates markup
        let mut pending: Option<Event<'_>> = None;
        let mut after_start = false;

        loop {
            let event = match reader.read_event() {
                Ok(Event::Eof) => break,
                Ok(event) => event,
                Err(e) => {
                    return Err(RepoError::Xml(format!(
                        "manifest of {} {}: {}",
                        package.id, package.version, e
                    )))
                }
            };

            let blank = matches!(
                &event,
                Event::Text(text) if text.iter().all(|b| b.is_ascii_whitespace())
            );
            if blank {
                if after_start {
                    pending = Some(event);
                }
                after_start = false;
                continue;
            }

            if let Some(held) = pending.take() {
                if matches!(event, Event::End(_)) {
                    writer.write_event(held).map_err(|e| xml_err(&e))?;
                }
            }
            after_start = matches!(event, Event::Start(_));
            writer.write_event(event).map_err(|e| xml_err(&e))?;
        }
    }

    writer
        .write_event(Event::End(BytesEnd::new(INDEX_ROOT)))
        .map_err(|e| xml_err(&e))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Render and write the index, replacing any previous file
pub fn write_index(packages: &[PackageDescriptor], path: &Path) -> Result<usize> {
    let index_err = |message: String| RepoError::IndexWrite {
        path: path.to_path_buf(),
        message,
    };

    let bytes = render_index(packages).map_err(|e| index_err(e.to_string()))?;
    fs::write(path, &bytes).map_err(|e| index_err(e.to_string()))?;
    Ok(packages.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::manifest::Manifest;
    use crate::package::Origin;

    fn package(manifest: &str, origin: Origin) -> PackageDescriptor {
        let parsed = Manifest::parse(manifest, Path::new("addon.xml")).unwrap();
        PackageDescriptor {
            id: parsed.id.clone(),
            version: parsed.version.clone(),
            source_path: PathBuf::from(format!("/repo/{}", parsed.id)),
            display_name: parsed.id,
            origin,
            raw_manifest: parsed.root_element,
        }
    }

    fn child_count(xml: &str) -> usize {
        let mut reader = Reader::from_str(xml);
        let mut depth = 0;
        let mut count = 0;
        loop {
            match reader.read_event().unwrap() {
                Event::Eof => break,
                Event::Start(_) => {
                    if depth == 1 {
                        count += 1;
                    }
                    depth += 1;
                }
                Event::Empty(_) if depth == 1 => count += 1,
                Event::End(_) => depth -= 1,
                _ => {}
            }
        }
        count
    }

    #[test]
    fn renders_declaration_and_indented_children() {
        let packages = vec![
            package(
                "<addon id=\"a\" version=\"1\">\n\t\t<summary>First</summary>\n</addon>",
                Origin::Fresh,
            ),
            package(r#"<addon id="b" version="2"/>"#, Origin::Staged),
        ];

        let xml = String::from_utf8(render_index(&packages).unwrap()).unwrap();
        assert_eq!(
            xml,
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
                "<addons>\n",
                "  <addon id=\"a\" version=\"1\">\n",
                "    <summary>First</summary>\n",
                "  </addon>\n",
                "  <addon id=\"b\" version=\"2\"/>\n",
                "</addons>\n",
            )
        );
    }

    #[test]
    fn keeps_scan_order_and_duplicates() {
        let packages = vec![
            package(r#"<addon id="z" version="1"/>"#, Origin::Fresh),
            package(r#"<addon id="a" version="1"/>"#, Origin::Fresh),
            package(r#"<addon id="z" version="1"/>"#, Origin::Staged),
        ];

        let xml = String::from_utf8(render_index(&packages).unwrap()).unwrap();
        assert_eq!(child_count(&xml), 3);
        let z = xml.find(r#"id="z""#).unwrap();
        let a = xml.find(r#"id="a""#).unwrap();
        assert!(z < a);
    }

    #[test]
    fn escaped_content_passes_through() {
        let packages = vec![package(
            r#"<addon id="a" version="1"><summary>Fish &amp; &lt;chips&gt;</summary></addon>"#,
            Origin::Fresh,
        )];
        let xml = String::from_utf8(render_index(&packages).unwrap()).unwrap();
        assert!(xml.contains("<summary>Fish &amp; &lt;chips&gt;</summary>"));
    }

    #[test]
    fn text_whitespace_is_preserved() {
        let packages = vec![package(
            concat!(
                "<addon id=\"a\" version=\"1\">\n",
                "  <description>  Line one\n  line two  </description>\n",
                "  <disclaimer>   </disclaimer>\n",
                "</addon>",
            ),
            Origin::Fresh,
        )];

        let xml = String::from_utf8(render_index(&packages).unwrap()).unwrap();
        assert!(xml.contains("<description>  Line one\n  line two  </description>"));
        assert!(xml.contains("<disclaimer>   </disclaimer>"));
        assert_eq!(child_count(&xml), 1);
    }

    #[test]
    fn rendering_is_deterministic() {
        let packages = vec![package(
            "<addon id=\"a\" version=\"1\">\n  <news>x</news>\n</addon>",
            Origin::Fresh,
        )];
        assert_eq!(
            render_index(&packages).unwrap(),
            render_index(&packages).unwrap()
        );
    }

    #[test]
    fn write_index_overwrites_existing_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("addons.xml");
        fs::write(&path, "stale content that is much longer than the new index").unwrap();

        let packages = vec![package(r#"<addon id="a" version="1"/>"#, Origin::Fresh)];
        assert_eq!(write_index(&packages, &path).unwrap(), 1);

        let xml = fs::read_to_string(&path).unwrap();
        assert!(!xml.contains("stale"));
        assert_eq!(child_count(&xml), 1);
    }

    #[test]
    fn unwritable_index_is_index_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("missing-dir").join("addons.xml");
        let err = write_index(&[], &path).unwrap_err();
        assert!(matches!(err, RepoError::IndexWrite { .. }));
    }
}
