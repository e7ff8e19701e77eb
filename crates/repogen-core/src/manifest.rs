//! Addon manifest (`addon.xml`) parsing
//!
//! Only the root element's `id` and `version` attributes are interpreted.
//! Everything else is carried through untouched as the serialized root element.

use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{RepoError, Result};

pub const MANIFEST_FILE: &str = "addon.xml";

/// A manifest whose required attributes have been validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub id: String,
    pub version: String,
    /// Root element re-serialized without the XML declaration or prolog
    pub root_element: String,
}

impl Manifest {
    /// Read and validate the manifest at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let content = String::from_utf8(bytes).map_err(|e| RepoError::ManifestParse {
            path: path.to_path_buf(),
            message: format!("not valid UTF-8: {}", e),
        })?;
        Self::parse(&content, path)
    }

    /// Validate manifest content; `path` is only used for error context
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let parse_err = |message: String| RepoError::ManifestParse {
            path: path.to_path_buf(),
            message,
        };

        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let events = root_element_events(content).map_err(parse_err)?;

        let root = match events.first() {
            Some(Event::Start(e)) | Some(Event::Empty(e)) => e,
            _ => return Err(parse_err("no root element".to_string())),
        };

        let id = required_attribute(root, "id", path)?;
        let version = required_attribute(root, "version", path)?;
        let root_element = serialize(events).map_err(parse_err)?;

        Ok(Self {
            id,
            version,
            root_element,
        })
    }
}

fn required_attribute(root: &BytesStart<'_>, name: &'static str, path: &Path) -> Result<String> {
    let value = attribute(root, name).map_err(|message| RepoError::ManifestParse {
        path: path.to_path_buf(),
        message,
    })?;

    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(RepoError::ManifestMissingAttribute {
            path: path.to_path_buf(),
            attribute: name,
        }),
    }
}

fn attribute(element: &BytesStart<'_>, name: &str) -> std::result::Result<Option<String>, String> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        if attr.key.as_ref() == name.as_bytes() {
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Events of the single root element, prolog and epilog dropped.
fn root_element_events(content: &str) -> std::result::Result<Vec<Event<'_>>, String> {
    let mut reader = Reader::from_str(content);
    let mut events = Vec::new();
    let mut depth = 0usize;
    let mut seen_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("at byte {}: {}", reader.buffer_position(), e))?;

        match event {
            Event::Eof => break,
            Event::Start(_) | Event::Empty(_) if depth == 0 && seen_root => {
                return Err("multiple root elements".to_string());
            }
            Event::Start(ref e) => {
                check_attributes(e)?;
                seen_root = true;
                depth += 1;
                events.push(event);
            }
            Event::Empty(ref e) => {
                check_attributes(e)?;
                seen_root = true;
                events.push(event);
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                events.push(event);
            }
            Event::Text(ref text) if depth == 0 => {
                if !text.iter().all(|b| b.is_ascii_whitespace()) {
                    return Err("text outside the root element".to_string());
                }
            }
            Event::CData(_) if depth == 0 => {
                return Err("CDATA outside the root element".to_string());
            }
            Event::Decl(ref decl) => check_encoding(decl)?,
            Event::Text(ref text) => {
                text.unescape()
                    .map_err(|e| format!("at byte {}: {}", reader.buffer_position(), e))?;
                events.push(event);
            }
            // declaration, comments, processing instructions, doctype
            _ if depth == 0 => {}
            _ => events.push(event),
        }
    }

    if depth != 0 {
        return Err("unexpected end of document: unclosed element".to_string());
    }
    if !seen_root {
        return Err("no root element".to_string());
    }

    Ok(events)
}

/// Attributes must be quoted, unique and reference only predefined entities.
fn check_attributes(element: &BytesStart<'_>) -> std::result::Result<(), String> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        attr.unescape_value().map_err(|e| e.to_string())?;
    }
    Ok(())
}

/// Manifests are read as UTF-8; US-ASCII is a subset and passes.
fn check_encoding(decl: &BytesDecl<'_>) -> std::result::Result<(), String> {
    let Some(encoding) = decl.encoding() else {
        return Ok(());
    };
    let encoding = encoding.map_err(|e| e.to_string())?;
    let name = String::from_utf8_lossy(&encoding).to_ascii_lowercase();
    match name.as_str() {
        "utf-8" | "utf8" | "us-ascii" | "ascii" => Ok(()),
        _ => Err(format!("unsupported encoding {:?}: only UTF-8 manifests are read", name)),
    }
}

fn serialize(events: Vec<Event<'_>>) -> std::result::Result<String, String> {
    let mut writer = Writer::new(Vec::new());
    for event in events {
        writer.write_event(event).map_err(|e| e.to_string())?;
    }
    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}
