// SPDX-License-Identifier: MIT OR Apache-2.0
//! Reading documents from XML.
//!
//! Includes (`<xi:include href="..."/>`) are resolved against the including
//! file's directory and then the include search path. Unresolved includes
//! are logged and skipped; they never fail the read.

use crate::document::{Document, DOCUMENT_CATEGORY};
use crate::element::Element;
use crate::error::DocumentError;
use crate::search_path::FileSearchPath;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Tag of include directives
pub const INCLUDE_TAG: &str = "xi:include";

const MEMORY_ORIGIN: &str = "<memory>";

/// Options controlling document reads
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Directories searched for include targets
    pub include_search_path: FileSearchPath,
    /// Whether include directives are followed
    pub skip_includes: bool,
}

/// Read a document from a file
pub fn read_document(path: &Path, options: &ReadOptions) -> Result<Document, DocumentError> {
    let mut visited = HashSet::new();
    read_file(path, options, &mut visited)
}

/// Read a document from an in-memory XML string
pub fn read_document_from_str(xml: &str, options: &ReadOptions) -> Result<Document, DocumentError> {
    let mut visited = HashSet::new();
    let (mut doc, includes) = parse(xml, MEMORY_ORIGIN)?;
    process_includes(&mut doc, &includes, None, options, &mut visited);
    Ok(doc)
}

fn read_file(
    path: &Path,
    options: &ReadOptions,
    visited: &mut HashSet<PathBuf>,
) -> Result<Document, DocumentError> {
    let content = std::fs::read_to_string(path).map_err(|source| DocumentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    visited.insert(path.canonicalize().unwrap_or_else(|_| path.to_path_buf()));

    let (mut doc, includes) = parse(&content, &path.display().to_string())?;
    doc.set_source_path(Some(path.to_path_buf()));
    process_includes(&mut doc, &includes, path.parent(), options, visited);
    tracing::debug!("Read document {:?} ({} elements)", path, doc.elements().len());
    Ok(doc)
}

fn process_includes(
    doc: &mut Document,
    includes: &[String],
    base_dir: Option<&Path>,
    options: &ReadOptions,
    visited: &mut HashSet<PathBuf>,
) {
    if options.skip_includes {
        return;
    }
    for href in includes {
        let local = base_dir
            .map(|dir| dir.join(href))
            .filter(|candidate| candidate.exists());
        let Some(resolved) = local.or_else(|| options.include_search_path.find_existing(href)) else {
            tracing::warn!("Include file not found: {}", href);
            continue;
        };

        let key = resolved.canonicalize().unwrap_or_else(|_| resolved.clone());
        if visited.contains(&key) {
            tracing::debug!("Skipping already included file {:?}", resolved);
            continue;
        }

        match read_file(&resolved, options, visited) {
            Ok(included) => {
                doc.import_library(&included);
            }
            Err(e) => tracing::warn!("Failed to read include {:?}: {}", resolved, e),
        }
    }
}

/// Parse XML text into a document plus the list of include targets
fn parse(xml: &str, origin: &str) -> Result<(Document, Vec<String>), DocumentError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut root: Option<Element> = None;
    let mut stack: Vec<Element> = Vec::new();
    let mut includes = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            DocumentError::parse(origin, format!("{} at byte {}", e, reader.buffer_position()))
        })?;

        match event {
            Event::Start(start) => {
                let elem = element_from_tag(&start, origin)?;
                if stack.is_empty() && root.is_some() {
                    return Err(DocumentError::parse(origin, "multiple root elements"));
                }
                stack.push(elem);
            }
            Event::Empty(start) => {
                let elem = element_from_tag(&start, origin)?;
                if elem.category() == INCLUDE_TAG {
                    match elem.non_empty_attribute("href") {
                        Some(href) => includes.push(href.to_string()),
                        None => tracing::warn!("Include directive without href in {}", origin),
                    }
                    continue;
                }
                match stack.last_mut() {
                    Some(parent) => {
                        parent.add_child(elem);
                    }
                    None if root.is_none() => root = Some(elem),
                    None => return Err(DocumentError::parse(origin, "multiple root elements")),
                }
            }
            Event::End(_) => {
                let Some(elem) = stack.pop() else {
                    return Err(DocumentError::parse(origin, "unbalanced end tag"));
                };
                match stack.last_mut() {
                    Some(parent) => {
                        parent.add_child(elem);
                    }
                    None => root = Some(elem),
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| DocumentError::parse(origin, e))?;
                if !text.trim().is_empty() {
                    return Err(DocumentError::parse(
                        origin,
                        format!("unexpected text content '{}'", text.trim()),
                    ));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(DocumentError::parse(origin, "unexpected end of input"));
    }
    let root = root.ok_or_else(|| DocumentError::parse(origin, "document is empty"))?;
    if root.category() != DOCUMENT_CATEGORY {
        return Err(DocumentError::parse(
            origin,
            format!("expected <{}> root, found <{}>", DOCUMENT_CATEGORY, root.category()),
        ));
    }
    Ok((Document::from_root(root), includes))
}

fn element_from_tag(start: &BytesStart<'_>, origin: &str) -> Result<Element, DocumentError> {
    let category = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| DocumentError::parse(origin, e))?
        .to_string();
    let mut elem = Element::new(category, "");

    for attr in start.attributes() {
        let attr = attr.map_err(|e| DocumentError::parse(origin, e))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| DocumentError::parse(origin, e))?
            .to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| DocumentError::parse(origin, e))?
            .into_owned();
        if key == "name" {
            elem.set_name(value);
        } else {
            elem.set_attribute(key, value);
        }
    }
    Ok(elem)
}
