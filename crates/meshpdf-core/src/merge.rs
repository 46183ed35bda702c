//! PDF Merge algorithm
//!
//! Combines the selected PDFs, in selection order, into a single document.
//! Sources that cannot be opened are skipped rather than failing the merge.

use crate::document;
use crate::error::{MeshPdfError, Result};
use crate::tempfiles::TempFiles;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Page attributes a page may inherit from its ancestors in the page tree.
static INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

#[derive(Debug, Clone)]
pub struct NamedPdf {
    /// Display name, usually the file name.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl NamedPdf {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub bytes: Vec<u8>,
    pub total_pages: usize,
    pub merged: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// Merge PDFs into one
///
/// The algorithm:
/// 1. Load every source, skipping encrypted, unparsable and empty ones
/// 2. For each loaded source:
///    a. Copy inherited page attributes onto its pages
///    b. Offset all object IDs past the destination's highest ID
///    c. Import the remapped objects and collect its pages
/// 3. Point every page at a fresh page tree root and catalog
/// 4. Prune objects no longer reachable, compress, and serialize
pub fn merge_documents(sources: Vec<NamedPdf>) -> Result<MergeOutcome> {
    let mut skipped = Vec::new();
    let mut loaded = Vec::new();

    for source in sources {
        match document::load(&source.bytes) {
            Ok(doc) if doc.get_pages().is_empty() => {
                tracing::warn!("Skipping PDF without pages: {}", source.name);
                skipped.push(SkippedFile {
                    name: source.name,
                    reason: MeshPdfError::EmptyDocument.to_string(),
                });
            }
            Ok(doc) => loaded.push((source.name, doc)),
            Err(e) => {
                tracing::warn!("Skipping PDF {}: {}", source.name, e);
                skipped.push(SkippedFile {
                    name: source.name,
                    reason: e.to_string(),
                });
            }
        }
    }

    if loaded.is_empty() {
        return Err(MeshPdfError::NothingToMerge);
    }

    let mut dest = Document::with_version("1.7");
    let pages_id = dest.new_object_id();
    let mut dest_max_id = dest.max_id;
    let mut dest_page_refs = Vec::new();
    let mut merged = Vec::with_capacity(loaded.len());

    for (name, mut source) in loaded {
        let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
        flatten_inherited_attributes(&mut source, &source_pages);

        let id_offset = dest_max_id;

        let mut remapped_objects = BTreeMap::new();
        for (old_id, object) in source.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            remapped_objects.insert(new_id, remap_object_refs(object, id_offset));
        }
        dest.objects.extend(remapped_objects);

        for old_page_ref in source_pages {
            dest_page_refs.push((old_page_ref.0 + id_offset, old_page_ref.1));
        }

        dest_max_id = (source.max_id + id_offset).max(dest_max_id);
        dest.max_id = dest_max_id;
        merged.push(name);
    }

    let total_pages = dest_page_refs.len();
    build_page_tree(&mut dest, pages_id, &dest_page_refs)?;

    let pruned = dest.prune_objects();
    dest.compress();

    let mut bytes = Vec::new();
    dest.save_to(&mut bytes)
        .map_err(|e| MeshPdfError::OperationError(format!("Failed to save merged PDF: {}", e)))?;

    tracing::info!(
        "Merged {} files ({} pages, {} skipped, {} unused objects dropped)",
        merged.len(),
        total_pages,
        skipped.len(),
        pruned.len()
    );

    Ok(MergeOutcome {
        bytes,
        total_pages,
        merged,
        skipped,
    })
}

/// Read `paths`, merge them and write the result to a tracked temp file.
pub fn combine_files(
    paths: &[PathBuf],
    temp_files: &mut TempFiles,
    prefix: &str,
) -> Result<(PathBuf, MergeOutcome)> {
    let mut sources = Vec::with_capacity(paths.len());
    let mut unreadable = Vec::new();

    for path in paths {
        let name = display_name(path);
        match std::fs::read(path) {
            Ok(bytes) => sources.push(NamedPdf::new(name, bytes)),
            Err(e) => {
                tracing::warn!("Skipping unreadable file {}: {}", path.display(), e);
                unreadable.push(SkippedFile {
                    name,
                    reason: e.to_string(),
                });
            }
        }
    }

    let mut outcome = merge_documents(sources)?;
    outcome.skipped.extend(unreadable);
    let path = temp_files.create(prefix, &outcome.bytes)?;
    Ok((path, outcome))
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(remap_dict(dict, offset)),
        Object::Stream(mut stream) => {
            stream.dict = remap_dict(stream.dict, offset);
            Object::Stream(stream)
        }
        other => other,
    }
}

fn remap_dict(mut dict: Dictionary, offset: u32) -> Dictionary {
    for (_, value) in dict.iter_mut() {
        let owned = std::mem::replace(value, Object::Null);
        *value = remap_object_refs(owned, offset);
    }
    dict
}

/// Copy inheritable attributes from ancestors onto each page, so the page no
/// longer depends on the source page tree.
fn flatten_inherited_attributes(doc: &mut Document, page_ids: &[ObjectId]) {
    for &page_id in page_ids {
        let page = doc.get_object(page_id).and_then(|o| o.as_dict());
        let inherited: Vec<(&[u8], Object)> = match page {
            Ok(page) => INHERITABLE
                .iter()
                .filter(|key| !page.has(key))
                .filter_map(|key| inherited_value(doc, page, key).map(|v| (*key, v)))
                .collect(),
            Err(_) => continue,
        };
        if let Ok(page) = doc.get_object_mut(page_id).and_then(|o| o.as_dict_mut()) {
            for (key, value) in inherited {
                page.set(key, value);
            }
        }
    }
}

fn inherited_value(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = page;
    for _ in 0..64 {
        current = current
            .get(b"Parent")
            .and_then(|p| p.as_reference())
            .and_then(|id| doc.get_object(id))
            .and_then(|o| o.as_dict())
            .ok()?;
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
    }
    None
}

/// Install a new Pages root holding `page_refs` and a catalog pointing at it.
fn build_page_tree(doc: &mut Document, pages_id: ObjectId, page_refs: &[ObjectId]) -> Result<()> {
    for &page_id in page_refs {
        let page = doc
            .get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .map_err(|e| MeshPdfError::OperationError(format!("Invalid page object: {}", e)))?;
        page.set("Parent", Object::Reference(pages_id));
    }

    let kids = page_refs
        .iter()
        .map(|&id| Object::Reference(id))
        .collect::<Vec<_>>();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_refs.len() as i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    Ok(())
}
