//! Flatten overlays into PDF page content
//!
//! Each page that receives overlays gets its original content wrapped in
//! `q`/`Q` so that graphics state left behind by the page cannot leak into
//! the appended overlay streams. Signatures become RGB image XObjects with a
//! DeviceGray soft mask; text is drawn with the standard Helvetica font.

use crate::document;
use crate::error::{MeshPdfError, Result};
use crate::overlay::{Overlay, OverlayId, OverlayKind, OverlaySet, LINE_LEADING};
use crate::signature::SignatureImage;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashSet;
use std::io::Write;

const FONT_RESOURCE: &str = "MeshHelv";

/// Outcome of a save: overlays that made it into the file and those that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveReport {
    pub applied: usize,
    pub skipped: Vec<SkippedOverlay>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedOverlay {
    pub id: OverlayId,
    pub page: usize,
    pub reason: String,
}

/// Write every overlay into a copy of `pdf_bytes`.
///
/// An overlay that cannot be applied is logged and skipped; the rest of the
/// document is still written. With no overlays the input is returned as is.
pub fn apply_overlays(
    pdf_bytes: &[u8],
    overlays: &OverlaySet,
    render_scale: f64,
) -> Result<(Vec<u8>, SaveReport)> {
    let mut report = SaveReport::default();
    if overlays.is_empty() {
        return Ok((pdf_bytes.to_vec(), report));
    }

    let mut doc = document::load(pdf_bytes)?;
    let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let mut prepared: HashSet<ObjectId> = HashSet::new();

    for overlay in overlays.overlays() {
        match apply_single_overlay(&mut doc, &pages, &mut prepared, overlay, render_scale) {
            Ok(()) => report.applied += 1,
            Err(e) => {
                tracing::warn!(
                    "Skipping overlay {} on page {}: {}",
                    overlay.id,
                    overlay.page + 1,
                    e
                );
                report.skipped.push(SkippedOverlay {
                    id: overlay.id,
                    page: overlay.page,
                    reason: e.to_string(),
                });
            }
        }
    }

    doc.compress();
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| MeshPdfError::OperationError(e.to_string()))?;

    tracing::info!(
        "Flattened {} overlays ({} skipped)",
        report.applied,
        report.skipped.len()
    );
    Ok((output, report))
}

fn apply_single_overlay(
    doc: &mut Document,
    pages: &[ObjectId],
    prepared: &mut HashSet<ObjectId>,
    overlay: &Overlay,
    render_scale: f64,
) -> Result<()> {
    let page_id = *pages
        .get(overlay.page)
        .ok_or(MeshPdfError::PageOutOfRange {
            page: overlay.page,
            page_count: pages.len(),
        })?;
    let page_box = document::page_box(doc, page_id)?;
    let rect = overlay.pdf_rect(render_scale, page_box);

    if prepared.insert(page_id) {
        isolate_page_content(doc, page_id)?;
        materialize_resources(doc, page_id)?;
    }

    let mut content = match &overlay.kind {
        OverlayKind::Signature { image } => {
            let name = format!("MeshSig{}", overlay.id);
            let image_id = embed_signature(doc, image)?;
            resource_category(doc, page_id, b"XObject")?.set(name.as_bytes(), image_id);

            let placed = rect.fit_aspect(image.width() as f64, image.height() as f64);
            format!(
                "q {} 0 0 {} {} {} cm /{} Do Q\n",
                fmt_num(placed.width),
                fmt_num(placed.height),
                fmt_num(placed.x),
                fmt_num(placed.y),
                name
            )
            .into_bytes()
        }
        OverlayKind::Text { text, font_size } => {
            ensure_font(doc, page_id)?;
            let top = rect.y + rect.height;
            text_content(text, *font_size, rect.x, top - font_size)
        }
    };

    // Overlay geometry is in the rotated page's display space
    if let Some(m) = page_box.display_matrix() {
        let turn = m.iter().map(|&v| fmt_num(v)).collect::<Vec<_>>().join(" ");
        let mut wrapped = format!("q {} cm\n", turn).into_bytes();
        wrapped.append(&mut content);
        wrapped.extend_from_slice(b"Q\n");
        content = wrapped;
    }

    append_content(doc, page_id, content)
}

fn page_dict_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(page_id)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| MeshPdfError::OperationError(format!("page dictionary missing: {}", e)))
}

/// Replace the page's content with `q`, the original streams, then `Q`.
fn isolate_page_content(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let existing = doc.get_page_contents(page_id);
    let open_id = doc.add_object(Stream::new(dictionary! {}, b"q\n".to_vec()));
    let close_id = doc.add_object(Stream::new(dictionary! {}, b"\nQ\n".to_vec()));

    let mut contents = Vec::with_capacity(existing.len() + 2);
    contents.push(Object::Reference(open_id));
    contents.extend(existing.into_iter().map(Object::Reference));
    contents.push(Object::Reference(close_id));

    page_dict_mut(doc, page_id)?.set("Contents", Object::Array(contents));
    Ok(())
}

fn append_content(doc: &mut Document, page_id: ObjectId, content: Vec<u8>) -> Result<()> {
    let stream_id = doc.add_object(Stream::new(dictionary! {}, content));
    let page = page_dict_mut(doc, page_id)?;
    match page.get_mut(b"Contents") {
        Ok(Object::Array(ref mut arr)) => arr.push(Object::Reference(stream_id)),
        _ => page.set("Contents", Object::Array(vec![Object::Reference(stream_id)])),
    }
    Ok(())
}

/// Give the page its own direct Resources dictionary, copying inherited or shared ones.
fn materialize_resources(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut resources = effective_resources(doc, page_id)?;
    for category in [b"XObject".as_slice(), b"Font".as_slice()] {
        let resolved = match resources.get(category) {
            Ok(Object::Reference(id)) => Some(
                doc.get_object(*id)
                    .and_then(|o| o.as_dict())
                    .cloned()
                    .unwrap_or_default(),
            ),
            _ => None,
        };
        if let Some(dict) = resolved {
            resources.set(category, Object::Dictionary(dict));
        }
    }
    page_dict_mut(doc, page_id)?.set("Resources", Object::Dictionary(resources));
    Ok(())
}

fn effective_resources(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut current = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|e| MeshPdfError::OperationError(format!("page dictionary missing: {}", e)))?;

    for _ in 0..64 {
        if let Ok(resources) = current.get(b"Resources") {
            let dict = match resources {
                Object::Reference(id) => doc.get_object(*id).and_then(|o| o.as_dict()).ok(),
                Object::Dictionary(dict) => Some(dict),
                _ => None,
            };
            return Ok(dict.cloned().unwrap_or_default());
        }
        match current
            .get(b"Parent")
            .and_then(|p| p.as_reference())
            .and_then(|id| doc.get_object(id))
            .and_then(|o| o.as_dict())
        {
            Ok(parent) => current = parent,
            Err(_) => break,
        }
    }
    Ok(Dictionary::new())
}

fn resource_category<'a>(
    doc: &'a mut Document,
    page_id: ObjectId,
    category: &[u8],
) -> Result<&'a mut Dictionary> {
    let page = page_dict_mut(doc, page_id)?;
    let resources = page
        .get_mut(b"Resources")
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| MeshPdfError::OperationError(format!("page resources missing: {}", e)))?;
    if !matches!(resources.get(category), Ok(Object::Dictionary(_))) {
        resources.set(category, Object::Dictionary(Dictionary::new()));
    }
    resources
        .get_mut(category)
        .and_then(|o| o.as_dict_mut())
        .map_err(|e| MeshPdfError::OperationError(e.to_string()))
}

fn ensure_font(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    if resource_category(doc, page_id, b"Font")?.has(FONT_RESOURCE.as_bytes()) {
        return Ok(());
    }
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    resource_category(doc, page_id, b"Font")?.set(FONT_RESOURCE, font_id);
    Ok(())
}

fn embed_signature(doc: &mut Document, image: &SignatureImage) -> Result<ObjectId> {
    let (rgb, alpha) = image.split_alpha();
    let width = image.width() as i64;
    let height = image.height() as i64;

    let smask_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        },
        deflate(&alpha)?,
    ));

    Ok(doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
            "SMask" => smask_id,
        },
        deflate(&rgb)?,
    )))
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Text drawing operators, black Helvetica, first baseline at (`x`, `baseline`).
fn text_content(text: &str, font_size: f64, x: f64, baseline: f64) -> Vec<u8> {
    let mut out = format!(
        "q BT /{} {} Tf 0 0 0 rg {} TL {} {} Td\n",
        FONT_RESOURCE,
        fmt_num(font_size),
        fmt_num(font_size * LINE_LEADING),
        fmt_num(x),
        fmt_num(baseline)
    )
    .into_bytes();

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.extend_from_slice(b"T* ");
        }
        out.push(b'(');
        out.extend(encode_literal(line));
        out.extend_from_slice(b") Tj\n");
    }
    out.extend_from_slice(b"ET Q\n");
    out
}

/// Encode as WinAnsi for a literal string. Unmappable characters become `?`.
fn encode_literal(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let byte = match ch {
            '\t' => b' ',
            '\r' => continue,
            ' '..='~' => ch as u8,
            '\u{a0}'..='\u{ff}' => ch as u32 as u8,
            _ => win_ansi_extra(ch).unwrap_or(b'?'),
        };
        if matches!(byte, b'(' | b')' | b'\\') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out
}

/// WinAnsi codes 0x80..=0x9F, the range where it departs from Latin-1.
fn win_ansi_extra(ch: char) -> Option<u8> {
    let code = match ch {
        '\u{20ac}' => 0x80,
        '\u{201a}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201e}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02c6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017d}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201c}' => 0x93,
        '\u{201d}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02dc}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203a}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017e}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(code)
}

/// Compact decimal for content streams.
fn fmt_num(value: f64) -> String {
    let s = format!("{:.3}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}
