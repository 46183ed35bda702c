//! Document loading and page geometry

use crate::coords::{PageBox, LETTER};
use crate::error::{MeshPdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};

/// Summary of an opened document, enough to lay out its pages.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub page_boxes: Vec<PageBox>,
}

const ENCRYPT_KEY: &[u8] = b"/Encrypt";

/// Parse PDF bytes, refusing encrypted documents.
pub fn load(bytes: &[u8]) -> Result<Document> {
    let doc = Document::load_mem(bytes).map_err(|e| {
        if bytes.windows(ENCRYPT_KEY.len()).any(|w| w == ENCRYPT_KEY) {
            MeshPdfError::Encrypted(e.to_string())
        } else {
            MeshPdfError::ParseError(e.to_string())
        }
    })?;
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(MeshPdfError::Encrypted(
            "password-protected documents are not supported".into(),
        ));
    }
    Ok(doc)
}

/// Parse PDF bytes and return page count plus the visible box of every page
pub fn inspect(bytes: &[u8]) -> Result<DocumentInfo> {
    let doc = load(bytes)?;
    let page_boxes = page_boxes(&doc)?;
    if page_boxes.is_empty() {
        return Err(MeshPdfError::EmptyDocument);
    }
    Ok(DocumentInfo {
        page_count: page_boxes.len(),
        page_boxes,
    })
}

/// Page boxes in page order.
pub fn page_boxes(doc: &Document) -> Result<Vec<PageBox>> {
    doc.get_pages()
        .into_values()
        .map(|page_id| page_box(doc, page_id))
        .collect()
}

/// Visible box of a page: CropBox if set, otherwise MediaBox, both inheritable.
/// The page's inherited `/Rotate` is carried along.
pub fn page_box(doc: &Document, page_id: ObjectId) -> Result<PageBox> {
    let page = doc
        .get_object(page_id)
        .and_then(|o| o.as_dict())
        .map_err(|e| MeshPdfError::ParseError(format!("page dictionary missing: {}", e)))?;

    let visible = inherited(doc, page, b"CropBox", |obj| rect_from_object(doc, obj))
        .or_else(|| inherited(doc, page, b"MediaBox", |obj| rect_from_object(doc, obj)))
        .unwrap_or(LETTER);
    let rotation = inherited(doc, page, b"Rotate", |obj| obj_to_f64(doc, obj))
        .map(normalize_rotation)
        .unwrap_or(0);
    Ok(PageBox {
        rotation,
        ..visible
    })
}

/// Clamp `/Rotate` to 0..360; values that are not quarter turns are ignored.
fn normalize_rotation(degrees: f64) -> u16 {
    let degrees = degrees.round() as i64;
    if degrees % 90 != 0 {
        return 0;
    }
    degrees.rem_euclid(360) as u16
}

fn inherited<T>(
    doc: &Document,
    start: &Dictionary,
    key: &[u8],
    read: impl Fn(&Object) -> Option<T>,
) -> Option<T> {
    let mut current = Some(start);
    // Page trees are shallow; the bound only guards against Parent cycles.
    for _ in 0..64 {
        let dict = current?;
        if let Some(found) = dict.get(key).ok().and_then(&read) {
            return Some(found);
        }
        current = dict
            .get(b"Parent")
            .and_then(|p| p.as_reference())
            .and_then(|id| doc.get_object(id))
            .and_then(|o| o.as_dict())
            .ok();
    }
    None
}

fn rect_from_object(doc: &Document, obj: &Object) -> Option<PageBox> {
    let resolved = match obj {
        Object::Reference(id) => doc.get_object(*id).ok()?,
        other => other,
    };
    let arr = resolved.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let llx = obj_to_f64(doc, &arr[0])?;
    let lly = obj_to_f64(doc, &arr[1])?;
    let urx = obj_to_f64(doc, &arr[2])?;
    let ury = obj_to_f64(doc, &arr[3])?;
    let width = (urx - llx).abs();
    let height = (ury - lly).abs();
    if width == 0.0 || height == 0.0 {
        return None;
    }
    Some(PageBox {
        x: llx.min(urx),
        y: lly.min(ury),
        width,
        height,
        rotation: 0,
    })
}

pub(crate) fn obj_to_f64(doc: &Document, obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some((*f).into()),
        Object::Reference(id) => doc
            .get_object(*id)
            .ok()
            .and_then(|o| match o {
                Object::Integer(i) => Some(*i as f64),
                Object::Real(f) => Some((*f).into()),
                _ => None,
            }),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{self, create_test_pdf};
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_inspect_reports_pages_and_boxes() {
        let pdf = create_test_pdf(3, "Doc", (612, 792));
        let info = inspect(&pdf).unwrap();
        assert_eq!(info.page_count, 3);
        assert!(info.page_boxes.iter().all(|b| *b == LETTER));
    }

    #[test]
    fn test_inspect_rejects_garbage() {
        let result = inspect(b"not a pdf at all");
        assert!(matches!(result, Err(MeshPdfError::ParseError(_))));
    }

    #[test]
    fn test_inspect_rejects_encrypted() {
        let pdf = test_support::mark_encrypted(&create_test_pdf(1, "Locked", (612, 792)));
        let result = inspect(&pdf);
        assert!(matches!(result, Err(MeshPdfError::Encrypted(_))), "{:?}", result);
    }

    #[test]
    fn test_crop_box_wins_over_media_box() {
        let pdf = create_test_pdf(1, "Crop", (612, 792));
        let mut doc = Document::load_mem(&pdf).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        doc.get_object_mut(page_id)
            .and_then(|o| o.as_dict_mut())
            .unwrap()
            .set(
                "CropBox",
                Object::Array(vec![10.into(), 20.into(), 310.into(), 420.into()]),
            );

        let page_box = page_box(&doc, page_id).unwrap();
        assert_eq!(
            page_box,
            PageBox {
                x: 10.0,
                y: 20.0,
                width: 300.0,
                height: 400.0,
                rotation: 0,
            }
        );
    }

    #[test]
    fn test_rotation_is_read_and_normalized() {
        let pdf = test_support::rotate_pages(&create_test_pdf(2, "Turned", (612, 792)), -90);
        let info = inspect(&pdf).unwrap();
        assert!(info.page_boxes.iter().all(|b| b.rotation == 270));
        assert_eq!(info.page_boxes[0].display_box().width, 792.0);

        assert_eq!(normalize_rotation(450.0), 90);
        assert_eq!(normalize_rotation(45.0), 0);
    }

    #[test]
    fn test_rotation_inherited_from_parent() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "Rotate" => 180,
            }),
        );
        assert_eq!(page_box(&doc, page_id).unwrap().rotation, 180);
    }

    #[test]
    fn test_media_box_inherited_from_parent() {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::Reference(page_id)],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );

        let page_box = page_box(&doc, page_id).unwrap();
        assert_eq!(page_box.width, 595.0);
        assert_eq!(page_box.height, 842.0);
    }

    #[test]
    fn test_missing_box_falls_back_to_letter() {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        assert_eq!(page_box(&doc, page_id).unwrap(), LETTER);
    }
}
