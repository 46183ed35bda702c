//! End-to-end editing: open, sign, annotate, zoom, save, reopen

mod common;

use common::{letter_pdf, masked_image_count, page_text};
use lopdf::Document;
use meshpdf_core::{
    ClickOutcome, EditorConfig, EditorSession, PenStyle, ScreenPoint, SignaturePad,
};
use pretty_assertions::assert_eq;

fn drawn_signature() -> meshpdf_core::SignatureImage {
    let mut pad = SignaturePad::new(380, 200, PenStyle::default());
    pad.begin_stroke(ScreenPoint::new(20.0, 150.0));
    for i in 1..=30 {
        pad.extend_stroke(ScreenPoint::new(20.0 + i as f64 * 10.0, 150.0 - (i % 7) as f64 * 12.0));
    }
    pad.end_stroke();
    pad.finish().unwrap()
}

fn open_session(pages: u32) -> (tempfile::TempDir, EditorSession) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contract.pdf");
    std::fs::write(&path, letter_pdf(pages, "Contract")).unwrap();

    let mut session = EditorSession::new(EditorConfig::default());
    session.open(&path).unwrap();
    (dir, session)
}

#[test]
fn saved_document_keeps_pages_and_gains_overlays() {
    let (dir, mut session) = open_session(3);

    session.enable_signature_mode(drawn_signature()).unwrap();
    let placed = session.click(2, ScreenPoint::new(600.0, 1300.0)).unwrap();
    assert!(matches!(placed, ClickOutcome::SignaturePlaced(_)));

    session.enable_signature_mode(drawn_signature()).unwrap();
    session.click(0, ScreenPoint::new(300.0, 300.0)).unwrap();

    session.enable_text_mode().unwrap();
    let ClickOutcome::TextRequested { page, point } =
        session.click(1, ScreenPoint::new(100.0, 100.0)).unwrap()
    else {
        panic!("text mode should request text");
    };
    session.place_text(page, point, "Signed in Lisbon").unwrap();

    let out = dir.path().join("signed.pdf");
    let report = session.save_to(&out).unwrap();
    assert_eq!(report.applied, 3);
    assert!(report.skipped.is_empty());

    let doc = Document::load(&out).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    assert_eq!(masked_image_count(&doc), 2);

    let page_two = page_text(&doc, 2);
    assert!(page_two.contains("Contract-Page-2"));
    assert!(page_two.contains("(Signed in Lisbon) Tj"));
    assert!(page_text(&doc, 3).contains(" Do Q"));
}

#[test]
fn zoom_does_not_move_overlays_in_saved_output() {
    let (dir, mut session) = open_session(1);
    session.enable_signature_mode(drawn_signature()).unwrap();
    session.click(0, ScreenPoint::new(500.0, 500.0)).unwrap();

    let at_100 = dir.path().join("at_100.pdf");
    session.save_to(&at_100).unwrap();

    session.zoom_in();
    session.zoom_in();
    session.zoom_out();
    let zoomed = dir.path().join("zoomed.pdf");
    session.save_to(&zoomed).unwrap();

    let placement = |path: &std::path::Path| -> Vec<f64> {
        let doc = Document::load(path).unwrap();
        let text = page_text(&doc, 1);
        let line = text
            .lines()
            .find(|l| l.contains("/MeshSig"))
            .unwrap()
            .to_string();
        line.split_whitespace()
            .skip(1)
            .take(6)
            .map(|n| n.parse::<f64>().unwrap())
            .collect()
    };

    let a = placement(&at_100);
    let b = placement(&zoomed);
    assert_eq!(a.len(), 6);
    for (x, y) in a.iter().zip(&b) {
        assert!((x - y).abs() < 0.01, "{:?} vs {:?}", a, b);
    }
}

#[test]
fn combine_then_sign_then_close_cleans_up() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");
    let broken = dir.path().join("broken.pdf");
    std::fs::write(&first, letter_pdf(2, "First")).unwrap();
    std::fs::write(&second, letter_pdf(1, "Second")).unwrap();
    std::fs::write(&broken, b"%PDF-1.4 truncated").unwrap();

    let mut session = EditorSession::default();
    let outcome = session.combine(&[first, broken, second]).unwrap();
    assert_eq!(outcome.total_pages, 3);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].name, "broken.pdf");

    session.enable_signature_mode(drawn_signature()).unwrap();
    session.click(2, ScreenPoint::new(400.0, 400.0)).unwrap();
    let print_copy = session.write_print_copy().unwrap();
    let merged = session.document_path().unwrap().to_path_buf();

    let doc = Document::load(&print_copy).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    assert!(page_text(&doc, 3).contains("Second-Page-1"));
    assert_eq!(masked_image_count(&doc), 1);

    session.close();
    assert!(!print_copy.exists());
    assert!(!merged.exists());
}
