//! Native file dialogs and user-facing messages.
//!
//! File pickers use `rfd`; everything the user reads in a message box is
//! formatted here so the wording stays in one place.

use meshpdf_core::{MergeOutcome, SaveReport};
use std::path::{Path, PathBuf};

fn start_dir() -> PathBuf {
    dirs::document_dir().unwrap_or_else(|| PathBuf::from("."))
}

pub fn pick_pdf() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Open PDF File")
        .add_filter("PDF Files", &["pdf", "PDF"])
        .set_directory(start_dir())
        .pick_file()
}

/// Files come back in the order they were selected.
pub fn pick_pdfs_to_combine() -> Option<Vec<PathBuf>> {
    rfd::FileDialog::new()
        .set_title("Select PDFs to Combine")
        .add_filter("PDF Files", &["pdf", "PDF"])
        .set_directory(start_dir())
        .pick_files()
        .filter(|files| !files.is_empty())
}

pub fn pick_save_path(suggested_name: &str) -> Option<PathBuf> {
    rfd::FileDialog::new()
        .set_title("Save PDF File")
        .add_filter("PDF Files", &["pdf"])
        .set_directory(start_dir())
        .set_file_name(sanitize_filename(suggested_name))
        .save_file()
        .map(|path| ensure_pdf_extension(&path))
}

/// Ensures a path has the .pdf extension.
pub fn ensure_pdf_extension(path: &Path) -> PathBuf {
    let mut result = path.to_path_buf();
    if result
        .extension()
        .map_or(true, |ext| ext.to_str().map_or(true, |s| !s.eq_ignore_ascii_case("pdf")))
    {
        let mut name = result.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".pdf");
        result.set_file_name(name);
    }
    result
}

/// Removes path separators and characters most file systems refuse.
pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter_map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => Some('_'),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();
    let trimmed = sanitized.trim().trim_matches('.');
    if trimmed.is_empty() {
        "document.pdf".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `contract.pdf` -> `contract_signed.pdf`
pub fn suggested_save_name(document_name: &str) -> String {
    let stem = document_name
        .strip_suffix(".pdf")
        .or_else(|| document_name.strip_suffix(".PDF"))
        .unwrap_or(document_name);
    format!("{}_signed.pdf", stem)
}

pub fn format_open_error(error: impl std::fmt::Display) -> String {
    format!("Failed to open PDF: {}", error)
}

pub fn format_save_error(error: impl std::fmt::Display) -> String {
    format!("Error saving PDF: {}", error)
}

pub fn format_combine_error(error: impl std::fmt::Display) -> String {
    format!("Failed to combine PDFs: {}", error)
}

pub fn format_print_error(error: impl std::fmt::Display) -> String {
    format!("Failed to print PDF: {}", error)
}

pub fn format_save_success(report: &SaveReport) -> String {
    if report.skipped.is_empty() {
        "PDF saved successfully!".to_string()
    } else {
        let mut message = format!(
            "PDF saved, but {} of {} additions could not be written:",
            report.skipped.len(),
            report.applied + report.skipped.len()
        );
        for skipped in &report.skipped {
            message.push_str(&format!("\n• page {}: {}", skipped.page + 1, skipped.reason));
        }
        message
    }
}

pub fn format_combine_success(requested: usize, outcome: &MergeOutcome) -> String {
    let mut message = format!(
        "Combined {} PDFs successfully! ({} pages)\n\
         You can now edit, save, or print the combined PDF.",
        outcome.merged.len(),
        outcome.total_pages
    );
    if !outcome.skipped.is_empty() {
        message.push_str(&format!(
            "\n\nSkipped {} of {} files:",
            outcome.skipped.len(),
            requested
        ));
        for skipped in &outcome.skipped {
            message.push_str(&format!("\n• {}", skipped.name));
        }
    }
    message
}

pub const SIGNATURE_HINT: &str = "Click where you want to place the signature.\n\
    • Drag to reposition\n\
    • Right-click to delete\n\
    • Double-click to edit";

pub const TEXT_HINT: &str = "Click where you want to add text.\n\
    • Drag to reposition\n\
    • Right-click to delete\n\
    • Double-click to edit";

pub const UNSAVED_CHANGES: &str =
    "Current PDF has unsaved modifications. Combining will discard them. Continue?";

pub const NO_MODIFICATIONS: &str =
    "No modifications found. Do you want to save a copy of the original PDF?";

#[cfg(test)]
mod tests {
    use super::*;
    use meshpdf_core::apply::SkippedOverlay;
    use meshpdf_core::merge::SkippedFile;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_ensure_pdf_extension() {
        assert_eq!(
            ensure_pdf_extension(Path::new("/tmp/out")),
            PathBuf::from("/tmp/out.pdf")
        );
        assert_eq!(
            ensure_pdf_extension(Path::new("/tmp/out.PDF")),
            PathBuf::from("/tmp/out.PDF")
        );
        assert_eq!(
            ensure_pdf_extension(Path::new("/tmp/report.v2")),
            PathBuf::from("/tmp/report.v2.pdf")
        );
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a/b:c.pdf"), "a_b_c.pdf");
        assert_eq!(sanitize_filename("  ..  "), "document.pdf");
        assert_eq!(sanitize_filename("ok\u{7}.pdf"), "ok.pdf");
    }

    #[test]
    fn test_suggested_save_name() {
        assert_eq!(suggested_save_name("lease.pdf"), "lease_signed.pdf");
        assert_eq!(suggested_save_name("Combined (2 files)"), "Combined (2 files)_signed.pdf");
    }

    #[test]
    fn test_save_message_lists_skipped() {
        let report = SaveReport {
            applied: 2,
            skipped: vec![SkippedOverlay {
                id: 4,
                page: 2,
                reason: "boom".into(),
            }],
        };
        let message = format_save_success(&report);
        assert!(message.contains("1 of 3"));
        assert!(message.contains("page 3: boom"));
        assert_eq!(format_save_success(&SaveReport::default()), "PDF saved successfully!");
    }

    #[test]
    fn test_combine_message_lists_skipped_files() {
        let outcome = MergeOutcome {
            bytes: Vec::new(),
            total_pages: 4,
            merged: vec!["a.pdf".into(), "b.pdf".into()],
            skipped: vec![SkippedFile {
                name: "locked.pdf".into(),
                reason: "PDF is encrypted".into(),
            }],
        };
        let message = format_combine_success(3, &outcome);
        assert!(message.starts_with("Combined 2 PDFs successfully! (4 pages)"));
        assert!(message.contains("Skipped 1 of 3 files"));
        assert!(message.contains("• locked.pdf"));
    }

    proptest! {
        #[test]
        fn sanitized_names_are_usable(name in ".{0,40}") {
            let sanitized = sanitize_filename(&name);
            prop_assert!(!sanitized.is_empty());
            prop_assert!(!sanitized.contains('/'));
            prop_assert!(!sanitized.contains('\\'));
            prop_assert!(!sanitized.chars().any(|c| c.is_control()));
        }
    }
}
