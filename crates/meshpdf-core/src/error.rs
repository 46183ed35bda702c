use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshPdfError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF is encrypted: {0}")]
    Encrypted(String),

    #[error("PDF has no pages")]
    EmptyDocument,

    #[error("Please open a PDF file first.")]
    NoDocument,

    #[error("Page {page} is out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("Please draw your signature before clicking Done.")]
    EmptySignature,

    #[error("Text overlay must not be empty")]
    EmptyText,

    #[error("Invalid signature image: {0}")]
    ImageError(String),

    #[error("No valid pages to merge")]
    NothingToMerge,

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

pub type Result<T> = std::result::Result<T, MeshPdfError>;
