//! Error types for the invoice print library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the invoice print library
#[derive(Error, Debug)]
pub enum Error {
    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding/encoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// File not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Invalid PDF (no pages)
    #[error("PDF has no pages: {0}")]
    EmptyPdf(String),

    /// The PDF rendering library is missing or could not be loaded
    #[error("PDF rendering is unavailable: {0}")]
    RendererUnavailable(String),

    /// A single item could not be decoded into a preview
    #[error("Could not decode {name}: {reason}")]
    Decode { name: String, reason: String },

    /// A single PDF page could not be rasterized
    #[error("Could not render page {page} of {name}: {reason}")]
    Render {
        name: String,
        page: usize,
        reason: String,
    },

    /// One merge input was unreadable; the whole merge is aborted
    #[error("Merge aborted, {name} is unreadable: {reason}")]
    MergeInput { name: String, reason: String },

    /// Preview or print requested on an empty batch
    #[error("No invoices loaded")]
    EmptyBatch,

    /// Merge requested without any PDF in the batch
    #[error("No PDF files to merge")]
    NoPdfInputs,

    /// The print surface could not be opened
    #[error("Print surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// A completion key was resolved twice
    #[error("{0} was already resolved in this pass")]
    AlreadyResolved(String),

    /// A data URI could not be parsed
    #[error("Unsupported data URI: {0}")]
    UnsupportedDataUri(String),

    /// General error
    #[error("{0}")]
    General(String),
}
