//! PDF manipulation module

pub mod merge;
pub mod metadata;

// Re-export commonly used items
pub use merge::{merge_batch, merge_documents, merge_pdfs, MergeInput, MergeOptions, MergedPdf};
pub use metadata::{count_pages, extract_metadata, inspect_bytes, PdfMetadata};
