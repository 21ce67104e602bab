//! Invoice Print Library
//!
//! Lays out invoice files (images, PDFs, ODF formula documents) on A4 pages
//! for preview and printing. This library provides functionality to:
//! - Classify a batch of files into a workflow (pdf / odf / image)
//! - Produce previews asynchronously, with an exactly-once completion barrier
//! - Pick a layout (1, 2 or 4 invoices per page) and paginate
//! - Export the print layout as a self-contained HTML document
//! - Merge the PDF invoices into one PDF
//!
//! # Example
//!
//! ```no_run
//! use invoice_print::intake::{Batch, SourceFile};
//! use invoice_print::layout::PassMode;
//! use invoice_print::preview::{PreviewOptions, PreviewProducer};
//! use invoice_print::{compose, pass};
//! use std::path::Path;
//!
//! # async fn run() -> invoice_print::Result<()> {
//! let mut batch = Batch::new();
//! batch.replace(vec![SourceFile::from_path(Path::new("receipt.png"))?]);
//!
//! let producer = PreviewProducer::new(PreviewOptions::default());
//! pass::run_preview_pass(&mut batch, &producer).await?;
//!
//! let doc = compose::compose(&batch, PassMode::Preview).expect("non-empty batch");
//! assert_eq!(doc.pages.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod completion;
pub mod compose;
pub mod error;
pub mod intake;
pub mod layout;
pub mod pass;
pub mod pdf;
pub mod preview;
pub mod print;

// Re-export commonly used items
pub use error::{Error, Result};
pub use intake::{Batch, InvoiceItem, ItemId, SourceFile, WorkflowType};
pub use layout::{LayoutKind, Orientation, PassMode};
