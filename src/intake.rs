//! File intake, workflow classification and the session batch

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::pdf::PdfMetadata;
use crate::preview::PreviewImage;

pub const PDF_MIME: &str = "application/pdf";
pub const ODF_MIME: &str = "application/vnd.oasis.opendocument.formula";
const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// A file as submitted by the user
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

impl SourceFile {
    /// Build a source file with an explicit MIME type
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size: bytes.len() as u64,
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Build a source file, sniffing the MIME type from content and name
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = detect_mime(&name, &bytes);
        Self::new(name, mime_type, bytes)
    }

    /// Read a file from disk
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::from_bytes(name, bytes))
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME
    }

    pub fn is_odf(&self) -> bool {
        self.mime_type == ODF_MIME || self.name.to_lowercase().ends_with(".odf")
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }
}

/// Detect a MIME type from magic bytes, falling back to the file extension
pub fn detect_mime(name: &str, bytes: &[u8]) -> String {
    if let Some(kind) = infer::get(bytes) {
        let mime = kind.mime_type();
        // ODF formula documents are zip containers; the extension decides
        if mime != "application/zip" {
            return mime.to_string();
        }
    }

    let extension = Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => PDF_MIME,
        "odf" => ODF_MIME,
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        _ => OCTET_STREAM_MIME,
    }
    .to_string()
}

/// Batch-wide workflow classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowType {
    #[default]
    None,
    Pdf,
    Odf,
    Image,
}

/// Follow-up action a workflow triggers automatically after intake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoAction {
    MergePdfs,
}

impl WorkflowType {
    /// Classify a file set: any PDF wins, then any ODF, otherwise image
    pub fn classify(files: &[SourceFile]) -> Self {
        if files.is_empty() {
            WorkflowType::None
        } else if files.iter().any(SourceFile::is_pdf) {
            WorkflowType::Pdf
        } else if files.iter().any(SourceFile::is_odf) {
            WorkflowType::Odf
        } else {
            WorkflowType::Image
        }
    }

    pub fn auto_action(self) -> Option<AutoAction> {
        match self {
            WorkflowType::Pdf => Some(AutoAction::MergePdfs),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowType::None => "none",
            WorkflowType::Pdf => "pdf",
            WorkflowType::Odf => "odf",
            WorkflowType::Image => "image",
        }
    }
}

impl fmt::Display for WorkflowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier assigned to an invoice at intake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One uploaded invoice and its derived state
#[derive(Debug, Clone)]
pub struct InvoiceItem {
    pub id: ItemId,
    pub name: String,
    pub size: u64,
    pub mime_type: String,
    pub raw: Arc<[u8]>,
    preview: Option<PreviewImage>,
    document: Option<PdfMetadata>,
}

impl InvoiceItem {
    fn new(id: ItemId, file: SourceFile) -> Self {
        Self {
            id,
            name: file.name,
            size: file.size,
            mime_type: file.mime_type,
            raw: file.bytes,
            preview: None,
            document: None,
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.mime_type == PDF_MIME
    }

    pub fn is_image(&self) -> bool {
        self.mime_type.starts_with("image/")
    }

    pub fn preview(&self) -> Option<&PreviewImage> {
        self.preview.as_ref()
    }

    /// Parsed document handle, only for PDFs that parsed
    pub fn document(&self) -> Option<&PdfMetadata> {
        self.document.as_ref()
    }

    pub fn page_count(&self) -> Option<usize> {
        self.document.as_ref().map(|doc| doc.page_count)
    }

    /// Attach a preview; an existing preview is kept and returned instead
    pub fn attach_preview(&mut self, preview: PreviewImage) -> &PreviewImage {
        self.preview.get_or_insert(preview)
    }

    pub fn attach_document(&mut self, document: PdfMetadata) {
        if self.document.is_none() {
            self.document = Some(document);
        }
    }
}

/// Session-scoped set of invoices
///
/// Replaced wholesale on each submission. Ids come from a counter seeded
/// with the wall clock so they stay unique across replacements.
#[derive(Debug)]
pub struct Batch {
    items: Vec<InvoiceItem>,
    workflow: WorkflowType,
    next_id: u64,
}

impl Default for Batch {
    fn default() -> Self {
        Self::new()
    }
}

impl Batch {
    pub fn new() -> Self {
        let seed = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self {
            items: Vec::new(),
            workflow: WorkflowType::None,
            next_id: seed,
        }
    }

    /// Replace the batch with a new set of files
    ///
    /// An empty set leaves the current batch untouched.
    pub fn replace(&mut self, files: Vec<SourceFile>) -> WorkflowType {
        if files.is_empty() {
            log::debug!("No files submitted, keeping current batch");
            return self.workflow;
        }

        self.workflow = WorkflowType::classify(&files);
        self.items.clear();

        for file in files {
            let id = ItemId(self.next_id);
            self.next_id += 1;
            log::debug!(
                "Accepted {} {} ({} bytes, {})",
                id, file.name, file.size, file.mime_type
            );
            self.items.push(InvoiceItem::new(id, file));
        }

        log::info!(
            "Batch of {} files, workflow {}",
            self.items.len(),
            self.workflow
        );
        self.workflow
    }

    /// Remove one item, keeping the order of the rest
    pub fn remove(&mut self, id: ItemId) -> Option<InvoiceItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        let removed = self.items.remove(index);
        log::debug!("Removed {}, {} items left", id, self.items.len());
        Some(removed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.workflow = WorkflowType::None;
    }

    pub fn workflow(&self) -> WorkflowType {
        self.workflow
    }

    pub fn items(&self) -> &[InvoiceItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, id: ItemId) -> Option<&InvoiceItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut InvoiceItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// PDF items in batch order
    pub fn pdf_items(&self) -> impl Iterator<Item = &InvoiceItem> {
        self.items.iter().filter(|item| item.is_pdf())
    }
}
