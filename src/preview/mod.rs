//! Preview production for invoice items
//!
//! Images are decoded directly. PDFs are parsed into a document handle and
//! page 1 is rasterized through a [`PageRasterizer`] at a fixed
//! oversampling factor, then stored as PNG.

pub mod raster;
#[cfg(feature = "pdfium")]
pub mod pdfium;

use std::sync::Arc;

use image::DynamicImage;

use crate::error::{Error, Result};
use crate::intake::{InvoiceItem, ItemId};
use crate::pdf::{inspect_bytes, PdfMetadata};

pub use raster::{placeholder_data_uri, PreviewImage};
#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRasterizer;

/// Nominal render scale for PDF previews
pub const BASE_RENDER_SCALE: f32 = 3.0;
/// Lower bound applied to the device pixel ratio
pub const MIN_PIXEL_RATIO: f32 = 2.0;

/// Renders single PDF pages to rasters
pub trait PageRasterizer: Send + Sync {
    /// Render `page_index` (zero based) at `scale` times its nominal size.
    /// Errors may leave the item name empty; the producer fills it in.
    fn rasterize(&self, pdf: &[u8], page_index: u16, scale: f32) -> Result<DynamicImage>;
}

/// Preview rendering options
#[derive(Debug, Clone, Copy)]
pub struct PreviewOptions {
    /// Pixel ratio of the display the preview is for
    pub device_pixel_ratio: f32,
    pub base_scale: f32,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            device_pixel_ratio: 1.0,
            base_scale: BASE_RENDER_SCALE,
        }
    }
}

impl PreviewOptions {
    /// Effective render scale, never below `base_scale * MIN_PIXEL_RATIO`
    pub fn render_scale(&self) -> f32 {
        self.base_scale * self.device_pixel_ratio.max(MIN_PIXEL_RATIO)
    }
}

/// How a single item got resolved in a pass
#[derive(Debug, Clone)]
pub enum Resolution {
    /// The item already had a preview
    Cached,
    /// A fresh decode or render succeeded
    Decoded {
        preview: PreviewImage,
        document: Option<PdfMetadata>,
    },
    /// Decode or render failed; a parsed document handle is still kept
    Failed {
        reason: String,
        document: Option<PdfMetadata>,
    },
    /// Nothing can produce a preview for this item
    NoSource,
}

impl Resolution {
    pub fn has_preview(&self) -> bool {
        matches!(self, Resolution::Cached | Resolution::Decoded { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Image,
    Pdf,
    Other,
}

/// Snapshot of the item data a decode needs, detached from the batch
#[derive(Debug, Clone)]
pub struct PreviewJob {
    pub id: ItemId,
    pub name: String,
    mime_type: String,
    bytes: Arc<[u8]>,
    kind: SourceKind,
}

impl PreviewJob {
    pub fn for_item(item: &InvoiceItem) -> Self {
        let kind = if item.is_image() {
            SourceKind::Image
        } else if item.is_pdf() {
            SourceKind::Pdf
        } else {
            SourceKind::Other
        };
        Self {
            id: item.id,
            name: item.name.clone(),
            mime_type: item.mime_type.clone(),
            bytes: Arc::clone(&item.raw),
            kind,
        }
    }

    pub fn needs_rasterizer(&self) -> bool {
        self.kind == SourceKind::Pdf
    }
}

/// Produces previews, optionally with a PDF rasterizer attached
#[derive(Clone, Default)]
pub struct PreviewProducer {
    rasterizer: Option<Arc<dyn PageRasterizer>>,
    options: PreviewOptions,
}

impl PreviewProducer {
    pub fn new(options: PreviewOptions) -> Self {
        Self {
            rasterizer: None,
            options,
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn options(&self) -> &PreviewOptions {
        &self.options
    }

    pub fn can_render_pdf(&self) -> bool {
        self.rasterizer.is_some()
    }

    /// Decode one job. Blocking; run it off the async thread.
    pub fn produce(&self, job: &PreviewJob) -> Resolution {
        match job.kind {
            SourceKind::Image => match PreviewImage::from_encoded(&job.mime_type, Arc::clone(&job.bytes)) {
                Ok(preview) => Resolution::Decoded {
                    preview,
                    document: None,
                },
                Err(e) => {
                    let err = Error::Decode {
                        name: job.name.clone(),
                        reason: e.to_string(),
                    };
                    log::warn!("{}", err);
                    Resolution::Failed {
                        reason: err.to_string(),
                        document: None,
                    }
                }
            },
            SourceKind::Pdf => self.produce_pdf(job),
            SourceKind::Other => Resolution::NoSource,
        }
    }

    fn produce_pdf(&self, job: &PreviewJob) -> Resolution {
        let document = match inspect_bytes(&job.name, &job.bytes) {
            Ok(document) => document,
            Err(e) => {
                let err = Error::Decode {
                    name: job.name.clone(),
                    reason: e.to_string(),
                };
                log::warn!("{}", err);
                return Resolution::Failed {
                    reason: err.to_string(),
                    document: None,
                };
            }
        };
        log::debug!("Loaded {}, {} pages", job.name, document.page_count);

        let Some(rasterizer) = &self.rasterizer else {
            return Resolution::Failed {
                reason: Error::RendererUnavailable("no rasterizer configured".to_string()).to_string(),
                document: Some(document),
            };
        };

        let scale = self.options.render_scale();
        let rendered = rasterizer
            .rasterize(&job.bytes, 0, scale)
            .and_then(|raster| PreviewImage::from_raster(&raster))
            .map_err(|e| match e {
                Error::Render { page, reason, .. } => Error::Render {
                    name: job.name.clone(),
                    page,
                    reason,
                },
                other => Error::Render {
                    name: job.name.clone(),
                    page: 1,
                    reason: other.to_string(),
                },
            });

        match rendered {
            Ok(preview) => {
                log::debug!(
                    "Rendered {} page 1 at {:.1}x ({}x{})",
                    job.name,
                    scale,
                    preview.width(),
                    preview.height()
                );
                Resolution::Decoded {
                    preview,
                    document: Some(document),
                }
            }
            Err(e) => {
                log::warn!("{}", e);
                Resolution::Failed {
                    reason: e.to_string(),
                    document: Some(document),
                }
            }
        }
    }

    /// Make sure an item has a preview, producing it if needed.
    ///
    /// An item that already has one is left alone and the same preview is
    /// returned. Blocking.
    pub fn ensure_preview<'a>(&self, item: &'a mut InvoiceItem) -> Option<&'a PreviewImage> {
        if item.preview().is_none() {
            match self.produce(&PreviewJob::for_item(item)) {
                Resolution::Decoded { preview, document } => {
                    if let Some(document) = document {
                        item.attach_document(document);
                    }
                    item.attach_preview(preview);
                }
                Resolution::Failed {
                    document: Some(document),
                    ..
                } => item.attach_document(document),
                _ => {}
            }
        }
        item.preview()
    }
}
