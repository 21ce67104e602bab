//! PDF page rasterization backed by pdfium

use std::sync::Mutex;

use image::{DynamicImage, RgbaImage};
use pdfium_render::prelude::*;

use super::PageRasterizer;
use crate::error::{Error, Result};

/// pdfium keeps process-wide state; every bind and render goes through here
static PDFIUM_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` while holding the pdfium lock
fn serialized<T>(f: impl FnOnce() -> T) -> T {
    let _guard = PDFIUM_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f()
}

/// Initialize Pdfium, trying the vendored library first, then falling back to system
fn init_pdfium() -> std::result::Result<Pdfium, PdfiumError> {
    let vendor_path = std::env::current_dir().ok().and_then(|mut p| {
        p.push("vendor/pdfium/lib");
        if p.exists() { Some(p) } else { None }
    });

    if let Some(vendor_path) = vendor_path {
        if let Ok(binding) =
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&vendor_path))
        {
            return Ok(Pdfium::new(binding));
        }
    }

    Pdfium::bind_to_system_library().map(Pdfium::new)
}

/// Rasterizer that binds pdfium per call, so it can run on any blocking thread
#[derive(Debug, Clone, Copy)]
pub struct PdfiumRasterizer;

impl PdfiumRasterizer {
    /// Check that pdfium can be loaded at all.
    ///
    /// Renders from any number of threads run one at a time.
    pub fn bind() -> Result<Self> {
        serialized(|| init_pdfium().map(drop)).map_err(|e| Error::RendererUnavailable(e.to_string()))?;
        Ok(Self)
    }
}

impl PageRasterizer for PdfiumRasterizer {
    fn rasterize(&self, pdf: &[u8], page_index: u16, scale: f32) -> Result<DynamicImage> {
        serialized(|| render_page(pdf, page_index, scale))
    }
}

fn render_page(pdf: &[u8], page_index: u16, scale: f32) -> Result<DynamicImage> {
    let render_err = |e: PdfiumError| Error::Render {
        name: String::new(),
        page: page_index as usize + 1,
        reason: e.to_string(),
    };

    let pdfium = init_pdfium().map_err(|e| Error::RendererUnavailable(e.to_string()))?;
    let document = pdfium.load_pdf_from_byte_slice(pdf, None).map_err(render_err)?;
    let page = document.pages().get(page_index).map_err(render_err)?;

    let config = PdfRenderConfig::new().scale_page_by_factor(scale);
    let bitmap = page.render_with_config(&config).map_err(render_err)?;

    let width = bitmap.width() as u32;
    let height = bitmap.height() as u32;
    let rgba = RgbaImage::from_raw(width, height, bitmap.as_rgba_bytes().to_vec())
        .ok_or_else(|| Error::Render {
            name: String::new(),
            page: page_index as usize + 1,
            reason: "bitmap size mismatch".to_string(),
        })?;

    Ok(DynamicImage::ImageRgba8(rgba))
}
