//! Printable export of the batch
//!
//! The print-mode composition is rendered into standalone HTML and injected
//! into a [`PrintSurface`]. Print is issued only after every embedded image
//! has settled, loaded or not. A fallback timer force-closes a surface that
//! nobody closed.

pub mod html;
pub mod surface;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::completion::{CompletionTracker, PassReport};
use crate::compose::compose;
use crate::error::{Error, Result};
use crate::intake::Batch;
use crate::layout::{LayoutKind, PassMode};
use crate::preview::raster::decode_data_uri;

pub use html::{image_sources, render_document};
pub use surface::{open_in_viewer, HtmlFileOpener, HtmlFileSurface, PrintSurface, SurfaceOpener};

/// How long a print surface may stay open before it is force-closed
pub const PRINT_SURFACE_TIMEOUT: Duration = Duration::from_secs(10);

/// Print export options
#[derive(Debug, Clone)]
pub struct PrintOptions {
    pub surface_timeout: Duration,
    /// Document title; defaults to one naming the invoice count
    pub title: Option<String>,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            surface_timeout: PRINT_SURFACE_TIMEOUT,
            title: None,
        }
    }
}

/// Load state of one embedded image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLoad {
    Loaded,
    Errored,
}

/// A rendered, not yet printed document
#[derive(Debug, Clone)]
pub struct PrintDocument {
    pub html: String,
    pub layout: LayoutKind,
    pub page_count: usize,
    /// Data URIs of the embedded images, in document order
    pub image_sources: Vec<String>,
}

pub type SharedSurface = Arc<Mutex<Box<dyn PrintSurface>>>;

/// A print that has been issued
pub struct PrintJob {
    pub layout: LayoutKind,
    pub page_count: usize,
    pub images: PassReport<usize, ImageLoad>,
    surface: SharedSurface,
    fallback: JoinHandle<()>,
}

impl PrintJob {
    pub fn surface(&self) -> SharedSurface {
        Arc::clone(&self.surface)
    }

    /// Close the surface now and cancel the fallback
    pub async fn close(self) -> Result<()> {
        self.fallback.abort();
        let mut surface = self.surface.lock().await;
        if surface.is_closed() {
            return Ok(());
        }
        surface.close()
    }

    /// Wait for the fallback timer to run out
    pub async fn wait_fallback(self) {
        let _ = self.fallback.await;
    }
}

/// Renders and prints batches
#[derive(Debug, Clone, Default)]
pub struct PrintExporter {
    options: PrintOptions,
}

impl PrintExporter {
    pub fn new(options: PrintOptions) -> Self {
        Self { options }
    }

    /// Render the batch in print mode
    pub fn render(&self, batch: &Batch) -> Result<PrintDocument> {
        let doc = compose(batch, PassMode::Print).ok_or(Error::EmptyBatch)?;
        let title = self
            .options
            .title
            .clone()
            .unwrap_or_else(|| format!("Invoices - {}", batch.len()));

        Ok(PrintDocument {
            html: render_document(&doc, &title),
            layout: doc.layout,
            page_count: doc.pages.len(),
            image_sources: image_sources(&doc),
        })
    }

    /// Render the batch, hand it to a fresh surface and print it.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn print(&self, batch: &Batch, opener: &mut dyn SurfaceOpener) -> Result<PrintJob> {
        let document = self.render(batch)?;

        let mut surface = opener.open().map_err(|e| match e {
            Error::SurfaceUnavailable(_) => e,
            other => Error::SurfaceUnavailable(other.to_string()),
        })?;

        if let Err(e) = surface.inject(&document.html) {
            return Err(close_after(surface.as_mut(), e));
        }

        let images = match load_images(document.image_sources).await {
            Ok(images) => images,
            Err(e) => return Err(close_after(surface.as_mut(), e)),
        };
        let errored = images.count_where(|load| *load == ImageLoad::Errored);
        if errored > 0 {
            log::warn!("{} of {} images failed to load", errored, images.total);
        }

        if let Err(e) = surface.print() {
            return Err(close_after(surface.as_mut(), e));
        }
        log::info!(
            "Printed {} pages ({} layout)",
            document.page_count,
            document.layout
        );

        let surface: SharedSurface = Arc::new(Mutex::new(surface));
        let fallback = spawn_fallback_close(Arc::clone(&surface), self.options.surface_timeout);

        Ok(PrintJob {
            layout: document.layout,
            page_count: document.page_count,
            images,
            surface,
            fallback,
        })
    }
}

/// Close a surface whose print failed, keeping the original error
fn close_after(surface: &mut dyn PrintSurface, err: Error) -> Error {
    if let Err(close_err) = surface.close() {
        log::warn!("Failed to close print surface: {}", close_err);
    }
    err
}

/// Settle every embedded image; each one counts once, loaded or errored
async fn load_images(sources: Vec<String>) -> Result<PassReport<usize, ImageLoad>> {
    let (mut tracker, signal) = CompletionTracker::new(sources.len());

    let handles: Vec<_> = sources
        .into_iter()
        .enumerate()
        .map(|(index, src)| (index, tokio::task::spawn_blocking(move || load_image(&src))))
        .collect();

    for (index, handle) in handles {
        let load = handle.await.unwrap_or(ImageLoad::Errored);
        tracker.resolve(index, load)?;
    }

    drop(tracker);
    signal.wait().await
}

fn load_image(src: &str) -> ImageLoad {
    let (mime_type, bytes) = match decode_data_uri(src) {
        Ok(parts) => parts,
        Err(e) => {
            log::warn!("Image source rejected: {}", e);
            return ImageLoad::Errored;
        }
    };

    // SVG placeholders are text; the raster decoder cannot read them
    if mime_type == "image/svg+xml" {
        return match std::str::from_utf8(&bytes) {
            Ok(text) if text.contains("<svg") => ImageLoad::Loaded,
            _ => ImageLoad::Errored,
        };
    }

    match image::load_from_memory(&bytes) {
        Ok(_) => ImageLoad::Loaded,
        Err(e) => {
            log::warn!("Embedded {} image failed to decode: {}", mime_type, e);
            ImageLoad::Errored
        }
    }
}

fn spawn_fallback_close(surface: SharedSurface, timeout: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let mut surface = surface.lock().await;
        if !surface.is_closed() {
            log::debug!("Closing print surface after {:?}", timeout);
            if let Err(e) = surface.close() {
                log::warn!("Failed to close print surface: {}", e);
            }
        }
    })
}
