//! Shared fixtures for integration tests
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use invoice_print::preview::PageRasterizer;
use invoice_print::print::{PrintSurface, SurfaceOpener};
use invoice_print::{Error, Result};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

/// Build a PDF with one page per entry; each page's MediaBox width tags it
pub fn pdf_with_pages(widths: &[i64]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for &width in widths {
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), 842.into()],
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => widths.len() as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize test PDF");
    bytes
}

/// MediaBox widths of every page, in page order
pub fn page_widths(pdf: &[u8]) -> Vec<i64> {
    let doc = Document::load_mem(pdf).expect("Failed to load PDF");
    doc.get_pages()
        .values()
        .map(|&page_id| {
            let page = doc.get_dictionary(page_id).unwrap();
            let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
            media_box[2].as_i64().unwrap()
        })
        .collect()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}

/// Rasterizer that returns a blank page sized by the scale
#[derive(Default)]
pub struct FakeRasterizer {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl FakeRasterizer {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PageRasterizer for FakeRasterizer {
    fn rasterize(&self, _pdf: &[u8], page_index: u16, scale: f32) -> Result<DynamicImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Render {
                name: String::new(),
                page: page_index as usize + 1,
                reason: "fake failure".to_string(),
            });
        }
        let width = (10.0 * scale) as u32;
        let height = (14.0 * scale) as u32;
        Ok(DynamicImage::ImageRgba8(RgbaImage::new(width, height)))
    }
}

/// Everything a fake surface saw
#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub events: Vec<&'static str>,
    pub html: String,
    pub closed: bool,
}

pub struct FakeSurface {
    log: Arc<Mutex<SurfaceLog>>,
    fail_on: Option<&'static str>,
}

impl FakeSurface {
    fn check(&self, call: &'static str) -> Result<()> {
        if self.fail_on == Some(call) {
            return Err(Error::General(format!("{} refused", call)));
        }
        Ok(())
    }
}

impl PrintSurface for FakeSurface {
    fn inject(&mut self, html: &str) -> Result<()> {
        self.check("inject")?;
        let mut log = self.log.lock().unwrap();
        log.events.push("inject");
        log.html = html.to_string();
        Ok(())
    }

    fn print(&mut self) -> Result<()> {
        self.check("print")?;
        self.log.lock().unwrap().events.push("print");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.events.push("close");
        log.closed = true;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.log.lock().unwrap().closed
    }
}

/// Opener handing out fake surfaces, or refusing like a blocked pop-up
pub struct FakeOpener {
    pub log: Arc<Mutex<SurfaceLog>>,
    pub blocked: bool,
    /// Surface call ("inject" or "print") that fails
    pub fail_on: Option<&'static str>,
}

impl FakeOpener {
    pub fn new() -> Self {
        Self {
            log: Arc::new(Mutex::new(SurfaceLog::default())),
            blocked: false,
            fail_on: None,
        }
    }

    pub fn failing_on(call: &'static str) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::new()
        }
    }

    pub fn blocked() -> Self {
        Self {
            blocked: true,
            ..Self::new()
        }
    }
}

impl SurfaceOpener for FakeOpener {
    fn open(&mut self) -> Result<Box<dyn PrintSurface>> {
        if self.blocked {
            return Err(Error::SurfaceUnavailable("blocked".to_string()));
        }
        Ok(Box::new(FakeSurface {
            log: Arc::clone(&self.log),
            fail_on: self.fail_on,
        }))
    }
}
