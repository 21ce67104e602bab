//! Decoded preview images, placeholders and data URIs

use std::io::Cursor;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::{DynamicImage, ImageFormat};

use crate::error::{Error, Result};

const PLACEHOLDER_WIDTH: u32 = 300;
const PLACEHOLDER_HEIGHT: u32 = 200;

/// A fully decoded, displayable preview
///
/// Holds the encoded bytes that get embedded in output documents. Only
/// built once decoding has succeeded, so a preview is never partial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewImage {
    mime_type: String,
    bytes: Arc<[u8]>,
    width: u32,
    height: u32,
}

impl PreviewImage {
    /// Validate already-encoded image bytes and keep them as they are
    pub fn from_encoded(mime_type: &str, bytes: Arc<[u8]>) -> Result<Self> {
        let decoded = image::load_from_memory(&bytes)?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            width: decoded.width(),
            height: decoded.height(),
            bytes,
        })
    }

    /// Encode a raster losslessly as PNG
    pub fn from_raster(raster: &DynamicImage) -> Result<Self> {
        let mut buf = Vec::new();
        raster.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
        Ok(Self {
            mime_type: "image/png".to_string(),
            bytes: buf.into(),
            width: raster.width(),
            height: raster.height(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

/// Escape text for use in XML/HTML content and attribute values
pub fn escape_markup(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Grey card with the file name, used where no preview exists
pub fn placeholder_svg(label: &str) -> String {
    format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\
         <rect width=\"{w}\" height=\"{h}\" fill=\"#f0f0f0\"/>\
         <text x=\"{cx}\" y=\"{cy}\" font-family=\"Arial\" font-size=\"12\" text-anchor=\"middle\" fill=\"#666\">{label}</text>\
         </svg>",
        w = PLACEHOLDER_WIDTH,
        h = PLACEHOLDER_HEIGHT,
        cx = PLACEHOLDER_WIDTH / 2,
        cy = PLACEHOLDER_HEIGHT / 2,
        label = escape_markup(label),
    )
}

pub fn placeholder_data_uri(label: &str) -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        STANDARD.encode(placeholder_svg(label))
    )
}

/// Split a base64 `data:` URI into its MIME type and payload
pub fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>)> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| Error::UnsupportedDataUri("missing data: scheme".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| Error::UnsupportedDataUri("missing payload".to_string()))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| Error::UnsupportedDataUri(format!("not base64: {}", header)))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| Error::UnsupportedDataUri(e.to_string()))?;
    Ok((mime_type.to_string(), bytes))
}
