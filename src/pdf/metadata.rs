//! PDF metadata extraction
//!
//! `PdfMetadata` doubles as the parsed document handle kept on PDF invoice
//! items: it is only ever built from a document that parsed and has pages.

use std::path::Path;
use lopdf::{Document, Object};
use crate::error::{Error, Result};

/// Count pages by reading the Count field from the Pages dictionary
/// This is more reliable than get_pages() which doesn't handle nested page trees
fn count_pages_from_catalog(doc: &Document) -> Result<usize> {
    let catalog_ref = doc.trailer.get(b"Root")
        .map_err(|_| Error::General("No Root in trailer".to_string()))?;

    let catalog_id = match catalog_ref {
        Object::Reference(id) => *id,
        _ => return Err(Error::General("Root is not a reference".to_string())),
    };

    let catalog_dict = match doc.get_object(catalog_id)? {
        Object::Dictionary(dict) => dict,
        _ => return Err(Error::General("Catalog is not a dictionary".to_string())),
    };

    let pages_id = match catalog_dict.get(b"Pages") {
        Ok(Object::Reference(id)) => *id,
        Ok(_) => return Err(Error::General("Pages is not a reference".to_string())),
        Err(_) => return Err(Error::General("No Pages in catalog".to_string())),
    };

    let pages_dict = match doc.get_object(pages_id)? {
        Object::Dictionary(dict) => dict,
        _ => return Err(Error::General("Pages is not a dictionary".to_string())),
    };

    match pages_dict.get(b"Count") {
        Ok(Object::Integer(n)) if *n >= 0 => Ok(*n as usize),
        Ok(_) => Err(Error::General("Count is not a valid integer".to_string())),
        Err(_) => Err(Error::General("No Count in Pages".to_string())),
    }
}

/// Parsed handle to a multi-page PDF
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfMetadata {
    /// Number of pages in the PDF, always at least one
    pub page_count: usize,
    /// Document title (if present)
    pub title: Option<String>,
    /// Document author (if present)
    pub author: Option<String>,
}

fn info_string(doc: &Document, key: &[u8]) -> Option<String> {
    let info_id = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => *id,
        _ => return None,
    };
    let info_dict = match doc.get_object(info_id).ok()? {
        Object::Dictionary(dict) => dict,
        _ => return None,
    };
    let bytes = info_dict.get(key).ok()?.as_str().ok()?;
    String::from_utf8(bytes.to_vec()).ok()
}

/// Build the handle for an already loaded document
pub fn metadata_for(doc: &Document, name: &str) -> Result<PdfMetadata> {
    let page_count = count_pages_from_catalog(doc)?;

    if page_count == 0 {
        return Err(Error::EmptyPdf(name.to_string()));
    }

    Ok(PdfMetadata {
        page_count,
        title: info_string(doc, b"Title"),
        author: info_string(doc, b"Author"),
    })
}

/// Parse in-memory PDF bytes into a document handle
pub fn inspect_bytes(name: &str, bytes: &[u8]) -> Result<PdfMetadata> {
    let doc = Document::load_mem(bytes)?;
    metadata_for(&doc, name)
}

/// Extract metadata from a PDF file
pub fn extract_metadata(path: &Path) -> Result<PdfMetadata> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let doc = Document::load(path)?;
    metadata_for(&doc, &path.display().to_string())
}

/// Count the number of pages in a PDF file
///
/// This is a quick operation that reads the Count field from the Pages dictionary.
pub fn count_pages(path: &Path) -> Result<usize> {
    extract_metadata(path).map(|meta| meta.page_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_pages_nonexistent_file() {
        let result = count_pages(Path::new("nonexistent.pdf"));
        assert!(matches!(result.unwrap_err(), Error::FileNotFound(_)));
    }

    #[test]
    fn test_inspect_garbage_bytes() {
        let result = inspect_bytes("junk.pdf", b"definitely not a pdf");
        assert!(matches!(result.unwrap_err(), Error::Pdf(_)));
    }
}
