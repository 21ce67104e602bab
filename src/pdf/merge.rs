//! PDF merging functionality using lopdf

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use lopdf::{Document, Object, ObjectId, Dictionary};
use crate::error::{Error, Result};
use crate::intake::Batch;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"Resources", b"CropBox", b"Rotate"];

/// Options for merging PDF files on disk
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Input PDF file paths in the order they should be merged
    pub input_paths: Vec<PathBuf>,
    /// Output PDF file path
    pub output_path: PathBuf,
}

/// One PDF handed to the merger
#[derive(Debug, Clone)]
pub struct MergeInput {
    /// Display name used in error messages
    pub name: String,
    /// Raw PDF bytes
    pub bytes: Arc<[u8]>,
}

/// Result of a successful merge
#[derive(Debug, Clone)]
pub struct MergedPdf {
    /// Serialized PDF
    pub bytes: Vec<u8>,
    /// Total number of pages copied
    pub page_count: usize,
    /// Number of input documents
    pub source_count: usize,
}

/// Merge in-memory PDFs into a single document, pages in input order.
///
/// Every input is parsed before anything is assembled, so an unreadable
/// input aborts the whole merge and no partial output exists.
///
/// Based on the lopdf merge example:
/// https://github.com/J-F-Liu/lopdf/blob/main/examples/merge.rs
pub fn merge_documents(inputs: &[MergeInput]) -> Result<MergedPdf> {
    if inputs.is_empty() {
        return Err(Error::NoPdfInputs);
    }

    let mut documents: Vec<Document> = Vec::with_capacity(inputs.len());
    for input in inputs {
        let doc = Document::load_mem(&input.bytes).map_err(|e| Error::MergeInput {
            name: input.name.clone(),
            reason: e.to_string(),
        })?;

        if doc.get_pages().is_empty() {
            return Err(Error::MergeInput {
                name: input.name.clone(),
                reason: "document has no pages".to_string(),
            });
        }

        log::debug!("Loaded {} for merge ({} pages)", input.name, doc.get_pages().len());
        documents.push(doc);
    }

    // Define a starting max_id for merged document
    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        // Renumber objects in this document to avoid conflicts
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        for &page_id in &pages {
            push_down_inherited(&mut doc, page_id)?;
        }
        page_ids.extend(pages);

        objects.extend(doc.objects);
    }

    let mut merged_doc = Document::with_version("1.5");

    // Add all collected objects FIRST
    merged_doc.objects.extend(objects);

    // new_object_id() must hand out ids above everything just added
    merged_doc.max_id = max_id - 1;

    let pages_id = merged_doc.new_object_id();

    let kids: Vec<Object> = page_ids
        .iter()
        .map(|&id| Object::Reference(id))
        .collect();

    let mut pages_object = Dictionary::new();
    pages_object.set("Type", Object::Name(b"Pages".to_vec()));
    pages_object.set("Count", Object::Integer(page_ids.len() as i64));
    pages_object.set("Kids", Object::Array(kids));

    let catalog_id = merged_doc.new_object_id();
    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));

    merged_doc.objects.insert(catalog_id, Object::Dictionary(catalog));
    merged_doc.objects.insert(pages_id, Object::Dictionary(pages_object));
    merged_doc.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        if let Ok(Object::Dictionary(dict)) = merged_doc.get_object_mut(page_id) {
            dict.set("Parent", Object::Reference(pages_id));
        }
    }

    // Old catalogs and page tree nodes are now unreachable
    merged_doc.prune_objects();
    merged_doc.compress();

    let mut bytes = Vec::new();
    merged_doc.save_to(&mut bytes)?;

    log::info!("Merged {} PDFs into {} pages", inputs.len(), page_ids.len());

    Ok(MergedPdf {
        bytes,
        page_count: page_ids.len(),
        source_count: inputs.len(),
    })
}

/// Copy attributes a page inherits from its page tree ancestors onto the
/// page itself, so it keeps them once re-parented under the merged tree.
fn push_down_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let mut inherited: Vec<(&[u8], Object)> = Vec::new();
    {
        let page = doc.get_dictionary(page_id)?;
        let mut missing: Vec<&[u8]> = INHERITABLE_KEYS
            .iter()
            .copied()
            .filter(|key| !page.has(key))
            .collect();
        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

        // Depth guard against cyclic Parent links in broken files
        let mut depth = 0;
        while let Some(parent_id) = parent {
            if missing.is_empty() || depth > 64 {
                break;
            }
            let node = match doc.get_dictionary(parent_id) {
                Ok(node) => node,
                Err(_) => break,
            };
            missing.retain(|key| match node.get(key) {
                Ok(value) => {
                    inherited.push((*key, value.clone()));
                    false
                }
                Err(_) => true,
            });
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
            depth += 1;
        }
    }

    if !inherited.is_empty() {
        let page = doc.get_dictionary_mut(page_id)?;
        for (key, value) in inherited {
            page.set(key.to_vec(), value);
        }
    }

    Ok(())
}

/// Merge every PDF item of the batch, in batch order
///
/// The parse/copy work runs on the blocking pool.
pub async fn merge_batch(batch: &Batch) -> Result<MergedPdf> {
    let inputs: Vec<MergeInput> = batch
        .pdf_items()
        .map(|item| MergeInput {
            name: item.name.clone(),
            bytes: Arc::clone(&item.raw),
        })
        .collect();

    if inputs.is_empty() {
        return Err(Error::NoPdfInputs);
    }

    log::debug!("Merging {} PDF items", inputs.len());

    tokio::task::spawn_blocking(move || merge_documents(&inputs))
        .await
        .map_err(|e| Error::General(format!("Merge task failed: {}", e)))?
}

/// Merge multiple PDF files into a single PDF file
///
/// # Example
///
/// ```no_run
/// use invoice_print::pdf::{MergeOptions, merge_pdfs};
/// use std::path::PathBuf;
///
/// let options = MergeOptions {
///     input_paths: vec![
///         PathBuf::from("invoice-march.pdf"),
///         PathBuf::from("invoice-april.pdf"),
///     ],
///     output_path: PathBuf::from("merged.pdf"),
/// };
///
/// merge_pdfs(&options).expect("Failed to merge");
/// ```
pub fn merge_pdfs(options: &MergeOptions) -> Result<MergedPdf> {
    if options.input_paths.is_empty() {
        return Err(Error::General("No input files provided".to_string()));
    }

    for path in &options.input_paths {
        if !path.exists() {
            return Err(Error::FileNotFound(path.clone()));
        }
    }

    let mut inputs = Vec::with_capacity(options.input_paths.len());
    for path in &options.input_paths {
        inputs.push(MergeInput {
            name: path.display().to_string(),
            bytes: std::fs::read(path)?.into(),
        });
    }

    let merged = merge_documents(&inputs)?;
    std::fs::write(&options.output_path, &merged.bytes)?;

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    /// Build a PDF whose pages inherit MediaBox from the Pages node
    fn pdf_with_inherited_mediabox(width: i64) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), b"q Q".to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_merge_empty_inputs() {
        assert!(matches!(merge_documents(&[]), Err(Error::NoPdfInputs)));
    }

    #[test]
    fn test_inherited_mediabox_survives_merge() {
        let inputs = vec![MergeInput {
            name: "a.pdf".to_string(),
            bytes: pdf_with_inherited_mediabox(612).into(),
        }];

        let merged = merge_documents(&inputs).unwrap();
        let doc = Document::load_mem(&merged.bytes).unwrap();
        let (_, page_id) = doc.get_pages().into_iter().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
        assert_eq!(media_box[2].as_i64().unwrap(), 612);
    }
}
