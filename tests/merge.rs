//! Integration tests for PDF merging

mod common;

use std::path::PathBuf;
use std::sync::Arc;

use common::{page_widths, pdf_with_pages, png_bytes};
use invoice_print::intake::{Batch, SourceFile};
use invoice_print::pdf::{
    count_pages, inspect_bytes, merge_batch, merge_documents, merge_pdfs, MergeInput, MergeOptions,
};
use invoice_print::Error;
use tempfile::TempDir;

fn input(name: &str, bytes: Vec<u8>) -> MergeInput {
    MergeInput {
        name: name.to_string(),
        bytes: Arc::from(bytes),
    }
}

#[test]
fn test_merge_three_pdfs_keeps_page_order() {
    let inputs = vec![
        input("a.pdf", pdf_with_pages(&[101, 102])),
        input("b.pdf", pdf_with_pages(&[201])),
        input("c.pdf", pdf_with_pages(&[301, 302, 303])),
    ];

    let merged = merge_documents(&inputs).expect("Failed to merge PDFs");

    assert_eq!(merged.page_count, 6);
    assert_eq!(merged.source_count, 3);
    assert_eq!(inspect_bytes("merged.pdf", &merged.bytes).unwrap().page_count, 6);
    assert_eq!(page_widths(&merged.bytes), vec![101, 102, 201, 301, 302, 303]);
}

#[test]
fn test_merge_aborts_on_unreadable_input() {
    let inputs = vec![
        input("a.pdf", pdf_with_pages(&[101, 102])),
        input("broken.pdf", b"%PDF-1.5 this is not really a pdf".to_vec()),
        input("c.pdf", pdf_with_pages(&[301])),
    ];

    match merge_documents(&inputs) {
        Err(Error::MergeInput { name, .. }) => assert_eq!(name, "broken.pdf"),
        other => panic!("Expected MergeInput error, got {:?}", other.map(|m| m.page_count)),
    }
}

#[test]
fn test_merge_pdfs_writes_nothing_on_failure() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let good = temp_dir.path().join("good.pdf");
    let bad = temp_dir.path().join("bad.pdf");
    std::fs::write(&good, pdf_with_pages(&[100])).unwrap();
    std::fs::write(&bad, b"garbage").unwrap();

    let output_path = temp_dir.path().join("merged.pdf");
    let options = MergeOptions {
        input_paths: vec![good, bad],
        output_path: output_path.clone(),
    };

    assert!(merge_pdfs(&options).is_err());
    assert!(!output_path.exists(), "No partial merge may be written");
}

#[test]
fn test_merge_pdfs_on_disk() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let mut input_paths = Vec::new();
    for (i, widths) in [&[10i64, 11][..], &[20][..]].iter().enumerate() {
        let path = temp_dir.path().join(format!("{}.pdf", i));
        std::fs::write(&path, pdf_with_pages(widths)).unwrap();
        input_paths.push(path);
    }

    let output_path = temp_dir.path().join("merged.pdf");
    let options = MergeOptions {
        input_paths,
        output_path: output_path.clone(),
    };

    merge_pdfs(&options).expect("Failed to merge PDFs");

    assert!(output_path.exists(), "Merged PDF was not created");
    assert_eq!(count_pages(&output_path).unwrap(), 3);
}

#[test]
fn test_merge_empty_input_list() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let options = MergeOptions {
        input_paths: vec![],
        output_path: temp_dir.path().join("empty.pdf"),
    };

    let err = merge_pdfs(&options).unwrap_err();
    assert!(err.to_string().contains("No input files"));
}

#[test]
fn test_merge_nonexistent_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let options = MergeOptions {
        input_paths: vec![PathBuf::from("nonexistent.pdf")],
        output_path: temp_dir.path().join("output.pdf"),
    };

    assert!(matches!(merge_pdfs(&options), Err(Error::FileNotFound(_))));
}

#[tokio::test]
async fn test_merge_batch_uses_pdf_items_in_batch_order() {
    let mut batch = Batch::new();
    batch.replace(vec![
        SourceFile::from_bytes("second.pdf", pdf_with_pages(&[2, 2])),
        SourceFile::from_bytes("photo.png", png_bytes(4, 4)),
        SourceFile::from_bytes("first.pdf", pdf_with_pages(&[1])),
    ]);

    let merged = merge_batch(&batch).await.expect("Failed to merge batch");
    assert_eq!(merged.source_count, 2);
    assert_eq!(page_widths(&merged.bytes), vec![2, 2, 1]);
}

#[tokio::test]
async fn test_merge_batch_without_pdfs() {
    let mut batch = Batch::new();
    batch.replace(vec![SourceFile::from_bytes("photo.png", png_bytes(4, 4))]);
    assert!(matches!(merge_batch(&batch).await, Err(Error::NoPdfInputs)));
}
