//! Invoice Print CLI tool
//!
//! A command-line tool for previewing, merging and printing invoices laid out on A4 pages.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use glob::glob;

use invoice_print::compose::compose;
use invoice_print::intake::{AutoAction, Batch, SourceFile};
use invoice_print::layout::PassMode;
use invoice_print::pass::run_preview_pass;
use invoice_print::pdf::{merge_batch, merge_pdfs, MergeOptions};
use invoice_print::preview::{PreviewOptions, PreviewProducer};
use invoice_print::print::{open_in_viewer, render_document, HtmlFileOpener, PrintExporter, PrintOptions};

/// Invoice Print - lay out invoices on A4 pages, merge and print them
#[derive(Parser)]
#[command(name = "invoice-print")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "EXAMPLES:
    # Show how a batch is classified
    invoice-print info scans/*.png

    # Write an on-screen preview and open it
    invoice-print preview -o preview.html --open march.pdf april.pdf

    # Print five receipts, four per page
    invoice-print print \"receipts/*.jpg\"

    # Merge PDF invoices in order
    invoice-print merge -o merged.pdf march.pdf april.pdf")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the workflow type and the items of a batch
    Info {
        /// Invoice files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,
    },

    /// Compose an on-screen preview as HTML
    Preview {
        /// Invoice files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output HTML file path
        #[arg(short, long)]
        output: PathBuf,

        /// Device pixel ratio used for PDF rendering
        #[arg(long, default_value_t = 1.0)]
        scale_ratio: f32,

        /// Merge the PDFs of a PDF batch into this file
        #[arg(long)]
        merge_output: Option<PathBuf>,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },

    /// Export the print layout and open it for printing
    Print {
        /// Invoice files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Printable HTML file path
        #[arg(short, long, default_value = "invoices-print.html")]
        output: PathBuf,

        /// Device pixel ratio used for PDF rendering
        #[arg(long, default_value_t = 1.0)]
        scale_ratio: f32,

        /// Merge the PDFs of a PDF batch into this file
        #[arg(long)]
        merge_output: Option<PathBuf>,

        /// Write the document without launching the viewer
        #[arg(long)]
        no_open: bool,
    },

    /// Merge PDF files into one
    Merge {
        /// Input PDF files (in order). Supports glob patterns like "*.pdf"
        #[arg(required = true)]
        inputs: Vec<String>,

        /// Output PDF file path
        #[arg(short, long)]
        output: PathBuf,

        /// Open the output file after creation
        #[arg(long)]
        open: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")
        .and_then(|runtime| runtime.block_on(run(cli.command)));

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Info { inputs } => cmd_info(inputs),
        Commands::Preview { inputs, output, scale_ratio, merge_output, open } => {
            cmd_preview(inputs, output, scale_ratio, merge_output, open).await
        }
        Commands::Print { inputs, output, scale_ratio, merge_output, no_open } => {
            cmd_print(inputs, output, scale_ratio, merge_output, !no_open).await
        }
        Commands::Merge { inputs, output, open } => cmd_merge(inputs, output, open),
    }
}

/// Expand glob patterns in input paths, keeping argument order
fn expand_globs(patterns: Vec<String>) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        if pattern.contains('*') || pattern.contains('?') || pattern.contains('[') {
            let mut matched = false;
            for entry in glob(&pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))? {
                match entry {
                    Ok(path) => {
                        paths.push(path);
                        matched = true;
                    }
                    Err(e) => log::warn!("glob error for {}: {}", pattern, e),
                }
            }
            if !matched {
                bail!("No files matched pattern: {}", pattern);
            }
        } else {
            paths.push(PathBuf::from(pattern));
        }
    }

    Ok(paths)
}

/// Read the inputs into a fresh batch
fn load_batch(inputs: Vec<String>) -> Result<Batch> {
    let mut files = Vec::new();
    for path in expand_globs(inputs)? {
        files.push(SourceFile::from_path(&path)?);
    }

    let mut batch = Batch::new();
    let workflow = batch.replace(files);
    eprintln!("Loaded {} files ({} workflow)", batch.len(), workflow);
    Ok(batch)
}

fn build_producer(scale_ratio: f32) -> PreviewProducer {
    let producer = PreviewProducer::new(PreviewOptions {
        device_pixel_ratio: scale_ratio,
        ..Default::default()
    });

    #[cfg(feature = "pdfium")]
    {
        match invoice_print::preview::PdfiumRasterizer::bind() {
            Ok(rasterizer) => return producer.with_rasterizer(std::sync::Arc::new(rasterizer)),
            Err(e) => {
                log::warn!("{}", e);
                eprintln!("Warning: PDF previews will show file names only ({})", e);
            }
        }
    }

    producer
}

/// Run the workflow's follow-up action, if the user asked for it
async fn run_auto_action(batch: &Batch, merge_output: Option<&Path>) -> Result<()> {
    match (batch.workflow().auto_action(), merge_output) {
        (Some(AutoAction::MergePdfs), Some(path)) => {
            let merged = merge_batch(batch).await?;
            std::fs::write(path, &merged.bytes)?;
            eprintln!(
                "Merged {} PDFs ({} pages) to: {}",
                merged.source_count,
                merged.page_count,
                path.display()
            );
        }
        (Some(AutoAction::MergePdfs), None) => {
            log::info!("PDF batch; pass --merge-output to merge it");
        }
        (None, Some(_)) => {
            eprintln!("Warning: batch has no PDFs, nothing merged");
        }
        (None, None) => {}
    }
    Ok(())
}

/// Show how a batch is classified
fn cmd_info(inputs: Vec<String>) -> Result<()> {
    let mut batch = load_batch(inputs)?;
    let producer = PreviewProducer::default();

    println!("Workflow: {}", batch.workflow());
    let ids: Vec<_> = batch.items().iter().map(|item| item.id).collect();
    for id in ids {
        let Some(item) = batch.get_mut(id) else { continue };
        if item.is_pdf() {
            // Parses the document handle; no rasterizer, so no render
            producer.ensure_preview(item);
        }
        let pages = item
            .page_count()
            .map(|n| format!(", {} pages", n))
            .unwrap_or_default();
        println!("{} {} ({} bytes, {}{})", item.id, item.name, item.size, item.mime_type, pages);
    }

    for mode in [PassMode::Preview, PassMode::Print] {
        if let Some(doc) = compose(&batch, mode) {
            println!("{:?} layout: {} ({} pages)", mode, doc.layout, doc.pages.len());
        }
    }

    Ok(())
}

/// Compose an on-screen preview
async fn cmd_preview(
    inputs: Vec<String>,
    output: PathBuf,
    scale_ratio: f32,
    merge_output: Option<PathBuf>,
    open: bool,
) -> Result<()> {
    let mut batch = load_batch(inputs)?;
    run_auto_action(&batch, merge_output.as_deref()).await?;

    eprintln!("Generating previews...");
    let producer = build_producer(scale_ratio);
    run_preview_pass(&mut batch, &producer).await?;

    let doc = compose(&batch, PassMode::Preview).context("No invoices loaded")?;
    let title = format!("Preview - {} invoices", batch.len());
    std::fs::write(&output, render_document(&doc, &title))?;

    eprintln!(
        "Preview ({} layout, {} pages) written to: {}",
        doc.layout,
        doc.pages.len(),
        output.display()
    );

    if open {
        open_in_viewer(&output)?;
    }

    Ok(())
}

/// Export and print the batch
async fn cmd_print(
    inputs: Vec<String>,
    output: PathBuf,
    scale_ratio: f32,
    merge_output: Option<PathBuf>,
    launch_viewer: bool,
) -> Result<()> {
    let mut batch = load_batch(inputs)?;
    run_auto_action(&batch, merge_output.as_deref()).await?;

    eprintln!("Preparing print...");
    let producer = build_producer(scale_ratio);
    run_preview_pass(&mut batch, &producer).await?;

    let exporter = PrintExporter::new(PrintOptions::default());
    let mut opener = HtmlFileOpener {
        path: output.clone(),
        launch_viewer,
    };
    let job = exporter.print(&batch, &mut opener).await?;

    eprintln!(
        "Print document ({} layout, {} pages): {}",
        job.layout,
        job.page_count,
        output.display()
    );

    job.close().await?;
    Ok(())
}

/// Merge multiple PDFs into one
fn cmd_merge(inputs: Vec<String>, output: PathBuf, open: bool) -> Result<()> {
    let inputs = expand_globs(inputs)?;

    eprintln!("Merging {} PDF files...", inputs.len());

    let options = MergeOptions {
        input_paths: inputs,
        output_path: output.clone(),
    };

    let merged = merge_pdfs(&options)?;

    eprintln!("Merged {} pages to: {}", merged.page_count, output.display());

    if open {
        open_in_viewer(&output)?;
    }

    Ok(())
}
