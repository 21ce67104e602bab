//! One preview pass over the batch
//!
//! `start` snapshots the batch and spawns one blocking decode per item that
//! still lacks a preview. `finish` joins them through a
//! [`CompletionTracker`], so every item resolves along exactly one path.
//! The caller may change the batch in between; `Batch::apply` drops results
//! for items that are gone.

use tokio::task::JoinHandle;

use crate::completion::{CompletionSignal, CompletionTracker, PassReport};
use crate::error::{Error, Result};
use crate::intake::{Batch, ItemId};
use crate::preview::{PreviewJob, PreviewProducer, Resolution};

pub type PassOutcome = PassReport<ItemId, Resolution>;

/// A pass in flight
pub struct PreviewPass {
    tracker: CompletionTracker<ItemId, Resolution>,
    signal: CompletionSignal<ItemId, Resolution>,
    pending: Vec<(ItemId, JoinHandle<Resolution>)>,
}

impl PreviewPass {
    /// Start a pass over every item of the batch.
    ///
    /// Without a rasterizer, PDFs still get their document handle and
    /// resolve as failed, so they print as placeholders.
    /// Must be called from within a tokio runtime.
    pub fn start(batch: &Batch, producer: &PreviewProducer) -> Result<Self> {
        let (mut tracker, signal) = CompletionTracker::new(batch.len());
        let mut pending = Vec::new();
        let mut unrendered = 0;

        for item in batch.items() {
            if item.preview().is_some() {
                tracker.resolve(item.id, Resolution::Cached)?;
                continue;
            }

            let job = PreviewJob::for_item(item);
            if job.needs_rasterizer() && !producer.can_render_pdf() {
                unrendered += 1;
            }
            let producer = producer.clone();
            let handle = tokio::task::spawn_blocking(move || producer.produce(&job));
            pending.push((item.id, handle));
        }

        if unrendered > 0 {
            log::warn!(
                "{} PDF previews will be placeholders: {}",
                unrendered,
                Error::RendererUnavailable("no page rasterizer configured".to_string())
            );
        }

        log::debug!(
            "Preview pass started: {} items, {} to decode",
            batch.len(),
            pending.len()
        );

        Ok(Self {
            tracker,
            signal,
            pending,
        })
    }

    /// Number of items still being decoded
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Wait for every item and return the report.
    pub async fn finish(self) -> Result<PassOutcome> {
        let Self {
            mut tracker,
            signal,
            pending,
        } = self;

        for (id, handle) in pending {
            let resolution = match handle.await {
                Ok(resolution) => resolution,
                Err(e) => {
                    log::warn!("Preview task for {} did not finish: {}", id, e);
                    Resolution::Failed {
                        reason: e.to_string(),
                        document: None,
                    }
                }
            };
            if let Err(e) = tracker.resolve(id, resolution) {
                log::warn!("Ignoring extra resolution: {}", e);
            }
        }

        // An incomplete tracker must not leave the wait hanging
        drop(tracker);
        let report = signal.wait().await?;
        log::info!(
            "Preview pass complete: {} cached, {} decoded, {} failed, {} without source",
            report.count_where(|r| matches!(r, Resolution::Cached)),
            report.count_where(|r| matches!(r, Resolution::Decoded { .. })),
            report.count_where(|r| matches!(r, Resolution::Failed { .. })),
            report.count_where(|r| matches!(r, Resolution::NoSource)),
        );
        Ok(report)
    }
}

impl Batch {
    /// Store the previews and document handles a pass produced.
    ///
    /// Results for items no longer in the batch are discarded. Returns the
    /// number of items that received a new preview.
    pub fn apply(&mut self, outcome: PassOutcome) -> usize {
        let mut attached = 0;
        for (id, resolution) in outcome.outcomes {
            let Some(item) = self.get_mut(id) else {
                log::debug!("Discarding late preview for removed item {}", id);
                continue;
            };
            match resolution {
                Resolution::Decoded { preview, document } => {
                    if let Some(document) = document {
                        item.attach_document(document);
                    }
                    if item.preview().is_none() {
                        attached += 1;
                    }
                    item.attach_preview(preview);
                }
                Resolution::Failed { document: Some(document), .. } => {
                    item.attach_document(document);
                }
                _ => {}
            }
        }
        attached
    }
}

/// Run a full pass and apply it to the batch
pub async fn run_preview_pass(batch: &mut Batch, producer: &PreviewProducer) -> Result<PassOutcome> {
    let outcome = PreviewPass::start(batch, producer)?.finish().await?;
    batch.apply(outcome.clone());
    Ok(outcome)
}
