//! Arranging previews into pages

use crate::intake::{Batch, ItemId};
use crate::layout::{paginate, LayoutGeometry, LayoutKind, Orientation, PassMode};
use crate::preview::PreviewImage;

/// What fills one slot on a page
#[derive(Debug, Clone, PartialEq)]
pub enum SlotImage {
    Preview(PreviewImage),
    /// No preview available; rendered as a card with the file name
    Placeholder,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub item_id: ItemId,
    pub name: String,
    pub image: SlotImage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComposedPage {
    pub slots: Vec<Slot>,
}

/// Pages for one pass, in batch order
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedDocument {
    pub mode: PassMode,
    pub layout: LayoutKind,
    pub orientation: Orientation,
    pub geometry: LayoutGeometry,
    pub pages: Vec<ComposedPage>,
}

impl ComposedDocument {
    pub fn slot_count(&self) -> usize {
        self.pages.iter().map(|page| page.slots.len()).sum()
    }

    pub fn placeholder_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|page| &page.slots)
            .filter(|slot| slot.image == SlotImage::Placeholder)
            .count()
    }
}

/// Lay the batch out for `mode`. Returns `None` for an empty batch.
pub fn compose(batch: &Batch, mode: PassMode) -> Option<ComposedDocument> {
    let layout = LayoutKind::select(batch.len(), mode)?;
    let orientation = Orientation::Portrait;

    let pages = paginate(batch.items(), layout.items_per_page())
        .into_iter()
        .map(|chunk| ComposedPage {
            slots: chunk
                .iter()
                .map(|item| Slot {
                    item_id: item.id,
                    name: item.name.clone(),
                    image: match item.preview() {
                        Some(preview) => SlotImage::Preview(preview.clone()),
                        None => SlotImage::Placeholder,
                    },
                })
                .collect(),
        })
        .collect();

    log::debug!(
        "Composed {} items as {} {} ({:?})",
        batch.len(),
        layout,
        orientation,
        mode
    );

    Some(ComposedDocument {
        mode,
        layout,
        orientation,
        geometry: LayoutGeometry::for_layout(layout, orientation),
        pages,
    })
}
