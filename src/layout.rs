//! Page layout selection, pagination and geometry

use std::fmt;

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self {
            width: Length::from_mm(210.0),
            height: Length::from_mm(297.0),
        }
    }
}

/// Which composition a layout is chosen for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    Preview,
    Print,
}

/// Named items-per-page arrangement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutKind {
    Single,
    Double,
    Quad,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 3] = [LayoutKind::Single, LayoutKind::Double, LayoutKind::Quad];

    /// Pick the layout for `count` invoices.
    ///
    /// Preview never goes beyond `Double`; print switches to `Quad` from
    /// five invoices on. Returns `None` for an empty batch.
    pub fn select(count: usize, mode: PassMode) -> Option<LayoutKind> {
        match (mode, count) {
            (_, 0) => None,
            (_, 1) => Some(LayoutKind::Single),
            (PassMode::Preview, _) => Some(LayoutKind::Double),
            (PassMode::Print, 2..=4) => Some(LayoutKind::Double),
            (PassMode::Print, _) => Some(LayoutKind::Quad),
        }
    }

    pub fn items_per_page(self) -> usize {
        match self {
            LayoutKind::Single => 1,
            LayoutKind::Double => 2,
            LayoutKind::Quad => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutKind::Single => "single",
            LayoutKind::Double => "double",
            LayoutKind::Quad => "quad",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Page orientation; invoices are always laid out portrait
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Portrait,
}

impl Orientation {
    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Portrait => "portrait",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Split items into consecutive pages of `per_page`, preserving order.
///
/// The last page holds the remainder. `per_page` of zero yields no pages.
pub fn paginate<T>(items: &[T], per_page: usize) -> Vec<&[T]> {
    if per_page == 0 {
        return Vec::new();
    }
    items.chunks(per_page).collect()
}

/// Physical arrangement of one layout on the printed page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutGeometry {
    pub page: PageDimensions,
    /// Padding on every side of the page
    pub padding: Length,
    /// Extra padding above the first row
    pub top_offset: Length,
    /// Gap between neighbouring items, both directions
    pub gap: Length,
    pub items_per_row: usize,
    pub item_width: Length,
    pub item_height: Length,
}

impl LayoutGeometry {
    pub fn for_layout(kind: LayoutKind, orientation: Orientation) -> Self {
        let page = match orientation {
            Orientation::Portrait => PageDimensions::a4(),
        };
        let padding = Length::from_mm(5.0);

        match kind {
            LayoutKind::Single => Self {
                page,
                padding,
                top_offset: Length::from_mm(5.0),
                gap: Length::from_mm(0.0),
                items_per_row: 1,
                item_width: Length::from_mm(200.0),
                item_height: Length::from_mm(270.0),
            },
            LayoutKind::Double => Self {
                page,
                padding,
                top_offset: Length::from_mm(0.0),
                gap: Length::from_mm(5.0),
                items_per_row: 1,
                item_width: Length::from_mm(200.0),
                item_height: Length::from_mm(135.0),
            },
            LayoutKind::Quad => Self {
                page,
                padding,
                top_offset: Length::from_mm(0.0),
                gap: Length::from_mm(3.0),
                items_per_row: 2,
                item_width: Length::from_mm(97.0),
                item_height: Length::from_mm(135.0),
            },
        }
    }

    pub fn rows(&self, items_per_page: usize) -> usize {
        items_per_page.div_ceil(self.items_per_row)
    }

    /// Width and height a full page of items occupies
    pub fn grid_extent(&self, items_per_page: usize) -> (Length, Length) {
        let cols = self.items_per_row.min(items_per_page) as f64;
        let rows = self.rows(items_per_page) as f64;
        let width = cols * self.item_width.mm() + (cols - 1.0).max(0.0) * self.gap.mm();
        let height = rows * self.item_height.mm() + (rows - 1.0).max(0.0) * self.gap.mm();
        (Length::from_mm(width), Length::from_mm(height))
    }

    /// Space left for items once padding is taken off
    pub fn content_area(&self) -> (Length, Length) {
        let width = self.page.width.mm() - 2.0 * self.padding.mm();
        let height = self.page.height.mm() - 2.0 * self.padding.mm() - self.top_offset.mm();
        (Length::from_mm(width), Length::from_mm(height))
    }
}
