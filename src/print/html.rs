//! Static HTML rendering of a composed document

use crate::compose::{ComposedDocument, SlotImage};
use crate::layout::{LayoutGeometry, LayoutKind};
use crate::preview::placeholder_data_uri;
use crate::preview::raster::escape_markup;

/// CSS class of an item box for each layout
fn item_class(layout: LayoutKind) -> &'static str {
    match layout {
        LayoutKind::Single => "single-center",
        LayoutKind::Double => "double-item",
        LayoutKind::Quad => "quad-item",
    }
}

/// Flex arrangement of a printed page
fn print_page_rules(layout: LayoutKind, geometry: &LayoutGeometry) -> String {
    match layout {
        LayoutKind::Single => format!(
            "flex-direction: column; align-items: center; justify-content: flex-start; padding-top: {}mm;",
            geometry.padding.mm() + geometry.top_offset.mm()
        ),
        LayoutKind::Double => format!(
            "flex-direction: column; justify-content: flex-start; align-items: center; gap: {}mm;",
            geometry.gap.mm()
        ),
        LayoutKind::Quad => format!(
            "flex-wrap: wrap; align-content: flex-start; justify-content: space-around; gap: {}mm;",
            geometry.gap.mm()
        ),
    }
}

/// On-screen arrangement, an A4-proportioned card per page
fn screen_page_rules(layout: LayoutKind) -> &'static str {
    match layout {
        LayoutKind::Single => "flex-direction: column; align-items: center; justify-content: flex-start; padding-top: 20px;",
        LayoutKind::Double => "flex-direction: column; justify-content: flex-start; gap: 10px;",
        LayoutKind::Quad => "flex-wrap: wrap; align-content: space-between; justify-content: space-between;",
    }
}

fn screen_item_rules(layout: LayoutKind) -> &'static str {
    match layout {
        LayoutKind::Single => "width: 95%; height: 95%; max-width: 500px; max-height: 700px;",
        LayoutKind::Double => "width: 95%; height: calc(95% / 2 - 5px); max-height: 340px; margin: 2px 0;",
        LayoutKind::Quad => "width: calc(95% / 2 - 5px); height: calc(95% / 2 - 5px); max-height: 340px; margin: 2px;",
    }
}

fn stylesheet(doc: &ComposedDocument) -> String {
    let geometry = &doc.geometry;
    let class = item_class(doc.layout);

    let mut css = String::new();
    css.push_str("* { box-sizing: border-box; }\n");

    css.push_str("@media print {\n");
    css.push_str(&format!(
        "  @page {{ size: A4 {}; margin: 0; }}\n",
        doc.orientation
    ));
    css.push_str("  body { margin: 0; padding: 0; background: white; print-color-adjust: exact; -webkit-print-color-adjust: exact; }\n");
    css.push_str(&format!(
        "  .print-page {{ page-break-after: always; width: 100%; height: {}mm; display: flex; padding: {}mm; margin: 0; {} }}\n",
        geometry.page.height.mm(),
        geometry.padding.mm(),
        print_page_rules(doc.layout, geometry)
    ));
    css.push_str("  .print-page:last-child { page-break-after: avoid; }\n");
    css.push_str(&format!(
        "  .print-item.{class} {{ width: {w}mm; height: {h}mm; max-width: {w}mm; max-height: {h}mm; display: flex; align-items: flex-start; justify-content: center; }}\n",
        class = class,
        w = geometry.item_width.mm(),
        h = geometry.item_height.mm(),
    ));
    css.push_str("  .print-item { overflow: hidden; position: relative; border: none; background: transparent; }\n");
    css.push_str("  .print-item img { width: 100%; height: auto; max-width: 100%; max-height: 100%; object-fit: contain; object-position: center top; display: block; margin: 0 auto; }\n");
    css.push_str("}\n");

    css.push_str("@media screen {\n");
    css.push_str("  body { background: white; padding: 10px; }\n");
    css.push_str(&format!(
        "  .print-page {{ width: 60vw; height: calc(60vw * 1.414); max-width: 595px; max-height: 842px; margin: 15px auto; padding: 15px; display: flex; {} }}\n",
        screen_page_rules(doc.layout)
    ));
    css.push_str("  .print-item { display: flex; align-items: center; justify-content: center; overflow: visible; }\n");
    css.push_str(&format!(
        "  .print-item.{} {{ {} }}\n",
        class,
        screen_item_rules(doc.layout)
    ));
    css.push_str("  .print-item img { max-width: 100%; max-height: 100%; object-fit: contain; object-position: center; }\n");
    css.push_str("}\n");

    css
}

/// Image source embedded for each slot, in document order
pub fn image_sources(doc: &ComposedDocument) -> Vec<String> {
    doc.pages
        .iter()
        .flat_map(|page| &page.slots)
        .map(|slot| match &slot.image {
            SlotImage::Preview(preview) => preview.data_uri(),
            SlotImage::Placeholder => placeholder_data_uri(&slot.name),
        })
        .collect()
}

/// Render a self-contained HTML document
pub fn render_document(doc: &ComposedDocument, title: &str) -> String {
    let class = item_class(doc.layout);
    let mut sources = image_sources(doc).into_iter();

    let mut body = String::new();
    for page in &doc.pages {
        body.push_str(&format!(
            "<div class=\"print-page layout-{} orientation-{}\">\n",
            doc.layout, doc.orientation
        ));
        for slot in &page.slots {
            let src = sources.next().unwrap_or_default();
            body.push_str(&format!(
                "  <div class=\"print-item {}\"><img src=\"{}\" alt=\"{}\" loading=\"eager\"></div>\n",
                class,
                src,
                escape_markup(&slot.name)
            ));
        }
        body.push_str("</div>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n<title>{}</title>\n<style>\n{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        escape_markup(title),
        stylesheet(doc),
        body
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::compose;
    use crate::intake::{Batch, SourceFile};
    use crate::layout::PassMode;

    fn batch_of(names: &[&str]) -> Batch {
        let mut batch = Batch::new();
        batch.replace(
            names
                .iter()
                .map(|name| SourceFile::new(*name, "application/octet-stream", vec![0]))
                .collect(),
        );
        batch
    }

    #[test]
    fn test_print_document_structure() {
        let batch = batch_of(&["a.odf", "b.odf", "c.odf", "d.odf", "e.odf"]);
        let doc = compose(&batch, PassMode::Print).unwrap();
        let html = render_document(&doc, "Invoices");

        assert_eq!(html.matches("class=\"print-page layout-quad").count(), 2);
        assert_eq!(html.matches("<img ").count(), 5);
        assert!(html.contains("size: A4 portrait"));
        assert!(html.contains("height: 297mm"));
        assert!(html.contains("width: 97mm"));
        assert_eq!(image_sources(&doc).len(), 5);
    }

    #[test]
    fn test_names_are_escaped() {
        let batch = batch_of(&["<script>.odf"]);
        let doc = compose(&batch, PassMode::Print).unwrap();
        let html = render_document(&doc, "T&C");
        assert!(!html.contains("<script>"));
        assert!(html.contains("alt=\"&lt;script&gt;.odf\""));
        assert!(html.contains("<title>T&amp;C</title>"));
    }
}
