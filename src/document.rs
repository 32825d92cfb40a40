use std::io::Write;

use printpdf::{BuiltinFont, Mm, PdfDocument, Pt};

use crate::{
    actions::shopping_list::{ShoppingList, ShoppingListItem},
    constants::SHOPPING_LIST_FILE_STEM,
    error::RenderError,
};

/// Turns an aggregated shopping list into a downloadable document.
pub trait DocumentRenderer: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn extension(&self) -> &'static str;

    fn render(&self, heading: &str, items: ShoppingList) -> Result<Vec<u8>, RenderError>;
}

/// `number` is zero-based; lines are numbered from 1.
fn item_line(number: usize, item: &ShoppingListItem) -> String {
    format!(
        "{}. {} - {}{}",
        number + 1,
        item.name,
        item.total_amount,
        item.measurement_unit
    )
}

/// Numbered plain-text list, one ingredient per line.
#[derive(Clone, Copy, Debug, Default)]
pub struct TextRenderer;

impl DocumentRenderer for TextRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, heading: &str, items: ShoppingList) -> Result<Vec<u8>, RenderError> {
        let mut buffer = Vec::new();
        writeln!(buffer, "{heading}")?;
        for (number, item) in items.enumerate() {
            writeln!(buffer, "{}", item_line(number, &item))?;
        }

        Ok(buffer)
    }
}

const PAGE_WIDTH: Mm = Mm(210.0);
const PAGE_HEIGHT: Mm = Mm(297.0);
const LAYER: &str = "Shopping list";

const INDENT: Pt = Pt(20.0);
const HEADING_TOP: Pt = Pt(800.0);
const HEADING_SIZE: f32 = 23.0;
const LINES_TOP: Pt = Pt(770.0);
const LINE_SIZE: f32 = 15.0;
const LINE_STEP: f32 = 20.0;
const BOTTOM_MARGIN: f32 = 40.0;

/// A4 pages with the heading on the first page and the same numbered lines as
/// [`TextRenderer`]. Built-in Helvetica only covers Windows-1252 characters.
#[derive(Clone, Copy, Debug, Default)]
pub struct PdfRenderer;

impl DocumentRenderer for PdfRenderer {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render(&self, heading: &str, items: ShoppingList) -> Result<Vec<u8>, RenderError> {
        let (doc, page, layer) = PdfDocument::new(heading, PAGE_WIDTH, PAGE_HEIGHT, LAYER);
        let font = doc.add_builtin_font(BuiltinFont::Helvetica)?;

        let mut layer = doc.get_page(page).get_layer(layer);
        layer.use_text(heading, HEADING_SIZE, INDENT.into(), HEADING_TOP.into(), &font);

        let mut top = LINES_TOP.0;
        for (number, item) in items.enumerate() {
            if top < BOTTOM_MARGIN {
                let (page, index) = doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, LAYER);
                layer = doc.get_page(page).get_layer(index);
                top = HEADING_TOP.0;
            }
            layer.use_text(
                item_line(number, &item),
                LINE_SIZE,
                INDENT.into(),
                Pt(top).into(),
                &font,
            );
            top -= LINE_STEP;
        }

        Ok(doc.save_to_bytes()?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Document {
    pub fn new<R>(renderer: &R, body: Vec<u8>) -> Self
    where
        R: DocumentRenderer + ?Sized,
    {
        Self {
            file_name: format!("{SHOPPING_LIST_FILE_STEM}.{}", renderer.extension()),
            content_type: renderer.content_type(),
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use printpdf::lopdf;

    use super::*;
    use crate::schema::CartPart;

    fn cart(lines: usize) -> ShoppingList {
        ShoppingList::from_parts(
            (0..lines)
                .map(|n| CartPart {
                    name: format!("Ingredient {n:03}"),
                    measurement_unit: "g".to_string(),
                    amount: 10,
                })
                .collect(),
        )
    }

    #[test]
    fn text_lines_are_numbered_from_one() {
        let list = ShoppingList::from_parts(vec![
            CartPart {
                name: "Salt".to_string(),
                measurement_unit: "g".to_string(),
                amount: 25,
            },
            CartPart {
                name: "Eggs".to_string(),
                measurement_unit: "pcs".to_string(),
                amount: 3,
            },
        ]);

        let body = TextRenderer.render("Ingredient list:", list).unwrap();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            "Ingredient list:\n1. Eggs - 3pcs\n2. Salt - 25g\n"
        );
    }

    #[test]
    fn document_is_named_after_the_renderer() {
        let document = Document::new(&TextRenderer, vec![]);

        assert_eq!(document.file_name, "shopping_cart.txt");
        assert_eq!(document.content_type, "text/plain; charset=utf-8");

        let document = Document::new(&PdfRenderer, vec![]);

        assert_eq!(document.file_name, "shopping_cart.pdf");
        assert_eq!(document.content_type, "application/pdf");
    }

    #[test]
    fn pdf_body_is_a_pdf() {
        let body = PdfRenderer.render("Ingredient list:", cart(3)).unwrap();

        assert!(body.starts_with(b"%PDF"));
        let parsed = lopdf::Document::load_mem(&body).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn long_lists_continue_on_new_pages() {
        // 37 lines fit under the heading, 39 on each following page.
        let body = PdfRenderer.render("Ingredient list:", cart(60)).unwrap();

        let parsed = lopdf::Document::load_mem(&body).unwrap();
        assert_eq!(parsed.get_pages().len(), 2);
    }

    #[test]
    fn empty_list_still_renders_the_heading_page() {
        let body = PdfRenderer.render("Ingredient list:", cart(0)).unwrap();

        assert!(body.starts_with(b"%PDF"));
    }
}
