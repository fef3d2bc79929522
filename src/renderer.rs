use crate::book::{LayoutTemplate, Page, PageType, PageTypeLayout, TextBox};
use crate::error::ContextError;
use crate::fonts::{FontMetrics, StandardFont};
use crate::pdf::{PdfDocument, PdfImage, PdfRect};
use crate::shapes::{cover_placement, rounded_rectangle, CornerRounding};
use crate::text::{title_lines, wrap_paragraphs};
use crate::units::{
    contrasting_text_color, hex_to_unit_rgb, to_points, top_left_to_bottom_left, UnitRgb, BLACK,
};

/// The inset between the edges of a text box and its text, in points.
pub const TEXT_BOX_PADDING: f32 = 10.0;
/// Line height of the text of a text box, relative to the font size.
pub const TEXT_LINE_HEIGHT_RATIO: f32 = 1.4;
/// Line height of the text of a title page, relative to the font size.
pub const TITLE_LINE_HEIGHT_RATIO: f32 = 1.6;

/// A line of text whose baseline starts at `position`, in points of the document space.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedLine {
    pub text: String,
    pub position: [f32; 2],
}

/// Draws single pages of a book into a PDF document, all of them sharing the geometry and the font
/// of one layout template.
pub struct PageRenderer<'a> {
    layout: &'a LayoutTemplate,
    font: StandardFont,
    rounding: CornerRounding,
}

impl<'a> PageRenderer<'a> {
    pub fn new(layout: &'a LayoutTemplate, rounding: CornerRounding) -> Self {
        Self {
            layout,
            font: StandardFont::from_name(&layout.font),
            rounding,
        }
    }

    fn page_width(&self) -> f32 {
        self.layout.page_width_points()
    }

    fn page_height(&self) -> f32 {
        self.layout.page_height_points()
    }

    /// Appends one page to the document: title pages get their text centered on the whole page,
    /// every other page gets its illustration below its text box.
    ///
    /// # Arguments
    ///
    /// * `document` - The document the page is appended to.
    /// * `page` - The content of the page.
    /// * `page_layout` - The boxes of the page type the page belongs to.
    /// * `image` - The already decoded illustration of the page, if it could be loaded.
    pub fn render_page(
        &self,
        document: &mut PdfDocument,
        page: &Page,
        page_layout: &PageTypeLayout,
        image: Option<&PdfImage>,
    ) -> Result<(), ContextError> {
        log::debug!(
            "Rendering the {:?} page number {}",
            page.page_type,
            page.page_number
        );

        if page.page_type == PageType::TitlePage {
            let (page_index, layer_index) =
                document.add_page_with_layer(self.page_width(), self.page_height(), "Title");
            let color = self.title_text_color(page_layout.text_box.as_ref())?;
            for line in self.title_page_lines(page.text().unwrap_or_default()) {
                document.write_text_to_layer_in_page(
                    page_index,
                    layer_index,
                    color,
                    &line.text,
                    self.font,
                    self.layout.font_size,
                    line.position,
                )?;
            }
            return Ok(());
        }

        let (page_index, image_layer) =
            document.add_page_with_layer(self.page_width(), self.page_height(), "Illustration");
        if let Some(image) = image {
            self.draw_illustration(document, page_index, image_layer, page_layout, image)?;
        }

        let Some(text) = page.text() else {
            return Ok(());
        };
        let text_box = page_layout.text_box.clone().unwrap_or_else(|| {
            TextBox::one_inch_margin(self.layout.leaf_width, self.layout.leaf_height)
        });
        let bounds = self.box_bounds(
            text_box.x,
            text_box.y,
            text_box.width,
            text_box.height,
        );

        if let Some(background_color) = &text_box.background_color {
            let background_layer = document.add_layer_to_page(page_index, "Text box")?;
            let color = hex_to_unit_rgb(background_color)?;
            let radius = to_points(text_box.border_radius.unwrap_or(0.0));
            for shape in rounded_rectangle(bounds, radius, self.rounding) {
                document.fill_shape_in_layer(page_index, background_layer, color, &shape)?;
            }
        }

        let text_layer = document.add_layer_to_page(page_index, "Text")?;
        let color = self.text_color(Some(&text_box))?;
        for line in self.text_box_lines(text, bounds) {
            document.write_text_to_layer_in_page(
                page_index,
                text_layer,
                color,
                &line.text,
                self.font,
                self.layout.font_size,
                line.position,
            )?;
        }

        Ok(())
    }

    fn draw_illustration(
        &self,
        document: &mut PdfDocument,
        page_index: usize,
        layer_index: usize,
        page_layout: &PageTypeLayout,
        image: &PdfImage,
    ) -> Result<(), ContextError> {
        let (placement, clip) = match &page_layout.image_box {
            Some(image_box) => (
                self.box_bounds(image_box.x, image_box.y, image_box.width, image_box.height),
                None,
            ),
            None => {
                let page = PdfRect {
                    x: 0.0,
                    y: 0.0,
                    width: self.page_width(),
                    height: self.page_height(),
                };
                (cover_placement(image.width, image.height, page), Some(page))
            }
        };

        let image = document.add_image(image);
        document.draw_image_to_layer_in_page(page_index, layer_index, &image, placement, clip)
    }

    /// Maps a box of the layout space (inches, from the top-left corner) onto the document space.
    fn box_bounds(&self, x: f32, y: f32, width: f32, height: f32) -> PdfRect {
        let height = to_points(height);
        PdfRect {
            x: to_points(x),
            y: top_left_to_bottom_left(self.page_height(), to_points(y), height),
            width: to_points(width),
            height,
        }
    }

    /// The explicit text color, else the color contrasting with the background, else black.
    fn text_color(&self, text_box: Option<&TextBox>) -> Result<UnitRgb, ContextError> {
        let Some(text_box) = text_box else {
            return Ok(BLACK);
        };
        if let Some(text_color) = &text_box.text_color {
            return hex_to_unit_rgb(text_color);
        }
        if let Some(background_color) = &text_box.background_color {
            return contrasting_text_color(background_color);
        }

        Ok(BLACK)
    }

    /// Title pages draw no box, so there is no background to contrast with.
    fn title_text_color(&self, text_box: Option<&TextBox>) -> Result<UnitRgb, ContextError> {
        match text_box.and_then(|text_box| text_box.text_color.as_ref()) {
            Some(text_color) => hex_to_unit_rgb(text_color),
            None => Ok(BLACK),
        }
    }

    /// Wraps the text to the inner width of the box and positions its lines from the top of the box
    /// down, each centered horizontally. Lines whose baseline would fall within the bottom padding
    /// of the box are dropped, together with all the lines that follow them.
    pub fn text_box_lines(&self, text: &str, bounds: PdfRect) -> Vec<PositionedLine> {
        let font_size = self.layout.font_size;
        let inner_width = bounds.width - 2.0 * TEXT_BOX_PADDING;
        let line_height = font_size * TEXT_LINE_HEIGHT_RATIO;
        let top = bounds.y + bounds.height;
        let lowest_baseline = bounds.y + TEXT_BOX_PADDING;

        let mut positioned_lines = Vec::new();
        for (index, line) in wrap_paragraphs(text, &self.font, font_size, inner_width)
            .into_iter()
            .enumerate()
        {
            let baseline = top - TEXT_BOX_PADDING - font_size - index as f32 * line_height;
            if baseline < lowest_baseline {
                log::debug!("Clipping the text overflowing its box at {:?}", line);
                break;
            }
            if line.is_empty() {
                continue;
            }

            let width = self.font.width_of(&line, font_size);
            positioned_lines.push(PositionedLine {
                position: [
                    bounds.x + TEXT_BOX_PADDING + (inner_width - width) / 2.0,
                    baseline,
                ],
                text: line,
            });
        }

        positioned_lines
    }

    /// Positions the lines of a title page as one block centered on the middle of the page, each
    /// line centered horizontally by its own width.
    pub fn title_page_lines(&self, text: &str) -> Vec<PositionedLine> {
        let font_size = self.layout.font_size;
        let line_height = font_size * TITLE_LINE_HEIGHT_RATIO;
        let lines = title_lines(text);
        let block_height = lines.len() as f32 * line_height;
        let block_top = self.page_height() / 2.0 + block_height / 2.0;

        lines
            .into_iter()
            .enumerate()
            .map(|(index, line)| {
                let width = self.font.width_of(&line, font_size);
                PositionedLine {
                    position: [
                        (self.page_width() - width) / 2.0,
                        block_top - index as f32 * line_height - font_size,
                    ],
                    text: line,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::{LayoutBox, PageLayouts};

    fn courier_layout() -> LayoutTemplate {
        LayoutTemplate {
            name: "square".into(),
            leaf_width: 8.0,
            leaf_height: 8.0,
            font: "Courier".into(),
            font_size: 10.0,
            leaves_per_spread: 2,
            page_layouts: PageLayouts::default(),
        }
    }

    fn text_box(background_color: Option<&str>, text_color: Option<&str>) -> TextBox {
        TextBox {
            x: 1.0,
            y: 1.0,
            width: 2.0,
            height: 1.0,
            background_color: background_color.map(str::to_string),
            text_color: text_color.map(str::to_string),
            border_radius: Some(0.1),
        }
    }

    #[test]
    fn text_color_follows_the_resolution_order() {
        let layout = courier_layout();
        let renderer = PageRenderer::new(&layout, CornerRounding::Overlap);
        assert_eq!(renderer.text_color(None).unwrap(), BLACK);
        assert_eq!(
            renderer.text_color(Some(&text_box(None, None))).unwrap(),
            BLACK
        );
        assert_eq!(
            renderer
                .text_color(Some(&text_box(Some("#000000"), None)))
                .unwrap(),
            [1.0, 1.0, 1.0]
        );
        assert_eq!(
            renderer
                .text_color(Some(&text_box(Some("#000000"), Some("#ff0000"))))
                .unwrap(),
            [1.0, 0.0, 0.0]
        );
        assert!(renderer
            .text_color(Some(&text_box(Some("navy"), None)))
            .is_err());
    }

    #[test]
    fn title_pages_ignore_the_background_of_the_undrawn_box() {
        let mut layout = courier_layout();
        layout.page_layouts.inside = Some(PageTypeLayout {
            image_box: None,
            text_box: Some(text_box(Some("#1d3557"), None)),
        });
        let renderer = PageRenderer::new(&layout, CornerRounding::Overlap);
        let inside = layout.inside_layout();
        assert_eq!(
            renderer.title_text_color(inside.text_box.as_ref()).unwrap(),
            BLACK
        );
        assert_eq!(
            renderer
                .title_text_color(Some(&text_box(Some("#1d3557"), Some("#ff0000"))))
                .unwrap(),
            [1.0, 0.0, 0.0]
        );

        let mut document = PdfDocument::new("test".into());
        renderer
            .render_page(
                &mut document,
                &Page::new(PageType::TitlePage, 1).with_text("The Owl"),
                &inside,
                None,
            )
            .unwrap();
        let colors: Vec<Vec<f32>> = document.pages[0].layers[0]
            .operations
            .iter()
            .filter(|operation| operation.operator == "rg")
            .map(|operation| {
                operation
                    .operands
                    .iter()
                    .map(|operand| operand.as_float().unwrap())
                    .collect()
            })
            .collect();
        assert_eq!(colors, vec![vec![0.0, 0.0, 0.0]]);
    }

    #[test]
    fn text_is_anchored_to_the_top_and_clipped_at_the_bottom() {
        let layout = courier_layout();
        let renderer = PageRenderer::new(&layout, CornerRounding::Overlap);
        // 144 x 72 points: an inner width of 124 points is 20 Courier characters at size 10
        let bounds = PdfRect {
            x: 72.0,
            y: 360.0,
            width: 144.0,
            height: 72.0,
        };
        let text = "aaaa bbbb cccc dddd eeee ffff gggg hhhh iiii jjjj kkkk llll mmmm nnnn oooo pppp";
        let lines = renderer.text_box_lines(text, bounds);

        // Baselines at 412, 398, 384 and 370: the fifth line would sit at 356, below 370
        let baselines: Vec<f32> = lines.iter().map(|line| line.position[1]).collect();
        assert_eq!(baselines, vec![412.0, 398.0, 384.0, 370.0]);
        assert_eq!(lines[0].text, "aaaa bbbb cccc dddd");
        // 19 characters are 114 points wide, leaving 5 points on each side
        assert_eq!(lines[0].position[0], 87.0);
    }

    #[test]
    fn blank_paragraphs_only_take_room() {
        let layout = courier_layout();
        let renderer = PageRenderer::new(&layout, CornerRounding::Overlap);
        let bounds = PdfRect {
            x: 0.0,
            y: 0.0,
            width: 200.0,
            height: 200.0,
        };
        let lines = renderer.text_box_lines("one\n\ntwo", bounds);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].position[1] - lines[1].position[1], 28.0);
    }

    #[test]
    fn title_lines_are_centered_on_the_page() {
        let layout = courier_layout();
        let renderer = PageRenderer::new(&layout, CornerRounding::Overlap);
        let lines = renderer.title_page_lines("  Owl  \n\nby Ada\n");
        assert_eq!(lines.len(), 2);

        // A block of two 16 point lines centered on 288 starts at 304
        assert_eq!(lines[0].position, [(576.0 - 18.0) / 2.0, 294.0]);
        assert_eq!(lines[1].position, [(576.0 - 36.0) / 2.0, 278.0]);
        assert!(renderer.title_page_lines(" \n ").is_empty());
    }

    #[test]
    fn renders_one_page_per_call() {
        let mut layout = courier_layout();
        layout.page_layouts.inside = Some(PageTypeLayout {
            image_box: Some(LayoutBox {
                x: 0.5,
                y: 0.5,
                width: 7.0,
                height: 4.0,
            }),
            text_box: Some(text_box(Some("#336699"), None)),
        });
        let renderer = PageRenderer::new(&layout, CornerRounding::Path);
        let image = PdfImage {
            width: 1,
            height: 1,
            color_space: "DeviceRGB",
            bits_per_component: 8,
            filter: None,
            data: vec![0, 0, 0],
            alpha: None,
        };

        let mut document = PdfDocument::new("test".into());
        renderer
            .render_page(
                &mut document,
                &Page::new(PageType::Interior, 1).with_text("Hello"),
                &layout.inside_layout(),
                Some(&image),
            )
            .unwrap();
        renderer
            .render_page(
                &mut document,
                &Page::new(PageType::TitlePage, 0).with_text("Title"),
                &layout.inside_layout(),
                Some(&image),
            )
            .unwrap();
        assert_eq!(document.page_count(), 2);
        assert_eq!(document.pages[0].layers.len(), 3);
        assert_eq!(document.pages[1].layers.len(), 1);
    }
}
