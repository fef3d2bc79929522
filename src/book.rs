use serde::{Deserialize, Serialize};

use crate::units::to_points;

/// The role a page plays in the printed book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    CoverFront,
    CoverBack,
    EndpaperFront,
    EndpaperBack,
    Interior,
    TitlePage,
}

/// One unit of print content, as supplied by the story authoring side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub page_type: PageType,
    /// The ordering key of the page, only meaningful among interior and title pages.
    #[serde(default)]
    pub page_number: u32,
    /// Plain text, with every placeholder already resolved.
    #[serde(default)]
    pub display_text: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Page {
    pub fn new(page_type: PageType, page_number: u32) -> Self {
        Self {
            page_type,
            page_number,
            display_text: None,
            image_url: None,
        }
    }

    pub fn with_text<S: Into<String>>(mut self, text: S) -> Self {
        self.display_text = Some(text.into());
        self
    }

    pub fn with_image<S: Into<String>>(mut self, url: S) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// The display text, if there is any that isn't just whitespace.
    pub fn text(&self) -> Option<&str> {
        self.display_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

/// A rectangle of the layout space: inches, measured from the top-left corner of the page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// The text area of a page type, with its optional decorations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub background_color: Option<String>,
    #[serde(default)]
    pub text_color: Option<String>,
    /// The corner radius of the background, in inches.
    #[serde(default)]
    pub border_radius: Option<f32>,
}

impl TextBox {
    /// The box used when a page type has no text box of its own: the whole page inset by one inch.
    pub fn one_inch_margin(leaf_width: f32, leaf_height: f32) -> Self {
        Self {
            x: 1.0,
            y: 1.0,
            width: (leaf_width - 2.0).max(0.0),
            height: (leaf_height - 2.0).max(0.0),
            background_color: None,
            text_color: None,
            border_radius: None,
        }
    }
}

/// How the pages of one type are laid out. A missing `image_box` means the illustration covers the
/// whole page, a missing `text_box` means the one inch margin box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageTypeLayout {
    #[serde(default)]
    pub image_box: Option<LayoutBox>,
    #[serde(default)]
    pub text_box: Option<TextBox>,
}

/// The page-type layouts of a template, keyed the way the templates name them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageLayouts {
    #[serde(default)]
    pub cover: Option<PageTypeLayout>,
    #[serde(default)]
    pub back_cover: Option<PageTypeLayout>,
    #[serde(default)]
    pub inside: Option<PageTypeLayout>,
}

/// The physical geometry shared by all the pages of one artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutTemplate {
    #[serde(default)]
    pub name: String,
    /// Width of a leaf in inches.
    pub leaf_width: f32,
    /// Height of a leaf in inches.
    pub leaf_height: f32,
    pub font: String,
    pub font_size: f32,
    #[serde(default = "default_leaves_per_spread")]
    pub leaves_per_spread: u32,
    #[serde(default)]
    pub page_layouts: PageLayouts,
}

fn default_leaves_per_spread() -> u32 {
    2
}

impl LayoutTemplate {
    pub fn page_width_points(&self) -> f32 {
        to_points(self.leaf_width)
    }

    pub fn page_height_points(&self) -> f32 {
        to_points(self.leaf_height)
    }

    /// The trim size as the print side writes it, such as `8.5 x 11 inches`.
    pub fn trim_size(&self) -> String {
        format!("{} x {} inches", self.leaf_width, self.leaf_height)
    }

    pub fn cover_layout(&self) -> PageTypeLayout {
        self.page_layouts.cover.clone().unwrap_or_default()
    }

    pub fn back_cover_layout(&self) -> PageTypeLayout {
        self.page_layouts.back_cover.clone().unwrap_or_default()
    }

    pub fn inside_layout(&self) -> PageTypeLayout {
        self.page_layouts.inside.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_pages_and_templates_from_camel_case_json() {
        let pages: Vec<Page> = serde_json::from_str(
            r#"[
                {"pageType": "cover_front", "displayText": "Owl", "imageUrl": "https://cdn/owl.png"},
                {"pageType": "interior", "pageNumber": 3},
                {"pageType": "title_page", "pageNumber": 1, "displayText": "Owl\nby Ada"}
            ]"#,
        )
        .unwrap();
        assert_eq!(pages[0].page_type, PageType::CoverFront);
        assert_eq!(pages[1].page_number, 3);
        assert_eq!(pages[1].text(), None);
        assert_eq!(pages[2].text(), Some("Owl\nby Ada"));

        let layout: LayoutTemplate = serde_json::from_str(
            r##"{
                "leafWidth": 8.5, "leafHeight": 11, "font": "Helvetica", "fontSize": 18,
                "pageLayouts": {
                    "inside": {"textBox": {"x": 0.5, "y": 8, "width": 7.5, "height": 2.5,
                               "backgroundColor": "#ffffff", "borderRadius": 0.25}},
                    "backCover": {"imageBox": {"x": 1, "y": 1, "width": 6.5, "height": 6.5}}
                }
            }"##,
        )
        .unwrap();
        assert_eq!(layout.leaves_per_spread, 2);
        assert_eq!(layout.trim_size(), "8.5 x 11 inches");
        assert_eq!(layout.page_width_points(), 612.0);
        assert_eq!(layout.cover_layout(), PageTypeLayout::default());
        assert!(layout.back_cover_layout().image_box.is_some());
        let text_box = layout.inside_layout().text_box.unwrap();
        assert_eq!(text_box.border_radius, Some(0.25));
    }

    #[test]
    fn blank_text_counts_as_no_text() {
        let page = Page::new(PageType::Interior, 1).with_text("   \n ");
        assert_eq!(page.text(), None);
    }
}
