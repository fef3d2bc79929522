use crate::book::{LayoutTemplate, Page, PageType, PageTypeLayout};
use crate::configuration::CompositorConfiguration;
use crate::error::{ContextError, ErrorKind};
use crate::images::{prefetch_images, ImageSource};
use crate::pdf::PdfDocument;
use crate::renderer::PageRenderer;
use crate::validation::PrintableMetadata;

/// The number of pages the interior is expected to be a multiple of, one printed sheet folded twice.
pub const SIGNATURE_PAGE_COUNT: usize = 4;

/// A finished print artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub page_count: usize,
}

/// Groups the pages of a book into its two print artifacts, the cover and the interior, and
/// renders each of them into a PDF document.
pub struct DocumentAssembler<'a> {
    layout: &'a LayoutTemplate,
    configuration: &'a CompositorConfiguration,
    images: &'a dyn ImageSource,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(
        layout: &'a LayoutTemplate,
        configuration: &'a CompositorConfiguration,
        images: &'a dyn ImageSource,
    ) -> Self {
        Self {
            layout,
            configuration,
            images,
        }
    }

    /// Renders the front cover followed by the back cover.
    pub fn render_cover(&self, pages: &[Page]) -> Result<RenderedDocument, ContextError> {
        let [front, back] = select_cover_pages(pages)?;
        self.render_document(
            "cover",
            vec![
                (front, self.layout.cover_layout()),
                (back, self.layout.back_cover_layout()),
            ],
        )
    }

    /// Renders the front endpaper, the title and interior pages in the order of their page number,
    /// then the back endpaper.
    pub fn render_interior(&self, pages: &[Page]) -> Result<RenderedDocument, ContextError> {
        let interior_pages = select_interior_pages(pages)?;
        let page_count = interior_pages.len();
        if page_count % SIGNATURE_PAGE_COUNT != 0 {
            if self.configuration.strict_interior_parity {
                return Err(ContextError::with_kind(
                    ErrorKind::InteriorParity,
                    format!(
                        "The interior has {} pages, which is not a multiple of {}",
                        page_count, SIGNATURE_PAGE_COUNT
                    ),
                ));
            }
            log::warn!(
                "The interior has {} pages, which is not a multiple of {}",
                page_count,
                SIGNATURE_PAGE_COUNT
            );
        }

        let inside_layout = self.layout.inside_layout();
        self.render_document(
            "interior",
            interior_pages
                .into_iter()
                .map(|page| (page, inside_layout.clone()))
                .collect(),
        )
    }

    fn render_document(
        &self,
        document_name: &str,
        pages: Vec<(&Page, PageTypeLayout)>,
    ) -> Result<RenderedDocument, ContextError> {
        let identifier = format!("{}-{}", self.configuration.document_identifier, document_name);
        let mut document = PdfDocument::new(identifier.clone());
        document.title = format!("{} ({})", self.layout.name, document_name);

        // Title pages never show their illustration
        let image_locations: Vec<Option<&str>> = pages
            .iter()
            .map(|(page, _)| match page.page_type {
                PageType::TitlePage => None,
                _ => page.image_url.as_deref(),
            })
            .collect();
        let images = prefetch_images(self.images, &image_locations);

        let renderer = PageRenderer::new(self.layout, self.configuration.rounding);
        for ((page, page_layout), image) in pages.iter().zip(images.iter()) {
            renderer.render_page(&mut document, page, page_layout, image.as_ref())?;
        }

        let page_count = document.page_count();
        document.write_all(format!("{identifier}-{page_count}"))?;
        document.optimize();
        let bytes = document.save_to_bytes()?;
        log::info!(
            "Rendered the {} document: {} pages, {} bytes",
            document_name,
            page_count,
            bytes.len()
        );

        Ok(RenderedDocument { bytes, page_count })
    }
}

/// Picks the front and the back cover out of the pages of a book.
pub fn select_cover_pages(pages: &[Page]) -> Result<[&Page; 2], ContextError> {
    let find = |page_type: PageType| pages.iter().find(|page| page.page_type == page_type);
    let missing = match (find(PageType::CoverFront), find(PageType::CoverBack)) {
        (Some(front), Some(back)) => return Ok([front, back]),
        (None, None) => "Both the front and the back cover are",
        (None, Some(_)) => "The front cover is",
        (Some(_), None) => "The back cover is",
    };

    Err(ContextError::with_kind(
        ErrorKind::IncompleteCoverSet,
        format!("{missing} missing"),
    ))
}

/// Picks the pages of the interior in their printing order.
pub fn select_interior_pages(pages: &[Page]) -> Result<Vec<&Page>, ContextError> {
    let mut body: Vec<&Page> = pages
        .iter()
        .filter(|page| matches!(page.page_type, PageType::Interior | PageType::TitlePage))
        .collect();
    if !body.iter().any(|page| page.page_type == PageType::Interior) {
        return Err(ContextError::with_kind(
            ErrorKind::NoInteriorPages,
            "There are no interior pages to render",
        ));
    }
    body.sort_by_key(|page| page.page_number);

    let endpaper = |page_type: PageType| pages.iter().find(|page| page.page_type == page_type);
    let mut interior_pages = Vec::with_capacity(body.len() + 2);
    interior_pages.extend(endpaper(PageType::EndpaperFront));
    interior_pages.extend(body);
    interior_pages.extend(endpaper(PageType::EndpaperBack));

    Ok(interior_pages)
}

/// Describes the two artifacts of a book the way the print specification validator expects them.
pub fn printable_metadata(
    layout: &LayoutTemplate,
    configuration: &CompositorConfiguration,
    cover: &RenderedDocument,
    interior: &RenderedDocument,
) -> PrintableMetadata {
    let leaves_per_spread = layout.leaves_per_spread.max(1) as usize;
    PrintableMetadata {
        dpi: configuration.dpi,
        trim_size: layout.trim_size(),
        total_page_count: (cover.page_count + interior.page_count) as u32,
        cover_page_count: cover.page_count as u32,
        interior_page_count: interior.page_count as u32,
        spread_count: interior.page_count.div_ceil(leaves_per_spread) as u32,
        has_separate_pdfs: true,
        file_size_bytes: Some(cover.bytes.len().max(interior.bytes.len()) as u64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_types(pages: &[&Page]) -> Vec<(PageType, u32)> {
        pages
            .iter()
            .map(|page| (page.page_type, page.page_number))
            .collect()
    }

    #[test]
    fn both_covers_are_required() {
        let pages = vec![
            Page::new(PageType::CoverFront, 0),
            Page::new(PageType::Interior, 1),
        ];
        let error = select_cover_pages(&pages).unwrap_err();
        assert_eq!(error.kind, ErrorKind::IncompleteCoverSet);
        assert_eq!(error.context, "The back cover is missing");

        let error = select_cover_pages(&[]).unwrap_err();
        assert_eq!(error.context, "Both the front and the back cover are missing");
    }

    #[test]
    fn interior_pages_are_ordered_between_the_endpapers() {
        let pages = vec![
            Page::new(PageType::EndpaperBack, 0),
            Page::new(PageType::Interior, 3),
            Page::new(PageType::CoverFront, 0),
            Page::new(PageType::Interior, 2),
            Page::new(PageType::TitlePage, 1),
            Page::new(PageType::EndpaperFront, 0),
        ];
        let interior_pages = select_interior_pages(&pages).unwrap();
        assert_eq!(
            page_types(&interior_pages),
            vec![
                (PageType::EndpaperFront, 0),
                (PageType::TitlePage, 1),
                (PageType::Interior, 2),
                (PageType::Interior, 3),
                (PageType::EndpaperBack, 0),
            ]
        );
    }

    #[test]
    fn title_pages_alone_are_not_an_interior() {
        let pages = vec![
            Page::new(PageType::TitlePage, 1),
            Page::new(PageType::EndpaperFront, 0),
        ];
        let error = select_interior_pages(&pages).unwrap_err();
        assert_eq!(error.kind, ErrorKind::NoInteriorPages);
    }

    #[test]
    fn metadata_counts_spreads_and_pages() {
        let layout: LayoutTemplate = serde_json::from_str(
            r#"{"leafWidth": 8.5, "leafHeight": 11, "font": "Helvetica", "fontSize": 18}"#,
        )
        .unwrap();
        let cover = RenderedDocument {
            bytes: vec![0; 10],
            page_count: 2,
        };
        let interior = RenderedDocument {
            bytes: vec![0; 20],
            page_count: 24,
        };
        let metadata =
            printable_metadata(&layout, &CompositorConfiguration::default(), &cover, &interior);
        assert_eq!(metadata.spread_count, 12);
        assert_eq!(metadata.total_page_count, 26);
        assert_eq!(metadata.trim_size, "8.5 x 11 inches");
        assert_eq!(metadata.dpi, 300);
        assert_eq!(metadata.file_size_bytes, Some(20));
    }
}
