use serde::{Deserialize, Serialize};

use crate::assembler::{printable_metadata, DocumentAssembler, RenderedDocument};
use crate::book::{LayoutTemplate, Page};
use crate::configuration::CompositorConfiguration;
use crate::error::ContextError;
use crate::images::ImageSource;
use crate::upload::{upload_both, ArtifactStore, RetryPolicy, StoredArtifacts};
use crate::validation::PrintableMetadata;

/// Both artifacts of a book, ready to be stored, with their description.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBook {
    pub cover: RenderedDocument,
    pub interior: RenderedDocument,
    pub metadata: PrintableMetadata,
}

/// A book whose artifacts have both been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedBook {
    pub artifacts: StoredArtifacts,
    pub metadata: PrintableMetadata,
}

/// The outcomes of rendering the two documents of a book. A structural failure of one document
/// leaves the other one intact.
#[derive(Debug, Clone)]
pub struct RenderedDocuments {
    pub cover: Result<RenderedDocument, ContextError>,
    pub interior: Result<RenderedDocument, ContextError>,
}

/// Renders the cover and the interior of a book concurrently, both always run to completion.
pub fn render_documents(
    pages: &[Page],
    layout: &LayoutTemplate,
    configuration: &CompositorConfiguration,
    images: &dyn ImageSource,
) -> RenderedDocuments {
    let assembler = DocumentAssembler::new(layout, configuration, images);
    let (cover, interior) = rayon::join(
        || assembler.render_cover(pages),
        || assembler.render_interior(pages),
    );

    RenderedDocuments { cover, interior }
}

/// Renders the cover and the interior of a book concurrently. The book fails as a whole if either
/// of them failed.
pub fn render_book(
    pages: &[Page],
    layout: &LayoutTemplate,
    configuration: &CompositorConfiguration,
    images: &dyn ImageSource,
) -> Result<RenderedBook, ContextError> {
    let documents = render_documents(pages, layout, configuration, images);
    let (cover, interior) = match (documents.cover, documents.interior) {
        (Ok(cover), Ok(interior)) => (cover, interior),
        (Err(error), Ok(interior)) => {
            log::warn!(
                "The interior rendered with {} pages, but the cover failed",
                interior.page_count
            );
            return Err(error);
        }
        (Ok(cover), Err(error)) => {
            log::warn!(
                "The cover rendered with {} pages, but the interior failed",
                cover.page_count
            );
            return Err(error);
        }
        (Err(cover_error), Err(interior_error)) => {
            log::warn!("Failed to render the interior as well: {}", interior_error);
            return Err(cover_error);
        }
    };

    let metadata = printable_metadata(layout, configuration, &cover, &interior);
    Ok(RenderedBook {
        cover,
        interior,
        metadata,
    })
}

/// Stores both artifacts of an already rendered book under the given key.
pub fn store_book(
    book: RenderedBook,
    configuration: &CompositorConfiguration,
    store: &dyn ArtifactStore,
    book_key: &str,
) -> Result<PublishedBook, ContextError> {
    let artifacts = upload_both(
        store,
        &RetryPolicy::from(&configuration.upload),
        book_key,
        &book.cover.bytes,
        &book.interior.bytes,
    )?;
    log::info!(
        "Stored the book {} at {} and {}",
        book_key,
        artifacts.cover_url,
        artifacts.interior_url
    );

    Ok(PublishedBook {
        artifacts,
        metadata: book.metadata,
    })
}

/// Renders a book and stores both of its artifacts under the given key.
pub fn publish_book(
    pages: &[Page],
    layout: &LayoutTemplate,
    configuration: &CompositorConfiguration,
    images: &dyn ImageSource,
    store: &dyn ArtifactStore,
    book_key: &str,
) -> Result<PublishedBook, ContextError> {
    let book = render_book(pages, layout, configuration, images)?;
    store_book(book, configuration, store, book_key)
}
