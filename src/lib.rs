//! Bookpress turns the pages of a picture book into the two print-ready PDF documents a print vendor
//! expects, the cover and the interior, laid out according to a physical layout template. It then
//! checks the resulting artifacts and the chosen product against the production constraints of the
//! vendor before they are submitted.
//!
//! The usual entry point is `job::render_book` (or `job::publish_book` to also store the artifacts),
//! followed by `validation::validate_printable` on the metadata it returns. Everything below it is
//! public as well, down to the `PdfDocument` which writes the actual PDF objects.

/// The pages of a book and the layout templates they are rendered with.
///
/// Both are plain data deserialized from camelCase JSON. The layout template measures everything in
/// inches from the top-left corner of a leaf, the way page designers think about it; the conversion
/// into the document space of PDF happens in the `renderer` module through the `units` module.
pub mod book;

/// The groups of pages which make up the two artifacts of a book.
///
/// # Introduction
///
/// The cover document is made of exactly the front and the back cover, in this order. The interior
/// document starts with the front endpaper when there is one, continues with the title and interior
/// pages sorted by their page number and ends with the back endpaper. A book without both covers or
/// without a single interior page cannot be assembled at all.
///
/// An interior whose page count is not a multiple of four can't be folded into whole sheets. This
/// is only logged unless `strictInteriorParity` is set in the configuration: the validator knows the
/// binding and is the one enforcing the actual page count rules.
pub mod assembler;

/// Catalogue-aware validation of the product mapping of a book, degrading to a fallback table of
/// weights when the vendor catalogue can't be reached.
pub mod catalogue;

/// The configuration of the compositor, loaded from a JSON file.
pub mod configuration;

/// This module contains the `ContextError` type which is the error type used throughout this library.
///
/// The reason why this type has been implemented is to uniform the error reporting, while still
/// letting callers branch on the few failures they can act upon through its `ErrorKind`: a missing
/// cover, a book without interior pages, a malformed color or trim size, a transport failure.
///
/// The `ContextError` type is always returned from a `Result` type, which means that the end user can expect to obtain an explanation
/// whenever a function returns an error. If an error happened in a function which was called inside a function of this library,
/// then the user can expect to also obtain information about this propagated error.
///
/// It can also be serialized, so that the reason of a failed render can be persisted as it is.
pub mod error;

/// Advance widths of the standard PDF faces, used to wrap and center text.
pub mod fonts;

/// Fetching the illustrations of a book and decoding them into PDF images.
///
/// Only PNG and JPEG are supported. A missing or broken illustration never fails a book: the page
/// is rendered without it and the failure is logged.
pub mod images;

/// Rendering and storing a whole book, the cover and the interior running concurrently.
pub mod job;

/// The module were the `PdfDocument` interface for working with PDF documents is presented.
///
/// # Introduction
///
/// The main component of this module is the struct `PdfDocument`. For it, I have implemented different convenience functions
/// such as `add_page_with_layer`, `write_text_to_layer_in_page`, `add_image`, `fill_shape_in_layer`, `write_all` and
/// `save_to_bytes` which allow the end user to interact with a PDF document in a meaningful way, while keeping all the
/// complexity hidden below a curtain of private methods.
///
/// Every page is made of layers, each of them an optional content group painted in order, so that the illustration,
/// the background of the text box and the text of a page can be told apart in any PDF viewer.
///
/// The documents are reproducible: their identifier and creation date are chosen by the caller instead of being random.
pub mod pdf;

/// Rendering of a single page: the illustration, the background of the text box and the wrapped
/// text, or the centered lines of a title page.
pub mod renderer;

/// Geometry of the filled shapes and of the placement of images.
pub mod shapes;

/// Greedy word wrapping.
pub mod text;

/// Conversions between inches and points, between the two vertical orientations and between color notations.
pub mod units;

/// Storing the rendered artifacts, retrying transient transport failures.
pub mod upload;

/// The print specification validator.
pub mod validation;

pub use assembler::{DocumentAssembler, RenderedDocument};
pub use book::{LayoutTemplate, Page, PageType};
pub use configuration::CompositorConfiguration;
pub use error::{ContextError, ErrorKind};
pub use job::{
    publish_book, render_book, render_documents, store_book, PublishedBook, RenderedBook,
    RenderedDocuments,
};
pub use validation::{validate_printable, PrintProductSpecification, PrintableMetadata, ValidationResult};
