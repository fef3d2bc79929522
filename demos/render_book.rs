#![warn(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use bookpress::catalogue::{
    validate_product_mapping, validate_with_catalogue, HttpCatalogueSource, ProductMapping,
};
use bookpress::images::ImageLoader;
use bookpress::upload::HttpArtifactStore;
use bookpress::{
    render_book, store_book, validate_printable, CompositorConfiguration, ContextError, ErrorKind,
    LayoutTemplate, Page, PrintProductSpecification,
};
use clap::Parser;
use serde::de::DeserializeOwned;

#[derive(Parser)]
#[command(version, long_about = None)]
struct CliArguments {
    #[arg(long = "pages-path", help = "Path to the pages of the book, as a JSON array")]
    pages_path: PathBuf,
    #[arg(long = "layout-path", help = "Path to the layout template in the JSON format")]
    layout_path: PathBuf,
    #[arg(
        long = "configuration-path",
        help = "Path to the configuration of the compositor, the defaults are used if absent"
    )]
    configuration_path: Option<PathBuf>,
    #[arg(
        long = "product-path",
        help = "Path to the print product specification the book is validated against"
    )]
    product_path: Option<PathBuf>,
    #[arg(
        long = "mapping-path",
        help = "Path to the product mapping, validated against the vendor catalogue when one is configured"
    )]
    mapping_path: Option<PathBuf>,
    #[arg(
        long = "book-key",
        help = "Key the artifacts are stored under, in the store configured by `storeBaseUrl`"
    )]
    book_key: Option<String>,
    #[arg(
        long = "output-directory",
        help = "Directory the cover and interior documents are written to",
        default_value = "."
    )]
    output_directory: PathBuf,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    env_logger::init();
    let arguments = CliArguments::parse();

    let configuration = match &arguments.configuration_path {
        Some(configuration_path) => CompositorConfiguration::from_path(configuration_path)?,
        None => CompositorConfiguration::default(),
    };
    let pages: Vec<Page> = read_json(&arguments.pages_path)?;
    let layout: LayoutTemplate = read_json(&arguments.layout_path)?;

    let images = ImageLoader::new(configuration.image_fetch_timeout());
    let book = render_book(&pages, &layout, &configuration, &images)?;

    for (file_name, document) in [("cover.pdf", &book.cover), ("interior.pdf", &book.interior)] {
        let output_path = arguments.output_directory.join(file_name);
        std::fs::write(&output_path, &document.bytes).map_err(|error| {
            ContextError::with_error(format!("Failed to write {:?}", output_path), &error)
        })?;
        log::info!("Wrote {} pages to {:?}", document.page_count, output_path);
    }
    print_json(&book.metadata)?;

    if let Some(product_path) = &arguments.product_path {
        let specification: PrintProductSpecification = read_json(product_path)?;
        let mut result = validate_printable(&book.metadata, &specification);

        if let Some(mapping_path) = &arguments.mapping_path {
            let mapping: ProductMapping = read_json(mapping_path)?;
            let mapping_result = match &configuration.catalogue_url {
                Some(catalogue_url) => {
                    let catalogue =
                        HttpCatalogueSource::new(catalogue_url, configuration.catalogue_timeout());
                    validate_with_catalogue(&mapping, &specification, &catalogue)
                }
                None => validate_product_mapping(&mapping, &specification, None),
            };
            result.merge(mapping_result);
        }
        print_json(&result)?;
    }

    if let Some(book_key) = &arguments.book_key {
        let store = HttpArtifactStore::from_configuration(&configuration).ok_or_else(|| {
            ContextError::with_kind(
                ErrorKind::Configuration,
                "Storing the book requires `storeBaseUrl` in the configuration",
            )
        })?;
        let published = store_book(book, &configuration, &store, book_key)?;
        print_json(&published.artifacts)?;
    }

    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ContextError> {
    let contents = std::fs::read_to_string(path).map_err(|error| {
        ContextError::with_error(format!("Failed to read {:?}", path), &error)
            .kind(ErrorKind::Configuration)
    })?;
    serde_json::from_str(&contents).map_err(|error| {
        ContextError::with_error(format!("Failed to parse {:?}", path), &error)
            .kind(ErrorKind::Configuration)
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), ContextError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|error| ContextError::with_error("Failed to serialize the output", &error))?;
    println!("{json}");
    Ok(())
}
