use std::io::Read as _;
use std::path::Path;
use std::time::Duration;

use base64::Engine as _;
use rayon::prelude::*;

use crate::error::{ContextError, ErrorKind};
use crate::pdf::PdfImage;

/// Illustrations larger than this are refused rather than read into memory.
const MAXIMUM_IMAGE_BYTES: u64 = 64 * 1024 * 1024;

/// Anything able to turn the image reference of a page into the raw bytes of the image.
pub trait ImageSource: Sync {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, ContextError>;
}

/// Resolves `http(s)://` URLs with a blocking HTTP client, `data:` URIs in place and anything else
/// as a path on the local filesystem.
pub struct ImageLoader {
    agent: ureq::Agent,
}

impl ImageLoader {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    fn fetch_remote(&self, url: &str) -> Result<Vec<u8>, ContextError> {
        let response = self.agent.get(url).call().map_err(|error| {
            ContextError::with_error(format!("Failed to fetch the image {:?}", url), &error)
                .kind(ErrorKind::Image)
        })?;

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAXIMUM_IMAGE_BYTES)
            .read_to_end(&mut bytes)
            .map_err(|error| {
                ContextError::with_error(format!("Failed to read the image {:?}", url), &error)
                    .kind(ErrorKind::Image)
            })?;

        Ok(bytes)
    }
}

impl ImageSource for ImageLoader {
    fn fetch(&self, location: &str) -> Result<Vec<u8>, ContextError> {
        if location.starts_with("data:") {
            return parse_data_uri(location).map(|(_, data)| data);
        }
        if location.starts_with("http://") || location.starts_with("https://") {
            return self.fetch_remote(location);
        }

        std::fs::read(Path::new(location)).map_err(|error| {
            ContextError::with_error(format!("Failed to read the image {:?}", location), &error)
                .kind(ErrorKind::Image)
        })
    }
}

/// Splits a `data:` URI into its media type and its decoded payload.
pub fn parse_data_uri(uri: &str) -> Result<(String, Vec<u8>), ContextError> {
    let invalid = || ContextError::with_kind(ErrorKind::Image, "Invalid data URI");
    let (header, payload) = uri
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
        .ok_or_else(invalid)?;

    let mime = header
        .split(';')
        .next()
        .filter(|mime| !mime.is_empty())
        .unwrap_or("text/plain")
        .to_string();
    let data = if header.split(';').any(|parameter| parameter == "base64") {
        base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|error| {
                ContextError::with_error("Invalid base64 payload in data URI", &error)
                    .kind(ErrorKind::Image)
            })?
    } else {
        payload.as_bytes().to_vec()
    };

    Ok((mime, data))
}

/// Decodes PNG or JPEG bytes into an image ready to be inserted into a PDF document. The format is
/// sniffed from the bytes themselves; anything other than PNG or JPEG is refused.
///
/// JPEG data is kept as it is and decoded by the PDF reader, while PNG data is expanded into RGB
/// samples plus a soft mask when the image is not fully opaque.
pub fn decode_image(data: &[u8]) -> Result<PdfImage, ContextError> {
    let format = image::guess_format(data).map_err(|error| {
        ContextError::with_error("Unable to recognize the image format", &error)
            .kind(ErrorKind::Image)
    })?;
    if !matches!(format, image::ImageFormat::Png | image::ImageFormat::Jpeg) {
        return Err(ContextError::with_kind(
            ErrorKind::Image,
            format!("Unsupported image format {:?}, expected PNG or JPEG", format),
        ));
    }

    let decoded = image::load_from_memory_with_format(data, format).map_err(|error| {
        ContextError::with_error("Failed to decode the image", &error).kind(ErrorKind::Image)
    })?;
    let (width, height) = (decoded.width(), decoded.height());

    if format == image::ImageFormat::Jpeg {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 | image::ColorType::L16 => "DeviceGray",
            _ => "DeviceRGB",
        };
        return Ok(PdfImage {
            width,
            height,
            color_space,
            bits_per_component: 8,
            filter: Some("DCTDecode"),
            data: data.to_vec(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }
    let is_opaque = alpha.iter().all(|a| *a == u8::MAX);

    Ok(PdfImage {
        width,
        height,
        color_space: "DeviceRGB",
        bits_per_component: 8,
        filter: None,
        data: rgb,
        alpha: (!is_opaque).then_some(alpha),
    })
}

/// Fetches and decodes the images of a whole document in parallel, keeping the order of the
/// locations. A failure only costs the image concerned: it is logged and its slot stays empty.
pub fn prefetch_images(
    source: &dyn ImageSource,
    locations: &[Option<&str>],
) -> Vec<Option<PdfImage>> {
    locations
        .par_iter()
        .map(|location| {
            let location = (*location)?;
            match source.fetch(location).and_then(|data| decode_image(&data)) {
                Ok(image) => Some(image),
                Err(error) => {
                    log::warn!("Skipping the image {:?}: {}", location, error);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encode_png(image: image::DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn encode_jpeg(image: image::DynamicImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        bytes
    }

    #[test]
    fn opaque_png_has_no_soft_mask() {
        let png = encode_png(image::DynamicImage::new_rgb8(3, 2));
        let decoded = decode_image(&png).unwrap();
        assert_eq!((decoded.width, decoded.height), (3, 2));
        assert_eq!(decoded.data.len(), 18);
        assert_eq!(decoded.filter, None);
        assert_eq!(decoded.alpha, None);
    }

    #[test]
    fn translucent_png_keeps_its_alpha() {
        let png = encode_png(image::DynamicImage::new_rgba8(2, 2));
        let decoded = decode_image(&png).unwrap();
        assert_eq!(decoded.alpha, Some(vec![0; 4]));
    }

    #[test]
    fn jpeg_passes_through() {
        let jpeg = encode_jpeg(image::DynamicImage::new_rgb8(8, 8));
        let decoded = decode_image(&jpeg).unwrap();
        assert_eq!(decoded.filter, Some("DCTDecode"));
        assert_eq!(decoded.data, jpeg);
        assert_eq!(decoded.color_space, "DeviceRGB");
    }

    #[test]
    fn other_formats_are_refused() {
        let error = decode_image(b"GIF89a\x01\x00\x01\x00").unwrap_err();
        assert_eq!(error.kind, ErrorKind::Image);
        assert!(decode_image(b"definitely not an image").is_err());
    }

    #[test]
    fn parses_data_uris() {
        let (mime, data) = parse_data_uri("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data, b"hello");

        let (mime, data) = parse_data_uri("data:,plain").unwrap();
        assert_eq!(mime, "text/plain");
        assert_eq!(data, b"plain");

        assert!(parse_data_uri("data:image/png;base64").is_err());
        assert!(parse_data_uri("data:image/png;base64,!!!").is_err());
    }

    #[test]
    fn prefetching_keeps_the_order_and_skips_failures() {
        let png = encode_png(image::DynamicImage::new_rgb8(1, 1));
        let data_uri = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(&png)
        );
        let loader = ImageLoader::new(Duration::from_secs(1));
        let images = prefetch_images(
            &loader,
            &[
                Some(data_uri.as_str()),
                None,
                Some("/nonexistent/owl.png"),
                Some(data_uri.as_str()),
            ],
        );
        assert_eq!(images.len(), 4);
        assert!(images[0].is_some());
        assert!(images[1].is_none());
        assert!(images[2].is_none());
        assert!(images[3].is_some());
    }
}
