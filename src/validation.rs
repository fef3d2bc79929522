//! The pre-submission gate of the print vendor: checks the metadata of the rendered artifacts
//! against the production constraints of a print product. Findings are never errors of the
//! validator itself, they are accumulated into a `ValidationResult`.

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ErrorKind};
use crate::units::{inches_to_millimeters, MILLIMETERS_PER_INCH};

/// The resolution under which print quality visibly suffers, whatever the vendor accepts.
pub const RECOMMENDED_DPI: u32 = 300;
/// The least number of interior pages a case-bound book can be produced with.
pub const HARDCOVER_INTERIOR_FLOOR: u32 = 24;
/// The pages of the vendor page count which belong to the cover rather than to the interior.
pub const COVER_PAGE_ALLOWANCE: u32 = 4;
/// The tolerance on each axis when matching a trim size against the allowed ones.
pub const TRIM_SIZE_TOLERANCE_MM: f64 = 1.0;
/// Trim sizes are stated with a precision of a quarter inch.
const TRIM_SIZE_STEPS_PER_INCH: f64 = 4.0;

/// The description of the two artifacts of a book, as handed to the print vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintableMetadata {
    pub dpi: u32,
    /// Such as `8.5 x 11 inches`.
    pub trim_size: String,
    pub total_page_count: u32,
    pub cover_page_count: u32,
    pub interior_page_count: u32,
    pub spread_count: u32,
    #[serde(rename = "hasSeparatePDFs")]
    pub has_separate_pdfs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size_bytes: Option<u64>,
}

/// How the book is bound, which decides the number of cover pages and the page count rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BindingType {
    Case,
    Hardcover,
    Stapled,
    Saddle,
    Paperback,
    PerfectBound,
    #[serde(other)]
    Other,
}

impl BindingType {
    pub fn is_case_bound(&self) -> bool {
        matches!(self, BindingType::Case | BindingType::Hardcover)
    }

    /// Case-bound covers are a single wrap printed on one side, the other ones have an inner face.
    pub fn expected_cover_page_count(&self) -> u32 {
        if self.is_case_bound() {
            2
        } else {
            4
        }
    }
}

/// A trim size allowed by the vendor, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrimSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl TrimSize {
    /// Whether the other size is within the tolerance on both axes. Orientation matters: a
    /// landscape book is not the same product as its portrait counterpart.
    pub fn matches(&self, other: &TrimSize) -> bool {
        (self.width_mm - other.width_mm).abs() <= TRIM_SIZE_TOLERANCE_MM
            && (self.height_mm - other.height_mm).abs() <= TRIM_SIZE_TOLERANCE_MM
    }

    /// The same size with each dimension brought to the nearest quarter inch.
    pub fn to_nearest_quarter_inch(&self) -> TrimSize {
        let snap = |millimeters: f64| {
            let steps = (millimeters / MILLIMETERS_PER_INCH * TRIM_SIZE_STEPS_PER_INCH).round();
            inches_to_millimeters(steps / TRIM_SIZE_STEPS_PER_INCH)
        };
        TrimSize {
            width_mm: snap(self.width_mm),
            height_mm: snap(self.height_mm),
        }
    }

    /// Whether the other size is offered as this one, either as written or once rounded to the
    /// quarter inch trim sizes are usually stated with (`8.4 x 11` stands for the letter size).
    pub fn accepts(&self, other: &TrimSize) -> bool {
        self.matches(other) || self.matches(&other.to_nearest_quarter_inch())
    }
}

/// The production constraints of one print product of the vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintProductSpecification {
    pub trim_sizes: Vec<TrimSize>,
    /// Bounds of the total page count, cover pages included.
    pub min_page_count: u32,
    pub max_page_count: u32,
    pub page_count_increment: u32,
    pub min_dpi: u32,
    #[serde(default)]
    pub max_file_size_bytes: Option<u64>,
    #[serde(default)]
    pub color_space: Option<String>,
    #[serde(default)]
    pub bleed_mm: f64,
    pub binding_type: BindingType,
}

impl PrintProductSpecification {
    pub fn interior_page_floor(&self) -> u32 {
        let floor = self.min_page_count.saturating_sub(COVER_PAGE_ALLOWANCE);
        if self.binding_type.is_case_bound() {
            floor.max(HARDCOVER_INTERIOR_FLOOR)
        } else {
            floor
        }
    }

    pub fn interior_page_ceiling(&self) -> u32 {
        self.max_page_count.saturating_sub(COVER_PAGE_ALLOWANCE)
    }
}

/// The verdict of a validation: valid when there is no error, whatever the warnings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn error<S: Into<String>>(&mut self, message: S) {
        self.valid = false;
        self.errors.push(message.into());
    }

    pub fn warning<S: Into<String>>(&mut self, message: S) {
        self.warnings.push(message.into());
    }

    /// Appends the findings of another validation to this one.
    pub fn merge(&mut self, other: ValidationResult) {
        self.valid &= other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

/// Parses a trim size such as `8.5 x 11 inches` into its width and height in inches.
pub fn parse_trim_size(trim_size: &str) -> Result<(f64, f64), ContextError> {
    let invalid = || {
        ContextError::with_kind(
            ErrorKind::InvalidTrimSize,
            format!("Invalid trim size {:?}, expected \"W x H inches\"", trim_size),
        )
    };

    let normalized = trim_size.trim().to_lowercase();
    let dimensions = ["inches", "inch", "in", "\""]
        .iter()
        .find_map(|unit| normalized.strip_suffix(unit))
        .unwrap_or(normalized.as_str());
    let (width, height) = dimensions
        .split_once(['x', '×'])
        .ok_or_else(invalid)?;

    let parse = |dimension: &str| {
        dimension
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value > 0.0)
            .ok_or_else(invalid)
    };

    Ok((parse(width)?, parse(height)?))
}

/// Converts a trim size written in inches into millimeters.
pub fn trim_size_in_millimeters(trim_size: &str) -> Result<TrimSize, ContextError> {
    let (width, height) = parse_trim_size(trim_size)?;

    Ok(TrimSize {
        width_mm: inches_to_millimeters(width),
        height_mm: inches_to_millimeters(height),
    })
}

/// Checks the metadata of the rendered artifacts against the constraints of a print product,
/// accumulating every finding in order.
pub fn validate_printable(
    metadata: &PrintableMetadata,
    specification: &PrintProductSpecification,
) -> ValidationResult {
    let mut result = ValidationResult::new();
    let binding_type = specification.binding_type;

    let expected_cover_pages = binding_type.expected_cover_page_count();
    if metadata.cover_page_count != expected_cover_pages {
        result.error(format!(
            "The cover has {} pages, but a {:?} binding needs {}",
            metadata.cover_page_count, binding_type, expected_cover_pages
        ));
    }

    let interior_pages = metadata.interior_page_count;
    let floor = specification.interior_page_floor();
    let ceiling = specification.interior_page_ceiling();
    if interior_pages < floor {
        let mut message = format!(
            "The interior has {} pages, below the minimum of {}",
            interior_pages, floor
        );
        if binding_type.is_case_bound() && floor == HARDCOVER_INTERIOR_FLOOR {
            message.push_str(&format!(
                " (hardcover books need at least {} interior pages)",
                HARDCOVER_INTERIOR_FLOOR
            ));
        }
        result.error(message);
    }
    if interior_pages > ceiling {
        result.error(format!(
            "The interior has {} pages, above the maximum of {}",
            interior_pages, ceiling
        ));
    }

    let increment = specification.page_count_increment;
    if increment > 0 && interior_pages % increment != 0 {
        result.error(format!(
            "The interior has {} pages, which is not a multiple of {}",
            interior_pages, increment
        ));
    }

    if metadata.dpi < specification.min_dpi {
        result.error(format!(
            "The resolution of {} DPI is below the minimum of {} DPI",
            metadata.dpi, specification.min_dpi
        ));
    } else if metadata.dpi < RECOMMENDED_DPI {
        result.warning(format!(
            "The resolution of {} DPI is below the recommended {} DPI",
            metadata.dpi, RECOMMENDED_DPI
        ));
    }

    match trim_size_in_millimeters(&metadata.trim_size) {
        Ok(trim_size) => {
            if !specification
                .trim_sizes
                .iter()
                .any(|allowed| allowed.accepts(&trim_size))
            {
                result.error(format!(
                    "The trim size {} ({:.1} x {:.1} mm) is not offered for this product",
                    metadata.trim_size, trim_size.width_mm, trim_size.height_mm
                ));
            }
        }
        Err(error) => result.error(error.to_string()),
    }

    if specification.bleed_mm > 0.0 {
        result.warning(format!(
            "The artwork must extend {} mm past the trim on every side",
            specification.bleed_mm
        ));
    }

    if let Some(color_space) = &specification.color_space {
        result.warning(format!(
            "The artwork must use the {} color space, which cannot be verified from the metadata",
            color_space
        ));
    }

    if let (Some(file_size), Some(maximum)) =
        (metadata.file_size_bytes, specification.max_file_size_bytes)
    {
        if file_size > maximum {
            result.error(format!(
                "The artifact weighs {} bytes, above the maximum of {} bytes",
                file_size, maximum
            ));
        }
    }

    result
}
