//! Conversions between the layout space of the templates (inches, origin in the top-left corner)
//! and the document space of PDF (points, origin in the bottom-left corner), plus the handful of
//! color helpers the renderer needs.

use crate::error::{ContextError, ErrorKind};

/// The number of PDF points in one inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// The number of millimeters in one inch.
pub const MILLIMETERS_PER_INCH: f64 = 25.4;

/// An RGB color whose components are in the range `[0, 1]`, as expected by the `rg` operator.
pub type UnitRgb = [f32; 3];

pub const BLACK: UnitRgb = [0.0, 0.0, 0.0];
pub const WHITE: UnitRgb = [1.0, 1.0, 1.0];

/// Converts inches to points.
pub fn to_points(inches: f32) -> f32 {
    inches * POINTS_PER_INCH
}

/// Converts inches to millimeters.
pub fn inches_to_millimeters(inches: f64) -> f64 {
    inches * MILLIMETERS_PER_INCH
}

/// Maps the top edge of a box measured from the top of the page onto the bottom edge of the same
/// box measured from the bottom of the page, which is how PDF places things.
///
/// # Arguments
///
/// * `page_height` - The height of the page in points.
/// * `y_from_top` - The distance between the top of the page and the top of the box, in points.
/// * `box_height` - The height of the box in points.
pub fn top_left_to_bottom_left(page_height: f32, y_from_top: f32, box_height: f32) -> f32 {
    page_height - y_from_top - box_height
}

/// Parses a color written as six hexadecimal digits, with or without a leading `#`.
pub fn hex_to_unit_rgb(hex: &str) -> Result<UnitRgb, ContextError> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|character| character.is_ascii_hexdigit()) {
        return Err(ContextError::with_kind(
            ErrorKind::InvalidColor,
            format!("Invalid color {:?}, expected six hexadecimal digits", hex),
        ));
    }

    let mut color = [0.0; 3];
    for (index, component) in color.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&digits[index * 2..index * 2 + 2], 16).map_err(|error| {
            ContextError::with_error(format!("Invalid color {:?}", hex), &error)
                .kind(ErrorKind::InvalidColor)
        })?;
        *component = byte as f32 / 255.0;
    }

    Ok(color)
}

/// Formats a unit RGB color back into `#rrggbb`, rounding each component to the nearest byte.
pub fn rgb_to_hex(color: UnitRgb) -> String {
    let [r, g, b] = color.map(|component| (component.clamp(0.0, 1.0) * 255.0).round() as u8);
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Picks black or white text for the given background color.
///
/// The luminance is the plain weighted sum `0.299 R + 0.587 G + 0.114 B` over the unit components,
/// without any gamma handling: a cheap heuristic, not a perceptual color model.
pub fn contrasting_text_color(background_hex: &str) -> Result<UnitRgb, ContextError> {
    let [r, g, b] = hex_to_unit_rgb(background_hex)?;
    let luminance = 0.299 * r + 0.587 * g + 0.114 * b;

    Ok(if luminance > 0.5 { BLACK } else { WHITE })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng as _, SeedableRng as _};

    #[test]
    fn converts_inches_and_flips_the_vertical_axis() {
        assert_eq!(to_points(8.5), 612.0);
        assert_eq!(to_points(1.0), 72.0);
        // A one inch box one inch below the top of an 11 inch page
        assert_eq!(top_left_to_bottom_left(792.0, 72.0, 72.0), 648.0);
        assert!((inches_to_millimeters(11.0) - 279.4).abs() < 1e-9);
    }

    #[test]
    fn parses_hex_colors() {
        assert_eq!(hex_to_unit_rgb("#ffffff").unwrap(), WHITE);
        assert_eq!(hex_to_unit_rgb("000000").unwrap(), BLACK);
        let [r, g, b] = hex_to_unit_rgb("#FF8000").unwrap();
        assert_eq!(r, 1.0);
        assert!((g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(b, 0.0);
    }

    #[test]
    fn rejects_malformed_colors() {
        for malformed in ["", "#fff", "#12345g", "red", "#1234567", "#ééé"] {
            let error = hex_to_unit_rgb(malformed).unwrap_err();
            assert_eq!(error.kind, ErrorKind::InvalidColor, "{malformed:?}");
        }
    }

    #[test]
    fn random_colors_stay_in_range_and_round_trip() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let hex = format!("#{:06x}", rng.gen_range(0..=0xFFFFFFu32));
            let color = hex_to_unit_rgb(&hex).unwrap();
            assert!(color.iter().all(|component| (0.0..=1.0).contains(component)));
            assert_eq!(rgb_to_hex(color), hex);

            let text_color = contrasting_text_color(&hex).unwrap();
            assert!(text_color == BLACK || text_color == WHITE);
        }
    }

    #[test]
    fn contrasting_color_follows_luminance() {
        assert_eq!(contrasting_text_color("#ffffff").unwrap(), BLACK);
        assert_eq!(contrasting_text_color("#000000").unwrap(), WHITE);
        assert_eq!(contrasting_text_color("#ffff00").unwrap(), BLACK);
        assert_eq!(contrasting_text_color("#0000ff").unwrap(), WHITE);
        // Exactly half luminance is not above the threshold
        assert_eq!(contrasting_text_color("#7f7f7f").unwrap(), WHITE);
    }
}
