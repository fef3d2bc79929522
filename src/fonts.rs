//! The fixed set of standard PDF faces the compositor can typeset with. These faces are built into
//! every PDF reader, so no font program is embedded: only their advance widths are needed here,
//! both for wrapping and for centering lines.

use unicode_normalization::UnicodeNormalization as _;

/// Anything able to measure how wide a piece of text is at a given font size, in points.
pub trait FontMetrics {
    fn width_of(&self, text: &str, font_size: f32) -> f32;
}

/// One of the standard faces, identified by its PostScript name in the PDF document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum StandardFont {
    #[default]
    Helvetica,
    HelveticaBold,
    TimesRoman,
    Courier,
}

// Advance widths (in thousandths of an em) of the printable ASCII range 32..=126, taken from the
// Adobe font metrics of the standard faces.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    278, 278, 584, 584, 584, 556, 1015,
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    278, 278, 278, 469, 556, 333,
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500,
    278, 278, 564, 564, 564, 444, 921,
    722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889,
    722, 722, 556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611,
    333, 278, 333, 469, 500, 333,
    444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778,
    500, 500, 500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444,
    480, 200, 480, 541,
];

/// The characters of the 0x80..=0x9F range of `WinAnsiEncoding`, which is where it departs from Latin-1.
const WIN_ANSI_SPECIALS: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

impl StandardFont {
    /// Resolves the font named by a layout template. The lookup ignores case, spaces and dashes and
    /// understands the usual generic family names; anything unknown falls back to Helvetica.
    pub fn from_name(name: &str) -> StandardFont {
        let normalized: String = name
            .chars()
            .filter(|character| character.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "helvetica" | "arial" | "sansserif" | "sans" => StandardFont::Helvetica,
            "helveticabold" | "arialbold" | "sansserifbold" => StandardFont::HelveticaBold,
            "times" | "timesroman" | "timesnewroman" | "serif" => StandardFont::TimesRoman,
            "courier" | "couriernew" | "monospace" | "mono" => StandardFont::Courier,
            _ => {
                log::warn!(
                    "The font {:?} is not one of the standard faces, falling back to Helvetica",
                    name
                );
                StandardFont::Helvetica
            }
        }
    }

    /// The PostScript name used for the `BaseFont` entry.
    pub fn base_font_name(&self) -> &'static str {
        match self {
            StandardFont::Helvetica => "Helvetica",
            StandardFont::HelveticaBold => "Helvetica-Bold",
            StandardFont::TimesRoman => "Times-Roman",
            StandardFont::Courier => "Courier",
        }
    }

    /// Advance width of a single character in thousandths of an em.
    fn advance(&self, character: char) -> u16 {
        let ascii_widths = match self {
            StandardFont::Helvetica => &HELVETICA_WIDTHS,
            StandardFont::HelveticaBold => &HELVETICA_BOLD_WIDTHS,
            StandardFont::TimesRoman => &TIMES_ROMAN_WIDTHS,
            StandardFont::Courier => return 600,
        };
        if let Some(width) = ascii_width(ascii_widths, character) {
            return width;
        }

        let is_times = *self == StandardFont::TimesRoman;
        match character {
            '\u{a0}' => ascii_widths[0],
            '‘' | '’' | '‚' => {
                if is_times {
                    333
                } else {
                    222
                }
            }
            '“' | '”' | '„' => {
                if is_times {
                    444
                } else {
                    333
                }
            }
            '•' => 350,
            '–' => ascii_widths[(b'0' - 32) as usize],
            '—' | '…' | '‰' | '™' => 1000,
            _ => {
                // Accented letters are as wide as their base letter
                std::iter::once(character)
                    .nfd()
                    .next()
                    .and_then(|base| ascii_width(ascii_widths, base))
                    .unwrap_or(ascii_widths[(b'n' - 32) as usize])
            }
        }
    }
}

fn ascii_width(widths: &[u16; 95], character: char) -> Option<u16> {
    let code = character as u32;
    if (32..=126).contains(&code) {
        Some(widths[(code - 32) as usize])
    } else {
        None
    }
}

impl FontMetrics for StandardFont {
    fn width_of(&self, text: &str, font_size: f32) -> f32 {
        let units: u32 = text
            .nfc()
            .map(|character| self.advance(character) as u32)
            .sum();
        units as f32 * font_size / 1000.0
    }
}

/// Encodes text into `WinAnsiEncoding`, the single-byte encoding of the standard faces. The text is
/// first normalized in the NFC form so that decomposed accents land on their precomposed code point.
/// Characters outside of the encoding are skipped and logged.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len());
    for character in text.nfc() {
        let code = character as u32;
        if (32..=126).contains(&code) || (0xA0..=0xFF).contains(&code) {
            bytes.push(code as u8);
        } else if let Some((_, byte)) = WIN_ANSI_SPECIALS
            .iter()
            .find(|(special, _)| *special == character)
        {
            bytes.push(*byte);
        } else {
            log::warn!(
                "Unable to encode the character {:?} with the standard fonts, skipping it",
                character
            );
        }
    }

    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_font_names() {
        assert_eq!(StandardFont::from_name("Helvetica"), StandardFont::Helvetica);
        assert_eq!(StandardFont::from_name("helvetica-bold"), StandardFont::HelveticaBold);
        assert_eq!(StandardFont::from_name("Times New Roman"), StandardFont::TimesRoman);
        assert_eq!(StandardFont::from_name("monospace"), StandardFont::Courier);
        assert_eq!(StandardFont::from_name("Comic Sans"), StandardFont::Helvetica);
    }

    #[test]
    fn measures_text_with_the_standard_widths() {
        assert_eq!(StandardFont::Courier.width_of("abc", 10.0), 18.0);
        // "Hi" is 722 + 222 units in Helvetica
        assert!((StandardFont::Helvetica.width_of("Hi", 12.0) - 11.328).abs() < 1e-4);
        assert_eq!(StandardFont::TimesRoman.width_of("", 12.0), 0.0);
        // Accented letters take the width of their base letter
        assert_eq!(
            StandardFont::TimesRoman.width_of("é", 10.0),
            StandardFont::TimesRoman.width_of("e", 10.0)
        );
    }

    #[test]
    fn encodes_text_in_win_ansi() {
        assert_eq!(encode_win_ansi("Hi!"), b"Hi!".to_vec());
        assert_eq!(encode_win_ansi("caf\u{65}\u{301}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("“ok”"), vec![0x93, b'o', b'k', 0x94]);
        // Characters outside of the encoding are dropped
        assert_eq!(encode_win_ansi("a😀b"), b"ab".to_vec());
    }
}
