use crate::fonts::FontMetrics;

/// Breaks text into lines no wider than `maximum_width`, greedily: words are appended to the current
/// line until the next one would overflow it, at which point the line is flushed. A single word wider
/// than the budget gets a line of its own and is never broken. Empty or blank text yields no lines.
///
/// # Arguments
///
/// * `text` - The text to be wrapped, whose words are delimited by any whitespace.
/// * `metrics` - The font used to measure the candidate lines.
/// * `font_size` - The size of the font in points.
/// * `maximum_width` - The width available to each line in points.
pub fn wrap_text(
    text: &str,
    metrics: &dyn FontMetrics,
    font_size: f32,
    maximum_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if current_line.is_empty() {
            current_line.push_str(word);
            continue;
        }

        let candidate = format!("{current_line} {word}");
        if metrics.width_of(&candidate, font_size) > maximum_width {
            lines.push(std::mem::take(&mut current_line));
            current_line.push_str(word);
        } else {
            current_line = candidate;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines
}

/// Wraps every paragraph of the text on its own, paragraphs being separated by line breaks.
/// A blank paragraph is kept as an empty line so that the vertical rhythm of the text survives.
pub fn wrap_paragraphs(
    text: &str,
    metrics: &dyn FontMetrics,
    font_size: f32,
    maximum_width: f32,
) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.trim().lines() {
        let paragraph_lines = wrap_text(paragraph, metrics, font_size, maximum_width);
        if paragraph_lines.is_empty() {
            lines.push(String::new());
        } else {
            lines.extend(paragraph_lines);
        }
    }

    lines
}

/// The lines of a title page: one per line break, trimmed, with the blank ones dropped.
pub fn title_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fonts::StandardFont;
    use rand::{Rng as _, SeedableRng as _};

    // Courier is monospaced: every character is 6 points wide at a font size of 10
    const MONOSPACE: StandardFont = StandardFont::Courier;

    #[test]
    fn wraps_greedily_on_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps", &MONOSPACE, 10.0, 60.0);
        similar_asserts::assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
    }

    #[test]
    fn a_line_may_fill_the_budget_exactly() {
        // "aaaa bbbbb" is ten characters, exactly 60 points
        let lines = wrap_text("aaaa bbbbb c", &MONOSPACE, 10.0, 60.0);
        similar_asserts::assert_eq!(lines, vec!["aaaa bbbbb", "c"]);
    }

    #[test]
    fn long_words_are_kept_whole_on_their_own_line() {
        let lines = wrap_text("a supercalifragilistic b", &MONOSPACE, 10.0, 30.0);
        similar_asserts::assert_eq!(lines, vec!["a", "supercalifragilistic", "b"]);
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(wrap_text("", &MONOSPACE, 10.0, 100.0).is_empty());
        assert!(wrap_text(" \n\t ", &MONOSPACE, 10.0, 100.0).is_empty());
    }

    #[test]
    fn paragraphs_wrap_independently() {
        let lines = wrap_paragraphs("one two\n\nthree", &MONOSPACE, 10.0, 600.0);
        similar_asserts::assert_eq!(lines, vec!["one two", "", "three"]);
    }

    #[test]
    fn title_lines_are_trimmed_and_not_blank() {
        let lines = title_lines("  The Brave Little Owl \n\n  by Ada  \n");
        similar_asserts::assert_eq!(lines, vec!["The Brave Little Owl", "by Ada"]);
    }

    #[test]
    fn wrapping_is_deterministic_and_idempotent() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let word_count = rng.gen_range(0..40);
            let text = (0..word_count)
                .map(|_| {
                    let length = rng.gen_range(1..12);
                    rand_utf8::rand_utf8(&mut rng, length).to_string()
                })
                .collect::<Vec<_>>()
                .join(" ");
            let font_size = rng.gen_range(8.0..30.0);
            let maximum_width = rng.gen_range(20.0..400.0);

            let lines = wrap_text(&text, &StandardFont::Helvetica, font_size, maximum_width);
            assert_eq!(
                lines,
                wrap_text(&text, &StandardFont::Helvetica, font_size, maximum_width)
            );

            // Every already-wrapped line fits as it is, so wrapping it again changes nothing
            for line in &lines {
                let rewrapped = wrap_text(line, &StandardFont::Helvetica, font_size, maximum_width);
                similar_asserts::assert_eq!(rewrapped, vec![line.clone()]);
            }
        }
    }
}
