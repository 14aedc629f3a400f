//! Text helpers for grading typed answers and displaying fill-in-the-blank phrases.

const OPENING_QUOTE: char = '«';
const CLOSING_QUOTE: char = '»';

/// Levenshtein distance between two strings, only exact up to 1.
///
/// Grading only cares whether a typed answer is one edit away from an expected one, so when the
/// lengths differ by more than one character this returns 2 immediately without filling the
/// table. Any result of 2 means "not within one edit".
pub fn edit_distance_within_one(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len.abs_diff(b_len) > 1 {
        return 2;
    }

    let mut previous: Vec<usize> = (0..=b_len).collect();
    let mut current = vec![0; b_len + 1];

    for i in 1..=a_len {
        current[0] = i;
        for j in 1..=b_len {
            let cost = if a_chars[i - 1] == b_chars[j - 1] {
                0
            } else {
                1
            };
            current[j] = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_len]
}

/// Byte ranges of every run of two or more underscores.
fn blank_ranges(text: &str) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            let start = i;
            while i < bytes.len() && bytes[i] == b'_' {
                i += 1;
            }
            if i - start >= 2 {
                ranges.push((start, i));
            }
        } else {
            i += 1;
        }
    }
    ranges
}

/// Number of blanks (runs of 2+ underscores) in a phrase.
pub fn count_blanks(phrase: &str) -> usize {
    blank_ranges(phrase).len()
}

/// Split a phrase like `« Je ___ avec mes amis. »` into the text before and after its blank.
///
/// The surrounding French quotes are dropped. A phrase without a blank comes back whole as the
/// "before" part.
pub fn split_phrase(phrase: &str) -> (&str, &str) {
    let content = phrase
        .strip_prefix(OPENING_QUOTE)
        .map(str::trim_start)
        .unwrap_or(phrase);
    let content = content
        .strip_suffix(CLOSING_QUOTE)
        .map(str::trim_end)
        .unwrap_or(content);

    match blank_ranges(content).first() {
        Some(&(start, end)) => (&content[..start], &content[end..]),
        None => (content, ""),
    }
}
