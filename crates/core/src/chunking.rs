use crate::models::ChunkingOptions;

/// Split `text` into overlapping chunks of at most `max_chars` characters.
///
/// The splitter prefers the coarsest separator in `options.separators`
/// that appears in the text and recursively applies finer separators to
/// any oversized piece. Separators stay attached to the piece they
/// terminate, so every chunk is a literal substring of the input and the
/// full text can be reconstructed by removing the duplicated overlap
/// regions. An empty-string separator enables the raw character-window
/// fallback; without it an indivisible oversized unit is emitted whole.
///
/// Pure and total: no randomness, no failure modes. Empty input yields
/// no chunks; input within `max_chars` yields exactly one.
pub fn split_text(text: &str, options: &ChunkingOptions) -> Vec<String> {
    let pieces = split_recursive(text, &options.separators, options.max_chars, options.overlap_chars);
    assemble(pieces, options.max_chars, options.overlap_chars)
}

fn split_recursive(text: &str, separators: &[String], max: usize, overlap: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= max {
        return vec![text.to_string()];
    }

    let (separator, finer) = match separators.split_first() {
        Some((first, rest)) => (first.as_str(), rest),
        // Separator list exhausted: the unit is indivisible.
        None => return vec![text.to_string()],
    };

    if separator.is_empty() {
        return char_windows(text, max.saturating_sub(overlap).max(1));
    }

    if !text.contains(separator) {
        return split_recursive(text, finer, max, overlap);
    }

    let mut pieces = Vec::new();
    for piece in split_keeping_separator(text, separator) {
        if char_len(&piece) <= max {
            pieces.push(piece);
        } else {
            pieces.extend(split_recursive(&piece, finer, max, overlap));
        }
    }
    pieces
}

/// Split on `separator`, reattaching the separator to the piece it ends.
/// Concatenating the result reproduces the input exactly.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while let Some(position) = rest.find(separator) {
        let end = position + separator.len();
        pieces.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

/// Consecutive character groups of `size`; a partition, no overlap.
fn char_windows(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|window| window.iter().collect())
        .collect()
}

/// Greedily pack pieces into chunks of at most `max` characters, seeding
/// each chunk after the first with the previous chunk's trailing
/// `overlap` characters. The carry shrinks when the next piece leaves it
/// no room inside the size budget.
fn assemble(pieces: Vec<String>, max: usize, overlap: usize) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    // Characters in `current` beyond the carried overlap.
    let mut fresh_chars = 0usize;

    for piece in pieces {
        let piece_len = char_len(&piece);

        if char_len(&current) + piece_len > max {
            if fresh_chars > 0 {
                chunks.push(current.clone());
            }
            let budget = if piece_len >= max {
                0
            } else {
                overlap.min(max - piece_len)
            };
            current = suffix_chars(chunks.last().map(String::as_str).unwrap_or(&current), budget);
            fresh_chars = 0;
        }

        current.push_str(&piece);
        fresh_chars += piece_len;
    }

    if fresh_chars > 0 {
        chunks.push(current);
    }
    chunks
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn suffix_chars(text: &str, count: usize) -> String {
    let total = char_len(text);
    if count == 0 || total == 0 {
        return String::new();
    }
    text.chars().skip(total.saturating_sub(count)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(max_chars: usize, overlap_chars: usize) -> ChunkingOptions {
        ChunkingOptions {
            max_chars,
            overlap_chars,
            ..Default::default()
        }
    }

    /// Distinct numbered tokens so suffix/prefix matching in the
    /// reconstruction check is unambiguous.
    fn numbered_text(prefix: &str, target_chars: usize) -> String {
        let mut text = String::new();
        let mut index = 0u32;
        while text.len() < target_chars {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(&format!("{prefix}{index:04}"));
            index += 1;
        }
        text
    }

    fn reconstruct(chunks: &[String]) -> String {
        let mut out = match chunks.first() {
            Some(first) => first.clone(),
            None => return String::new(),
        };
        for next in &chunks[1..] {
            let longest = (0..=out.len().min(next.len()))
                .rev()
                .find(|&k| out.ends_with(&next[..k]))
                .unwrap_or(0);
            out.push_str(&next[longest..]);
        }
        out
    }

    #[test]
    fn empty_input_yields_no_chunks() {
        assert!(split_text("", &options(100, 20)).is_empty());
    }

    #[test]
    fn short_input_yields_one_identical_chunk() {
        let chunks = split_text("a short paragraph", &options(100, 20));
        assert_eq!(chunks, vec!["a short paragraph".to_string()]);
    }

    #[test]
    fn chunking_is_deterministic() {
        let text = numbered_text("tok", 2_500);
        let first = split_text(&text, &options(400, 80));
        let second = split_text(&text, &options(400, 80));
        assert_eq!(first, second);
    }

    #[test]
    fn overlap_removal_reconstructs_the_input() {
        let text = format!(
            "{}\n\n{}\n{}",
            numbered_text("alpha", 900),
            numbered_text("brav", 700),
            numbered_text("char", 1_100)
        );
        let chunks = split_text(&text, &options(300, 60));
        assert_eq!(reconstruct(&chunks), text);
    }

    #[test]
    fn three_thousand_chars_make_at_least_three_bounded_chunks() {
        let text = numbered_text("tok", 3_000);
        let opts = options(1_000, 200);
        let chunks = split_text(&text, &opts);

        assert!(chunks.len() >= 3, "expected >= 3 chunks, got {}", chunks.len());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1_000);
        }
        for pair in chunks.windows(2) {
            let carried: String = suffix_chars(&pair[0], 200);
            assert!(
                pair[1].starts_with(&carried),
                "consecutive chunks should share the trailing 200 characters"
            );
        }
    }

    #[test]
    fn text_without_separators_falls_back_to_character_windows() {
        let text: String = std::iter::repeat("abcdefghij").take(50).collect();
        let chunks = split_text(&text, &options(120, 30));

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 120);
        }

        // The text is periodic, so reconstruct by the known carry width:
        // every chunk after the first repeats the previous 30 characters.
        let mut rebuilt = chunks[0].clone();
        for chunk in &chunks[1..] {
            assert!(chunk.starts_with(&suffix_chars(&rebuilt, 30)));
            rebuilt.push_str(&chunk[30..]);
        }
        assert_eq!(rebuilt, text);
    }

    #[test]
    fn indivisible_unit_is_emitted_whole_without_fallback() {
        let opts = ChunkingOptions {
            max_chars: 10,
            overlap_chars: 2,
            separators: vec![" ".to_string()],
        };
        let chunks = split_text("abcdefghijklmnop end", &opts);
        assert!(chunks.contains(&"abcdefghijklmnop ".to_string()));
    }
}
