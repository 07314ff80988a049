// src/chunker.rs

/// Split `text` into consecutive, non-overlapping pieces of at most
/// `chunk_size` characters. Chunk `i` covers characters `[i*S, (i+1)*S)`;
/// no attention is paid to word or sentence boundaries.
///
/// With `max_total_length` set, only that many leading characters are
/// chunked. `chunk_size` must be non-zero (enforced by config validation).
pub fn chunk_text(text: &str, chunk_size: usize, max_total_length: Option<usize>) -> Vec<String> {
    let chars: Vec<char> = match max_total_length {
        Some(cap) => text.chars().take(cap).collect(),
        None => text.chars().collect(),
    };

    chars
        .chunks(chunk_size.max(1))
        .map(|c| c.iter().collect())
        .collect()
}
