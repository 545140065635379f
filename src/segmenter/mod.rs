
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

/// Number of sentences grouped into one retrieval chunk.
///
/// This is a sentence count, not a character or token budget.
pub const DEFAULT_GROUP_SIZE: usize = 500;

/// Split text into sentences using UAX #29 sentence boundaries.
///
/// Segments are trimmed; whitespace-only segments are dropped, so an empty
/// or blank input yields an empty sequence.
#[inline]
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.unicode_sentences()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Partition the text's sentences into consecutive, non-overlapping groups
/// of at most `group_size` sentences, joining each group with a single
/// space.
///
/// Chunks preserve document order, and every sentence appears in exactly
/// one chunk. A `group_size` larger than the sentence count produces a
/// single chunk containing the whole text.
#[inline]
pub fn segment(text: &str, group_size: usize) -> Vec<String> {
    assert!(group_size > 0, "group_size must be at least 1");

    let sentences = split_sentences(text);
    let chunks: Vec<String> = sentences
        .chunks(group_size)
        .map(|group| group.join(" "))
        .collect();

    debug!(
        "Segmented {} sentences into {} chunks (group size {})",
        sentences.len(),
        chunks.len(),
        group_size
    );

    chunks
}
