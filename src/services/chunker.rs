//! Recursive text chunking with overlap.

use crate::models::{ChunkingConfig, Passage};

/// Separator priority for recursive splitting: paragraph break, line break,
/// word break. Text with none of these is hard-sliced at the chunk width.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Splits document text into overlapping passages sized for embedding.
#[derive(Debug, Clone)]
pub struct TextChunker {
    max_chunk_chars: usize,
    overlap_chars: usize,
}

impl TextChunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            max_chunk_chars: config.max_chunk_chars.max(1),
            overlap_chars: config.overlap_chars,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(&ChunkingConfig::default())
    }

    /// Split `text` into passages of at most `max_chunk_chars` characters
    /// where the text allows it; consecutive passages share trailing/leading
    /// overlap so context survives a cut. Whitespace-only input yields no
    /// passages; callers treat that as an empty document.
    pub fn chunk(&self, text: &str, source_file: &str) -> Vec<Passage> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        if char_len(text) <= self.max_chunk_chars {
            return vec![Passage::new(text, source_file, 0)];
        }

        let pieces = self.split_recursive(text, 0);
        self.merge_with_overlap(pieces)
            .into_iter()
            .enumerate()
            .map(|(i, chunk)| Passage::new(chunk, source_file, i))
            .collect()
    }

    /// Break `text` into pieces, trying separators in priority order.
    /// Separators stay attached to the piece they end, so concatenating the
    /// pieces reproduces the input exactly. A stretch with no separators at
    /// all comes back as one oversized piece for the merge pass to window.
    fn split_recursive(&self, text: &str, sep_index: usize) -> Vec<String> {
        if char_len(text) <= self.max_chunk_chars {
            return vec![text.to_string()];
        }

        for (i, sep) in SEPARATORS.iter().enumerate().skip(sep_index) {
            if !text.contains(sep) {
                continue;
            }
            let mut pieces = Vec::new();
            for part in text.split_inclusive(sep) {
                if char_len(part) <= self.max_chunk_chars {
                    pieces.push(part.to_string());
                } else {
                    pieces.extend(self.split_recursive(part, i + 1));
                }
            }
            return pieces;
        }

        vec![text.to_string()]
    }

    /// Overlapping fixed-width windows for a stretch of text with no usable
    /// separators, advancing by the chunk width minus the overlap.
    fn hard_slice(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let step = if self.overlap_chars < self.max_chunk_chars {
            self.max_chunk_chars - self.overlap_chars
        } else {
            self.max_chunk_chars
        };

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let end = (start + self.max_chunk_chars).min(chars.len());
            pieces.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += step;
        }
        pieces
    }

    /// Greedily pack pieces into chunks, carrying a trailing-overlap prefix
    /// from each emitted chunk into the next. The overlap shrinks when a
    /// wide piece leaves no room for it. Oversized separator-free pieces are
    /// windowed in place, and packing resumes from their final window.
    fn merge_with_overlap(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for piece in pieces {
            let piece_len = char_len(&piece);

            if piece_len > self.max_chunk_chars {
                if current_len > 0 {
                    chunks.push(std::mem::take(&mut current));
                }
                let mut windows = self.hard_slice(&piece);
                let last = windows.pop().unwrap_or_default();
                chunks.extend(windows);
                current_len = char_len(&last);
                current = last;
                continue;
            }

            if current_len > 0 && current_len + piece_len > self.max_chunk_chars {
                let overlap = self
                    .overlap_chars
                    .min(self.max_chunk_chars.saturating_sub(piece_len));
                let carry = tail_chars(&current, overlap);
                current_len = char_len(&carry);
                chunks.push(std::mem::replace(&mut current, carry));
            }
            current.push_str(&piece);
            current_len += piece_len;
        }
        if current_len > 0 {
            chunks.push(current);
        }
        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Last `n` characters of `s` as an owned string.
fn tail_chars(s: &str, n: usize) -> String {
    if n == 0 {
        return String::new();
    }
    let skip = char_len(s).saturating_sub(n);
    s.chars().skip(skip).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(max: usize, overlap: usize) -> TextChunker {
        TextChunker::new(&ChunkingConfig {
            max_chunk_chars: max,
            overlap_chars: overlap,
        })
    }

    /// Rebuild the original text from overlapping chunks by stripping each
    /// chunk's longest prefix that is a suffix of the text so far.
    fn reconstruct(chunks: &[Passage]) -> String {
        let mut out = chunks[0].text.clone();
        for chunk in &chunks[1..] {
            let chars: Vec<char> = chunk.text.chars().collect();
            let max_check = chars.len().min(out.chars().count());
            let mut overlap = 0;
            for l in (1..=max_check).rev() {
                let prefix: String = chars[..l].iter().collect();
                if out.ends_with(&prefix) {
                    overlap = l;
                    break;
                }
            }
            out.extend(chars[overlap..].iter());
        }
        out
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::with_defaults();
        let passages = chunker.chunk("Hello, world!", "greeting.txt");

        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "Hello, world!");
        assert_eq!(passages[0].source_file, "greeting.txt");
        assert_eq!(passages[0].index, 0);
    }

    #[test]
    fn test_empty_and_whitespace_yield_nothing() {
        let chunker = TextChunker::with_defaults();
        assert!(chunker.chunk("", "a.txt").is_empty());
        assert!(chunker.chunk("  \n\n \t ", "a.txt").is_empty());
    }

    #[test]
    fn test_chunks_respect_max_length() {
        let chunker = chunker(100, 20);
        let text: String = (0..40)
            .map(|i| format!("Sentence number {i} talks about topic {i}.\n"))
            .collect();
        let passages = chunker.chunk(&text, "doc.txt");

        assert!(passages.len() > 1);
        for p in &passages {
            assert!(p.text.chars().count() <= 100, "chunk too long: {:?}", p.text);
        }
        for (i, p) in passages.iter().enumerate() {
            assert_eq!(p.index, i);
        }
    }

    #[test]
    fn test_consecutive_chunks_share_overlap() {
        let chunker = chunker(100, 20);
        let text: String = (0..40)
            .map(|i| format!("Sentence number {i} talks about topic {i}.\n"))
            .collect();
        let passages = chunker.chunk(&text, "doc.txt");

        for pair in passages.windows(2) {
            let tail = tail_chars(&pair[0].text, 20);
            assert!(
                pair[1].text.starts_with(&tail),
                "expected {:?} to start with {:?}",
                pair[1].text,
                tail
            );
        }
    }

    #[test]
    fn test_no_character_dropped() {
        let chunker = chunker(80, 16);
        let text: String = (0..30)
            .map(|i| format!("Paragraph {i} holds unique content id{i}.\n\n"))
            .collect();
        let passages = chunker.chunk(&text, "doc.txt");

        assert!(passages.len() > 1);
        assert_eq!(reconstruct(&passages), text);
    }

    #[test]
    fn test_separator_free_text_hard_sliced() {
        let chunker = chunker(100, 20);
        let text = "x".repeat(250);
        let passages = chunker.chunk(&text, "blob.txt");

        // Windows of the full chunk width, stepping by width minus overlap.
        assert_eq!(passages.len(), 3);
        assert_eq!(passages[0].text.chars().count(), 100);
        assert_eq!(passages[1].text.chars().count(), 100);
        assert_eq!(passages[2].text.chars().count(), 90);

        // Stripping the 20-char overlaps recovers every input character.
        let total: usize = passages.iter().map(|p| p.text.chars().count()).sum();
        assert_eq!(total - 2 * 20, 250);
    }

    #[test]
    fn test_separator_free_text_without_overlap() {
        let chunker = chunker(100, 0);
        let text = "x".repeat(250);
        let passages = chunker.chunk(&text, "blob.txt");

        assert_eq!(passages.len(), 3);
        assert_eq!(passages[2].text.chars().count(), 50);
        let joined: String = passages.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(joined, text);
    }

    #[test]
    fn test_multibyte_text_counts_chars() {
        let chunker = chunker(10, 2);
        let text = "héllo wörld ünïcode çhars here and more wörds".to_string();
        let passages = chunker.chunk(&text, "utf8.txt");

        for p in &passages {
            assert!(p.text.chars().count() <= 10);
        }
    }

    #[test]
    fn test_prefers_paragraph_breaks() {
        let chunker = chunker(60, 0);
        let text = format!("{}\n\n{}", "alpha ".repeat(8).trim_end(), "beta ".repeat(8).trim_end());
        let passages = chunker.chunk(&text, "doc.txt");

        assert_eq!(passages.len(), 2);
        assert!(passages[0].text.starts_with("alpha"));
        assert!(passages[1].text.starts_with("beta"));
    }
}
