//! Sentence-aware text chunking with overlap

use unicode_segmentation::UnicodeSegmentation;

use crate::types::{Chunk, Document};

/// Text chunker with configurable size and overlap, measured in bytes of UTF-8
pub struct TextChunker {
    /// Target chunk size
    chunk_size: usize,
    /// Overlap carried from the end of one chunk into the next
    overlap: usize,
    /// Chunks shorter than this (after trimming) are dropped
    min_size: usize,
}

impl TextChunker {
    /// Create a new chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size / 2),
            min_size: 1,
        }
    }

    /// Set the minimum chunk size
    pub fn with_min_size(mut self, min_size: usize) -> Self {
        self.min_size = min_size.max(1);
        self
    }

    /// Split a document into chunks that carry its metadata
    pub fn chunk_document(&self, doc: &Document) -> Vec<Chunk> {
        self.chunk_text(&doc.text)
            .into_iter()
            .enumerate()
            .map(|(i, content)| Chunk::new(doc, content, i as u32))
            .collect()
    }

    /// Split text into chunks of at most `chunk_size` bytes
    pub fn chunk_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in self.pieces(text) {
            if !current.is_empty() && current.len() + piece.len() > self.chunk_size {
                self.push_chunk(&mut chunks, &current);

                current = self.overlap_text(&current);
                if current.len() + piece.len() > self.chunk_size {
                    current.clear();
                }
            }
            current.push_str(piece);
        }

        self.push_chunk(&mut chunks, &current);
        chunks
    }

    fn push_chunk(&self, chunks: &mut Vec<String>, text: &str) {
        let trimmed = text.trim();
        if trimmed.len() >= self.min_size {
            chunks.push(trimmed.to_string());
        }
    }

    /// Sentences, with any sentence longer than a chunk cut down to size
    fn pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        for sentence in text.split_sentence_bounds() {
            if sentence.len() <= self.chunk_size {
                pieces.push(sentence);
            } else {
                self.hard_split(sentence, &mut pieces);
            }
        }
        pieces
    }

    fn hard_split<'a>(&self, mut rest: &'a str, out: &mut Vec<&'a str>) {
        while rest.len() > self.chunk_size {
            let mut cut = floor_char_boundary(rest, self.chunk_size);

            if let Some(space) = rest[..cut].rfind([' ', '\n', '\t']) {
                if space > 0 {
                    cut = space + 1;
                }
            }

            if cut == 0 {
                // a single character wider than the chunk size
                cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
            }

            let (head, tail) = rest.split_at(cut);
            out.push(head);
            rest = tail;
        }

        if !rest.is_empty() {
            out.push(rest);
        }
    }

    /// Tail of a finished chunk, starting on a word boundary when possible
    fn overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }
        if text.len() <= self.overlap {
            return text.to_string();
        }

        let start = ceil_char_boundary(text, text.len() - self.overlap);
        let tail = &text[start..];

        match tail.find(' ') {
            Some(pos) if pos + 1 < tail.len() => tail[pos + 1..].to_string(),
            _ => tail.to_string(),
        }
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SOURCE_KEY;

    #[test]
    fn test_short_text_single_chunk() {
        let chunker = TextChunker::new(1024, 20);
        let chunks = chunker.chunk_text("Hello there. We build widgets.");
        assert_eq!(chunks, vec!["Hello there. We build widgets.".to_string()]);
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = TextChunker::new(64, 10);
        let text = "This is a sentence about widgets. ".repeat(20);
        let chunks = chunker.chunk_text(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.len() <= 64));
    }

    #[test]
    fn test_oversized_sentence_is_split() {
        let chunker = TextChunker::new(16, 0);
        let text = "ü".repeat(40);
        let chunks = chunker.chunk_text(&text);

        assert!(chunks.len() >= 5);
        assert!(chunks.iter().all(|c| c.len() <= 16));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_empty_document_has_no_chunks() {
        let chunker = TextChunker::new(1024, 20);
        assert!(chunker.chunk_document(&Document::new("   \n ")).is_empty());
    }

    #[test]
    fn test_chunks_keep_document_metadata() {
        let chunker = TextChunker::new(32, 0);
        let doc = Document::new("First sentence here. Second sentence here. Third one.")
            .with_metadata(SOURCE_KEY, "https://example.com/about");

        let chunks = chunker.chunk_document(&doc);
        assert!(chunks.len() >= 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i as u32);
            assert_eq!(chunk.document_id, doc.id);
            assert_eq!(chunk.source(), Some("https://example.com/about"));
        }
    }
}
