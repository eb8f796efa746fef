use serde::{Deserialize, Serialize};

/// A contiguous slice of source document text, the unit of retrieval.
/// Immutable once created; owned by the index entry that embeds it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    /// The chunk text as produced by the chunker.
    pub text: String,
    /// Name of the file the chunk was cut from.
    pub source_file: String,
    /// Position of the chunk within its source document.
    pub index: usize,
}

impl Passage {
    pub fn new(text: impl Into<String>, source_file: impl Into<String>, index: usize) -> Self {
        Self {
            text: text.into(),
            source_file: source_file.into(),
            index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passage_new() {
        let p = Passage::new("some text", "report.txt", 3);
        assert_eq!(p.text, "some text");
        assert_eq!(p.source_file, "report.txt");
        assert_eq!(p.index, 3);
    }
}
