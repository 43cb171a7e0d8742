//! Word-level transcript lookup against the transport position

/// One transcribed word with its time span
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// Optional word-level transcript supplied by the host.
///
/// Only used for word-highlight lookups against the current time;
/// transcript clicks route through the ordinary seek path.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    words: Vec<Word>,
    pub formatted_text: Option<String>,
}

impl Transcript {
    /// Build from host words, sorted by start time
    pub fn new(mut words: Vec<Word>, formatted_text: Option<String>) -> Self {
        words.sort_by(|a, b| a.start.total_cmp(&b.start));
        Self {
            words,
            formatted_text,
        }
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// The word spoken at time `t`, if any
    pub fn word_at(&self, t: f64) -> Option<&Word> {
        self.index_at(t).map(|i| &self.words[i])
    }

    /// Index of the word at `t`, for hosts highlighting by position
    pub fn index_at(&self, t: f64) -> Option<usize> {
        // Last word starting at or before t
        let i = self.words.partition_point(|w| w.start <= t).checked_sub(1)?;
        (t < self.words[i].end).then_some(i)
    }
}
