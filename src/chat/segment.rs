//! Sentence segmentation for streaming replies
//!
//! Accumulates reply tokens and cuts speech-sized chunks at sentence
//! boundaries so synthesis can start before the full reply has arrived.

use std::sync::LazyLock;

use regex::Regex;

/// Sentence-level terminators, Latin and CJK
pub const SENTENCE_TERMINATORS: &[char] =
    &['.', '?', '!', ':', ';', '。', '？', '！', '：', '；'];

/// Citation markers injected into grounded replies, e.g. `[doc3]`
static CITATION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[doc\d+\]").expect("valid regex"));

/// Output of feeding one token to the segmenter
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SegmentStep {
    /// Fragment to render immediately (newlines intact)
    pub display: String,

    /// Complete sentences ready for synthesis
    pub utterances: Vec<String>,
}

/// Incremental sentence segmenter
///
/// A boundary is declared when a token is exactly a newline (single or
/// double), or when a 1-2 character token starts with a sentence terminator.
/// Newlines embedded in longer tokens are stripped before accumulation.
#[derive(Debug)]
pub struct SentenceSegmenter {
    pending: String,
    strip_citations: bool,
}

impl SentenceSegmenter {
    /// Create a segmenter; `strip_citations` removes `[docN]` markers from
    /// grounded replies before display and accumulation
    #[must_use]
    pub fn new(strip_citations: bool) -> Self {
        Self {
            pending: String::new(),
            strip_citations,
        }
    }

    /// Feed one reply token
    pub fn push(&mut self, token: &str) -> SegmentStep {
        let mut step = SegmentStep::default();

        let token = if self.strip_citations && CITATION_REGEX.is_match(token) {
            CITATION_REGEX.replace_all(token, "").trim().to_string()
        } else {
            token.to_string()
        };
        if token.is_empty() {
            return step;
        }

        step.display.clone_from(&token);

        if token == "\n" || token == "\n\n" {
            if let Some(sentence) = self.take_pending() {
                step.utterances.push(sentence);
            }
            return step;
        }

        let flat = token.replace('\n', "");
        self.pending.push_str(&flat);

        let mut chars = flat.chars();
        if let Some(first) = chars.next() {
            let len = 1 + chars.count();
            if len <= 2 && SENTENCE_TERMINATORS.contains(&first) {
                if let Some(sentence) = self.take_pending() {
                    step.utterances.push(sentence);
                }
            }
        }

        step
    }

    /// Flush whatever is still pending as a final utterance
    pub fn flush(&mut self) -> Option<String> {
        self.take_pending()
    }

    fn take_pending(&mut self) -> Option<String> {
        let sentence = self.pending.trim().to_string();
        self.pending.clear();
        if sentence.is_empty() { None } else { Some(sentence) }
    }
}
