//! Chunking of streamed replies for speech
//!
//! Tokens arrive faster than they can be spoken. The chunker buffers
//! deltas and releases a chunk once it forms a speakable unit: a finished
//! sentence, or enough text that waiting longer would add latency. The
//! first chunk waits for more text than later ones so speech doesn't open
//! with a fragment.

/// Buffer length that always flushes
const FLUSH_LEN: usize = 70;

/// Shorter flush length once speech has started
const FOLLOWUP_FLUSH_LEN: usize = 40;

/// Filter out text that would be read aloud as noise: bare ellipses and
/// "dot dot dot" renderings of an empty reply.
#[must_use]
pub fn speakable(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.chars().all(|c| c == '.' || c.is_whitespace()) {
        return None;
    }
    let dots_only = trimmed
        .split_whitespace()
        .all(|w| w.trim_end_matches('.').eq_ignore_ascii_case("dot"));
    if dots_only {
        return None;
    }
    Some(trimmed.to_string())
}

/// Accumulates streamed deltas into speakable chunks
#[derive(Debug, Default)]
pub struct SpeechChunker {
    buf: String,
    spoke_anything: bool,
}

impl SpeechChunker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any chunk has been released yet
    pub const fn has_spoken(&self) -> bool {
        self.spoke_anything
    }

    /// Append a delta and release a chunk if the buffer is ready.
    pub fn push(&mut self, delta: &str) -> Option<String> {
        self.buf.push_str(delta);
        self.take_if_ready(false)
    }

    /// Release whatever remains, ready or not.
    pub fn flush(&mut self) -> Option<String> {
        self.take_if_ready(true)
    }

    fn take_if_ready(&mut self, force: bool) -> Option<String> {
        let trimmed = self.buf.trim();
        if trimmed.is_empty() {
            return None;
        }
        let len = trimmed.chars().count();
        let ready = force
            || trimmed.ends_with(['.', '!', '?'])
            || len >= FLUSH_LEN
            || (self.spoke_anything && len >= FOLLOWUP_FLUSH_LEN);
        if !ready {
            return None;
        }
        let chunk = trimmed.to_string();
        self.buf.clear();
        self.spoke_anything = true;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentence_end_flushes() {
        let mut chunker = SpeechChunker::new();
        assert!(chunker.push("Hello ").is_none());
        assert_eq!(chunker.push("there.").as_deref(), Some("Hello there."));
    }

    #[test]
    fn long_buffer_flushes_without_punctuation() {
        let mut chunker = SpeechChunker::new();
        let long = "a".repeat(FLUSH_LEN);
        assert_eq!(chunker.push(&long).as_deref(), Some(long.as_str()));
    }

    #[test]
    fn followup_chunks_flush_earlier() {
        let mut chunker = SpeechChunker::new();
        assert!(chunker.push("First sentence.").is_some());

        // 40 chars without punctuation is not enough for a first chunk but
        // is for a follow-up.
        let followup = "c".repeat(FOLLOWUP_FLUSH_LEN);
        assert_eq!(chunker.push(&followup).as_deref(), Some(followup.as_str()));

        let mut fresh = SpeechChunker::new();
        assert!(fresh.push(&followup).is_none());
    }

    #[test]
    fn flush_releases_partial_text() {
        let mut chunker = SpeechChunker::new();
        assert!(chunker.push("dangling words").is_none());
        assert_eq!(chunker.flush().as_deref(), Some("dangling words"));
        assert!(chunker.flush().is_none());
    }

    #[test]
    fn speakable_rejects_dots() {
        assert!(speakable("...").is_none());
        assert!(speakable(" . . . ").is_none());
        assert!(speakable("dot dot dot").is_none());
        assert!(speakable("Dot. Dot.").is_none());
        assert!(speakable("").is_none());
        assert_eq!(speakable("  fine.  ").as_deref(), Some("fine."));
    }
}
