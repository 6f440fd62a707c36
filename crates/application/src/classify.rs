//! Classification of recognized speech
//!
//! While the assistant is speaking or thinking, the microphone stays open,
//! so recognized text has to be sorted into three buckets before anything
//! acts on it: control commands, echo of the assistant's own voice, and
//! genuine user speech.

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;

/// Control commands the user can speak at any time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceCommand {
    /// Cut off speech and the in-flight request
    Stop,
    /// Pause the current utterance in place
    Pause,
    /// Resume a paused utterance
    Resume,
}

/// Command keywords, grouped by the command they map to. "shut up" and
/// "hold on" survive normalization as two words with a single space.
const STOP_WORDS: &[&str] = &["stop", "cancel", "shut up"];
const PAUSE_WORDS: &[&str] = &["pause"];
const RESUME_WORDS: &[&str] = &["resume", "continue", "start"];

/// Phrase starters that signal a real barge-in rather than echo
const INTERRUPT_STARTERS: &[&str] = &[
    "wait", "hold on", "listen", "actually", "sorry", "excuse me", "hey", "stop", "cancel", "no",
    "but",
];

const SHORT_ACKS: &[&str] = &["ok", "okay", "yeah", "yes", "no", "hmm"];

#[allow(clippy::expect_used)]
static COMMAND_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    let patterns: Vec<&str> = STOP_WORDS
        .iter()
        .chain(PAUSE_WORDS)
        .chain(RESUME_WORDS)
        .copied()
        .collect();
    AhoCorasick::new(patterns).expect("static pattern set")
});

#[allow(clippy::expect_used)]
static INTERRUPT_MATCHER: LazyLock<AhoCorasick> =
    LazyLock::new(|| AhoCorasick::new(INTERRUPT_STARTERS).expect("static pattern set"));

/// Lowercase, strip punctuation, collapse whitespace. All classification
/// below runs on normalized text.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn word_bounded(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let before = start == 0 || bytes[start - 1] == b' ';
    let after = end == bytes.len() || bytes[end] == b' ';
    before && after
}

/// Scan a phrase for a control command.
///
/// Commands match anywhere in the phrase, since interim transcripts often
/// carry surrounding words. Stop always wins; when pause and resume both
/// occur, the later occurrence reflects the user's final intent.
#[must_use]
pub fn parse_voice_command(text: &str) -> Option<VoiceCommand> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }

    let stop_patterns = STOP_WORDS.len();
    let pause_patterns = stop_patterns + PAUSE_WORDS.len();

    let mut has_stop = false;
    let mut last_pause = None;
    let mut last_resume = None;

    for m in COMMAND_MATCHER.find_iter(&normalized) {
        if !word_bounded(&normalized, m.start(), m.end()) {
            continue;
        }
        let idx = m.pattern().as_usize();
        if idx < stop_patterns {
            has_stop = true;
        } else if idx < pause_patterns {
            last_pause = Some(m.start());
        } else {
            last_resume = Some(m.start());
        }
    }

    if has_stop {
        return Some(VoiceCommand::Stop);
    }
    match (last_pause, last_resume) {
        (Some(p), Some(r)) => Some(if r > p {
            VoiceCommand::Resume
        } else {
            VoiceCommand::Pause
        }),
        (Some(_), None) => Some(VoiceCommand::Pause),
        (None, Some(_)) => Some(VoiceCommand::Resume),
        (None, None) => None,
    }
}

/// Bare acknowledgements that interrupt speech but are not worth a model
/// round-trip. Expects normalized input.
#[must_use]
pub fn is_short_ack(normalized: &str) -> bool {
    SHORT_ACKS.contains(&normalized)
}

/// Whether a normalized phrase reads like the user cutting in
#[must_use]
pub fn is_interrupt_starter(normalized: &str) -> bool {
    if normalized.is_empty() {
        return false;
    }
    if is_short_ack(normalized) {
        return true;
    }
    INTERRUPT_MATCHER
        .find_iter(normalized)
        .any(|m| word_bounded(normalized, m.start(), m.end()))
}

fn content_words(normalized: &str) -> Vec<&str> {
    normalized.split(' ').filter(|w| w.len() >= 3).collect()
}

/// Whether recognized text is likely the microphone hearing the
/// assistant's own voice.
///
/// Two signals: the heard text is a substring of what the assistant is
/// saying, or nearly all of its content words overlap with it. Both
/// require the user to have introduced no novel words, so a real
/// interruption that happens to reuse the assistant's words still gets
/// through. False positives here break barge-in, so the thresholds stay
/// conservative.
#[must_use]
pub fn looks_like_echo(heard: &str, ai_speech: &str) -> bool {
    let ai = normalize(ai_speech);
    let heard = normalize(heard);
    if ai.is_empty() || heard.is_empty() {
        return false;
    }

    let ai_words: std::collections::HashSet<&str> = content_words(&ai).into_iter().collect();
    let heard_words = content_words(&heard);
    let novel = heard_words
        .iter()
        .filter(|w| !ai_words.contains(*w))
        .count();

    if ai.contains(heard.as_str()) && heard.chars().count() >= 10 {
        return novel == 0;
    }

    if heard_words.is_empty() || ai_words.is_empty() {
        return false;
    }
    let hits = heard_words.len() - novel;
    #[allow(clippy::cast_precision_loss)]
    let overlap = hits as f64 / heard_words.len() as f64;
    overlap >= 0.85 && heard_words.len() >= 4 && novel == 0
}
