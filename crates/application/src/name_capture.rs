//! Spoken name capture
//!
//! Users introduce themselves mid-conversation ("hi, I'm Maya"). The
//! introduction is detected, the name remembered, and the intro stripped
//! from the text before it reaches the model, so the assistant doesn't
//! parrot the introduction back.

use domain::UserName;

/// Introduction phrases, tried in order. Each may appear anywhere in the
/// phrase; the name follows immediately after.
const INTRO_PHRASES: &[&str] = &["my name is ", "i am ", "i'm ", "im ", "call me "];

/// Words that end a name when the user tacks on politeness
const TRAILING_FILLERS: &[&str] = &["please", "bro", "sir", "ma'am", "mam", "miss", "buddy", "friend"];

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '\'' || c == '-' || c == ' '
}

/// Find an introduction phrase at a word boundary, returning the offset
/// just past it.
fn find_intro(lower: &str, phrase: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(rel) = lower[from..].find(phrase) {
        let pos = from + rel;
        let bounded = pos == 0
            || lower[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_alphanumeric());
        if bounded {
            return Some(pos + phrase.len());
        }
        from = pos + 1;
    }
    None
}

/// Extract the raw name span following an intro offset
fn name_span(lower: &str, start: usize) -> Option<&str> {
    let tail = &lower[start..];
    if !tail.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let end = tail
        .char_indices()
        .find(|(_, c)| !is_name_char(*c))
        .map_or(tail.len(), |(i, _)| i);
    Some(&tail[..end])
}

/// Cut the span at the first politeness filler word
fn trim_fillers(span: &str) -> String {
    let mut kept = Vec::new();
    for word in span.split_whitespace() {
        if TRAILING_FILLERS.contains(&word) {
            break;
        }
        kept.push(word);
    }
    kept.join(" ")
}

/// Look for a spoken self-introduction and capture the name.
///
/// Returns `None` when no introduction is present or the name cleans down
/// to nothing.
#[must_use]
pub fn extract_name(text: &str) -> Option<UserName> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    for phrase in INTRO_PHRASES {
        let Some(start) = find_intro(&lower, phrase) else {
            continue;
        };
        let Some(span) = name_span(&lower, start) else {
            continue;
        };
        let trimmed = trim_fillers(span);
        if let Ok(name) = UserName::parse(&trimmed) {
            return Some(name);
        }
    }
    None
}

/// Remove a leading self-introduction, keeping the rest of the phrase.
///
/// "I'm Maya, what's the weather?" becomes "what's the weather?"; a bare
/// "I'm Maya" becomes empty, which callers treat as name-only input that
/// needs no model round-trip.
#[must_use]
pub fn strip_name_intro(text: &str) -> String {
    let mut rest = text.trim().to_string();
    for phrase in INTRO_PHRASES {
        let lower = rest.to_lowercase();
        if !lower.starts_with(phrase) {
            continue;
        }
        let Some(span) = name_span(&lower, phrase.len()) else {
            continue;
        };
        let mut cut = phrase.len() + span.len();
        // Trailing punctuation after the name also goes.
        let bytes = rest.as_bytes();
        if cut < bytes.len() && matches!(bytes[cut], b',' | b'.' | b'!') {
            cut += 1;
        }
        rest = rest[cut..].trim().to_string();
    }
    rest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_the_common_introductions() {
        assert_eq!(extract_name("my name is maya").unwrap().as_str(), "Maya");
        assert_eq!(extract_name("I'm john smith").unwrap().as_str(), "John Smith");
        assert_eq!(extract_name("i am Sara").unwrap().as_str(), "Sara");
        assert_eq!(extract_name("call me Max").unwrap().as_str(), "Max");
        assert_eq!(extract_name("hey there, my name is Ada").unwrap().as_str(), "Ada");
    }

    #[test]
    fn ignores_phrases_without_an_introduction() {
        assert!(extract_name("what's the weather like").is_none());
        assert!(extract_name("").is_none());
    }

    #[test]
    fn trims_politeness_words() {
        assert_eq!(extract_name("call me Dave please").unwrap().as_str(), "Dave");
        assert_eq!(extract_name("i'm Joe buddy").unwrap().as_str(), "Joe");
    }

    #[test]
    fn requires_word_boundaries() {
        // "slim " should not trigger the "im " phrase.
        assert!(extract_name("the slim one").is_none());
    }

    #[test]
    fn name_must_start_with_a_letter() {
        assert!(extract_name("my name is 42").is_none());
    }

    #[test]
    fn strip_removes_a_leading_intro() {
        assert_eq!(strip_name_intro("I'm Maya, what's the weather?"), "what's the weather?");
        assert_eq!(strip_name_intro("my name is John. tell me a joke"), "tell me a joke");
        assert_eq!(strip_name_intro("call me Ada"), "");
    }

    #[test]
    fn strip_leaves_mid_sentence_intros_alone() {
        let text = "by the way my name is Ada";
        assert_eq!(strip_name_intro(text), text);
    }

    #[test]
    fn hyphens_and_apostrophes_survive() {
        assert_eq!(extract_name("i'm mary-jane o'brien").unwrap().as_str(), "Mary-jane O'brien");
    }
}
