//! Types for speech recognition and synthesis

use serde::{Deserialize, Serialize};

/// A piece of recognized speech
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEvent {
    /// Recognized text, trimmed
    pub text: String,
    /// Whether the recognizer considers this segment final
    pub is_final: bool,
    /// Recognizer confidence for final segments, when reported
    pub confidence: Option<f32>,
}

impl TranscriptEvent {
    /// An interim (still-changing) segment
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence: None,
        }
    }

    /// A final segment with optional confidence
    pub fn final_segment(text: impl Into<String>, confidence: Option<f32>) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence,
        }
    }
}

/// Lifecycle and transcript events from a recognition session
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// The session opened and is capturing audio
    Started,
    /// The session ended (device stop, silence cutoff, or abort)
    Ended,
    /// The device reported an error; the session may end after this
    Error(String),
    /// Recognized speech, interim or final
    Transcript(TranscriptEvent),
}

/// Voice gender preference for synthesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Female,
    Male,
    Any,
}

/// A synthesis voice reported by the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceInfo {
    /// Display name, e.g. "Google UK English Female"
    pub name: String,
    /// Device-specific identifier
    pub uri: String,
    /// BCP 47 language tag, e.g. "en-US"
    pub lang: String,
    /// Whether the device marks this voice as its default
    pub is_default: bool,
}

/// Delivery controls for one utterance.
///
/// Defaults are tuned for a calm conversational register rather than the
/// device defaults, which tend to read too fast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeakOptions {
    /// BCP 47 language tag used for voice selection
    #[serde(default = "default_lang")]
    pub lang: String,
    /// Preferred voice gender
    #[serde(default = "default_gender")]
    pub gender: VoiceGender,
    /// Speaking rate multiplier
    #[serde(default = "default_rate")]
    pub rate: f32,
    /// Pitch multiplier
    #[serde(default = "default_pitch")]
    pub pitch: f32,
    /// Volume in `0.0..=1.0`
    #[serde(default = "default_volume")]
    pub volume: f32,
}

fn default_lang() -> String {
    "en-US".to_string()
}

const fn default_gender() -> VoiceGender {
    VoiceGender::Female
}

const fn default_rate() -> f32 {
    0.9
}

const fn default_pitch() -> f32 {
    1.03
}

const fn default_volume() -> f32 {
    0.95
}

impl Default for SpeakOptions {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            gender: default_gender(),
            rate: default_rate(),
            pitch: default_pitch(),
            volume: default_volume(),
        }
    }
}

/// One piece of text to speak
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub options: SpeakOptions,
}

impl Utterance {
    /// Build an utterance with default delivery, trimming the text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into().trim().to_string(),
            options: SpeakOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SpeakOptions) -> Self {
        self.options = options;
        self
    }

    /// Empty utterances are skipped rather than sent to the device
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speak_options_default_to_conversational_delivery() {
        let opts = SpeakOptions::default();
        assert_eq!(opts.lang, "en-US");
        assert_eq!(opts.gender, VoiceGender::Female);
        assert!((opts.rate - 0.9).abs() < f32::EPSILON);
        assert!((opts.pitch - 1.03).abs() < f32::EPSILON);
        assert!((opts.volume - 0.95).abs() < f32::EPSILON);
    }

    #[test]
    fn utterance_trims_text() {
        let utt = Utterance::new("  hello  ");
        assert_eq!(utt.text, "hello");
        assert!(!utt.is_empty());
        assert!(Utterance::new("   ").is_empty());
    }

    #[test]
    fn utterance_carries_replacement_options() {
        let opts = SpeakOptions {
            lang: "en-GB".to_string(),
            ..SpeakOptions::default()
        };
        let utt = Utterance::new("hello").with_options(opts);
        assert_eq!(utt.options.lang, "en-GB");
    }

    #[test]
    fn transcript_constructors_mark_finality() {
        assert!(!TranscriptEvent::interim("hm").is_final);
        let seg = TranscriptEvent::final_segment("done", Some(0.92));
        assert!(seg.is_final);
        assert_eq!(seg.confidence, Some(0.92));
    }
}
