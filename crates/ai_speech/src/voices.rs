//! Voice selection
//!
//! Devices report their voice list lazily, so callers poll with a short
//! bound before picking. Selection narrows by language, prefers the
//! higher-quality network voices when present, then matches a gender hint
//! by name before falling back to the device default.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing::debug;

use crate::ports::SpeechSynthesizer;
use crate::types::{VoiceGender, VoiceInfo};

/// How long to wait for the device to report voices
pub const VOICE_POLL_TIMEOUT_MS: u64 = 600;

const VOICE_POLL_INTERVAL_MS: u64 = 50;

/// Name fragments that identify female voices across common devices
const FEMALE_NAME_HINTS: &[&str] = &[
    "female", "woman", "zira", "samantha", "victoria", "karen", "moira", "tessa", "serena", "ava",
    "joanna", "kimberly", "susan", "amy", "emma", "olivia", "mia", "sara",
];

/// Poll the synthesizer until it reports voices or the bound elapses.
/// Returns whatever the device reported, possibly empty.
pub async fn voices_with_timeout(synthesizer: &Arc<dyn SpeechSynthesizer>) -> Vec<VoiceInfo> {
    let deadline = Instant::now() + Duration::from_millis(VOICE_POLL_TIMEOUT_MS);
    loop {
        let voices = synthesizer.voices();
        if !voices.is_empty() {
            return voices;
        }
        if Instant::now() >= deadline {
            debug!("no voices reported before the poll bound");
            return voices;
        }
        sleep(Duration::from_millis(VOICE_POLL_INTERVAL_MS)).await;
    }
}

/// Pick the best voice for a language and gender hint.
///
/// Candidates sharing the language's primary subtag are preferred; within
/// those, Google voices win over local ones, then a gender hint is matched
/// against the voice name. Returns `None` only for an empty list.
#[must_use]
pub fn pick_preferred_voice(
    voices: &[VoiceInfo],
    lang: &str,
    gender: VoiceGender,
) -> Option<VoiceInfo> {
    if voices.is_empty() {
        return None;
    }

    let lang_key: String = lang.to_lowercase().chars().take(2).collect();
    let candidates: Vec<&VoiceInfo> = voices
        .iter()
        .filter(|v| v.lang.to_lowercase().starts_with(&lang_key))
        .collect();
    let pool: Vec<&VoiceInfo> = if candidates.is_empty() {
        voices.iter().collect()
    } else {
        candidates
    };

    let lowered = |v: &VoiceInfo| format!("{} {}", v.name, v.uri).to_lowercase();

    let google: Vec<&VoiceInfo> = pool
        .iter()
        .copied()
        .filter(|v| lowered(v).contains("google"))
        .collect();
    let prefer: &[&VoiceInfo] = if google.is_empty() { &pool } else { &google };

    if gender == VoiceGender::Female {
        let best = prefer
            .iter()
            .copied()
            .find(|v| FEMALE_NAME_HINTS.iter().any(|h| lowered(v).contains(h)));
        if let Some(voice) = best {
            return Some(voice.clone());
        }
    }

    prefer
        .iter()
        .copied()
        .find(|v| v.is_default)
        .or_else(|| prefer.first().copied())
        .map(VoiceInfo::clone)
}
