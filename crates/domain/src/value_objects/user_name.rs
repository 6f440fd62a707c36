//! User name captured from a spoken introduction

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Maximum length of a captured name, matching what a spoken
/// introduction can reasonably contain.
const MAX_LEN: usize = 40;

/// A cleaned, title-cased user name.
///
/// Raw speech-recognition output is noisy: it can carry punctuation,
/// digits, and stray whitespace. `parse` strips everything that is not a
/// letter, apostrophe, hyphen or space, collapses whitespace, caps the
/// length, and title-cases each word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserName(String);

impl UserName {
    /// Clean and validate a raw name
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let cleaned: String = raw
            .chars()
            .map(|c| {
                if c.is_alphabetic() || c == '\'' || c == '-' {
                    c
                } else {
                    ' '
                }
            })
            .collect();

        let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
        if collapsed.is_empty() {
            return Err(DomainError::InvalidUserName(raw.to_string()));
        }

        let mut capped = collapsed;
        if capped.len() > MAX_LEN {
            // Cut on a char boundary: letters outside ASCII are multi-byte
            let mut cut = MAX_LEN;
            while !capped.is_char_boundary(cut) {
                cut -= 1;
            }
            capped.truncate(cut);
            capped = capped.trim_end().to_string();
        }

        let titled = capped
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(title_case_word)
            .collect::<Vec<_>>()
            .join(" ");

        Ok(Self(titled))
    }

    /// The cleaned name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
        },
        None => String::new(),
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
