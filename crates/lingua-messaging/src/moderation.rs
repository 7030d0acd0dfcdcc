use std::collections::HashSet;

use anyhow::Result;

use crate::collaborators::Moderator;

const DEFAULT_WORDS: &[&str] = &[
    "asshole", "bastard", "bitch", "bullshit", "cunt", "dick", "fuck", "fucker", "fucking",
    "motherfucker", "shit", "slut", "whore",
];

/// Whole-word, case-insensitive block list. Matching words are masked with
/// `*`, one per character.
#[derive(Debug, Clone)]
pub struct WordListModerator {
    words: HashSet<String>,
}

impl Default for WordListModerator {
    fn default() -> Self {
        Self::new(DEFAULT_WORDS.iter().copied())
    }
}

impl WordListModerator {
    pub fn new<'a>(words: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            words: words.into_iter().map(str::to_lowercase).collect(),
        }
    }

    fn is_listed(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }
}

/// Split `text` into alternating runs of word and non-word characters.
fn runs(text: &str) -> impl Iterator<Item = (bool, &str)> {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let is_word = first.is_alphanumeric();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_alphanumeric() != is_word)
            .map_or(rest.len(), |(i, _)| i);
        let (run, tail) = rest.split_at(end);
        rest = tail;
        Some((is_word, run))
    })
}

impl Moderator for WordListModerator {
    fn classify_explicit(&self, text: &str) -> Result<bool> {
        Ok(runs(text).any(|(is_word, run)| is_word && self.is_listed(run)))
    }

    fn sanitize(&self, text: &str) -> Result<String> {
        let mut cleaned = String::with_capacity(text.len());
        for (is_word, run) in runs(text) {
            if is_word && self.is_listed(run) {
                cleaned.extend(std::iter::repeat_n('*', run.chars().count()));
            } else {
                cleaned.push_str(run);
            }
        }
        Ok(cleaned.trim().to_string())
    }
}
