//! Romanization adapter around the `pinyin` crate.
//!
//! Pure and offline: Han characters become space-separated pinyin syllables,
//! anything else passes through unchanged. Nothing here can fail.

use ::pinyin::ToPinyin;
use serde::{Deserialize, Serialize};

/// Convert Chinese text to pinyin, with or without tone marks.
///
/// Consecutive non-Han characters are kept together as a single pass-through
/// token; empty or whitespace-only input yields an empty string.
///
/// ```
/// assert_eq!(hanviet::pinyin::romanize("你好", true), "nǐ hǎo");
/// assert_eq!(hanviet::pinyin::romanize("你好", false), "ni hao");
/// ```
pub fn romanize(text: &str, tone_marks: bool) -> String {
    let text = text.trim();
    if text.is_empty() {
        return String::new();
    }

    let mut tokens: Vec<String> = Vec::new();
    let mut passthrough = String::new();

    // Pass-through runs are trimmed before joining so whitespace around
    // them does not double up next to the inserted separators.
    let mut flush = |run: &mut String, tokens: &mut Vec<String>| {
        let trimmed = run.trim();
        if !trimmed.is_empty() {
            tokens.push(trimmed.to_string());
        }
        run.clear();
    };

    for ch in text.chars() {
        match ch.to_pinyin() {
            Some(syllable) => {
                flush(&mut passthrough, &mut tokens);
                let rendered = if tone_marks {
                    syllable.with_tone()
                } else {
                    syllable.plain()
                };
                tokens.push(rendered.to_string());
            }
            None => passthrough.push(ch),
        }
    }

    flush(&mut passthrough, &mut tokens);

    tokens.join(" ")
}

/// Tone digit (1-4, 5 = neutral) for each Han syllable in the text.
/// Non-Han characters contribute nothing.
pub fn tone_numbers(text: &str) -> Vec<u8> {
    text.trim()
        .chars()
        .filter_map(|ch| ch.to_pinyin())
        .map(|syllable| {
            syllable
                .with_tone_num_end()
                .chars()
                .last()
                .and_then(|c| c.to_digit(10))
                .map(|d| d as u8)
                .unwrap_or(5)
        })
        .collect()
}

/// Per-character detail shown by the "detailed analysis" lookup option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterAnalysis {
    pub character: char,
    pub is_han: bool,
    pub pinyin_toned: String,
    pub pinyin_plain: String,
    pub tone_number: u8,
}

/// Analyze a single character. Non-Han characters come back with the
/// character itself in both pinyin fields and a neutral tone.
pub fn analyze_character(character: char) -> CharacterAnalysis {
    match character.to_pinyin() {
        Some(syllable) => CharacterAnalysis {
            character,
            is_han: true,
            pinyin_toned: syllable.with_tone().to_string(),
            pinyin_plain: syllable.plain().to_string(),
            tone_number: tone_numbers(&character.to_string())
                .first()
                .copied()
                .unwrap_or(5),
        },
        None => CharacterAnalysis {
            character,
            is_han: false,
            pinyin_toned: character.to_string(),
            pinyin_plain: character.to_string(),
            tone_number: 5,
        },
    }
}
