use unicode_width::UnicodeWidthStr;

/// How typed answers are compared against a word's translation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerPolicy {
    /// Compare exactly (after trimming) instead of case-insensitively
    pub strict: bool,
    pub reveal_hints: bool,
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self {
            strict: false,
            reveal_hints: true,
        }
    }
}

const HINT_MASK: char = '_';

/// Separators that split a translation into accepted alternatives
const ALTERNATIVE_SEPARATORS: [char; 2] = [',', ';'];

fn normalize(text: &str, strict: bool) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if strict {
        collapsed
    } else {
        collapsed.to_lowercase()
    }
}

impl AnswerPolicy {
    pub fn new(strict: bool, reveal_hints: bool) -> Self {
        Self {
            strict,
            reveal_hints,
        }
    }

    /// `expected` may list alternatives ("house, home"); any one is accepted.
    /// Strict mode compares the whole translation only.
    pub fn is_correct(&self, answer: &str, expected: &str) -> bool {
        let answer = normalize(answer, self.strict);
        if answer.is_empty() {
            return false;
        }

        if answer == normalize(expected, self.strict) {
            return true;
        }

        !self.strict
            && expected
                .split(ALTERNATIVE_SEPARATORS)
                .map(|alt| normalize(alt, false))
                .any(|alt| !alt.is_empty() && alt == answer)
    }

    /// Masked form of `expected` with the first `revealed` letters shown.
    /// Whitespace and punctuation are never masked.
    pub fn hint(&self, expected: &str, revealed: usize) -> Option<String> {
        if !self.reveal_hints {
            return None;
        }

        let mut shown = 0;
        let hint = expected
            .trim()
            .chars()
            .map(|c| {
                if !c.is_alphanumeric() {
                    c
                } else if shown < revealed {
                    shown += 1;
                    c
                } else {
                    HINT_MASK
                }
            })
            .collect();
        Some(hint)
    }

    /// Letters to reveal after `attempts_used` wrong answers
    pub fn hint_letters(attempts_used: u32) -> usize {
        attempts_used as usize
    }
}

/// Display width of the longest line, used to size the answer box
pub fn answer_width(text: &str) -> usize {
    text.lines().map(UnicodeWidthStr::width).max().unwrap_or(0)
}
