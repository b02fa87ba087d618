//! Text-input rewriting: auto-close pairs, barge-out of closers, em/en dash
//! collapse, and double-space guarding.
//!
//! For each raw keystroke the filter peeks at the character at the caret,
//! the one to its left, and the one before that, then rewrites the stroke
//! into a sequence of synthetic keystrokes. All output for one input is
//! applied inside a single compound edit so it undoes as one step.

use crate::text::{TextFileModel, ViewDocId};

pub const EM_DASH: char = '\u{2014}';
pub const EN_DASH: char = '\u{2013}';

const SPACE_SKIPS: [char; 8] = ['}', ']', ',', '!', ')', '.', '?', '"'];
const COMMA_SKIPS: [char; 4] = ['}', ']', ')', '"'];

/// Characters around the caret: at it, left of it, and one further left.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProximalChars {
    pub current: Option<char>,
    pub previous: Option<char>,
    pub before_last: Option<char>,
}

impl ProximalChars {
    pub fn at(text: &str, cursor: usize) -> Self {
        let nth = |pos: Option<usize>| pos.and_then(|p| text.chars().nth(p));

        Self {
            current: nth(Some(cursor)),
            previous: nth(cursor.checked_sub(1)),
            before_last: nth(cursor.checked_sub(2)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntheticKey {
    Input(char),
    Backspace,
    Left,
    Right,
}

use SyntheticKey::{Backspace, Input, Left, Right};

/// Rewrite one keystroke into its synthetic sequence.
pub fn filter(input: char, chars: ProximalChars) -> Vec<SyntheticKey> {
    match input {
        '{' => auto_close(input, '}'),
        '[' => auto_close(input, ']'),
        '(' => auto_close(input, ')'),
        '}' | ']' | ')' => dont_duplicate(input, chars),
        '"' => {
            if chars.current == Some('"') {
                vec![Right]
            } else {
                auto_close(input, input)
            }
        }
        '-' => {
            if chars.previous == Some('-') {
                vec![Backspace, Input(EM_DASH)]
            } else {
                vec![Input(input)]
            }
        }
        ' ' => {
            if chars.previous == Some(' ')
                && chars.current.is_some_and(|c| SPACE_SKIPS.contains(&c))
            {
                vec![Backspace, Right, Input(' ')]
            } else if chars.previous == Some('-') && chars.before_last == Some(' ') {
                vec![Backspace, Input(EN_DASH), Input(' ')]
            } else {
                vec![Input(input)]
            }
        }
        ',' | '.' | '!' | '?' => comma_skip(input, chars),
        _ => {
            if chars.previous == Some(' ') && chars.before_last == Some(' ') {
                vec![Backspace, Input(input)]
            } else {
                vec![Input(input)]
            }
        }
    }
}

fn auto_close(open: char, close: char) -> Vec<SyntheticKey> {
    vec![Input(open), Input(close), Left]
}

fn dont_duplicate(input: char, chars: ProximalChars) -> Vec<SyntheticKey> {
    if chars.current == Some(input) {
        vec![Right]
    } else {
        vec![Input(input)]
    }
}

fn comma_skip(input: char, chars: ProximalChars) -> Vec<SyntheticKey> {
    if chars.previous == Some(',') && chars.current.is_some_and(|c| COMMA_SKIPS.contains(&c)) {
        vec![Backspace, Input(input), Right]
    } else {
        vec![Input(input)]
    }
}

/// Run one keystroke through the filter and apply the whole sequence to the
/// given view document as one compound edit. `cursor` is the view's caret,
/// updated in place.
pub fn apply_filtered(
    model: &mut TextFileModel,
    view: ViewDocId,
    cursor: &mut usize,
    input: char,
) {
    let chars = model
        .view_text(view)
        .map(|text| ProximalChars::at(text, *cursor))
        .unwrap_or_default();

    model.begin_compound_edit();
    for key in filter(input, chars) {
        apply_key(model, view, cursor, key);
    }
    model.end_compound_edit();
}

/// Apply a single synthetic keystroke at the caret.
pub fn apply_key(model: &mut TextFileModel, view: ViewDocId, cursor: &mut usize, key: SyntheticKey) {
    match key {
        Input(ch) => {
            model.edit(view, *cursor, 0, &ch.to_string());
            *cursor += 1;
        }
        Backspace => {
            if *cursor > 0 {
                model.edit(view, *cursor - 1, 1, "");
                *cursor -= 1;
            }
        }
        Left => *cursor = cursor.saturating_sub(1),
        Right => *cursor = (*cursor + 1).min(model.char_count()),
    }
}
