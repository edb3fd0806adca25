//! Offset-based text edits.
//!
//! A change set is a list of insertions and deletions whose offsets all refer
//! to the same original snapshot of a file. Applying it walks the original
//! text once in offset order, so no edit ever observes another edit's shift.

use crate::error::{RelocateError, Result};

/// A single insertion or deletion at a byte offset of the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextEdit {
    Insert { index: usize, text: String },
    Delete { start: usize, length: usize },
}

impl TextEdit {
    /// Offset in the original text where this edit applies.
    pub fn position(&self) -> usize {
        match self {
            TextEdit::Insert { index, .. } => *index,
            TextEdit::Delete { start, .. } => *start,
        }
    }

    // Insertions sort ahead of deletions at the same offset.
    fn order_key(&self) -> (usize, u8) {
        match self {
            TextEdit::Insert { index, .. } => (*index, 0),
            TextEdit::Delete { start, .. } => (*start, 1),
        }
    }
}

/// Applies a change set to `content`, returning the edited text.
///
/// Edits are stably sorted by original offset (insertions before deletions
/// at the same offset) and merged in a single pass. Fails if an edit falls
/// outside the text, splits a UTF-8 character, or lands inside a span that
/// an earlier deletion already removed.
pub fn apply_changes(content: &str, changes: &[TextEdit]) -> Result<String> {
    for change in changes {
        validate(content, change)?;
    }

    let mut sorted: Vec<&TextEdit> = changes.iter().collect();
    sorted.sort_by_key(|c| c.order_key());

    let mut result = String::with_capacity(content.len());
    let mut cursor = 0;

    for change in sorted {
        let position = change.position();
        if position < cursor {
            return Err(RelocateError::InvalidEdit(format!(
                "edit at {} overlaps a deletion ending at {}",
                position, cursor
            )));
        }
        result.push_str(&content[cursor..position]);
        cursor = position;

        match change {
            TextEdit::Insert { text, .. } => result.push_str(text),
            TextEdit::Delete { length, .. } => cursor += length,
        }
    }

    result.push_str(&content[cursor..]);
    Ok(result)
}

fn validate(content: &str, change: &TextEdit) -> Result<()> {
    let (start, end) = match change {
        TextEdit::Insert { index, .. } => (*index, *index),
        TextEdit::Delete { start, length } => (*start, start.saturating_add(*length)),
    };

    if end > content.len() {
        return Err(RelocateError::InvalidEdit(format!(
            "{:?} exceeds text length {}",
            change,
            content.len()
        )));
    }
    if !content.is_char_boundary(start) || !content.is_char_boundary(end) {
        return Err(RelocateError::InvalidEdit(format!(
            "{:?} splits a character",
            change
        )));
    }
    Ok(())
}
