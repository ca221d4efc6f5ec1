use std::ops::Range;

use crate::host::{BlockChild, BlockId, Editor, ModelRange, OBJECT_REPLACEMENT, Position};

/// Text of a block from its start up to the caret.
///
/// Returns `None` when the host no longer knows the caret's block.
pub fn leading_text(editor: &dyn Editor, caret: Position) -> Option<String> {
    let children = editor.block_children(caret.block)?;
    Some(text_before(&children, caret.offset))
}

/// Concatenate the children's text and keep the first `offset` characters.
/// Inline elements count as one [`OBJECT_REPLACEMENT`] character each.
pub fn text_before(children: &[BlockChild], offset: usize) -> String {
    let mut text = String::new();
    for child in children {
        match child {
            BlockChild::Text(node) => text.push_str(&node.data),
            BlockChild::Inline { .. } => text.push(OBJECT_REPLACEMENT),
        }
    }
    text.chars().take(offset).collect()
}

/// Resolve character-offset pairs into model ranges inside `block`.
///
/// Pairs that cannot be resolved (a bound past the block end, or a start
/// after the end) are dropped without error.
pub fn offsets_to_ranges(
    editor: &dyn Editor,
    block: BlockId,
    pairs: &[Range<usize>],
) -> Vec<ModelRange> {
    pairs
        .iter()
        .filter_map(|pair| {
            let start = editor.position_at(block, pair.start).ok()?;
            let end = editor.position_at(block, pair.end).ok()?;
            ModelRange::new(start, end).ok()
        })
        .collect()
}

/// Number of characters in `text` before byte index `byte`
pub(crate) fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}
