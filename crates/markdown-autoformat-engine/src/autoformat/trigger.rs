use crate::host::{ChangeEvent, Editor, Position};

/// Decide whether a committed batch looks like one character typed at a caret.
///
/// Both autoformatters share this gate. It rejects:
/// - transparent batches (silent internal edits),
/// - non-collapsed selections,
/// - any change list other than a single `$text` insertion of length 1
///   (pastes, deletions, attribute-only changes, multi-character inserts).
///
/// Returns the caret position when the batch qualifies.
pub fn typed_character_caret(editor: &dyn Editor, event: &ChangeEvent) -> Option<Position> {
    if event.is_transparent() {
        log::trace!("ignoring transparent batch");
        return None;
    }

    let Some(caret) = editor.selection().caret() else {
        log::trace!("ignoring change: selection is not collapsed");
        return None;
    };

    match event.entries.as_slice() {
        [entry] if entry.is_single_character_insert() => Some(caret),
        entries => {
            log::trace!("ignoring change set of {} entries", entries.len());
            None
        }
    }
}
