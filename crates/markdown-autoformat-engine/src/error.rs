use thiserror::Error;

use crate::host::BlockId;

/// Failures reported by a host while building positions or applying a change.
///
/// The autoformatters never surface these to the user: a failing change is
/// logged at debug level and the keystroke is left as typed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Block {0:?} does not exist")]
    UnknownBlock(BlockId),

    #[error("Offset {offset} is outside block {block:?} (length {length})")]
    InvalidPosition {
        block: BlockId,
        offset: usize,
        length: usize,
    },

    #[error("Range must start and end in the same block ({start:?} vs {end:?})")]
    CrossBlockRange { start: BlockId, end: BlockId },

    #[error("Range start {start} is after its end {end}")]
    InvertedRange { start: usize, end: usize },

    #[error("Command '{0}' is not registered")]
    UnknownCommand(String),

    #[error("Command '{0}' is disabled")]
    CommandDisabled(String),

    #[error("Invalid markup at character {at}: {reason}")]
    Markup { at: usize, reason: String },
}
