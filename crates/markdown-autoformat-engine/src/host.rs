//! The seams between the autoformatters and the editing host.
//!
//! The document model, its writer, the differ and the command registry all
//! belong to the host. The engine only sees them through the [`Editor`] and
//! [`Writer`] traits and receives notifications through
//! [`DocumentChangeObserver`]. [`crate::model`] is an in-memory host that
//! implements all of them.

use std::collections::BTreeSet;
use std::ops::Range;

use crate::error::ModelError;

/// Name reported by change entries that concern text rather than elements.
pub const TEXT_NODE: &str = "$text";

/// Stand-in character for non-text inline children when a block's text is
/// reconstructed, so that character offsets keep matching model offsets.
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Stable identifier of a top-level block (paragraph, heading, list item)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

/// A location inside a block, counted in characters from the block start
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Position {
    pub block: BlockId,
    pub offset: usize,
}

impl Position {
    pub fn new(block: BlockId, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// A `[start, end)` span between two positions of the same block
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ModelRange {
    pub start: Position,
    pub end: Position,
}

impl ModelRange {
    /// Build a range, rejecting spans that cross blocks or run backwards.
    pub fn new(start: Position, end: Position) -> Result<Self, ModelError> {
        if start.block != end.block {
            return Err(ModelError::CrossBlockRange {
                start: start.block,
                end: end.block,
            });
        }
        if start.offset > end.offset {
            return Err(ModelError::InvertedRange {
                start: start.offset,
                end: end.offset,
            });
        }
        Ok(Self { start, end })
    }

    pub fn block(&self) -> BlockId {
        self.start.block
    }

    pub fn offsets(&self) -> Range<usize> {
        self.start.offset..self.end.offset
    }

    pub fn len(&self) -> usize {
        self.end.offset - self.start.offset
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }
}

/// Document selection. `focus` is where the caret is drawn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub focus: Position,
}

impl Selection {
    pub fn collapsed(at: Position) -> Self {
        Self {
            anchor: at,
            focus: at,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// The caret position, or `None` when something is selected.
    pub fn caret(&self) -> Option<Position> {
        self.is_collapsed().then_some(self.focus)
    }
}

/// How a committed batch should be treated by reactive listeners
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BatchType {
    #[default]
    Default,
    /// Internal or silent edits that must not trigger autoformatting
    Transparent,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Remove,
    Attribute,
    Rename,
}

/// One entry of the differ's change list for a batch
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEntry {
    pub kind: ChangeKind,
    /// `$text` for text changes, the attribute key or element name otherwise
    pub name: String,
    pub length: usize,
    pub position: Position,
}

impl ChangeEntry {
    /// True for the shape produced by typing exactly one character.
    pub fn is_single_character_insert(&self) -> bool {
        self.kind == ChangeKind::Insert && self.name == TEXT_NODE && self.length == 1
    }
}

/// Everything a batch changed, as reported after it was committed
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub batch_type: BatchType,
    pub entries: Vec<ChangeEntry>,
}

impl ChangeEvent {
    pub fn is_transparent(&self) -> bool {
        self.batch_type == BatchType::Transparent
    }
}

/// A run of text sharing one set of attributes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextNode {
    pub data: String,
    pub attributes: BTreeSet<String>,
}

/// A child of a block as exposed by the host
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockChild {
    Text(TextNode),
    /// A non-text inline element (image, soft break) occupying one offset
    Inline { name: String },
}

/// A mutation queued to run in its own batch.
pub type ChangeFn = Box<dyn FnOnce(&mut dyn Writer) -> Result<(), ModelError>>;

/// Read access to the host plus the ability to queue new batches.
pub trait Editor {
    fn selection(&self) -> Selection;

    fn block_name(&self, block: BlockId) -> Option<String>;

    /// Children of a block in document order, `None` for an unknown block.
    fn block_children(&self, block: BlockId) -> Option<Vec<BlockChild>>;

    /// Resolve a character offset inside a block into a model position.
    fn position_at(&self, block: BlockId, offset: usize) -> Result<Position, ModelError>;

    /// `None` when no command is registered under `name`.
    fn is_command_enabled(&self, name: &str) -> Option<bool>;

    /// Run `change` in a new batch once the batch being reported has been
    /// fully dispatched. Outside of a dispatch it runs immediately.
    fn enqueue_change(&mut self, change: ChangeFn);

    fn subscribe(&mut self, observer: Box<dyn DocumentChangeObserver>);
}

/// The mutation handle available inside a batch.
pub trait Writer {
    fn set_attribute(&mut self, key: &str, value: bool, range: &ModelRange)
    -> Result<(), ModelError>;

    /// Stop `key` from being applied to the next typed characters.
    fn remove_selection_attribute(&mut self, key: &str);

    fn remove(&mut self, range: &ModelRange) -> Result<(), ModelError>;

    fn insert_text(&mut self, position: &Position, text: &str) -> Result<(), ModelError>;

    fn rename_block(&mut self, block: BlockId, name: &str) -> Result<(), ModelError>;

    /// Execute a registered command inside the current batch.
    /// Returns `Ok(false)` when the command is disabled.
    fn execute_command(&mut self, name: &str) -> Result<bool, ModelError>;

    /// Narrow `ranges` to the sub-ranges where `key` is allowed by the schema.
    fn valid_ranges(&self, ranges: &[ModelRange], key: &str) -> Vec<ModelRange>;
}

/// Implemented by anything that reacts to committed batches.
pub trait DocumentChangeObserver {
    fn document_changed(&self, editor: &mut dyn Editor, event: &ChangeEvent);
}
