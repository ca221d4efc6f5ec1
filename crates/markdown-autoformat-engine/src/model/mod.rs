/*!
 * # Reference Host
 *
 * An in-memory editing host implementing the [`crate::host`] traits. It plays
 * the part a real rich-text editor plays around the autoformatters:
 *
 * - **`document`**: blocks backed by `xi_rope::Rope`, attribute spans, the
 *   selection and its typing attributes
 * - **`writer`**: the per-batch mutation handle that records change entries
 * - **`schema`**: attribute allowance rules answering "valid ranges" queries
 * - **`commands`**: the command registry and a block-renaming command
 * - **`markup`**: a tag syntax for building and inspecting documents
 *
 * ## Batches
 *
 * Every call to [`ModelEditor::change`] produces at most one batch. Batches
 * that changed nothing are not recorded and not reported. After a batch is
 * committed every subscribed observer sees its [`ChangeEvent`]; changes the
 * observers enqueue run afterwards, each as a batch of its own, which is what
 * keeps an autoformat step separately undoable from the keystroke that
 * triggered it. A batch whose closure fails is rolled back.
 */

pub mod commands;
pub mod document;
pub mod markup;
pub mod schema;
pub mod writer;

pub use commands::{Command, CommandRegistry, RenameBlockCommand};
pub use document::{Block, Document};
pub use schema::Schema;
pub use writer::ModelWriter;

use std::collections::VecDeque;

use crate::error::ModelError;
use crate::host::{
    BatchType, BlockChild, BlockId, ChangeEntry, ChangeEvent, ChangeFn, DocumentChangeObserver,
    Editor, ModelRange, Position, Selection,
};

/// A committed batch as kept in the editor's history
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch {
    pub batch_type: BatchType,
    pub changes: Vec<ChangeEntry>,
    pub version: u64,
}

/// The reference editing host
#[derive(Default)]
pub struct ModelEditor {
    document: Document,
    schema: Schema,
    commands: CommandRegistry,
    observers: Vec<Box<dyn DocumentChangeObserver>>,
    pending: VecDeque<ChangeFn>,
    history: Vec<Batch>,
    dispatching: bool,
}

impl ModelEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_markup(markup: &str) -> Result<Self, ModelError> {
        let mut editor = Self::new();
        editor.set_data(markup)?;
        Ok(editor)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn schema_mut(&mut self) -> &mut Schema {
        &mut self.schema
    }

    pub fn register_command(&mut self, name: &str, command: impl Command + 'static) {
        self.commands.add(name, command);
    }

    /// Replace the whole document. Not a batch: nothing is recorded or reported.
    pub fn set_data(&mut self, markup: &str) -> Result<(), ModelError> {
        self.document = markup::parse(markup)?;
        self.history.clear();
        Ok(())
    }

    /// The document rendered as markup, selection included.
    pub fn data(&self) -> String {
        markup::render(&self.document)
    }

    /// Committed batches, oldest first
    pub fn history(&self) -> &[Batch] {
        &self.history
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.document.set_selection(selection);
    }

    /// Run `f` as one default batch.
    pub fn change<T, F>(&mut self, f: F) -> Result<T, ModelError>
    where
        F: FnOnce(&mut ModelWriter<'_>) -> Result<T, ModelError>,
    {
        self.change_with(BatchType::Default, f)
    }

    pub fn change_with<T, F>(&mut self, batch_type: BatchType, f: F) -> Result<T, ModelError>
    where
        F: FnOnce(&mut ModelWriter<'_>) -> Result<T, ModelError>,
    {
        let result = self.commit(batch_type, f);
        self.flush_pending();
        result
    }

    /// Execute a registered command in its own batch.
    pub fn execute(&mut self, name: &str) -> Result<bool, ModelError> {
        use crate::host::Writer;
        self.change(|writer| writer.execute_command(name))
    }

    /// Type `text` at the caret, one batch per character, the way a user would.
    ///
    /// A non-collapsed selection is replaced by the first character.
    pub fn type_text(&mut self, text: &str) -> Result<(), ModelError> {
        use crate::host::Writer;

        for ch in text.chars() {
            let selection = self.document.selection();
            let attributes = self.document.typing_attributes();
            self.change(|writer| {
                let caret = if selection.is_collapsed() {
                    selection.focus
                } else {
                    let (start, end) = ordered(selection.anchor, selection.focus);
                    writer.remove(&ModelRange::new(start, end)?)?;
                    start
                };
                writer.insert_text_with_attributes(&caret, &ch.to_string(), &attributes)?;
                writer.reset_selection_attributes();
                Ok(())
            })?;
        }
        Ok(())
    }

    fn commit<T, F>(&mut self, batch_type: BatchType, f: F) -> Result<T, ModelError>
    where
        F: FnOnce(&mut ModelWriter<'_>) -> Result<T, ModelError>,
    {
        let before = self.document.clone();
        let mut writer = ModelWriter::new(&mut self.document, &self.schema, &self.commands);
        let output = f(&mut writer);
        let changes = writer.into_changes();

        let value = match output {
            Ok(value) => value,
            Err(error) => {
                log::debug!("rolling back failed batch: {error}");
                self.document = before;
                return Err(error);
            }
        };

        if changes.is_empty() {
            return Ok(value);
        }

        let version = self.document.bump_version();
        log::trace!(
            "committed {batch_type:?} batch v{version} with {} change(s)",
            changes.len()
        );
        self.history.push(Batch {
            batch_type,
            changes: changes.clone(),
            version,
        });
        self.notify(&ChangeEvent {
            batch_type,
            entries: changes,
        });
        Ok(value)
    }

    fn notify(&mut self, event: &ChangeEvent) {
        let observers = std::mem::take(&mut self.observers);
        let was_dispatching = std::mem::replace(&mut self.dispatching, true);

        for observer in &observers {
            observer.document_changed(self, event);
        }

        self.dispatching = was_dispatching;
        // Observers subscribed during dispatch landed in the emptied list.
        let added = std::mem::replace(&mut self.observers, observers);
        self.observers.extend(added);
    }

    fn flush_pending(&mut self) {
        if self.dispatching {
            return;
        }
        while let Some(change) = self.pending.pop_front() {
            if let Err(error) = self.commit(BatchType::Default, |writer| change(writer)) {
                log::debug!("queued change failed: {error}");
            }
        }
    }
}

fn ordered(a: Position, b: Position) -> (Position, Position) {
    if a.offset <= b.offset { (a, b) } else { (b, a) }
}

impl Editor for ModelEditor {
    fn selection(&self) -> Selection {
        self.document.selection()
    }

    fn block_name(&self, block: BlockId) -> Option<String> {
        self.document
            .block(block)
            .ok()
            .map(|block| block.name().to_string())
    }

    fn block_children(&self, block: BlockId) -> Option<Vec<BlockChild>> {
        self.document.children(block).ok()
    }

    fn position_at(&self, block: BlockId, offset: usize) -> Result<Position, ModelError> {
        self.document.position_at(block, offset)
    }

    fn is_command_enabled(&self, name: &str) -> Option<bool> {
        self.commands
            .get(name)
            .map(|command| command.is_enabled(&self.document))
    }

    fn enqueue_change(&mut self, change: ChangeFn) {
        self.pending.push_back(change);
        self.flush_pending();
    }

    fn subscribe(&mut self, observer: Box<dyn DocumentChangeObserver>) {
        self.observers.push(observer);
    }
}
