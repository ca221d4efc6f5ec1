use std::collections::BTreeSet;

use crate::error::ModelError;
use crate::host::{
    BlockId, ChangeEntry, ChangeKind, ModelRange, Position, Selection, TEXT_NODE, Writer,
};
use crate::model::{CommandRegistry, Document, Schema};

/// Mutation handle for one batch of the reference host.
///
/// Every operation is applied to the document immediately and recorded as a
/// [`ChangeEntry`]; the editor turns the recorded entries into the batch's
/// [`crate::host::ChangeEvent`] once the batch closure returns.
pub struct ModelWriter<'a> {
    document: &'a mut Document,
    schema: &'a Schema,
    commands: &'a CommandRegistry,
    changes: Vec<ChangeEntry>,
}

impl<'a> ModelWriter<'a> {
    pub(crate) fn new(
        document: &'a mut Document,
        schema: &'a Schema,
        commands: &'a CommandRegistry,
    ) -> Self {
        Self {
            document,
            schema,
            commands,
            changes: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &*self.document
    }

    pub(crate) fn into_changes(self) -> Vec<ChangeEntry> {
        self.changes
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.document.set_selection(selection);
    }

    /// Insert text carrying an explicit attribute set.
    pub fn insert_text_with_attributes(
        &mut self,
        position: &Position,
        text: &str,
        attributes: &BTreeSet<String>,
    ) -> Result<(), ModelError> {
        if text.is_empty() {
            return Ok(());
        }
        let length = self.document.insert_text(position, text, attributes)?;
        self.record(ChangeKind::Insert, TEXT_NODE, length, *position);
        Ok(())
    }

    /// Forget explicit typing attributes; the caret inherits them again.
    pub fn reset_selection_attributes(&mut self) {
        self.document.reset_typing_attributes();
    }

    fn record(&mut self, kind: ChangeKind, name: &str, length: usize, position: Position) {
        self.changes.push(ChangeEntry {
            kind,
            name: name.to_string(),
            length,
            position,
        });
    }
}

impl Writer for ModelWriter<'_> {
    fn set_attribute(
        &mut self,
        key: &str,
        value: bool,
        range: &ModelRange,
    ) -> Result<(), ModelError> {
        self.document.set_attribute(key, value, range)?;
        if !range.is_empty() {
            self.record(ChangeKind::Attribute, key, range.len(), range.start);
        }
        Ok(())
    }

    fn remove_selection_attribute(&mut self, key: &str) {
        self.document.remove_typing_attribute(key);
    }

    fn remove(&mut self, range: &ModelRange) -> Result<(), ModelError> {
        let length = self.document.remove(range)?;
        if length > 0 {
            self.record(ChangeKind::Remove, TEXT_NODE, length, range.start);
        }
        Ok(())
    }

    fn insert_text(&mut self, position: &Position, text: &str) -> Result<(), ModelError> {
        self.insert_text_with_attributes(position, text, &BTreeSet::new())
    }

    fn rename_block(&mut self, block: BlockId, name: &str) -> Result<(), ModelError> {
        self.document.rename_block(block, name)?;
        self.record(ChangeKind::Rename, name, 1, Position::new(block, 0));
        Ok(())
    }

    fn execute_command(&mut self, name: &str) -> Result<bool, ModelError> {
        let command = self
            .commands
            .get(name)
            .ok_or_else(|| ModelError::UnknownCommand(name.to_string()))?;
        if !command.is_enabled(&*self.document) {
            return Ok(false);
        }
        command.execute(self)?;
        Ok(true)
    }

    fn valid_ranges(&self, ranges: &[ModelRange], key: &str) -> Vec<ModelRange> {
        self.schema.valid_ranges(&*self.document, ranges, key)
    }
}
