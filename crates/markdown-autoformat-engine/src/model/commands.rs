use std::collections::HashMap;
use std::rc::Rc;

use crate::error::ModelError;
use crate::host::Writer;
use crate::model::{Document, ModelWriter};

/// A named operation that can be executed inside a batch
pub trait Command {
    fn is_enabled(&self, document: &Document) -> bool {
        let _ = document;
        true
    }

    fn execute(&self, writer: &mut ModelWriter<'_>) -> Result<(), ModelError>;
}

/// Commands available to the reference host, looked up by name
#[derive(Clone, Default)]
pub struct CommandRegistry {
    commands: HashMap<String, Rc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, command: impl Command + 'static) {
        self.commands.insert(name.to_string(), Rc::new(command));
    }

    pub fn get(&self, name: &str) -> Option<Rc<dyn Command>> {
        self.commands.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.commands.contains_key(name)
    }
}

/// Turns the block holding the caret into a block of another type.
///
/// Disabled when the caret's block already has the target name, so that
/// e.g. a heading command does not fire again inside a heading.
#[derive(Clone, Debug)]
pub struct RenameBlockCommand {
    target: String,
}

impl RenameBlockCommand {
    pub fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
        }
    }
}

impl Command for RenameBlockCommand {
    fn is_enabled(&self, document: &Document) -> bool {
        document
            .block(document.selection().focus.block)
            .is_ok_and(|block| block.name() != self.target)
    }

    fn execute(&self, writer: &mut ModelWriter<'_>) -> Result<(), ModelError> {
        let block = writer.document().selection().focus.block;
        writer.rename_block(block, &self.target)
    }
}
