use std::rc::Rc;

use regex::Regex;

use crate::autoformat::enqueue;
use crate::autoformat::offsets::{char_len, char_offset, leading_text};
use crate::autoformat::trigger::typed_character_caret;
use crate::error::ModelError;
use crate::host::{ChangeEvent, DocumentChangeObserver, Editor, ModelRange, Position, Writer};

/// What a block pattern matched, handed to callback actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockMatch {
    /// The matched text as a model range inside the caret's block
    pub range: ModelRange,
    /// Capture groups; index 0 is the whole match
    pub captures: Vec<Option<String>>,
}

pub type BlockCallback = Rc<dyn Fn(&mut dyn Writer, &BlockMatch) -> Result<(), ModelError>>;

/// What to do when a block pattern matches
#[derive(Clone)]
pub enum BlockAction {
    /// Delete the matched text, then execute the named command
    Command(String),
    /// Hand the match to a callback; it decides what to delete or transform
    Callback(BlockCallback),
}

impl BlockAction {
    pub fn command(name: impl Into<String>) -> Self {
        Self::Command(name.into())
    }

    pub fn callback<F>(callback: F) -> Self
    where
        F: Fn(&mut dyn Writer, &BlockMatch) -> Result<(), ModelError> + 'static,
    {
        Self::Callback(Rc::new(callback))
    }
}

impl From<&str> for BlockAction {
    fn from(name: &str) -> Self {
        Self::command(name)
    }
}

impl From<String> for BlockAction {
    fn from(name: String) -> Self {
        Self::Command(name)
    }
}

/// Block-level autoformatting: `# ` → heading, `* ` → bulleted list.
///
/// On every qualifying keystroke the pattern is run against the text from
/// the start of the caret's block up to the caret. Anchoring is entirely up
/// to the pattern; `^[*-]\s$` only fires for a marker typed at block start.
///
/// ```rust
/// use markdown_autoformat_engine::{BlockAutoformatter, ModelEditor, RenameBlockCommand};
/// use regex::Regex;
///
/// let mut editor = ModelEditor::from_markup("<paragraph>[]</paragraph>").unwrap();
/// editor.register_command("heading1", RenameBlockCommand::new("heading1"));
/// BlockAutoformatter::attach(&mut editor, Regex::new(r"^#\s$").unwrap(), "heading1");
///
/// editor.type_text("# Title").unwrap();
/// assert_eq!(editor.data(), "<heading1>Title[]</heading1>");
/// ```
pub struct BlockAutoformatter {
    pattern: Regex,
    action: BlockAction,
    ignored_blocks: Vec<String>,
}

impl BlockAutoformatter {
    pub fn new(pattern: Regex, action: impl Into<BlockAction>) -> Self {
        Self {
            pattern,
            action: action.into(),
            ignored_blocks: Vec::new(),
        }
    }

    /// Build an autoformatter and subscribe it to `editor`'s change notifications.
    pub fn attach(editor: &mut dyn Editor, pattern: Regex, action: impl Into<BlockAction>) {
        Self::new(pattern, action).subscribe_to(editor);
    }

    /// Never fire inside blocks with these names (e.g. `codeBlock`).
    pub fn ignore_blocks<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_blocks.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn subscribe_to(self, editor: &mut dyn Editor) {
        editor.subscribe(Box::new(self));
    }

    fn is_ignored(&self, editor: &dyn Editor, caret: Position) -> bool {
        editor
            .block_name(caret.block)
            .is_some_and(|name| self.ignored_blocks.contains(&name))
    }

    fn find_match(&self, editor: &dyn Editor, caret: Position) -> Option<BlockMatch> {
        let text = leading_text(editor, caret)?;
        let captures = self.pattern.captures(&text)?;
        let whole = captures.get(0)?;

        let start = char_offset(&text, whole.start());
        let end = start + char_len(whole.as_str());
        let range = ModelRange::new(
            editor.position_at(caret.block, start).ok()?,
            editor.position_at(caret.block, end).ok()?,
        )
        .ok()?;

        Some(BlockMatch {
            range,
            captures: captures
                .iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        })
    }
}

impl DocumentChangeObserver for BlockAutoformatter {
    fn document_changed(&self, editor: &mut dyn Editor, event: &ChangeEvent) {
        let Some(caret) = typed_character_caret(editor, event) else {
            return;
        };
        if self.is_ignored(editor, caret) {
            return;
        }
        let Some(found) = self.find_match(editor, caret) else {
            return;
        };

        match &self.action {
            BlockAction::Command(name) => {
                if editor.is_command_enabled(name) != Some(true) {
                    log::debug!("block pattern matched but command '{name}' is unavailable");
                    return;
                }
                log::debug!("block pattern matched, running '{name}'");
                let name = name.clone();
                enqueue(editor, "block", move |writer| {
                    writer.remove(&found.range)?;
                    if !writer.execute_command(&name)? {
                        return Err(ModelError::CommandDisabled(name));
                    }
                    Ok(())
                });
            }
            BlockAction::Callback(callback) => {
                let callback = Rc::clone(callback);
                enqueue(editor, "block", move |writer| callback(writer, &found));
            }
        }
    }
}
