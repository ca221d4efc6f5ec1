use std::collections::BTreeSet;
use std::ops::Range;

use xi_rope::delta::{Builder, Transformer};
use xi_rope::{Delta, Rope, RopeInfo};

use crate::error::ModelError;
use crate::host::{BlockChild, BlockId, ModelRange, Position, Selection, TextNode};

/// An attribute applied over a byte range of a block's rope
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct AttributeSpan {
    pub(crate) key: String,
    pub(crate) range: Range<usize>,
}

/// A top-level block: its element name, its text and the attribute spans
/// laid over that text.
///
/// Text lives in an `xi_rope::Rope`. Spans are kept as byte ranges so that
/// they can be moved through edit deltas with a `Transformer`; the public API
/// speaks in character offsets.
#[derive(Clone, Debug)]
pub struct Block {
    id: BlockId,
    name: String,
    text: Rope,
    spans: Vec<AttributeSpan>,
}

impl Block {
    fn new(id: BlockId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            text: Rope::from(""),
            spans: Vec::new(),
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> String {
        self.text.to_string()
    }

    /// Length in characters
    pub fn len(&self) -> usize {
        self.text().chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.len() == 0
    }

    /// Maximal runs of text sharing the same attribute set.
    pub fn text_nodes(&self) -> Vec<TextNode> {
        let text = self.text();
        let mut bounds: Vec<usize> = vec![0, text.len()];
        for span in &self.spans {
            bounds.push(span.range.start);
            bounds.push(span.range.end);
        }
        bounds.sort_unstable();
        bounds.dedup();

        let mut nodes: Vec<TextNode> = Vec::new();
        for pair in bounds.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if start >= end {
                continue;
            }
            let attributes: BTreeSet<String> = self
                .spans
                .iter()
                .filter(|span| span.range.start <= start && span.range.end >= end)
                .map(|span| span.key.clone())
                .collect();
            let data = &text[start..end];

            match nodes.last_mut() {
                Some(last) if last.attributes == attributes => last.data.push_str(data),
                _ => nodes.push(TextNode {
                    data: data.to_string(),
                    attributes,
                }),
            }
        }
        nodes
    }

    /// Attributes of the character starting at `offset`, if there is one.
    pub fn attributes_at(&self, offset: usize) -> Option<BTreeSet<String>> {
        let text = self.text();
        let (start, ch) = text.char_indices().nth(offset)?;
        let end = start + ch.len_utf8();
        Some(
            self.spans
                .iter()
                .filter(|span| span.range.start <= start && span.range.end >= end)
                .map(|span| span.key.clone())
                .collect(),
        )
    }

    fn byte_offset(&self, offset: usize) -> Option<usize> {
        byte_offset_in(&self.text(), offset)
    }

    fn byte_range(&self, range: &ModelRange) -> Result<Range<usize>, ModelError> {
        let invalid = |offset| ModelError::InvalidPosition {
            block: self.id,
            offset,
            length: self.len(),
        };
        let start = self
            .byte_offset(range.start.offset)
            .ok_or_else(|| invalid(range.start.offset))?;
        let end = self
            .byte_offset(range.end.offset)
            .ok_or_else(|| invalid(range.end.offset))?;
        Ok(start..end)
    }

    /// Cut `bytes` out of every span of `key`.
    fn clear_key(&mut self, key: &str, bytes: &Range<usize>) {
        let mut kept = Vec::with_capacity(self.spans.len() + 1);
        for span in self.spans.drain(..) {
            if span.key != key || span.range.end <= bytes.start || span.range.start >= bytes.end {
                kept.push(span);
                continue;
            }
            if span.range.start < bytes.start {
                kept.push(AttributeSpan {
                    key: span.key.clone(),
                    range: span.range.start..bytes.start,
                });
            }
            if span.range.end > bytes.end {
                kept.push(AttributeSpan {
                    key: span.key,
                    range: bytes.end..span.range.end,
                });
            }
        }
        self.spans = kept;
    }

    /// Merge overlapping or touching spans of the same key and drop empty ones.
    fn normalize_spans(&mut self) {
        self.spans.retain(|span| !span.range.is_empty());
        self.spans
            .sort_by(|a, b| (&a.key, a.range.start).cmp(&(&b.key, b.range.start)));

        let mut merged: Vec<AttributeSpan> = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            match merged.last_mut() {
                Some(last) if last.key == span.key && span.range.start <= last.range.end => {
                    last.range.end = last.range.end.max(span.range.end);
                }
                _ => merged.push(span),
            }
        }
        self.spans = merged;
    }
}

/// Convert a character offset into a byte offset; `offset == len` is valid.
fn byte_offset_in(text: &str, offset: usize) -> Option<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .nth(offset)
}

/// In-memory document used as the reference editing host.
///
/// Holds an ordered list of blocks, the selection and the selection's typing
/// attributes. All mutations go through [`crate::model::ModelWriter`], which
/// compiles them into xi-rope deltas and reports what changed.
#[derive(Clone, Debug)]
pub struct Document {
    blocks: Vec<Block>,
    selection: Selection,
    /// Explicit typing attributes. `None` inherits from the text around the caret.
    typing_attributes: Option<BTreeSet<String>>,
    version: u64,
    next_block_id: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding one empty paragraph with the caret inside it
    pub fn new() -> Self {
        let mut document = Self::empty();
        let block = document.push_block("paragraph");
        document.selection = Selection::collapsed(Position::new(block, 0));
        document
    }

    /// A document without blocks. Only useful as a starting point for builders.
    pub(crate) fn empty() -> Self {
        Self {
            blocks: Vec::new(),
            selection: Selection::collapsed(Position::new(BlockId(0), 0)),
            typing_attributes: None,
            version: 0,
            next_block_id: 0,
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, id: BlockId) -> Result<&Block, ModelError> {
        self.blocks
            .iter()
            .find(|block| block.id == id)
            .ok_or(ModelError::UnknownBlock(id))
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn bump_version(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    pub(crate) fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.typing_attributes = None;
    }

    /// Attributes the next typed character will carry.
    ///
    /// Explicit typing attributes win; otherwise they are inherited from the
    /// character before the caret, or after it at the start of a block.
    pub fn typing_attributes(&self) -> BTreeSet<String> {
        if let Some(explicit) = &self.typing_attributes {
            return explicit.clone();
        }

        let focus = self.selection.focus;
        let Ok(block) = self.block(focus.block) else {
            return BTreeSet::new();
        };
        let inherited = match focus.offset {
            0 => block.attributes_at(0),
            offset => block.attributes_at(offset - 1),
        };
        inherited.unwrap_or_default()
    }

    pub(crate) fn remove_typing_attribute(&mut self, key: &str) {
        let mut attributes = self.typing_attributes();
        attributes.remove(key);
        self.typing_attributes = Some(attributes);
    }

    pub(crate) fn reset_typing_attributes(&mut self) {
        self.typing_attributes = None;
    }

    pub(crate) fn push_block(&mut self, name: &str) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        self.blocks.push(Block::new(id, name));
        id
    }

    pub fn position_at(&self, block: BlockId, offset: usize) -> Result<Position, ModelError> {
        let length = self.block(block)?.len();
        if offset > length {
            return Err(ModelError::InvalidPosition {
                block,
                offset,
                length,
            });
        }
        Ok(Position::new(block, offset))
    }

    pub fn children(&self, block: BlockId) -> Result<Vec<BlockChild>, ModelError> {
        Ok(self
            .block(block)?
            .text_nodes()
            .into_iter()
            .map(BlockChild::Text)
            .collect())
    }

    fn block_index(&self, id: BlockId) -> Result<usize, ModelError> {
        self.blocks
            .iter()
            .position(|block| block.id == id)
            .ok_or(ModelError::UnknownBlock(id))
    }

    /// Insert `text` carrying `attributes` at `position`.
    /// Returns the number of inserted characters.
    pub(crate) fn insert_text(
        &mut self,
        position: &Position,
        text: &str,
        attributes: &BTreeSet<String>,
    ) -> Result<usize, ModelError> {
        let index = self.block_index(position.block)?;
        let block = &self.blocks[index];
        let at = block
            .byte_offset(position.offset)
            .ok_or_else(|| ModelError::InvalidPosition {
                block: position.block,
                offset: position.offset,
                length: block.len(),
            })?;

        let mut builder = Builder::new(block.text.len());
        builder.replace(at..at, Rope::from(text));
        self.apply_delta(index, &builder.build());

        // Inserted text carries exactly `attributes`, even inside a span.
        let inserted = at..at + text.len();
        let block = &mut self.blocks[index];
        let inherited: BTreeSet<String> = block
            .spans
            .iter()
            .filter(|span| span.range.start < inserted.end && span.range.end > inserted.start)
            .map(|span| span.key.clone())
            .collect();
        for key in inherited.difference(attributes) {
            block.clear_key(key, &inserted);
        }
        for key in attributes {
            block.spans.push(AttributeSpan {
                key: key.clone(),
                range: inserted.clone(),
            });
        }
        block.normalize_spans();
        Ok(text.chars().count())
    }

    /// Delete the text covered by `range`. Returns the removed length.
    pub(crate) fn remove(&mut self, range: &ModelRange) -> Result<usize, ModelError> {
        let index = self.block_index(range.block())?;
        let bytes = self.blocks[index].byte_range(range)?;
        if bytes.is_empty() {
            return Ok(0);
        }

        let mut builder = Builder::new(self.blocks[index].text.len());
        builder.delete(bytes);
        self.apply_delta(index, &builder.build());
        self.blocks[index].normalize_spans();
        Ok(range.len())
    }

    /// Set (`value == true`) or clear an attribute over `range`.
    pub(crate) fn set_attribute(
        &mut self,
        key: &str,
        value: bool,
        range: &ModelRange,
    ) -> Result<(), ModelError> {
        let index = self.block_index(range.block())?;
        let block = &mut self.blocks[index];
        let bytes = block.byte_range(range)?;
        if bytes.is_empty() {
            return Ok(());
        }

        if value {
            block.spans.push(AttributeSpan {
                key: key.to_string(),
                range: bytes,
            });
        } else {
            block.clear_key(key, &bytes);
        }
        block.normalize_spans();
        Ok(())
    }

    pub(crate) fn rename_block(&mut self, id: BlockId, name: &str) -> Result<(), ModelError> {
        let index = self.block_index(id)?;
        self.blocks[index].name = name.to_string();
        Ok(())
    }

    /// Apply a delta to one block's rope, moving its spans and any selection
    /// end inside it along with the edit.
    ///
    /// Selection offsets are converted to bytes against the old text before
    /// the delta is applied, and back to characters against the new text.
    fn apply_delta(&mut self, index: usize, delta: &Delta<RopeInfo>) {
        let block_id = self.blocks[index].id;
        let old_text = self.blocks[index].text();

        let mut transformer = Transformer::new(delta);
        let mut move_position = |position: &mut Position| {
            if position.block != block_id {
                return;
            }
            if let Some(byte) = byte_offset_in(&old_text, position.offset) {
                let moved = transformer.transform(byte, true);
                position.offset = moved;
            }
        };
        let mut anchor = self.selection.anchor;
        let mut focus = self.selection.focus;
        move_position(&mut anchor);
        move_position(&mut focus);

        let block = &mut self.blocks[index];
        let mut transformer = Transformer::new(delta);
        for span in &mut block.spans {
            let start = transformer.transform(span.range.start, true);
            let end = transformer.transform(span.range.end, false);
            span.range = start..end.max(start);
        }
        block.text = delta.apply(&block.text);

        // Moved selection ends are byte offsets into the new text for now.
        let new_text = block.text();
        for position in [&mut anchor, &mut focus] {
            if position.block == block_id {
                position.offset = new_text[..position.offset.min(new_text.len())]
                    .chars()
                    .count();
            }
        }
        self.selection = Selection { anchor, focus };
    }
}
