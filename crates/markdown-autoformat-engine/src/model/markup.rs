//! A small tag syntax for describing documents in tests and on the command line.
//!
//! ```text
//! <paragraph>foo <bold>bar</bold>[]</paragraph><heading1>title</heading1>
//! ```
//!
//! - Top-level tags are blocks; tags nested inside a block are text attributes.
//! - `[` marks the selection anchor and `]` the focus; `[]` is a caret.
//! - Without markers the caret sits at the start of the first block.

use std::collections::BTreeSet;

use crate::error::ModelError;
use crate::host::{Position, Selection};
use crate::model::Document;

/// Build a document from markup.
pub fn parse(markup: &str) -> Result<Document, ModelError> {
    let mut document = Document::empty();
    let mut current_block = None;
    let mut attributes: Vec<String> = Vec::new();
    let mut anchor = None;
    let mut focus = None;
    let mut offset = 0;

    let chars: Vec<char> = markup.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '<' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == '>')
                    .ok_or_else(|| error(i, "unterminated tag"))?;
                let tag: String = chars[i + 1..i + close].iter().collect();
                i += close + 1;

                if let Some(name) = tag.strip_prefix('/') {
                    if let Some(open) = attributes.pop() {
                        if open != name {
                            return Err(error(i, &format!("expected </{open}>, found </{name}>")));
                        }
                    } else {
                        let block = current_block
                            .take()
                            .ok_or_else(|| error(i, &format!("unexpected </{name}>")))?;
                        let open = document.block(block)?.name().to_string();
                        if open != name {
                            return Err(error(i, &format!("expected </{open}>, found </{name}>")));
                        }
                    }
                } else if tag.is_empty() {
                    return Err(error(i, "empty tag"));
                } else if current_block.is_none() {
                    current_block = Some(document.push_block(&tag));
                    offset = 0;
                } else {
                    attributes.push(tag);
                }
                continue;
            }
            '[' | ']' => {
                let block = current_block.ok_or_else(|| error(i, "selection outside a block"))?;
                let position = Position::new(block, offset);
                if ch == '[' {
                    anchor = Some(position);
                } else {
                    focus = Some(position);
                }
            }
            _ if current_block.is_none() => {
                if !ch.is_whitespace() {
                    return Err(error(i, "text outside a block"));
                }
            }
            _ => {
                let block = current_block.ok_or_else(|| error(i, "text outside a block"))?;
                let keys: BTreeSet<String> = attributes.iter().cloned().collect();
                document.insert_text(&Position::new(block, offset), &ch.to_string(), &keys)?;
                offset += 1;
            }
        }
        i += 1;
    }

    if let Some(block) = current_block {
        let name = document.block(block)?.name().to_string();
        return Err(error(chars.len(), &format!("unclosed <{name}>")));
    }

    let first = document
        .blocks()
        .first()
        .map(|block| Position::new(block.id(), 0))
        .ok_or_else(|| error(0, "document has no blocks"))?;
    let selection = match (anchor, focus) {
        (Some(anchor), Some(focus)) => Selection { anchor, focus },
        (Some(only), None) | (None, Some(only)) => Selection::collapsed(only),
        (None, None) => Selection::collapsed(first),
    };
    document.set_selection(selection);
    Ok(document)
}

/// Render a document back into markup, selection markers included.
pub fn render(document: &Document) -> String {
    let selection = document.selection();
    let mut out = String::new();

    for block in document.blocks() {
        let markers = |offset: usize| {
            let mut s = String::new();
            if selection.anchor == Position::new(block.id(), offset) {
                s.push('[');
            }
            if selection.focus == Position::new(block.id(), offset) {
                s.push(']');
            }
            s
        };

        out.push_str(&format!("<{}>", block.name()));
        let mut offset = 0;
        for node in block.text_nodes() {
            out.push_str(&markers(offset));
            for key in &node.attributes {
                out.push_str(&format!("<{key}>"));
            }
            for (i, ch) in node.data.chars().enumerate() {
                if i > 0 {
                    out.push_str(&markers(offset));
                }
                out.push(ch);
                offset += 1;
            }
            for key in node.attributes.iter().rev() {
                out.push_str(&format!("</{key}>"));
            }
        }
        out.push_str(&markers(offset));
        out.push_str(&format!("</{}>", block.name()));
    }

    out
}

fn error(at: usize, reason: &str) -> ModelError {
    ModelError::Markup {
        at,
        reason: reason.to_string(),
    }
}
