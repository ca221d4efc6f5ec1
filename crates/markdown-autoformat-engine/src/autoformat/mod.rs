//! Typing-triggered autoformatting.
//!
//! Two observers share one gate ([`trigger::typed_character_caret`]) and one
//! set of offset helpers ([`offsets`]):
//!
//! - [`BlockAutoformatter`] matches the whole text before the caret and turns
//!   the block into something else (`# ` → heading, `* ` → list item).
//! - [`InlineAutoformatter`] finds delimiter/content/delimiter triples in the
//!   text before the caret, applies an attribute to the content and strips the
//!   delimiters (`**bold**`, `*italic*`).
//!
//! Neither keeps state between keystrokes. Matching happens while the typing
//! batch is being reported; the rewrite is enqueued and runs afterwards as a
//! batch of its own.

pub mod block;
pub mod inline;
pub mod offsets;
pub mod trigger;

pub use block::{BlockAction, BlockAutoformatter, BlockCallback, BlockMatch};
pub use inline::{
    FormatFn, InlineAutoformatter, InlinePattern, InlineTarget, MatchResult, TestFn, regex_test,
};

use crate::error::ModelError;
use crate::host::{Editor, Writer};

/// Queue `change` as a new batch, logging (and otherwise swallowing) failures.
fn enqueue<F>(editor: &mut dyn Editor, kind: &'static str, change: F)
where
    F: FnOnce(&mut dyn Writer) -> Result<(), ModelError> + 'static,
{
    editor.enqueue_change(Box::new(move |writer| {
        change(writer).inspect_err(|error| log::debug!("{kind} autoformat abandoned: {error}"))
    }));
}
