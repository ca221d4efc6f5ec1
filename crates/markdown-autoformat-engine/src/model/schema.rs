use std::collections::{BTreeSet, HashMap, HashSet};

use crate::host::{ModelRange, Position};
use crate::model::Document;

/// Attribute allowance rules for the reference host.
///
/// Two kinds of rule are supported:
/// - an attribute can be disallowed for all text of a block type
///   (e.g. `bold` inside `codeBlock`),
/// - two attributes can be declared mutually exclusive on the same text
///   (e.g. `bold` on text that already carries `code`).
#[derive(Clone, Debug, Default)]
pub struct Schema {
    disallowed_in_blocks: HashMap<String, HashSet<String>>,
    exclusive: HashMap<String, HashSet<String>>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn disallow_in_block(&mut self, block_name: &str, key: &str) -> &mut Self {
        self.disallowed_in_blocks
            .entry(block_name.to_string())
            .or_default()
            .insert(key.to_string());
        self
    }

    pub fn disallow_together(&mut self, key: &str, other: &str) -> &mut Self {
        self.exclusive
            .entry(key.to_string())
            .or_default()
            .insert(other.to_string());
        self.exclusive
            .entry(other.to_string())
            .or_default()
            .insert(key.to_string());
        self
    }

    /// Whether text inside `block_name` already carrying `attributes` may take `key`.
    pub fn check_attribute(
        &self,
        block_name: &str,
        attributes: &BTreeSet<String>,
        key: &str,
    ) -> bool {
        if self
            .disallowed_in_blocks
            .get(block_name)
            .is_some_and(|keys| keys.contains(key))
        {
            return false;
        }
        match self.exclusive.get(key) {
            Some(conflicts) => attributes.iter().all(|existing| !conflicts.contains(existing)),
            None => true,
        }
    }

    /// Split `ranges` into the maximal sub-ranges where `key` is allowed.
    /// Empty results are dropped.
    pub fn valid_ranges(
        &self,
        document: &Document,
        ranges: &[ModelRange],
        key: &str,
    ) -> Vec<ModelRange> {
        let mut valid = Vec::new();

        for range in ranges {
            let Ok(block) = document.block(range.block()) else {
                continue;
            };
            let wanted = range.offsets();
            let mut run: Option<(usize, usize)> = None;
            let mut offset = 0;

            for node in block.text_nodes() {
                let node_end = offset + node.data.chars().count();
                let start = offset.max(wanted.start);
                let end = node_end.min(wanted.end);
                offset = node_end;
                if start >= end {
                    continue;
                }

                if self.check_attribute(block.name(), &node.attributes, key) {
                    run = match run {
                        Some((run_start, _)) => Some((run_start, end)),
                        None => Some((start, end)),
                    };
                } else if let Some((run_start, run_end)) = run.take() {
                    valid.push(sub_range(range, run_start, run_end));
                }
            }

            if let Some((run_start, run_end)) = run {
                valid.push(sub_range(range, run_start, run_end));
            }
        }

        valid
    }
}

fn sub_range(range: &ModelRange, start: usize, end: usize) -> ModelRange {
    let block = range.block();
    ModelRange {
        start: Position::new(block, start),
        end: Position::new(block, end),
    }
}
