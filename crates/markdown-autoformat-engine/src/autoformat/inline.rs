use std::ops::Range;
use std::rc::Rc;

use regex::Regex;

use crate::autoformat::enqueue;
use crate::autoformat::offsets::{char_len, char_offset, leading_text, offsets_to_ranges};
use crate::autoformat::trigger::typed_character_caret;
use crate::error::ModelError;
use crate::host::{ChangeEvent, DocumentChangeObserver, Editor, ModelRange, Writer};

/// Character ranges found in the text before the caret.
///
/// `remove` holds delimiters to strip and `format` the content to mark up,
/// both relative to the start of the block. Order is insertion order; the
/// autoformatter sorts removals itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MatchResult {
    pub remove: Vec<Range<usize>>,
    pub format: Vec<Range<usize>>,
}

impl MatchResult {
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.format.is_empty()
    }
}

pub type TestFn = dyn Fn(&str) -> MatchResult;

/// Formats the given ranges. `Ok(false)` means nothing was formatted and the
/// delimiters stay in place.
pub type FormatFn = dyn Fn(&mut dyn Writer, &[ModelRange]) -> Result<bool, ModelError>;

/// Where the delimiter and content ranges come from
pub enum InlinePattern {
    /// Groups 1, 2 and 3 are opening delimiter, content and closing delimiter
    Regex(Regex),
    Custom(Box<TestFn>),
}

impl InlinePattern {
    pub fn custom<F>(test: F) -> Self
    where
        F: Fn(&str) -> MatchResult + 'static,
    {
        Self::Custom(Box::new(test))
    }

    fn into_test(self) -> Box<TestFn> {
        match self {
            Self::Regex(regex) => {
                if regex.captures_len() < 4 {
                    log::warn!(
                        "inline pattern {} has fewer than three capture groups and will never format",
                        regex.as_str()
                    );
                }
                Box::new(move |text| regex_test(&regex, text))
            }
            Self::Custom(test) => test,
        }
    }
}

impl From<Regex> for InlinePattern {
    fn from(regex: Regex) -> Self {
        Self::Regex(regex)
    }
}

/// What happens to the content ranges
#[derive(Clone)]
pub enum InlineTarget {
    /// Set this attribute on every range the schema allows it on
    Attribute(String),
    Callback(Rc<FormatFn>),
}

impl InlineTarget {
    pub fn callback<F>(format: F) -> Self
    where
        F: Fn(&mut dyn Writer, &[ModelRange]) -> Result<bool, ModelError> + 'static,
    {
        Self::Callback(Rc::new(format))
    }
}

impl From<&str> for InlineTarget {
    fn from(key: &str) -> Self {
        Self::Attribute(key.to_string())
    }
}

impl From<String> for InlineTarget {
    fn from(key: String) -> Self {
        Self::Attribute(key)
    }
}

/// Inline autoformatting: `**bold**`, `*italic*`, `` `code` ``.
///
/// On every qualifying keystroke the test runs over the text from block start
/// to the caret. When it reports both delimiters and content, one new batch
/// formats the content and then deletes the delimiters, last one first.
pub struct InlineAutoformatter {
    test: Box<TestFn>,
    format: Rc<FormatFn>,
    /// Attribute whose schema allowance narrows the content ranges
    attribute: Option<String>,
}

impl InlineAutoformatter {
    pub fn new(pattern: impl Into<InlinePattern>, target: impl Into<InlineTarget>) -> Self {
        let (format, attribute) = match target.into() {
            InlineTarget::Attribute(key) => (attribute_format(key.clone()), Some(key)),
            InlineTarget::Callback(format) => (format, None),
        };
        Self {
            test: pattern.into().into_test(),
            format,
            attribute,
        }
    }

    /// Build an autoformatter and subscribe it to `editor`'s change notifications.
    pub fn attach(
        editor: &mut dyn Editor,
        pattern: impl Into<InlinePattern>,
        target: impl Into<InlineTarget>,
    ) {
        Self::new(pattern, target).subscribe_to(editor);
    }

    /// Only format where the schema allows `key`; useful for callback targets.
    pub fn validate_against(mut self, key: impl Into<String>) -> Self {
        self.attribute = Some(key.into());
        self
    }

    pub fn subscribe_to(self, editor: &mut dyn Editor) {
        editor.subscribe(Box::new(self));
    }
}

fn attribute_format(key: String) -> Rc<FormatFn> {
    Rc::new(
        move |writer: &mut dyn Writer, ranges: &[ModelRange]| -> Result<bool, ModelError> {
            for range in ranges {
                writer.set_attribute(&key, true, range)?;
            }
            // The next typed character should not continue the mark.
            writer.remove_selection_attribute(&key);
            Ok(true)
        },
    )
}

impl DocumentChangeObserver for InlineAutoformatter {
    fn document_changed(&self, editor: &mut dyn Editor, event: &ChangeEvent) {
        let Some(caret) = typed_character_caret(editor, event) else {
            return;
        };
        let Some(text) = leading_text(editor, caret) else {
            return;
        };

        let found = (self.test)(&text);
        let mut remove = offsets_to_ranges(editor, caret.block, &found.remove);
        let format = offsets_to_ranges(editor, caret.block, &found.format);
        if remove.is_empty() || format.is_empty() {
            if !found.is_empty() {
                log::trace!("inline match left nothing to format or nothing to remove");
            }
            return;
        }
        remove.sort_by(|a, b| b.start.offset.cmp(&a.start.offset));

        log::debug!(
            "inline pattern matched: {} range(s) to format, {} to remove",
            format.len(),
            remove.len()
        );
        let apply = Rc::clone(&self.format);
        let attribute = self.attribute.clone();
        enqueue(editor, "inline", move |writer| {
            let valid = match &attribute {
                Some(key) => writer.valid_ranges(&format, key),
                None => format,
            };
            if valid.is_empty() {
                log::debug!("no range accepts {attribute:?}, keeping the text as typed");
                return Ok(());
            }
            if !apply(&mut *writer, &valid)? {
                return Ok(());
            }
            for range in &remove {
                writer.remove(range)?;
            }
            Ok(())
        });
    }
}

/// Run a three-group regex over `text` and collect every match.
///
/// Groups 1 and 3 become removal ranges and group 2 a format range. Scanning
/// stops at the first match missing any of the three groups. Text matched
/// before group 1 (a lookbehind stand-in such as `(?:^|\s)`) is skipped when
/// computing where the opening delimiter starts.
pub fn regex_test(regex: &Regex, text: &str) -> MatchResult {
    let mut result = MatchResult::default();

    for captures in regex.captures_iter(text) {
        let (Some(whole), Some(open), Some(content), Some(close)) = (
            captures.get(0),
            captures.get(1),
            captures.get(2),
            captures.get(3),
        ) else {
            break;
        };

        let open_len = char_len(open.as_str());
        let content_len = char_len(content.as_str());
        let close_len = char_len(close.as_str());
        let start = char_offset(text, whole.start())
            + char_len(whole.as_str()).saturating_sub(open_len + content_len + close_len);

        let content_start = start + open_len;
        let close_start = content_start + content_len;
        result.remove.push(start..content_start);
        result.format.push(content_start..close_start);
        result.remove.push(close_start..close_start + close_len);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelEditor;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::cell::RefCell;

    fn italic() -> Regex {
        Regex::new(r"(?:^|\s)(\*)([^*_]+)(\*)$").unwrap()
    }

    #[rstest]
    #[case("*foobar*", vec![0..1, 7..8], vec![1..7])]
    #[case("some *foo*", vec![5..6, 9..10], vec![6..9])]
    #[case("é *世界*", vec![2..3, 5..6], vec![3..5])]
    #[case("*foobar", vec![], vec![])]
    fn test_regex_test_offsets(
        #[case] text: &str,
        #[case] remove: Vec<Range<usize>>,
        #[case] format: Vec<Range<usize>>,
    ) {
        assert_eq!(regex_test(&italic(), text), MatchResult { remove, format });
    }

    #[test]
    fn test_regex_test_collects_every_match() {
        let regex = Regex::new(r"(`)([^`]+)(`)").unwrap();

        let found = regex_test(&regex, "`a` and `bc`");

        assert_eq!(found.remove, vec![0..1, 2..3, 8..9, 11..12]);
        assert_eq!(found.format, vec![1..2, 9..11]);
    }

    #[test]
    fn test_regex_test_stops_at_match_without_three_groups() {
        let regex = Regex::new(r"(_)([a-z]+)(_)?").unwrap();

        let found = regex_test(&regex, "_a_ _b");

        assert_eq!(found.remove, vec![0..1, 2..3]);
        assert_eq!(found.format, vec![1..2]);
    }

    #[test]
    fn test_regex_with_two_groups_never_matches() {
        let regex = Regex::new(r"(\*)(.+)\*").unwrap();
        assert!(regex_test(&regex, "*foo*").is_empty());
    }

    #[test]
    fn test_attribute_target_formats_and_strips_delimiters() {
        let mut editor = ModelEditor::from_markup("<paragraph>some *foo[]</paragraph>").unwrap();
        InlineAutoformatter::attach(&mut editor, italic(), "italic");

        editor.type_text("*").unwrap();

        assert_eq!(
            editor.data(),
            "<paragraph>some <italic>foo</italic>[]</paragraph>"
        );
        assert_eq!(editor.history().len(), 2);
    }

    #[test]
    fn test_custom_test_with_only_format_ranges_is_ignored() {
        let mut editor = ModelEditor::from_markup("<paragraph>foo[]</paragraph>").unwrap();
        InlineAutoformatter::attach(
            &mut editor,
            InlinePattern::custom(|_text| MatchResult {
                remove: vec![],
                format: vec![0..3],
            }),
            "bold",
        );

        editor.type_text("!").unwrap();

        assert_eq!(editor.data(), "<paragraph>foo![]</paragraph>");
        assert_eq!(editor.history().len(), 1);
    }

    #[test]
    fn test_callback_target_sees_valid_ranges() {
        let mut editor = ModelEditor::from_markup("<paragraph>~ab[]</paragraph>").unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let store = Rc::clone(&seen);
        InlineAutoformatter::attach(
            &mut editor,
            Regex::new(r"(~)([^~]+)(~)$").unwrap(),
            InlineTarget::callback(move |writer, ranges| {
                store
                    .borrow_mut()
                    .extend(ranges.iter().map(ModelRange::offsets));
                for range in ranges {
                    writer.set_attribute("strikethrough", true, range)?;
                }
                Ok(true)
            }),
        );

        editor.type_text("~").unwrap();

        assert_eq!(*seen.borrow(), vec![1..3]);
        assert_eq!(
            editor.data(),
            "<paragraph><strikethrough>ab</strikethrough>[]</paragraph>"
        );
    }

    #[test]
    fn test_callback_declining_keeps_delimiters() {
        let mut editor = ModelEditor::from_markup("<paragraph>~ab[]</paragraph>").unwrap();
        InlineAutoformatter::attach(
            &mut editor,
            Regex::new(r"(~)([^~]+)(~)$").unwrap(),
            InlineTarget::callback(|_writer, _ranges| Ok(false)),
        );

        editor.type_text("~").unwrap();

        assert_eq!(editor.data(), "<paragraph>~ab~[]</paragraph>");
        assert_eq!(editor.history().len(), 1);
    }
}
