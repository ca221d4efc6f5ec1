use std::cell::Cell;
use std::rc::Rc;

use markdown_autoformat_engine::*;
use pretty_assertions::assert_eq;
use regex::Regex;

fn bold_regex() -> Regex {
    Regex::new(r"(\*)(.+?)(\*)").unwrap()
}

fn first_block(editor: &ModelEditor) -> BlockId {
    editor.document().blocks()[0].id()
}

fn range(block: BlockId, start: usize, end: usize) -> ModelRange {
    ModelRange::new(Position::new(block, start), Position::new(block, end)).unwrap()
}

/// Counts how often it is invoked and otherwise does nothing
fn counting_callback(calls: &Rc<Cell<usize>>) -> BlockAction {
    let calls = Rc::clone(calls);
    BlockAction::callback(move |_writer, _found| {
        calls.set(calls.get() + 1);
        Ok(())
    })
}

#[test]
fn typing_without_a_match_adds_no_batch() {
    let mut editor = ModelEditor::from_markup("<paragraph>foo[]</paragraph>").unwrap();
    InlineAutoformatter::attach(&mut editor, bold_regex(), "bold");
    BlockAutoformatter::attach(&mut editor, Regex::new(r"^[*]\s$").unwrap(), "bulletedList");

    editor.type_text("bar").unwrap();

    assert_eq!(editor.data(), "<paragraph>foobar[]</paragraph>");
    assert_eq!(editor.history().len(), 3);
}

#[test]
fn block_command_fires_once_and_empties_the_block() {
    let mut editor = ModelEditor::from_markup("<paragraph>[]</paragraph>").unwrap();
    editor.register_command("bulletedList", RenameBlockCommand::new("listItem"));
    BlockAutoformatter::attach(&mut editor, Regex::new(r"^[*]\s$").unwrap(), "bulletedList");

    editor.type_text("* ").unwrap();

    let block = &editor.document().blocks()[0];
    assert_eq!(block.name(), "listItem");
    assert!(block.is_empty());
    // "*", " ", then the autoformat batch
    assert_eq!(editor.history().len(), 3);
    let kinds: Vec<_> = editor.history()[2]
        .changes
        .iter()
        .map(|entry| entry.kind)
        .collect();
    assert_eq!(kinds, vec![ChangeKind::Remove, ChangeKind::Rename]);
}

#[test]
fn block_command_does_not_fire_again_in_the_formatted_block() {
    let mut editor = ModelEditor::from_markup("<paragraph>[]</paragraph>").unwrap();
    editor.register_command("bulletedList", RenameBlockCommand::new("listItem"));
    BlockAutoformatter::attach(&mut editor, Regex::new(r"^[*]\s$").unwrap(), "bulletedList");

    editor.type_text("* * ").unwrap();

    // The second "* " lands in a list item, where the command is disabled
    assert_eq!(editor.data(), "<listItem>* []</listItem>");
}

#[test]
fn block_callback_fires_once_per_matching_keystroke() {
    let mut editor = ModelEditor::from_markup("<paragraph>[]</paragraph>").unwrap();
    let calls = Rc::new(Cell::new(0));
    BlockAutoformatter::attach(
        &mut editor,
        Regex::new(r"^[*]\s$").unwrap(),
        counting_callback(&calls),
    );

    editor.type_text("* x").unwrap();

    assert_eq!(calls.get(), 1);
    // The callback removed nothing, so the marker stays
    assert_eq!(editor.data(), "<paragraph>* x[]</paragraph>");
}

#[test]
fn deletions_never_trigger() {
    let mut editor = ModelEditor::from_markup("<paragraph>* x[]</paragraph>").unwrap();
    let block = first_block(&editor);
    let calls = Rc::new(Cell::new(0));
    BlockAutoformatter::attach(
        &mut editor,
        Regex::new(r"^[*]\s$").unwrap(),
        counting_callback(&calls),
    );

    editor
        .change(|writer| writer.remove(&range(block, 2, 3)))
        .unwrap();

    assert_eq!(editor.data(), "<paragraph>* []</paragraph>");
    assert_eq!(calls.get(), 0);
}

#[test]
fn multi_character_and_attribute_changes_never_trigger() {
    let mut editor = ModelEditor::from_markup("<paragraph>*foobar[]</paragraph>").unwrap();
    let block = first_block(&editor);
    InlineAutoformatter::attach(&mut editor, bold_regex(), "bold");

    editor
        .change(|writer| writer.insert_text(&Position::new(block, 7), "**"))
        .unwrap();
    editor
        .change(|writer| writer.set_attribute("italic", true, &range(block, 0, 1)))
        .unwrap();

    assert_eq!(
        editor.data(),
        "<paragraph><italic>*</italic>foobar**[]</paragraph>"
    );
}

#[test]
fn transparent_batches_are_ignored() {
    let mut editor = ModelEditor::from_markup("<paragraph>*foobar[]</paragraph>").unwrap();
    let block = first_block(&editor);
    InlineAutoformatter::attach(&mut editor, bold_regex(), "bold");

    editor
        .change_with(BatchType::Transparent, |writer| {
            writer.insert_text(&Position::new(block, 7), "*")
        })
        .unwrap();

    assert_eq!(editor.data(), "<paragraph>*foobar*[]</paragraph>");
    assert_eq!(editor.history().len(), 1);
}

#[test]
fn non_collapsed_selection_suppresses_formatting() {
    let mut editor =
        ModelEditor::from_markup("<paragraph>*foobar</paragraph><paragraph>[x]</paragraph>")
            .unwrap();
    let block = first_block(&editor);
    InlineAutoformatter::attach(&mut editor, bold_regex(), "bold");

    editor
        .change(|writer| writer.insert_text(&Position::new(block, 7), "*"))
        .unwrap();

    assert_eq!(
        editor.data(),
        "<paragraph>*foobar*</paragraph><paragraph>[x]</paragraph>"
    );
}

#[test]
fn inline_bold_formats_content_and_strips_delimiters() {
    let mut editor = ModelEditor::from_markup("<paragraph>*foobar[]</paragraph>").unwrap();
    InlineAutoformatter::attach(&mut editor, bold_regex(), "bold");

    editor.type_text("*").unwrap();

    insta::assert_snapshot!(editor.data(), @"<paragraph><bold>foobar</bold>[]</paragraph>");
}

#[test]
fn inline_format_is_a_separate_batch() {
    let mut editor = ModelEditor::from_markup("<paragraph>*foobar[]</paragraph>").unwrap();
    InlineAutoformatter::attach(&mut editor, bold_regex(), "bold");

    editor.type_text("*").unwrap();

    let history = editor.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].changes.len(), 1);
    assert!(history[0].changes[0].is_single_character_insert());

    let kinds: Vec<_> = history[1]
        .changes
        .iter()
        .map(|entry| (entry.kind, entry.position.offset))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (ChangeKind::Attribute, 1),
            (ChangeKind::Remove, 7),
            (ChangeKind::Remove, 0),
        ]
    );
    assert!(history[0].version < history[1].version);
}

#[test]
fn typing_after_inline_format_does_not_continue_the_attribute() {
    let mut editor = ModelEditor::from_markup("<paragraph>*foobar[]</paragraph>").unwrap();
    InlineAutoformatter::attach(&mut editor, bold_regex(), "bold");

    editor.type_text("* x").unwrap();

    assert_eq!(
        editor.data(),
        "<paragraph><bold>foobar</bold> x[]</paragraph>"
    );
}

#[test]
fn pattern_with_fewer_than_three_groups_does_nothing() {
    let mut editor = ModelEditor::from_markup("<paragraph>*foobar[]</paragraph>").unwrap();
    InlineAutoformatter::attach(&mut editor, Regex::new(r"(\*)(.+?)\*").unwrap(), "bold");

    editor.type_text("*").unwrap();

    assert_eq!(editor.data(), "<paragraph>*foobar*[]</paragraph>");
    assert_eq!(editor.history().len(), 1);
}

#[test]
fn removals_run_from_the_end_of_the_block_backwards() {
    let mut editor = ModelEditor::from_markup("<paragraph>_abcd[]</paragraph>").unwrap();
    // Ascending order on purpose: deleting 0..1 first would leave 5..6 out of range
    InlineAutoformatter::attach(
        &mut editor,
        InlinePattern::custom(|text| {
            if text != "_abcd_" {
                return MatchResult::default();
            }
            MatchResult {
                remove: vec![0..1, 5..6],
                format: vec![1..5],
            }
        }),
        "bold",
    );

    editor.type_text("_").unwrap();

    assert_eq!(editor.data(), "<paragraph><bold>abcd</bold>[]</paragraph>");
}

#[test]
#[allow(clippy::reversed_empty_ranges)]
fn malformed_pairs_are_dropped() {
    let mut editor = ModelEditor::from_markup("<paragraph>_ab[]</paragraph>").unwrap();
    InlineAutoformatter::attach(
        &mut editor,
        InlinePattern::custom(|text| {
            if text != "_ab_" {
                return MatchResult::default();
            }
            MatchResult {
                remove: vec![3..4, 2..1, 0..1, 4..40],
                format: vec![1..3, 9..12],
            }
        }),
        "bold",
    );

    editor.type_text("_").unwrap();

    assert_eq!(editor.data(), "<paragraph><bold>ab</bold>[]</paragraph>");
}

#[test]
#[allow(clippy::reversed_empty_ranges)]
fn only_malformed_pairs_means_no_change() {
    let mut editor = ModelEditor::from_markup("<paragraph>_ab[]</paragraph>").unwrap();
    InlineAutoformatter::attach(
        &mut editor,
        InlinePattern::custom(|_text| MatchResult {
            remove: vec![0..1],
            format: vec![3..1],
        }),
        "bold",
    );

    editor.type_text("_").unwrap();

    assert_eq!(editor.data(), "<paragraph>_ab_[]</paragraph>");
    assert_eq!(editor.history().len(), 1);
}

#[test]
fn attribute_disallowed_by_schema_keeps_text_as_typed() {
    let mut editor = ModelEditor::from_markup("<heading1>*foobar[]</heading1>").unwrap();
    editor.schema_mut().disallow_in_block("heading1", "bold");
    InlineAutoformatter::attach(&mut editor, bold_regex(), "bold");

    editor.type_text("*").unwrap();

    assert_eq!(editor.data(), "<heading1>*foobar*[]</heading1>");
    assert_eq!(editor.history().len(), 1);
}

#[test]
fn attribute_is_applied_only_where_the_schema_allows_it() {
    let mut editor =
        ModelEditor::from_markup("<paragraph>*a<code>b</code>c[]</paragraph>").unwrap();
    editor.schema_mut().disallow_together("bold", "code");
    InlineAutoformatter::attach(&mut editor, bold_regex(), "bold");

    editor.type_text("*").unwrap();

    assert_eq!(
        editor.data(),
        "<paragraph><bold>a</bold><code>b</code><bold>c</bold>[]</paragraph>"
    );
}

#[test]
fn callback_target_validated_against_an_attribute() {
    let mut editor = ModelEditor::from_markup("<heading1>~ab[]</heading1>").unwrap();
    editor
        .schema_mut()
        .disallow_in_block("heading1", "strikethrough");
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    InlineAutoformatter::new(
        Regex::new(r"(~)([^~]+)(~)$").unwrap(),
        InlineTarget::callback(move |_writer, _ranges| {
            seen.set(seen.get() + 1);
            Ok(true)
        }),
    )
    .validate_against("strikethrough")
    .subscribe_to(&mut editor);

    editor.type_text("~").unwrap();

    assert_eq!(calls.get(), 0);
    assert_eq!(editor.data(), "<heading1>~ab~[]</heading1>");
}

#[test]
fn failing_callback_rolls_back_its_batch() {
    let mut editor = ModelEditor::from_markup("<paragraph>[]</paragraph>").unwrap();
    BlockAutoformatter::attach(
        &mut editor,
        Regex::new(r"^[*]\s$").unwrap(),
        BlockAction::callback(|writer, found| {
            writer.remove(&found.range)?;
            writer.execute_command("notRegistered")?;
            Ok(())
        }),
    );

    editor.type_text("* ").unwrap();

    assert_eq!(editor.data(), "<paragraph>* []</paragraph>");
    assert_eq!(editor.history().len(), 2);
}

#[test]
fn block_and_inline_autoformatters_work_together() {
    let mut editor = ModelEditor::from_markup("<paragraph>[]</paragraph>").unwrap();
    editor.register_command("heading1", RenameBlockCommand::new("heading1"));
    BlockAutoformatter::attach(&mut editor, Regex::new(r"^#\s$").unwrap(), "heading1");
    InlineAutoformatter::attach(
        &mut editor,
        Regex::new(r"(?:^|\s)(\*\*)([^*]+)(\*\*)$").unwrap(),
        "bold",
    );

    editor.type_text("# A **big** title").unwrap();

    insta::assert_snapshot!(editor.data(), @"<heading1>A <bold>big</bold> title[]</heading1>");
}
