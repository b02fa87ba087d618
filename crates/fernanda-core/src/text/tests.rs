use super::*;
use crate::files::meta::FileMeta;
use crate::files::model::FileModel;

fn model_with_text(text: &str) -> TextFileModel {
    let mut model = TextFileModel::new(FileMeta::off_disk());
    model.set_data(text.as_bytes());
    model.set_modified(false);
    model
}

#[test]
fn registration_initializes_from_prime_without_history() {
    let mut model = model_with_text("abc");
    let view = model.register_view_document();

    assert_eq!(model.view_text(view), Some("abc"));
    assert!(!model.has_undo());
    assert!(!model.is_modified());
}

#[test]
fn edit_in_one_view_reaches_prime_and_all_views() {
    let mut model = model_with_text("abc");
    let v1 = model.register_view_document();
    let v2 = model.register_view_document();

    model.edit(v1, 1, 0, "X");

    assert_eq!(model.prime_text(), "aXbc");
    assert_eq!(model.view_text(v1), Some("aXbc"));
    assert_eq!(model.view_text(v2), Some("aXbc"));
    assert!(model.is_modified());
}

#[test]
fn undo_across_views_restores_all_documents() {
    let mut model = model_with_text("abc");
    let v1 = model.register_view_document();
    let v2 = model.register_view_document();

    model.edit(v1, 1, 0, "X");
    let hint = model.undo();

    assert_eq!(model.prime_text(), "abc");
    assert_eq!(model.view_text(v1), Some("abc"));
    assert_eq!(model.view_text(v2), Some("abc"));
    assert_eq!(hint, Some(1));
    assert!(!model.is_modified());
}

#[test]
fn redo_after_undo_is_identity_on_content() {
    let mut model = model_with_text("draft");
    let v1 = model.register_view_document();

    model.edit(v1, 5, 0, " one");
    model.edit(v1, 0, 1, "D");

    model.undo();
    model.undo();
    assert_eq!(model.prime_text(), "draft");

    model.redo();
    model.redo();
    assert_eq!(model.prime_text(), "Draft one");
    assert_eq!(model.view_text(v1), Some("Draft one"));
}

#[test]
fn redo_hint_lands_after_the_reapplied_text() {
    let mut model = model_with_text("abc");
    let v1 = model.register_view_document();

    model.edit(v1, 1, 0, "XY");
    model.undo();
    let hint = model.redo();

    assert_eq!(model.prime_text(), "aXYbc");
    assert_eq!(hint, Some(3));
}

#[test]
fn compound_edit_undoes_as_one_step() {
    let mut model = model_with_text("");
    let v1 = model.register_view_document();

    model.begin_compound_edit();
    model.edit(v1, 0, 0, "{");
    model.edit(v1, 1, 0, "}");
    model.end_compound_edit();
    assert_eq!(model.prime_text(), "{}");

    let hint = model.undo();
    assert_eq!(model.prime_text(), "");
    assert_eq!(model.view_text(v1), Some(""));
    assert!(!model.has_undo());
    assert_eq!(hint, Some(0));
}

#[test]
fn late_registration_sees_current_content() {
    let mut model = model_with_text("abc");
    let v1 = model.register_view_document();
    model.edit(v1, 3, 0, "def");

    let v2 = model.register_view_document();
    assert_eq!(model.view_text(v2), Some("abcdef"));

    model.edit(v2, 0, 3, "");
    assert_eq!(model.view_text(v1), Some("def"));
    assert_eq!(model.prime_text(), "def");
}

#[test]
fn unregistered_views_stop_receiving_deltas() {
    let mut model = model_with_text("abc");
    let v1 = model.register_view_document();
    let v2 = model.register_view_document();

    model.unregister_view_document(v2);
    model.edit(v1, 0, 0, "Z");

    assert_eq!(model.prime_text(), "Zabc");
    assert_eq!(model.view_count(), 1);
    assert!(model.view_text(v2).is_none());
}

#[test]
fn set_data_then_data_round_trips() {
    let mut model = model_with_text("");
    model.set_data("line one\nline two\n".as_bytes());
    assert_eq!(model.data(), b"line one\nline two\n".to_vec());
}

#[test]
fn newline_forms_are_normalized_on_ingestion() {
    let mut model = model_with_text("");
    let v1 = model.register_view_document();

    model.set_data(b"a\r\nb\rc");
    assert_eq!(model.prime_text(), "a\nb\nc");

    model.edit(v1, 0, 0, "x\u{2029}y\r\n");
    assert_eq!(model.prime_text(), "x\ny\na\nb\nc");
    assert_eq!(model.view_text(v1), Some("x\ny\na\nb\nc"));
}

#[test]
fn off_disk_title_comes_from_first_non_blank_line() {
    let mut model = model_with_text("");
    let v1 = model.register_view_document();

    model.edit(v1, 0, 0, "\n\n  The Lighthouse  \nmore");
    assert_eq!(model.meta().title(), "The Lighthouse");

    // Longer than 27 characters: truncated with ellipsis.
    model.set_data(b"An Extremely Long Working Title For A Draft");
    assert_eq!(model.meta().title(), "An Extremely Long Working T...");

    // Emptying the document clears the override.
    model.set_data(b"   \n\n");
    assert_eq!(model.meta().title(), crate::files::meta::DEFAULT_TITLE);
}

#[test]
fn on_disk_models_never_override_their_title() {
    let mut model = TextFileModel::new(FileMeta::on_disk("/tmp/content/u-1.txt".into()));
    let v1 = model.register_view_document();
    model.edit(v1, 0, 0, "Some opening line");

    assert_eq!(model.meta().title(), "u-1");
}

#[test]
fn empty_compound_edit_leaves_no_undo_step() {
    let mut model = model_with_text("abc");
    model.begin_compound_edit();
    model.end_compound_edit();

    assert!(!model.has_undo());
    assert_eq!(model.undo(), None);
    assert_eq!(model.prime_text(), "abc");
}

#[test]
fn consecutive_compounds_undo_separately() {
    let mut model = model_with_text("");
    let v1 = model.register_view_document();

    model.begin_compound_edit();
    model.edit(v1, 0, 0, "(");
    model.edit(v1, 1, 0, ")");
    model.end_compound_edit();

    model.begin_compound_edit();
    model.edit(v1, 1, 0, "[");
    model.edit(v1, 2, 0, "]");
    model.end_compound_edit();

    assert_eq!(model.prime_text(), "([])");

    model.undo();
    assert_eq!(model.prime_text(), "()");
    model.undo();
    assert_eq!(model.prime_text(), "");
}

#[test]
fn interleaved_edits_from_both_views_stay_in_sync() {
    let mut model = model_with_text("");
    let v1 = model.register_view_document();
    let v2 = model.register_view_document();

    model.edit(v1, 0, 0, "hello");
    model.edit(v2, 5, 0, " world");
    model.edit(v1, 0, 1, "H");
    model.edit(v2, 11, 0, "!");

    assert_eq!(model.prime_text(), "Hello world!");
    assert_eq!(model.view_text(v1), Some("Hello world!"));
    assert_eq!(model.view_text(v2), Some("Hello world!"));

    while model.has_undo() {
        model.undo();
    }

    assert_eq!(model.prime_text(), "");
    assert_eq!(model.view_text(v1), Some(""));
    assert_eq!(model.view_text(v2), Some(""));
}
