use std::fs;
use std::rc::Rc;

use tempfile::TempDir;

use super::*;
use crate::settings::SettingsService;

fn setup() -> (ViewService, FileService, TempDir) {
    let bus = Bus::new(SettingsService::ephemeral("test"));
    (
        ViewService::new(Rc::clone(&bus)),
        FileService::new(bus),
        TempDir::new().unwrap(),
    )
}

fn write_file(dir: &TempDir, name: &str, body: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, body).unwrap();
    path
}

#[test]
fn open_reuses_models_and_counts_views() {
    let (mut views, mut files, temp_dir) = setup();
    let path = write_file(&temp_dir, "a.txt", "abc");

    let w1 = views.create_window();
    let w2 = views.create_window();

    let id = views.open_file_path_in(&mut files, w1, &path, None).unwrap();
    let same = views.open_file_path_in(&mut files, w2, &path, None).unwrap();
    assert_eq!(id, same);

    assert_eq!(views.count_for(id), 2);
    assert!(views.is_multi_window(id));

    // Re-opening in a window that already shows the model raises it
    // instead of adding a tab.
    views.open_file_path_in(&mut files, w1, &path, None);
    assert_eq!(views.tab_count(w1), 1);

    // A second view in the same window is an explicit request.
    views.add_view_of(&mut files, w1, id);
    assert_eq!(views.tab_count(w1), 2);
    assert_eq!(views.count_for(id), 3);
    assert!(views.any_views());
}

#[test]
fn edits_relay_between_views_in_different_windows() {
    let (mut views, mut files, temp_dir) = setup();
    let path = write_file(&temp_dir, "a.txt", "abc");

    let w1 = views.create_window();
    let w2 = views.create_window();
    let id = views.open_file_path_in(&mut files, w1, &path, None).unwrap();
    views.open_file_path_in(&mut files, w2, &path, None);

    views.set_cursor(w1, 1);
    views.key_input(&mut files, w1, 'X');

    let model = files.text(id).unwrap();
    assert_eq!(model.prime_text(), "aXbc");
    for window in [w1, w2] {
        let Some(FileView { kind: ViewKind::Text(state), .. }) = views.file_view_at(window, None)
        else {
            panic!("expected text views");
        };
        assert_eq!(model.view_text(state.doc), Some("aXbc"));
    }
    assert!(files.model(id).unwrap().is_modified());
}

#[test]
fn undo_moves_only_the_invoking_views_cursor() {
    let (mut views, mut files, temp_dir) = setup();
    let path = write_file(&temp_dir, "a.txt", "abc");

    let w1 = views.create_window();
    let w2 = views.create_window();
    let id = views.open_file_path_in(&mut files, w1, &path, None).unwrap();
    views.open_file_path_in(&mut files, w2, &path, None);

    views.set_cursor(w1, 1);
    views.key_input(&mut files, w1, 'X');
    views.set_cursor(w1, 4);

    views.undo(&mut files, w2);

    assert_eq!(files.text(id).unwrap().prime_text(), "abc");
    assert_eq!(views.cursor(w2), Some(1));
    assert_eq!(views.cursor(w1), Some(4));
    assert!(!files.model(id).unwrap().is_modified());
}

#[test]
fn tab_chrome_tracks_meta_and_modification() {
    let (mut views, mut files, temp_dir) = setup();
    let path = write_file(&temp_dir, "a.txt", "abc");

    let w = views.create_window();
    let id = views
        .open_file_path_in(&mut files, w, &path, Some("Chapter 1"))
        .unwrap();

    assert_eq!(views.tab_title(&files, w, None).unwrap(), "Chapter 1");
    assert!(!views.is_tab_flagged(&files, w, None));

    views.key_input(&mut files, w, 'x');
    assert!(views.is_tab_flagged(&files, w, None));

    files.set_path_title_override(&path, "Chapter One");
    assert_eq!(views.tab_title(&files, w, None).unwrap(), "Chapter One");
    assert_eq!(
        views.tab_tool_tip(&files, w, None).unwrap(),
        path.display().to_string()
    );
    let _ = id;
}

#[test]
fn removing_the_last_view_purges_unmodified_models() {
    let (mut views, mut files, temp_dir) = setup();
    let path = write_file(&temp_dir, "a.txt", "abc");

    let w = views.create_window();
    let id = views.open_file_path_in(&mut files, w, &path, None).unwrap();

    views.remove_tab(&mut files, w, None, PurgeModel::IfUnmodified);
    assert_eq!(views.tab_count(w), 0);
    assert!(files.model(id).is_none());
}

#[test]
fn modified_models_survive_view_close_for_pending_saves() {
    let (mut views, mut files, temp_dir) = setup();
    let path = write_file(&temp_dir, "a.txt", "abc");

    let w = views.create_window();
    let id = views.open_file_path_in(&mut files, w, &path, None).unwrap();
    views.key_input(&mut files, w, 'x');

    views.remove_tab(&mut files, w, None, PurgeModel::IfUnmodified);
    assert!(files.model(id).is_some());

    // A discard-style close destroys it regardless.
    views.add_view_of(&mut files, w, id);
    views.remove_tab(&mut files, w, None, PurgeModel::Always);
    assert!(files.model(id).is_none());
}

#[test]
fn modified_model_queries_honor_the_multi_window_filter() {
    let (mut views, mut files, temp_dir) = setup();
    let shared = write_file(&temp_dir, "shared.txt", "s");
    let solo = write_file(&temp_dir, "solo.txt", "s");

    let w1 = views.create_window();
    let w2 = views.create_window();
    let shared_id = views.open_file_path_in(&mut files, w1, &shared, None).unwrap();
    views.open_file_path_in(&mut files, w2, &shared, None);
    let solo_id = views.open_file_path_in(&mut files, w1, &solo, None).unwrap();

    views.raise_model(w1, shared_id);
    views.key_input(&mut files, w1, 'x');
    views.raise_model(w1, solo_id);
    views.key_input(&mut files, w1, 'y');

    assert_eq!(
        views.modified_view_models(&files),
        vec![shared_id, solo_id]
    );
    assert_eq!(
        views.modified_view_models_in(&files, w1, true),
        vec![solo_id]
    );
}

#[test]
fn cut_copy_paste_round_trip_through_the_clipboard() {
    let (mut views, mut files, temp_dir) = setup();
    let path = write_file(&temp_dir, "a.txt", "hello world");

    let w = views.create_window();
    let id = views.open_file_path_in(&mut files, w, &path, None).unwrap();

    views.set_selection(w, 0, 5);
    views.copy(&files, w);
    assert_eq!(views.clipboard(), Some("hello"));

    views.set_selection(w, 5, 11);
    views.cut(&mut files, w);
    assert_eq!(files.text(id).unwrap().prime_text(), "hello");
    assert_eq!(views.clipboard(), Some(" world"));

    views.set_cursor(w, 0);
    views.paste(&mut files, w);
    assert_eq!(files.text(id).unwrap().prime_text(), " worldhello");
}

#[test]
fn no_op_views_ignore_editing_commands() {
    let (mut views, mut files, temp_dir) = setup();
    let path = write_file(&temp_dir, "cover.png", "\u{89}PNG");

    let w = views.create_window();
    let id = views.open_file_path_in(&mut files, w, &path, None).unwrap();

    views.key_input(&mut files, w, 'x');
    views.undo(&mut files, w);

    let model = files.model(id).unwrap();
    assert!(!model.supports_modification());
    assert!(!model.is_modified());
    assert!(views.cursor(w).is_none());
}

#[test]
fn raise_anywhere_finds_the_first_window_with_the_model() {
    let (mut views, mut files, temp_dir) = setup();
    let a = write_file(&temp_dir, "a.txt", "a");
    let b = write_file(&temp_dir, "b.txt", "b");

    let w1 = views.create_window();
    let w2 = views.create_window();
    views.open_file_path_in(&mut files, w1, &a, None);
    let id_b = views.open_file_path_in(&mut files, w2, &b, None).unwrap();

    assert_eq!(views.raise_anywhere(id_b), Some(w2));
    assert_eq!(views.current_index(w2), Some(0));
}

#[test]
fn key_filter_setting_gates_rewriting() {
    let (mut views, mut files, temp_dir) = setup();
    let path = write_file(&temp_dir, "a.txt", "");

    let w = views.create_window();
    let id = views.open_file_path_in(&mut files, w, &path, None).unwrap();

    views.key_input(&mut files, w, '{');
    assert_eq!(files.text(id).unwrap().prime_text(), "{}");
}

#[test]
fn key_filter_off_passes_keystrokes_through() {
    let bus = Bus::new(SettingsService::ephemeral("test"));
    bus.set_setting(crate::settings::keys::EDITOR_KEY_FILTER, "false");

    let mut views = ViewService::new(Rc::clone(&bus));
    let mut files = FileService::new(bus);
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(&temp_dir, "a.txt", "");

    let w = views.create_window();
    let id = views.open_file_path_in(&mut files, w, &path, None).unwrap();
    views.key_input(&mut files, w, '{');
    assert_eq!(files.text(id).unwrap().prime_text(), "{");
}
