use std::fs;

use tempfile::TempDir;

use super::*;
use crate::fnx;

fn new_manifest() -> (ManifestModel, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    fnx::make_new_working_dir(temp_dir.path()).unwrap();
    let manifest = ManifestModel::load(temp_dir.path()).unwrap();
    (manifest, temp_dir)
}

#[test]
fn load_requires_notebook_and_trash() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join(fnx::MANIFEST_FILE_NAME),
        "<fnx version=\"1.0\"><notebook/></fnx>",
    )
    .unwrap();

    assert!(ManifestModel::load(temp_dir.path()).is_err());
}

#[test]
fn new_file_lands_under_notebook_with_content_file() {
    let (mut manifest, temp_dir) = new_manifest();

    let info = manifest.add_new_text_file(temp_dir.path(), None).unwrap();
    assert_eq!(info.name, DEFAULT_FILE_NAME);
    assert_eq!(info.extension, DEFAULT_EXT);
    assert!(temp_dir.path().join(&info.rel_path).is_file());

    // The uuid is hyphenated v4, no braces.
    assert_eq!(info.uuid.len(), 36);
    assert!(!info.uuid.contains('{'));

    let node = manifest.index(0, Some(manifest.notebook_index())).unwrap();
    assert!(manifest.is_file(node));
    assert_eq!(manifest.uuid(node), info.uuid);

    // An invalid (absent) index must not make the node a sibling of
    // <notebook> and <trash>.
    assert_eq!(manifest.row_count(None), 2);
}

#[test]
fn rename_changes_name_only_and_reports_file_info() {
    let (mut manifest, temp_dir) = new_manifest();
    let info = manifest.add_new_text_file(temp_dir.path(), None).unwrap();
    let node = manifest.find_by_uuid(&info.uuid).unwrap();

    let renamed = manifest.rename(node, "Chapter 1").unwrap();
    assert_eq!(renamed.name, "Chapter 1");
    assert_eq!(renamed.uuid, info.uuid);

    // Empty name is a silent no-op.
    assert!(manifest.rename(node, "").is_none());
    assert_eq!(manifest.name(node), "Chapter 1");

    // Folder renames mutate but report nothing.
    let folder = manifest.add_new_virtual_folder(None);
    assert!(manifest.rename(folder, "Part One").is_none());
    assert_eq!(manifest.name(folder), "Part One");
}

#[test]
fn trash_and_restore_return_to_surviving_parent() {
    let (mut manifest, temp_dir) = new_manifest();

    let folder = manifest.add_new_virtual_folder(None);
    let info = manifest
        .add_new_text_file(temp_dir.path(), Some(folder))
        .unwrap();
    let file = manifest.find_by_uuid(&info.uuid).unwrap();
    let folder_uuid = manifest.uuid(folder).to_string();

    manifest.move_to_trash(file);
    assert!(manifest.is_in_trash(file));
    assert_eq!(manifest.restore_parent_uuid(file), Some(folder_uuid.as_str()));

    manifest.move_to_notebook(file);
    assert_eq!(manifest.parent(file), Some(folder));
    assert!(manifest.restore_parent_uuid(file).is_none());
}

#[test]
fn restore_falls_back_to_notebook_root_when_parent_is_gone() {
    let (mut manifest, temp_dir) = new_manifest();

    let folder = manifest.add_new_virtual_folder(None);
    let info = manifest
        .add_new_text_file(temp_dir.path(), Some(folder))
        .unwrap();
    let file = manifest.find_by_uuid(&info.uuid).unwrap();

    manifest.move_to_trash(file);
    manifest.move_to_trash(folder);
    manifest.remove(folder, temp_dir.path());

    manifest.move_to_notebook(file);
    assert_eq!(manifest.parent(file), Some(manifest.notebook_index()));
}

#[test]
fn restore_falls_back_when_parent_is_itself_trashed() {
    let (mut manifest, temp_dir) = new_manifest();

    let folder = manifest.add_new_virtual_folder(None);
    let info = manifest
        .add_new_text_file(temp_dir.path(), Some(folder))
        .unwrap();
    let file = manifest.find_by_uuid(&info.uuid).unwrap();

    manifest.move_to_trash(file);
    manifest.move_to_trash(folder);

    manifest.move_to_notebook(file);
    assert_eq!(manifest.parent(file), Some(manifest.notebook_index()));
}

#[test]
fn trash_at_notebook_root_records_no_restore_uuid() {
    let (mut manifest, temp_dir) = new_manifest();
    let info = manifest.add_new_text_file(temp_dir.path(), None).unwrap();
    let file = manifest.find_by_uuid(&info.uuid).unwrap();

    manifest.move_to_trash(file);
    assert!(manifest.restore_parent_uuid(file).is_none());

    manifest.move_to_notebook(file);
    assert_eq!(manifest.parent(file), Some(manifest.notebook_index()));
}

#[test]
fn remove_unlinks_content_and_detaches_node() {
    let (mut manifest, temp_dir) = new_manifest();
    let info = manifest.add_new_text_file(temp_dir.path(), None).unwrap();
    let file = manifest.find_by_uuid(&info.uuid).unwrap();
    let content = temp_dir.path().join(&info.rel_path);
    assert!(content.is_file());

    manifest.move_to_trash(file);
    manifest.remove(file, temp_dir.path());

    assert!(!content.exists());
    assert!(manifest.find_by_uuid(&info.uuid).is_none());
    assert_eq!(manifest.row_count(Some(manifest.trash_index())), 0);
}

#[test]
fn clear_trash_removes_every_trashed_item() {
    let (mut manifest, temp_dir) = new_manifest();
    let a = manifest.add_new_text_file(temp_dir.path(), None).unwrap();
    let b = manifest.add_new_text_file(temp_dir.path(), None).unwrap();

    for info in [&a, &b] {
        let node = manifest.find_by_uuid(&info.uuid).unwrap();
        manifest.move_to_trash(node);
    }

    manifest.clear_trash(temp_dir.path());

    assert_eq!(manifest.row_count(Some(manifest.trash_index())), 0);
    assert!(!temp_dir.path().join(&a.rel_path).exists());
    assert!(!temp_dir.path().join(&b.rel_path).exists());
    assert!(manifest.verify(temp_dir.path()).is_empty());
}

#[test]
fn edited_marker_is_presence_as_boolean() {
    let (mut manifest, temp_dir) = new_manifest();
    let info = manifest.add_new_text_file(temp_dir.path(), None).unwrap();
    let file = manifest.find_by_uuid(&info.uuid).unwrap();

    manifest.set_file_edited(&info.uuid, true);
    assert!(manifest.is_edited(file));

    manifest.write(temp_dir.path()).unwrap();
    let text = fs::read_to_string(temp_dir.path().join(fnx::MANIFEST_FILE_NAME)).unwrap();
    assert!(text.contains("edited=\"\""));

    manifest.set_file_edited(&info.uuid, false);
    assert!(!manifest.is_edited(file));

    // Unknown or empty uuids are silent no-ops.
    manifest.set_file_edited("nope", true);
    manifest.set_file_edited("", true);
}

#[test]
fn snapshot_tracks_modification() {
    let (mut manifest, temp_dir) = new_manifest();
    assert!(!manifest.is_modified());

    let info = manifest.add_new_text_file(temp_dir.path(), None).unwrap();
    assert!(manifest.is_modified());

    manifest.reset_snapshot();
    assert!(!manifest.is_modified());

    let node = manifest.find_by_uuid(&info.uuid).unwrap();
    manifest.rename(node, "Chapter 1");
    assert!(manifest.is_modified());
}

#[test]
fn write_then_load_round_trips_the_tree() {
    let (mut manifest, temp_dir) = new_manifest();

    let folder = manifest.add_new_virtual_folder(None);
    manifest.rename(folder, "Part One");
    let info = manifest
        .add_new_text_file(temp_dir.path(), Some(folder))
        .unwrap();
    let file = manifest.find_by_uuid(&info.uuid).unwrap();
    manifest.rename(file, "Chapter 1");
    manifest.write(temp_dir.path()).unwrap();

    let reloaded = ManifestModel::load(temp_dir.path()).unwrap();
    let folder2 = reloaded.index(0, Some(reloaded.notebook_index())).unwrap();
    assert!(reloaded.is_virtual_folder(folder2));
    assert_eq!(reloaded.name(folder2), "Part One");

    let file2 = reloaded.index(0, Some(folder2)).unwrap();
    assert_eq!(reloaded.name(file2), "Chapter 1");
    assert_eq!(reloaded.uuid(file2), info.uuid);
    assert!(reloaded.verify(temp_dir.path()).is_empty());
}

#[test]
fn names_with_xml_special_characters_round_trip() {
    let (mut manifest, temp_dir) = new_manifest();
    let info = manifest.add_new_text_file(temp_dir.path(), None).unwrap();
    let node = manifest.find_by_uuid(&info.uuid).unwrap();

    manifest.rename(node, "Smith & Jones <draft> \"two\"");
    manifest.write(temp_dir.path()).unwrap();

    let reloaded = ManifestModel::load(temp_dir.path()).unwrap();
    let node = reloaded.find_by_uuid(&info.uuid).unwrap();
    assert_eq!(reloaded.name(node), "Smith & Jones <draft> \"two\"");
}

#[test]
fn nested_folder_trash_keeps_the_subtree_together() {
    let (mut manifest, temp_dir) = new_manifest();

    let outer = manifest.add_new_virtual_folder(None);
    let inner = manifest.add_new_virtual_folder(Some(outer));
    let info = manifest
        .add_new_text_file(temp_dir.path(), Some(inner))
        .unwrap();

    manifest.move_to_trash(outer);

    let file = manifest.find_by_uuid(&info.uuid).unwrap();
    assert!(manifest.is_in_trash(outer));
    assert!(manifest.is_in_trash(file));
    // Only the subtree root carries the restore marker.
    assert!(manifest.restore_parent_uuid(outer).is_none());
    assert!(manifest.restore_parent_uuid(inner).is_none());
    assert_eq!(manifest.parent(file), Some(inner));

    manifest.move_to_notebook(outer);
    assert!(!manifest.is_in_trash(file));
    assert_eq!(manifest.parent(outer), Some(manifest.notebook_index()));
}

#[test]
fn import_copies_sources_and_names_by_stem() {
    let (mut manifest, temp_dir) = new_manifest();

    let src_dir = TempDir::new().unwrap();
    let good = src_dir.path().join("Draft Notes.txt");
    fs::write(&good, "imported body").unwrap();
    let missing = src_dir.path().join("gone.txt");

    let infos = manifest.import_text_files(temp_dir.path(), &[good, missing], None);
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].name, "Draft Notes");

    let body = fs::read_to_string(temp_dir.path().join(&infos[0].rel_path)).unwrap();
    assert_eq!(body, "imported body");
}
