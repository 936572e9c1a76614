use std::fs;
use std::path::Path;

use predicates::prelude::*;

fn write_file(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

#[test]
fn upload_copies_new_files_and_skips_existing_ones() {
    let temp = tempfile::TempDir::new().unwrap();
    let pdf_dir = temp.path().join("pdf-tree");
    let audio_dir = temp.path().join("audio-tree");
    let store_dir = temp.path().join("store");

    write_file(&pdf_dir.join("J 级别pdf/1-River Fish.pdf"), b"pdf-one");
    write_file(&pdf_dir.join("J 级别pdf/.hidden.pdf"), b"junk");
    write_file(&audio_dir.join("J[Mp3]/1-River Fish.mp3"), b"mp3-one");

    let upload = |expect: &str| {
        let mut cmd = assert_cmd::Command::cargo_bin("razshelf").unwrap();
        cmd.args([
            "upload",
            "--pdf-dir",
            pdf_dir.to_str().unwrap(),
            "--audio-dir",
            audio_dir.to_str().unwrap(),
            "--data-dir",
            store_dir.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains(expect));
    };

    upload("upload finished");
    assert_eq!(
        fs::read(store_dir.join("pdf/J/1-River Fish.pdf")).unwrap(),
        b"pdf-one"
    );
    assert_eq!(
        fs::read(store_dir.join("audio/J/1-River Fish.mp3")).unwrap(),
        b"mp3-one"
    );
    assert!(!store_dir.join("pdf/J/.hidden.pdf").exists());

    // Second run finds everything already uploaded.
    upload("nothing to upload");
}

#[test]
fn check_lists_objects_under_a_level_prefix() {
    let temp = tempfile::TempDir::new().unwrap();
    let store_dir = temp.path().join("store");
    write_file(&store_dir.join("pdf/J/1-River Fish.pdf"), b"pdf-one");

    let mut cmd = assert_cmd::Command::cargo_bin("razshelf").unwrap();
    cmd.args([
        "check",
        "--level",
        "J",
        "--kind",
        "pdf",
        "--data-dir",
        store_dir.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("pdf/J/1-River Fish.pdf"));

    let mut cmd = assert_cmd::Command::cargo_bin("razshelf").unwrap();
    cmd.args([
        "check",
        "--level",
        "Q",
        "--kind",
        "audio",
        "--data-dir",
        store_dir.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("no objects under audio/Q/"));
}
