use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use predicates::prelude::*;
use razshelf::formats::Book;

fn write_file(path: &Path, contents: &[u8]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// A small media tree with the real directory naming mess: decorated
/// level directories, a nested subdirectory, hidden files, and one stray
/// unparseable file.
fn build_media_tree(root: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let pdf_dir = root.join("pdf-tree");
    let audio_dir = root.join("audio-tree");

    write_file(&pdf_dir.join("A级别pdf/1. Zoo Trip.pdf"), b"pdf");
    write_file(
        &pdf_dir.join("A级别pdf/nested/02-Farm Animals_Password_Removed.pdf"),
        b"pdf",
    );
    write_file(&pdf_dir.join("A级别pdf/Farm_Animals.pdf"), b"pdf");
    write_file(&pdf_dir.join("A级别pdf/.DS_Store"), b"junk");
    write_file(&pdf_dir.join("A级别pdf/readme.txt"), b"junk");
    write_file(&pdf_dir.join("AA绘本pdf/1-First Words.pdf"), b"pdf");
    write_file(&pdf_dir.join("随手备份/1-Old.pdf"), b"pdf");

    write_file(&audio_dir.join("A{mp3}/Farm Animals.mp3"), b"mp3");
    write_file(&audio_dir.join("A{mp3}/1 - Zoo Trip.mp3"), b"mp3");
    write_file(&audio_dir.join("AA｛mp3｝/1_first-words.mp3"), b"mp3");

    (pdf_dir, audio_dir)
}

fn run_generate(pdf_dir: &Path, audio_dir: &Path, out: &Path, report: Option<&Path>) {
    let mut cmd = assert_cmd::Command::cargo_bin("razshelf").unwrap();
    cmd.args([
        "generate",
        "--pdf-dir",
        pdf_dir.to_str().unwrap(),
        "--audio-dir",
        audio_dir.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ]);
    if let Some(report) = report {
        cmd.args(["--report", report.to_str().unwrap()]);
    }
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("随手备份"));
}

#[test]
fn generate_builds_ordered_paired_catalog() {
    let temp = tempfile::TempDir::new().unwrap();
    let (pdf_dir, audio_dir) = build_media_tree(temp.path());
    let out = temp.path().join("books.json");

    run_generate(&pdf_dir, &audio_dir, &out, None);

    let catalog: BTreeMap<String, Vec<Book>> =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(catalog.keys().collect::<Vec<_>>(), vec!["A", "AA"]);

    let level_a = &catalog["A"];
    assert_eq!(level_a.len(), 3);

    let by_number: Vec<_> = level_a
        .iter()
        .map(|b| (b.number.as_str(), b.title.as_str(), b.audio_path.as_str()))
        .collect();
    assert_eq!(
        by_number,
        vec![
            ("1", "Zoo Trip", "1 - Zoo Trip.mp3"),
            ("02", "Farm Animals", ""),
            ("3", "Farm Animals", "Farm Animals.mp3"),
        ]
    );

    // Hidden and unparseable files never become records.
    assert!(
        level_a
            .iter()
            .all(|b| b.pdf_path != ".DS_Store" && b.pdf_path != "readme.txt")
    );

    // The numbered AA book pairs with its numbered audio despite the
    // different separator style.
    let level_aa = &catalog["AA"];
    assert_eq!(level_aa.len(), 1);
    assert_eq!(level_aa[0].level, "AA");
    assert_eq!(level_aa[0].audio_path, "1_first-words.mp3");
}

#[test]
fn generate_is_deterministic_for_an_unchanged_tree() {
    let temp = tempfile::TempDir::new().unwrap();
    let (pdf_dir, audio_dir) = build_media_tree(temp.path());

    let first_out = temp.path().join("first.json");
    let second_out = temp.path().join("second.json");
    run_generate(&pdf_dir, &audio_dir, &first_out, None);
    run_generate(&pdf_dir, &audio_dir, &second_out, None);

    assert_eq!(
        fs::read(&first_out).unwrap(),
        fs::read(&second_out).unwrap()
    );
}

#[test]
fn generate_writes_diagnostics_report() {
    let temp = tempfile::TempDir::new().unwrap();
    let (pdf_dir, audio_dir) = build_media_tree(temp.path());
    let out = temp.path().join("books.json");
    let report_path = temp.path().join("report.json");

    run_generate(&pdf_dir, &audio_dir, &out, Some(&report_path));

    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    let skipped = report["A"]["skipped"].as_array().unwrap();
    let skipped_names: Vec<_> = skipped
        .iter()
        .map(|s| s["filename"].as_str().unwrap())
        .collect();
    assert!(skipped_names.contains(&".DS_Store"));
    assert!(skipped_names.contains(&"readme.txt"));
}
