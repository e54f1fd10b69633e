use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::tempdir;

fn wordflip(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("wordflip").unwrap();
    cmd.arg("--db")
        .arg(dir.join("words.db"))
        .arg("--config")
        .arg(dir.join("config.json"))
        .env("HOME", dir)
        .env("RUST_LOG", "warn");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let assert = cmd.assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

#[test]
fn seed_without_name_lists_decks() {
    let dir = tempdir().unwrap();
    let out = stdout_of(wordflip(dir.path()).arg("seed"));
    let names: Vec<&str> = out.lines().collect();
    assert_eq!(names, vec!["french_food", "german_travel", "spanish_basics"]);
}

#[test]
fn seed_then_list_categories() {
    let dir = tempdir().unwrap();
    let out = stdout_of(wordflip(dir.path()).args(["seed", "german_travel"]));
    assert!(out.contains("added 10 words"), "{out}");

    let out = stdout_of(wordflip(dir.path()).args(["seed", "german_travel"]));
    assert!(out.contains("added 0 words"), "{out}");
    assert!(out.contains("skipped 10"), "{out}");

    let out = stdout_of(wordflip(dir.path()).arg("categories"));
    assert!(out.contains("German travel (10 words)"), "{out}");
}

#[test]
fn unknown_deck_fails() {
    let dir = tempdir().unwrap();
    wordflip(dir.path())
        .args(["seed", "klingon"])
        .assert()
        .failure();
}

#[test]
fn unknown_category_fails() {
    let dir = tempdir().unwrap();
    wordflip(dir.path())
        .args(["--category", "Nope", "stats"])
        .assert()
        .failure();
}

#[test]
fn stats_json_on_fresh_database() {
    let dir = tempdir().unwrap();
    stdout_of(wordflip(dir.path()).args(["seed", "french_food"]));

    let out = stdout_of(wordflip(dir.path()).args(["stats", "--days", "3", "--json"]));
    let snapshot: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(snapshot["daily"].as_array().unwrap().len(), 3);
    assert_eq!(snapshot["current_streak"], 0);
    assert_eq!(snapshot["summary"]["new"], 10);
}

#[test]
fn stats_table_has_a_row_per_day() {
    let dir = tempdir().unwrap();
    let out = stdout_of(wordflip(dir.path()).args(["stats", "-d", "5"]));
    assert!(out.starts_with("date"));
    assert!(out.contains("current streak: 0"));
    assert_eq!(out.lines().count(), 1 + 5 + 1 + 2);
}

#[test]
fn stats_rejects_out_of_range_days() {
    let dir = tempdir().unwrap();
    for days in ["0", "3651", "4000000000"] {
        let assert = wordflip(dir.path()).args(["stats", "--days", days]).assert().failure();
        let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
        assert!(stderr.contains("--days"), "{stderr}");
    }
    let out = stdout_of(wordflip(dir.path()).args(["stats", "--days", "1", "--json"]));
    let snapshot: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(snapshot["daily"].as_array().unwrap().len(), 1);
}

#[test]
fn import_export_roundtrip() {
    let dir = tempdir().unwrap();
    let csv_in = dir.path().join("in.csv");
    fs::write(
        &csv_in,
        "value,translation,category\nja,yes,Basics\nnein,no,\n,missing,Basics\n",
    )
    .unwrap();

    let out = stdout_of(wordflip(dir.path()).arg("import").arg(&csv_in).args(["--into", "Misc"]));
    assert!(out.contains("imported 2 words, skipped 1"), "{out}");

    let csv_out = dir.path().join("out.csv");
    let out = stdout_of(wordflip(dir.path()).arg("export").arg(&csv_out));
    assert!(out.contains("exported 2 words"), "{out}");

    let exported = fs::read_to_string(&csv_out).unwrap();
    assert!(exported.contains("ja,yes,Basics"));
    assert!(exported.contains("nein,no,Misc"));

    let out = stdout_of(wordflip(dir.path()).args(["categories", "--delete", "Misc"]));
    assert!(out.contains("deleted category Misc"));
    assert!(!out.contains("Misc ("));
    assert!(out.contains("Basics (1 words)"));
}

#[test]
fn learn_requires_a_terminal() {
    let dir = tempdir().unwrap();
    wordflip(dir.path())
        .arg("learn")
        .write_stdin("")
        .assert()
        .failure();
}
