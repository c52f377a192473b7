//! End-to-end checks of the para-cmp binary: exit codes and diagnostics.

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn random_bytes(len: usize, mut seed: u64) -> Vec<u8> {
    (0..len)
        .map(|_| {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed as u8
        })
        .collect()
}

fn write_pair(dir: &TempDir, left: &[u8], right: &[u8]) -> (PathBuf, PathBuf) {
    let (file1, file2) = (dir.path().join("file1"), dir.path().join("file2"));
    fs::write(&file1, left).unwrap();
    fs::write(&file2, right).unwrap();
    (file1, file2)
}

fn para_cmp(file1: &Path, file2: &Path) -> Command {
    let mut cmd = Command::cargo_bin("para-cmp").unwrap();
    cmd.arg(file1).arg(file2);
    cmd
}

#[test]
fn identical_files_exit_zero() {
    let dir = TempDir::new().unwrap();
    let data = random_bytes(4096, 12345678);
    let (file1, file2) = write_pair(&dir, &data, &data);

    para_cmp(&file1, &file2).args(["4", "8192"]).assert().code(0);
}

#[test]
fn reports_offset_of_single_difference() {
    let dir = TempDir::new().unwrap();
    let left = random_bytes(10_000, 42);
    let mut right = left.clone();
    right[7777] = !right[7777];
    let (file1, file2) = write_pair(&dir, &left, &right);

    para_cmp(&file1, &file2)
        .args(["4", "16384"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Files differ at offset 7777"));
}

#[test]
fn redirected_diagnostics_have_no_color_codes() {
    let dir = TempDir::new().unwrap();
    let left = random_bytes(10_000, 42);
    let mut right = left.clone();
    right[7777] = !right[7777];
    let (file1, file2) = write_pair(&dir, &left, &right);

    para_cmp(&file1, &file2)
        .args(["4", "16384"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\u{1b}[").not())
        .stderr(predicate::str::contains("Files differ at offset 7777\n"));
}

#[test]
fn budget_far_larger_than_file_is_accepted() {
    let dir = TempDir::new().unwrap();
    let left = random_bytes(10_000, 21);
    let mut right = left.clone();
    right[4321] = !right[4321];
    let (file1, file2) = write_pair(&dir, &left, &right);

    para_cmp(&file1, &file2)
        .args(["2", "1099511627776"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Files differ at offset 4321"));

    let same_dir = TempDir::new().unwrap();
    let (same1, same2) = write_pair(&same_dir, &left, &left);
    para_cmp(&same1, &same2)
        .args(["2", "70368744177664"])
        .assert()
        .code(0);
}

#[test]
fn reports_first_of_several_differences() {
    let dir = TempDir::new().unwrap();
    let left = random_bytes(1024, 7);
    let mut right = left.clone();
    for index in [1000, 600, 513] {
        right[index] = !right[index];
    }
    let (file1, file2) = write_pair(&dir, &left, &right);

    para_cmp(&file1, &file2)
        .args(["8", "256"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("offset 513"));
}

#[test]
fn unequal_lengths_are_a_usage_error_without_workers() {
    let dir = TempDir::new().unwrap();
    let (file1, file2) = write_pair(&dir, &random_bytes(100, 1), &random_bytes(101, 1));

    para_cmp(&file1, &file2)
        .args(["-v", "4", "64"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("different length"))
        .stderr(predicate::str::contains("comparing range").not());
}

#[test]
fn budget_must_split_evenly() {
    let dir = TempDir::new().unwrap();
    let data = random_bytes(100, 3);
    let (file1, file2) = write_pair(&dir, &data, &data);

    para_cmp(&file1, &file2).args(["4", "100"]).assert().code(2);
    para_cmp(&file1, &file2).args(["4", "0"]).assert().code(2);
}

#[test]
fn task_count_outside_bounds_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let data = random_bytes(100, 5);
    let (file1, file2) = write_pair(&dir, &data, &data);

    for count in ["0", "1", "33"] {
        para_cmp(&file1, &file2).arg(count).assert().code(2);
    }
    para_cmp(&file1, &dir.path().join("missing"))
        .arg("64")
        .assert()
        .code(2);
}

#[test]
fn malformed_numbers_are_usage_errors() {
    let dir = TempDir::new().unwrap();
    let data = random_bytes(16, 9);
    let (file1, file2) = write_pair(&dir, &data, &data);

    para_cmp(&file1, &file2).arg("four").assert().code(2);
    para_cmp(&file1, &file2).args(["4", "12kb"]).assert().code(2);
}

#[test]
fn missing_file_is_a_usage_error() {
    let dir = TempDir::new().unwrap();
    let (file1, _) = write_pair(&dir, b"x", b"x");

    para_cmp(&file1, &dir.path().join("nope"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn empty_files_are_same() {
    let dir = TempDir::new().unwrap();
    let (file1, file2) = write_pair(&dir, b"", b"");

    para_cmp(&file1, &file2).args(["4", "32"]).assert().code(0);
}

#[test]
fn file_compared_with_itself_is_same() {
    let dir = TempDir::new().unwrap();
    let (file1, _) = write_pair(&dir, &random_bytes(64, 11), b"");

    para_cmp(&file1, &file1)
        .args(["-v", "2", "8"])
        .assert()
        .code(0)
        .stderr(predicate::str::contains("comparing range").not());
}

#[test]
fn measurements_are_logged() {
    let dir = TempDir::new().unwrap();
    let data = random_bytes(2048, 13);
    let (file1, file2) = write_pair(&dir, &data, &data);

    para_cmp(&file1, &file2)
        .args(["--measure", "2", "64"])
        .assert()
        .code(0)
        .stderr(predicate::str::contains("Total read: 4096 bytes"));
}
