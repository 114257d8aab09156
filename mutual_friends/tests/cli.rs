//! Runs the `mutual-friends` binary the way a user would.

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const SCENARIO: &str = "1\t2,3,4\n2\t1,3\n3\t1,2\n4\t1\n";
const RECOMMENDED: &str = "1\t\n2\t4\n3\t4\n4\t2,3\n";

fn mutual_friends(dir: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_mutual-friends"));
    command.current_dir(dir);
    command
}

fn piped(mut command: Command, stdin: &[u8]) -> Output {
    let mut child = command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    child.stdin.take().unwrap().write_all(stdin).unwrap();
    child.wait_with_output().unwrap()
}

#[test]
fn run_writes_recommendations() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("friends.txt");
    let output = dir.path().join("recommendations.txt");
    fs::write(&input, SCENARIO).unwrap();

    let status = mutual_friends(dir.path())
        .args(["run", "--mappers", "2", "--reducers", "2", "--input"])
        .arg(&input)
        .arg("--output")
        .arg(&output)
        .status()
        .unwrap();

    assert!(status.success());
    assert_eq!(fs::read_to_string(&output).unwrap(), RECOMMENDED);
}

#[test]
fn run_fails_on_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let result = mutual_friends(dir.path())
        .args(["run", "--input", "absent.txt", "--output", "out.txt"])
        .output()
        .unwrap();

    assert!(!result.status.success());
    assert!(String::from_utf8_lossy(&result.stderr).contains("absent.txt"));
    assert!(!dir.path().join("out.txt").exists());
}

#[test]
fn map_piped_into_reduce_matches_run() {
    let dir = tempfile::tempdir().unwrap();

    let mut map = mutual_friends(dir.path());
    map.arg("map");
    let mapped = piped(map, SCENARIO.as_bytes());
    assert!(mapped.status.success());

    let mut reduce = mutual_friends(dir.path());
    reduce.arg("reduce");
    let reduced = piped(reduce, &mapped.stdout);
    assert!(reduced.status.success());
    assert_eq!(String::from_utf8(reduced.stdout).unwrap(), RECOMMENDED);
}

#[test]
fn verbose_flag_wins_over_rust_log() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("friends.txt");
    fs::write(&input, SCENARIO).unwrap();
    let run = |verbose: &[&str]| {
        mutual_friends(dir.path())
            .env("RUST_LOG", "off")
            .args(verbose)
            .arg("run")
            .arg("--input")
            .arg(&input)
            .args(["--output", "out.txt"])
            .output()
            .unwrap()
    };

    let quiet = run(&[]);
    assert!(quiet.status.success());
    assert!(quiet.stderr.is_empty());

    let loud = run(&["-v"]);
    assert!(loud.status.success());
    assert!(String::from_utf8_lossy(&loud.stderr).contains("DEBUG"));
}
