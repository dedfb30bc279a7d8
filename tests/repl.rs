//! End-to-end shell scenarios driven over stdio pipes, the way a human
//! testing the REPL at a terminal would: pipe in a script of commands,
//! capture stdout, and check the transcript line by line.
use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use std::str;

use tempfile::NamedTempFile;

fn sqlyte_exe() -> Command {
    let target_dir = env::current_exe()
        .ok()
        .map(|mut path| {
            path.pop();
            if path.ends_with("deps") {
                path.pop();
            }
            path
        })
        .expect("this should only be used where a `current_exe` can be set");
    let exe = target_dir.join(format!("sqlyte{}", env::consts::EXE_SUFFIX));
    Command::new(exe)
}

fn run_against(db_path: &std::path::Path, input: &[&str]) -> Vec<String> {
    let mut process = sqlyte_exe()
        .arg(db_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("unable to start sqlyte");

    {
        let stdin = process.stdin.as_mut().expect("unable to pipe stdin");
        for line in input {
            stdin
                .write_all(format!("{line}\n").as_bytes())
                .unwrap_or_else(|_| panic!("unable to write command `{line}`"));
        }
    }

    let output = process.wait_with_output().expect("unable to get process output");
    str::from_utf8(&output.stdout)
        .expect("stdout was not utf-8")
        .lines()
        .map(str::to_owned)
        .collect()
}

#[test]
fn single_row_round_trip() {
    let db = NamedTempFile::new().unwrap();
    let output = run_against(
        db.path(),
        &["insert 1 user1 person1@example.com", "select", ".exit"],
    );
    assert_eq!(
        output,
        vec![
            "lyt-db> executed.".to_string(),
            "lyt-db> ( 1, user1, person1@example.com )".to_string(),
            "executed.".to_string(),
            "lyt-db> ".to_string(),
        ]
    );
}

#[test]
fn max_length_strings_are_accepted_and_echoed_in_full() {
    let username = "w".repeat(32);
    let email = "w".repeat(255);
    let db = NamedTempFile::new().unwrap();
    let output = run_against(
        db.path(),
        &[&format!("insert 1 {username} {email}"), "select", ".exit"],
    );
    assert_eq!(
        output,
        vec![
            "lyt-db> executed.".to_string(),
            format!("lyt-db> ( 1, {username}, {email} )"),
            "executed.".to_string(),
            "lyt-db> ".to_string(),
        ]
    );
}

#[test]
fn negative_id_is_rejected() {
    let db = NamedTempFile::new().unwrap();
    let output = run_against(db.path(), &["insert -1 cstack foo@bar.com", "select", ".exit"]);
    assert_eq!(
        output,
        vec![
            "lyt-db> id must be non-negative.".to_string(),
            "lyt-db> executed.".to_string(),
            "lyt-db> ".to_string(),
        ]
    );
}

#[test]
fn duplicate_insert_is_rejected() {
    let db = NamedTempFile::new().unwrap();
    let output = run_against(
        db.path(),
        &["insert 1 u p@x", "insert 1 u p@x", "select", ".exit"],
    );
    assert_eq!(
        output,
        vec![
            "lyt-db> executed.".to_string(),
            "lyt-db> error: duplicate key.".to_string(),
            "lyt-db> ( 1, u, p@x )".to_string(),
            "executed.".to_string(),
            "lyt-db> ".to_string(),
        ]
    );
}

#[test]
fn rows_survive_close_and_reopen() {
    let db = NamedTempFile::new().unwrap();
    let first = run_against(
        db.path(),
        &["insert 1 u1 a@x", "insert 2 u2 b@x", "insert 3 u3 c@x", ".exit"],
    );
    assert_eq!(
        first,
        vec![
            "lyt-db> executed.".to_string(),
            "lyt-db> executed.".to_string(),
            "lyt-db> executed.".to_string(),
            "lyt-db> ".to_string(),
        ]
    );

    let second = run_against(db.path(), &["select", ".exit"]);
    assert_eq!(
        second,
        vec![
            "lyt-db> ( 1, u1, a@x )".to_string(),
            "( 2, u2, b@x )".to_string(),
            "( 3, u3, c@x )".to_string(),
            "executed.".to_string(),
            "lyt-db> ".to_string(),
        ]
    );
}

#[test]
fn fourteen_inserts_split_into_a_two_leaf_tree() {
    let db = NamedTempFile::new().unwrap();
    let mut commands: Vec<String> = (1..=14).map(|i| format!("insert {i} user{i} person{i}@x")).collect();
    commands.push(".btree".to_string());
    commands.push(".exit".to_string());
    let commands: Vec<&str> = commands.iter().map(String::as_str).collect();

    let output = run_against(db.path(), &commands);
    let tree_start = output.iter().position(|l| l.ends_with("tree:")).unwrap();
    let tree: Vec<&str> = output[tree_start + 1..].iter().map(String::as_str).collect();

    assert_eq!(tree[0], "- internal (size 1)");
    assert!(tree.iter().any(|l| l.trim() == "- leaf (size 7)"));
    assert!(tree.iter().any(|l| l.trim() == "- key 7"));
}

#[test]
fn thirty_keys_in_scrambled_order_scan_back_sorted() {
    let db = NamedTempFile::new().unwrap();
    let order = [
        13, 2, 27, 5, 30, 1, 19, 8, 24, 3, 16, 22, 9, 29, 4, 11, 6, 25, 14, 18, 7, 21, 10, 28, 15,
        20, 12, 26, 17, 23,
    ];
    let mut commands: Vec<String> = order
        .iter()
        .map(|i| format!("insert {i} user{i} person{i}@x"))
        .collect();
    commands.push("select".to_string());
    commands.push(".exit".to_string());
    let commands: Vec<&str> = commands.iter().map(String::as_str).collect();

    let output = run_against(db.path(), &commands);
    let ids: Vec<u32> = output
        .iter()
        .filter_map(|line| line.trim_start_matches("lyt-db> ").strip_prefix("( "))
        .filter_map(|rest| rest.split(',').next())
        .filter_map(|id| id.trim().parse().ok())
        .collect();
    assert_eq!(ids, (1..=30).collect::<Vec<_>>());
}

#[test]
fn constants_snapshot() {
    let db = NamedTempFile::new().unwrap();
    let output = run_against(db.path(), &[".constants", ".exit"]);
    assert_eq!(
        output,
        vec![
            "lyt-db> constants:".to_string(),
            "ROW_SIZE: 293".to_string(),
            "COMMON_NODE_HEADER_SIZE: 6".to_string(),
            "LEAF_NODE_HEADER_SIZE: 14".to_string(),
            "LEAF_NODE_CELL_SIZE: 297".to_string(),
            "LEAF_NODE_SPACE_FOR_CELLS: 4082".to_string(),
            "LEAF_NODE_MAX_CELLS: 13".to_string(),
            "lyt-db> ".to_string(),
        ]
    );
}
