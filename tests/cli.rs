//! Run the cairn binary against files on disk and check its exit contract.

use std::fs;
use std::path::Path;
use std::process::Command;

fn write_source(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn instruments_file_to_stdout() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_source(
        tmp.path(),
        "main.rs",
        r#"//@ compile-flags: -O
// explains main
fn main() {
    let total = work(3);
    println!("{total}");
}

fn work(n: u64) -> u64 {
    n * 2
}
"#,
    );

    let output = Command::new(env!("CARGO_BIN_EXE_cairn"))
        .arg(&input)
        .output()
        .expect("failed to run cairn");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        output.status.success(),
        "cairn failed:\nstderr: {stderr}\nstdout: {stdout}"
    );

    assert!(stdout.starts_with("//@ compile-flags: -O\n"), "Got:\n{stdout}");
    assert!(!stdout.contains("explains main"), "Got:\n{stdout}");
    assert!(stdout.contains("on_enter(\"enter main\");"), "Got:\n{stdout}");
    assert!(stdout.contains("on_exit(\"exit main\");"), "Got:\n{stdout}");
    assert!(stdout.contains("on_enter(\"enter work\");"), "Got:\n{stdout}");
    assert!(stdout.contains("on_exit(\"exit work\");"), "Got:\n{stdout}");
}

#[test]
fn writes_to_output_file_with_custom_probes() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_source(
        tmp.path(),
        "lib.rs",
        "//pragma:keep\npub fn f() {\n    g();\n}\n",
    );
    let out_path = tmp.path().join("out.rs");

    let output = Command::new(env!("CARGO_BIN_EXE_cairn"))
        .arg(&input)
        .args(["--output"])
        .arg(&out_path)
        .args(["--enter-fn", "rt::enter", "--exit-fn", "rt::exit"])
        .args(["--directive", "//pragma:"])
        .output()
        .expect("failed to run cairn");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "cairn failed:\nstderr: {stderr}");
    assert!(output.stdout.is_empty(), "stdout should be empty with --output");

    let written = fs::read_to_string(&out_path).unwrap();
    assert!(written.starts_with("//pragma:keep\n"), "Got:\n{written}");
    assert!(written.contains("rt::enter(\"enter f\");"), "Got:\n{written}");
    assert!(written.contains("rt::exit(\"exit f\");"), "Got:\n{written}");
}

#[test]
fn parse_error_exits_nonzero_without_output() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_source(tmp.path(), "broken.rs", "fn f() {\n    a();\n");
    let out_path = tmp.path().join("out.rs");

    let output = Command::new(env!("CARGO_BIN_EXE_cairn"))
        .arg(&input)
        .arg("--output")
        .arg(&out_path)
        .output()
        .expect("failed to run cairn");

    assert!(!output.status.success(), "broken input should fail");
    assert!(output.stdout.is_empty());
    assert!(!out_path.exists(), "no output file on failure");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "Got:\n{stderr}");
    assert!(stderr.contains("broken.rs"), "Got:\n{stderr}");
}

#[test]
fn missing_input_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    let output = Command::new(env!("CARGO_BIN_EXE_cairn"))
        .arg(tmp.path().join("nope.rs"))
        .output()
        .expect("failed to run cairn");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to read"), "Got:\n{stderr}");
    assert!(stderr.contains("nope.rs"), "Got:\n{stderr}");
}

#[test]
fn invalid_probe_name_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let input = write_source(tmp.path(), "lib.rs", "fn f() { g(); }\n");

    let output = Command::new(env!("CARGO_BIN_EXE_cairn"))
        .arg(&input)
        .args(["--enter-fn", "1bad"])
        .output()
        .expect("failed to run cairn");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid probe function"), "Got:\n{stderr}");
}
