mod support;

use std::process::{Command, Output};

use support::{load, typical_pie, ElfImage, PF_R, PF_W};

fn stripprobe(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_stripprobe"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to run stripprobe")
}

#[test]
fn test_malformed_offset_is_usage_error() {
    // Offsets are checked before the binary is, so a missing target is not
    // what gets reported
    let output = stripprobe(&["/nonexistent/client", "zzzz", "0x20"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    println!("stderr: {stderr}");

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("zzzz"));
    assert!(!stderr.contains("Binary not found"));
}

#[test]
fn test_empty_offset_is_usage_error() {
    let output = stripprobe(&["/nonexistent/client", "0x20", "0x"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no digits"));
}

#[test]
fn test_missing_binary_fails() {
    let output = stripprobe(&["/nonexistent/client", "0x20", "0x340"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Binary not found"));
}

#[test]
fn test_resolve_only_prints_offsets() {
    let file = typical_pie().text_section(0x1000, 0x1000, 0x800).write();
    let target = file.path().to_str().unwrap();

    let output = stripprobe(&[target, "0x20", "340", "--resolve-only"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    println!("stdout:\n{stdout}");

    assert_eq!(output.status.code(), Some(0), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("base: 0x1000"));
    assert!(stdout.contains("read: 0x1020"));
    assert!(stdout.contains("write: 0x1340"));
}

#[test]
fn test_resolve_only_without_executable_region() {
    let file = ElfImage::new()
        .segment(load(PF_R, 0, 0x1000))
        .segment(load(PF_R | PF_W, 0x1000, 0x100))
        .write();
    let target = file.path().to_str().unwrap();

    let output = stripprobe(&[target, "0x20", "0x340", "--resolve-only"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("No executable segment"));
}
