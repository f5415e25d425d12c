/// Binary Exit Behaviour Tests
///
/// Both failure modes abort before a device is requested, so these run on
/// machines without a GPU.

use std::io::Write;
use std::process::Command;

fn randomness() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_randomness"));
    command.env("RUST_LOG", "off");
    command
}

#[test]
fn test_missing_source_exits_nonzero() {
    let output = randomness()
        .arg("no/such/dir/randomness.wgsl")
        .output()
        .expect("binary runs");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Could not load kernel source from no/such/dir/randomness.wgsl"),
        "stderr was: {}",
        stderr
    );
    assert!(output.stdout.is_empty(), "no records before the source loads");
}

#[test]
fn test_malformed_source_prints_build_log() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    write!(file, "@compute @workgroup_size(256)\nfn test_moment() {{\n    let broken = ;\n}}\n").expect("write source");

    let output = randomness().arg(file.path()).output().expect("binary runs");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Could not build program."), "stderr was: {}", stderr);
    assert!(stderr.contains("let broken = ;"), "build log quotes the failing line: {}", stderr);
}
