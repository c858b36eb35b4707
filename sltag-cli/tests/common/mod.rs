#![allow(dead_code)]

use std::io::Write;

use assert_cmd::Command;
use tempfile::NamedTempFile;

/// `gtag` closes over `ta`; `tag` has no aligned pair.
pub const TWO_RECORDS: &str = ">ltr_like first record\nGTAG\n>unpaired\nTAG\n";

/// Self-comparison pairing positions 1 and 4 of `gtag`, plus the trivial
/// self hit and its mirror.
pub const GTAG_SELF_ALIGNMENT: &str = "\
# BLASTN self comparison
ltr_like\tltr_like\t100.000\t4\t0\t0\t1\t4\t1\t4\t1e-1\t8.0
ltr_like\tltr_like\t100.000\t1\t0\t0\t1\t1\t4\t4\t9.9\t2.0
ltr_like\tltr_like\t100.000\t1\t0\t0\t4\t4\t1\t1\t9.9\t2.0
";

/// Writes `content` to a fresh temporary file.
pub fn temp_file_with(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Runs the `sltag` binary and returns its stdout, asserting success.
pub fn run_sltag(args: &[&str]) -> String {
    let mut cmd = Command::cargo_bin("sltag").unwrap();
    cmd.env("SLTAG_LOG", "error").args(args);
    let output = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(output).unwrap()
}
