//! Command-line tests against the compiled `convert2bed` binary.
//!
//! PATH is pointed at a temporary directory holding the helper tools, so
//! every run sees exactly the `cat`, `sort-bed` and `starch` the test chose.

use serial_test::serial;
use std::fs;
use std::io::Write;
use std::os::unix::fs::{symlink, PermissionsExt};
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

// =============================================================================
// Helper functions
// =============================================================================

fn tool_dir(with_sort_bed: bool) -> TempDir {
    let dir = TempDir::new().unwrap();
    symlink("/bin/cat", dir.path().join("cat")).unwrap();
    if with_sort_bed {
        write_script(
            dir.path(),
            "sort-bed",
            "#!/bin/sh\nLC_ALL=C exec /usr/bin/env sort -k1,1 -k2,2n\n",
        );
    }
    dir
}

fn write_script(dir: &Path, name: &str, body: &str) {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn run_convert2bed(tools: &Path, args: &[&str], stdin_content: &str) -> Output {
    // sort-bed scripts need `sort` from the system directories
    let path = format!("{}:/usr/bin:/bin", tools.display());
    let mut child = Command::new(env!("CARGO_BIN_EXE_convert2bed"))
        .args(args)
        .env("PATH", path)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn convert2bed");

    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(stdin_content.as_bytes()).unwrap();
    }

    child
        .wait_with_output()
        .expect("Failed to wait for convert2bed")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

const GTF: &str = "#!genome-build GRCh38\n\
chr2\tHAVANA\tgene\t1000\t2000\t.\t+\t.\tgene_id \"G2\"; gene_name \"B\";\n\
chr1\tHAVANA\tgene\t500\t500\t.\t-\t.\tgene_id \"G1\";\n";

// =============================================================================
// Conversions
// =============================================================================

#[test]
#[serial]
fn test_gtf_unsorted() {
    let tools = tool_dir(false);
    let output = run_convert2bed(tools.path(), &["--input=gtf", "--do-not-sort"], GTF);
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "chr2\t999\t2000\tG2\t.\t+\tHAVANA\tgene\t.\tgene_id \"G2\"; gene_name \"B\";\n\
         chr1\t499\t500\tG1\t.\t-\tHAVANA\tgene\t.\tgene_id \"G1\"; zero_length_insertion \"True\";\n"
    );
}

#[test]
#[serial]
fn test_gtf_sorted_with_header() {
    let tools = tool_dir(true);
    let output = run_convert2bed(tools.path(), &["-i", "GTF", "--keep-header"], GTF);
    assert!(output.status.success(), "{}", stderr(&output));
    let chroms: Vec<String> = stdout(&output)
        .lines()
        .map(|l| l.split('\t').next().unwrap().to_string())
        .collect();
    assert_eq!(chroms, vec!["_header", "chr1", "chr2"]);
}

#[test]
#[serial]
fn test_sam_split_all_reads() {
    let tools = tool_dir(false);
    let sam = "@SQ\tSN:chr1\tLN:1000\n\
               q1\t16\tchr1\t100\t60\t10M5N10M\t*\t0\t0\tACGT\tIIII\tNM:i:1\n\
               q2\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII\n";
    let output = run_convert2bed(
        tools.path(),
        &["--input=sam", "-d", "--split", "--all-reads"],
        sam,
    );
    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "chr1\t99\t109\tq1/1\t16\t-\t60\t10M5N10M\t*\t0\t0\tACGT\tIIII\tNM:i:1\n\
         chr1\t114\t124\tq1/2\t16\t-\t60\t10M5N10M\t*\t0\t0\tACGT\tIIII\tNM:i:1\n\
         _unmapped\t0\t1\tq2\t4\t+\t0\t*\t*\t0\t0\tACGT\tIIII\n"
    );
}

#[test]
#[serial]
fn test_psl_headered() {
    let tools = tool_dir(false);
    let psl = "psLayout version 3\n\
               \n\
               match\tmis-\n\
               \tmatch\n\
               ------\n\
               90\t2\t0\t0\t1\t3\t2\t10\t+\tread1\t100\t5\t100\tchr1\t5000\t500\t600\t3\t30,30,32,\t5,35,68,\t500,540,568,\n";
    let output = run_convert2bed(tools.path(), &["--input=psl", "-d", "--headered"], psl);
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).starts_with("chr1\t500\t600\tread1\t100\t+\t90\t"));
    assert_eq!(stdout(&output).lines().count(), 1);
}

#[test]
#[serial]
fn test_stats_flag() {
    let tools = tool_dir(false);
    let output = run_convert2bed(tools.path(), &["--input=gtf", "-d", "--stats"], GTF);
    assert!(output.status.success());
    assert!(
        stderr(&output).contains("Conversion stats: Topology: unsorted BED, Lines: 3"),
        "{}",
        stderr(&output)
    );
}

// =============================================================================
// Errors
// =============================================================================

#[test]
#[serial]
fn test_malformed_input_exit_code() {
    let tools = tool_dir(false);
    let output = run_convert2bed(
        tools.path(),
        &["--input=gff", "-d"],
        "chr1\tsrc\tgene\t1\t10\t.\t+\t.\tID=a\nnot\ta\tgff\tline\n",
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("Error: Invalid GFF record at line 2"),
        "{}",
        stderr(&output)
    );
}

#[test]
#[serial]
fn test_missing_sort_bed() {
    let tools = tool_dir(false);
    // only the tool directory on PATH, so no system sort-bed is found
    let output = Command::new(env!("CARGO_BIN_EXE_convert2bed"))
        .args(["--input=gff"])
        .env("PATH", tools.path())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(
        stderr(&output).contains("Cannot find sort-bed binary"),
        "{}",
        stderr(&output)
    );
}

#[test]
#[serial]
fn test_starch_options_need_starch_output() {
    let tools = tool_dir(false);
    let output = run_convert2bed(tools.path(), &["--input=gff", "-d", "--starch-gzip"], "");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Starch options"), "{}", stderr(&output));
}

#[test]
#[serial]
fn test_explicit_bzip2_needs_starch_output() {
    let tools = tool_dir(false);
    let output = run_convert2bed(tools.path(), &["--input=gff", "-d", "-z"], "");
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Starch options"), "{}", stderr(&output));
}

#[test]
#[serial]
fn test_conflicting_starch_compression() {
    let tools = tool_dir(false);
    let output = run_convert2bed(
        tools.path(),
        &["--input=gff", "--output=starch", "-z", "-g"],
        "",
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("both Starch compression options"));
}

#[test]
#[serial]
fn test_unknown_input_format() {
    let tools = tool_dir(false);
    let output = run_convert2bed(tools.path(), &["--input=vcf"], "");
    assert!(!output.status.success());
    assert!(stderr(&output).contains("unsupported input format"), "{}", stderr(&output));
}

#[test]
#[serial]
fn test_ignored_option_warning() {
    let tools = tool_dir(false);
    let output = run_convert2bed(tools.path(), &["--input=gtf", "-d", "--split"], GTF);
    assert!(output.status.success());
    assert!(
        stderr(&output).contains("--split has no effect with GTF input"),
        "{}",
        stderr(&output)
    );
}
