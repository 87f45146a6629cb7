// Integration tests for the dfci-analysis binary

use anyhow::Result;
use assert_cmd::prelude::*; // Add methods on commands
use predicates::prelude::*; // Used for writing assertions
use std::fs;
use std::path::PathBuf;
use std::process::Command; // Run programs
use tempfile::TempDir;

const GTF: &str = "#!genome-build test\n\
chr1\tsrc\tgene\t100\t200\t.\t+\t.\tgene_id \"G1\"; gene_name \"Foo\";\n";

fn bin() -> Command {
    Command::cargo_bin("dfci-analysis").unwrap()
}

// Helper to create a file inside the temporary directory
fn create_file(dir: &TempDir, filename: &str, content: &str) -> Result<PathBuf> {
    let path = dir.path().join(filename);
    fs::write(&path, content)?;
    Ok(path)
}

#[test]
fn test_annotation_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let gtf = create_file(&temp_dir, "genes.gtf", GTF).unwrap();
    let positions = create_file(&temp_dir, "positions.tsv", "chr1\t150\nchr1\t500\n").unwrap();

    bin()
        .args(["-c", "2", "-o", temp_dir.path().to_str().unwrap()])
        .arg("annotation")
        .args(["-i", positions.to_str().unwrap(), "-k", gtf.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("positions.annotation.tsv"));

    let output = fs::read_to_string(temp_dir.path().join("positions.annotation.tsv")).unwrap();
    assert_eq!(
        output,
        "chr\tpos\tgene_id\ttranscript_id\texon_number \texon_id\tgene_name\n\
chr1\t150\tG1\t.\t.\t.\tFoo\n\
chr1\t500\t.\t.\t.\t.\t.\n"
    );
}

#[test]
fn test_annotation_keeps_input_order_across_workers() {
    let temp_dir = TempDir::new().unwrap();
    let gtf = create_file(&temp_dir, "genes.gtf", GTF).unwrap();
    let positions: String = (0..50).map(|i| format!("chr1\t{}\n", 90 + i * 5)).collect();
    let positions = create_file(&temp_dir, "many.tsv", &positions).unwrap();

    bin()
        .args(["--cpu", "4", "--output", temp_dir.path().to_str().unwrap()])
        .args(["annotation", "-i", positions.to_str().unwrap(), "-k", gtf.to_str().unwrap(), "--chunk-size", "2"])
        .assert()
        .success();

    let output = fs::read_to_string(temp_dir.path().join("many.annotation.tsv")).unwrap();
    let positions: Vec<i64> = output
        .lines()
        .skip(1)
        .map(|l| l.split('\t').nth(1).unwrap().parse().unwrap())
        .collect();
    let expected: Vec<i64> = (0..50).map(|i| 90 + i * 5).collect();
    assert_eq!(positions, expected);
}

#[test]
fn test_annotation_rejects_wrong_suffix() {
    let temp_dir = TempDir::new().unwrap();
    let gff = create_file(&temp_dir, "genes.gff", GTF).unwrap();
    let positions = create_file(&temp_dir, "positions.tsv", "chr1\t150\n").unwrap();

    bin()
        .args(["-o", temp_dir.path().to_str().unwrap(), "annotation"])
        .args(["-i", positions.to_str().unwrap(), "-k", gff.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains(".gtf"));
    assert!(!temp_dir.path().join("positions.annotation.tsv").exists());
}

#[test]
fn test_annotation_malformed_attribute_aborts_run() {
    let temp_dir = TempDir::new().unwrap();
    let gtf = create_file(&temp_dir, "bad.gtf", "chr1\tsrc\tgene\t1\t10\t.\t+\t.\tgene_id G1;\n").unwrap();
    let positions = create_file(&temp_dir, "positions.tsv", "chr1\t5\n").unwrap();

    bin()
        .args(["-o", temp_dir.path().to_str().unwrap(), "annotation"])
        .args(["-i", positions.to_str().unwrap(), "-k", gtf.to_str().unwrap()])
        .assert()
        .failure();
    assert!(!temp_dir.path().join("positions.annotation.tsv").exists());
}

#[test]
fn test_frequency_prints_banner_without_output_dir() {
    let temp_dir = TempDir::new().unwrap();
    let fasta = create_file(&temp_dir, "reads.fasta", ">a\nACGT\n>b\nACGT\n>c\nTTTT\n").unwrap();

    bin()
        .args(["find-most-frequent-sequences", fasta.to_str().unwrap(), "-n", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Top 1 Most Frequent sequences"))
        .stdout(predicate::str::contains("1\tACGT\t2"))
        .stdout(predicate::str::contains("TTTT").not());
}

#[test]
fn test_frequency_writes_one_file_per_input() {
    let temp_dir = TempDir::new().unwrap();
    let input_dir = temp_dir.path().join("in");
    let out_dir = temp_dir.path().join("out");
    fs::create_dir_all(input_dir.join("nested")).unwrap();
    fs::create_dir_all(&out_dir).unwrap();
    fs::write(input_dir.join("a.fasta"), ">a\nAAA\n").unwrap();
    fs::write(input_dir.join("nested").join("b.fasta"), ">b\nCCC\n>c\nCCC\n").unwrap();

    bin()
        .args(["-o", out_dir.to_str().unwrap()])
        .args(["find_most_frequent_sequences", input_dir.to_str().unwrap()])
        .assert()
        .success();

    let b = fs::read_to_string(out_dir.join("b.frequency_count_top_10.tsv")).unwrap();
    assert_eq!(b, "Rank\tSequence\tCount\n1\tCCC\t2\n");
    assert!(out_dir.join("a.frequency_count_top_10.tsv").exists());
}

#[test]
fn test_length_threshold_table() {
    let temp_dir = TempDir::new().unwrap();
    create_file(&temp_dir, "reads.fastq", "@r1\nACGTACGT\n+\nIIIIIIII\n@r2\nACG\n+\nIII\n").unwrap();

    bin()
        .args(["-o", temp_dir.path().to_str().unwrap()])
        .args(["count-reads-length-glt-threshold", temp_dir.path().to_str().unwrap(), "-t", "5"])
        .assert()
        .success();

    let table = fs::read_to_string(temp_dir.path().join("fastq_reads_length_lgt_threshold.tsv")).unwrap();
    let mut lines = table.lines();
    assert_eq!(lines.next().unwrap(), "File\tPercentage\tThreshold");
    assert!(lines.next().unwrap().ends_with("reads.fastq\t50.00\t5"));
}

#[test]
fn test_interval_summary_output() {
    let temp_dir = TempDir::new().unwrap();
    let table = create_file(
        &temp_dir,
        "targets.tsv",
        "chrom\t%gc\tmean_coverage\nchr1\t0.42\t100\nchr1\t0.48\t50\n",
    )
    .unwrap();

    bin()
        .args(["-o", temp_dir.path().to_str().unwrap()])
        .args(["interval-summary", table.to_str().unwrap(), "-g", "%gc", "-b", "5"])
        .assert()
        .success();

    let output = fs::read_to_string(temp_dir.path().join("targets.interval_summary.tsv")).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "%gc\tmean_target_coverage");
    assert_eq!(lines[3], "(0.4, 0.6]\t75.0");
    assert_eq!(lines[1], "(0.0, 0.2]\tNA");
}

#[test]
fn test_output_must_be_directory() {
    let temp_dir = TempDir::new().unwrap();
    let fasta = create_file(&temp_dir, "reads.fasta", ">a\nACGT\n").unwrap();

    bin()
        .args(["-o", fasta.to_str().unwrap(), "find-most-frequent-sequences", fasta.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be an existing directory"));
}
