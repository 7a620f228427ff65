use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::error::Error;
use std::path::PathBuf;

#[derive(Deserialize)]
struct RasterOutput {
    window_length: usize,
    total: f64,
    cells: Vec<f64>,
}

#[derive(Deserialize)]
struct RatioOutput {
    ratios: Vec<f64>,
}

#[test]
fn rasterize_command_splits_boundaries() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("ethos");
    cmd.args([
        "rasterize",
        "--window-length",
        "40",
        "--input",
        &sample_path("test_data/c1b_grooming.txt"),
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let value: RasterOutput = serde_json::from_slice(&out)?;
    assert_eq!(value.window_length, 40);
    assert_eq!(value.cells.len(), 40);
    assert_close(value.total, 2.75, 1e-9);
    assert_close(value.cells[10], 0.5, 1e-9);
    assert_close(value.cells[11], 1.0, 1e-9);
    assert_close(value.cells[12], 0.25, 1e-9);
    assert_close(value.cells[30], 1.0, 1e-9);
    Ok(())
}

#[test]
fn rasterize_reads_stdin() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("ethos");
    cmd.args(["rasterize", "--window-length", "20"])
        .write_stdin("10.2 10.7\n");
    let out = cmd.assert().success().get_output().stdout.clone();
    let value: RasterOutput = serde_json::from_slice(&out)?;
    assert_close(value.cells[10], 0.5, 1e-9);
    assert_close(value.total, 0.5, 1e-9);
    Ok(())
}

#[test]
fn rasterize_rejects_reversed_interval() {
    let mut cmd = cargo_bin_cmd!("ethos");
    cmd.args(["rasterize", "--window-length", "20"])
        .write_stdin("5 3\n");
    let out = cmd.assert().failure().get_output().stderr.clone();
    let stderr = String::from_utf8_lossy(&out);
    assert!(stderr.contains("malformed interval"), "stderr: {}", stderr);
}

#[test]
fn ratio_command_zero_fills_empty_bins() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("ethos");
    cmd.args([
        "ratio",
        "--category",
        &sample_path("test_data/c1b_periphery.txt"),
        "--total",
        &sample_path("test_data/c1b_crossings.txt"),
        "--bin-width",
        "10",
        "--window-length",
        "40",
    ]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let value: RatioOutput = serde_json::from_slice(&out)?;
    assert_eq!(value.ratios.len(), 4);
    assert_close(value.ratios[0], 1.0 / 3.0, 1e-12);
    assert_close(value.ratios[1], 1.0, 1e-12);
    assert_eq!(&value.ratios[2..], &[0.0, 0.0]);
    Ok(())
}

#[test]
fn ratio_command_rejects_oversized_bins() {
    let mut cmd = cargo_bin_cmd!("ethos");
    cmd.args([
        "ratio",
        "--category",
        &sample_path("test_data/c1b_periphery.txt"),
        "--total",
        &sample_path("test_data/c1b_crossings.txt"),
        "--bin-width",
        "50",
        "--window-length",
        "40",
    ]);
    cmd.assert().failure();
}

fn assert_close(a: f64, b: f64, tol: f64) {
    let diff = (a - b).abs();
    assert!(
        diff <= tol,
        "diff {} exceeded tol {} ({} vs {})",
        diff,
        tol,
        a,
        b
    );
}

fn sample_path(relative: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join(relative)
        .to_string_lossy()
        .to_string()
}
