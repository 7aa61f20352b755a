#![cfg(feature = "cli")]

use assert_cmd::Command;
use dmscan::PlateScanReport;
use predicates::prelude::*;
use std::path::{Path, PathBuf};

fn write_rack(dir: &Path) -> PathBuf {
    let path = dir.join("rack.png");
    image::GrayImage::from_pixel(240, 160, image::Luma([255]))
        .save(&path)
        .unwrap();
    path
}

fn dmscan() -> Command {
    Command::cargo_bin("dmscan").unwrap()
}

#[test]
fn help_lists_subcommands() {
    dmscan()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("plate"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn missing_image_fails_before_any_well_runs() {
    let dir = tempfile::tempdir().unwrap();
    let report = dir.path().join("report.json");
    dmscan()
        .arg("plate")
        .arg(dir.path().join("missing.bmp"))
        .arg("--output")
        .arg(&report)
        .assert()
        .failure()
        .stderr(predicate::str::contains("could not load image"))
        .stdout(predicate::str::contains("decoded").not());

    let report = PlateScanReport::load_json(&report).unwrap();
    assert!(report.wells.is_empty());
    assert!(report.error.unwrap().contains("missing.bmp"));
}

#[test]
fn missing_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    dmscan()
        .arg("config")
        .arg(dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn invalid_grid_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_rack(dir.path());
    dmscan()
        .args(["plate", "--rows", "0", "--dpi", "20"])
        .arg(&image)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rows"));
}

#[cfg(not(feature = "rxing"))]
#[test]
fn plate_without_backend_reports_it() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_rack(dir.path());
    dmscan()
        .arg("plate")
        .arg(&image)
        .assert()
        .failure()
        .stderr(predicate::str::contains("rxing"));
}

#[cfg(feature = "rxing")]
#[test]
fn config_job_writes_report() {
    let dir = tempfile::tempdir().unwrap();
    let image = write_rack(dir.path());
    let report_path = dir.path().join("out.json");

    let mut cfg = dmscan::PlateScanConfig::new(image.display().to_string());
    cfg.dpi = Some(20);
    cfg.workers = Some(2);
    cfg.output_path = Some(report_path.display().to_string());
    let cfg_path = dir.path().join("job.json");
    cfg.write_json(&cfg_path).unwrap();

    dmscan()
        .arg("config")
        .arg(&cfg_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("decoded 0/96 wells"));

    let report = PlateScanReport::load_json(&report_path).unwrap();
    assert_eq!(report.wells.len(), 96);
    assert_eq!(report.dpi, Some(20));
    assert_eq!(report.error, None);
}

