use assert_cmd::Command;
use hostcap_cli::case::Case;
use hostcap_core::*;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn catalog() -> EquipmentCatalog {
    let cable = |name: &str, r: f64, l: f64, i: f64| LineType {
        name: name.to_string(),
        u_n: Kilovolts(20.0),
        r_ohm_per_km: r,
        l_mh_per_km: l,
        i_max_th_a: i,
    };
    EquipmentCatalog::new(
        vec![
            cable("NA2XS2Y 3x1x150 RM/25", 0.206, 0.4011, 319.0),
            cable("NA2XS2Y 3x1x185 RM/25", 0.164, 0.3879, 357.0),
            cable("NA2XS2Y 3x1x240", 0.13, 0.3725, 417.0),
        ],
        Vec::new(),
        Vec::new(),
    )
}

/// 20 MW industrial load behind 1 km of the smallest cable.
fn write_case(dir: &Path) -> PathBuf {
    let catalog = catalog();
    let mut topology = Topology::new("cli feeder");
    topology
        .add_grid(Grid::new(GridId::new(1), "mv", VoltageLevel::Mv))
        .unwrap();
    for id in 1..=2 {
        topology
            .add_bus(Bus::new(BusId::new(id), format!("mv{id}"), GridId::new(1), VoltageLevel::Mv, Kilovolts(20.0)))
            .unwrap();
    }
    topology.set_slack_bus(BusId::new(1)).unwrap();
    topology
        .add_line(Line::from_type(
            LineId::new(1),
            "L1",
            BusId::new(1),
            BusId::new(2),
            1.0,
            &catalog.mv_lines()[0],
        ))
        .unwrap();
    topology
        .add_load(Load::new(LoadId::new(1), "plant", BusId::new(2), Sector::Industrial).with_peak_load(20.0))
        .unwrap();
    let path = dir.join("case.json");
    Case { topology, catalog }.save(&path).unwrap();
    path
}

#[test]
fn reinforce_converges_and_writes_outputs() {
    let dir = tempdir().unwrap();
    let case = write_case(dir.path());
    let out = dir.path().join("out");
    let mut cmd = Command::cargo_bin("hostcap").unwrap();
    cmd.args([
        "reinforce",
        "--case",
        case.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("Reinforcement converged"));

    assert!(out.join("reinforcements.parquet").exists());
    assert!(out.join("results.parquet").exists());
    assert!(out.join("report.json").exists());
    let reinforced = Case::load(&out.join("case.json")).unwrap();
    let line = reinforced.topology.line(LineId::new(1)).unwrap();
    assert_eq!(line.std_type.as_deref(), Some("NA2XS2Y 3x1x240"));
    assert_eq!(line.num_parallel(), 2);
}

#[test]
fn reinforce_exits_non_zero_when_stalled() {
    let dir = tempdir().unwrap();
    let case = write_case(dir.path());
    let config = dir.path().join("run.yaml");
    fs::write(&config, "max_iterations: 0\n").unwrap();
    let out = dir.path().join("out");
    let mut cmd = Command::cargo_bin("hostcap").unwrap();
    cmd.args([
        "reinforce",
        "--case",
        case.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("stalled"));

    let report = fs::read_to_string(out.join("report.json")).unwrap();
    assert!(report.contains("\"aborted\""));
}

#[test]
fn invalid_mode_is_rejected_before_any_work() {
    let dir = tempdir().unwrap();
    let case = write_case(dir.path());
    let out = dir.path().join("out");
    let mut cmd = Command::cargo_bin("hostcap").unwrap();
    cmd.args([
        "reinforce",
        "--case",
        case.to_str().unwrap(),
        "--mode",
        "hv",
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid analysis mode"));
    assert!(!out.exists());
}

#[test]
fn translate_writes_solver_tables() {
    let dir = tempdir().unwrap();
    let case = write_case(dir.path());
    let out = dir.path().join("tables");
    let mut cmd = Command::cargo_bin("hostcap").unwrap();
    cmd.args([
        "translate",
        "--case",
        case.to_str().unwrap(),
        "--mode",
        "full",
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("2 buses, 1 lines"));
    for table in ["buses", "lines", "transformers", "loads", "generators"] {
        assert!(out.join(format!("{table}.parquet")).exists());
    }
}

#[test]
fn worst_case_writes_two_snapshots() {
    let dir = tempdir().unwrap();
    let case = write_case(dir.path());
    let out = dir.path().join("series.json");
    let mut cmd = Command::cargo_bin("hostcap").unwrap();
    cmd.args([
        "worst-case",
        "--case",
        case.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("2 snapshot(s), 1 load(s)"));
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(out).unwrap()).unwrap();
    assert!(json.is_object());
}

#[test]
fn translate_limits_tables_to_the_snapshot_window() {
    let dir = tempdir().unwrap();
    let case = write_case(dir.path());
    let out = dir.path().join("tables");
    let mut cmd = Command::cargo_bin("hostcap").unwrap();
    cmd.args([
        "translate",
        "--case",
        case.to_str().unwrap(),
        "--snapshots",
        "3600..",
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("1 snapshot(s)"));
    assert!(out.join("loads.parquet").exists());
}

#[test]
fn malformed_snapshot_window_is_rejected() {
    let dir = tempdir().unwrap();
    let case = write_case(dir.path());
    let out = dir.path().join("out");
    let mut cmd = Command::cargo_bin("hostcap").unwrap();
    cmd.args([
        "reinforce",
        "--case",
        case.to_str().unwrap(),
        "--snapshots",
        "7200..3600",
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("ends before it starts"));
    assert!(!out.exists());
}

#[test]
fn reinforce_rejects_a_case_without_slack() {
    let dir = tempdir().unwrap();
    let path = write_case(dir.path());
    let mut case = Case::load(&path).unwrap();
    let mut json = serde_json::to_value(&case.topology).unwrap();
    json["slack_bus"] = serde_json::Value::Null;
    case.topology = serde_json::from_value(json).unwrap();
    case.save(&path).unwrap();
    let out = dir.path().join("out");
    let mut cmd = Command::cargo_bin("hostcap").unwrap();
    cmd.args([
        "reinforce",
        "--case",
        path.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("validation"));
    assert!(!out.exists());
}
