mod common;

use std::collections::HashSet;

use common::*;
use hostcap_algo::{AnalysisMode, PowerFlowResults, PowerFlowSolver, RadialSweepSolver, Translator};
use hostcap_core::*;

#[test]
fn full_mode_emits_every_component_with_unique_keys() {
    let topology = two_level_case();
    let catalog = mv_catalog();
    let series = varied_series(&topology);
    let tables = Translator::new(&catalog)
        .to_tables(&topology, &series, AnalysisMode::Full, &SnapshotRange::all())
        .unwrap();

    let stats = topology.stats();
    assert_eq!(tables.buses.len(), stats.num_buses);
    assert_eq!(tables.lines.len(), stats.num_lines);
    assert_eq!(tables.transformers.len(), stats.num_transformers);
    assert_eq!(tables.loads.len(), stats.num_loads);
    assert_eq!(tables.generators.len(), stats.num_generators);
    assert_eq!(tables.keys.len(), tables.buses.len() + 4 + 2 + 4 + 3);

    assert_eq!(tables.keys.key(ComponentRef::Bus(BusId::new(3))), Some("Bus_MVGrid_1_3"));
    assert_eq!(tables.keys.key(ComponentRef::Bus(BusId::new(21))), Some("Bus_LVGrid_3_21"));
    assert_eq!(
        tables.keys.component("Transformer_LVGrid_2_1"),
        Some(ComponentRef::Transformer(TransformerId::new(1)))
    );
    assert_eq!(tables.slack_buses().count(), 1);
}

#[test]
fn mv_only_aggregates_each_lv_grid_exactly() {
    let topology = two_level_case();
    let catalog = mv_catalog();
    let series = varied_series(&topology);
    let tables = Translator::new(&catalog)
        .to_tables(&topology, &series, AnalysisMode::MvOnly, &SnapshotRange::all())
        .unwrap();

    // MV buses plus the two station busbars, no LV feeder buses
    let bus_keys: HashSet<_> = tables.buses.iter().map(|b| b.key.as_str()).collect();
    assert!(bus_keys.contains("Bus_LVGrid_2_10"));
    assert!(!bus_keys.contains("Bus_LVGrid_2_11"));
    assert_eq!(tables.lines.len(), 2);
    assert_eq!(tables.transformers.len(), 2);

    let agg = tables
        .loads
        .iter()
        .find(|l| l.key == "Load_aggregated_LVGrid_2")
        .unwrap();
    assert_eq!(agg.bus, "Bus_LVGrid_2_10");
    let a1 = series.load(LoadId::new(1)).unwrap();
    let a2 = series.load(LoadId::new(2)).unwrap();
    for t in 0..3 {
        assert!((agg.p_set[t] - (a1.p[t] + a2.p[t])).abs() < 1e-12);
        assert!((agg.q_set[t] - (a1.q[t] + a2.q[t])).abs() < 1e-12);
    }
    assert!((agg.nominal_mw - 0.08).abs() < 1e-12);

    let agg_gen = tables
        .generators
        .iter()
        .find(|g| g.key == "Generator_aggregated_LVGrid_2")
        .unwrap();
    let g1 = series.generator(GeneratorId::new(1)).unwrap();
    let g2 = series.generator(GeneratorId::new(2)).unwrap();
    for t in 0..3 {
        assert!((agg_gen.p_set[t] - (g1.p[t] + g2.p[t])).abs() < 1e-12);
    }
    assert!((agg_gen.nominal_mw - 0.03).abs() < 1e-12);

    // grid 3 has no generation, so no aggregated generator
    assert!(tables
        .generators
        .iter()
        .all(|g| g.key != "Generator_aggregated_LVGrid_3"));
    assert!(tables.loads.iter().any(|l| l.key == "Load_MVGrid_1_4"));
}

#[test]
fn lv_only_feeds_each_grid_from_its_station_primary() {
    let topology = two_level_case();
    let catalog = mv_catalog();
    let series = varied_series(&topology);
    let tables = Translator::new(&catalog)
        .to_tables(&topology, &series, AnalysisMode::LvOnly, &SnapshotRange::all())
        .unwrap();
    let slacks: Vec<_> = tables.slack_buses().map(|b| b.key.as_str()).collect();
    assert_eq!(slacks, ["Bus_MVGrid_1_2", "Bus_MVGrid_1_3"]);
    assert_eq!(tables.lines.len(), 2);
    assert!(tables.lines.iter().all(|l| l.key.starts_with("Line_LVGrid")));
    assert!(tables.loads.iter().all(|l| !l.key.contains("MVGrid")));
    assert!(tables.generators.iter().all(|g| !g.key.contains("MVGrid")));

    let output = RadialSweepSolver::default().solve(&tables).unwrap();
    assert_eq!(output.bus_v_pu["Bus_MVGrid_1_2"], vec![1.0, 1.0, 1.0]);
}

#[test]
fn unset_line_parameters_are_defaulted_from_minimal_type() {
    let mut topology = two_level_case();
    topology.add_bus(Bus::new(BusId::new(4), "mv4", GridId::new(1), VoltageLevel::Mv, Kilovolts(20.0)))
        .unwrap();
    topology
        .add_line(Line::new(LineId::new(9), "new cable", BusId::new(3), BusId::new(4), 1.2))
        .unwrap();
    let catalog = mv_catalog();

    let defaulted = Translator::new(&catalog)
        .resolve_missing_parameters(&mut topology)
        .unwrap();
    assert_eq!(defaulted, vec![ComponentRef::Line(LineId::new(9))]);

    let line = topology.line(LineId::new(9)).unwrap();
    let omega = 2.0 * std::f64::consts::PI * 50.0;
    assert!((line.r_ohm.unwrap() - 1.2 * 0.206).abs() < 1e-12);
    assert!((line.x_ohm.unwrap() - 1.2 * 0.4011 * omega / 1000.0).abs() < 1e-12);
    assert!((line.s_nom.unwrap().value() - 3f64.sqrt() * 319.0 * 20.0 / 1000.0).abs() < 1e-12);
    assert_eq!(line.std_type.as_deref(), Some("NA2XS2Y 3x1x150 RM/25"));
}

#[test]
fn tables_refuse_unresolved_parameters() {
    let mut topology = two_level_case();
    topology.add_bus(Bus::new(BusId::new(4), "mv4", GridId::new(1), VoltageLevel::Mv, Kilovolts(20.0)))
        .unwrap();
    topology
        .add_line(Line::new(LineId::new(9), "new cable", BusId::new(3), BusId::new(4), 1.2))
        .unwrap();
    let catalog = mv_catalog();
    let series = varied_series(&topology);
    let err = Translator::new(&catalog)
        .to_tables(&topology, &series, AnalysisMode::Full, &SnapshotRange::all())
        .unwrap_err();
    assert!(matches!(err, GridError::IncompleteTopology { .. }));
}

#[test]
fn missing_catalog_class_makes_defaulting_fail() {
    let mut topology = two_level_case();
    topology
        .add_line(Line::new(LineId::new(9), "lv spur", BusId::new(11), BusId::new(10), 0.05))
        .unwrap();
    let catalog = EquipmentCatalog::new(mv_catalog().mv_lines().to_vec(), Vec::new(), Vec::new());
    let err = Translator::new(&catalog)
        .resolve_missing_parameters(&mut topology)
        .unwrap_err();
    assert!(matches!(err, GridError::IncompleteTopology { ref component, .. } if component == "Line 9"));
}

#[test]
fn parallel_circuits_round_trip_losslessly() {
    let mut topology = two_level_case();
    topology.line_mut(LineId::new(1)).unwrap().ensure_parallel(3);
    let catalog = mv_catalog();
    let series = varied_series(&topology);
    let tables = Translator::new(&catalog)
        .to_tables(&topology, &series, AnalysisMode::Full, &SnapshotRange::all())
        .unwrap();
    let row = tables.lines.iter().find(|l| l.key == "Line_MVGrid_1_1").unwrap();
    let line = topology.line(LineId::new(1)).unwrap();
    assert_eq!(row.num_parallel, 3);
    assert!((row.r_ohm_per_circuit() - line.r_ohm.unwrap()).abs() < 1e-12);
    assert!((row.x_ohm_per_circuit() - line.x_ohm.unwrap()).abs() < 1e-12);
    assert!((row.s_nom_per_circuit() - line.s_nom.unwrap().value()).abs() < 1e-12);
}

#[test]
fn results_map_back_to_exactly_one_component_each() {
    let topology = two_level_case();
    let catalog = mv_catalog();
    let series = varied_series(&topology);
    for mode in [AnalysisMode::Full, AnalysisMode::MvOnly, AnalysisMode::LvOnly] {
        let tables = Translator::new(&catalog)
            .to_tables(&topology, &series, mode, &SnapshotRange::all())
            .unwrap();
        let output = RadialSweepSolver::default().solve(&tables).unwrap();
        let results = PowerFlowResults::from_output(&tables, &output).unwrap();
        assert_eq!(
            results.len(),
            tables.buses.len() + tables.lines.len() + tables.transformers.len()
        );
        for row in &tables.lines {
            let Some(ComponentRef::Line(id)) = tables.keys.component(&row.key) else {
                panic!("line key {} not mapped", row.key);
            };
            assert_eq!(results.line(id).unwrap().s.len(), 3);
        }
    }
}

#[test]
fn unknown_output_keys_are_incomplete_results() {
    let topology = two_level_case();
    let catalog = mv_catalog();
    let series = varied_series(&topology);
    let tables = Translator::new(&catalog)
        .to_tables(&topology, &series, AnalysisMode::MvOnly, &SnapshotRange::all())
        .unwrap();
    let mut output = RadialSweepSolver::default().solve(&tables).unwrap();
    output.bus_v_pu.insert("Bus_ghost".to_string(), vec![1.0; 3]);
    assert!(matches!(
        PowerFlowResults::from_output(&tables, &output),
        Err(hostcap_algo::PowerFlowError::IncompleteResults(_))
    ));

    let mut output = RadialSweepSolver::default().solve(&tables).unwrap();
    output.branch_flows.remove("Line_MVGrid_1_2");
    assert!(PowerFlowResults::from_output(&tables, &output).is_err());
}

#[test]
fn snapshot_range_limits_the_emitted_window() {
    let topology = two_level_case();
    let catalog = mv_catalog();
    let series = varied_series(&topology);
    let window: SnapshotRange = "3600..=7200".parse().unwrap();
    let tables = Translator::new(&catalog)
        .to_tables(&topology, &series, AnalysisMode::MvOnly, &window)
        .unwrap();
    assert_eq!(tables.snapshots, three_snapshots()[1..].to_vec());
    let plant = tables.loads.iter().find(|l| l.key == "Load_MVGrid_1_4").unwrap();
    let full = series.load(LoadId::new(4)).unwrap();
    assert_eq!(plant.p_set, full.p[1..].to_vec());

    let outside: SnapshotRange = "86400..".parse().unwrap();
    assert!(Translator::new(&catalog)
        .to_tables(&topology, &series, AnalysisMode::MvOnly, &outside)
        .is_err());
}
