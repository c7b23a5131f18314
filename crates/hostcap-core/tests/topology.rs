use hostcap_core::graph_utils::{feeder_path, unreachable_buses, BusGraph};
use hostcap_core::*;

fn mv_bus(id: usize) -> Bus {
    Bus::new(BusId::new(id), format!("mv{id}"), GridId::new(1), VoltageLevel::Mv, Kilovolts(20.0))
}

fn lv_bus(id: usize) -> Bus {
    Bus::new(BusId::new(id), format!("lv{id}"), GridId::new(2), VoltageLevel::Lv, Kilovolts(0.4))
}

/// slack(1) - 2 - 3 on MV, station 2 -> 10 on LV, 10 - 11 on LV.
fn sample() -> Topology {
    let mut t = Topology::new("sample");
    t.add_grid(Grid::new(GridId::new(1), "mv", VoltageLevel::Mv)).unwrap();
    t.add_grid(Grid::new(GridId::new(2), "lv", VoltageLevel::Lv)).unwrap();
    for id in 1..=3 {
        t.add_bus(mv_bus(id)).unwrap();
    }
    t.add_bus(lv_bus(10)).unwrap();
    t.add_bus(lv_bus(11)).unwrap();
    t.set_slack_bus(BusId::new(1)).unwrap();
    t.add_line(
        Line::new(LineId::new(1), "a", BusId::new(1), BusId::new(2), 1.0).with_impedance(0.2, 0.1).with_s_nom(10.0),
    )
    .unwrap();
    t.add_line(Line::new(LineId::new(2), "b", BusId::new(2), BusId::new(3), 2.0)).unwrap();
    t.add_line(
        Line::new(LineId::new(3), "c", BusId::new(10), BusId::new(11), 0.1).with_impedance(0.03, 0.01).with_s_nom(0.2),
    )
    .unwrap();
    t.add_transformer(Transformer::new(TransformerId::new(1), "st", BusId::new(2), BusId::new(10)))
        .unwrap();
    t.add_load(Load::new(LoadId::new(1), "house", BusId::new(11), Sector::Residential).with_peak_load(0.01))
        .unwrap();
    t.add_generator(Generator::new(GeneratorId::new(1), "pv", BusId::new(11), Technology::Solar, 0.02))
        .unwrap();
    t
}

#[test]
fn dangling_endpoint_is_incomplete_topology() {
    let mut t = sample();
    let err = t
        .add_line(Line::new(LineId::new(9), "x", BusId::new(1), BusId::new(99), 1.0))
        .unwrap_err();
    assert!(matches!(err, GridError::IncompleteTopology { .. }));
    assert!(t.line(LineId::new(9)).is_none());
}

#[test]
fn bus_level_must_match_grid() {
    let mut t = sample();
    let wrong = Bus::new(BusId::new(50), "x", GridId::new(2), VoltageLevel::Mv, Kilovolts(20.0));
    assert!(matches!(t.add_bus(wrong), Err(GridError::Validation(_))));
}

#[test]
fn lines_cannot_cross_grids() {
    let mut t = sample();
    let err = t
        .add_line(Line::new(LineId::new(9), "x", BusId::new(3), BusId::new(11), 1.0))
        .unwrap_err();
    assert!(matches!(err, GridError::Validation(_)));
}

#[test]
fn transformer_orientation_is_checked() {
    let mut t = sample();
    let reversed = Transformer::new(TransformerId::new(2), "rev", BusId::new(10), BusId::new(3));
    assert!(t.add_transformer(reversed).is_err());
}

#[test]
fn station_lookup_and_feeding_points() {
    let t = sample();
    assert_eq!(t.station_bus(GridId::new(2)), Some(BusId::new(10)));
    assert_eq!(t.station_primary_bus(GridId::new(2)), Some(BusId::new(2)));
    assert_eq!(t.feeding_bus(GridId::new(1)), Some(BusId::new(1)));
    assert_eq!(t.feeding_bus(GridId::new(2)), Some(BusId::new(10)));
    assert_eq!(t.loads_in(GridId::new(2)).count(), 1);
    assert_eq!(t.generators_in(GridId::new(1)).count(), 0);
}

#[test]
fn feeder_path_follows_lines_from_feeding_point() {
    let t = sample();
    assert_eq!(feeder_path(&t, BusId::new(3)), Some(vec![LineId::new(1), LineId::new(2)]));
    assert_eq!(feeder_path(&t, BusId::new(11)), Some(vec![LineId::new(3)]));
    assert_eq!(feeder_path(&t, BusId::new(1)), Some(vec![]));
}

#[test]
fn graph_is_radial_and_connected() {
    let t = sample();
    let graph = BusGraph::build(&t);
    assert!(graph.is_radial());
    assert_eq!(graph.reachable_from(BusId::new(1)).len(), t.buses().count());
    assert!(unreachable_buses(&t).is_empty());
}

#[test]
fn meshed_network_is_flagged_as_warning() {
    let mut t = sample();
    assert_eq!(t.validate().issues_by_category("connectivity").count(), 0);
    t.add_line(
        Line::new(LineId::new(4), "ring", BusId::new(1), BusId::new(3), 1.5).with_impedance(0.3, 0.1).with_s_nom(10.0),
    )
    .unwrap();
    assert!(!BusGraph::build(&t).is_radial());
    let diag = t.validate();
    assert!(!diag.has_errors());
    assert!(diag.warnings().any(|i| i.message.contains("meshed")));
}

#[test]
fn zero_parallel_circuits_are_rejected() {
    let t = sample();
    let mut value = serde_json::to_value(&t).unwrap();
    value["lines"][0]["num_parallel"] = serde_json::json!(0);
    let err = serde_json::from_value::<Topology>(value).unwrap_err();
    assert!(err.to_string().contains("no parallel circuits"), "{err}");
}

#[test]
fn validation_reports_defaulted_parameters_and_unreachable_buses() {
    let mut t = sample();
    t.add_bus(mv_bus(4)).unwrap();
    let diag = t.validate();
    // line 2 and the transformer have unset parameters
    assert_eq!(diag.issues_by_category("parameters").count(), 2);
    assert_eq!(diag.error_count(), 1);
    assert!(diag.errors().any(|i| i.entity.as_deref() == Some("Bus 4")));
}

#[test]
fn serde_round_trip_preserves_components() {
    let t = sample();
    let json = serde_json::to_string(&t).unwrap();
    let back: Topology = serde_json::from_str(&json).unwrap();
    assert_eq!(back.stats(), t.stats());
    assert_eq!(back.slack_bus(), Some(BusId::new(1)));
    let line = back.line(LineId::new(1)).unwrap();
    assert_eq!(line.r_ohm, Some(0.2));
    assert_eq!(line.num_parallel(), 1);
}

#[test]
fn deserializing_rejects_dangling_references() {
    let t = sample();
    let mut value = serde_json::to_value(&t).unwrap();
    value["lines"][0]["bus1"] = serde_json::json!(42);
    assert!(serde_json::from_value::<Topology>(value).is_err());
}
