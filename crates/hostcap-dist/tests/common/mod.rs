#![allow(dead_code)]

use hostcap_core::*;
use hostcap_ts::{PowerSeries, TimeSeries};

pub const CABLE_150: &str = "NA2XS2Y 3x1x150 RM/25";
pub const CABLE_185: &str = "NA2XS2Y 3x1x185 RM/25";
pub const CABLE_240: &str = "NA2XS2Y 3x1x240";

fn mv_cables() -> Vec<LineType> {
    let cable = |name: &str, r: f64, l: f64, i: f64| LineType {
        name: name.to_string(),
        u_n: Kilovolts(20.0),
        r_ohm_per_km: r,
        l_mh_per_km: l,
        i_max_th_a: i,
    };
    vec![
        cable(CABLE_150, 0.206, 0.4011, 319.0),
        cable(CABLE_185, 0.164, 0.3879, 357.0),
        cable(CABLE_240, 0.13, 0.3725, 417.0),
    ]
}

fn lv_cables() -> Vec<LineType> {
    vec![LineType {
        name: "NAYY 4x1x150".to_string(),
        u_n: Kilovolts(0.4),
        r_ohm_per_km: 0.206,
        l_mh_per_km: 0.2544,
        i_max_th_a: 275.0,
    }]
}

fn station_transformers() -> Vec<TransformerType> {
    vec![
        TransformerType {
            name: "400 kVA".to_string(),
            s_nom: MegavoltAmperes(0.4),
            u_primary: Kilovolts(20.0),
            u_secondary: Kilovolts(0.4),
            r_pu: 0.012,
            x_pu: 0.04,
        },
        TransformerType {
            name: "630 kVA".to_string(),
            s_nom: MegavoltAmperes(0.63),
            u_primary: Kilovolts(20.0),
            u_secondary: Kilovolts(0.4),
            r_pu: 0.01,
            x_pu: 0.04,
        },
    ]
}

pub fn catalog() -> EquipmentCatalog {
    EquipmentCatalog::new(mv_cables(), lv_cables(), station_transformers())
}

pub fn catalog_without_transformers() -> EquipmentCatalog {
    EquipmentCatalog::new(mv_cables(), lv_cables(), Vec::new())
}

/// Two snapshots: full load, then half load.
pub fn snapshots() -> Vec<Snapshot> {
    vec![
        Snapshot::from_epoch_seconds(0).unwrap(),
        Snapshot::from_epoch_seconds(3600).unwrap(),
    ]
}

pub fn load_series(topology: &Topology) -> TimeSeries {
    let mut ts = TimeSeries::new(snapshots()).unwrap();
    for load in topology.loads() {
        let peak = load.peak_load.map(|p| p.value()).unwrap_or(0.0);
        ts.insert_load(load.id, PowerSeries::active(vec![peak, peak * 0.5]))
            .unwrap();
    }
    ts
}

/// Slack bus 1 feeding a single load at bus 2 through one 20 kV cable.
pub fn single_feeder(length_km: f64, cable: &str, load_mw: f64) -> Topology {
    let cat = catalog();
    let mut t = Topology::new("single feeder");
    t.add_grid(Grid::new(GridId::new(1), "mv", VoltageLevel::Mv)).unwrap();
    for id in 1..=2 {
        t.add_bus(Bus::new(BusId::new(id), format!("mv{id}"), GridId::new(1), VoltageLevel::Mv, Kilovolts(20.0)))
            .unwrap();
    }
    t.set_slack_bus(BusId::new(1)).unwrap();
    let line_type = cat.line_type(cable).unwrap();
    t.add_line(Line::from_type(LineId::new(1), "L1", BusId::new(1), BusId::new(2), length_km, line_type))
        .unwrap();
    t.add_load(Load::new(LoadId::new(1), "plant", BusId::new(2), Sector::Industrial).with_peak_load(load_mw))
        .unwrap();
    t
}

/// Single feeder with an LV grid behind a 400 kVA station at bus 2.
///
/// ```text
///  slack 1 ──L1── 2 ──T1── 10 ──L2── 11 (LV load)
/// ```
pub fn feeder_with_station(mv_load_mw: f64, lv_load_mw: f64) -> Topology {
    station_behind_feeder(1.0, CABLE_150, mv_load_mw, 0.05, lv_load_mw)
}

/// [`feeder_with_station`] with the MV cable and the LV cable length chosen.
pub fn station_behind_feeder(
    mv_length_km: f64,
    mv_cable: &str,
    mv_load_mw: f64,
    lv_length_km: f64,
    lv_load_mw: f64,
) -> Topology {
    let cat = catalog();
    let mut t = single_feeder(mv_length_km, mv_cable, mv_load_mw);
    t.add_grid(Grid::new(GridId::new(2), "lv", VoltageLevel::Lv)).unwrap();
    for id in [10, 11] {
        t.add_bus(Bus::new(BusId::new(id), format!("lv{id}"), GridId::new(2), VoltageLevel::Lv, Kilovolts(0.4)))
            .unwrap();
    }
    t.add_line(Line::from_type(
        LineId::new(2),
        "L2",
        BusId::new(10),
        BusId::new(11),
        lv_length_km,
        &cat.lv_lines()[0],
    ))
    .unwrap();
    t.add_transformer(Transformer::from_type(
        TransformerId::new(1),
        "T1",
        BusId::new(2),
        BusId::new(10),
        &cat.transformers()[0],
    ))
    .unwrap();
    t.add_load(Load::new(LoadId::new(2), "houses", BusId::new(11), Sector::Residential).with_peak_load(lv_load_mw))
        .unwrap();
    t
}
