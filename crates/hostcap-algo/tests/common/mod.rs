#![allow(dead_code)]

use hostcap_core::*;
use hostcap_ts::{PowerSeries, TimeSeries};

pub fn mv_catalog() -> EquipmentCatalog {
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
        vec![LineType {
            name: "NAYY 4x1x150".to_string(),
            u_n: Kilovolts(0.4),
            r_ohm_per_km: 0.206,
            l_mh_per_km: 0.2544,
            i_max_th_a: 275.0,
        }],
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
        ],
    )
}

/// MV feeder 1-2-3 with two LV grids hanging off buses 2 and 3.
///
/// ```text
///  slack 1 ──L1── 2 ──L2── 3
///                 │T1      │T2
///                10        20
///                 │L3      │L4
///                11        21
/// ```
pub fn two_level_case() -> Topology {
    let mut t = Topology::new("two-level");
    t.add_grid(Grid::new(GridId::new(1), "mv", VoltageLevel::Mv)).unwrap();
    t.add_grid(Grid::new(GridId::new(2), "lv a", VoltageLevel::Lv)).unwrap();
    t.add_grid(Grid::new(GridId::new(3), "lv b", VoltageLevel::Lv)).unwrap();
    for id in 1..=3 {
        t.add_bus(Bus::new(BusId::new(id), format!("mv{id}"), GridId::new(1), VoltageLevel::Mv, Kilovolts(20.0)))
            .unwrap();
    }
    for (id, grid) in [(10, 2), (11, 2), (20, 3), (21, 3)] {
        t.add_bus(Bus::new(BusId::new(id), format!("lv{id}"), GridId::new(grid), VoltageLevel::Lv, Kilovolts(0.4)))
            .unwrap();
    }
    t.set_slack_bus(BusId::new(1)).unwrap();

    let cat = mv_catalog();
    let mv_type = &cat.mv_lines()[0];
    let lv_type = &cat.lv_lines()[0];
    t.add_line(Line::from_type(LineId::new(1), "L1", BusId::new(1), BusId::new(2), 2.0, mv_type))
        .unwrap();
    t.add_line(Line::from_type(LineId::new(2), "L2", BusId::new(2), BusId::new(3), 1.5, mv_type))
        .unwrap();
    t.add_line(Line::from_type(LineId::new(3), "L3", BusId::new(10), BusId::new(11), 0.1, lv_type))
        .unwrap();
    t.add_line(Line::from_type(LineId::new(4), "L4", BusId::new(20), BusId::new(21), 0.1, lv_type))
        .unwrap();
    let tr = &cat.transformers()[0];
    t.add_transformer(Transformer::from_type(TransformerId::new(1), "T1", BusId::new(2), BusId::new(10), tr))
        .unwrap();
    t.add_transformer(Transformer::from_type(TransformerId::new(2), "T2", BusId::new(3), BusId::new(20), tr))
        .unwrap();

    t.add_load(Load::new(LoadId::new(1), "house a1", BusId::new(11), Sector::Residential).with_peak_load(0.05))
        .unwrap();
    t.add_load(Load::new(LoadId::new(2), "house a2", BusId::new(11), Sector::Residential).with_peak_load(0.03))
        .unwrap();
    t.add_load(Load::new(LoadId::new(3), "shop b", BusId::new(21), Sector::Retail).with_peak_load(0.08))
        .unwrap();
    t.add_load(Load::new(LoadId::new(4), "plant", BusId::new(3), Sector::Industrial).with_peak_load(1.0))
        .unwrap();
    t.add_generator(Generator::new(GeneratorId::new(1), "pv a", BusId::new(11), Technology::Solar, 0.02))
        .unwrap();
    t.add_generator(Generator::new(GeneratorId::new(2), "pv a2", BusId::new(10), Technology::Solar, 0.01))
        .unwrap();
    t.add_generator(Generator::new(GeneratorId::new(3), "wind", BusId::new(2), Technology::Wind, 2.0))
        .unwrap();
    t
}

pub fn three_snapshots() -> Vec<Snapshot> {
    (0..3)
        .map(|i| Snapshot::from_epoch_seconds(i * 3600).unwrap())
        .collect()
}

/// Distinct values per component and snapshot so sums are checkable.
pub fn varied_series(topology: &Topology) -> TimeSeries {
    let mut ts = TimeSeries::new(three_snapshots()).unwrap();
    for load in topology.loads() {
        let base = load.peak_load.map(|p| p.value()).unwrap_or(0.0);
        let p = vec![base * 0.2, base, base * 0.6];
        let q = p.iter().map(|v| v * 0.3).collect();
        ts.insert_load(load.id, PowerSeries::new(p, q)).unwrap();
    }
    for generator in topology.generators() {
        let p_nom = generator.p_nom.value();
        let p = vec![p_nom, 0.0, p_nom * 0.5];
        let q = p.iter().map(|v| -v * 0.1).collect();
        ts.insert_generator(generator.id, PowerSeries::new(p, q)).unwrap();
    }
    ts
}
