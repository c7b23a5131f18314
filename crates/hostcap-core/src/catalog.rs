//! Standard equipment types used to default missing parameters and to pick
//! reinforcement replacements.
//!
//! Every list is kept sorted by thermal rating so "minimal sufficient" lookups
//! are a linear scan from the smallest entry.

use crate::error::{GridError, GridResult};
use crate::units::{Kilovolts, MegavoltAmperes};
use serde::{Deserialize, Serialize};

/// A standard cable or overhead line type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineType {
    pub name: String,
    /// Nominal voltage class
    pub u_n: Kilovolts,
    pub r_ohm_per_km: f64,
    /// Inductance per km in mH
    pub l_mh_per_km: f64,
    /// Thermal current limit in A
    pub i_max_th_a: f64,
}

impl LineType {
    /// Reactance per km at `frequency_hz`: L·2πf/1000.
    pub fn x_ohm_per_km(&self, frequency_hz: f64) -> f64 {
        self.l_mh_per_km * 2.0 * std::f64::consts::PI * frequency_hz / 1e3
    }

    /// Thermal rating of a single circuit.
    pub fn s_nom(&self) -> MegavoltAmperes {
        MegavoltAmperes::from_current(self.i_max_th_a, self.u_n)
    }
}

/// A standard MV/LV distribution transformer type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformerType {
    pub name: String,
    pub s_nom: MegavoltAmperes,
    /// Primary (MV side) nominal voltage
    pub u_primary: Kilovolts,
    /// Secondary (LV side) nominal voltage
    pub u_secondary: Kilovolts,
    pub r_pu: f64,
    pub x_pu: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
    Mv,
    Lv,
}

/// Per-voltage-class tables of standard types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentCatalog {
    #[serde(default)]
    mv_lines: Vec<LineType>,
    #[serde(default)]
    lv_lines: Vec<LineType>,
    #[serde(default)]
    mv_lv_transformers: Vec<TransformerType>,
}

fn by_line_rating(a: &LineType, b: &LineType) -> std::cmp::Ordering {
    a.s_nom()
        .value()
        .total_cmp(&b.s_nom().value())
        .then_with(|| a.name.cmp(&b.name))
}

fn by_transformer_rating(a: &TransformerType, b: &TransformerType) -> std::cmp::Ordering {
    a.s_nom
        .value()
        .total_cmp(&b.s_nom.value())
        .then_with(|| a.name.cmp(&b.name))
}

impl EquipmentCatalog {
    pub fn new(
        mv_lines: Vec<LineType>,
        lv_lines: Vec<LineType>,
        mv_lv_transformers: Vec<TransformerType>,
    ) -> Self {
        let mut catalog = Self {
            mv_lines,
            lv_lines,
            mv_lv_transformers,
        };
        catalog.normalize();
        catalog
    }

    /// Restore rating order, e.g. after deserializing a hand-edited catalog.
    pub fn normalize(&mut self) {
        self.mv_lines.sort_by(by_line_rating);
        self.lv_lines.sort_by(by_line_rating);
        self.mv_lv_transformers.sort_by(by_transformer_rating);
    }

    pub fn mv_lines(&self) -> &[LineType] {
        &self.mv_lines
    }

    pub fn lv_lines(&self) -> &[LineType] {
        &self.lv_lines
    }

    pub fn transformers(&self) -> &[TransformerType] {
        &self.mv_lv_transformers
    }

    pub fn is_empty(&self) -> bool {
        self.mv_lines.is_empty() && self.lv_lines.is_empty() && self.mv_lv_transformers.is_empty()
    }

    fn lines_of(&self, class: LineClass) -> &[LineType] {
        match class {
            LineClass::Mv => &self.mv_lines,
            LineClass::Lv => &self.lv_lines,
        }
    }

    /// Line types of the voltage class nearest to `u_n`.
    ///
    /// MV and LV lines live in separate tables; within a table several
    /// nominal voltages may coexist (10 kV and 20 kV cables), so the entries
    /// whose `u_n` is closest to the requested voltage are returned, still in
    /// rating order.
    pub fn line_types_for(&self, u_n: Kilovolts) -> Vec<&LineType> {
        let class = if u_n.value() >= 1.0 {
            LineClass::Mv
        } else {
            LineClass::Lv
        };
        let table = self.lines_of(class);
        let nearest = table
            .iter()
            .map(|t| (t.u_n.value() - u_n.value()).abs())
            .min_by(|a, b| a.total_cmp(b));
        match nearest {
            Some(best) => table
                .iter()
                .filter(|t| ((t.u_n.value() - u_n.value()).abs() - best).abs() < 1e-9)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Smallest line type of the nearest voltage class.
    pub fn minimal_line_type(&self, u_n: Kilovolts) -> GridResult<&LineType> {
        self.line_types_for(u_n)
            .into_iter()
            .next()
            .ok_or_else(|| no_line_types(u_n))
    }

    /// Smallest line type whose `circuits` parallel circuits together carry
    /// at least `required`. `None` when even the largest type is too small.
    pub fn sufficient_line_type(
        &self,
        u_n: Kilovolts,
        required: MegavoltAmperes,
        circuits: u32,
    ) -> GridResult<Option<&LineType>> {
        let candidates = self.line_types_for(u_n);
        if candidates.is_empty() {
            return Err(no_line_types(u_n));
        }
        Ok(candidates
            .into_iter()
            .find(|t| t.s_nom().value() * circuits.max(1) as f64 >= required.value()))
    }

    /// Next type with a strictly larger rating than the named one.
    ///
    /// A line without a standard type (or with a type unknown to the catalog)
    /// is compared by its per-circuit rating instead.
    pub fn next_line_type(
        &self,
        u_n: Kilovolts,
        current: Option<&str>,
        current_rating: MegavoltAmperes,
    ) -> GridResult<Option<&LineType>> {
        let candidates = self.line_types_for(u_n);
        if candidates.is_empty() {
            return Err(no_line_types(u_n));
        }
        let floor = current
            .and_then(|name| candidates.iter().find(|t| t.name == name))
            .map(|t| t.s_nom())
            .unwrap_or(current_rating);
        Ok(candidates
            .into_iter()
            .find(|t| t.s_nom().value() > floor.value() + 1e-9))
    }

    pub fn largest_line_type(&self, u_n: Kilovolts) -> GridResult<&LineType> {
        self.line_types_for(u_n)
            .into_iter()
            .last()
            .ok_or_else(|| no_line_types(u_n))
    }

    pub fn line_type(&self, name: &str) -> Option<&LineType> {
        self.mv_lines
            .iter()
            .chain(self.lv_lines.iter())
            .find(|t| t.name == name)
    }

    /// Transformer types of the voltage pair nearest to `primary`/`secondary`.
    ///
    /// Distance is the sum of the relative deviations on both sides, so a
    /// 20/0.69 kV station never receives a 20/0.4 kV type while a matching
    /// one exists.
    pub fn transformer_types_for(
        &self,
        primary: Kilovolts,
        secondary: Kilovolts,
    ) -> Vec<&TransformerType> {
        let distance = |t: &TransformerType| {
            relative_deviation(t.u_primary, primary) + relative_deviation(t.u_secondary, secondary)
        };
        let nearest = self
            .mv_lv_transformers
            .iter()
            .map(distance)
            .min_by(|a, b| a.total_cmp(b));
        match nearest {
            Some(best) => self
                .mv_lv_transformers
                .iter()
                .filter(|t| (distance(t) - best).abs() < 1e-9)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn minimal_transformer_type(
        &self,
        primary: Kilovolts,
        secondary: Kilovolts,
    ) -> GridResult<&TransformerType> {
        self.transformer_types_for(primary, secondary)
            .into_iter()
            .next()
            .ok_or_else(|| no_transformer_types(primary, secondary))
    }

    /// Smallest transformer type whose `units` parallel units carry `required`.
    pub fn sufficient_transformer_type(
        &self,
        primary: Kilovolts,
        secondary: Kilovolts,
        required: MegavoltAmperes,
        units: u32,
    ) -> GridResult<Option<&TransformerType>> {
        let candidates = self.transformer_types_for(primary, secondary);
        if candidates.is_empty() {
            return Err(no_transformer_types(primary, secondary));
        }
        Ok(candidates
            .into_iter()
            .find(|t| t.s_nom.value() * units.max(1) as f64 >= required.value()))
    }

    /// Next type with a strictly larger rating than `current_rating`.
    pub fn next_transformer_type(
        &self,
        primary: Kilovolts,
        secondary: Kilovolts,
        current_rating: MegavoltAmperes,
    ) -> GridResult<Option<&TransformerType>> {
        let candidates = self.transformer_types_for(primary, secondary);
        if candidates.is_empty() {
            return Err(no_transformer_types(primary, secondary));
        }
        Ok(candidates
            .into_iter()
            .find(|t| t.s_nom.value() > current_rating.value() + 1e-9))
    }

    pub fn largest_transformer_type(
        &self,
        primary: Kilovolts,
        secondary: Kilovolts,
    ) -> GridResult<&TransformerType> {
        self.transformer_types_for(primary, secondary)
            .into_iter()
            .last()
            .ok_or_else(|| no_transformer_types(primary, secondary))
    }
}

fn relative_deviation(value: Kilovolts, target: Kilovolts) -> f64 {
    if target.value() > 0.0 {
        (value.value() - target.value()).abs() / target.value()
    } else {
        value.value().abs()
    }
}

fn no_line_types(u_n: Kilovolts) -> GridError {
    GridError::missing_catalog(
        format!("line class {u_n}"),
        "no standard line types for this voltage class",
    )
}

fn no_transformer_types(primary: Kilovolts, secondary: Kilovolts) -> GridError {
    GridError::missing_catalog(
        format!("transformer class {primary}/{secondary}"),
        "no standard transformer types",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(name: &str, r: f64, l: f64, i: f64) -> LineType {
        LineType {
            name: name.to_string(),
            u_n: Kilovolts(20.0),
            r_ohm_per_km: r,
            l_mh_per_km: l,
            i_max_th_a: i,
        }
    }

    fn catalog() -> EquipmentCatalog {
        EquipmentCatalog::new(
            vec![
                mv("NA2XS2Y 3x1x240", 0.13, 0.3725, 417.0),
                mv("NA2XS2Y 3x1x150", 0.206, 0.4011, 319.0),
                mv("NA2XS2Y 3x1x185", 0.164, 0.3879, 357.0),
                LineType {
                    name: "NA2XS2Y 3x1x185 10kV".to_string(),
                    u_n: Kilovolts(10.0),
                    r_ohm_per_km: 0.164,
                    l_mh_per_km: 0.38,
                    i_max_th_a: 357.0,
                },
            ],
            Vec::new(),
            vec![
                TransformerType {
                    name: "630 kVA".to_string(),
                    s_nom: MegavoltAmperes(0.63),
                    u_primary: Kilovolts(20.0),
                    u_secondary: Kilovolts(0.4),
                    r_pu: 0.01,
                    x_pu: 0.04,
                },
                TransformerType {
                    name: "400 kVA".to_string(),
                    s_nom: MegavoltAmperes(0.4),
                    u_primary: Kilovolts(20.0),
                    u_secondary: Kilovolts(0.4),
                    r_pu: 0.012,
                    x_pu: 0.04,
                },
                TransformerType {
                    name: "250 kVA 690 V".to_string(),
                    s_nom: MegavoltAmperes(0.25),
                    u_primary: Kilovolts(20.0),
                    u_secondary: Kilovolts(0.69),
                    r_pu: 0.014,
                    x_pu: 0.04,
                },
                TransformerType {
                    name: "1000 kVA 690 V".to_string(),
                    s_nom: MegavoltAmperes(1.0),
                    u_primary: Kilovolts(20.0),
                    u_secondary: Kilovolts(0.69),
                    r_pu: 0.009,
                    x_pu: 0.06,
                },
            ],
        )
    }

    #[test]
    fn entries_are_sorted_by_rating() {
        let cat = catalog();
        let names: Vec<_> = cat
            .line_types_for(Kilovolts(20.0))
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(
            names,
            ["NA2XS2Y 3x1x150", "NA2XS2Y 3x1x185", "NA2XS2Y 3x1x240"]
        );
        assert_eq!(
            cat.minimal_transformer_type(Kilovolts(20.0), Kilovolts(0.4)).unwrap().name,
            "400 kVA"
        );
    }

    #[test]
    fn nearest_voltage_class_is_used() {
        let cat = catalog();
        assert_eq!(cat.line_types_for(Kilovolts(10.5)).len(), 1);
        assert_eq!(cat.minimal_line_type(Kilovolts(21.0)).unwrap().name, "NA2XS2Y 3x1x150");
    }

    #[test]
    fn sufficient_lookup_respects_parallel_circuits() {
        let cat = catalog();
        let s150 = cat.minimal_line_type(Kilovolts(20.0)).unwrap().s_nom();
        let pick = cat
            .sufficient_line_type(Kilovolts(20.0), s150 * 1.05, 1)
            .unwrap()
            .unwrap();
        assert_eq!(pick.name, "NA2XS2Y 3x1x185");
        let pick = cat
            .sufficient_line_type(Kilovolts(20.0), s150 * 1.05, 2)
            .unwrap()
            .unwrap();
        assert_eq!(pick.name, "NA2XS2Y 3x1x150");
        assert!(cat
            .sufficient_line_type(Kilovolts(20.0), MegavoltAmperes(100.0), 1)
            .unwrap()
            .is_none());
    }

    #[test]
    fn next_type_is_strictly_larger() {
        let cat = catalog();
        let next = cat
            .next_line_type(Kilovolts(20.0), Some("NA2XS2Y 3x1x185"), MegavoltAmperes(0.0))
            .unwrap()
            .unwrap();
        assert_eq!(next.name, "NA2XS2Y 3x1x240");
        assert!(cat
            .next_line_type(Kilovolts(20.0), Some("NA2XS2Y 3x1x240"), MegavoltAmperes(0.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn transformer_lookups_follow_the_secondary_voltage() {
        let cat = catalog();
        let lv_400: Vec<_> = cat
            .transformer_types_for(Kilovolts(20.0), Kilovolts(0.4))
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(lv_400, ["400 kVA", "630 kVA"]);
        let (mv, lv) = (Kilovolts(20.0), Kilovolts(0.69));
        assert_eq!(cat.minimal_transformer_type(mv, lv).unwrap().name, "250 kVA 690 V");
        assert_eq!(cat.largest_transformer_type(mv, lv).unwrap().name, "1000 kVA 690 V");
        let next = cat
            .next_transformer_type(mv, lv, MegavoltAmperes(0.25))
            .unwrap()
            .unwrap();
        assert_eq!(next.name, "1000 kVA 690 V");
        let pick = cat
            .sufficient_transformer_type(mv, lv, MegavoltAmperes(0.5), 1)
            .unwrap()
            .unwrap();
        assert_eq!(pick.name, "1000 kVA 690 V");
        assert!(cat
            .next_transformer_type(Kilovolts(20.0), Kilovolts(0.4), MegavoltAmperes(0.63))
            .unwrap()
            .is_none());
    }

    #[test]
    fn missing_class_is_reported() {
        let cat = catalog();
        assert!(matches!(
            cat.minimal_line_type(Kilovolts(0.4)),
            Err(GridError::MissingCatalogEntry { .. })
        ));
        assert!(matches!(
            EquipmentCatalog::default().largest_transformer_type(Kilovolts(20.0), Kilovolts(0.4)),
            Err(GridError::MissingCatalogEntry { .. })
        ));
    }
}
