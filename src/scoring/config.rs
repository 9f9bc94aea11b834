//! Scoring tables.
//!
//! Every constant the scorer uses lives here so callers can swap tables
//! without touching the scoring code.

use crate::model::{Attribute, SetTag, Stat};

/// Rune efficiency weights.
///
/// `efficiency = (base + Σ value × weight) / normalization × 100`, over the
/// innate roll and all secondaries (rolled value plus grind).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EfficiencyTable {
    pub base: f64,
    pub weights: Vec<(Stat, f64)>,
    pub normalization: f64,
    /// Also count the primary roll.
    pub count_primary: bool,
}

impl Default for EfficiencyTable {
    fn default() -> Self {
        Self {
            base: 1.0,
            weights: vec![
                (Stat::HpPct, 1.0 / 40.0),
                (Stat::AtkPct, 1.0 / 40.0),
                (Stat::DefPct, 1.0 / 40.0),
                (Stat::Acc, 1.0 / 40.0),
                (Stat::Res, 1.0 / 40.0),
                (Stat::Spd, 1.0 / 30.0),
                (Stat::CritRate, 1.0 / 30.0),
                (Stat::CritDmg, 1.0 / 35.0),
                (Stat::HpFlat, 0.35 / 1875.0),
                (Stat::AtkFlat, 0.35 / 100.0),
                (Stat::DefFlat, 0.35 / 100.0),
            ],
            normalization: 2.8,
            count_primary: false,
        }
    }
}

impl EfficiencyTable {
    pub fn weight(&self, stat: Stat) -> f64 {
        self.weights
            .iter()
            .find(|(s, _)| *s == stat)
            .map_or(0.0, |&(_, w)| w)
    }
}

/// Artifact efficiency divisors by effect id.
///
/// `efficiency = clamp(Σ value / divisor(effect) / normalization × 100, 0, 100)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArtifactEfficiencyTable {
    pub divisors: Vec<(u16, f64)>,
    pub default_divisor: f64,
    pub normalization: f64,
}

impl Default for ArtifactEfficiencyTable {
    fn default() -> Self {
        let mut divisors = vec![
            (215, 40.0),
            (223, 60.0),
            (221, 200.0),
            (218, 1.5),
            (219, 20.0),
            (220, 20.0),
        ];
        // Effects rolling at most ~4 per upgrade.
        for id in [210, 211, 212, 213] {
            divisors.push((id, 20.0));
        }
        // ~5 per upgrade.
        for id in [204, 205, 207, 208, 209, 214, 216, 217, 224, 225, 405] {
            divisors.push((id, 25.0));
        }
        Self {
            divisors,
            default_divisor: 30.0,
            normalization: 1.6,
        }
    }
}

impl ArtifactEfficiencyTable {
    pub fn divisor(&self, effect_id: u16) -> f64 {
        self.divisors
            .iter()
            .find(|(id, _)| *id == effect_id)
            .map_or(self.default_divisor, |&(_, d)| d)
    }
}

/// One bonus granted per set activation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetBonus {
    pub attribute: Attribute,
    pub value: i64,
    /// `value` is a percent of the base attribute rather than a flat amount.
    pub percent_of_base: bool,
}

/// Bonuses per set tag. Activations are `pieces / set size`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SetCatalog {
    pub bonuses: Vec<(SetTag, SetBonus)>,
}

impl Default for SetCatalog {
    fn default() -> Self {
        Self {
            bonuses: vec![(
                SetTag::Swift,
                SetBonus {
                    attribute: Attribute::Spd,
                    value: 25,
                    percent_of_base: true,
                },
            )],
        }
    }
}

impl SetCatalog {
    pub fn empty() -> Self {
        Self {
            bonuses: Vec::new(),
        }
    }

    pub fn with_bonus(mut self, tag: SetTag, bonus: SetBonus) -> Self {
        self.bonuses.push((tag, bonus));
        self
    }

    pub fn bonuses_for(&self, tag: SetTag) -> impl Iterator<Item = &SetBonus> + '_ {
        self.bonuses
            .iter()
            .filter(move |(t, _)| *t == tag)
            .map(|(_, b)| b)
    }
}

/// Blend of piece efficiency and final attributes that the engine maximizes.
///
/// Attribute weights apply to `final − base` per point. Attributes the
/// consumer puts a floor on are weighted `× (1 + floor_emphasis)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectiveWeights {
    pub efficiency: f64,
    pub attributes: [f64; Attribute::COUNT],
    pub floor_emphasis: f64,
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        let mut attributes = [0.0; Attribute::COUNT];
        attributes[Attribute::Spd.index()] = 1.0;
        attributes[Attribute::CritRate.index()] = 0.5;
        attributes[Attribute::CritDmg.index()] = 0.5;
        Self {
            efficiency: 1.0,
            attributes,
            floor_emphasis: 1.0,
        }
    }
}

impl ObjectiveWeights {
    /// Efficiency only.
    pub fn efficiency_only() -> Self {
        Self {
            efficiency: 1.0,
            attributes: [0.0; Attribute::COUNT],
            floor_emphasis: 0.0,
        }
    }

    pub fn with_attribute(mut self, attribute: Attribute, weight: f64) -> Self {
        self.attributes[attribute.index()] = weight;
        self
    }

    pub fn with_floor_emphasis(mut self, emphasis: f64) -> Self {
        self.floor_emphasis = emphasis;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.efficiency.is_finite() || !self.floor_emphasis.is_finite() {
            return Err("objective weights must be finite".into());
        }
        if self.attributes.iter().any(|w| !w.is_finite()) {
            return Err("attribute weights must be finite".into());
        }
        if self.floor_emphasis < 0.0 {
            return Err(format!(
                "floor_emphasis must be non-negative, got {}",
                self.floor_emphasis
            ));
        }
        Ok(())
    }
}

/// All scoring tables for a run.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScoringConfig {
    pub runes: EfficiencyTable,
    pub artifacts: ArtifactEfficiencyTable,
    pub sets: SetCatalog,
    pub objective: ObjectiveWeights,
    /// Account-wide percent of base SPD added to every consumer.
    pub spd_building_pct: i64,
}

impl ScoringConfig {
    pub fn with_objective(mut self, objective: ObjectiveWeights) -> Self {
        self.objective = objective;
        self
    }

    pub fn with_sets(mut self, sets: SetCatalog) -> Self {
        self.sets = sets;
        self
    }

    pub fn with_spd_building_pct(mut self, pct: i64) -> Self {
        self.spd_building_pct = pct;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.runes.normalization <= 0.0 {
            return Err("rune normalization must be positive".into());
        }
        if self.artifacts.normalization <= 0.0 || self.artifacts.default_divisor <= 0.0 {
            return Err("artifact normalization and divisors must be positive".into());
        }
        if let Some((id, d)) = self.artifacts.divisors.iter().find(|(_, d)| *d <= 0.0) {
            return Err(format!("artifact divisor for effect {} must be positive, got {}", id, d));
        }
        if self.sets.bonuses.iter().any(|(_, b)| b.value < 0) {
            return Err("set bonuses must be non-negative".into());
        }
        self.objective.validate()
    }
}
