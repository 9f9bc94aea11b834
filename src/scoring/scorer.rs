//! Efficiency, final attributes and objective.

use crate::model::{
    Attribute, AttributeSet, Consumer, Effect, EquipmentPiece, LeaderSkill, SetTag,
};

use super::config::{ObjectiveWeights, SetBonus};
use super::ScoringConfig;

/// Effective per-consumer objective weights after floor emphasis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveProfile {
    pub efficiency: f64,
    pub attributes: [f64; Attribute::COUNT],
}

impl ObjectiveProfile {
    /// Applies `floor_emphasis` to every attribute for which `floored` holds.
    pub fn new(weights: &ObjectiveWeights, floored: impl Fn(Attribute) -> bool) -> Self {
        let mut attributes = weights.attributes;
        for attr in Attribute::ALL {
            if floored(attr) {
                attributes[attr.index()] *= 1.0 + weights.floor_emphasis;
            }
        }
        Self {
            efficiency: weights.efficiency,
            attributes,
        }
    }

    /// Upper bound on what integer truncation can add beyond the real-valued
    /// estimate of an objective.
    pub fn truncation_slack(&self) -> f64 {
        self.attributes.iter().map(|w| w.abs()).sum()
    }
}

/// Pure scoring functions over a fixed [`ScoringConfig`].
///
/// Every strategy and the result builder go through the same `Scorer`, so
/// a given set of committed pieces always yields the same figures.
#[derive(Debug, Clone, Default)]
pub struct Scorer {
    config: ScoringConfig,
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

impl Scorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Piece efficiency in percent.
    pub fn efficiency(&self, piece: &EquipmentPiece) -> f64 {
        if piece.position.is_rune() {
            self.rune_efficiency(piece)
        } else {
            self.artifact_efficiency(piece)
        }
    }

    fn rune_efficiency(&self, piece: &EquipmentPiece) -> f64 {
        let table = &self.config.runes;
        let weigh = |effect: Effect, value: i32| -> f64 {
            effect
                .stat()
                .map_or(0.0, |s| value as f64 * table.weight(s))
        };

        let mut score = table.base;
        if table.count_primary {
            score += weigh(piece.primary.effect, piece.primary.value);
        }
        if let Some(innate) = piece.innate {
            score += weigh(innate.effect, innate.value);
        }
        for sub in &piece.secondaries {
            score += weigh(sub.effect, sub.total());
        }
        round2(score / table.normalization * 100.0)
    }

    fn artifact_efficiency(&self, piece: &EquipmentPiece) -> f64 {
        if piece.secondaries.is_empty() {
            return 0.0;
        }
        let table = &self.config.artifacts;
        let score: f64 = piece
            .secondaries
            .iter()
            .map(|sub| {
                let id = match sub.effect {
                    Effect::Special(id) => id,
                    Effect::Stat(s) => s.effect_id(),
                };
                sub.total() as f64 / table.divisor(id)
            })
            .sum();
        round2((score / table.normalization * 100.0).clamp(0.0, 100.0))
    }

    /// Active set activations for the given pieces: `(tag, activations)`.
    pub fn set_activations(&self, pieces: &[&EquipmentPiece]) -> Vec<(SetTag, u8)> {
        let mut counts: Vec<(SetTag, u8)> = Vec::new();
        for tag in pieces.iter().filter_map(|p| p.set) {
            match counts.iter_mut().find(|(t, _)| *t == tag) {
                Some(entry) => entry.1 += 1,
                None => counts.push((tag, 1)),
            }
        }
        counts.sort();
        counts
            .into_iter()
            .filter_map(|(tag, n)| {
                let activations = n / tag.size().pieces();
                (activations > 0).then_some((tag, activations))
            })
            .collect()
    }

    /// Final attributes of a consumer wearing `pieces`.
    ///
    /// Flat contributions are summed; percent-of-base contributions (piece
    /// rolls, set bonuses, the leader skill and the account SPD bonus) are
    /// summed per attribute and applied once with truncating division.
    pub fn final_attributes(
        &self,
        consumer: &Consumer,
        pieces: &[&EquipmentPiece],
        leader: Option<&LeaderSkill>,
    ) -> AttributeSet {
        let mut flat = [0i64; Attribute::COUNT];
        let mut pct = [0i64; Attribute::COUNT];

        for piece in pieces {
            for (stat, value) in piece.stat_rolls() {
                let slot = stat.attribute().index();
                if stat.is_percent_of_base() {
                    pct[slot] += value;
                } else {
                    flat[slot] += value;
                }
            }
        }

        for (tag, activations) in self.set_activations(pieces) {
            for bonus in self.config.sets.bonuses_for(tag) {
                let slot = bonus.attribute.index();
                let amount = bonus.value * activations as i64;
                if bonus.percent_of_base {
                    pct[slot] += amount;
                } else {
                    flat[slot] += amount;
                }
            }
        }

        if let Some(lead) = leader.filter(|l| l.applies_to(consumer.element)) {
            pct[lead.attribute.index()] += lead.percent;
        }
        pct[Attribute::Spd.index()] += self.config.spd_building_pct;

        let mut out = consumer.base;
        for attr in Attribute::ALL {
            let i = attr.index();
            let base = consumer.base[attr];
            out[attr] = base + flat[i] + base * pct[i] / 100;
        }
        out
    }

    /// Weighted objective of one consumer's loadout.
    pub fn objective(
        &self,
        profile: &ObjectiveProfile,
        consumer: &Consumer,
        pieces: &[&EquipmentPiece],
        attributes: &AttributeSet,
    ) -> f64 {
        let efficiency: f64 = pieces.iter().map(|p| self.efficiency(p)).sum();
        let mut total = profile.efficiency * efficiency;
        for attr in Attribute::ALL {
            let w = profile.attributes[attr.index()];
            if w != 0.0 {
                total += w * (attributes[attr] - consumer.base[attr]) as f64;
            }
        }
        total
    }

    /// Real-valued attribute change one piece brings to a consumer, ignoring
    /// set bonuses and truncation.
    pub fn piece_delta(&self, base: &AttributeSet, piece: &EquipmentPiece) -> [f64; Attribute::COUNT] {
        let mut delta = [0.0; Attribute::COUNT];
        for (stat, value) in piece.stat_rolls() {
            let attr = stat.attribute();
            delta[attr.index()] += if stat.is_percent_of_base() {
                base[attr] as f64 * value as f64 / 100.0
            } else {
                value as f64
            };
        }
        delta
    }

    /// Real-valued attribute change of one activation of `tag`.
    pub fn set_delta(&self, base: &AttributeSet, tag: SetTag) -> [f64; Attribute::COUNT] {
        let mut delta = [0.0; Attribute::COUNT];
        for bonus in self.config.sets.bonuses_for(tag) {
            delta[bonus.attribute.index()] += bonus_amount(bonus, base);
        }
        delta
    }

    /// Marginal objective of one piece, excluding set bonuses.
    pub fn piece_gain(
        &self,
        profile: &ObjectiveProfile,
        base: &AttributeSet,
        efficiency: f64,
        piece: &EquipmentPiece,
    ) -> f64 {
        let delta = self.piece_delta(base, piece);
        profile.efficiency * efficiency
            + delta
                .iter()
                .zip(profile.attributes.iter())
                .map(|(d, w)| d * w)
                .sum::<f64>()
    }
}

fn bonus_amount(bonus: &SetBonus, base: &AttributeSet) -> f64 {
    if bonus.percent_of_base {
        base[bonus.attribute] as f64 * bonus.value as f64 / 100.0
    } else {
        bonus.value as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ArtifactSlot, Element, Stat, StatRoll, Substat};
    use crate::scoring::ObjectiveWeights;
    use proptest::prelude::*;

    fn consumer() -> Consumer {
        Consumer::new(1, "Lushen", Element::Wind, AttributeSet::base(9_885, 812, 461, 103))
    }

    fn swift(id: u64, slot: u8, spd: i32) -> EquipmentPiece {
        EquipmentPiece::rune(id, slot, SetTag::Swift, StatRoll::stat(Stat::AtkFlat, 160))
            .with_secondary(Substat::stat(Stat::Spd, spd))
    }

    #[test]
    fn test_rune_efficiency_known_value() {
        let scorer = Scorer::default();
        // (1 + 30/30 + 20/40) / 2.8 = 0.892857...
        let piece = EquipmentPiece::rune(1, 2, SetTag::Swift, StatRoll::stat(Stat::Spd, 42))
            .with_secondary(Substat::stat(Stat::Spd, 20).with_grind(10))
            .with_secondary(Substat::stat(Stat::HpPct, 20));
        assert_eq!(scorer.efficiency(&piece), 89.29);
    }

    #[test]
    fn test_rune_efficiency_ignores_primary_by_default() {
        let scorer = Scorer::default();
        let bare = EquipmentPiece::rune(1, 2, SetTag::Swift, StatRoll::stat(Stat::Spd, 42));
        assert_eq!(scorer.efficiency(&bare), 35.71);

        let mut config = ScoringConfig::default();
        config.runes.count_primary = true;
        let counted = Scorer::new(config).efficiency(&bare);
        assert!(counted > 35.71, "primary should raise efficiency, got {}", counted);
    }

    #[test]
    fn test_artifact_efficiency_is_clamped() {
        let scorer = Scorer::default();
        let art = EquipmentPiece::artifact(9, ArtifactSlot::Element, StatRoll::stat(Stat::HpFlat, 1500))
            .with_secondary(Substat {
                effect: Effect::Special(218),
                value: 9,
                grind: 0,
                enchanted: false,
            });
        assert_eq!(scorer.efficiency(&art), 100.0);

        let mild = EquipmentPiece::artifact(10, ArtifactSlot::Element, StatRoll::stat(Stat::HpFlat, 1500))
            .with_secondary(Substat {
                effect: Effect::Special(204),
                value: 8,
                grind: 0,
                enchanted: false,
            });
        // 8/25/1.6 = 0.2
        assert_eq!(scorer.efficiency(&mild), 20.0);
    }

    #[test]
    fn test_swift_set_activates_at_four_pieces() {
        let scorer = Scorer::default();
        let unit = consumer();
        let pieces: Vec<EquipmentPiece> = (1..=4).map(|s| swift(s as u64, s, 5)).collect();
        let three: Vec<&EquipmentPiece> = pieces.iter().take(3).collect();
        let four: Vec<&EquipmentPiece> = pieces.iter().collect();

        let a3 = scorer.final_attributes(&unit, &three, None);
        assert_eq!(a3[Attribute::Spd], 103 + 15);

        let a4 = scorer.final_attributes(&unit, &four, None);
        // 103 + 20 + 103*25/100
        assert_eq!(a4[Attribute::Spd], 103 + 20 + 25);
        assert_eq!(scorer.set_activations(&four), vec![(SetTag::Swift, 1)]);
    }

    #[test]
    fn test_percent_stats_apply_to_base() {
        let scorer = Scorer::default();
        let unit = consumer();
        let piece = EquipmentPiece::rune(1, 2, SetTag::Will, StatRoll::stat(Stat::HpPct, 63))
            .with_secondary(Substat::stat(Stat::HpFlat, 300));
        let attrs = scorer.final_attributes(&unit, &[&piece], None);
        assert_eq!(attrs[Attribute::Hp], 9_885 + 300 + 9_885 * 63 / 100);
    }

    #[test]
    fn test_leader_and_building_bonus() {
        let scorer = Scorer::new(ScoringConfig::default().with_spd_building_pct(15));
        let unit = consumer();
        let lead = LeaderSkill::new(Attribute::Spd, 24);
        let attrs = scorer.final_attributes(&unit, &[], Some(&lead));
        assert_eq!(attrs[Attribute::Spd], 103 + 103 * 39 / 100);

        let fire_only = LeaderSkill::new(Attribute::Spd, 24).for_element(Element::Fire);
        let attrs = scorer.final_attributes(&unit, &[], Some(&fire_only));
        assert_eq!(attrs[Attribute::Spd], 103 + 103 * 15 / 100);
    }

    #[test]
    fn test_objective_emphasizes_floored_attributes() {
        let scorer = Scorer::default();
        let unit = consumer();
        let piece = swift(1, 1, 10);
        let attrs = scorer.final_attributes(&unit, &[&piece], None);
        let eff = scorer.efficiency(&piece);

        let plain = ObjectiveProfile::new(&ObjectiveWeights::default(), |_| false);
        let floored = ObjectiveProfile::new(&ObjectiveWeights::default(), |a| a == Attribute::Spd);
        let base = scorer.objective(&plain, &unit, &[&piece], &attrs);
        let emph = scorer.objective(&floored, &unit, &[&piece], &attrs);
        assert!((base - (eff + 10.0)).abs() < 1e-9, "got {}", base);
        assert!((emph - (eff + 20.0)).abs() < 1e-9, "got {}", emph);
    }

    #[test]
    fn test_piece_gain_matches_objective_without_sets() {
        let scorer = Scorer::default();
        let unit = consumer();
        let piece = EquipmentPiece::rune(1, 4, SetTag::Blade, StatRoll::stat(Stat::CritDmg, 80))
            .with_secondary(Substat::stat(Stat::Spd, 12));
        let profile = ObjectiveProfile::new(&ObjectiveWeights::default(), |_| false);
        let eff = scorer.efficiency(&piece);
        let gain = scorer.piece_gain(&profile, &unit.base, eff, &piece);
        let attrs = scorer.final_attributes(&unit, &[&piece], None);
        let objective = scorer.objective(&profile, &unit, &[&piece], &attrs);
        assert!((gain - objective).abs() < 1e-9, "gain {} vs objective {}", gain, objective);
    }

    fn arb_rune() -> impl Strategy<Value = EquipmentPiece> {
        (
            1u8..=6,
            0usize..SetTag::ALL.len(),
            prop::collection::vec((0usize..Stat::ALL.len(), 1i32..40, 0i32..8), 0..4),
        )
            .prop_map(|(slot, set, subs)| {
                let mut piece = EquipmentPiece::rune(
                    slot as u64,
                    slot,
                    SetTag::ALL[set],
                    StatRoll::stat(Stat::AtkPct, 63),
                );
                for (s, v, g) in subs {
                    piece = piece.with_secondary(Substat::stat(Stat::ALL[s], v).with_grind(g));
                }
                piece
            })
    }

    proptest! {
        #[test]
        fn prop_scoring_is_idempotent(pieces in prop::collection::vec(arb_rune(), 0..6)) {
            let scorer = Scorer::default();
            let unit = consumer();
            let refs: Vec<&EquipmentPiece> = pieces.iter().collect();
            let lead = LeaderSkill::new(Attribute::Spd, 24);
            for p in &pieces {
                prop_assert_eq!(scorer.efficiency(p).to_bits(), scorer.efficiency(p).to_bits());
            }
            let a = scorer.final_attributes(&unit, &refs, Some(&lead));
            let b = scorer.final_attributes(&unit, &refs, Some(&lead));
            prop_assert_eq!(a, b);
            let profile = ObjectiveProfile::new(&ObjectiveWeights::default(), |_| false);
            let oa = scorer.objective(&profile, &unit, &refs, &a);
            let ob = scorer.objective(&profile, &unit, &refs, &b);
            prop_assert_eq!(oa.to_bits(), ob.to_bits());
        }
    }
}
