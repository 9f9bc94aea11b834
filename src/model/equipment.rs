//! Runes and artifacts.

use std::fmt;

use super::stats::{Effect, Stat};

/// Stable identity of an equipment piece (the export's rune/artifact id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PieceId(pub u64);

impl fmt::Display for PieceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Number of pieces a set needs before its bonus activates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetSize {
    Two,
    Four,
}

impl SetSize {
    pub fn pieces(self) -> u8 {
        match self {
            SetSize::Two => 2,
            SetSize::Four => 4,
        }
    }
}

/// Rune set family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SetTag {
    Energy,
    Guard,
    Swift,
    Blade,
    Rage,
    Focus,
    Endure,
    Fatal,
    Despair,
    Vampire,
    Violent,
    Nemesis,
    Will,
    Shield,
    Revenge,
    Destroy,
    Fight,
    Determination,
    Enhance,
    Accuracy,
    Tolerance,
    Seal,
    Intangible,
}

impl SetTag {
    pub const ALL: [SetTag; 23] = [
        SetTag::Energy,
        SetTag::Guard,
        SetTag::Swift,
        SetTag::Blade,
        SetTag::Rage,
        SetTag::Focus,
        SetTag::Endure,
        SetTag::Fatal,
        SetTag::Despair,
        SetTag::Vampire,
        SetTag::Violent,
        SetTag::Nemesis,
        SetTag::Will,
        SetTag::Shield,
        SetTag::Revenge,
        SetTag::Destroy,
        SetTag::Fight,
        SetTag::Determination,
        SetTag::Enhance,
        SetTag::Accuracy,
        SetTag::Tolerance,
        SetTag::Seal,
        SetTag::Intangible,
    ];

    pub fn size(self) -> SetSize {
        match self {
            SetTag::Swift
            | SetTag::Rage
            | SetTag::Fatal
            | SetTag::Despair
            | SetTag::Vampire
            | SetTag::Violent
            | SetTag::Intangible => SetSize::Four,
            _ => SetSize::Two,
        }
    }

    /// Looks up a set by the export's set id.
    pub fn from_set_id(id: u16) -> Option<Self> {
        let tag = match id {
            1 => SetTag::Energy,
            2 => SetTag::Guard,
            3 => SetTag::Swift,
            4 => SetTag::Blade,
            5 => SetTag::Rage,
            6 => SetTag::Focus,
            7 => SetTag::Endure,
            8 => SetTag::Fatal,
            10 => SetTag::Despair,
            11 => SetTag::Vampire,
            13 => SetTag::Violent,
            14 => SetTag::Nemesis,
            15 => SetTag::Will,
            16 => SetTag::Shield,
            17 => SetTag::Revenge,
            18 => SetTag::Destroy,
            19 => SetTag::Fight,
            20 => SetTag::Determination,
            21 => SetTag::Enhance,
            22 => SetTag::Accuracy,
            23 => SetTag::Tolerance,
            24 => SetTag::Seal,
            25 => SetTag::Intangible,
            _ => return None,
        };
        Some(tag)
    }
}

/// Artifact slot class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArtifactSlot {
    /// Element-bound artifact.
    Element,
    /// Archetype-bound (attack/defense/hp/support) artifact.
    Archetype,
}

/// Equipment position on a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Position {
    /// Rune slot 1–6.
    Rune(u8),
    Artifact(ArtifactSlot),
}

impl Position {
    pub const RUNE_SLOTS: [Position; 6] = [
        Position::Rune(1),
        Position::Rune(2),
        Position::Rune(3),
        Position::Rune(4),
        Position::Rune(5),
        Position::Rune(6),
    ];

    /// Whether a consumer can ever hold something here.
    pub fn is_addressable(self) -> bool {
        match self {
            Position::Rune(slot) => (1..=6).contains(&slot),
            Position::Artifact(_) => true,
        }
    }

    pub fn is_rune(self) -> bool {
        matches!(self, Position::Rune(_))
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Rune(slot) => write!(f, "rune slot {}", slot),
            Position::Artifact(ArtifactSlot::Element) => f.write_str("element artifact"),
            Position::Artifact(ArtifactSlot::Archetype) => f.write_str("archetype artifact"),
        }
    }
}

/// Required positions for a consumer's mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Loadout {
    #[default]
    Runes,
    RunesAndArtifacts,
}

impl Loadout {
    pub fn positions(self) -> Vec<Position> {
        let mut positions = Position::RUNE_SLOTS.to_vec();
        if self == Loadout::RunesAndArtifacts {
            positions.push(Position::Artifact(ArtifactSlot::Element));
            positions.push(Position::Artifact(ArtifactSlot::Archetype));
        }
        positions
    }
}

/// An effect with its magnitude.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatRoll {
    pub effect: Effect,
    pub value: i32,
}

impl StatRoll {
    pub fn stat(stat: Stat, value: i32) -> Self {
        Self {
            effect: Effect::Stat(stat),
            value,
        }
    }
}

/// A secondary roll, including grind bonus.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Substat {
    pub effect: Effect,
    pub value: i32,
    pub grind: i32,
    pub enchanted: bool,
}

impl Substat {
    pub fn stat(stat: Stat, value: i32) -> Self {
        Self {
            effect: Effect::Stat(stat),
            value,
            grind: 0,
            enchanted: false,
        }
    }

    pub fn with_grind(mut self, grind: i32) -> Self {
        self.grind = grind;
        self
    }

    /// Rolled value plus grind.
    pub fn total(&self) -> i32 {
        self.value + self.grind
    }
}

/// A rune or artifact. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EquipmentPiece {
    pub id: PieceId,
    pub position: Position,
    /// Rune set; artifacts carry none.
    pub set: Option<SetTag>,
    pub primary: StatRoll,
    /// Rune prefix stat.
    pub innate: Option<StatRoll>,
    pub secondaries: Vec<Substat>,
    /// Quality 1–6.
    pub grade: u8,
    /// Enhancement level 0–15.
    pub level: u8,
}

impl EquipmentPiece {
    /// A +15 six-star rune with the given primary and no secondaries.
    pub fn rune(id: u64, slot: u8, set: SetTag, primary: StatRoll) -> Self {
        Self {
            id: PieceId(id),
            position: Position::Rune(slot),
            set: Some(set),
            primary,
            innate: None,
            secondaries: Vec::new(),
            grade: 6,
            level: 15,
        }
    }

    pub fn artifact(id: u64, slot: ArtifactSlot, primary: StatRoll) -> Self {
        Self {
            id: PieceId(id),
            position: Position::Artifact(slot),
            set: None,
            primary,
            innate: None,
            secondaries: Vec::new(),
            grade: 5,
            level: 15,
        }
    }

    pub fn with_innate(mut self, innate: StatRoll) -> Self {
        self.innate = Some(innate);
        self
    }

    pub fn with_secondary(mut self, substat: Substat) -> Self {
        self.secondaries.push(substat);
        self
    }

    pub fn with_grade(mut self, grade: u8, level: u8) -> Self {
        self.grade = grade;
        self.level = level;
        self
    }

    /// The primary stat, if it is a regular stat.
    pub fn primary_stat(&self) -> Option<Stat> {
        self.primary.effect.stat()
    }

    /// All rolls that feed final attributes, as `(stat, magnitude)`.
    pub fn stat_rolls(&self) -> impl Iterator<Item = (Stat, i64)> + '_ {
        let primary = self
            .primary
            .effect
            .stat()
            .map(|s| (s, self.primary.value as i64));
        let innate = self
            .innate
            .and_then(|r| r.effect.stat().map(|s| (s, r.value as i64)));
        let secondaries = self
            .secondaries
            .iter()
            .filter_map(|sub| sub.effect.stat().map(|s| (s, sub.total() as i64)));
        primary.into_iter().chain(innate).chain(secondaries)
    }
}
