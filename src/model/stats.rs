//! Piece-level effects and consumer-level attributes.

use std::fmt;
use std::ops::{Add, AddAssign, Index, IndexMut, Sub};

/// An effect a piece can roll, identified by the export's effect id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stat {
    HpFlat,
    HpPct,
    AtkFlat,
    AtkPct,
    DefFlat,
    DefPct,
    Spd,
    CritRate,
    CritDmg,
    Res,
    Acc,
}

impl Stat {
    /// All stats in effect-id order.
    pub const ALL: [Stat; 11] = [
        Stat::HpFlat,
        Stat::HpPct,
        Stat::AtkFlat,
        Stat::AtkPct,
        Stat::DefFlat,
        Stat::DefPct,
        Stat::Spd,
        Stat::CritRate,
        Stat::CritDmg,
        Stat::Res,
        Stat::Acc,
    ];

    /// Looks up a stat by its export effect id.
    pub fn from_effect_id(id: u16) -> Option<Self> {
        match id {
            1 => Some(Stat::HpFlat),
            2 => Some(Stat::HpPct),
            3 => Some(Stat::AtkFlat),
            4 => Some(Stat::AtkPct),
            5 => Some(Stat::DefFlat),
            6 => Some(Stat::DefPct),
            8 => Some(Stat::Spd),
            9 => Some(Stat::CritRate),
            10 => Some(Stat::CritDmg),
            11 => Some(Stat::Res),
            12 => Some(Stat::Acc),
            _ => None,
        }
    }

    /// The export effect id.
    pub fn effect_id(self) -> u16 {
        match self {
            Stat::HpFlat => 1,
            Stat::HpPct => 2,
            Stat::AtkFlat => 3,
            Stat::AtkPct => 4,
            Stat::DefFlat => 5,
            Stat::DefPct => 6,
            Stat::Spd => 8,
            Stat::CritRate => 9,
            Stat::CritDmg => 10,
            Stat::Res => 11,
            Stat::Acc => 12,
        }
    }

    /// The final attribute this stat feeds.
    pub fn attribute(self) -> Attribute {
        match self {
            Stat::HpFlat | Stat::HpPct => Attribute::Hp,
            Stat::AtkFlat | Stat::AtkPct => Attribute::Atk,
            Stat::DefFlat | Stat::DefPct => Attribute::Def,
            Stat::Spd => Attribute::Spd,
            Stat::CritRate => Attribute::CritRate,
            Stat::CritDmg => Attribute::CritDmg,
            Stat::Res => Attribute::Res,
            Stat::Acc => Attribute::Acc,
        }
    }

    /// Whether the magnitude is a percentage of the base attribute.
    pub fn is_percent_of_base(self) -> bool {
        matches!(self, Stat::HpPct | Stat::AtkPct | Stat::DefPct)
    }
}

/// What a roll affects: a regular stat or an artifact-only special effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Effect {
    Stat(Stat),
    /// Artifact effect id (damage modifiers and the like); no attribute impact.
    Special(u16),
}

impl Effect {
    pub fn stat(self) -> Option<Stat> {
        match self {
            Effect::Stat(s) => Some(s),
            Effect::Special(_) => None,
        }
    }
}

/// Final, consumer-level attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Attribute {
    Hp,
    Atk,
    Def,
    Spd,
    CritRate,
    CritDmg,
    Res,
    Acc,
}

impl Attribute {
    pub const COUNT: usize = 8;

    pub const ALL: [Attribute; Attribute::COUNT] = [
        Attribute::Hp,
        Attribute::Atk,
        Attribute::Def,
        Attribute::Spd,
        Attribute::CritRate,
        Attribute::CritDmg,
        Attribute::Res,
        Attribute::Acc,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Hp => "HP",
            Attribute::Atk => "ATK",
            Attribute::Def => "DEF",
            Attribute::Spd => "SPD",
            Attribute::CritRate => "CRI Rate",
            Attribute::CritDmg => "CRI Dmg",
            Attribute::Res => "RES",
            Attribute::Acc => "ACC",
        };
        f.write_str(name)
    }
}

/// Integer attribute vector indexed by [`Attribute`].
///
/// # Examples
///
/// ```
/// use u_loadout::model::{Attribute, AttributeSet};
///
/// let mut a = AttributeSet::default();
/// a[Attribute::Spd] = 104;
/// let b = a + AttributeSet::from_pairs(&[(Attribute::Spd, 20)]);
/// assert_eq!(b[Attribute::Spd], 124);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeSet([i64; Attribute::COUNT]);

impl AttributeSet {
    pub fn new(values: [i64; Attribute::COUNT]) -> Self {
        Self(values)
    }

    /// Builds a set from sparse `(attribute, value)` pairs; the rest are zero.
    pub fn from_pairs(pairs: &[(Attribute, i64)]) -> Self {
        let mut set = Self::default();
        for &(attr, value) in pairs {
            set[attr] += value;
        }
        set
    }

    /// Typical unit stats before equipment: crit rate 15, crit damage 50, res 15.
    pub fn base(hp: i64, atk: i64, def: i64, spd: i64) -> Self {
        Self([hp, atk, def, spd, 15, 50, 15, 0])
    }

    pub fn values(&self) -> &[i64; Attribute::COUNT] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, i64)> + '_ {
        Attribute::ALL.iter().map(move |&a| (a, self.0[a.index()]))
    }
}

impl Index<Attribute> for AttributeSet {
    type Output = i64;

    fn index(&self, attr: Attribute) -> &i64 {
        &self.0[attr.index()]
    }
}

impl IndexMut<Attribute> for AttributeSet {
    fn index_mut(&mut self, attr: Attribute) -> &mut i64 {
        &mut self.0[attr.index()]
    }
}

impl Add for AttributeSet {
    type Output = AttributeSet;

    fn add(mut self, rhs: AttributeSet) -> AttributeSet {
        self += rhs;
        self
    }
}

impl AddAssign for AttributeSet {
    fn add_assign(&mut self, rhs: AttributeSet) {
        for (lhs, r) in self.0.iter_mut().zip(rhs.0) {
            *lhs += r;
        }
    }
}

impl Sub for AttributeSet {
    type Output = AttributeSet;

    fn sub(mut self, rhs: AttributeSet) -> AttributeSet {
        for (lhs, r) in self.0.iter_mut().zip(rhs.0) {
            *lhs -= r;
        }
        self
    }
}
