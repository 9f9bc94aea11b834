//! Consumers (units receiving equipment) and their leader skills.

use std::fmt;

use super::stats::{Attribute, AttributeSet};

/// Stable identity of a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsumerId(pub u64);

impl fmt::Display for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Element {
    Fire,
    Water,
    Wind,
    Light,
    Dark,
}

/// Team-wide bonus granted by whichever consumer leads the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LeaderSkill {
    pub attribute: Attribute,
    /// Percent of each member's base attribute.
    pub percent: i64,
    /// Restricts the bonus to members of one element.
    pub element: Option<Element>,
}

impl LeaderSkill {
    pub fn new(attribute: Attribute, percent: i64) -> Self {
        Self {
            attribute,
            percent,
            element: None,
        }
    }

    pub fn for_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    /// Whether the bonus reaches a member of this element.
    pub fn applies_to(&self, element: Element) -> bool {
        self.element.is_none_or(|e| e == element)
    }
}

/// A unit to equip. Read-only input.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Consumer {
    pub id: ConsumerId,
    pub name: String,
    pub element: Element,
    /// Attributes before equipment.
    pub base: AttributeSet,
    pub leader: Option<LeaderSkill>,
}

impl Consumer {
    pub fn new(id: u64, name: impl Into<String>, element: Element, base: AttributeSet) -> Self {
        Self {
            id: ConsumerId(id),
            name: name.into(),
            element,
            base,
            leader: None,
        }
    }

    pub fn with_leader(mut self, leader: LeaderSkill) -> Self {
        self.leader = Some(leader);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_restricted_leader() {
        let lead = LeaderSkill::new(Attribute::Spd, 24).for_element(Element::Wind);
        assert!(lead.applies_to(Element::Wind));
        assert!(!lead.applies_to(Element::Fire));
        assert!(LeaderSkill::new(Attribute::Hp, 30).applies_to(Element::Dark));
    }
}
