//! SPD breakpoints per turn tick.

/// Minimum SPD needed to act every `tick` ticks.
///
/// # Examples
///
/// ```
/// use u_loadout::ordering::TickTable;
///
/// let table = TickTable::normal();
/// assert_eq!(table.band(9), Some((159, Some(178))));
/// assert_eq!(table.band(3), Some((477, None)));
/// assert_eq!(table.band(12), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TickTable {
    /// `(tick, min SPD)`, any order.
    min_spd: Vec<(u32, i64)>,
}

impl Default for TickTable {
    fn default() -> Self {
        Self::normal()
    }
}

impl TickTable {
    /// Table for 7% ATB gain per tick.
    pub fn normal() -> Self {
        Self {
            min_spd: vec![
                (11, 130),
                (10, 143),
                (9, 159),
                (8, 179),
                (7, 205),
                (6, 239),
                (5, 286),
                (4, 358),
                (3, 477),
            ],
        }
    }

    /// Table for 1.5% ATB gain per tick, ticks 16–53.
    pub fn rta() -> Self {
        Self::from_gain(1.5, 16, 53)
    }

    /// Builds `ceil(10000 / gain / tick)` for every tick in range.
    pub fn from_gain(gain_per_tick_pct: f64, first: u32, last: u32) -> Self {
        let k = 10_000.0 / gain_per_tick_pct;
        Self {
            min_spd: (first..=last)
                .map(|t| (t, (k / t as f64).ceil() as i64))
                .collect(),
        }
    }

    pub fn min_spd(&self, tick: u32) -> Option<i64> {
        self.min_spd
            .iter()
            .find(|(t, _)| *t == tick)
            .map(|&(_, s)| s)
    }

    /// Inclusive SPD range `(min, max)` that lands exactly on `tick`.
    /// The fastest tick has no ceiling.
    pub fn band(&self, tick: u32) -> Option<(i64, Option<i64>)> {
        let min = self.min_spd(tick)?;
        let max = tick
            .checked_sub(1)
            .and_then(|faster| self.min_spd(faster))
            .map(|m| m - 1);
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rta_table_breakpoints() {
        let table = TickTable::rta();
        // ceil(6666.67 / 16) = 417
        assert_eq!(table.min_spd(16), Some(417));
        assert_eq!(table.band(53).map(|b| b.0), Some(126));
        assert_eq!(table.band(16), Some((417, None)));
        assert_eq!(table.band(17).and_then(|b| b.1), Some(416));
    }
}
