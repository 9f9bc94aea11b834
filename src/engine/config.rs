//! Engine configuration.
//!
//! [`EngineConfig`] selects the assignment strategy and holds its numeric
//! knobs. [`QualityProfile`] gives named presets.

use std::time::Duration;

use crate::model::{PieceId, MAX_PASSES};
use crate::ordering::TickTable;

/// Assignment strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strategy {
    /// One pass in serving order.
    Greedy,
    /// Greedy followed by swap refinement passes.
    Refine,
    /// One joint model over every consumer.
    Global,
    /// Parallel screening of serving orders, then refinement of the best.
    Screened,
}

impl Strategy {
    /// The strategy that actually runs. `Screened` needs the accelerator and
    /// falls back to `Global` without it.
    pub fn resolve(self, accelerated: bool) -> Self {
        match self {
            Strategy::Screened if !accelerated => Strategy::Global,
            other => other,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::Greedy => "greedy",
            Strategy::Refine => "refine",
            Strategy::Global => "global",
            Strategy::Screened => "screened",
        }
    }
}

/// Named presets trading runtime for quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum QualityProfile {
    Fast,
    Balanced,
    MaxQuality,
    Screened,
}

impl QualityProfile {
    pub fn strategy(self) -> Strategy {
        match self {
            QualityProfile::Fast => Strategy::Greedy,
            QualityProfile::Balanced => Strategy::Refine,
            QualityProfile::MaxQuality => Strategy::Global,
            QualityProfile::Screened => Strategy::Screened,
        }
    }
}

/// Knobs of the screening front-end.
///
/// Batch size is `clamp(consumers × batch_factor, min_batch, max_batch)`.
/// The number of survivors is `candidate_cap` when set, else
/// `clamp(batch / 8, 1, max_candidate_cap)`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScreeningConfig {
    pub batch_factor: usize,
    pub min_batch: usize,
    pub max_batch: usize,
    /// Screening rounds; later rounds mutate the survivors of earlier ones.
    pub cycles: usize,
    pub candidate_cap: Option<usize>,
    pub max_candidate_cap: usize,
    pub seed: u64,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            batch_factor: 32,
            min_batch: 16,
            max_batch: 4096,
            cycles: 3,
            candidate_cap: None,
            max_candidate_cap: 64,
            seed: 20_260_215,
        }
    }
}

impl ScreeningConfig {
    pub fn with_candidate_cap(mut self, cap: usize) -> Self {
        self.candidate_cap = Some(cap);
        self
    }

    pub fn with_batch(mut self, factor: usize, min: usize, max: usize) -> Self {
        self.batch_factor = factor;
        self.min_batch = min;
        self.max_batch = max;
        self
    }

    pub fn with_cycles(mut self, cycles: usize) -> Self {
        self.cycles = cycles;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn batch_size(&self, consumers: usize) -> usize {
        consumers
            .saturating_mul(self.batch_factor)
            .clamp(self.min_batch, self.max_batch)
    }

    pub fn survivors(&self, batch: usize) -> usize {
        match self.candidate_cap {
            Some(cap) => cap.min(batch).max(1),
            None => (batch / 8).clamp(1, self.max_candidate_cap.max(1)),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_batch == 0 || self.min_batch > self.max_batch {
            return Err(format!(
                "screening batch bounds must satisfy 0 < min ({}) <= max ({})",
                self.min_batch, self.max_batch
            ));
        }
        if self.cycles == 0 {
            return Err("screening needs at least one cycle".into());
        }
        if self.candidate_cap == Some(0) {
            return Err("candidate_cap must be at least 1".into());
        }
        Ok(())
    }
}

/// Configuration of one engine run.
///
/// # Builder Pattern
///
/// ```
/// use std::time::Duration;
/// use u_loadout::engine::{EngineConfig, QualityProfile, Strategy};
///
/// let config = EngineConfig::from_profile(QualityProfile::Balanced)
///     .with_passes(5)
///     .with_time_per_consumer(Duration::from_secs(2));
/// assert_eq!(config.strategy, Strategy::Refine);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    pub strategy: Strategy,

    /// Total passes including the greedy one (1–10).
    pub passes: u8,

    /// Search budget per consumer.
    pub time_per_consumer: Duration,

    /// Upper bound for any batch-level search (joint model, refinement,
    /// screening).
    pub max_batch_time: Duration,

    /// Worker threads for the joint model's root branches.
    pub workers: usize,

    /// Whether the screening front-end may be used. When false (or when the
    /// `parallel` feature is off) `Screened` resolves to `Global`.
    pub accelerator: bool,

    /// Stop at the first consumer that cannot be completed.
    pub fail_fast: bool,

    /// Keep only this many pieces per (set, position) by efficiency.
    pub top_per_set: Option<usize>,

    /// Pieces removed from consideration for this run.
    pub excluded: Vec<PieceId>,

    pub ticks: TickTable,

    pub screening: ScreeningConfig,

    /// Name of the run; also the archive key of its result.
    pub label: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Refine,
            passes: 3,
            time_per_consumer: Duration::from_secs(10),
            max_batch_time: Duration::from_secs(120),
            workers: std::thread::available_parallelism().map_or(1, |n| n.get()),
            accelerator: true,
            fail_fast: false,
            top_per_set: None,
            excluded: Vec::new(),
            ticks: TickTable::default(),
            screening: ScreeningConfig::default(),
            label: "run".into(),
        }
    }
}

impl EngineConfig {
    pub fn from_profile(profile: QualityProfile) -> Self {
        let passes = match profile {
            QualityProfile::Fast | QualityProfile::MaxQuality => 1,
            QualityProfile::Balanced | QualityProfile::Screened => 3,
        };
        Self {
            strategy: profile.strategy(),
            passes,
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_passes(mut self, passes: u8) -> Self {
        self.passes = passes;
        self
    }

    pub fn with_time_per_consumer(mut self, budget: Duration) -> Self {
        self.time_per_consumer = budget;
        self
    }

    pub fn with_max_batch_time(mut self, budget: Duration) -> Self {
        self.max_batch_time = budget;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_accelerator(mut self, enabled: bool) -> Self {
        self.accelerator = enabled;
        self
    }

    pub fn with_fail_fast(mut self, enabled: bool) -> Self {
        self.fail_fast = enabled;
        self
    }

    pub fn with_top_per_set(mut self, n: usize) -> Self {
        self.top_per_set = Some(n);
        self
    }

    pub fn with_excluded(mut self, ids: Vec<PieceId>) -> Self {
        self.excluded = ids;
        self
    }

    pub fn with_ticks(mut self, ticks: TickTable) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn with_screening(mut self, screening: ScreeningConfig) -> Self {
        self.screening = screening;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Whether the screening front-end is usable in this build and config.
    pub fn accelerated(&self) -> bool {
        cfg!(feature = "parallel") && self.accelerator
    }

    /// Budget of a batch of `consumers`: the per-consumer budget times the
    /// batch size, capped by `max_batch_time`.
    pub fn batch_budget(&self, consumers: usize) -> Duration {
        self.time_per_consumer
            .saturating_mul(consumers.max(1) as u32)
            .min(self.max_batch_time)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.passes == 0 || self.passes > MAX_PASSES {
            return Err(format!("passes must be in 1..={}, got {}", MAX_PASSES, self.passes));
        }
        if self.time_per_consumer.is_zero() {
            return Err("time_per_consumer must be positive".into());
        }
        if self.max_batch_time.is_zero() {
            return Err("max_batch_time must be positive".into());
        }
        if self.workers == 0 {
            return Err("workers must be at least 1".into());
        }
        if self.top_per_set == Some(0) {
            return Err("top_per_set must be at least 1".into());
        }
        self.screening.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_map_to_strategies() {
        assert_eq!(EngineConfig::from_profile(QualityProfile::Fast).strategy, Strategy::Greedy);
        assert_eq!(EngineConfig::from_profile(QualityProfile::Balanced).passes, 3);
        assert_eq!(EngineConfig::from_profile(QualityProfile::MaxQuality).strategy, Strategy::Global);
        assert_eq!(
            EngineConfig::from_profile(QualityProfile::Screened).strategy,
            Strategy::Screened
        );
    }

    #[test]
    fn test_screened_falls_back_without_accelerator() {
        assert_eq!(Strategy::Screened.resolve(false), Strategy::Global);
        assert_eq!(Strategy::Screened.resolve(true), Strategy::Screened);
        assert_eq!(Strategy::Refine.resolve(false), Strategy::Refine);

        let config = EngineConfig::default().with_accelerator(false);
        assert!(!config.accelerated());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(EngineConfig::default().with_passes(0).validate().is_err());
        assert!(EngineConfig::default().with_passes(11).validate().is_err());
        assert!(EngineConfig::default().with_workers(0).validate().is_err());
        assert!(EngineConfig::default()
            .with_time_per_consumer(Duration::ZERO)
            .validate()
            .is_err());
        let screening = ScreeningConfig::default().with_candidate_cap(0);
        assert!(EngineConfig::default().with_screening(screening).validate().is_err());
    }

    #[test]
    fn test_screening_sizes_scale_and_clamp() {
        let s = ScreeningConfig::default();
        assert_eq!(s.batch_size(0), 16);
        assert_eq!(s.batch_size(10), 320);
        assert_eq!(s.batch_size(1_000), 4096);
        assert_eq!(s.survivors(320), 40);
        assert_eq!(s.survivors(4096), 64);
        assert_eq!(s.clone().with_candidate_cap(1).survivors(320), 1);
    }

    #[test]
    fn test_batch_budget_is_capped() {
        let config = EngineConfig::default()
            .with_time_per_consumer(Duration::from_secs(10))
            .with_max_batch_time(Duration::from_secs(25));
        assert_eq!(config.batch_budget(2), Duration::from_secs(20));
        assert_eq!(config.batch_budget(5), Duration::from_secs(25));
    }
}
