//! Depth-first branch-and-bound over allocation models.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::model::{set_counts, Attribute, AttributeBound, EquipmentPiece, SetTag};
use crate::pool::PieceIdx;

use super::model::{AllocationModel, ModelMember};
use super::types::{AllocationSolver, SolverConfig, SolverSolution, SolverStatus};

const EPS: f64 = 1e-9;
const CHECK_EVERY: u64 = 64;

/// Exact solver for [`AllocationModel`]s.
///
/// Members are decided in model order, slots in declared order, candidates
/// in descending gain. Subtrees are cut by set supply, attribute bound
/// reachability and an admissible objective bound. With `num_workers > 1`
/// (and the `parallel` feature) the first member's branches are explored on
/// the rayon pool while sharing one incumbent.
///
/// When the time limit or cancellation stops the search, the best solution
/// found so far is returned as [`SolverStatus::Feasible`].
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchAndBoundSolver;

impl BranchAndBoundSolver {
    pub fn new() -> Self {
        Self
    }
}

impl AllocationSolver for BranchAndBoundSolver {
    fn solve(&self, model: &AllocationModel<'_>, config: &SolverConfig) -> SolverSolution {
        if model.validate().is_err() {
            return SolverSolution::empty(SolverStatus::ModelInvalid);
        }

        let start = Instant::now();
        let search = Search::new(model, config, start);
        if let Some(hint) = &model.hint {
            search.seed(hint);
        }
        search.run();
        search.into_solution(start)
    }
}

/// Static per-member bounds.
struct Prepared {
    /// `rest_gain[s]`: Σ best candidate gain over slots `s..`.
    rest_gain: Vec<f64>,
    rest_max: Vec<[f64; Attribute::COUNT]>,
    rest_min: Vec<[f64; Attribute::COUNT]>,
    /// Set tags available per slot.
    slot_tags: Vec<Vec<SetTag>>,
    /// Rune slots among `s..`.
    rune_after: Vec<usize>,
    set_objective: f64,
    set_attr: [f64; Attribute::COUNT],
    slack: f64,
    /// Every slot has at least one candidate.
    fillable: bool,
    upper: f64,
}

/// Best total value of set activations that fit in `capacity` pieces.
fn knapsack(items: &[(usize, f64)], capacity: usize) -> f64 {
    let mut dp = vec![0.0f64; capacity + 1];
    for c in 1..=capacity {
        dp[c] = dp[c - 1];
        for &(size, value) in items {
            if value > 0.0 && size <= c {
                dp[c] = dp[c].max(dp[c - size] + value);
            }
        }
    }
    dp[capacity]
}

impl Prepared {
    fn new(model: &AllocationModel<'_>, member: &ModelMember<'_>) -> Self {
        let n = member.slots.len();
        let mut rest_gain = vec![0.0; n + 1];
        let mut rest_max = vec![[0.0; Attribute::COUNT]; n + 1];
        let mut rest_min = vec![[0.0; Attribute::COUNT]; n + 1];
        let mut rune_after = vec![0; n + 1];
        let mut slot_tags = Vec::with_capacity(n);

        for s in (0..n).rev() {
            let slot = &member.slots[s];
            let best = slot
                .candidates
                .iter()
                .map(|c| c.gain)
                .fold(f64::NEG_INFINITY, f64::max);
            rest_gain[s] = rest_gain[s + 1] + if best.is_finite() { best } else { 0.0 };
            for a in 0..Attribute::COUNT {
                let hi = slot.candidates.iter().map(|c| c.delta[a]).fold(f64::NEG_INFINITY, f64::max);
                let lo = slot.candidates.iter().map(|c| c.delta[a]).fold(f64::INFINITY, f64::min);
                rest_max[s][a] = rest_max[s + 1][a] + if hi.is_finite() { hi } else { 0.0 };
                rest_min[s][a] = rest_min[s + 1][a] + if lo.is_finite() { lo } else { 0.0 };
            }
            rune_after[s] = rune_after[s + 1] + usize::from(slot.position.is_rune());
        }
        for slot in &member.slots {
            let mut tags: Vec<SetTag> = slot
                .candidates
                .iter()
                .filter_map(|c| model.pool.piece(c.piece).set)
                .collect();
            tags.sort();
            tags.dedup();
            slot_tags.push(tags);
        }

        let catalog = &model.scorer.config().sets;
        let mut set_tags: Vec<SetTag> = catalog.bonuses.iter().map(|(t, _)| *t).collect();
        set_tags.sort();
        set_tags.dedup();
        let base = &member.consumer.base;
        let mut objective_items = Vec::new();
        let mut attr_items: Vec<Vec<(usize, f64)>> = vec![Vec::new(); Attribute::COUNT];
        for tag in set_tags {
            let size = tag.size().pieces() as usize;
            let delta = model.scorer.set_delta(base, tag);
            let value: f64 = delta
                .iter()
                .zip(member.profile.attributes.iter())
                .map(|(d, w)| d * w)
                .sum();
            objective_items.push((size, value));
            for (a, items) in attr_items.iter_mut().enumerate() {
                items.push((size, delta[a]));
            }
        }
        let capacity = rune_after[0];
        let set_objective = knapsack(&objective_items, capacity);
        let mut set_attr = [0.0; Attribute::COUNT];
        for (a, items) in attr_items.iter().enumerate() {
            set_attr[a] = knapsack(items, capacity);
        }

        let slack = member.profile.truncation_slack();
        let empty_attrs = model
            .scorer
            .final_attributes(member.consumer, &[], member.leader.as_ref());
        let empty_objective = model
            .scorer
            .objective(&member.profile, member.consumer, &[], &empty_attrs);
        let fillable = member.slots.iter().all(|s| !s.candidates.is_empty());

        Self {
            upper: empty_objective + rest_gain[0] + set_objective + slack,
            rest_gain,
            rest_max,
            rest_min,
            slot_tags,
            rune_after,
            set_objective,
            set_attr,
            slack,
            fillable,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Done {
    spd: i64,
    objective: f64,
}

#[derive(Debug, Clone)]
struct State {
    used: Vec<bool>,
    chosen: Vec<Vec<PieceIdx>>,
    done: Vec<Option<Done>>,
    completed: usize,
    objective: f64,
}

#[derive(Debug, Clone)]
struct Incumbent {
    completed: usize,
    objective: f64,
    loadouts: Option<Vec<Option<Vec<PieceIdx>>>>,
}

impl Incumbent {
    fn improves(&self, completed: usize, objective: f64) -> bool {
        self.loadouts.is_none()
            || completed > self.completed
            || (completed == self.completed && objective > self.objective + EPS)
    }
}

struct Search<'m, 'a> {
    model: &'m AllocationModel<'a>,
    config: &'m SolverConfig,
    prep: Vec<Prepared>,
    /// `future_upper[m]`: Σ member bound over fillable members `m..`.
    future_upper: Vec<f64>,
    future_count: Vec<usize>,
    member_links: Vec<Vec<usize>>,
    deadline: Instant,
    incumbent: Mutex<Incumbent>,
    nodes: AtomicU64,
    halted: AtomicBool,
    timed_out: AtomicBool,
    cancelled: AtomicBool,
    stopped_first: AtomicBool,
}

impl<'m, 'a> Search<'m, 'a> {
    fn new(model: &'m AllocationModel<'a>, config: &'m SolverConfig, start: Instant) -> Self {
        let prep: Vec<Prepared> = model.members.iter().map(|m| Prepared::new(model, m)).collect();
        let k = prep.len();
        let mut future_upper = vec![0.0; k + 1];
        let mut future_count = vec![0; k + 1];
        for m in (0..k).rev() {
            let fillable = prep[m].fillable;
            future_upper[m] = future_upper[m + 1] + if fillable { prep[m].upper } else { 0.0 };
            future_count[m] = future_count[m + 1] + usize::from(fillable);
        }
        let mut member_links = vec![Vec::new(); k];
        for (i, link) in model.links.iter().enumerate() {
            member_links[link.faster].push(i);
            member_links[link.slower].push(i);
        }
        let limit = Duration::from_millis(config.time_limit_ms.max(0) as u64);

        Self {
            model,
            config,
            prep,
            future_upper,
            future_count,
            member_links,
            deadline: start + limit,
            incumbent: Mutex::new(Incumbent {
                completed: 0,
                objective: f64::NEG_INFINITY,
                loadouts: None,
            }),
            nodes: AtomicU64::new(0),
            halted: AtomicBool::new(false),
            timed_out: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            stopped_first: AtomicBool::new(false),
        }
    }

    fn root(&self) -> State {
        let k = self.model.members.len();
        State {
            used: vec![false; self.model.pool.len()],
            chosen: vec![Vec::new(); k],
            done: vec![None; k],
            completed: 0,
            objective: 0.0,
        }
    }

    /// Counts a node and reports whether the search must stop.
    fn tick(&self) -> bool {
        if self.halted.load(Ordering::Relaxed) {
            return true;
        }
        let n = self.nodes.fetch_add(1, Ordering::Relaxed);
        if n % CHECK_EVERY == 0 {
            if Instant::now() >= self.deadline {
                self.timed_out.store(true, Ordering::Relaxed);
                self.halted.store(true, Ordering::Relaxed);
                return true;
            }
            if let Some(ref flag) = self.config.cancel {
                if flag.load(Ordering::Relaxed) {
                    self.cancelled.store(true, Ordering::Relaxed);
                    self.halted.store(true, Ordering::Relaxed);
                    return true;
                }
            }
        }
        false
    }

    fn can_improve(&self, completed: usize, objective: f64) -> bool {
        self.incumbent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .improves(completed, objective)
    }

    fn pieces(&self, state: &State, m: usize) -> Vec<&'a EquipmentPiece> {
        let pool = self.model.pool;
        state.chosen[m].iter().map(|&i| pool.piece(i)).collect()
    }

    /// Member bounds plus turn-order bounds against members already decided.
    fn bounds(&self, m: usize, state: &State) -> Vec<AttributeBound> {
        let member = &self.model.members[m];
        let mut out = member.bounds.clone();
        for &li in &self.member_links[m] {
            let link = &self.model.links[li];
            let partner = if link.faster == m { link.slower } else { link.faster };
            if let Some(done) = state.done[partner] {
                if let Some(bound) = link.link.bound_for(member.consumer.id, done.spd) {
                    out.push(bound);
                }
            }
        }
        out
    }

    fn sets_possible(&self, m: usize, next: usize, counts: &[(SetTag, u8)]) -> bool {
        let member = &self.model.members[m];
        if member.set_demands.is_empty() {
            return true;
        }
        let prep = &self.prep[m];
        let have = |tag: SetTag| counts.iter().find(|(t, _)| *t == tag).map_or(0, |&(_, n)| n);
        member.set_demands.iter().any(|demand| {
            let mut total = 0usize;
            for &(tag, need) in &demand.pieces {
                let deficit = need.saturating_sub(have(tag)) as usize;
                if deficit == 0 {
                    continue;
                }
                let supply = prep.slot_tags[next..]
                    .iter()
                    .filter(|tags| tags.contains(&tag))
                    .count();
                if deficit > supply {
                    return false;
                }
                total += deficit;
            }
            total <= prep.rune_after[next]
        })
    }

    /// Whether a partially filled member (slots `..next` chosen) can still
    /// lead to an improving solution.
    fn promising(&self, m: usize, next: usize, state: &State) -> bool {
        let member = &self.model.members[m];
        let prep = &self.prep[m];
        let pieces = self.pieces(state, m);
        if !self.sets_possible(m, next, &set_counts(&pieces)) {
            return false;
        }

        let scorer = self.model.scorer;
        let attrs = scorer.final_attributes(member.consumer, &pieces, member.leader.as_ref());
        for bound in self.bounds(m, state) {
            let (lo, hi) = bound.final_limits(&member.consumer.base);
            let a = bound.attribute;
            let current = attrs[a] as f64;
            if let Some(lo) = lo {
                if current + prep.rest_max[next][a.index()] + prep.set_attr[a.index()] + 1.0 < lo as f64 {
                    return false;
                }
            }
            if let Some(hi) = hi {
                if current + prep.rest_min[next][a.index()] - 1.0 > hi as f64 {
                    return false;
                }
            }
        }

        let partial = scorer.objective(&member.profile, member.consumer, &pieces, &attrs);
        let objective_ub = state.objective
            + partial
            + prep.rest_gain[next]
            + prep.set_objective
            + prep.slack
            + self.future_upper[m + 1];
        self.can_improve(state.completed + self.future_count[m], objective_ub)
    }

    /// Evaluates a fully filled member; `None` if any constraint fails.
    fn finish(&self, m: usize, state: &State) -> Option<Done> {
        let member = &self.model.members[m];
        let pieces = self.pieces(state, m);
        if !member.set_demands.is_empty() {
            let counts = set_counts(&pieces);
            if !member.set_demands.iter().any(|d| d.is_met_by(&counts)) {
                return None;
            }
        }
        let scorer = self.model.scorer;
        let attrs = scorer.final_attributes(member.consumer, &pieces, member.leader.as_ref());
        let base = &member.consumer.base;
        if !self.bounds(m, state).iter().all(|b| b.is_satisfied(&attrs, base)) {
            return None;
        }
        Some(Done {
            spd: attrs[Attribute::Spd],
            objective: scorer.objective(&member.profile, member.consumer, &pieces, &attrs),
        })
    }

    fn offer(&self, state: &State) {
        let mut inc = self.incumbent.lock().unwrap_or_else(PoisonError::into_inner);
        if !inc.improves(state.completed, state.objective) {
            return;
        }
        inc.completed = state.completed;
        inc.objective = state.objective;
        inc.loadouts = Some(
            state
                .done
                .iter()
                .zip(&state.chosen)
                .map(|(d, c)| d.map(|_| c.clone()))
                .collect(),
        );
        if self.config.stop_after_first {
            self.stopped_first.store(true, Ordering::Relaxed);
            self.halted.store(true, Ordering::Relaxed);
        }
    }

    fn dfs(&self, m: usize, s: usize, state: &mut State) {
        if self.tick() {
            return;
        }
        if m == self.model.members.len() {
            self.offer(state);
            return;
        }
        let member = &self.model.members[m];

        if s == member.slots.len() {
            if let Some(done) = self.finish(m, state) {
                state.done[m] = Some(done);
                state.completed += 1;
                state.objective += done.objective;
                self.dfs(m + 1, 0, state);
                state.objective -= done.objective;
                state.completed -= 1;
                state.done[m] = None;
            }
            return;
        }

        if s > 0 || self.prep[m].fillable {
            for cand in &member.slots[s].candidates {
                let i = cand.piece.index();
                if state.used[i] {
                    continue;
                }
                state.used[i] = true;
                state.chosen[m].push(cand.piece);
                if self.promising(m, s + 1, state) {
                    self.dfs(m, s + 1, state);
                }
                state.chosen[m].pop();
                state.used[i] = false;
                if self.halted.load(Ordering::Relaxed) {
                    return;
                }
            }
        }

        if s == 0 && self.model.allow_incomplete {
            let bound = state.objective + self.future_upper[m + 1];
            if self.can_improve(state.completed + self.future_count[m + 1], bound) {
                self.dfs(m + 1, 0, state);
            }
        }
    }

    /// Installs a known solution as the starting incumbent if it is valid.
    fn seed(&self, hint: &[Option<Vec<PieceIdx>>]) {
        let mut state = self.root();
        for (m, entry) in hint.iter().enumerate() {
            let member = &self.model.members[m];
            let Some(pieces) = entry else {
                if !self.model.allow_incomplete {
                    return;
                }
                continue;
            };
            if pieces.len() != member.slots.len() {
                return;
            }
            for (slot, &piece) in member.slots.iter().zip(pieces) {
                let listed = slot.candidates.iter().any(|c| c.piece == piece);
                if !listed || state.used[piece.index()] {
                    return;
                }
                state.used[piece.index()] = true;
                state.chosen[m].push(piece);
            }
            let Some(done) = self.finish(m, &state) else {
                return;
            };
            state.done[m] = Some(done);
            state.completed += 1;
            state.objective += done.objective;
        }
        let mut inc = self.incumbent.lock().unwrap_or_else(PoisonError::into_inner);
        inc.completed = state.completed;
        inc.objective = state.objective;
        inc.loadouts = Some(
            state
                .done
                .iter()
                .zip(&state.chosen)
                .map(|(d, c)| d.map(|_| c.clone()))
                .collect(),
        );
    }

    fn run(&self) {
        if self.config.num_workers > 1 && self.run_parallel() {
            return;
        }
        let mut state = self.root();
        self.dfs(0, 0, &mut state);
    }

    #[cfg(feature = "parallel")]
    fn run_parallel(&self) -> bool {
        let Some(first) = self.model.members.first() else {
            return false;
        };
        if !self.prep[0].fillable && !self.model.allow_incomplete {
            return false;
        }
        let mut branches: Vec<Option<PieceIdx>> = if self.prep[0].fillable {
            first.slots[0].candidates.iter().map(|c| Some(c.piece)).collect()
        } else {
            Vec::new()
        };
        if self.model.allow_incomplete {
            branches.push(None);
        }
        let root = self.root();
        branches.par_iter().for_each(|branch| {
            let mut state = root.clone();
            match branch {
                Some(piece) => {
                    state.used[piece.index()] = true;
                    state.chosen[0].push(*piece);
                    if self.promising(0, 1, &state) {
                        self.dfs(0, 1, &mut state);
                    }
                }
                None => {
                    if self.can_improve(self.future_count[1], self.future_upper[1]) {
                        self.dfs(1, 0, &mut state);
                    }
                }
            }
        });
        true
    }

    #[cfg(not(feature = "parallel"))]
    fn run_parallel(&self) -> bool {
        false
    }

    fn into_solution(self, start: Instant) -> SolverSolution {
        let interrupted = self.timed_out.load(Ordering::Relaxed)
            || self.cancelled.load(Ordering::Relaxed)
            || self.stopped_first.load(Ordering::Relaxed);
        let timed_out = self.timed_out.load(Ordering::Relaxed);
        let cancelled = self.cancelled.load(Ordering::Relaxed);
        let nodes = self.nodes.load(Ordering::Relaxed);
        let inc = self.incumbent.into_inner().unwrap_or_else(PoisonError::into_inner);

        let (status, objective_value, loadouts) = match inc.loadouts {
            Some(loadouts) => {
                let status = if interrupted {
                    SolverStatus::Feasible
                } else {
                    SolverStatus::Optimal
                };
                (status, Some(inc.objective), loadouts)
            }
            None => {
                let status = if timed_out {
                    SolverStatus::Timeout
                } else if cancelled {
                    SolverStatus::Unknown
                } else {
                    SolverStatus::Infeasible
                };
                (status, None, Vec::new())
            }
        };

        SolverSolution {
            status,
            objective_value,
            loadouts,
            timed_out,
            nodes,
            solve_time_ms: start.elapsed().as_millis() as i64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        AttributeSet, Consumer, ConsumerId, Element, Position, SetDemand, SetTag, Stat, StatRoll,
        Substat,
    };
    use crate::ordering::OrderingLink;
    use crate::pool::{Pool, PoolSnapshot};
    use crate::scoring::{ObjectiveProfile, ObjectiveWeights, Scorer};
    use crate::solver::{Candidate, ModelLink, ModelSlot};
    use std::sync::Arc;

    fn consumer(id: u64, spd: i64) -> Consumer {
        Consumer::new(id, format!("u{}", id), Element::Fire, AttributeSet::base(10_000, 700, 600, spd))
    }

    fn rune(id: u64, slot: u8, set: SetTag, spd: i32) -> EquipmentPiece {
        EquipmentPiece::rune(id, slot, set, StatRoll::stat(Stat::HpFlat, 100))
            .with_secondary(Substat::stat(Stat::Spd, spd))
    }

    fn slot(scorer: &Scorer, snap: &PoolSnapshot, unit: &Consumer, profile: &ObjectiveProfile, position: Position) -> ModelSlot {
        let mut candidates: Vec<Candidate> = snap
            .available()
            .filter(|&i| snap.piece(i).position == position)
            .map(|i| {
                let piece = snap.piece(i);
                Candidate {
                    piece: i,
                    gain: scorer.piece_gain(profile, &unit.base, scorer.efficiency(piece), piece),
                    delta: scorer.piece_delta(&unit.base, piece),
                }
            })
            .collect();
        candidates.sort_by(|a, b| b.gain.total_cmp(&a.gain));
        ModelSlot { position, candidates }
    }

    fn member<'a>(
        scorer: &Scorer,
        snap: &PoolSnapshot,
        unit: &'a Consumer,
        positions: &[Position],
    ) -> ModelMember<'a> {
        let profile = ObjectiveProfile::new(&ObjectiveWeights::default(), |_| false);
        ModelMember {
            consumer: unit,
            leader: None,
            profile,
            slots: positions.iter().map(|&p| slot(scorer, snap, unit, &profile, p)).collect(),
            set_demands: Vec::new(),
            bounds: Vec::new(),
        }
    }

    fn ids(snap: &PoolSnapshot, pieces: &[PieceIdx]) -> Vec<u64> {
        pieces.iter().map(|&i| snap.piece(i).id.0).collect()
    }

    #[test]
    fn test_single_member_takes_best_pieces() {
        let scorer = Scorer::default();
        let pool = Pool::new(vec![
            rune(1, 1, SetTag::Energy, 5),
            rune(2, 1, SetTag::Energy, 15),
            rune(3, 2, SetTag::Energy, 9),
        ])
        .unwrap();
        let snap = pool.snapshot();
        let unit = consumer(1, 100);
        let mut model = AllocationModel::new("single", &scorer, &snap);
        model.add_member(member(&scorer, &snap, &unit, &[Position::Rune(1), Position::Rune(2)]));

        let sol = BranchAndBoundSolver.solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Optimal);
        let chosen = sol.loadouts[0].as_ref().unwrap();
        assert_eq!(ids(&snap, chosen), vec![2, 3]);
    }

    #[test]
    fn test_joint_optimum_beats_sequential_choice() {
        // Member 0 barely prefers piece 2 over 1; member 1 can only use 2.
        let scorer = Scorer::default();
        let mut pieces = vec![rune(1, 1, SetTag::Energy, 10), rune(2, 1, SetTag::Swift, 11)];
        pieces.push(rune(3, 2, SetTag::Energy, 1));
        let pool = Pool::new(pieces).unwrap();
        let snap = pool.snapshot();
        let a = consumer(1, 100);
        let b = consumer(2, 100);

        let mut model = AllocationModel::new("joint", &scorer, &snap);
        model.add_member(member(&scorer, &snap, &a, &[Position::Rune(1)]));
        let mut mb = member(&scorer, &snap, &b, &[Position::Rune(1)]);
        mb.set_demands = vec![SetDemand {
            pieces: vec![(SetTag::Swift, 1)],
        }];
        model.add_member(mb);

        let sol = BranchAndBoundSolver.solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::Optimal);
        assert_eq!(sol.completed(), 2);
        assert_eq!(ids(&snap, sol.loadouts[0].as_ref().unwrap()), vec![1]);
        assert_eq!(ids(&snap, sol.loadouts[1].as_ref().unwrap()), vec![2]);
    }

    #[test]
    fn test_floor_forces_lower_gain_piece() {
        let scorer = Scorer::default();
        let fast = rune(1, 1, SetTag::Energy, 20);
        let strong = EquipmentPiece::rune(2, 1, SetTag::Energy, StatRoll::stat(Stat::HpFlat, 100))
            .with_secondary(Substat::stat(Stat::CritDmg, 60));
        let pool = Pool::new(vec![fast, strong]).unwrap();
        let snap = pool.snapshot();
        let unit = consumer(1, 100);
        let mut model = AllocationModel::new("floor", &scorer, &snap);
        let mut m = member(&scorer, &snap, &unit, &[Position::Rune(1)]);
        assert_eq!(snap.piece(m.slots[0].candidates[0].piece).id.0, 2);
        m.bounds.push(AttributeBound::at_least(Attribute::Spd, 115));
        model.add_member(m);

        let sol = BranchAndBoundSolver.solve(&model, &SolverConfig::default());
        assert_eq!(ids(&snap, sol.loadouts[0].as_ref().unwrap()), vec![1]);
    }

    #[test]
    fn test_ordering_link_is_enforced() {
        let scorer = Scorer::default();
        let pool = Pool::new(vec![rune(1, 1, SetTag::Energy, 30), rune(2, 1, SetTag::Energy, 5)]).unwrap();
        let snap = pool.snapshot();
        let a = consumer(1, 100);
        let b = consumer(2, 110);
        let mut model = AllocationModel::new("order", &scorer, &snap);
        model.add_member(member(&scorer, &snap, &a, &[Position::Rune(1)]));
        model.add_member(member(&scorer, &snap, &b, &[Position::Rune(1)]));
        model.add_link(ModelLink {
            faster: 0,
            slower: 1,
            link: OrderingLink {
                team: 0,
                faster: ConsumerId(1),
                slower: ConsumerId(2),
                faster_offset: 0,
                slower_offset: 0,
            },
        });

        let sol = BranchAndBoundSolver.solve(&model, &SolverConfig::default());
        assert_eq!(sol.completed(), 2);
        // a: 100 + 30 = 130 > b: 110 + 5 = 115
        assert_eq!(ids(&snap, sol.loadouts[0].as_ref().unwrap()), vec![1]);
    }

    #[test]
    fn test_incomplete_members_are_left_out_when_allowed() {
        let scorer = Scorer::default();
        let pool = Pool::new(vec![rune(1, 1, SetTag::Energy, 10)]).unwrap();
        let snap = pool.snapshot();
        let a = consumer(1, 100);
        let b = consumer(2, 100);

        let build = |allow: bool| {
            let mut model = AllocationModel::new("scarce", &scorer, &snap).with_incomplete(allow);
            model.add_member(member(&scorer, &snap, &a, &[Position::Rune(1)]));
            model.add_member(member(&scorer, &snap, &b, &[Position::Rune(1)]));
            model
        };

        let strict = BranchAndBoundSolver.solve(&build(false), &SolverConfig::default());
        assert_eq!(strict.status, SolverStatus::Infeasible);

        let relaxed = BranchAndBoundSolver.solve(&build(true), &SolverConfig::default());
        assert_eq!(relaxed.status, SolverStatus::Optimal);
        assert_eq!(relaxed.completed(), 1);
    }

    #[test]
    fn test_stop_after_first_reports_feasible() {
        let scorer = Scorer::default();
        let pool = Pool::new(vec![rune(1, 1, SetTag::Energy, 10), rune(2, 1, SetTag::Energy, 3)]).unwrap();
        let snap = pool.snapshot();
        let unit = consumer(1, 100);
        let mut model = AllocationModel::new("first", &scorer, &snap);
        model.add_member(member(&scorer, &snap, &unit, &[Position::Rune(1)]));

        let config = SolverConfig::default().with_stop_after_first(true);
        let sol = BranchAndBoundSolver.solve(&model, &config);
        assert_eq!(sol.status, SolverStatus::Feasible);
        assert_eq!(ids(&snap, sol.loadouts[0].as_ref().unwrap()), vec![1]);
    }

    #[test]
    fn test_cancelled_search_keeps_hint() {
        let scorer = Scorer::default();
        let pool = Pool::new(vec![rune(1, 1, SetTag::Energy, 10), rune(2, 1, SetTag::Energy, 3)]).unwrap();
        let snap = pool.snapshot();
        let unit = consumer(1, 100);
        let second = snap.lookup(crate::model::PieceId(2)).unwrap();
        let mut model = AllocationModel::new("hinted", &scorer, &snap);
        model.add_member(member(&scorer, &snap, &unit, &[Position::Rune(1)]));
        let model = model.with_hint(vec![Some(vec![second])]);

        let cancel = Arc::new(AtomicBool::new(true));
        let config = SolverConfig::default().with_cancel(Some(cancel));
        let sol = BranchAndBoundSolver.solve(&model, &config);
        assert_eq!(sol.status, SolverStatus::Feasible);
        assert_eq!(ids(&snap, sol.loadouts[0].as_ref().unwrap()), vec![2]);
    }

    #[test]
    fn test_invalid_model() {
        let scorer = Scorer::default();
        let pool = Pool::new(vec![rune(1, 1, SetTag::Energy, 10)]).unwrap();
        let snap = pool.snapshot();
        let unit = consumer(1, 100);
        let mut model = AllocationModel::new("bad", &scorer, &snap);
        model.add_member(member(&scorer, &snap, &unit, &[Position::Rune(1)]));
        model.add_link(ModelLink {
            faster: 0,
            slower: 3,
            link: OrderingLink {
                team: 0,
                faster: ConsumerId(1),
                slower: ConsumerId(9),
                faster_offset: 0,
                slower_offset: 0,
            },
        });
        let sol = BranchAndBoundSolver.solve(&model, &SolverConfig::default());
        assert_eq!(sol.status, SolverStatus::ModelInvalid);
    }

    #[test]
    fn test_knapsack_fills_capacity() {
        assert_eq!(knapsack(&[(4, 25.0), (2, 10.0)], 6), 35.0);
        assert_eq!(knapsack(&[(2, 10.0)], 6), 30.0);
        assert_eq!(knapsack(&[(4, -5.0)], 6), 0.0);
    }
}
