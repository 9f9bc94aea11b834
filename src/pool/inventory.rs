//! Index-addressed working set of equipment for one run.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AllocError, Result};
use crate::model::{ConsumerId, EquipmentPiece, PieceId, Position, SetTag};
use crate::scoring::Scorer;

use super::snapshot::PoolSnapshot;

/// Handle to a piece inside one [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceIdx(pub(crate) u32);

impl PieceIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The shared inventory.
///
/// Pieces are stored once behind an `Arc`; only the owner table changes as
/// pieces are committed and released. A piece is available when it is
/// neither owned nor excluded.
#[derive(Debug, Clone)]
pub struct Pool {
    pieces: Arc<[EquipmentPiece]>,
    by_id: Arc<HashMap<PieceId, PieceIdx>>,
    owners: Vec<Option<ConsumerId>>,
    excluded: Vec<bool>,
}

impl Pool {
    /// Builds a pool; piece ids must be unique.
    pub fn new(pieces: Vec<EquipmentPiece>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(pieces.len());
        for (i, piece) in pieces.iter().enumerate() {
            if by_id.insert(piece.id, PieceIdx(i as u32)).is_some() {
                return Err(AllocError::DuplicatePiece(piece.id));
            }
        }
        let n = pieces.len();
        Ok(Self {
            pieces: pieces.into(),
            by_id: Arc::new(by_id),
            owners: vec![None; n],
            excluded: vec![false; n],
        })
    }

    pub(crate) fn from_parts(
        pieces: Arc<[EquipmentPiece]>,
        by_id: Arc<HashMap<PieceId, PieceIdx>>,
        available: &[bool],
    ) -> Self {
        Self {
            owners: vec![None; pieces.len()],
            excluded: available.iter().map(|a| !a).collect(),
            pieces,
            by_id,
        }
    }

    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    pub fn piece(&self, idx: PieceIdx) -> &EquipmentPiece {
        &self.pieces[idx.index()]
    }

    pub fn pieces(&self) -> &[EquipmentPiece] {
        &self.pieces
    }

    pub fn indices(&self) -> impl Iterator<Item = PieceIdx> {
        (0..self.pieces.len() as u32).map(PieceIdx)
    }

    pub fn lookup(&self, id: PieceId) -> Option<PieceIdx> {
        self.by_id.get(&id).copied()
    }

    pub fn owner(&self, idx: PieceIdx) -> Option<ConsumerId> {
        self.owners[idx.index()]
    }

    pub fn is_excluded(&self, idx: PieceIdx) -> bool {
        self.excluded[idx.index()]
    }

    pub fn is_available(&self, idx: PieceIdx) -> bool {
        let i = idx.index();
        self.owners[i].is_none() && !self.excluded[i]
    }

    pub fn available(&self) -> impl Iterator<Item = PieceIdx> + '_ {
        self.indices().filter(|&i| self.is_available(i))
    }

    pub fn available_count(&self) -> usize {
        self.available().count()
    }

    /// Available pieces that fit a position.
    pub fn available_at(&self, position: Position) -> impl Iterator<Item = PieceIdx> + '_ {
        self.available()
            .filter(move |&i| self.piece(i).position == position)
    }

    /// Pieces currently committed, with their owner.
    pub fn committed(&self) -> impl Iterator<Item = (PieceIdx, ConsumerId)> + '_ {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(i, o)| o.map(|c| (PieceIdx(i as u32), c)))
    }

    /// Commits a piece to one consumer.
    pub fn commit(&mut self, idx: PieceIdx, consumer: ConsumerId) -> Result<()> {
        let i = idx.index();
        if let Some(owner) = self.owners[i] {
            return Err(AllocError::InvariantViolation(format!(
                "piece {} committed to {} while owned by {}",
                self.pieces[i].id, consumer, owner
            )));
        }
        if self.excluded[i] {
            return Err(AllocError::InvariantViolation(format!(
                "piece {} committed to {} while excluded",
                self.pieces[i].id, consumer
            )));
        }
        self.owners[i] = Some(consumer);
        Ok(())
    }

    /// Returns a piece to the pool. The caller must be its owner.
    pub fn release(&mut self, idx: PieceIdx, consumer: ConsumerId) -> Result<()> {
        let i = idx.index();
        if self.owners[i] != Some(consumer) {
            return Err(AllocError::InvariantViolation(format!(
                "piece {} released by {} but owned by {:?}",
                self.pieces[i].id, consumer, self.owners[i]
            )));
        }
        self.owners[i] = None;
        Ok(())
    }

    /// Takes pieces out of consideration for this run. Unknown ids are
    /// ignored; returns how many were newly excluded.
    pub fn exclude(&mut self, ids: &[PieceId]) -> usize {
        let mut n = 0;
        for id in ids {
            if let Some(idx) = self.lookup(*id) {
                let flag = &mut self.excluded[idx.index()];
                if !*flag && self.owners[idx.index()].is_none() {
                    *flag = true;
                    n += 1;
                }
            }
        }
        n
    }

    /// Keeps only the `per_set` most efficient available runes for every
    /// (set, slot) pair. Artifacts and pieces listed in `keep` are never
    /// pruned. Returns how many pieces were excluded.
    pub fn prune_top_per_set(&mut self, per_set: usize, scorer: &Scorer, keep: &[PieceId]) -> usize {
        let mut groups: HashMap<(SetTag, Position), Vec<(f64, PieceIdx)>> = HashMap::new();
        for idx in self.available().collect::<Vec<_>>() {
            let piece = self.piece(idx);
            if keep.contains(&piece.id) {
                continue;
            }
            if let Some(set) = piece.set {
                groups
                    .entry((set, piece.position))
                    .or_default()
                    .push((scorer.efficiency(piece), idx));
            }
        }

        let mut pruned = 0;
        for (_, mut members) in groups {
            if members.len() <= per_set {
                continue;
            }
            members.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
            for &(_, idx) in &members[per_set..] {
                self.excluded[idx.index()] = true;
                pruned += 1;
            }
        }
        pruned
    }

    /// Read-only view of the current availability, for parallel phases.
    pub fn snapshot(&self) -> PoolSnapshot {
        let available: Vec<bool> = self.indices().map(|i| self.is_available(i)).collect();
        PoolSnapshot::new(self.pieces.clone(), self.by_id.clone(), available.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Stat, StatRoll, Substat};
    use crate::scoring::ScoringConfig;

    fn rune(id: u64, slot: u8, set: SetTag, spd: i32) -> EquipmentPiece {
        EquipmentPiece::rune(id, slot, set, StatRoll::stat(Stat::AtkFlat, 100))
            .with_secondary(Substat::stat(Stat::Spd, spd))
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Pool::new(vec![rune(1, 1, SetTag::Swift, 5), rune(1, 2, SetTag::Swift, 5)]);
        assert!(matches!(result, Err(AllocError::DuplicatePiece(PieceId(1)))));
    }

    #[test]
    fn test_commit_twice_is_invariant_violation() {
        let mut pool = Pool::new(vec![rune(1, 1, SetTag::Swift, 5)]).unwrap();
        let idx = pool.lookup(PieceId(1)).unwrap();
        pool.commit(idx, ConsumerId(7)).unwrap();
        assert!(!pool.is_available(idx));
        let err = pool.commit(idx, ConsumerId(8)).unwrap_err();
        assert!(matches!(err, AllocError::InvariantViolation(_)));
        assert!(pool.release(idx, ConsumerId(8)).is_err());
        pool.release(idx, ConsumerId(7)).unwrap();
        assert!(pool.is_available(idx));
    }

    #[test]
    fn test_exclude_and_availability() {
        let mut pool = Pool::new(vec![
            rune(1, 1, SetTag::Swift, 5),
            rune(2, 1, SetTag::Swift, 6),
            rune(3, 2, SetTag::Will, 7),
        ])
        .unwrap();
        assert_eq!(pool.exclude(&[PieceId(2), PieceId(99)]), 1);
        assert_eq!(pool.available_count(), 2);
        assert_eq!(pool.available_at(Position::Rune(1)).count(), 1);
        let idx = pool.lookup(PieceId(2)).unwrap();
        assert!(pool.commit(idx, ConsumerId(1)).is_err());
    }

    #[test]
    fn test_prune_keeps_best_per_set_and_slot() {
        let mut pool = Pool::new(vec![
            rune(1, 1, SetTag::Swift, 5),
            rune(2, 1, SetTag::Swift, 20),
            rune(3, 1, SetTag::Swift, 12),
            rune(4, 1, SetTag::Will, 1),
        ])
        .unwrap();
        let scorer = Scorer::new(ScoringConfig::default());
        let pruned = pool.prune_top_per_set(1, &scorer, &[PieceId(1)]);
        assert_eq!(pruned, 1);
        assert!(pool.is_available(pool.lookup(PieceId(1)).unwrap()));
        assert!(pool.is_available(pool.lookup(PieceId(2)).unwrap()));
        assert!(!pool.is_available(pool.lookup(PieceId(3)).unwrap()));
        assert!(pool.is_available(pool.lookup(PieceId(4)).unwrap()));
    }

    #[test]
    fn test_snapshot_sandbox_is_independent() {
        let mut pool = Pool::new(vec![rune(1, 1, SetTag::Swift, 5), rune(2, 2, SetTag::Swift, 5)]).unwrap();
        let first = pool.lookup(PieceId(1)).unwrap();
        pool.commit(first, ConsumerId(1)).unwrap();

        let snapshot = pool.snapshot();
        assert!(!snapshot.is_available(first));
        let mut sandbox = snapshot.sandbox();
        let second = sandbox.lookup(PieceId(2)).unwrap();
        sandbox.commit(second, ConsumerId(2)).unwrap();
        assert!(sandbox.commit(first, ConsumerId(2)).is_err());
        assert!(pool.is_available(second));
    }
}
