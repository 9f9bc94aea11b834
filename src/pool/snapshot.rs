//! Immutable view of a pool taken at the start of a parallel phase.

use std::collections::HashMap;
use std::sync::Arc;

use crate::model::{EquipmentPiece, PieceId};

use super::inventory::{PieceIdx, Pool};

/// Shares piece storage with the pool it was taken from. Cheap to clone and
/// safe to read from many threads.
#[derive(Debug, Clone)]
pub struct PoolSnapshot {
    pieces: Arc<[EquipmentPiece]>,
    by_id: Arc<HashMap<PieceId, PieceIdx>>,
    available: Arc<[bool]>,
}

impl PoolSnapshot {
    pub(crate) fn new(
        pieces: Arc<[EquipmentPiece]>,
        by_id: Arc<HashMap<PieceId, PieceIdx>>,
        available: Arc<[bool]>,
    ) -> Self {
        Self {
            pieces,
            by_id,
            available,
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

    pub fn is_available(&self, idx: PieceIdx) -> bool {
        self.available[idx.index()]
    }

    pub fn available(&self) -> impl Iterator<Item = PieceIdx> + '_ {
        (0..self.pieces.len() as u32)
            .map(PieceIdx)
            .filter(|&i| self.is_available(i))
    }

    pub fn lookup(&self, id: PieceId) -> Option<PieceIdx> {
        self.by_id.get(&id).copied()
    }

    /// A private pool where everything unavailable in the snapshot stays
    /// unavailable. Commits there never reach the live pool.
    pub fn sandbox(&self) -> Pool {
        Pool::from_parts(self.pieces.clone(), self.by_id.clone(), &self.available)
    }
}
