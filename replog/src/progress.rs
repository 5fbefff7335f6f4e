//! Progress tracks replication state: a map of participant id to the highest
//! log index that participant has acknowledged.
//!
//! Acknowledged indices are monotonically incremental; decreasing one is not
//! allowed. The committed-index calculation relies on this.

use std::fmt::Debug;

use crate::quorum::QuorumSet;

/// Track progress of several incremental values.
///
/// It calculates the committed value through a `QuorumSet` when one of the
/// values is updated.
pub(crate) trait Progress<ID, V, QS>
where
    ID: 'static,
    QS: QuorumSet<ID>,
{
    /// Update one of the scalar values and re-calculate the committed value.
    fn update(&mut self, id: &ID, value: V) -> &V;

    /// Get the value by `id`.
    fn get(&self, id: &ID) -> &V;

    /// Get the currently committed value.
    fn committed(&self) -> &V;
}

/// A [`Progress`] implementation with a vector as storage.
///
/// Suitable for a small participant set.
#[derive(Debug)]
pub(crate) struct VecProgress<ID, V, QS>
where
    ID: 'static,
    QS: QuorumSet<ID>,
{
    /// Quorum set determining when a set of acknowledgers commits a value.
    quorum_set: QS,

    /// Currently committed value.
    committed: V,

    /// Progress data.
    ///
    /// Elements with values greater than `committed` are sorted in
    /// descending order; the rest are unsorted.
    vector: Vec<(ID, V)>,
}

impl<ID, V, QS> VecProgress<ID, V, QS>
where
    ID: PartialEq + Copy + Debug + 'static,
    V: PartialOrd + Ord + Copy + Default + 'static,
    QS: QuorumSet<ID>,
{
    pub(crate) fn new<'i>(ids: impl Iterator<Item = &'i ID>, quorum_set: QS) -> Self {
        let vector = ids.map(|id| (*id, V::default())).collect();

        Self {
            quorum_set,
            committed: V::default(),
            vector,
        }
    }

    /// Find the position of the specified id.
    #[inline(always)]
    fn index(&self, target: &ID) -> usize {
        for (i, elt) in self.vector.iter().enumerate() {
            if elt.0 == *target {
                return i;
            }
        }

        unreachable!("{:?} not found", target)
    }

    /// Move the element at `index` up so that all the values greater than
    /// `committed` stay sorted.
    #[inline(always)]
    fn move_up(&mut self, index: usize) -> usize {
        for i in (0..index).rev() {
            if self.vector[i].1 < self.vector[i + 1].1 {
                self.vector.swap(i, i + 1);
            } else {
                return i + 1;
            }
        }

        0
    }

    /// Ids of every participant whose acknowledged value is at or above the
    /// committed value: the membership reported for a resolved quorum.
    pub(crate) fn granted(&self) -> Vec<ID> {
        self.vector.iter().filter(|(_, v)| *v >= self.committed).map(|(id, _)| *id).collect()
    }
}

impl<ID, V, QS> Progress<ID, V, QS> for VecProgress<ID, V, QS>
where
    ID: PartialEq + Debug + Copy + 'static,
    V: PartialOrd + Ord + Copy + Default + 'static,
    QS: QuorumSet<ID> + 'static,
{
    /// Update one of the scalar values and re-calculate the committed value.
    ///
    /// Re-updating with the same or a smaller value does nothing: the same
    /// acknowledged index arrives again with every heartbeat reply.
    ///
    /// # Algorithm
    ///
    /// Only when the **previous value** is less than or equal to the
    /// committed value and the **new value** is greater than it can the
    /// committed value change. This skips needless re-calculation and keeps
    /// sorting confined to values above the committed one.
    fn update(&mut self, id: &ID, value: V) -> &V {
        let index = self.index(id);
        let elt = &mut self.vector[index];
        let prev = elt.1;

        if value <= prev {
            return &self.committed;
        }

        elt.1 = value;

        if prev <= self.committed && self.committed < value {
            let new_index = self.move_up(index);

            // From high to low, find the max value that has constituted a quorum.
            for i in new_index..self.vector.len() {
                // No need to re-calculate already committed value.
                if self.vector[i].1 <= self.committed {
                    break;
                }

                // Ids of the participants that have acknowledged a value GE `vector[i]`.
                let it = self.vector[0..=i].iter().map(|x| &x.0);

                if self.quorum_set.is_quorum(it) {
                    self.committed = self.vector[i].1;
                    break;
                }
            }
        }

        &self.committed
    }

    fn get(&self, id: &ID) -> &V {
        let index = self.index(id);
        &self.vector[index].1
    }

    fn committed(&self) -> &V {
        &self.committed
    }
}
