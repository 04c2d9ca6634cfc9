//! Triangular pairwise visibility storage.
//!
//! Each unordered pair `(lo, hi)` with `lo < hi` lives exactly once, in row
//! `lo` at offset `hi - lo - 1`. For N entities there are N-1 rows, row `r`
//! holding N-1-r slots, N(N-1)/2 slots in total.

use super::{LosError, Visibility};

#[derive(Debug, Default)]
pub struct VisibilityMatrix {
    rows: Vec<Box<[Visibility]>>,
    entity_count: usize,
}

impl VisibilityMatrix {
    /// Allocate an all-stale matrix for `entity_count` entities.
    pub fn with_entities(entity_count: usize) -> Self {
        let rows = (0..entity_count.saturating_sub(1))
            .map(|r| vec![Visibility::Stale; entity_count - 1 - r].into_boxed_slice())
            .collect();
        Self { rows, entity_count }
    }

    #[inline]
    pub fn entity_count(&self) -> usize {
        self.entity_count
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row_len(&self, row: usize) -> Option<usize> {
        self.rows.get(row).map(|r| r.len())
    }

    pub fn slot_count(&self) -> usize {
        self.rows.iter().map(|r| r.len()).sum()
    }

    pub fn stale_count(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|r| r.iter())
            .filter(|v| v.is_stale())
            .count()
    }

    /// Row and offset for a pair, in either order.
    fn locate(&self, i: usize, j: usize) -> Result<(usize, usize), LosError> {
        for index in [i, j] {
            if index >= self.entity_count {
                return Err(LosError::IndexOutOfRange {
                    index,
                    count: self.entity_count,
                });
            }
        }
        if i == j {
            return Err(LosError::DiagonalSlot { index: i });
        }
        let (lo, hi) = if i < j { (i, j) } else { (j, i) };
        Ok((lo, hi - lo - 1))
    }

    pub fn get(&self, i: usize, j: usize) -> Result<Visibility, LosError> {
        let (row, offset) = self.locate(i, j)?;
        Ok(self.rows[row][offset])
    }

    pub fn set(&mut self, i: usize, j: usize, value: Visibility) -> Result<(), LosError> {
        let (row, offset) = self.locate(i, j)?;
        self.rows[row][offset] = value;
        Ok(())
    }

    /// Mark every pair involving `index` stale.
    ///
    /// Pairs where `index` is the higher member sit in earlier rows, so
    /// clearing its own row alone is not enough.
    pub fn invalidate(&mut self, index: usize) -> Result<(), LosError> {
        if index >= self.entity_count {
            return Err(LosError::IndexOutOfRange {
                index,
                count: self.entity_count,
            });
        }
        for (lo, row) in self.rows.iter_mut().enumerate().take(index) {
            row[index - lo - 1] = Visibility::Stale;
        }
        if let Some(own) = self.rows.get_mut(index) {
            own.fill(Visibility::Stale);
        }
        Ok(())
    }

    pub fn invalidate_all(&mut self) {
        for row in &mut self.rows {
            row.fill(Visibility::Stale);
        }
    }
}
