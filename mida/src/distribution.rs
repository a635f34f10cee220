/*! Dense scenario-by-mass-bin probability matrices and their convolution */
use std::fmt::Display;

use crate::error::MidaError;

/// A row-major matrix of probabilities with one row per abundance scenario.
///
/// For mass isotopomer distributions, column `i` holds the abundance of the `M+i`
/// isotopomer. The same layout is used for per-combo abundances, where each column
/// is one isotope-count combination.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Distribution {
    rows: usize,
    bins: usize,
    data: Vec<f64>,
}

impl Distribution {
    pub fn zeros(rows: usize, bins: usize) -> Self {
        Self {
            rows,
            bins,
            data: vec![0.0; rows * bins],
        }
    }

    /// The distribution of an empty group, all probability in the `M+0` bin
    pub fn delta() -> Self {
        Self {
            rows: 1,
            bins: 1,
            data: vec![1.0],
        }
    }

    pub fn new(rows: usize, bins: usize, data: Vec<f64>) -> Result<Self, MidaError> {
        if data.len() != rows * bins {
            return Err(MidaError::ShapeMismatch {
                what: "matrix entries",
                expected: rows * bins,
                found: data.len(),
            });
        }
        Ok(Self { rows, bins, data })
    }

    /// Build a matrix from equal-length rows
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, MidaError> {
        let bins = rows.first().map(|r| r.as_ref().len()).unwrap_or_default();
        let mut data = Vec::with_capacity(rows.len() * bins);
        for row in rows {
            let row = row.as_ref();
            if row.len() != bins {
                return Err(MidaError::ShapeMismatch {
                    what: "bins per row",
                    expected: bins,
                    found: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            rows: rows.len(),
            bins,
            data,
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn bins(&self) -> usize {
        self.bins
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.bins)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn row(&self, index: usize) -> &[f64] {
        let start = index * self.bins;
        &self.data[start..start + self.bins]
    }

    #[inline]
    pub fn row_mut(&mut self, index: usize) -> &mut [f64] {
        let start = index * self.bins;
        &mut self.data[start..start + self.bins]
    }

    /// Get a row, treating a single-row matrix as if it were repeated for every scenario
    #[inline]
    pub fn broadcast_row(&self, index: usize) -> &[f64] {
        if self.rows == 1 {
            self.row(0)
        } else {
            self.row(index)
        }
    }

    #[inline]
    pub fn get(&self, row: usize, bin: usize) -> Option<f64> {
        if row < self.rows && bin < self.bins {
            Some(self.data[row * self.bins + bin])
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[f64]> + '_ {
        (0..self.rows).map(move |i| self.row(i))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// The sum of each row
    pub fn totals(&self) -> Vec<f64> {
        self.iter().map(|r| r.iter().sum()).collect()
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.iter().map(|r| r.to_vec()).collect()
    }

    /// The number of rows two matrices broadcast to
    pub fn broadcast_rows(&self, other: &Self) -> Result<usize, MidaError> {
        broadcast_scenarios(self.rows, other.rows)
    }

    /// Combine two independent distributions into the distribution of their summed mass
    /// shift, keeping at most `max_bins` bins.
    ///
    /// Only the first `max_bins` bins of `other` are read and the result holds
    /// `min(max_bins, self.bins() + other_bins - 1)` bins, so probability mass past the
    /// last bin is dropped rather than redistributed.
    pub fn convolve(&self, other: &Self, max_bins: usize) -> Result<Self, MidaError> {
        let rows = self.broadcast_rows(other)?;
        let total_size = self.bins;
        let dist_size = max_bins.min(other.bins);
        if total_size == 0 || dist_size == 0 {
            return Ok(Self::zeros(rows, 0));
        }
        let new_size = max_bins.min(total_size + dist_size - 1);

        let mut combined = Self::zeros(rows, new_size);
        for r in 0..rows {
            let left = self.broadcast_row(r);
            let right = other.broadcast_row(r);
            let out = combined.row_mut(r);
            for (i, a) in left.iter().enumerate() {
                for (j, b) in right.iter().take(dist_size).enumerate() {
                    let mass = i + j;
                    if mass < new_size {
                        out[mass] += a * b;
                    } else {
                        break;
                    }
                }
            }
        }
        Ok(combined)
    }
}

impl Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, row) in self.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for (j, v) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, "\t")?;
                }
                write!(f, "{v:.6}")?;
            }
        }
        Ok(())
    }
}

/// Resolve the number of scenarios two scenario counts broadcast to. A count of one
/// broadcasts to any other count.
pub fn broadcast_scenarios(left: usize, right: usize) -> Result<usize, MidaError> {
    if left == right || right == 1 {
        Ok(left)
    } else if left == 1 {
        Ok(right)
    } else {
        Err(MidaError::ScenarioMismatch { left, right })
    }
}
