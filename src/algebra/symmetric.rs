use crate::algebra::{FloatT, SparseFormatError};

/// Symmetric sparse matrix in coordinate form, storing only the upper
/// triangle, plus a resettable *regularization tail*.
///
/// The structural entries are appended in a caller-controlled order, so two
/// assemblies that insert the same pattern produce the same layout and the
/// linear solver's symbolic analysis can be reused.  The tail holds one
/// diagonal value per matrix row; writing the tail never touches the
/// structural part, which makes inertia-correction retries cheap.
#[derive(Debug, Clone)]
pub struct SymmetricMatrix<T = f64> {
    dimension: usize,
    rows: Vec<usize>,
    cols: Vec<usize>,
    values: Vec<T>,
    regularization: Vec<T>,
}

impl<T> SymmetricMatrix<T>
where
    T: FloatT,
{
    pub fn new(dimension: usize, capacity: usize) -> Self {
        Self {
            dimension,
            rows: Vec::with_capacity(capacity),
            cols: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
            regularization: vec![T::zero(); dimension],
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn number_nonzeros(&self) -> usize {
        self.values.len()
    }

    /// Clear the structural entries (capacity retained) and the tail.
    pub fn reset(&mut self) {
        self.rows.clear();
        self.cols.clear();
        self.values.clear();
        self.regularization.iter_mut().for_each(|v| *v = T::zero());
    }

    /// Insert an upper-triangle entry.  Duplicates accumulate at assembly.
    pub fn insert(&mut self, row: usize, col: usize, value: T) {
        debug_assert!(row <= col && col < self.dimension);
        self.rows.push(row);
        self.cols.push(col);
        self.values.push(value);
    }

    /// Check that all structural entries lie in the upper triangle.
    pub fn check_format(&self) -> Result<(), SparseFormatError> {
        for (&i, &j) in self.rows.iter().zip(self.cols.iter()) {
            if i > j {
                return Err(SparseFormatError::NotUpperTriangular);
            }
            if j >= self.dimension {
                return Err(SparseFormatError::IncompatibleDimension);
            }
        }
        Ok(())
    }

    /// Iterate the structural entries as (row, col, value).
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, T)> + '_ {
        self.rows
            .iter()
            .zip(self.cols.iter())
            .zip(self.values.iter())
            .map(|((&i, &j), &v)| (i, j, v))
    }

    /// Write `primal_regularization` into the first `primal_size` tail
    /// entries and `-dual_regularization` into the next `dual_size` ones.
    pub fn set_regularization(
        &mut self,
        primal_size: usize,
        dual_size: usize,
        primal_regularization: T,
        dual_regularization: T,
    ) {
        debug_assert!(primal_size + dual_size <= self.dimension);
        for k in 0..primal_size {
            self.regularization[k] = primal_regularization;
        }
        for k in primal_size..primal_size + dual_size {
            self.regularization[k] = -dual_regularization;
        }
    }

    pub fn reset_regularization(&mut self) {
        self.regularization.iter_mut().for_each(|v| *v = T::zero());
    }

    pub fn regularization_tail(&self) -> &[T] {
        &self.regularization
    }

    /// Quadratic form xᵀMx over the structural entries and the tail.  The
    /// matrix may be sized for a larger variable space than `x`; entries
    /// beyond `x.len()` must be absent and tail values there are ignored.
    pub fn quadratic_product(&self, x: &[T]) -> T {
        let two: T = T::one() + T::one();
        let mut product = T::zero();
        for (i, j, v) in self.iter() {
            if i == j {
                product += v * x[i] * x[i];
            } else {
                product += two * v * x[i] * x[j];
            }
        }
        for (k, &delta) in self.regularization.iter().take(x.len()).enumerate() {
            product += delta * x[k] * x[k];
        }
        product
    }

    /// Matrix-vector product y += M x with M treated as symmetric.
    pub fn symmetric_product(&self, x: &[T], y: &mut [T]) {
        for (i, j, v) in self.iter() {
            y[i] += v * x[j];
            if i != j {
                y[j] += v * x[i];
            }
        }
        for (k, &delta) in self.regularization.iter().take(x.len()).enumerate() {
            y[k] += delta * x[k];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_reset_preserves_structure() {
        let mut m = SymmetricMatrix::<f64>::new(3, 4);
        m.insert(0, 0, 2.0);
        m.insert(0, 1, 1.0);
        m.set_regularization(2, 1, 0.5, 0.25);
        assert_eq!(m.regularization_tail(), &[0.5, 0.5, -0.25]);

        m.reset_regularization();
        assert_eq!(m.regularization_tail(), &[0.0, 0.0, 0.0]);
        assert_eq!(m.number_nonzeros(), 2);
    }

    #[test]
    fn test_quadratic_product_counts_off_diagonals_twice() {
        // M = [2 1; 1 0] (upper triangle stored)
        let mut m = SymmetricMatrix::<f64>::new(2, 3);
        m.insert(0, 0, 2.0);
        m.insert(0, 1, 1.0);
        let x = [1.0, 3.0];
        // xᵀMx = 2*1 + 2*1*1*3 = 8
        assert_eq!(m.quadratic_product(&x), 8.0);
    }
}
