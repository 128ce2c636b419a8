use super::FloatT;
use std::iter::zip;

/// Sparse vector as an index → value mapping with insertion-order iteration.
///
/// Used for objective gradients and constraint Jacobian rows.  Duplicate
/// indices are allowed and accumulate: views of a problem (barrier terms,
/// elastic contributions) append their entries after the model's without
/// rewriting them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector<T = f64> {
    indices: Vec<usize>,
    values: Vec<T>,
}

impl<T> SparseVector<T>
where
    T: FloatT,
{
    pub fn new() -> Self {
        Self {
            indices: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn clear(&mut self) {
        self.indices.clear();
        self.values.clear();
    }

    /// Append an entry.  No dedup: repeated indices accumulate.
    pub fn insert(&mut self, index: usize, value: T) {
        self.indices.push(index);
        self.values.push(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, T)> + '_ {
        zip(&self.indices, &self.values).map(|(&i, &v)| (i, v))
    }

    /// Scale all values in place.
    pub fn scale(&mut self, factor: T) {
        for v in &mut self.values {
            *v *= factor;
        }
    }

    pub fn copy_from(&mut self, src: &SparseVector<T>) {
        self.indices.clear();
        self.values.clear();
        self.indices.extend_from_slice(&src.indices);
        self.values.extend_from_slice(&src.values);
    }

    /// Dot product against a dense vector.
    pub fn dot_dense(&self, x: &[T]) -> T {
        self.iter()
            .fold(T::zero(), |acc, (i, v)| acc + v * x[i])
    }

    /// Scatter-accumulate into a dense vector: `out[i] += scale * v_i`.
    pub fn add_to_dense(&self, scale: T, out: &mut [T]) {
        for (i, v) in self.iter() {
            out[i] += scale * v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_accumulate() {
        let mut g = SparseVector::<f64>::new();
        g.insert(0, 1.0);
        g.insert(2, 3.0);
        g.insert(0, 0.5);

        let x = [2.0, 10.0, 1.0];
        assert_eq!(g.dot_dense(&x), 2.0 + 3.0 + 1.0);

        let mut dense = [0.0; 3];
        g.add_to_dense(1.0, &mut dense);
        assert_eq!(dense, [1.5, 0.0, 3.0]);
    }

    #[test]
    fn test_insertion_order_iteration() {
        let mut g = SparseVector::<f64>::new();
        g.insert(3, 1.0);
        g.insert(1, 2.0);
        let pairs: Vec<_> = g.iter().collect();
        assert_eq!(pairs, vec![(3, 1.0), (1, 2.0)]);
    }
}
