#![allow(non_snake_case)]

//! Sparse LDLᵀ factorization without pivoting, with the inertia read off the
//! signs of D.  The augmented systems assembled by the subproblem methods are
//! regularized until the factorization exists and the inertia is correct, so
//! the absence of pivoting is an invariant of the calling code, not a leap of
//! faith here.  A tiny or vanishing pivot is reported as singularity rather
//! than an error: the regularization strategy treats it as a retry signal.

use super::{Inertia, LinearSolver, LinearSolverError};
use crate::algebra::{CscMatrix, FloatT, SymmetricMatrix};
use std::cmp::{max, min};
use std::iter::zip;

const UNKNOWN: usize = usize::MAX;

pub struct InertiaLdl<T = f64> {
    // assembled (unpermuted) upper-triangle pattern with every diagonal
    // position present
    A: CscMatrix<T>,
    // COO structural entry -> slot of A
    coo_map: Vec<usize>,
    // diagonal index -> slot of A (regularization tail lands here)
    diag_map: Vec<usize>,

    // fill-reducing permutation and its inverse
    perm: Vec<usize>,
    iperm: Vec<usize>,
    // permuted pattern and the slot mapping A -> PAPᵀ
    P: CscMatrix<T>,
    AtoPAPt: Vec<usize>,

    // elimination tree and factor workspace
    etree: Vec<usize>,
    Lnz: Vec<usize>,
    iwork: Vec<usize>,
    bwork: Vec<bool>,
    fwork: Vec<T>,

    // pattern the symbolic analysis was performed on
    pattern_rows: Vec<usize>,
    pattern_cols: Vec<usize>,

    // factors
    L: CscMatrix<T>,
    D: Vec<T>,
    Dinv: Vec<T>,

    // factorization state
    inertia: Inertia,
    singular: bool,
    factorized: bool,
    analyzed: bool,
}

impl<T: FloatT> Default for InertiaLdl<T> {
    fn default() -> Self {
        Self {
            A: CscMatrix::spalloc(0, 0, 0),
            coo_map: Vec::new(),
            diag_map: Vec::new(),
            perm: Vec::new(),
            iperm: Vec::new(),
            P: CscMatrix::spalloc(0, 0, 0),
            AtoPAPt: Vec::new(),
            pattern_rows: Vec::new(),
            pattern_cols: Vec::new(),
            etree: Vec::new(),
            Lnz: Vec::new(),
            iwork: Vec::new(),
            bwork: Vec::new(),
            fwork: Vec::new(),
            L: CscMatrix::spalloc(0, 0, 0),
            D: Vec::new(),
            Dinv: Vec::new(),
            inertia: Inertia::new(0, 0, 0),
            singular: false,
            factorized: false,
            analyzed: false,
        }
    }
}

impl<T: FloatT> LinearSolver<T> for InertiaLdl<T> {
    fn initialize_memory(
        &mut self,
        number_variables: usize,
        number_constraints: usize,
        number_nonzeros: usize,
        regularization_size: usize,
    ) {
        let n = number_variables + number_constraints;
        self.coo_map.reserve(number_nonzeros);
        self.diag_map.reserve(regularization_size.max(n));
        self.etree.reserve(n);
        self.Lnz.reserve(n);
        self.D.reserve(n);
        self.Dinv.reserve(n);
    }

    fn do_symbolic_analysis(
        &mut self,
        matrix: &SymmetricMatrix<T>,
    ) -> Result<(), LinearSolverError> {
        let n = matrix.dimension();

        // assemble the unpermuted pattern, with a slot mapping for the COO
        // entries and a dedicated slot per diagonal
        self.assemble_pattern(matrix);
        self.pattern_rows = matrix.iter().map(|(i, _, _)| i).collect();
        self.pattern_cols = matrix.iter().map(|(_, j, _)| j).collect();

        // AMD fill-reducing ordering
        let control = amd::Control::default();
        let (perm, iperm, _info) = amd::order(n, &self.A.colptr, &self.A.rowval, &control)
            .map_err(|status| LinearSolverError::OrderingFailure(format!("{status:?}")))?;
        self.perm = perm;
        self.iperm = iperm;

        // permute to (another) upper triangular pattern and keep the mapping
        // from the slots of A to the slots of the permutation
        let (P, AtoPAPt) = permute_symmetric(&self.A, &self.iperm);
        self.P = P;
        self.AtoPAPt = AtoPAPt;

        // elimination tree and column counts of L
        self.etree = vec![0; n];
        self.Lnz = vec![0; n];
        self.iwork = vec![0; 3 * n];
        self.bwork = vec![false; n];
        self.fwork = vec![T::zero(); n];
        etree(
            n,
            &self.P.colptr,
            &self.P.rowval,
            &mut self.iwork,
            &mut self.Lnz,
            &mut self.etree,
        );

        let sumLnz: usize = self.Lnz.iter().sum();
        self.L = CscMatrix::spalloc(n, n, sumLnz);
        self.D = vec![T::zero(); n];
        self.Dinv = vec![T::zero(); n];

        self.analyzed = true;
        self.factorized = false;
        Ok(())
    }

    fn do_numerical_factorization(
        &mut self,
        matrix: &SymmetricMatrix<T>,
    ) -> Result<(), LinearSolverError> {
        if !self.analyzed {
            return Err(LinearSolverError::MissingSymbolicAnalysis);
        }
        if !self.pattern_matches(matrix) {
            // the assembly changed its pattern: redo the analysis
            self.do_symbolic_analysis(matrix)?;
        }

        // scatter structural entries and the regularization tail into A,
        // then into the permuted pattern
        let max_abs = self.assemble_values(matrix);
        for (slot, &target) in self.AtoPAPt.iter().enumerate() {
            self.P.nzval[target] = self.A.nzval[slot];
        }

        // pivots below this threshold count as zero eigenvalues
        let pivot_tolerance = T::epsilon() * T::max(T::one(), max_abs);

        let n = self.P.n;
        let (positive, negative, completed) = factor(
            &self.P,
            &mut self.L,
            &mut self.D,
            &mut self.Dinv,
            &self.Lnz,
            &self.etree,
            &mut self.bwork,
            &mut self.iwork,
            &mut self.fwork,
            pivot_tolerance,
        );

        self.singular = completed < n;
        self.inertia = Inertia::new(positive, negative, n - completed);
        self.factorized = completed == n;
        Ok(())
    }

    fn solve_indefinite_system(
        &mut self,
        _matrix: &SymmetricMatrix<T>,
        rhs: &[T],
        solution: &mut [T],
    ) -> Result<(), LinearSolverError> {
        if !self.factorized {
            return Err(LinearSolverError::SingularMatrix);
        }
        debug_assert_eq!(rhs.len(), self.D.len());

        // permute the right-hand side
        let work = &mut self.fwork;
        for (w, &p) in zip(work.iter_mut(), &self.perm) {
            *w = rhs[p];
        }

        lsolve(&self.L.colptr, &self.L.rowval, &self.L.nzval, work);
        zip(work.iter_mut(), &self.Dinv).for_each(|(w, &d)| *w *= d);
        ltsolve(&self.L.colptr, &self.L.rowval, &self.L.nzval, work);

        // inverse permutation into the solution
        for (&p, &w) in zip(&self.perm, work.iter()) {
            solution[p] = w;
        }
        Ok(())
    }

    fn get_inertia(&self) -> Inertia {
        self.inertia
    }

    fn matrix_is_singular(&self) -> bool {
        self.singular
    }

    fn rank(&self) -> usize {
        self.inertia.positive + self.inertia.negative
    }
}

impl<T: FloatT> InertiaLdl<T> {
    fn pattern_matches(&self, matrix: &SymmetricMatrix<T>) -> bool {
        if matrix.number_nonzeros() != self.pattern_rows.len() {
            return false;
        }
        matrix
            .iter()
            .zip(self.pattern_rows.iter().zip(self.pattern_cols.iter()))
            .all(|((i, j, _), (&pi, &pj))| i == pi && j == pj)
    }

    /// Build the CSC pattern of the matrix with all diagonal positions
    /// present, recording where each COO entry and each diagonal lands.
    fn assemble_pattern(&mut self, matrix: &SymmetricMatrix<T>) {
        let n = matrix.dimension();

        // per-column row lists, including every diagonal
        let mut columns: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, j, _) in matrix.iter() {
            columns[j].push(i);
        }
        for (j, column) in columns.iter_mut().enumerate() {
            column.push(j);
            column.sort_unstable();
            column.dedup();
        }

        let nnz: usize = columns.iter().map(|c| c.len()).sum();
        let mut A = CscMatrix::spalloc(n, n, nnz);
        let mut slot_of_row = vec![UNKNOWN; n];
        let mut slot = 0;
        self.diag_map = vec![UNKNOWN; n];
        self.coo_map = vec![UNKNOWN; matrix.number_nonzeros()];

        // second pass per column: assign slots, then resolve the maps
        let mut entries_in_column: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (entry, (_, j, _)) in matrix.iter().enumerate() {
            entries_in_column[j].push(entry);
        }
        let coo_rows: Vec<usize> = matrix.iter().map(|(i, _, _)| i).collect();

        for j in 0..n {
            A.colptr[j] = slot;
            for &row in &columns[j] {
                A.rowval[slot] = row;
                slot_of_row[row] = slot;
                slot += 1;
            }
            self.diag_map[j] = slot_of_row[j];
            for &entry in &entries_in_column[j] {
                self.coo_map[entry] = slot_of_row[coo_rows[entry]];
            }
        }
        A.colptr[n] = slot;
        self.A = A;
    }

    /// Scatter values (structural + tail) into A.  Returns the largest
    /// absolute value seen, used to scale the pivot tolerance.
    fn assemble_values(&mut self, matrix: &SymmetricMatrix<T>) -> T {
        self.A.nzval.iter_mut().for_each(|v| *v = T::zero());
        let mut max_abs = T::zero();
        for (entry, (_, _, value)) in matrix.iter().enumerate() {
            self.A.nzval[self.coo_map[entry]] += value;
            max_abs = T::max(max_abs, value.abs());
        }
        for (k, &delta) in matrix.regularization_tail().iter().enumerate() {
            self.A.nzval[self.diag_map[k]] += delta;
            max_abs = T::max(max_abs, delta.abs());
        }
        max_abs
    }
}

// Compute the elimination tree and column counts of L for an upper
// triangular pattern in compressed sparse column form.
fn etree(
    n: usize,
    Ap: &[usize],
    Ai: &[usize],
    work: &mut [usize],
    Lnz: &mut [usize],
    etree: &mut [usize],
) {
    work[..n].fill(0);
    Lnz.fill(0);
    etree.fill(UNKNOWN);

    for j in 0..n {
        work[j] = j;
        for &istart in Ai.iter().take(Ap[j + 1]).skip(Ap[j]) {
            let mut i = istart;
            while work[i] != j {
                if etree[i] == UNKNOWN {
                    etree[i] = j;
                }
                Lnz[i] += 1;
                work[i] = j;
                i = etree[i];
            }
        }
    }
}

/// Up-looking LDLᵀ factorization of a permuted upper-triangular pattern.
/// Returns (#positive pivots, #negative pivots, #columns completed): a pivot
/// under `pivot_tolerance` in magnitude stops the factorization early.
#[allow(clippy::too_many_arguments)]
fn factor<T: FloatT>(
    A: &CscMatrix<T>,
    L: &mut CscMatrix<T>,
    D: &mut [T],
    Dinv: &mut [T],
    Lnz: &[usize],
    etree: &[usize],
    bwork: &mut [bool],
    iwork: &mut [usize],
    fwork: &mut [T],
    pivot_tolerance: T,
) -> (usize, usize, usize) {
    let n = A.n;
    let (Ap, Ai, Ax) = (&A.colptr, &A.rowval, &A.nzval);
    let (Lp, Li, Lx) = (&mut L.colptr, &mut L.rowval, &mut L.nzval);

    let mut positive = 0;
    let mut negative = 0;

    // partition working memory
    let y_markers = bwork;
    let (y_idx, iwork) = iwork.split_at_mut(n);
    let (elim_buffer, next_colspace) = iwork.split_at_mut(n);
    let y_vals = fwork;

    // Lp = cumsum(Lnz) starting from zero
    Lp[0] = 0;
    let mut acc = 0;
    for (Lp, Lnz) in zip(&mut Lp[1..], Lnz) {
        *Lp = acc + Lnz;
        acc = *Lp;
    }

    y_markers.fill(false);
    y_vals.fill(T::zero());
    D.fill(T::zero());
    next_colspace.copy_from_slice(&Lp[0..n]);

    // first pivot: column 0 of a triu pattern holds only the diagonal
    D[0] = Ax[0];
    if D[0].abs() <= pivot_tolerance {
        return (0, 0, 0);
    }
    if D[0] > T::zero() {
        positive += 1;
    } else {
        negative += 1;
    }
    Dinv[0] = T::recip(D[0]);

    for k in 1..n {
        // For each k we solve y = L(0:k-1, 0:k-1) \ b, where b is the kth
        // column of A above the diagonal; y is then the kth row of L with an
        // implied 1 at the diagonal.

        let mut nnz_y = 0;

        // locate the nonzeros of the kth row of L along the elimination tree
        for i in Ap[k]..Ap[k + 1] {
            let bidx = Ai[i];
            if bidx == k {
                D[k] = Ax[i];
                continue;
            }

            y_vals[bidx] = Ax[i];

            if !y_markers[bidx] {
                y_markers[bidx] = true;
                elim_buffer[0] = bidx;
                let mut nnz_e = 1;

                let mut next_idx = etree[bidx];
                while next_idx != UNKNOWN && next_idx < k {
                    if y_markers[next_idx] {
                        break;
                    }
                    y_markers[next_idx] = true;
                    elim_buffer[nnz_e] = next_idx;
                    next_idx = etree[next_idx];
                    nnz_e += 1;
                }

                // place the buffered elimination path in reverse order
                while nnz_e != 0 {
                    nnz_e -= 1;
                    y_idx[nnz_y] = elim_buffer[nnz_e];
                    nnz_y += 1;
                }
            }
        }

        // numerical elimination along the located pattern
        for i in (0..nnz_y).rev() {
            let cidx = y_idx[i];
            let tmp_idx = next_colspace[cidx];

            let y_vals_cidx = y_vals[cidx];
            for j in Lp[cidx]..tmp_idx {
                y_vals[Li[j]] -= Lx[j] * y_vals_cidx;
            }

            Lx[tmp_idx] = y_vals_cidx * Dinv[cidx];
            D[k] -= y_vals_cidx * Lx[tmp_idx];

            Li[tmp_idx] = k;
            next_colspace[cidx] += 1;

            y_vals[cidx] = T::zero();
            y_markers[cidx] = false;
        }

        if D[k].abs() <= pivot_tolerance {
            return (positive, negative, k);
        }
        if D[k] > T::zero() {
            positive += 1;
        } else {
            negative += 1;
        }
        Dinv[k] = T::recip(D[k]);
    }

    (positive, negative, n)
}

// Solves (L+I)x = b, with x replacing b
fn lsolve<T: FloatT>(Lp: &[usize], Li: &[usize], Lx: &[T], x: &mut [T]) {
    for i in 0..x.len() {
        let xi = x[i];
        for j in Lp[i]..Lp[i + 1] {
            x[Li[j]] -= Lx[j] * xi;
        }
    }
}

// Solves (L+I)ᵀx = b, with x replacing b
fn ltsolve<T: FloatT>(Lp: &[usize], Li: &[usize], Lx: &[T], x: &mut [T]) {
    for i in (0..x.len()).rev() {
        let mut s = T::zero();
        for j in Lp[i]..Lp[i + 1] {
            s += Lx[j] * x[Li[j]];
        }
        x[i] -= s;
    }
}

// Permute a sparse symmetric matrix given in upper triangular form, keeping
// the mapping from the source slots to the permuted slots.
// Following Timothy Davis, Direct Methods for Sparse Linear Systems.
fn permute_symmetric<T: FloatT>(A: &CscMatrix<T>, iperm: &[usize]) -> (CscMatrix<T>, Vec<usize>) {
    let n = A.n;
    let mut P = CscMatrix::<T>::spalloc(n, n, A.nnz());
    let mut AtoPAPt = vec![0; A.nnz()];

    // 1. count the entries each column of P will receive
    let mut num_entries = vec![0; n];
    for colA in 0..n {
        let colP = iperm[colA];
        for &rowA in A.rowval.iter().take(A.colptr[colA + 1]).skip(A.colptr[colA]) {
            let rowP = iperm[rowA];
            let col_idx = max(rowP, colP);
            num_entries[col_idx] += 1;
        }
    }

    // 2. column pointers from the counts
    P.colptr[0] = 0;
    let mut acc = 0;
    for (ptr, ne) in zip(&mut P.colptr[1..], &num_entries) {
        *ptr = acc + ne;
        acc = *ptr;
    }
    num_entries.copy_from_slice(&P.colptr[0..n]);
    let mut row_starts = num_entries;

    // 3. permute the entries (columns end up unordered, which the
    // factorization tolerates)
    for colA in 0..n {
        let colP = iperm[colA];
        for slotA in A.colptr[colA]..A.colptr[colA + 1] {
            let rowA = A.rowval[slotA];
            let rowP = iperm[rowA];
            let col_idx = max(colP, rowP);

            let slotP = row_starts[col_idx];
            P.rowval[slotP] = min(colP, rowP);
            P.nzval[slotP] = A.nzval[slotA];
            AtoPAPt[slotA] = slotP;
            row_starts[col_idx] += 1;
        }
    }

    (P, AtoPAPt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factorize(matrix: &SymmetricMatrix<f64>) -> InertiaLdl<f64> {
        let mut ldl = InertiaLdl::<f64>::default();
        ldl.do_symbolic_analysis(matrix).unwrap();
        ldl.do_numerical_factorization(matrix).unwrap();
        ldl
    }

    #[test]
    fn test_indefinite_inertia() {
        // quasidefinite [2 0 1; 0 3 1; 1 1 -1] has inertia (2, 1, 0)
        let mut m = SymmetricMatrix::<f64>::new(3, 8);
        m.insert(0, 0, 2.0);
        m.insert(1, 1, 3.0);
        m.insert(0, 2, 1.0);
        m.insert(1, 2, 1.0);
        m.insert(2, 2, -1.0);
        let ldl = factorize(&m);
        assert!(!ldl.matrix_is_singular());
        assert_eq!(ldl.get_inertia(), Inertia::new(2, 1, 0));
    }

    #[test]
    fn test_singular_matrix_is_flagged() {
        // rank-1 matrix
        let mut m = SymmetricMatrix::<f64>::new(2, 3);
        m.insert(0, 0, 1.0);
        m.insert(0, 1, 1.0);
        m.insert(1, 1, 1.0);
        let ldl = factorize(&m);
        assert!(ldl.matrix_is_singular());
        assert_eq!(ldl.rank(), 1);
    }

    #[test]
    fn test_solve_saddle_point_system() {
        // KKT system of min ½(x₁²+x₂²) s.t. x₁+x₂ = 1:
        // [I  a; aᵀ 0] (x, -y) = (0, 0, -1) with a = (1,1)
        let mut m = SymmetricMatrix::<f64>::new(3, 8);
        m.insert(0, 0, 1.0);
        m.insert(1, 1, 1.0);
        m.insert(0, 2, 1.0);
        m.insert(1, 2, 1.0);
        let mut ldl = factorize(&m);
        assert_eq!(ldl.get_inertia(), Inertia::new(2, 1, 0));

        let rhs = [0.0, 0.0, 1.0];
        let mut solution = [0.0; 3];
        ldl.solve_indefinite_system(&m, &rhs, &mut solution).unwrap();
        assert!((solution[0] - 0.5).abs() < 1e-12);
        assert!((solution[1] - 0.5).abs() < 1e-12);
        assert!((solution[2] - (-0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_regularization_tail_changes_factorization() {
        let mut m = SymmetricMatrix::<f64>::new(2, 2);
        m.insert(0, 0, 0.0);
        m.insert(1, 1, 0.0);
        let mut ldl = InertiaLdl::<f64>::default();
        ldl.do_symbolic_analysis(&m).unwrap();
        ldl.do_numerical_factorization(&m).unwrap();
        assert!(ldl.matrix_is_singular());

        m.set_regularization(2, 0, 1e-4, 0.0);
        ldl.do_numerical_factorization(&m).unwrap();
        assert!(!ldl.matrix_is_singular());
        assert_eq!(ldl.get_inertia(), Inertia::new(2, 0, 0));
    }
}
