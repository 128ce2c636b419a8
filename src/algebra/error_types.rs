use thiserror::Error;

/// Error type returned by the sparse format checking utilities.
#[derive(Error, Debug)]
pub enum SparseFormatError {
    #[error("Matrix dimension fields and/or array lengths are incompatible")]
    IncompatibleDimension,
    #[error("Data is not sorted by row index within each column")]
    BadRowOrdering,
    #[error("Row value exceeds the matrix row dimension")]
    BadRowval,
    #[error("Bad column pointer values")]
    BadColptr,
    #[error("Entry outside the upper triangle of a symmetric matrix")]
    NotUpperTriangular,
}
