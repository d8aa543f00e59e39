mod reduce;
mod sparse_gradient;

pub use reduce::reduce_sparse_gradient;
pub use sparse_gradient::SparseGradient;
