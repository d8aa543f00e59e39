pub mod error;
pub mod initialization;
pub mod kernel;
pub mod optimization;
pub mod reduction;
pub mod specs;
pub mod storage;
pub mod table;

pub use error::{KernelErr, Result};
pub use kernel::{KernelNode, NodeSpec, Operand, SparseApplyFtrlKernel, Workspace, WorkspaceSizes};
pub use optimization::{Ftrl, FtrlSlotsMut};
pub use reduction::{SparseGradient, reduce_sparse_gradient};
pub use storage::{EmbeddingStore, StoreBuilder};
pub use table::{FtrlSlots, Table};
