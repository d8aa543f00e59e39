mod node;
mod operand;
mod sparse_apply_ftrl;
mod workspace;

pub use node::{KernelNode, NodeSpec};
pub use operand::Operand;
pub use sparse_apply_ftrl::SparseApplyFtrlKernel;
pub use workspace::{Workspace, WorkspaceSizes};
