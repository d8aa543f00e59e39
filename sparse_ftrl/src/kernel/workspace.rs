use std::mem;

/// The scratch space a sparse ftrl launch needs to hold the reduced gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceSizes {
    pub values: usize,
    pub indices: usize,
}

impl WorkspaceSizes {
    /// The sizes in bytes, values first.
    pub fn bytes(&self) -> [usize; 2] {
        [
            self.values * mem::size_of::<f32>(),
            self.indices * mem::size_of::<i32>(),
        ]
    }
}

/// Owned scratch buffers, reusable across launches.
///
/// Every launch writes the prefix it reads, stale contents are never observed. Besides the
/// reduced gradient it keeps the reducer's bookkeeping, so launches that fit the sizes it
/// was created with don't allocate for the reduction.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(super) values: Box<[f32]>,
    pub(super) indices: Box<[i32]>,
    pub(super) positions: Vec<usize>,
}

impl Workspace {
    /// Allocates a new `Workspace` with the given sizes.
    pub fn new(sizes: WorkspaceSizes) -> Self {
        Self {
            values: vec![0.; sizes.values].into_boxed_slice(),
            indices: vec![0; sizes.indices].into_boxed_slice(),
            positions: Vec::with_capacity(2 * sizes.indices + 1),
        }
    }

    pub fn sizes(&self) -> WorkspaceSizes {
        WorkspaceSizes {
            values: self.values.len(),
            indices: self.indices.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_sizes() {
        let sizes = WorkspaceSizes {
            values: 12,
            indices: 4,
        };

        assert_eq!(sizes.bytes(), [48, 16]);
        assert_eq!(Workspace::new(sizes).sizes(), sizes);
    }
}
