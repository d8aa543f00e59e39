use crate::error::{KernelErr, Result};

/// A typed input buffer handed to a kernel launch.
#[derive(Debug)]
pub enum Operand<'a> {
    F32Mut(&'a mut [f32]),
    F32(&'a [f32]),
    I32(&'a [i32]),
}

impl Operand<'_> {
    /// Borrows a writable float buffer.
    ///
    /// # Arguments
    /// * `index` - The position of this operand in the launch, for error reporting.
    pub fn as_f32_mut(&mut self, index: usize) -> Result<&mut [f32]> {
        match self {
            Operand::F32Mut(buf) => Ok(&mut **buf),
            _ => Err(KernelErr::OperandType {
                index,
                expected: "writable f32",
            }),
        }
    }

    /// Borrows a float buffer, writable or not.
    ///
    /// # Arguments
    /// * `index` - The position of this operand in the launch, for error reporting.
    pub fn as_f32(&self, index: usize) -> Result<&[f32]> {
        match self {
            Operand::F32Mut(buf) => Ok(&**buf),
            Operand::F32(buf) => Ok(*buf),
            Operand::I32(_) => Err(KernelErr::OperandType {
                index,
                expected: "f32",
            }),
        }
    }

    /// Borrows a 32-bit signed integer buffer.
    ///
    /// # Arguments
    /// * `index` - The position of this operand in the launch, for error reporting.
    pub fn as_i32(&self, index: usize) -> Result<&[i32]> {
        match self {
            Operand::I32(buf) => Ok(*buf),
            _ => Err(KernelErr::OperandType {
                index,
                expected: "i32",
            }),
        }
    }
}
