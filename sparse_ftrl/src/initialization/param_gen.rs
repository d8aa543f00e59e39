/// A `ParamGen` writes the initial values of an embedding table.
///
/// Generators are bounded, once `remaining` hits zero every `fill` writes nothing.
pub trait ParamGen {
    /// The amount of values the generator can still produce.
    fn remaining(&self) -> usize;

    /// Writes the next values into `out`, front to back.
    ///
    /// # Arguments
    /// * `out` - The buffer to write into.
    ///
    /// # Returns
    /// The amount of values written, short of `out.len()` only if the generator ran out.
    fn fill(&mut self, out: &mut [f32]) -> usize;
}
