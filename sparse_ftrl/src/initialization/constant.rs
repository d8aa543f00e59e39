use super::ParamGen;

/// Fills a table with a single value.
#[derive(Debug, Clone)]
pub struct ConstParamGen {
    value: f32,
    remaining: usize,
}

impl ConstParamGen {
    /// Creates a new `ConstParamGen`.
    ///
    /// # Arguments
    /// * `value` - The value every element gets.
    /// * `limit` - How many elements the generator may write in total.
    pub fn new(value: f32, limit: usize) -> Self {
        Self {
            value,
            remaining: limit,
        }
    }
}

impl ParamGen for ConstParamGen {
    fn remaining(&self) -> usize {
        self.remaining
    }

    fn fill(&mut self, out: &mut [f32]) -> usize {
        let n = out.len().min(self.remaining);

        out[..n].fill(self.value);
        self.remaining -= n;
        n
    }
}
