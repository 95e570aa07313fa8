use super::BlockError;

/// Sums its inputs.
///
/// Inputs are named `in0`, `in1`, and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combiner {
    inputs: usize,
}

impl Combiner {
    pub const OUTPUT: &'static str = "out";

    /// Creates a combiner with `inputs` input ports.
    ///
    /// # Errors
    ///
    /// Returns [`BlockError::NoPorts`] if `inputs` is zero.
    pub fn new(inputs: usize) -> Result<Self, BlockError> {
        if inputs == 0 {
            return Err(BlockError::NoPorts);
        }
        Ok(Self { inputs })
    }

    pub(crate) fn inputs(&self) -> Vec<String> {
        (0..self.inputs).map(|i| format!("in{i}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_an_input() {
        assert_eq!(Combiner::new(0), Err(BlockError::NoPorts));
        assert_eq!(Combiner::new(2).unwrap().inputs(), vec!["in0", "in1"]);
    }
}
