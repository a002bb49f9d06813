//! Flattened multi-discrete actions as sent to the simulation.

use super::error::ShapingError;

/// One agent's flattened action: one discrete choice per action argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionVector(pub Vec<i32>);

impl ActionVector {
    /// Slot of the movement direction argument.
    pub const MOVE_DIRECTION: usize = 8;
    /// Slot of the sell price argument.
    pub const SELL_PRICE: usize = 10;
    /// Shortest action vector the shaping layer accepts.
    pub const MIN_LEN: usize = Self::SELL_PRICE + 1;

    /// Move direction and sell price, the two arguments the postprocessor
    /// records.
    pub fn recorded(&self) -> Result<(i32, i32), ShapingError> {
        if self.0.len() < Self::MIN_LEN {
            return Err(ShapingError::ActionTooShort {
                len: self.0.len(),
                expected: Self::MIN_LEN,
            });
        }
        Ok((self.0[Self::MOVE_DIRECTION], self.0[Self::SELL_PRICE]))
    }
}

impl From<Vec<i32>> for ActionVector {
    fn from(v: Vec<i32>) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_move_and_price() {
        let mut raw = vec![0; 12];
        raw[8] = 3;
        raw[10] = 7;
        assert_eq!(ActionVector(raw).recorded(), Ok((3, 7)));
    }

    #[test]
    fn short_vector_rejected() {
        assert_eq!(
            ActionVector(vec![0; 9]).recorded(),
            Err(ShapingError::ActionTooShort {
                len: 9,
                expected: 11
            })
        );
    }
}
