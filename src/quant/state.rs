//! Per-layer bit width and step bookkeeping.

use super::levels::threshold;

/// The three quantities a weight layer tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// Activations entering the layer
    Input,
    /// Stored weights
    Weight,
    /// Activations leaving the layer
    Output,
}

impl Quantity {
    /// All quantities in table order.
    pub const ALL: [Quantity; 3] = [Quantity::Input, Quantity::Weight, Quantity::Output];

    fn index(self) -> usize {
        match self {
            Quantity::Input => 0,
            Quantity::Weight => 1,
            Quantity::Output => 2,
        }
    }

    /// Lowercase name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            Quantity::Input => "input",
            Quantity::Weight => "weight",
            Quantity::Output => "output",
        }
    }
}

/// A committed `(bit_width, step)` pair.
///
/// `step` is the real value of one quantization level. A step of
/// [`BitScale::UNSET_STEP`] marks a quantity that has not been estimated.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BitScale {
    /// Bit width of the signed quantity
    pub bits: u32,
    /// Real value of one level
    pub step: f32,
}

impl BitScale {
    /// Sentinel step for "not yet estimated".
    pub const UNSET_STEP: f32 = -1.0;

    /// Create a committed pair.
    pub fn new(bits: u32, step: f32) -> Self {
        Self { bits, step }
    }

    /// Create a pair whose step is still unknown.
    pub fn unset(bits: u32) -> Self {
        Self { bits, step: Self::UNSET_STEP }
    }

    /// Whether a non-negative step has been committed.
    pub fn is_set(&self) -> bool {
        self.step >= 0.0
    }

    /// Full representable range, `step * threshold(bits)`.
    ///
    /// Negative while unset, which the range estimator treats as "no history".
    pub fn range(&self) -> f32 {
        self.step * threshold(self.bits) as f32
    }
}

/// The 3×2 `(bit_width, step)` table owned by one layer.
#[derive(Clone, Debug, PartialEq)]
pub struct BitScaleState {
    rows: [BitScale; 3],
}

impl BitScaleState {
    /// Fresh state with the given bit widths and every step unset.
    pub fn new(input_bits: u32, weight_bits: u32, output_bits: u32) -> Self {
        Self {
            rows: [
                BitScale::unset(input_bits),
                BitScale::unset(weight_bits),
                BitScale::unset(output_bits),
            ],
        }
    }

    /// Read one row.
    pub fn get(&self, quantity: Quantity) -> BitScale {
        self.rows[quantity.index()]
    }

    /// Mutable handle on one row.
    pub fn row_mut(&mut self, quantity: Quantity) -> &mut BitScale {
        &mut self.rows[quantity.index()]
    }

    /// Overwrite one row.
    pub fn set(&mut self, quantity: Quantity, value: BitScale) {
        self.rows[quantity.index()] = value;
    }

    /// The table as plain numbers, one `[bits, step]` row per quantity.
    pub fn as_table(&self) -> [[f32; 2]; 3] {
        self.rows.map(|r| [r.bits as f32, r.step])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_unset() {
        let state = BitScaleState::new(9, 8, 9);
        for q in Quantity::ALL {
            assert!(!state.get(q).is_set(), "{} should be unset", q.name());
        }
        assert_eq!(state.get(Quantity::Weight).bits, 8);
        assert_eq!(state.as_table(), [[9.0, -1.0], [8.0, -1.0], [9.0, -1.0]]);
    }

    #[test]
    fn test_row_mut_writes_in_place() {
        let mut state = BitScaleState::new(9, 8, 9);
        state.row_mut(Quantity::Output).step = 0.25;
        assert_eq!(state.get(Quantity::Output), BitScale::new(9, 0.25));
        assert!(!state.get(Quantity::Input).is_set());
    }

    #[test]
    fn test_range() {
        assert_eq!(BitScale::new(8, 0.5).range(), 63.5);
        assert!(BitScale::unset(8).range() < 0.0);
        assert!(BitScale::new(8, 0.0).is_set());
    }
}
