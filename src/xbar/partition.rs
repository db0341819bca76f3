//! Splitting a layer's input dimension across crossbar sub-arrays.

use std::ops::Range;

use crate::error::{Result, XbarError};

/// Split `num` into chunks of `base`, plus one remainder chunk if needed.
///
/// `split_by_num(20, 8) == [8, 8, 4]`, `split_by_num(16, 8) == [8, 8]`.
pub fn split_by_num(num: usize, base: usize) -> Result<Vec<usize>> {
    if num == 0 {
        return Err(XbarError::EmptyDimension);
    }
    if base == 0 {
        return Err(XbarError::ZeroRowCapacity { xbar_row: 0, row_cost: 1 });
    }
    let mut sizes = vec![base; num / base];
    if num % base > 0 {
        sizes.push(num % base);
    }
    Ok(sizes)
}

/// How one layer's input dimension maps onto crossbar sub-arrays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionPlan {
    rows_per_partition: usize,
    sizes: Vec<usize>,
}

impl PartitionPlan {
    /// Plan partitions for an input dimension `in_dim` on crossbars with
    /// `xbar_row` rows, where each input element occupies `row_cost` rows.
    pub fn new(in_dim: usize, xbar_row: usize, row_cost: usize) -> Result<Self> {
        if xbar_row == 0 {
            return Err(XbarError::config_value(
                "xbar_row",
                "crossbar has no rows",
                "set hardware.xbar_row > 0",
            ));
        }
        if in_dim == 0 {
            return Err(XbarError::EmptyDimension);
        }
        let rows_per_partition = if row_cost == 0 { 0 } else { xbar_row / row_cost };
        if rows_per_partition == 0 {
            return Err(XbarError::ZeroRowCapacity { xbar_row, row_cost });
        }
        let sizes = split_by_num(in_dim, rows_per_partition)?;
        Ok(Self { rows_per_partition, sizes })
    }

    /// Input elements held by one full partition.
    pub fn rows_per_partition(&self) -> usize {
        self.rows_per_partition
    }

    /// Input-dimension size of each partition, in order.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Number of sub-arrays.
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// Always false: a valid plan has at least one partition.
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Total input dimension covered.
    pub fn in_dim(&self) -> usize {
        self.sizes.iter().sum()
    }

    /// Index range along the partition axis for every partition.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.sizes.iter().scan(0usize, |start, &size| {
            let range = *start..*start + size;
            *start += size;
            Some(range)
        })
    }
}
