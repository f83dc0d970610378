// proprio_core/src/states/layout.rs

use nalgebra::DMatrix;
use std::ops::Range;

/// Named 3-dimensional sub-blocks of a single-epoch error state, in storage order.
///
/// - Position (3) in the navigation frame, indices 0-2
/// - Velocity (3) in the navigation frame, indices 3-5
/// - Attitude error (3, quaternion vector part), indices 6-8
/// - Gyroscope bias (3) in the body frame, indices 9-11
/// - Accelerometer bias (3) in the body frame, indices 12-14
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorBlock {
    Position,
    Velocity,
    Attitude,
    GyroBias,
    AccelBias,
}

impl ErrorBlock {
    pub const ALL: [ErrorBlock; 5] = [
        ErrorBlock::Position,
        ErrorBlock::Velocity,
        ErrorBlock::Attitude,
        ErrorBlock::GyroBias,
        ErrorBlock::AccelBias,
    ];

    pub const fn offset(self) -> usize {
        match self {
            ErrorBlock::Position => 0,
            ErrorBlock::Velocity => 3,
            ErrorBlock::Attitude => 6,
            ErrorBlock::GyroBias => 9,
            ErrorBlock::AccelBias => 12,
        }
    }

    pub const fn size(self) -> usize {
        3
    }

    pub fn range(self) -> Range<usize> {
        self.offset()..self.offset() + self.size()
    }
}

/// The three epoch slots of an augmented state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Epoch {
    /// The oldest clone, `statek`.
    K,
    /// The intermediate clone, `statek_l`.
    KL,
    /// The active epoch, `statek_i`.
    KI,
}

impl Epoch {
    pub const ALL: [Epoch; 3] = [Epoch::K, Epoch::KL, Epoch::KI];

    /// Offset of this slot in an augmented covariance whose epochs have `single_dof` each.
    pub const fn offset(self, single_dof: usize) -> usize {
        match self {
            Epoch::K => 0,
            Epoch::KL => single_dof,
            Epoch::KI => 2 * single_dof,
        }
    }
}

/// Copies out the `(row, col)` epoch-pair block of an augmented covariance.
pub fn epoch_block(p: &DMatrix<f64>, row: Epoch, col: Epoch, single_dof: usize) -> DMatrix<f64> {
    p.view(
        (row.offset(single_dof), col.offset(single_dof)),
        (single_dof, single_dof),
    )
    .into_owned()
}

/// Overwrites the `(row, col)` epoch-pair block of an augmented covariance.
pub fn set_epoch_block(
    p: &mut DMatrix<f64>,
    row: Epoch,
    col: Epoch,
    single_dof: usize,
    block: &DMatrix<f64>,
) {
    p.view_mut(
        (row.offset(single_dof), col.offset(single_dof)),
        (single_dof, single_dof),
    )
    .copy_from(block);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_blocks_tile_the_state() {
        let mut next = 0;
        for block in ErrorBlock::ALL {
            assert_eq!(block.offset(), next);
            next += block.size();
        }
        assert_eq!(next, 15);
    }

    #[test]
    fn test_epoch_block_round_trip() {
        let mut p = DMatrix::<f64>::zeros(6, 6);
        let b = DMatrix::from_element(2, 2, 7.0);

        set_epoch_block(&mut p, Epoch::KL, Epoch::KI, 2, &b);

        assert_eq!(epoch_block(&p, Epoch::KL, Epoch::KI, 2), b);
        assert_eq!(p[(2, 4)], 7.0);
        assert_eq!(p[(4, 2)], 0.0);
    }
}
