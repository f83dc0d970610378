// proprio_core/src/estimation/filters/usckf/cloning.rs

use tracing::debug;

use super::Usckf;
use crate::states::{epoch_block, set_epoch_block, Epoch, ErrorState};

impl<S: ErrorState> Usckf<S> {
    /// Starts a new epoch: the active epoch is copied into both historical slots of
    /// the nominal and the error state, and every epoch-pair block of the covariance
    /// is set to the active block.
    ///
    /// Call after the corrections of the epoch have been applied.
    pub fn cloning(&mut self) {
        self.mu_state.statek_l = self.mu_state.statek_i.clone();
        self.mu_state.statek = self.mu_state.statek_l.clone();
        self.mu_error.statek_l = self.mu_error.statek_i.clone();
        self.mu_error.statek = self.mu_error.statek_l.clone();

        let pk = epoch_block(&self.pk_error, Epoch::KI, Epoch::KI, S::DOF);
        for row in Epoch::ALL {
            for col in Epoch::ALL {
                set_epoch_block(&mut self.pk_error, row, col, S::DOF, &pk);
            }
        }
        debug!("usckf epochs cloned");
    }
}
