// proprio_core/src/prelude.rs

// --- Core Abstractions (The main contracts of the library) ---
pub use crate::estimation::{NoiseFn, ProcessNoise, UpdateOutcome};
pub use crate::math::manifold::Manifold;
pub use crate::models::estimation::dynamics::ErrorDynamics;
pub use crate::states::ErrorState;

// --- Core Data Structures (The "nouns" of the library) ---
pub use crate::config::{AdaptiveConfig, SckfConfig, SckfNoise, UsckfConfig};
pub use crate::error::FilterError;
pub use crate::messages::{AttitudeOutput, ImuSample, KinematicMeasurement};
pub use crate::states::{AugmentedState, Epoch, ErrorBlock, SingleState};

// --- Estimation Algorithms ---
pub use crate::estimation::filters::{Sckf, Usckf};
pub use crate::estimation::gating::{accept_any_mahalanobis_distance, accept_mahalanobis_distance};

// --- Concrete Model Implementations (Export common ones for convenience) ---
pub use crate::models::estimation::dynamics::strapdown::StrapdownErrorModel;
pub use crate::models::estimation::measurement::{AdaptiveAttitudeCov, DataModel};
