// proprio_core/src/math/mod.rs

pub mod linalg;
pub mod manifold;
pub mod quaternion;
