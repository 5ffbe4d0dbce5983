//! # tag_math - Scene and observation math
//!
//! Double-precision primitives shared by the scene generator and the
//! observation code. Quaternions use the physics engine's `w x y z` order so
//! sensor buffers can be read without shuffling components.

pub mod quaternion;
pub mod vector;

pub use quaternion::*;
pub use vector::*;

pub mod prelude {
    pub use crate::quaternion::Quat;
    pub use crate::vector::Vec3;
}
