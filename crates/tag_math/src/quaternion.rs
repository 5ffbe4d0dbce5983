//! Quaternion for 3D rotations, stored in `w x y z` order

/// Unit quaternion representing a 3D rotation
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// Identity quaternion (no rotation)
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Rotation about +z by `yaw` radians
    #[inline]
    pub fn from_yaw(yaw: f64) -> Self {
        let (sin, cos) = (yaw * 0.5).sin_cos();
        Self::new(cos, 0.0, 0.0, sin)
    }

    /// Heading about +z, in `(-PI, PI]`
    #[inline]
    pub fn yaw(self) -> f64 {
        (2.0 * (self.w * self.z + self.x * self.y))
            .atan2(1.0 - 2.0 * (self.y * self.y + self.z * self.z))
    }

    #[inline]
    pub fn to_array(self) -> [f64; 4] {
        [self.w, self.x, self.y, self.z]
    }
}

impl From<[f64; 4]> for Quat {
    /// Components in `w x y z` order
    fn from([w, x, y, z]: [f64; 4]) -> Self {
        Self::new(w, x, y, z)
    }
}
