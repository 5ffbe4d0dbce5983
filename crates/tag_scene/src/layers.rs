//! Collision roles and contact filtering
//!
//! Every physical geom in the scene carries exactly one [`CollisionRole`].
//! The role maps to a pair of bitmasks written to the document as MuJoCo's
//! `contype` (own bits) and `conaffinity` (collidable bits). The engine
//! considers a pair of geoms for contact when
//! `(own_a & collidable_b) != 0 || (own_b & collidable_a) != 0`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single category flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionLayer(pub u32);

impl CollisionLayer {
    /// Ground plane
    pub const FLOOR: Self = Self(0);
    /// Drive wheels
    pub const WHEEL: Self = Self(1);
    /// Passive caster ball
    pub const CASTER_BALL: Self = Self(2);
    /// Agent chassis
    pub const CHASSIS: Self = Self(3);
    /// Arena boundary
    pub const WALL: Self = Self(4);

    pub const ALL: [Self; 5] = [
        Self::FLOOR,
        Self::WHEEL,
        Self::CASTER_BALL,
        Self::CHASSIS,
        Self::WALL,
    ];

    /// Get the layer as a bitmask
    pub const fn as_mask(&self) -> u32 {
        1 << self.0
    }
}

/// Own/collidable bitmask pair for one geom
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollisionMask {
    /// Category bits this geom belongs to (`contype`)
    pub own: u32,
    /// Category bits this geom may touch (`conaffinity`)
    pub collidable: u32,
}

impl CollisionMask {
    /// Takes part in no contacts at all
    pub const NONE: Self = Self {
        own: 0,
        collidable: 0,
    };

    pub const fn new(own: u32, collidable: u32) -> Self {
        Self { own, collidable }
    }

    /// Single-layer membership colliding with the given layers
    pub const fn from_layer(layer: CollisionLayer, collides_with: &[CollisionLayer]) -> Self {
        let mut collidable = 0;
        let mut i = 0;
        while i < collides_with.len() {
            collidable |= collides_with[i].as_mask();
            i += 1;
        }
        Self {
            own: layer.as_mask(),
            collidable,
        }
    }

    /// Engine contact rule for a pair of masks
    pub const fn can_collide(&self, other: &CollisionMask) -> bool {
        (self.own & other.collidable) != 0 || (other.own & self.collidable) != 0
    }

    /// True if the geom is excluded from contact resolution
    pub const fn is_inert(&self) -> bool {
        self.own == 0 && self.collidable == 0
    }
}

/// Role of a surface in contact resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionRole {
    Floor,
    Wheel,
    CasterBall,
    Chassis,
    Wall,
    /// Rendered and weighed but never touched
    VisualOnly,
}

impl CollisionRole {
    pub const ALL: [Self; 6] = [
        Self::Floor,
        Self::Wheel,
        Self::CasterBall,
        Self::Chassis,
        Self::Wall,
        Self::VisualOnly,
    ];

    /// Bitmask pair for this role
    pub const fn mask(self) -> CollisionMask {
        use CollisionLayer as L;
        match self {
            Self::Floor => CollisionMask::from_layer(L::FLOOR, &[L::WHEEL, L::CASTER_BALL]),
            Self::Wheel => CollisionMask::from_layer(L::WHEEL, &[L::FLOOR]),
            Self::CasterBall => CollisionMask::from_layer(L::CASTER_BALL, &[L::FLOOR]),
            Self::Chassis => CollisionMask::from_layer(L::CHASSIS, &[L::WALL, L::CHASSIS]),
            Self::Wall => CollisionMask::from_layer(L::WALL, &[L::CHASSIS]),
            Self::VisualOnly => CollisionMask::NONE,
        }
    }

    /// Whether geoms with these roles generate contacts
    pub const fn can_contact(self, other: Self) -> bool {
        self.mask().can_collide(&other.mask())
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Floor => "floor",
            Self::Wheel => "wheel",
            Self::CasterBall => "caster_ball",
            Self::Chassis => "chassis",
            Self::Wall => "wall",
            Self::VisualOnly => "visual_only",
        }
    }
}

impl fmt::Display for CollisionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
