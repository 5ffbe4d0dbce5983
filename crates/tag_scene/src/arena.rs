//! Arena floor and boundary walls

use crate::config::EnvironmentConfig;
use crate::layers::CollisionRole;
use crate::mjcf::{Geom, GeomShape, Rgba};
use tag_math::Vec3;

pub const WALL_THICKNESS: f64 = 0.02;
pub const WALL_HEIGHT: f64 = 0.1;
pub const WALL_GEOM_GROUP: u8 = 0;

pub const FLOOR_Z: f64 = -0.02;
pub const FLOOR_GRID_SPACING: f64 = 0.04;
pub const FLOOR_GEOM_GROUP: u8 = 2;

const WALL_COLOR: Rgba = Rgba::new(0.8, 0.8, 0.8, 1.0);
const FLOOR_COLOR: Rgba = Rgba::new(0.2, 0.2, 0.25, 1.0);

/// One side of the arena boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wall {
    North,
    South,
    East,
    West,
}

impl Wall {
    pub const ALL: [Self; 4] = [Self::North, Self::South, Self::East, Self::West];

    pub const fn name(self) -> &'static str {
        match self {
            Self::North => "wall_north",
            Self::South => "wall_south",
            Self::East => "wall_east",
            Self::West => "wall_west",
        }
    }
}

/// Rectangular arena with inner extents taken from the configuration
///
/// Walls sit outside the inner rectangle: their inner faces lie on the
/// nominal boundary. North and south walls run the full outer width so they
/// cover the corners, and east and west walls fill the span between them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Arena {
    pub half_width: f64,
    pub half_height: f64,
}

impl Arena {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }

    pub fn from_config(config: &EnvironmentConfig) -> Self {
        Self::new(config.arena_width, config.arena_height)
    }

    /// Center and half-extents of a wall box
    pub fn wall_box(&self, wall: Wall) -> (Vec3, Vec3) {
        let t = WALL_THICKNESS / 2.0;
        let h = WALL_HEIGHT / 2.0;
        let long_x = self.half_width + WALL_THICKNESS;
        match wall {
            Wall::North => (
                Vec3::new(0.0, self.half_height + t, h),
                Vec3::new(long_x, t, h),
            ),
            Wall::South => (
                Vec3::new(0.0, -self.half_height - t, h),
                Vec3::new(long_x, t, h),
            ),
            Wall::East => (
                Vec3::new(self.half_width + t, 0.0, h),
                Vec3::new(t, self.half_height, h),
            ),
            Wall::West => (
                Vec3::new(-self.half_width - t, 0.0, h),
                Vec3::new(t, self.half_height, h),
            ),
        }
    }

    pub fn wall(&self, wall: Wall) -> Geom {
        let (pos, half_extents) = self.wall_box(wall);
        Geom::new(wall.name(), GeomShape::Box { half_extents })
            .with_pos(pos)
            .with_group(WALL_GEOM_GROUP)
            .with_rgba(WALL_COLOR)
            .with_role(CollisionRole::Wall)
    }

    pub fn floor(&self) -> Geom {
        Geom::new(
            "floor",
            GeomShape::Plane {
                half_x: self.half_width + WALL_THICKNESS,
                half_y: self.half_height + WALL_THICKNESS,
                spacing: FLOOR_GRID_SPACING,
            },
        )
        .with_pos(Vec3::new(0.0, 0.0, FLOOR_Z))
        .with_group(FLOOR_GEOM_GROUP)
        .with_rgba(FLOOR_COLOR)
        .with_friction(1.1, 0.005, 0.0001)
        .with_role(CollisionRole::Floor)
    }

    /// Floor followed by the four walls
    pub fn geoms(&self) -> Vec<Geom> {
        std::iter::once(self.floor())
            .chain(Wall::ALL.into_iter().map(|w| self.wall(w)))
            .collect()
    }

    /// Whether a disc of `radius` centred at `point` fits inside the walls
    pub fn contains(&self, point: Vec3, radius: f64) -> bool {
        point.x.abs() + radius <= self.half_width && point.y.abs() + radius <= self.half_height
    }
}
