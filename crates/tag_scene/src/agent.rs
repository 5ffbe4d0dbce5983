//! Differential-drive agent template
//!
//! Chaser and evader are two instances of one template, differing only in
//! name prefix, lid tint and spawn position.

use crate::layers::CollisionRole;
use crate::mjcf::{
    Body, Geom, GeomShape, Inertial, Joint, JointKind, Motor, Rgba, Sensor, SensorKind,
};
use std::fmt;
use tag_math::Vec3;

/// Spawn offset along x; the chaser starts at `+`, the evader at `-`
pub const SPAWN_OFFSET_X: f64 = 0.3;

/// Visualization group of every agent geom
pub const AGENT_GEOM_GROUP: u8 = 1;

pub const CHASSIS_RADIUS: f64 = 0.05;
pub const CHASSIS_BASE_HEIGHT: f64 = 0.038;
pub const CHASSIS_LID_HEIGHT: f64 = 0.003;
pub const CHASSIS_LID_Z: f64 = 0.0205;

pub const CHASSIS_BASE_MESH: &str = "chassis_base";
pub const CHASSIS_LID_MESH: &str = "chassis_lid";

pub const WHEEL_OFFSET: Vec3 = Vec3::new(0.0, 0.037123, -0.0099);
pub const WHEEL_RADIUS: f64 = 0.020;
pub const WHEEL_HALF_WIDTH: f64 = 0.0015;

pub const CASTER_OFFSET: Vec3 = Vec3::new(-0.037, 0.0, -0.0251);
pub const CASTER_BALL_RADIUS: f64 = 0.0048;

pub const MOTOR_GEAR: f64 = 0.19;

const BODY_COLOR: Rgba = Rgba::new(0.1, 0.1, 0.1, 1.0);
const METAL_COLOR: Rgba = Rgba::new(0.6, 0.6, 0.6, 1.0);

/// The two participants of a pursuit episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Agent {
    Chaser,
    Evader,
}

impl Agent {
    /// Declaration order in the scene document
    pub const ALL: [Self; 2] = [Self::Chaser, Self::Evader];

    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Chaser => "chaser",
            Self::Evader => "evader",
        }
    }

    pub const fn tint(self) -> Rgba {
        match self {
            Self::Chaser => Rgba::new(1.0, 0.545, 0.545, 1.0),
            Self::Evader => Rgba::new(0.435, 0.702, 0.722, 1.0),
        }
    }

    pub const fn spawn_x(self) -> f64 {
        match self {
            Self::Chaser => SPAWN_OFFSET_X,
            Self::Evader => -SPAWN_OFFSET_X,
        }
    }

    /// Name of this agent's sensor of the given kind
    pub fn sensor_name(self, kind: SensorKind) -> String {
        format!("{}_{}", self.prefix(), kind.suffix())
    }

    /// Template for this agent at the given rest height
    pub fn template(self, rest_z: f64) -> AgentTemplate {
        AgentTemplate {
            prefix: self.prefix().to_string(),
            tint: self.tint(),
            spawn: Vec3::new(self.spawn_x(), 0.0, rest_z),
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Parameters that distinguish one agent instance from another
#[derive(Debug, Clone, PartialEq)]
pub struct AgentTemplate {
    pub prefix: String,
    pub tint: Rgba,
    pub spawn: Vec3,
}

/// Everything one agent contributes to the document
#[derive(Debug, Clone, PartialEq)]
pub struct AgentParts {
    pub body: Body,
    pub motors: Vec<Motor>,
    pub sensors: Vec<Sensor>,
}

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    fn offset(self) -> Vec3 {
        match self {
            Self::Left => WHEEL_OFFSET,
            Self::Right => WHEEL_OFFSET.mirror_y(),
        }
    }
}

impl AgentTemplate {
    fn name(&self, part: &str) -> String {
        format!("{}_{}", self.prefix, part)
    }

    /// Body tree, motors and sensors for this agent
    pub fn build(&self) -> AgentParts {
        let body = Body::new(&self.prefix, self.spawn)
            .with_joint(Joint::new(self.name("root"), JointKind::Free))
            .with_inertial(Inertial {
                pos: Vec3::new(-0.0148, 0.0, -0.009),
                mass: 0.15,
                diaginertia: Vec3::new(0.000112, 0.000112, 0.000188),
            })
            .with_geom(
                Geom::new(
                    self.name("chassis_base"),
                    GeomShape::Mesh {
                        mesh: CHASSIS_BASE_MESH.to_string(),
                    },
                )
                .with_group(AGENT_GEOM_GROUP)
                .with_rgba(BODY_COLOR)
                .with_role(CollisionRole::Chassis),
            )
            .with_geom(
                Geom::new(
                    self.name("chassis_top"),
                    GeomShape::Mesh {
                        mesh: CHASSIS_LID_MESH.to_string(),
                    },
                )
                .with_pos(Vec3::new(0.0, 0.0, CHASSIS_LID_Z))
                .with_group(AGENT_GEOM_GROUP)
                .with_rgba(self.tint)
                .with_role(CollisionRole::Chassis),
            )
            .with_child(self.wheel(Side::Left))
            .with_child(self.wheel(Side::Right))
            .with_child(self.caster());

        let motors = [Side::Left, Side::Right]
            .into_iter()
            .map(|side| Motor {
                name: self.name(&format!("{}_motor", side.name())),
                joint: self.name(&format!("{}_wheel_joint", side.name())),
                gear: MOTOR_GEAR,
                ctrlrange: [-1.0, 1.0],
                ctrllimited: true,
            })
            .collect();

        let sensors = SensorKind::ALL
            .into_iter()
            .map(|kind| Sensor {
                name: self.name(kind.suffix()),
                kind,
                body: self.prefix.clone(),
            })
            .collect();

        AgentParts {
            body,
            motors,
            sensors,
        }
    }

    fn wheel(&self, side: Side) -> Body {
        let part = format!("{}_wheel", side.name());
        Body::new(self.name(&part), side.offset())
            .with_joint(
                Joint::new(
                    self.name(&format!("{}_joint", part)),
                    JointKind::Hinge { axis: Vec3::Y },
                )
                .with_damping(0.0023)
                .with_frictionloss(0.019),
            )
            .with_geom(
                Geom::new(
                    self.name(&format!("{}_geom", part)),
                    GeomShape::Cylinder {
                        radius: WHEEL_RADIUS,
                        half_height: WHEEL_HALF_WIDTH,
                    },
                )
                .with_euler(Vec3::new(90.0, 0.0, 0.0))
                .with_mass(0.00425)
                .with_group(AGENT_GEOM_GROUP)
                .with_rgba(METAL_COLOR)
                .with_friction(1.1, 0.005, 0.002)
                .with_role(CollisionRole::Wheel),
            )
    }

    fn caster(&self) -> Body {
        let ball = Body::new(self.name("caster_ball"), Vec3::ZERO)
            .with_joint(
                Joint::new(self.name("caster_ball_joint"), JointKind::Ball)
                    .with_damping(0.000001),
            )
            .with_geom(
                Geom::new(
                    self.name("caster_ball_geom"),
                    GeomShape::Sphere {
                        radius: CASTER_BALL_RADIUS,
                    },
                )
                .with_mass(0.002)
                .with_group(AGENT_GEOM_GROUP)
                .with_rgba(METAL_COLOR)
                .with_friction(0.7, 0.005, 0.0001)
                .with_role(CollisionRole::CasterBall),
            );

        Body::new(self.name("caster"), CASTER_OFFSET)
            .with_geom(
                Geom::new(
                    self.name("caster_housing"),
                    GeomShape::Box {
                        half_extents: Vec3::new(0.006, 0.006, 0.004),
                    },
                )
                .with_pos(Vec3::new(0.0, 0.0, 0.004))
                .with_mass(0.004)
                .with_group(AGENT_GEOM_GROUP)
                .with_rgba(BODY_COLOR)
                .with_role(CollisionRole::VisualOnly),
            )
            .with_child(ball)
    }
}
