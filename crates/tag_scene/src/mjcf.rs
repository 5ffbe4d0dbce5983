//! Typed MJCF scene model and its XML writer
//!
//! The assembler builds an [`MjcfModel`] and [`MjcfModel::validate`] rejects
//! construction defects before anything is serialized. Serialization is
//! deterministic: element and attribute order are fixed and numbers use the
//! shortest round-trip formatting.

use crate::error::{Result, SceneError};
use crate::layers::CollisionRole;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Writer;
use std::collections::{BTreeMap, HashSet};
use tag_math::Vec3;

/// Asset file name to mesh bytes
pub type Assets = BTreeMap<String, Vec<u8>>;

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba(pub [f64; 4]);

impl Rgba {
    pub const fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self([r, g, b, a])
    }
}

/// Geometric primitive of a geom
#[derive(Debug, Clone, PartialEq)]
pub enum GeomShape {
    /// Infinite plane rendered over `half_x * half_y`, with grid spacing
    Plane { half_x: f64, half_y: f64, spacing: f64 },
    /// Box with half-extents
    Box { half_extents: Vec3 },
    /// Cylinder along the local z axis
    Cylinder { radius: f64, half_height: f64 },
    Sphere { radius: f64 },
    /// Reference to a declared mesh asset
    Mesh { mesh: String },
}

impl GeomShape {
    fn type_name(&self) -> &'static str {
        match self {
            Self::Plane { .. } => "plane",
            Self::Box { .. } => "box",
            Self::Cylinder { .. } => "cylinder",
            Self::Sphere { .. } => "sphere",
            Self::Mesh { .. } => "mesh",
        }
    }

    fn size(&self) -> Option<Vec<f64>> {
        match self {
            Self::Plane { half_x, half_y, spacing } => Some(vec![*half_x, *half_y, *spacing]),
            Self::Box { half_extents } => Some(half_extents.to_array().to_vec()),
            Self::Cylinder { radius, half_height } => Some(vec![*radius, *half_height]),
            Self::Sphere { radius } => Some(vec![*radius]),
            Self::Mesh { .. } => None,
        }
    }
}

/// A geom attached to the world or a body
#[derive(Debug, Clone, PartialEq)]
pub struct Geom {
    pub name: String,
    pub shape: GeomShape,
    pub pos: Option<Vec3>,
    /// Euler angles in degrees
    pub euler: Option<Vec3>,
    pub mass: Option<f64>,
    /// Visualization group
    pub group: u8,
    pub rgba: Rgba,
    pub friction: Option<[f64; 3]>,
    /// Contact filtering; `None` means the engine default of colliding with all
    pub role: Option<CollisionRole>,
}

impl Geom {
    pub fn new(name: impl Into<String>, shape: GeomShape) -> Self {
        Self {
            name: name.into(),
            shape,
            pos: None,
            euler: None,
            mass: None,
            group: 0,
            rgba: Rgba::new(0.5, 0.5, 0.5, 1.0),
            friction: None,
            role: None,
        }
    }

    pub fn with_pos(mut self, pos: Vec3) -> Self {
        self.pos = Some(pos);
        self
    }

    pub fn with_euler(mut self, degrees: Vec3) -> Self {
        self.euler = Some(degrees);
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn with_group(mut self, group: u8) -> Self {
        self.group = group;
        self
    }

    pub fn with_rgba(mut self, rgba: Rgba) -> Self {
        self.rgba = rgba;
        self
    }

    pub fn with_friction(mut self, sliding: f64, torsional: f64, rolling: f64) -> Self {
        self.friction = Some([sliding, torsional, rolling]);
        self
    }

    pub fn with_role(mut self, role: CollisionRole) -> Self {
        self.role = Some(role);
        self
    }
}

/// Joint kinds used by the agents
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JointKind {
    /// Six degree-of-freedom root joint
    Free,
    /// Rotation about an axis
    Hinge { axis: Vec3 },
    /// Free rotation about the body origin
    Ball,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    pub kind: JointKind,
    pub damping: Option<f64>,
    pub frictionloss: Option<f64>,
}

impl Joint {
    pub fn new(name: impl Into<String>, kind: JointKind) -> Self {
        Self {
            name: name.into(),
            kind,
            damping: None,
            frictionloss: None,
        }
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = Some(damping);
        self
    }

    pub fn with_frictionloss(mut self, frictionloss: f64) -> Self {
        self.frictionloss = Some(frictionloss);
        self
    }
}

/// Explicit body inertia
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Inertial {
    pub pos: Vec3,
    pub mass: f64,
    pub diaginertia: Vec3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub name: String,
    pub pos: Vec3,
    pub inertial: Option<Inertial>,
    pub joints: Vec<Joint>,
    pub geoms: Vec<Geom>,
    pub children: Vec<Body>,
}

impl Body {
    pub fn new(name: impl Into<String>, pos: Vec3) -> Self {
        Self {
            name: name.into(),
            pos,
            inertial: None,
            joints: Vec::new(),
            geoms: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_inertial(mut self, inertial: Inertial) -> Self {
        self.inertial = Some(inertial);
        self
    }

    pub fn with_joint(mut self, joint: Joint) -> Self {
        self.joints.push(joint);
        self
    }

    pub fn with_geom(mut self, geom: Geom) -> Self {
        self.geoms.push(geom);
        self
    }

    pub fn with_child(mut self, child: Body) -> Self {
        self.children.push(child);
        self
    }

    /// This body followed by all descendants, depth first
    pub fn descendants(&self) -> Vec<&Body> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }
}

/// Direct joint torque actuator
#[derive(Debug, Clone, PartialEq)]
pub struct Motor {
    pub name: String,
    pub joint: String,
    pub gear: f64,
    pub ctrlrange: [f64; 2],
    pub ctrllimited: bool,
}

/// Frame sensor kinds, in the order they are declared per agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    FramePos,
    FrameQuat,
    FrameLinVel,
    FrameAngVel,
}

impl SensorKind {
    pub const ALL: [Self; 4] = [
        Self::FramePos,
        Self::FrameQuat,
        Self::FrameLinVel,
        Self::FrameAngVel,
    ];

    /// MJCF element name
    pub const fn tag(self) -> &'static str {
        match self {
            Self::FramePos => "framepos",
            Self::FrameQuat => "framequat",
            Self::FrameLinVel => "framelinvel",
            Self::FrameAngVel => "frameangvel",
        }
    }

    /// Suffix appended to the agent prefix to form the sensor name
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::FramePos => "pos",
            Self::FrameQuat => "quat",
            Self::FrameLinVel => "vel",
            Self::FrameAngVel => "angvel",
        }
    }

    /// Elements the engine writes for this sensor
    pub const fn dimension(self) -> usize {
        match self {
            Self::FrameQuat => 4,
            _ => 3,
        }
    }
}

/// Frame sensor attached to a body
#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub name: String,
    pub kind: SensorKind,
    pub body: String,
}

/// Mesh asset declaration
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAsset {
    pub name: String,
    pub file: String,
}

/// Complete scene description
#[derive(Debug, Clone, PartialEq)]
pub struct MjcfModel {
    pub model: String,
    pub timestep: f64,
    pub integrator: String,
    pub headlight_ambient: [f64; 3],
    pub meshes: Vec<MeshAsset>,
    pub world_geoms: Vec<Geom>,
    pub bodies: Vec<Body>,
    pub motors: Vec<Motor>,
    pub sensors: Vec<Sensor>,
}

impl MjcfModel {
    pub fn new(model: impl Into<String>, timestep: f64) -> Self {
        Self {
            model: model.into(),
            timestep,
            integrator: "implicitfast".to_string(),
            headlight_ambient: [0.5, 0.5, 0.5],
            meshes: Vec::new(),
            world_geoms: Vec::new(),
            bodies: Vec::new(),
            motors: Vec::new(),
            sensors: Vec::new(),
        }
    }

    /// Every body in the tree, depth first
    pub fn all_bodies(&self) -> Vec<&Body> {
        self.bodies.iter().flat_map(|b| b.descendants()).collect()
    }

    /// Every geom, world geoms first
    pub fn all_geoms(&self) -> Vec<&Geom> {
        self.world_geoms
            .iter()
            .chain(self.all_bodies().into_iter().flat_map(|b| b.geoms.iter()))
            .collect()
    }

    /// Every joint in the tree
    pub fn all_joints(&self) -> Vec<&Joint> {
        self.all_bodies()
            .into_iter()
            .flat_map(|b| b.joints.iter())
            .collect()
    }

    pub fn geom(&self, name: &str) -> Option<&Geom> {
        self.all_geoms().into_iter().find(|g| g.name == name)
    }

    pub fn body(&self, name: &str) -> Option<&Body> {
        self.all_bodies().into_iter().find(|b| b.name == name)
    }

    /// Sensor names in declaration order
    pub fn sensor_names(&self) -> Vec<&str> {
        self.sensors.iter().map(|s| s.name.as_str()).collect()
    }

    /// Reject anything the engine would silently accept but that breaks the
    /// scene: unassigned collision roles, bad dimensions, dangling references.
    pub fn validate(&self, assets: &Assets) -> Result<()> {
        positive("option timestep", self.timestep)?;

        let mut mesh_names = HashSet::new();
        for mesh in &self.meshes {
            unique(&mut mesh_names, "mesh", &mesh.name)?;
            if !assets.contains_key(&mesh.file) {
                return Err(SceneError::MissingAsset {
                    mesh: mesh.name.clone(),
                    file: mesh.file.clone(),
                });
            }
        }

        let mut geom_names = HashSet::new();
        for geom in self.all_geoms() {
            unique(&mut geom_names, "geom", &geom.name)?;
            validate_geom(geom, &mesh_names)?;
        }

        let mut body_names = HashSet::new();
        for body in self.all_bodies() {
            unique(&mut body_names, "body", &body.name)?;
            finite(&format!("body {} pos", body.name), body.pos)?;
            if let Some(inertial) = &body.inertial {
                positive(&format!("body {} mass", body.name), inertial.mass)?;
                for value in inertial.diaginertia.to_array() {
                    positive(&format!("body {} diaginertia", body.name), value)?;
                }
                finite(&format!("body {} inertial pos", body.name), inertial.pos)?;
            }
        }

        let mut joint_names = HashSet::new();
        let mut hinges = HashSet::new();
        for joint in self.all_joints() {
            unique(&mut joint_names, "joint", &joint.name)?;
            if let JointKind::Hinge { axis } = joint.kind {
                if axis.length() <= 0.0 || !axis.is_finite() {
                    return Err(SceneError::InvalidDimension {
                        element: format!("joint {} axis", joint.name),
                        value: axis.length(),
                    });
                }
                hinges.insert(joint.name.as_str());
            }
            for value in joint.damping.iter().chain(joint.frictionloss.iter()) {
                if !(value.is_finite() && *value >= 0.0) {
                    return Err(SceneError::InvalidDimension {
                        element: format!("joint {}", joint.name),
                        value: *value,
                    });
                }
            }
        }

        let mut motor_names = HashSet::new();
        for motor in &self.motors {
            unique(&mut motor_names, "motor", &motor.name)?;
            if !hinges.contains(motor.joint.as_str()) {
                return Err(SceneError::UnresolvedReference {
                    kind: "motor",
                    name: motor.name.clone(),
                    target: motor.joint.clone(),
                });
            }
            positive(&format!("motor {} gear", motor.name), motor.gear)?;
            let [lo, hi] = motor.ctrlrange;
            if !(lo.is_finite() && hi.is_finite() && lo < hi) {
                return Err(SceneError::InvalidDimension {
                    element: format!("motor {} ctrlrange", motor.name),
                    value: hi - lo,
                });
            }
        }

        let mut sensor_names = HashSet::new();
        for sensor in &self.sensors {
            if !sensor_names.insert(sensor.name.as_str()) {
                return Err(SceneError::DuplicateSensor(sensor.name.clone()));
            }
            if !body_names.contains(sensor.body.as_str()) {
                return Err(SceneError::UnresolvedReference {
                    kind: "sensor",
                    name: sensor.name.clone(),
                    target: sensor.body.clone(),
                });
            }
        }

        Ok(())
    }

    /// Serialize to MJCF XML
    pub fn to_xml(&self) -> Result<String> {
        let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);

        open(&mut w, el("mujoco").attr("model", &self.model))?;
        empty(
            &mut w,
            el("option")
                .attr("timestep", num(self.timestep))
                .attr("integrator", &self.integrator),
        )?;
        open(&mut w, el("visual"))?;
        empty(&mut w, el("headlight").attr("ambient", nums(&self.headlight_ambient)))?;
        close(&mut w, "visual")?;

        if !self.meshes.is_empty() {
            open(&mut w, el("asset"))?;
            for mesh in &self.meshes {
                empty(&mut w, el("mesh").attr("name", &mesh.name).attr("file", &mesh.file))?;
            }
            close(&mut w, "asset")?;
        }

        open(&mut w, el("worldbody"))?;
        for geom in &self.world_geoms {
            write_geom(&mut w, geom)?;
        }
        for body in &self.bodies {
            write_body(&mut w, body)?;
        }
        close(&mut w, "worldbody")?;

        open(&mut w, el("actuator"))?;
        for motor in &self.motors {
            empty(
                &mut w,
                el("motor")
                    .attr("name", &motor.name)
                    .attr("joint", &motor.joint)
                    .attr("gear", num(motor.gear))
                    .attr("ctrlrange", nums(&motor.ctrlrange))
                    .attr("ctrllimited", if motor.ctrllimited { "true" } else { "false" }),
            )?;
        }
        close(&mut w, "actuator")?;

        open(&mut w, el("sensor"))?;
        for sensor in &self.sensors {
            empty(
                &mut w,
                el(sensor.kind.tag())
                    .attr("name", &sensor.name)
                    .attr("objtype", "body")
                    .attr("objname", &sensor.body),
            )?;
        }
        close(&mut w, "sensor")?;

        close(&mut w, "mujoco")?;

        Ok(String::from_utf8(w.into_inner())?)
    }
}

fn validate_geom(geom: &Geom, meshes: &HashSet<&str>) -> Result<()> {
    if geom.role.is_none() {
        return Err(SceneError::MissingCollisionRole(geom.name.clone()));
    }
    match &geom.shape {
        GeomShape::Mesh { mesh } => {
            if !meshes.contains(mesh.as_str()) {
                return Err(SceneError::UnresolvedMesh {
                    geom: geom.name.clone(),
                    mesh: mesh.clone(),
                });
            }
        }
        shape => {
            for value in shape.size().unwrap_or_default() {
                positive(&format!("geom {} size", geom.name), value)?;
            }
        }
    }
    if let Some(mass) = geom.mass {
        positive(&format!("geom {} mass", geom.name), mass)?;
    }
    if let Some(pos) = geom.pos {
        finite(&format!("geom {} pos", geom.name), pos)?;
    }
    Ok(())
}

fn unique<'a>(seen: &mut HashSet<&'a str>, kind: &'static str, name: &'a str) -> Result<()> {
    if name.is_empty() || !seen.insert(name) {
        return Err(SceneError::DuplicateName {
            kind,
            name: name.to_string(),
        });
    }
    Ok(())
}

fn positive(element: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SceneError::InvalidDimension {
            element: element.to_string(),
            value,
        })
    }
}

fn finite(element: &str, v: Vec3) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(SceneError::InvalidDimension {
            element: element.to_string(),
            value: v.length(),
        })
    }
}

/// Shortest round-trip formatting; never emits `-0`
pub(crate) fn num(value: f64) -> String {
    if value == 0.0 {
        "0".to_string()
    } else {
        format!("{}", value)
    }
}

pub(crate) fn nums(values: &[f64]) -> String {
    values.iter().map(|v| num(*v)).collect::<Vec<_>>().join(" ")
}

fn vec3(v: Vec3) -> String {
    nums(&v.to_array())
}

struct Element {
    tag: &'static str,
    start: BytesStart<'static>,
}

fn el(tag: &'static str) -> Element {
    Element {
        tag,
        start: BytesStart::new(tag),
    }
}

impl Element {
    fn attr(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.start.push_attribute((key, value.as_ref()));
        self
    }
}

type XmlWriter = Writer<Vec<u8>>;

fn open(w: &mut XmlWriter, e: Element) -> Result<()> {
    w.write_event(Event::Start(e.start))?;
    Ok(())
}

fn empty(w: &mut XmlWriter, e: Element) -> Result<()> {
    w.write_event(Event::Empty(e.start))?;
    Ok(())
}

fn close(w: &mut XmlWriter, tag: &'static str) -> Result<()> {
    w.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn write_geom(w: &mut XmlWriter, geom: &Geom) -> Result<()> {
    let mut e = el("geom")
        .attr("name", &geom.name)
        .attr("type", geom.shape.type_name());
    if let Some(pos) = geom.pos {
        e = e.attr("pos", vec3(pos));
    }
    if let Some(euler) = geom.euler {
        e = e.attr("euler", vec3(euler));
    }
    e = match &geom.shape {
        GeomShape::Mesh { mesh } => e.attr("mesh", mesh),
        shape => e.attr("size", nums(&shape.size().unwrap_or_default())),
    };
    if let Some(mass) = geom.mass {
        e = e.attr("mass", num(mass));
    }
    e = e
        .attr("group", geom.group.to_string())
        .attr("rgba", nums(&geom.rgba.0));
    if let Some(friction) = geom.friction {
        e = e.attr("friction", nums(&friction));
    }
    if let Some(role) = geom.role {
        let mask = role.mask();
        e = e
            .attr("contype", mask.own.to_string())
            .attr("conaffinity", mask.collidable.to_string());
    }
    empty(w, e)
}

fn write_body(w: &mut XmlWriter, body: &Body) -> Result<()> {
    let e = el("body").attr("name", &body.name).attr("pos", vec3(body.pos));
    let tag = e.tag;
    open(w, e)?;

    for joint in &body.joints {
        let mut e = match joint.kind {
            JointKind::Free => el("freejoint").attr("name", &joint.name),
            JointKind::Hinge { axis } => el("joint")
                .attr("name", &joint.name)
                .attr("type", "hinge")
                .attr("axis", vec3(axis)),
            JointKind::Ball => el("joint").attr("name", &joint.name).attr("type", "ball"),
        };
        if let Some(damping) = joint.damping {
            e = e.attr("damping", num(damping));
        }
        if let Some(frictionloss) = joint.frictionloss {
            e = e.attr("frictionloss", num(frictionloss));
        }
        empty(w, e)?;
    }

    if let Some(inertial) = &body.inertial {
        empty(
            w,
            el("inertial")
                .attr("pos", vec3(inertial.pos))
                .attr("diaginertia", vec3(inertial.diaginertia))
                .attr("mass", num(inertial.mass)),
        )?;
    }

    for geom in &body.geoms {
        write_geom(w, geom)?;
    }
    for child in &body.children {
        write_body(w, child)?;
    }

    close(w, tag)
}
