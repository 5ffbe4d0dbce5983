//! Sensor layout derivation
//!
//! After the engine compiles a scene it assigns every sensor a start address
//! and element count inside one flat buffer. [`SensorLayout::derive`] turns
//! that table into a name-keyed index. Addresses are taken from the engine
//! table as-is: they are an engine detail and are never recomputed from the
//! declaration order in the document.

use crate::agent::Agent;
use crate::error::{Result, SceneError};
use crate::mjcf::SensorKind;
use crate::scene::Scene;
use std::collections::{BTreeMap, HashMap};
use tag_math::{Quat, Vec3};

/// One row of the engine's compiled sensor table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRecord {
    /// Declared name; empty for engine-internal sensors
    pub name: String,
    /// Start offset in the sensor buffer
    pub address: usize,
    /// Number of elements written
    pub dimension: usize,
}

/// Engine sensor table in engine enumeration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensorTable {
    pub records: Vec<SensorRecord>,
    /// Length of the flat sensor buffer
    pub total: usize,
}

impl SensorTable {
    pub fn new(total: usize) -> Self {
        Self {
            records: Vec::new(),
            total,
        }
    }

    pub fn with_record(
        mut self,
        name: impl Into<String>,
        address: usize,
        dimension: usize,
    ) -> Self {
        self.records.push(SensorRecord {
            name: name.into(),
            address,
            dimension,
        });
        self
    }
}

/// Contiguous span of the sensor buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorRange {
    pub offset: usize,
    pub len: usize,
}

impl SensorRange {
    pub const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    #[inline]
    pub const fn end(&self) -> usize {
        self.offset + self.len
    }

    /// This range of `buffer`, if the buffer is long enough
    pub fn slice<'a>(&self, buffer: &'a [f64]) -> Option<&'a [f64]> {
        buffer.get(self.offset..self.end())
    }
}

/// Name to buffer range for every sensor declared in a scene
///
/// Rebuild it whenever the scene document changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorLayout {
    ranges: BTreeMap<String, SensorRange>,
    total: usize,
}

impl SensorLayout {
    /// Index the engine table against the sensors the document declares
    ///
    /// Fails if a declared sensor is missing from the table, a named table
    /// entry was never declared, any name repeats, ranges overlap, or a range
    /// runs past the buffer.
    pub fn derive(table: &SensorTable, declared: &[&str]) -> Result<Self> {
        let mut by_name: HashMap<&str, SensorRange> = HashMap::new();
        for record in &table.records {
            let end = record.address.checked_add(record.dimension);
            let range = match end {
                Some(end) if end <= table.total => {
                    SensorRange::new(record.address, record.dimension)
                }
                _ => {
                    return Err(SceneError::SensorOutOfBounds {
                        name: label(record),
                        end: end.unwrap_or(usize::MAX),
                        total: table.total,
                    })
                }
            };
            if record.name.is_empty() {
                log::debug!(
                    "Engine-internal sensor at {}..{}",
                    range.offset,
                    range.end()
                );
                continue;
            }
            if by_name.insert(record.name.as_str(), range).is_some() {
                return Err(SceneError::DuplicateSensor(record.name.clone()));
            }
        }

        let mut spans: Vec<&SensorRecord> = table
            .records
            .iter()
            .filter(|r| r.dimension > 0)
            .collect();
        spans.sort_by_key(|r| r.address);
        for pair in spans.windows(2) {
            if pair[0].address + pair[0].dimension > pair[1].address {
                return Err(SceneError::OverlappingSensors {
                    first: label(pair[0]),
                    second: label(pair[1]),
                });
            }
        }

        let mut ranges = BTreeMap::new();
        for &name in declared {
            let range = by_name
                .get(name)
                .copied()
                .ok_or_else(|| SceneError::MissingSensor(name.to_string()))?;
            if ranges.insert(name.to_string(), range).is_some() {
                return Err(SceneError::DuplicateSensor(name.to_string()));
            }
            log::trace!("Sensor {} -> {}..{}", name, range.offset, range.end());
        }

        if let Some(extra) = table
            .records
            .iter()
            .find(|r| !r.name.is_empty() && !ranges.contains_key(&r.name))
        {
            return Err(SceneError::UndeclaredSensor(extra.name.clone()));
        }

        Ok(Self {
            ranges,
            total: table.total,
        })
    }

    /// Derive the layout for every sensor a scene declares
    pub fn for_scene(table: &SensorTable, scene: &Scene) -> Result<Self> {
        Self::derive(table, &scene.sensor_names())
    }

    pub fn get(&self, name: &str) -> Option<SensorRange> {
        self.ranges.get(name).copied()
    }

    /// Range of a sensor that must exist
    pub fn range(&self, name: &str) -> Result<SensorRange> {
        self.get(name)
            .ok_or_else(|| SceneError::MissingSensor(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Length of the engine buffer this layout indexes
    pub fn total(&self) -> usize {
        self.total
    }

    /// Entries ordered by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, SensorRange)> {
        self.ranges.iter().map(|(name, range)| (name.as_str(), *range))
    }

    /// The four frame sensors of one agent
    pub fn agent(&self, agent: Agent) -> Result<AgentSensors> {
        let lookup = |kind: SensorKind| -> Result<SensorRange> {
            let name = agent.sensor_name(kind);
            let range = self.range(&name)?;
            if range.len != kind.dimension() {
                return Err(SceneError::SensorDimension {
                    name,
                    expected: kind.dimension(),
                    actual: range.len,
                });
            }
            Ok(range)
        };
        Ok(AgentSensors {
            agent,
            position: lookup(SensorKind::FramePos)?,
            orientation: lookup(SensorKind::FrameQuat)?,
            velocity: lookup(SensorKind::FrameLinVel)?,
            angular_velocity: lookup(SensorKind::FrameAngVel)?,
        })
    }

    pub fn chaser(&self) -> Result<AgentSensors> {
        self.agent(Agent::Chaser)
    }

    pub fn evader(&self) -> Result<AgentSensors> {
        self.agent(Agent::Evader)
    }
}

fn label(record: &SensorRecord) -> String {
    if record.name.is_empty() {
        format!("<internal@{}>", record.address)
    } else {
        record.name.clone()
    }
}

/// Buffer ranges of one agent's frame sensors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentSensors {
    pub agent: Agent,
    pub position: SensorRange,
    pub orientation: SensorRange,
    pub velocity: SensorRange,
    pub angular_velocity: SensorRange,
}

impl AgentSensors {
    /// Decode this agent's state from one step's sensor buffer
    ///
    /// Fails if a range does not match its sensor's element count or runs
    /// past the buffer.
    pub fn read(&self, buffer: &[f64]) -> Result<AgentReading> {
        let position = self.take(SensorKind::FramePos, self.position, buffer)?;
        let orientation = self.take(SensorKind::FrameQuat, self.orientation, buffer)?;
        let velocity = self.take(SensorKind::FrameLinVel, self.velocity, buffer)?;
        let angular_velocity =
            self.take(SensorKind::FrameAngVel, self.angular_velocity, buffer)?;
        Ok(AgentReading {
            position: Vec3::from(position),
            orientation: Quat::from(orientation),
            velocity: Vec3::from(velocity),
            angular_velocity: Vec3::from(angular_velocity),
        })
    }

    fn take<const N: usize>(
        &self,
        kind: SensorKind,
        range: SensorRange,
        buffer: &[f64],
    ) -> Result<[f64; N]> {
        let dimension_error = |actual: usize| SceneError::SensorDimension {
            name: self.agent.sensor_name(kind),
            expected: N,
            actual,
        };
        if range.len != N {
            return Err(dimension_error(range.len));
        }
        let values = range.slice(buffer).ok_or_else(|| SceneError::SensorOutOfBounds {
            name: self.agent.sensor_name(kind),
            end: range.end(),
            total: buffer.len(),
        })?;
        <[f64; N]>::try_from(values).map_err(|_| dimension_error(values.len()))
    }
}

/// World-frame state of one agent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentReading {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

impl AgentReading {
    /// Heading about the vertical axis
    pub fn yaw(&self) -> f64 {
        self.orientation.yaw()
    }

    /// Ground-plane speed
    pub fn planar_speed(&self) -> f64 {
        self.velocity.planar_length()
    }

    /// Rotation rate about the vertical axis
    pub fn yaw_rate(&self) -> f64 {
        self.angular_velocity.z
    }
}
