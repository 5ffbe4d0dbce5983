//! Error types for scene generation and sensor layout derivation

use thiserror::Error;

/// Scene generation errors
///
/// Every variant is deterministic for a given input, so none of them are
/// worth retrying without changing the configuration or the document.
#[derive(Debug, Error)]
pub enum SceneError {
    /// Configuration failed validation
    #[error("Invalid environment configuration: {0}")]
    InvalidConfig(String),

    /// Degenerate mesh request
    #[error("Invalid geometry: radius {radius}, height {height} (both must be positive and finite)")]
    InvalidGeometry { radius: f64, height: f64 },

    /// An element carries a non-positive or non-finite dimension
    #[error("Invalid dimension on {element}: {value}")]
    InvalidDimension { element: String, value: f64 },

    /// Physical geom was built without a collision role
    #[error("Geom '{0}' has no collision role")]
    MissingCollisionRole(String),

    /// Mesh geom references a mesh that is not declared in the asset section
    #[error("Geom '{geom}' references undeclared mesh '{mesh}'")]
    UnresolvedMesh { geom: String, mesh: String },

    /// Declared mesh has no bytes in the asset map
    #[error("Mesh '{mesh}' points at asset '{file}' which was not supplied")]
    MissingAsset { mesh: String, file: String },

    /// Two elements of the same kind share a name
    #[error("Duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },

    /// Element references something that does not exist in the document
    #[error("{kind} '{name}' references unknown target '{target}'")]
    UnresolvedReference {
        kind: &'static str,
        name: String,
        target: String,
    },

    /// Sensor declared or enumerated more than once
    #[error("Sensor '{0}' appears more than once")]
    DuplicateSensor(String),

    /// Sensor declared in the document but absent from the compiled table
    #[error("Sensor '{0}' is declared in the document but missing from the engine sensor table")]
    MissingSensor(String),

    /// Named sensor in the compiled table that the document never declared
    #[error("Sensor '{0}' is in the engine sensor table but not declared in the document")]
    UndeclaredSensor(String),

    /// Two sensor ranges share buffer elements
    #[error("Sensor ranges overlap: '{first}' and '{second}'")]
    OverlappingSensors { first: String, second: String },

    /// Sensor range runs past the end of the buffer
    #[error("Sensor '{name}' ends at {end}, past the buffer length {total}")]
    SensorOutOfBounds {
        name: String,
        end: usize,
        total: usize,
    },

    /// Sensor range has an unexpected element count
    #[error("Sensor '{name}' has {actual} elements, expected {expected}")]
    SensorDimension {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Mesh bytes could not be decoded
    #[error("Invalid mesh data: {0}")]
    InvalidMesh(String),

    /// XML error
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// IO error while writing the document
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialized document is not UTF-8
    #[error("Document is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type for scene operations
pub type Result<T> = std::result::Result<T, SceneError>;
