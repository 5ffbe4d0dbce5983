//! Scene assembly
//!
//! [`assemble`] turns an [`EnvironmentConfig`] into a validated MJCF
//! document plus the mesh assets it references. The result is a pure
//! function of the configuration.

use crate::agent::{
    Agent, CHASSIS_BASE_HEIGHT, CHASSIS_BASE_MESH, CHASSIS_LID_HEIGHT, CHASSIS_LID_MESH,
    CHASSIS_RADIUS,
};
use crate::arena::Arena;
use crate::config::EnvironmentConfig;
use crate::error::Result;
use crate::mesh;
use crate::mjcf::{Assets, MeshAsset, MjcfModel};

/// Model name written to the document root
pub const MODEL_NAME: &str = "tag";

/// Validated scene document and its mesh assets
///
/// Immutable once built; share it behind an `Arc` across simulation
/// instances.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    model: MjcfModel,
    xml: String,
    assets: Assets,
}

impl Scene {
    /// Validate a model against its assets and serialize it
    pub fn from_model(model: MjcfModel, assets: Assets) -> Result<Self> {
        model.validate(&assets)?;
        let xml = model.to_xml()?;
        log::debug!(
            "Assembled scene '{}': {} geoms, {} motors, {} sensors, {} assets",
            model.model,
            model.all_geoms().len(),
            model.motors.len(),
            model.sensors.len(),
            assets.len()
        );
        Ok(Self { model, xml, assets })
    }

    /// The serialized MJCF document
    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// Asset file name to bytes, as the engine expects alongside the document
    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn model(&self) -> &MjcfModel {
        &self.model
    }

    /// Sensor names in declaration order
    pub fn sensor_names(&self) -> Vec<&str> {
        self.model.sensor_names()
    }
}

/// Build the scene for a configuration
pub fn assemble(config: &EnvironmentConfig) -> Result<Scene> {
    let model = assemble_model(config)?;
    Scene::from_model(model, chassis_assets()?)
}

/// Build the unvalidated document model for a configuration
///
/// Callers that need a variant of the standard scene can edit the model and
/// pass it to [`Scene::from_model`] together with [`chassis_assets`].
pub fn assemble_model(config: &EnvironmentConfig) -> Result<MjcfModel> {
    config.validate()?;

    let mut model = MjcfModel::new(MODEL_NAME, config.timestep);
    model.meshes = [CHASSIS_BASE_MESH, CHASSIS_LID_MESH]
        .into_iter()
        .map(|name| MeshAsset {
            name: name.to_string(),
            file: asset_file(name),
        })
        .collect();
    model.world_geoms = Arena::from_config(config).geoms();

    // Declaration order here fixes the engine's actuator and sensor order.
    for agent in Agent::ALL {
        let parts = agent.template(config.agent_z).build();
        model.bodies.push(parts.body);
        model.motors.extend(parts.motors);
        model.sensors.extend(parts.sensors);
    }

    Ok(model)
}

/// Mesh assets for the chassis base and lid
pub fn chassis_assets() -> Result<Assets> {
    chassis_assets_with(mesh::synthesize)
}

/// Mesh assets, producing each mesh through `synthesize(radius, height)`
pub fn chassis_assets_with<F>(mut synthesize: F) -> Result<Assets>
where
    F: FnMut(f64, f64) -> Result<Vec<u8>>,
{
    let mut assets = Assets::new();
    assets.insert(
        asset_file(CHASSIS_BASE_MESH),
        synthesize(CHASSIS_RADIUS, CHASSIS_BASE_HEIGHT)?,
    );
    assets.insert(
        asset_file(CHASSIS_LID_MESH),
        synthesize(CHASSIS_RADIUS, CHASSIS_LID_HEIGHT)?,
    );
    Ok(assets)
}

fn asset_file(mesh: &str) -> String {
    format!("{}.stl", mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SceneError;
    use crate::layers::CollisionRole;
    use crate::mjcf::GeomShape;
    use approx::assert_relative_eq;

    #[test]
    fn test_assemble_is_deterministic() {
        let config = EnvironmentConfig::default();
        let a = assemble(&config).unwrap();
        let b = assemble(&config.clone()).unwrap();
        assert_eq!(a.xml(), b.xml());
        assert_eq!(a.assets(), b.assets());
    }

    #[test]
    fn test_invalid_config_produces_nothing() {
        let config = EnvironmentConfig::default().with_arena(-3.0, 2.0);
        assert!(matches!(assemble(&config), Err(SceneError::InvalidConfig(_))));
    }

    #[test]
    fn test_spawn_positions() {
        let config = EnvironmentConfig::default();
        let model = assemble_model(&config).unwrap();
        let chaser = model.body("chaser").unwrap();
        let evader = model.body("evader").unwrap();
        assert_relative_eq!(chaser.pos.x, 0.3);
        assert_relative_eq!(evader.pos.x, -0.3);
        assert_relative_eq!(chaser.pos.y, 0.0);
        assert_relative_eq!(chaser.pos.z, config.agent_z);
        assert_relative_eq!(evader.pos.z, config.agent_z);
    }

    #[test]
    fn test_north_wall_from_config() {
        let config = EnvironmentConfig::default().with_arena(3.0, 2.0);
        let model = assemble_model(&config).unwrap();
        let wall = model.geom("wall_north").unwrap();
        assert_relative_eq!(wall.pos.unwrap().y, 1.01, epsilon = 1e-12);
        match &wall.shape {
            GeomShape::Box { half_extents } => assert_relative_eq!(half_extents.z, 0.05),
            other => panic!("unexpected wall shape {:?}", other),
        }
    }

    #[test]
    fn test_every_geom_is_assigned_a_role() {
        let model = assemble_model(&EnvironmentConfig::default()).unwrap();
        assert!(model.all_geoms().iter().all(|g| g.role.is_some()));
        let housings: Vec<_> = model
            .all_geoms()
            .into_iter()
            .filter(|g| g.role == Some(CollisionRole::VisualOnly))
            .map(|g| g.name.clone())
            .collect();
        assert_eq!(housings, ["chaser_caster_housing", "evader_caster_housing"]);
    }

    #[test]
    fn test_mesh_references_resolve() {
        let scene = assemble(&EnvironmentConfig::default()).unwrap();
        for mesh in &scene.model().meshes {
            assert!(scene.assets().contains_key(&mesh.file));
        }
        assert_eq!(scene.assets().len(), 2);
    }

    #[test]
    fn test_missing_asset_is_construction_defect() {
        let model = assemble_model(&EnvironmentConfig::default()).unwrap();
        let mut assets = chassis_assets().unwrap();
        assets.remove("chassis_lid.stl");
        assert!(matches!(
            Scene::from_model(model, assets),
            Err(SceneError::MissingAsset { .. })
        ));
    }

    #[test]
    fn test_sensor_declaration_order() {
        let scene = assemble(&EnvironmentConfig::default()).unwrap();
        assert_eq!(
            scene.sensor_names(),
            [
                "chaser_pos",
                "chaser_quat",
                "chaser_vel",
                "chaser_angvel",
                "evader_pos",
                "evader_quat",
                "evader_vel",
                "evader_angvel",
            ]
        );
    }

    #[test]
    fn test_chassis_meshes_share_radius_differ_in_height() {
        let mut calls = Vec::new();
        chassis_assets_with(|r, h| {
            calls.push((r, h));
            mesh::synthesize(r, h)
        })
        .unwrap();
        assert_eq!(calls, [(0.05, 0.038), (0.05, 0.003)]);
    }
}
