//! Memoized scene and mesh construction
//!
//! Scenes are pure functions of their configuration, so repeated requests for
//! the same value are served from memory. Each map stays locked while a miss
//! is computed: concurrent callers asking for the same key wait for the first
//! build instead of repeating it.

use crate::config::{ConfigKey, EnvironmentConfig};
use crate::error::Result;
use crate::mesh::{self, CYLINDER_SECTIONS};
use crate::scene::{self, Scene};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Bitwise identity of a cylinder request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshKey {
    radius: u64,
    height: u64,
    sections: usize,
}

impl MeshKey {
    pub fn new(radius: f64, height: f64, sections: usize) -> Self {
        Self {
            radius: radius.to_bits(),
            height: height.to_bits(),
            sections,
        }
    }
}

/// Cylinder meshes keyed by dimensions
#[derive(Debug, Default)]
pub struct MeshCache {
    meshes: Mutex<HashMap<MeshKey, Arc<Vec<u8>>>>,
    synthesized: AtomicU64,
}

impl MeshCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// STL bytes for a cylinder, synthesized on first request
    ///
    /// Failed requests are not remembered.
    pub fn get_or_synthesize(&self, radius: f64, height: f64) -> Result<Arc<Vec<u8>>> {
        let key = MeshKey::new(radius, height, CYLINDER_SECTIONS);
        let mut meshes = self.meshes.lock();
        if let Some(bytes) = meshes.get(&key) {
            return Ok(Arc::clone(bytes));
        }

        let bytes = Arc::new(mesh::synthesize(radius, height)?);
        self.synthesized.fetch_add(1, Ordering::Relaxed);
        meshes.insert(key, Arc::clone(&bytes));
        Ok(bytes)
    }

    /// Number of distinct meshes held
    pub fn len(&self) -> usize {
        self.meshes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.lock().is_empty()
    }

    /// How many misses have been computed so far
    pub fn synthesized(&self) -> u64 {
        self.synthesized.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.meshes.lock().clear();
    }
}

/// Assembled scenes keyed by configuration value
///
/// Returned scenes are shared and immutable, one per distinct configuration.
#[derive(Debug, Default)]
pub struct SceneCache {
    scenes: Mutex<HashMap<ConfigKey, Arc<Scene>>>,
    meshes: MeshCache,
    assembled: AtomicU64,
}

impl SceneCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scene for `config`, assembling it on first request
    pub fn get_or_assemble(&self, config: &EnvironmentConfig) -> Result<Arc<Scene>> {
        let key = config.cache_key();
        let mut scenes = self.scenes.lock();
        if let Some(scene) = scenes.get(&key) {
            log::trace!("Scene cache hit");
            return Ok(Arc::clone(scene));
        }

        let model = scene::assemble_model(config)?;
        let assets = scene::chassis_assets_with(|radius, height| {
            self.meshes
                .get_or_synthesize(radius, height)
                .map(|bytes| bytes.as_ref().clone())
        })?;
        let built = Arc::new(Scene::from_model(model, assets)?);
        self.assembled.fetch_add(1, Ordering::Relaxed);
        scenes.insert(key, Arc::clone(&built));
        log::debug!("Scene cache miss, {} scenes cached", scenes.len());
        Ok(built)
    }

    /// Number of distinct scenes held
    pub fn len(&self) -> usize {
        self.scenes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.lock().is_empty()
    }

    /// How many scenes have been assembled so far
    pub fn assembled(&self) -> u64 {
        self.assembled.load(Ordering::Relaxed)
    }

    /// Mesh memo backing the scene assets
    pub fn meshes(&self) -> &MeshCache {
        &self.meshes
    }

    /// Drop every cached scene and mesh
    pub fn clear(&self) {
        self.scenes.lock().clear();
        self.meshes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SceneError;

    #[test]
    fn test_same_config_shares_one_scene() {
        let cache = SceneCache::new();
        let config = EnvironmentConfig::default();
        let a = cache.get_or_assemble(&config).unwrap();
        let b = cache.get_or_assemble(&config.clone()).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.assembled(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cached_scene_matches_direct_assembly() {
        let cache = SceneCache::new();
        let config = EnvironmentConfig::default();
        let cached = cache.get_or_assemble(&config).unwrap();
        let direct = scene::assemble(&config).unwrap();
        assert_eq!(cached.xml(), direct.xml());
        assert_eq!(cached.assets(), direct.assets());
    }

    #[test]
    fn test_distinct_configs_reuse_meshes() {
        let cache = SceneCache::new();
        let a = cache.get_or_assemble(&EnvironmentConfig::default()).unwrap();
        let b = cache
            .get_or_assemble(&EnvironmentConfig::default().with_arena(4.0, 3.0))
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.xml(), b.xml());
        assert_eq!(cache.assembled(), 2);
        assert_eq!(cache.meshes().len(), 2);
        assert_eq!(cache.meshes().synthesized(), 2);
    }

    #[test]
    fn test_invalid_config_is_not_cached() {
        let cache = SceneCache::new();
        let config = EnvironmentConfig::default().with_timestep(0.0);
        assert!(matches!(
            cache.get_or_assemble(&config),
            Err(SceneError::InvalidConfig(_))
        ));
        assert!(cache.is_empty());
        assert_eq!(cache.assembled(), 0);
    }

    #[test]
    fn test_concurrent_requests_assemble_once() {
        let cache = SceneCache::new();
        let config = EnvironmentConfig::default();
        let scenes: Vec<Arc<Scene>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| cache.get_or_assemble(&config).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert!(scenes.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(cache.assembled(), 1);
    }

    #[test]
    fn test_mesh_cache_keys_on_dimensions() {
        let meshes = MeshCache::new();
        let a = meshes.get_or_synthesize(0.05, 0.038).unwrap();
        let b = meshes.get_or_synthesize(0.05, 0.038).unwrap();
        let c = meshes.get_or_synthesize(0.05, 0.003).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_ne!(a, c);
        assert_eq!(meshes.synthesized(), 2);

        assert!(meshes.get_or_synthesize(0.0, 0.038).is_err());
        assert_eq!(meshes.len(), 2);

        meshes.clear();
        assert!(meshes.is_empty());
    }
}
