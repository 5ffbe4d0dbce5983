//! Scene output
//!
//! Writes a scene document and every asset it references into one directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tag_scene::scene::MODEL_NAME;
use tag_scene::Scene;

/// Write `<model>.xml` and the mesh assets into `out_dir`
///
/// The directory is created if missing and existing files are replaced.
/// Returns the path of the written document.
pub fn write_scene(scene: &Scene, out_dir: &Path) -> io::Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let document = out_dir.join(format!("{}.xml", MODEL_NAME));
    fs::write(&document, scene.xml())?;
    for (file, bytes) in scene.assets() {
        let path = out_dir.join(file);
        fs::write(&path, bytes)?;
        log::debug!("Wrote {} ({} bytes)", path.display(), bytes.len());
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tag_scene::{assemble, EnvironmentConfig};
    use tempfile::tempdir;

    #[test]
    fn test_writes_document_and_assets() {
        let scene = assemble(&EnvironmentConfig::default()).unwrap();
        let dir = tempdir().unwrap();
        let out = dir.path().join("scene");

        let document = write_scene(&scene, &out).unwrap();
        assert_eq!(document, out.join("tag.xml"));
        assert_eq!(fs::read_to_string(&document).unwrap(), scene.xml());
        for file in ["chassis_base.stl", "chassis_lid.stl"] {
            assert_eq!(fs::read(out.join(file)).unwrap(), scene.assets()[file], "{}", file);
        }
        assert_eq!(fs::read_dir(&out).unwrap().count(), 3);
    }

    #[test]
    fn test_overwrites_previous_output() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("tag.xml"), "stale").unwrap();

        let scene = assemble(&EnvironmentConfig::default().with_arena(4.0, 2.5)).unwrap();
        write_scene(&scene, dir.path()).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("tag.xml")).unwrap(), scene.xml());
    }
}
