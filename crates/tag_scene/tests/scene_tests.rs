//! End-to-end tests for tag_scene
//!
//! The engine side is stood in for by a small compiler that reads the
//! `<sensor>` section of the emitted document and packs sensors in
//! declaration order, the way the physics engine enumerates them.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use tag_scene::mesh::StlMesh;
use tag_scene::scene::chassis_assets;
use tag_scene::*;

/// (tag, name) of every sensor element, in document order
fn declared_sensors(xml: &str) -> Vec<(String, String)> {
    let mut reader = Reader::from_str(xml);
    let mut in_sensor = false;
    let mut sensors = Vec::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"sensor" => in_sensor = true,
            Event::End(e) if e.name().as_ref() == b"sensor" => in_sensor = false,
            Event::Empty(e) if in_sensor => {
                let tag = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
                let name = e
                    .try_get_attribute("name")
                    .unwrap()
                    .unwrap()
                    .unescape_value()
                    .unwrap()
                    .into_owned();
                sensors.push((tag, name));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    sensors
}

/// Geom name to (contype, conaffinity)
fn geom_masks(xml: &str) -> HashMap<String, (u32, u32)> {
    let mut reader = Reader::from_str(xml);
    let mut masks = HashMap::new();
    loop {
        match reader.read_event().unwrap() {
            Event::Empty(e) if e.name().as_ref() == b"geom" => {
                let attr = |key: &str| {
                    e.try_get_attribute(key)
                        .unwrap()
                        .unwrap()
                        .unescape_value()
                        .unwrap()
                        .into_owned()
                };
                masks.insert(
                    attr("name"),
                    (
                        attr("contype").parse().unwrap(),
                        attr("conaffinity").parse().unwrap(),
                    ),
                );
            }
            Event::Eof => break,
            _ => {}
        }
    }
    masks
}

fn tag_dimension(tag: &str) -> usize {
    match tag {
        "framequat" => 4,
        "framepos" | "framelinvel" | "frameangvel" => 3,
        other => panic!("unexpected sensor element {}", other),
    }
}

/// Pack the document's sensors into one buffer
fn compile_sensors(xml: &str) -> SensorTable {
    let mut table = SensorTable::new(0);
    for (tag, name) in declared_sensors(xml) {
        let (address, dim) = (table.total, tag_dimension(&tag));
        table = table.with_record(name, address, dim);
        table.total += dim;
    }
    table
}

#[test]
fn scene_sensor_layout_covers_every_declared_sensor() {
    let scene = assemble(&EnvironmentConfig::default()).unwrap();
    let table = compile_sensors(scene.xml());
    let layout = SensorLayout::for_scene(&table, &scene).unwrap();

    let names = scene.sensor_names();
    assert_eq!(layout.len(), names.len());
    for name in &names {
        assert!(layout.get(name).is_some(), "{} missing", name);
    }

    let mut ranges: Vec<_> = layout.iter().map(|(_, r)| r).collect();
    ranges.sort_by_key(|r| r.offset);
    for pair in ranges.windows(2) {
        assert!(pair[0].end() <= pair[1].offset);
    }
    assert!(ranges.iter().all(|r| r.end() <= layout.total()));
    assert_eq!(layout.total(), 26);
}

#[test]
fn scene_removing_a_sensor_shrinks_the_layout() {
    let config = EnvironmentConfig::default();
    let full = assemble(&config).unwrap();
    let full_layout = SensorLayout::for_scene(&compile_sensors(full.xml()), &full).unwrap();

    let mut model = assemble_model(&config).unwrap();
    model.sensors.retain(|s| s.name != "evader_angvel");
    let reduced = Scene::from_model(model, chassis_assets().unwrap()).unwrap();
    let layout = SensorLayout::for_scene(&compile_sensors(reduced.xml()), &reduced).unwrap();

    assert_eq!(layout.len(), full_layout.len() - 1);
    assert!(layout.get("evader_angvel").is_none());
    for (name, range) in layout.iter() {
        assert_eq!(full_layout.get(name), Some(range));
    }
}

#[test]
fn scene_layout_follows_engine_order() {
    let scene = assemble(&EnvironmentConfig::default()).unwrap();
    let mut reversed = SensorTable::new(0);
    for (tag, name) in declared_sensors(scene.xml()).into_iter().rev() {
        let (address, dim) = (reversed.total, tag_dimension(&tag));
        reversed = reversed.with_record(name, address, dim);
        reversed.total += dim;
    }
    let layout = SensorLayout::for_scene(&reversed, &scene).unwrap();
    assert_eq!(layout.get("evader_angvel"), Some(SensorRange::new(0, 3)));
    assert_eq!(layout.get("chaser_pos"), Some(SensorRange::new(23, 3)));
}

#[test]
fn scene_stale_table_is_rejected() {
    let config = EnvironmentConfig::default();
    let full = assemble(&config).unwrap();
    let table = compile_sensors(full.xml());

    let mut model = assemble_model(&config).unwrap();
    model.sensors.retain(|s| s.name != "chaser_vel");
    let reduced = Scene::from_model(model, chassis_assets().unwrap()).unwrap();

    assert!(matches!(
        SensorLayout::for_scene(&table, &reduced),
        Err(SceneError::UndeclaredSensor(name)) if name == "chaser_vel"
    ));
}

#[test]
fn scene_agents_read_from_sensor_buffer() {
    let scene = assemble(&EnvironmentConfig::default()).unwrap();
    let layout = SensorLayout::for_scene(&compile_sensors(scene.xml()), &scene).unwrap();
    let chaser = layout.chaser().unwrap();

    let mut buffer = vec![0.0; layout.total()];
    buffer[chaser.position.offset] = 0.3;
    buffer[chaser.orientation.offset] = 1.0;
    let reading = chaser.read(&buffer).unwrap();
    assert_eq!(reading.position.x, 0.3);
    assert_eq!(reading.yaw(), 0.0);
}

#[test]
fn scene_contact_masks_match_roles() {
    let scene = assemble(&EnvironmentConfig::default()).unwrap();
    let masks = geom_masks(scene.xml());
    for geom in scene.model().all_geoms() {
        let role = geom.role.unwrap();
        let mask = role.mask();
        assert_eq!(masks[&geom.name], (mask.own, mask.collidable), "{}", geom.name);
    }

    let contacts = |a: &str, b: &str| {
        let (ta, aa) = masks[a];
        let (tb, ab) = masks[b];
        ta & ab != 0 || tb & aa != 0
    };
    assert!(contacts("chaser_left_wheel_geom", "floor"));
    assert!(!contacts("chaser_left_wheel_geom", "wall_north"));
    assert!(!contacts("chaser_left_wheel_geom", "evader_chassis_base"));
    assert!(contacts("chaser_caster_ball_geom", "floor"));
    assert!(contacts("chaser_chassis_base", "evader_chassis_top"));
    assert!(contacts("evader_chassis_base", "wall_east"));
    assert!(!contacts("floor", "wall_south"));
    assert!(!contacts("chaser_caster_housing", "floor"));
    assert!(!contacts("chaser_caster_housing", "evader_chassis_base"));
}

#[test]
fn scene_assets_are_closed_cylinders() {
    let scene = assemble(&EnvironmentConfig::default()).unwrap();
    for mesh in &scene.model().meshes {
        let bytes = &scene.assets()[&mesh.file];
        let stl = StlMesh::from_bytes(bytes).unwrap();
        assert_eq!(stl.facets.len(), 64);
        assert!(stl.is_watertight(), "{} is open", mesh.file);
    }
}

#[test]
fn scene_generation_is_reproducible() {
    let config =
        EnvironmentConfig::from_toml_str("arena_width = 4.0\narena_height = 2.5\n").unwrap();
    let a = assemble(&config).unwrap();
    let b = assemble(&config).unwrap();
    assert_eq!(a.xml(), b.xml());
    assert_eq!(a.assets(), b.assets());

    let cache = SceneCache::new();
    let cached = cache.get_or_assemble(&config).unwrap();
    assert_eq!(cached.xml(), a.xml());
}
