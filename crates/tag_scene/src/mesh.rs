//! Chassis mesh synthesis and binary STL encoding

use crate::error::{Result, SceneError};
use std::collections::HashMap;

/// Angular resolution of synthesized cylinders
pub const CYLINDER_SECTIONS: usize = 16;

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// One STL facet: outward normal and counter-clockwise vertices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Facet {
    pub normal: [f32; 3],
    pub vertices: [[f32; 3]; 3],
}

/// Triangle soup as stored in a binary STL file
#[derive(Debug, Clone, PartialEq)]
pub struct StlMesh {
    pub header: [u8; HEADER_LEN],
    pub facets: Vec<Facet>,
}

/// Binary STL for a closed cylinder of the given radius and height
///
/// The cylinder is centred on the origin with its axis along z. Identical
/// inputs always yield identical bytes.
pub fn synthesize(radius: f64, height: f64) -> Result<Vec<u8>> {
    let mesh = cylinder(radius, height, CYLINDER_SECTIONS)?;
    log::debug!(
        "Synthesized cylinder mesh r={} h={} ({} facets)",
        radius,
        height,
        mesh.facets.len()
    );
    Ok(mesh.to_bytes())
}

/// Tessellate a closed cylinder
pub fn cylinder(radius: f64, height: f64, sections: usize) -> Result<StlMesh> {
    let valid = |v: f64| v.is_finite() && v > 0.0;
    if !valid(radius) || !valid(height) || sections < 3 {
        return Err(SceneError::InvalidGeometry { radius, height });
    }

    let half = height / 2.0;
    let ring = |z: f64| -> Vec<[f32; 3]> {
        (0..sections)
            .map(|i| {
                let angle = std::f64::consts::TAU * i as f64 / sections as f64;
                let (sin, cos) = angle.sin_cos();
                [(radius * cos) as f32, (radius * sin) as f32, z as f32]
            })
            .collect()
    };
    let top = ring(half);
    let bottom = ring(-half);
    let top_center = [0.0, 0.0, half as f32];
    let bottom_center = [0.0, 0.0, -half as f32];

    let mut facets = Vec::with_capacity(sections * 4);
    for i in 0..sections {
        let j = (i + 1) % sections;
        facets.push(Facet::from_vertices([top_center, top[i], top[j]]));
        facets.push(Facet::from_vertices([bottom_center, bottom[j], bottom[i]]));
        facets.push(Facet::from_vertices([bottom[i], bottom[j], top[j]]));
        facets.push(Facet::from_vertices([bottom[i], top[j], top[i]]));
    }

    Ok(StlMesh {
        header: header(&format!(
            "tag_scene cylinder r={} h={} n={}",
            radius, height, sections
        )),
        facets,
    })
}

fn header(text: &str) -> [u8; HEADER_LEN] {
    let mut header = [0u8; HEADER_LEN];
    let bytes = text.as_bytes();
    let len = bytes.len().min(HEADER_LEN);
    header[..len].copy_from_slice(&bytes[..len]);
    header
}

impl Facet {
    /// Build a facet, deriving the normal from the winding
    pub fn from_vertices(vertices: [[f32; 3]; 3]) -> Self {
        let [a, b, c] = vertices.map(|v| v.map(f64::from));
        let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
        let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
        let n = [
            u[1] * v[2] - u[2] * v[1],
            u[2] * v[0] - u[0] * v[2],
            u[0] * v[1] - u[1] * v[0],
        ];
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        let normal = if len > 0.0 {
            [(n[0] / len) as f32, (n[1] / len) as f32, (n[2] / len) as f32]
        } else {
            [0.0; 3]
        };
        Self { normal, vertices }
    }
}

impl StlMesh {
    /// Encode as binary STL
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + 4 + self.facets.len() * FACET_LEN);
        out.extend_from_slice(&self.header);
        out.extend_from_slice(&(self.facets.len() as u32).to_le_bytes());
        for facet in &self.facets {
            for value in facet.normal.iter().chain(facet.vertices.iter().flatten()) {
                out.extend_from_slice(&value.to_le_bytes());
            }
            out.extend_from_slice(&0u16.to_le_bytes());
        }
        out
    }

    /// Decode binary STL
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN + 4 {
            return Err(SceneError::InvalidMesh(format!(
                "{} bytes is shorter than the STL header",
                data.len()
            )));
        }
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&data[..HEADER_LEN]);
        let count = u32::from_le_bytes([data[80], data[81], data[82], data[83]]) as usize;
        let expected = HEADER_LEN + 4 + count * FACET_LEN;
        if data.len() != expected {
            return Err(SceneError::InvalidMesh(format!(
                "{} facets need {} bytes, got {}",
                count,
                expected,
                data.len()
            )));
        }

        let facets = data[HEADER_LEN + 4..]
            .chunks_exact(FACET_LEN)
            .map(|chunk| {
                let f = |k: usize| {
                    let o = k * 4;
                    f32::from_le_bytes([chunk[o], chunk[o + 1], chunk[o + 2], chunk[o + 3]])
                };
                Facet {
                    normal: [f(0), f(1), f(2)],
                    vertices: [[f(3), f(4), f(5)], [f(6), f(7), f(8)], [f(9), f(10), f(11)]],
                }
            })
            .collect();

        Ok(Self { header, facets })
    }

    /// Every directed edge is matched by exactly one opposite edge
    ///
    /// Holds only for closed, consistently oriented surfaces.
    pub fn is_watertight(&self) -> bool {
        let key = |v: [f32; 3]| v.map(f32::to_bits);
        let mut edges: HashMap<([u32; 3], [u32; 3]), u32> = HashMap::new();
        for facet in &self.facets {
            let [a, b, c] = facet.vertices.map(key);
            for edge in [(a, b), (b, c), (c, a)] {
                *edges.entry(edge).or_insert(0) += 1;
            }
        }
        !edges.is_empty()
            && edges
                .iter()
                .all(|(&(a, b), &n)| n == 1 && edges.get(&(b, a)) == Some(&1))
    }

    /// Enclosed volume (divergence theorem)
    pub fn volume(&self) -> f64 {
        self.facets
            .iter()
            .map(|facet| {
                let [a, b, c] = facet.vertices.map(|v| v.map(f64::from));
                (a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
                    + a[2] * (b[0] * c[1] - b[1] * c[0]))
                    / 6.0
            })
            .sum()
    }

    /// Axis-aligned bounds as (min, max)
    pub fn bounds(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::INFINITY; 3];
        let mut max = [f32::NEG_INFINITY; 3];
        for v in self.facets.iter().flat_map(|f| f.vertices.iter()) {
            for k in 0..3 {
                min[k] = min[k].min(v[k]);
                max[k] = max[k].max(v[k]);
            }
        }
        (min, max)
    }
}
