//! Depth-map → triangle-mesh conversion with coarse simplification.
//!
//! One vertex per depth cell at `(j·pixel_size, i·pixel_size, depth[i,j])`,
//! two triangles per 2×2 cell block, consistent counter-clockwise winding
//! viewed from +z, 0-based indices. An unsimplified mesh of an `H×W` map
//! therefore has `H·W` vertices and `2·(H−1)·(W−1)` faces.
//!
//! Simplification is deliberately crude: when the natural face count
//! exceeds the target, the depth grid is uniformly subsampled by an integer
//! stride and the mesh rebuilt at the coarser resolution. The face count
//! lands near, not exactly on, the target; the builder warns and proceeds.
//! A quadric-error decimator would approximate shape better but change the
//! output topology consumers already rely on.

use crate::types::DepthMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

/// Mesh construction parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshParams {
    /// Enable stride-based decimation when the mesh exceeds `target_faces`.
    pub simplify: bool,
    /// Face budget used when `simplify` is set.
    pub target_faces: usize,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            simplify: false,
            target_faces: 50_000,
        }
    }
}

/// Triangle mesh in physical units: vertex positions plus 0-based face
/// indices with counter-clockwise winding seen from +z.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    pub vertices: Vec<[f32; 3]>,
    pub faces: Vec<[u32; 3]>,
}

/// Build a regular-grid mesh from a depth map.
pub fn build_mesh(depth: &DepthMap, params: &MeshParams) -> Mesh {
    let (w, h) = (depth.width(), depth.height());
    let natural_faces = natural_face_count(w, h);
    let stride = if params.simplify && params.target_faces > 0 && natural_faces > params.target_faces
    {
        decimation_stride(w, h, natural_faces, params.target_faces)
    } else {
        1
    };

    let mesh = grid_mesh(depth, stride);
    debug!(
        "mesh built vertices={} faces={} stride={}",
        mesh.vertices.len(),
        mesh.faces.len(),
        stride
    );
    if stride > 1 && mesh.faces.len() > params.target_faces {
        warn!(
            "mesh simplification reached {} faces, target was {}",
            mesh.faces.len(),
            params.target_faces
        );
    }
    mesh
}

#[inline]
fn natural_face_count(w: usize, h: usize) -> usize {
    if w < 2 || h < 2 {
        0
    } else {
        2 * (h - 1) * (w - 1)
    }
}

/// `ceil(sqrt(faces / target))`, clamped so the subsampled grid keeps at
/// least two rows and two columns.
fn decimation_stride(w: usize, h: usize, faces: usize, target: usize) -> usize {
    let ratio = faces as f64 / target as f64;
    let stride = ratio.sqrt().ceil() as usize;
    stride.max(1).min(w - 1).min(h - 1)
}

fn grid_mesh(depth: &DepthMap, stride: usize) -> Mesh {
    let (w, h) = (depth.width(), depth.height());
    if w == 0 || h == 0 {
        return Mesh::default();
    }

    let cols: Vec<usize> = (0..w).step_by(stride).collect();
    let rows: Vec<usize> = (0..h).step_by(stride).collect();
    let (sw, sh) = (cols.len(), rows.len());
    assert!(
        sw * sh <= u32::MAX as usize,
        "mesh exceeds u32 index range"
    );

    let px = depth.pixel_size;
    let mut vertices = Vec::with_capacity(sw * sh);
    for &i in &rows {
        for &j in &cols {
            vertices.push([j as f32 * px, i as f32 * px, depth.get(j, i)]);
        }
    }

    let mut faces = Vec::with_capacity(2 * sh.saturating_sub(1) * sw.saturating_sub(1));
    for r in 0..sh.saturating_sub(1) {
        for c in 0..sw.saturating_sub(1) {
            let a = (r * sw + c) as u32;
            let b = a + 1;
            let c2 = ((r + 1) * sw + c) as u32;
            let d = c2 + 1;
            faces.push([a, b, d]);
            faces.push([a, d, c2]);
        }
    }

    Mesh { vertices, faces }
}

/// Write the mesh as ASCII STL. Facet normals are recomputed from the
/// triangle geometry; degenerate triangles get a zero normal.
pub fn write_stl_ascii(mesh: &Mesh, name: &str, path: &Path) -> Result<(), String> {
    let mut out = String::with_capacity(mesh.faces.len() * 220 + 64);
    let _ = writeln!(out, "solid {name}");
    for face in &mesh.faces {
        let a = mesh.vertices[face[0] as usize];
        let b = mesh.vertices[face[1] as usize];
        let c = mesh.vertices[face[2] as usize];
        let n = facet_normal(a, b, c);
        let _ = writeln!(out, "  facet normal {} {} {}", n[0], n[1], n[2]);
        let _ = writeln!(out, "    outer loop");
        for v in [a, b, c] {
            let _ = writeln!(out, "      vertex {} {} {}", v[0], v[1], v[2]);
        }
        let _ = writeln!(out, "    endloop");
        let _ = writeln!(out, "  endfacet");
    }
    let _ = writeln!(out, "endsolid {name}");
    std::fs::write(path, out).map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

fn facet_normal(a: [f32; 3], b: [f32; 3], c: [f32; 3]) -> [f32; 3] {
    let u = [b[0] - a[0], b[1] - a[1], b[2] - a[2]];
    let v = [c[0] - a[0], c[1] - a[1], c[2] - a[2]];
    let n = [
        u[1] * v[2] - u[2] * v[1],
        u[2] * v[0] - u[0] * v[2],
        u[0] * v[1] - u[1] * v[0],
    ];
    let norm = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if norm <= f32::EPSILON {
        [0.0, 0.0, 0.0]
    } else {
        [n[0] / norm, n[1] / norm, n[2] / norm]
    }
}
