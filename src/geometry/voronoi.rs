/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Generalized-Voronoi coupling weights between adjacent boundary nodes.
//!
//! For every boundary node and relevant plane, the immediate plane
//! neighbors are projected onto the node's tangent plane
//! (`proj = r_j − n (n·(r_j − r_i))`); the distance to the projection is
//! the provisional coupling distance `d`. In 3-D, both the node and the
//! projected neighbors of each plane pair are rotated into a local 2-D
//! frame through the normal's spherical angles, and intersecting the
//! perpendicular bisectors of the node–neighbor segments yields the corner
//! points whose separation is the dual face length `s`. A final pass
//! averages `d` and `s` across each unordered neighbor pair exactly once.

use super::contour::one_step_neighbors;
use super::{
    DomainRaster, GeometryConfig, GeometryError, GridDim, Plane, plane_relevant,
};
use log::debug;
use rs_math3d::{Vec2d, Vec3d};
use std::collections::HashMap;

/// Dual weights of one node in one plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaneDual {
    /// Flat grid indices of the up-to-two plane neighbors.
    pub neighbors: [Option<usize>; 2],
    /// Coupling distance `d` to each neighbor.
    pub distance: [f64; 2],
    /// Dual face length `s` opposite each neighbor.
    pub face_length: [f64; 2],
    /// Whether each direction has been symmetrized.
    pub averaged: [bool; 2],
}

/// Dual weights of one boundary node across the three planes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VoronoiDual {
    planes: [PlaneDual; 3],
}

impl VoronoiDual {
    /// Returns the dual record of one plane.
    pub fn plane(&self, plane: Plane) -> &PlaneDual {
        &self.planes[plane.index()]
    }

    fn plane_mut(&mut self, plane: Plane) -> &mut PlaneDual {
        &mut self.planes[plane.index()]
    }
}

/// Projected neighbor positions, per plane and branch, for one node.
type Projections = [[Option<Vec3d>; 2]; 3];

/// Builds Voronoi dual weights for one membrane raster.
///
/// `normals` must already be populated for this raster's boundary nodes;
/// `duals` spans the full doubled-resolution grid. Bulk rasters are skipped.
pub fn build_voronoi(
    raster: &DomainRaster,
    dim: &GridDim,
    normals: &[Option<Vec3d>],
    config: &GeometryConfig,
    duals: &mut [VoronoiDual],
) -> Result<(), GeometryError> {
    if raster.is_vol {
        return Ok(());
    }
    let dimension = dim.dimension();

    // Pass 1: adjacency, tangent-plane projection, and provisional d.
    let mut projections: HashMap<usize, Projections> = HashMap::new();
    for &index in &raster.boundary {
        let (x, y, z) = dim.unflatten(index);
        let start = (x as isize, y as isize, z as isize);
        let face = raster.face_touch[index];
        let normal = normals[index].ok_or(GeometryError::MissingNormal { index })?;
        let here = position(dim, index);
        let projected = projections.entry(index).or_default();

        for plane in Plane::ALL {
            if !plane_relevant(&face, plane, dimension, config.plane_policy) {
                continue;
            }
            let neighbors = one_step_neighbors(&raster.class, dim, plane, start, 1);
            for (branch, neighbor) in neighbors.iter().enumerate() {
                let Some(pos) = neighbor else {
                    continue;
                };
                let neighbor_index =
                    dim.flatten(pos.0 as usize, pos.1 as usize, pos.2 as usize);
                let there = position(dim, neighbor_index);

                // proj = r_j - N_i (N_i . (r_j - r_i))
                let inner = normal.x * (there.x - here.x)
                    + normal.y * (there.y - here.y)
                    + normal.z * (there.z - here.z);
                let proj = Vec3d::new(
                    there.x - normal.x * inner,
                    there.y - normal.y * inner,
                    there.z - normal.z * inner,
                );

                let dual = duals[index].plane_mut(plane);
                dual.neighbors[branch] = Some(neighbor_index);
                dual.distance[branch] = distance(here, proj);
                projected[plane.index()][branch] = Some(proj);
            }
        }
    }

    // Pass 2: dual face lengths from plane-pair bisector corners (3-D only).
    if dimension == 3 {
        for &index in &raster.boundary {
            let face = raster.face_touch[index];
            let normal = normals[index].ok_or(GeometryError::MissingNormal { index })?;
            let projected = projections.get(&index).copied().unwrap_or_default();

            // Rotate into the local frame of the node's tangent plane.
            let phi = normal.y.atan2(normal.x);
            let theta = normal.z.acos();
            let local = |p: Vec3d| -> Vec2d {
                Vec2d::new(
                    theta.cos() * (p.x * phi.cos() + p.y * phi.sin()) - p.z * theta.sin(),
                    -p.x * phi.sin() + p.y * phi.cos(),
                )
            };
            let local_here = local(position(dim, index));

            let pairs = [
                (Plane::Xy, Plane::Yz),
                (Plane::Xy, Plane::Xz),
                (Plane::Yz, Plane::Xz),
            ];
            for (first, second) in pairs {
                if !plane_relevant(&face, first, dimension, config.plane_policy)
                    || !plane_relevant(&face, second, dimension, config.plane_policy)
                {
                    continue;
                }
                let rot_first = rotate_branches(&projected[first.index()], &local);
                let rot_second = rotate_branches(&projected[second.index()], &local);
                face_lengths(
                    local_here,
                    &rot_first,
                    &rot_second,
                    duals[index].plane_mut(first),
                    index,
                );
                face_lengths(
                    local_here,
                    &rot_second,
                    &rot_first,
                    duals[index].plane_mut(second),
                    index,
                );
            }
        }
    }

    // Pass 3: symmetrization, averaging each unordered pair exactly once.
    for &index in &raster.boundary {
        for plane in Plane::ALL {
            for branch in 0..2 {
                let record = *duals[index].plane(plane);
                if record.averaged[branch] {
                    continue;
                }
                let Some(neighbor) = record.neighbors[branch] else {
                    continue;
                };
                let back = (0..2)
                    .find(|&k| duals[neighbor].plane(plane).neighbors[k] == Some(index))
                    .ok_or(GeometryError::AsymmetricAdjacency {
                        index,
                        neighbor,
                        plane,
                    })?;

                let d = (record.distance[branch]
                    + duals[neighbor].plane(plane).distance[back])
                    / 2.0;
                let s = (record.face_length[branch]
                    + duals[neighbor].plane(plane).face_length[back])
                    / 2.0;

                let forward = duals[index].plane_mut(plane);
                forward.distance[branch] = d;
                forward.face_length[branch] = s;
                forward.averaged[branch] = true;
                let backward = duals[neighbor].plane_mut(plane);
                backward.distance[back] = d;
                backward.face_length[back] = s;
                backward.averaged[back] = true;
            }
        }
    }
    Ok(())
}

fn position(dim: &GridDim, index: usize) -> Vec3d {
    let (x, y, z) = dim.position(index);
    Vec3d::new(x, y, z)
}

fn distance(a: Vec3d, b: Vec3d) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

fn rotate_branches(
    branches: &[Option<Vec3d>; 2],
    local: impl Fn(Vec3d) -> Vec2d,
) -> [Option<Vec2d>; 2] {
    [branches[0].map(&local), branches[1].map(&local)]
}

/// Writes the dual face lengths of one plane from the corner points its
/// bisectors share with the other plane of a pair.
fn face_lengths(
    here: Vec2d,
    own: &[Option<Vec2d>; 2],
    other: &[Option<Vec2d>; 2],
    dual: &mut PlaneDual,
    index: usize,
) {
    for branch in 0..2 {
        let Some(own_neighbor) = own[branch] else {
            continue;
        };
        let (Some(other_a), Some(other_b)) = (other[0], other[1]) else {
            // Both corner points are needed for a face length; edge nodes
            // with a lone cross-plane neighbor keep s at zero.
            continue;
        };
        let (Some(corner_a), Some(corner_b)) = (
            bisector_corner(here, own_neighbor, other_a),
            bisector_corner(here, own_neighbor, other_b),
        ) else {
            debug!("parallel bisectors at grid index {index}, face length left at zero");
            continue;
        };
        let dx = corner_a.x - corner_b.x;
        let dy = corner_a.y - corner_b.y;
        dual.face_length[branch] = (dx * dx + dy * dy).sqrt();
    }
}

/// Intersects the perpendicular bisectors of `here→a` and `here→b`.
///
/// Each bisector runs from the segment midpoint along the segment's
/// perpendicular; the intersection follows from the signed areas of the
/// triangles the two support lines form. Parallel bisectors have no
/// intersection.
fn bisector_corner(here: Vec2d, a: Vec2d, b: Vec2d) -> Option<Vec2d> {
    let p0 = Vec2d::new((a.x + here.x) / 2.0, (a.y + here.y) / 2.0);
    let p2 = Vec2d::new(p0.x - (a.y - here.y), p0.y + (a.x - here.x));
    let p1 = Vec2d::new((b.x + here.x) / 2.0, (b.y + here.y) / 2.0);
    let p3 = Vec2d::new(p1.x - (b.y - here.y), p1.y + (b.x - here.x));

    let area_013 = ((p3.x - p1.x) * (p0.y - p1.y) - (p3.y - p1.y) * (p0.x - p1.x)) / 2.0;
    let area_123 = ((p3.x - p1.x) * (p1.y - p2.y) - (p3.y - p1.y) * (p1.x - p2.x)) / 2.0;
    let denom = area_013 + area_123;
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    let t = area_013 / denom;
    Some(Vec2d::new(
        p0.x + (p2.x - p0.x) * t,
        p0.y + (p2.y - p0.y) * t,
    ))
}
