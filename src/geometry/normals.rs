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

//! Outward unit normals at membrane boundary nodes.
//!
//! Per relevant coordinate plane the estimator circles the boundary to
//! bound the search radius, fits a triangle through neighbors `step_k`
//! walk-steps away to estimate the local radius of curvature, refines
//! `step_k` from that curvature, and takes the final neighbor pair as an
//! in-plane tangent. The normal is the normalized cross product of two
//! plane tangents (or of the single tangent with the out-of-plane unit
//! vector in 2-D).

use super::contour::{GridPos, circuit_max_radius, one_step_neighbors};
use super::{
    CellClass, DomainRaster, FaceTouch, GeometryConfig, GeometryError, GridDim, Plane,
    plane_relevant,
};
use crate::model::SpatialAxis;
use log::debug;
use rs_math3d::Vec3d;

/// Returns the physical position of a walk coordinate.
fn position_of(dim: &GridDim, pos: GridPos) -> Vec3d {
    let index = dim.flatten(pos.0 as usize, pos.1 as usize, pos.2 as usize);
    let (x, y, z) = dim.position(index);
    Vec3d::new(x, y, z)
}

fn distance(a: Vec3d, b: Vec3d) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Estimates outward unit normals for one membrane raster.
///
/// `normals` spans the full doubled-resolution grid; entries are written at
/// this raster's boundary nodes only. Bulk rasters are skipped.
pub fn estimate_normals(
    raster: &DomainRaster,
    dim: &GridDim,
    config: &GeometryConfig,
    normals: &mut [Option<Vec3d>],
) -> Result<(), GeometryError> {
    if raster.is_vol {
        return Ok(());
    }
    let dimension = dim.dimension();

    for &index in &raster.boundary {
        let (x, y, z) = dim.unflatten(index);
        let start: GridPos = (x as isize, y as isize, z as isize);
        let face = raster.face_touch[index];

        // Tangent per relevant plane, indexed by Plane::index().
        let mut tangents: [Option<Vec3d>; 3] = [None; 3];
        for plane in Plane::ALL {
            if !plane_relevant(&face, plane, dimension, config.plane_policy) {
                continue;
            }
            let max_radius = circuit_max_radius(
                &raster.class,
                dim,
                plane,
                start,
                raster.boundary.len(),
                index,
            )?;
            let step_k = curvature_step(&raster.class, dim, plane, start, max_radius, index);
            let neighbors = one_step_neighbors(&raster.class, dim, plane, start, step_k);

            // A missing branch degrades the chord to the node itself.
            let here = position_of(dim, start);
            let p0 = neighbors[0].map(|n| position_of(dim, n)).unwrap_or(here);
            let p1 = neighbors[1].map(|n| position_of(dim, n)).unwrap_or(here);
            tangents[plane.index()] = Some(Vec3d::new(p0.x - p1.x, p0.y - p1.y, p0.z - p1.z));
        }

        normals[index] = Some(normal_from_tangents(
            &tangents, &face, dimension, config, index,
        )?);
    }
    Ok(())
}

/// Picks the curvature-adaptive walk distance for one node and plane.
fn curvature_step(
    class: &[CellClass],
    dim: &GridDim,
    plane: Plane,
    start: GridPos,
    max_radius: f64,
    index: usize,
) -> usize {
    let h = dim.plane_spacing(plane);
    let step_k = ((h.powf(-2.0 / 3.0) + 0.5) as usize).max(1);

    // Probe triangle through the neighbors step_k away.
    let neighbors = one_step_neighbors(class, dim, plane, start, step_k);
    let here = position_of(dim, start);
    let p0 = neighbors[0].map(|n| position_of(dim, n)).unwrap_or(here);
    let p1 = neighbors[1].map(|n| position_of(dim, n)).unwrap_or(here);
    let a = distance(here, p0);
    let b = distance(here, p1);
    let c = distance(p0, p1);

    // Heron's formula; a vanishing product means the three points are on a
    // straight line and the probe carries no curvature information.
    let heron = (a + b + c) * (-a + b + c) * (a - b + c) * (a + b - c);
    if heron <= 0.0 {
        debug!("collinear curvature probe at grid index {index} ({plane}), step_k falls back to 1");
        return 1;
    }
    let circumradius = (a * b * c) / heron.sqrt();
    let rho = max_radius.min(circumradius);
    (((rho / h).powf(2.0 / 3.0) + 0.5) as usize).max(1)
}

/// Returns the plane pair whose tangents span the surface at a node
/// touching the given axis.
fn pair_for_axis(axis: SpatialAxis) -> (Plane, Plane) {
    match axis {
        SpatialAxis::X => (Plane::Xy, Plane::Xz),
        SpatialAxis::Y => (Plane::Xy, Plane::Yz),
        SpatialAxis::Z => (Plane::Xz, Plane::Yz),
    }
}

/// Crosses and normalizes the tangent pair of one node.
fn normal_from_tangents(
    tangents: &[Option<Vec3d>; 3],
    face: &FaceTouch,
    dimension: usize,
    config: &GeometryConfig,
    index: usize,
) -> Result<Vec3d, GeometryError> {
    let (t1, t2) = if dimension == 2 {
        // In 2-D the second tangent is fixed at the out-of-plane unit vector.
        let t = tangents[Plane::Xy.index()]
            .ok_or(GeometryError::DegenerateBoundaryGeometry { index })?;
        (t, Vec3d::new(0.0, 0.0, 1.0))
    } else {
        let mut pair = None;
        for axis in config.pair_order {
            if face.touches(axis) {
                // Later axes in the configured order take priority.
                pair = Some(pair_for_axis(axis));
            }
        }
        let chosen = pair.and_then(|(pa, pb)| {
            match (tangents[pa.index()], tangents[pb.index()]) {
                (Some(ta), Some(tb)) => Some((ta, tb)),
                _ => None,
            }
        });
        match chosen {
            Some(found) => found,
            None => {
                // The preferred pair is incomplete at edge nodes; any two
                // computed tangents still span the surface.
                let mut available = Plane::ALL.iter().filter_map(|p| tangents[p.index()]);
                match (available.next(), available.next()) {
                    (Some(ta), Some(tb)) => (ta, tb),
                    _ => return Err(GeometryError::DegenerateBoundaryGeometry { index }),
                }
            }
        }
    };

    let nx = t1.y * t2.z - t1.z * t2.y;
    let ny = t1.z * t2.x - t1.x * t2.z;
    let nz = t1.x * t2.y - t1.y * t2.x;
    let len = (nx * nx + ny * ny + nz * nz).sqrt();
    if len == 0.0 || !len.is_finite() {
        return Err(GeometryError::DegenerateBoundaryGeometry { index });
    }
    Ok(Vec3d::new(nx / len, ny / len, nz / len))
}
