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

//! Membrane boundary geometry on the doubled-resolution grid.
//!
//! A domain raster classifies every node of a `(2·Xdiv−1)×(2·Ydiv−1)×
//! (2·Zdiv−1)` grid as outside, interior, or face-midpoint. The contour
//! walker traverses membrane boundaries by compass-direction adjacency on
//! that classification, the normal estimator derives outward unit normals
//! from locally fitted tangents, and the Voronoi dual builder produces the
//! inter-node distances and shared-face lengths a finite-volume surface
//! transport stencil consumes.

mod contour;
mod normals;
mod voronoi;

pub use normals::estimate_normals;
pub use voronoi::{PlaneDual, VoronoiDual, build_voronoi};

use crate::model::SpatialAxis;
use std::fmt;

/// Node classification on the doubled-resolution grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum CellClass {
    /// Not part of this domain.
    #[default]
    Outside = 0,
    /// Interior node of this domain.
    Interior = 1,
    /// Face midpoint bridging two interior nodes two steps apart.
    FaceMidpoint = 2,
}

/// Which bounding-box faces a boundary node touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FaceTouch {
    pub xp: bool,
    pub xm: bool,
    pub yp: bool,
    pub ym: bool,
    pub zp: bool,
    pub zm: bool,
}

impl FaceTouch {
    /// Returns whether the node touches both faces of an axis.
    pub fn spans(&self, axis: SpatialAxis) -> bool {
        match axis {
            SpatialAxis::X => self.xp && self.xm,
            SpatialAxis::Y => self.yp && self.ym,
            SpatialAxis::Z => self.zp && self.zm,
        }
    }

    /// Returns whether the node touches either face of an axis.
    pub fn touches(&self, axis: SpatialAxis) -> bool {
        match axis {
            SpatialAxis::X => self.xp || self.xm,
            SpatialAxis::Y => self.yp || self.ym,
            SpatialAxis::Z => self.zp || self.zm,
        }
    }
}

/// Classification raster of one named domain.
///
/// Supplied by the domain rasterizer outside this crate.
#[derive(Debug, Clone)]
pub struct DomainRaster {
    /// Domain identifier, used in diagnostics.
    pub id: String,
    /// Per-node classification over the full doubled-resolution grid.
    pub class: Vec<CellClass>,
    /// Flat grid indices of this domain's boundary nodes, in raster order.
    pub boundary: Vec<usize>,
    /// Per-node face-touch flags over the full grid.
    pub face_touch: Vec<FaceTouch>,
    /// Whether this is a bulk ("volume") domain rather than a membrane.
    pub is_vol: bool,
}

/// Coordinate plane a contour walk moves in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plane {
    Xy,
    Yz,
    Xz,
}

impl Plane {
    /// All planes, in the fixed processing order.
    pub const ALL: [Plane; 3] = [Plane::Xy, Plane::Yz, Plane::Xz];

    /// Returns the storage index of this plane.
    pub fn index(self) -> usize {
        match self {
            Plane::Xy => 0,
            Plane::Yz => 1,
            Plane::Xz => 2,
        }
    }

    /// Returns the (horizontal, vertical) walk axes of this plane.
    pub fn axes(self) -> (SpatialAxis, SpatialAxis) {
        match self {
            Plane::Xy => (SpatialAxis::X, SpatialAxis::Y),
            Plane::Yz => (SpatialAxis::Y, SpatialAxis::Z),
            Plane::Xz => (SpatialAxis::X, SpatialAxis::Z),
        }
    }

    /// Returns the axis not contained in this plane.
    pub fn excluded_axis(self) -> SpatialAxis {
        match self {
            Plane::Xy => SpatialAxis::Z,
            Plane::Yz => SpatialAxis::X,
            Plane::Xz => SpatialAxis::Y,
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Plane::Xy => "xy",
            Plane::Yz => "yz",
            Plane::Xz => "xz",
        };
        write!(f, "{name}")
    }
}

/// Extents and physical bounds of the doubled-resolution grid.
///
/// `xdiv`/`ydiv`/`zdiv` count physical cells per axis and must be at least
/// two on active axes; a 2-D grid sets `zdiv = 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridDim {
    pub xdiv: usize,
    pub ydiv: usize,
    pub zdiv: usize,
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
}

impl GridDim {
    /// Creates a 2-D grid over the given physical bounds.
    pub fn new_2d(xdiv: usize, ydiv: usize, x: (f64, f64), y: (f64, f64)) -> Self {
        Self {
            xdiv,
            ydiv,
            zdiv: 1,
            xmin: x.0,
            xmax: x.1,
            ymin: y.0,
            ymax: y.1,
            zmin: 0.0,
            zmax: 0.0,
        }
    }

    /// Creates a 3-D grid over the given physical bounds.
    pub fn new_3d(
        xdiv: usize,
        ydiv: usize,
        zdiv: usize,
        x: (f64, f64),
        y: (f64, f64),
        z: (f64, f64),
    ) -> Self {
        Self {
            xdiv,
            ydiv,
            zdiv,
            xmin: x.0,
            xmax: x.1,
            ymin: y.0,
            ymax: y.1,
            zmin: z.0,
            zmax: z.1,
        }
    }

    /// Returns the spatial dimensionality (2 or 3).
    pub fn dimension(&self) -> usize {
        if self.zdiv > 1 { 3 } else { 2 }
    }

    /// Returns the doubled-resolution extent along X.
    pub fn x_index(&self) -> usize {
        2 * self.xdiv - 1
    }

    /// Returns the doubled-resolution extent along Y.
    pub fn y_index(&self) -> usize {
        2 * self.ydiv - 1
    }

    /// Returns the doubled-resolution extent along Z (1 for 2-D grids).
    pub fn z_index(&self) -> usize {
        if self.zdiv > 1 { 2 * self.zdiv - 1 } else { 1 }
    }

    /// Returns the total node count of the doubled-resolution grid.
    pub fn num_indexes(&self) -> usize {
        self.x_index() * self.y_index() * self.z_index()
    }

    /// Returns the physical cell spacing along X.
    pub fn hx(&self) -> f64 {
        (self.xmax - self.xmin) / (self.xdiv - 1) as f64
    }

    /// Returns the physical cell spacing along Y.
    pub fn hy(&self) -> f64 {
        (self.ymax - self.ymin) / (self.ydiv - 1) as f64
    }

    /// Returns the physical cell spacing along Z (0 for 2-D grids).
    pub fn hz(&self) -> f64 {
        if self.zdiv > 1 {
            (self.zmax - self.zmin) / (self.zdiv - 1) as f64
        } else {
            0.0
        }
    }

    /// Returns the cell spacing along one axis.
    pub fn spacing(&self, axis: SpatialAxis) -> f64 {
        match axis {
            SpatialAxis::X => self.hx(),
            SpatialAxis::Y => self.hy(),
            SpatialAxis::Z => self.hz(),
        }
    }

    /// Returns the arithmetic-mean spacing of a plane's two axes.
    pub fn plane_spacing(&self, plane: Plane) -> f64 {
        let (hor, ver) = plane.axes();
        (self.spacing(hor) + self.spacing(ver)) / 2.0
    }

    /// Packs grid coordinates into a flat index.
    pub fn flatten(&self, x: usize, y: usize, z: usize) -> usize {
        z * self.y_index() * self.x_index() + y * self.x_index() + x
    }

    /// Unpacks a flat index into grid coordinates.
    pub fn unflatten(&self, index: usize) -> (usize, usize, usize) {
        let slab = self.x_index() * self.y_index();
        let z = index / slab;
        let y = (index - z * slab) / self.x_index();
        let x = index - z * slab - y * self.x_index();
        (x, y, z)
    }

    /// Returns whether signed grid coordinates lie inside the grid.
    pub fn in_bounds(&self, x: isize, y: isize, z: isize) -> bool {
        x >= 0
            && y >= 0
            && z >= 0
            && (x as usize) < self.x_index()
            && (y as usize) < self.y_index()
            && (z as usize) < self.z_index()
    }

    /// Returns the physical position of a node.
    ///
    /// Each doubled-resolution index step covers half a cell spacing.
    pub fn position(&self, index: usize) -> (f64, f64, f64) {
        let (x, y, z) = self.unflatten(index);
        (
            self.xmin + x as f64 * self.hx() / 2.0,
            self.ymin + y as f64 * self.hy() / 2.0,
            self.zmin + z as f64 * self.hz() / 2.0,
        )
    }

    /// Returns one physical coordinate of a node.
    pub fn axis_coordinate(&self, axis: SpatialAxis, index: usize) -> f64 {
        let (x, y, z) = self.position(index);
        match axis {
            SpatialAxis::X => x,
            SpatialAxis::Y => y,
            SpatialAxis::Z => z,
        }
    }
}

/// How boundary nodes are assigned to coordinate planes.
///
/// The two variants mirror the two historic formulations of the estimator:
/// inclusive assignment walks every plane whose axes the node spans,
/// exclusive assignment additionally requires that the node not span the
/// plane's excluded axis, binding edge nodes to fewer planes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanePolicy {
    /// A node is relevant to every plane whose axes it spans.
    #[default]
    Inclusive,
    /// A node additionally must not span the plane's excluded axis.
    Exclusive,
}

/// Tuning knobs for the normal estimator and Voronoi dual builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryConfig {
    /// Plane-assignment policy at corner/edge nodes.
    pub plane_policy: PlanePolicy,
    /// Axis priority for the normal's tangent-plane pair; later axes
    /// override earlier ones when a node touches several.
    pub pair_order: [SpatialAxis; 3],
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            plane_policy: PlanePolicy::Inclusive,
            pair_order: [SpatialAxis::X, SpatialAxis::Y, SpatialAxis::Z],
        }
    }
}

/// Returns whether a plane is geometrically relevant at a node.
pub(crate) fn plane_relevant(
    face: &FaceTouch,
    plane: Plane,
    dimension: usize,
    policy: PlanePolicy,
) -> bool {
    if dimension == 2 && plane != Plane::Xy {
        return false;
    }
    let (hor, ver) = plane.axes();
    let spans = face.spans(hor) || face.spans(ver);
    match policy {
        PlanePolicy::Inclusive => spans,
        PlanePolicy::Exclusive => spans && !face.spans(plane.excluded_axis()),
    }
}

/// Geometry-setup failure at a specific grid node.
///
/// These abort model setup; the offending grid index identifies the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// Tangent estimation produced a zero-length normal.
    DegenerateBoundaryGeometry { index: usize },
    /// A contour walk exhausted its step budget without closing or hitting
    /// a dead end.
    UnterminatedContourWalk { index: usize, plane: Plane },
    /// A neighbor's adjacency record holds no back-reference.
    AsymmetricAdjacency {
        index: usize,
        neighbor: usize,
        plane: Plane,
    },
    /// The dual builder ran before normals were available at a node.
    MissingNormal { index: usize },
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeometryError::DegenerateBoundaryGeometry { index } => {
                write!(f, "Degenerate boundary geometry at grid index {index}")
            }
            GeometryError::UnterminatedContourWalk { index, plane } => write!(
                f,
                "Contour walk from grid index {index} in plane {plane} did not terminate"
            ),
            GeometryError::AsymmetricAdjacency {
                index,
                neighbor,
                plane,
            } => write!(
                f,
                "Adjacency of grid index {index} to {neighbor} in plane {plane} has no back-reference"
            ),
            GeometryError::MissingNormal { index } => {
                write!(f, "No normal vector available at grid index {index}")
            }
        }
    }
}

impl std::error::Error for GeometryError {}
