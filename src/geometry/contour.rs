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

//! Compass-direction contour walking on the classification grid.
//!
//! A "straight" step (N/E/S/W) jumps two grid units and requires the
//! intermediate node to be a face midpoint of the domain and the destination
//! to be interior; a "diagonal" step (NE/SE/SW/NW) moves one unit each way
//! and requires only an interior destination. Directions are tested in the
//! fixed priority order N, NE, E, SE, S, SW, W, NW, and a walk never
//! immediately backtracks.

use super::{CellClass, GeometryError, GridDim, Plane};

/// Signed grid coordinates of a walk position.
pub(crate) type GridPos = (isize, isize, isize);

/// The eight compass directions, in test priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dir8 {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl Dir8 {
    pub(crate) const ALL: [Dir8; 8] = [
        Dir8::N,
        Dir8::Ne,
        Dir8::E,
        Dir8::Se,
        Dir8::S,
        Dir8::Sw,
        Dir8::W,
        Dir8::Nw,
    ];

    /// Returns the opposite direction, excluded as an immediate backtrack.
    pub(crate) fn opposite(self) -> Dir8 {
        match self {
            Dir8::N => Dir8::S,
            Dir8::Ne => Dir8::Sw,
            Dir8::E => Dir8::W,
            Dir8::Se => Dir8::Nw,
            Dir8::S => Dir8::N,
            Dir8::Sw => Dir8::Ne,
            Dir8::W => Dir8::E,
            Dir8::Nw => Dir8::Se,
        }
    }

    /// Returns the in-plane (horizontal, vertical) displacement.
    fn delta(self) -> (isize, isize) {
        match self {
            Dir8::N => (0, 2),
            Dir8::Ne => (1, 1),
            Dir8::E => (2, 0),
            Dir8::Se => (1, -1),
            Dir8::S => (0, -2),
            Dir8::Sw => (-1, -1),
            Dir8::W => (-2, 0),
            Dir8::Nw => (-1, 1),
        }
    }

    /// Returns whether this is a two-unit straight step.
    fn is_straight(self) -> bool {
        matches!(self, Dir8::N | Dir8::E | Dir8::S | Dir8::W)
    }
}

/// Extracts a position's in-plane (horizontal, vertical) components.
pub(crate) fn plane_components(plane: Plane, pos: GridPos) -> (isize, isize) {
    let (x, y, z) = pos;
    match plane {
        Plane::Xy => (x, y),
        Plane::Yz => (y, z),
        Plane::Xz => (x, z),
    }
}

/// Displaces a position within a plane, leaving the third axis fixed.
fn offset(plane: Plane, pos: GridPos, dh: isize, dv: isize) -> GridPos {
    let (x, y, z) = pos;
    match plane {
        Plane::Xy => (x + dh, y + dv, z),
        Plane::Yz => (x, y + dh, z + dv),
        Plane::Xz => (x + dh, y, z + dv),
    }
}

/// Reads the classification at a position, treating out-of-bounds as outside.
fn class_at(class: &[CellClass], dim: &GridDim, pos: GridPos) -> CellClass {
    let (x, y, z) = pos;
    if !dim.in_bounds(x, y, z) {
        return CellClass::Outside;
    }
    class[dim.flatten(x as usize, y as usize, z as usize)]
}

/// Tests one direction from a position, without backtrack exclusion.
fn direction_matches(
    class: &[CellClass],
    dim: &GridDim,
    plane: Plane,
    pos: GridPos,
    dir: Dir8,
) -> Option<GridPos> {
    let (dh, dv) = dir.delta();
    let dest = offset(plane, pos, dh, dv);
    if class_at(class, dim, dest) != CellClass::Interior {
        return None;
    }
    if dir.is_straight() {
        let mid = offset(plane, pos, dh / 2, dv / 2);
        if class_at(class, dim, mid) != CellClass::FaceMidpoint {
            return None;
        }
    }
    Some(dest)
}

/// Takes one step in the first matching direction, excluding an immediate
/// backtrack of `prev`.
pub(crate) fn try_step(
    class: &[CellClass],
    dim: &GridDim,
    plane: Plane,
    pos: GridPos,
    prev: Option<Dir8>,
) -> Option<(GridPos, Dir8)> {
    for dir in Dir8::ALL {
        if prev == Some(dir.opposite()) {
            continue;
        }
        if let Some(dest) = direction_matches(class, dim, plane, pos, dir) {
            return Some((dest, dir));
        }
    }
    None
}

/// Finds the two grid-adjacent boundary positions of a node in one plane.
///
/// The first two distinct matching directions (in priority order) seed the
/// two branches; each branch then continues for up to `step_k - 1` further
/// steps without backtracking, stopping early at a dead end. A slot stays
/// `None` when fewer than two directions match.
pub(crate) fn one_step_neighbors(
    class: &[CellClass],
    dim: &GridDim,
    plane: Plane,
    start: GridPos,
    step_k: usize,
) -> [Option<GridPos>; 2] {
    let mut found = [None, None];
    let mut slot = 0;
    for dir in Dir8::ALL {
        if slot == 2 {
            break;
        }
        let Some(first) = direction_matches(class, dim, plane, start, dir) else {
            continue;
        };
        let mut pos = first;
        let mut prev = dir;
        for _ in 1..step_k {
            match try_step(class, dim, plane, pos, Some(prev)) {
                Some((next, next_dir)) => {
                    pos = next;
                    prev = next_dir;
                }
                None => break,
            }
        }
        found[slot] = Some(pos);
        slot += 1;
    }
    found
}

/// Circles the boundary from a node and returns the largest chord
/// half-length seen.
///
/// The walk ends when it returns to its start or hits a dead end (an open
/// contour). Exhausting `budget` steps while still moving means the walk
/// can never close and is reported as unterminated.
pub(crate) fn circuit_max_radius(
    class: &[CellClass],
    dim: &GridDim,
    plane: Plane,
    start: GridPos,
    budget: usize,
    index: usize,
) -> Result<f64, GeometryError> {
    let (hor_axis, ver_axis) = plane.axes();
    let h_hor = dim.spacing(hor_axis);
    let h_ver = dim.spacing(ver_axis);
    let (start_hor, start_ver) = plane_components(plane, start);

    let mut pos = start;
    let mut prev = None;
    let mut max_radius = 0.0f64;
    for _ in 0..budget {
        match try_step(class, dim, plane, pos, prev) {
            Some((next, dir)) => {
                pos = next;
                prev = Some(dir);
            }
            // A dead end terminates an open contour.
            None => return Ok(max_radius),
        }
        let (hor, ver) = plane_components(plane, pos);
        let dx = (hor - start_hor) as f64 * h_hor / 2.0;
        let dy = (ver - start_ver) as f64 * h_ver / 2.0;
        max_radius = max_radius.max((dx * dx + dy * dy).sqrt() / 2.0);
        if pos == start {
            return Ok(max_radius);
        }
    }
    Err(GeometryError::UnterminatedContourWalk { index, plane })
}
