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

//! Numerical machinery for finite-volume spatial reaction-diffusion solvers.
//!
//! This crate provides:
//! - A formula parser, normalizer, and compiler that turn symbolic kinetic
//!   laws and rate rules into flat reverse-Polish programs evaluable once
//!   per grid point per time step without re-walking a tree.
//! - Model ingestion into an arena of variable bindings (compartments,
//!   species, parameters, synthetic axis variables) referenced by index.
//! - Membrane boundary geometry on the doubled-resolution grid: contour
//!   walking, curvature-adaptive outward unit normals, and
//!   generalized-Voronoi coupling weights (inter-node distances and dual
//!   face lengths) for surface transport stencils.
//!
//! # Pipeline
//!
//! 1. Parse rate formulas into [`MathNode`] trees ([`parse_formula`]).
//! 2. Normalize and compile them against a [`VarTable`]
//!    ([`compile_formula`], or [`Model::from_description`] for a whole
//!    model).
//! 3. Rasterize domains outside this crate into [`DomainRaster`]s.
//! 4. Build normals and dual weights ([`build_surface_geometry`]).
//! 5. Hand the compiled programs, normals, and duals to the time stepper.

mod ast;
mod compiler;
mod diagnostics;
mod geometry;
mod model;
mod normalize;
mod parser;

#[cfg(test)]
mod tests;

pub use ast::{MathConstant, MathNode, MathOp, SourceSpan};
pub use compiler::{
    CompiledProgram, ConstSlot, Cursor, EvalError, compile_expression, compile_into, evaluate,
    evaluate_uniform,
};
pub use diagnostics::CompileError;
pub use geometry::{
    CellClass, DomainRaster, FaceTouch, GeometryConfig, GeometryError, GridDim, Plane, PlaneDual,
    PlanePolicy, VoronoiDual, build_voronoi, estimate_normals,
};
pub use model::{
    BoundaryFace, CompartmentDesc, DiffusionKind, LocalParameterDesc, Model, ModelDescription,
    ParameterDesc, ParameterRole, Participant, RateRuleDesc, ReactionDesc, ReactionProgram,
    SpatialAxis, SpeciesDesc, SpeciesInitial, SpeciesRefDesc, TIME_SYMBOL, Value, VarId, VarTable,
    VariableBinding,
};
pub use normalize::{MAX_EXPRESSION_DEPTH, normalize};
pub use parser::parse_formula;

use log::info;
use rs_math3d::Vec3d;

/// Per-node normals and dual weights of all membrane domains.
#[derive(Debug, Clone)]
pub struct SurfaceGeometry {
    /// Outward unit normal per grid node, defined at membrane boundary
    /// nodes.
    pub normals: Vec<Option<Vec3d>>,
    /// Voronoi dual record per grid node.
    pub duals: Vec<VoronoiDual>,
}

/// Builds normals and Voronoi dual weights for every membrane raster.
///
/// Normals for a domain are always completed before its dual weights are
/// derived, since the dual builder reads them.
pub fn build_surface_geometry(
    rasters: &[DomainRaster],
    dim: &GridDim,
    config: &GeometryConfig,
) -> Result<SurfaceGeometry, GeometryError> {
    let mut normals = vec![None; dim.num_indexes()];
    for raster in rasters {
        if raster.is_vol {
            continue;
        }
        info!(
            "estimating normals for membrane '{}' ({} boundary nodes)",
            raster.id,
            raster.boundary.len()
        );
        estimate_normals(raster, dim, config, &mut normals)?;
    }

    let mut duals = vec![VoronoiDual::default(); dim.num_indexes()];
    for raster in rasters {
        if raster.is_vol {
            continue;
        }
        info!("building Voronoi dual for membrane '{}'", raster.id);
        build_voronoi(raster, dim, &normals, config, &mut duals)?;
    }

    Ok(SurfaceGeometry { normals, duals })
}

/// Parses, normalizes, and compiles one formula against a variable table.
pub fn compile_formula(
    source: &str,
    table: &VarTable,
    track_derivatives: bool,
) -> Result<CompiledProgram, CompileError> {
    let mut math = parse_formula(source)?;
    normalize(&mut math)?;
    compile_expression(&math, table, track_derivatives)
}
