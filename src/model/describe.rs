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

//! Model-description input and its ingestion into the binding arena.
//!
//! The descriptors mirror what the model reader (outside this crate) hands
//! over: identifiers, spatial/scalar shape, default values, reaction
//! participant lists, and the spatial roles of parameters. Ingestion turns
//! them into [`VariableBinding`]s, wires coefficient references, and
//! compiles every kinetic law and rate rule.

use super::reaction::{build_rate_rule, build_reaction};
use super::{BoundaryFace, ReactionProgram, SpatialAxis, Value, VarId, VarTable, VariableBinding};
use crate::ast::MathNode;
use crate::diagnostics::CompileError;
use crate::geometry::GridDim;
use std::collections::{HashMap, HashSet};

/// Compartment description.
#[derive(Debug, Clone)]
pub struct CompartmentDesc {
    /// Stable identifier.
    pub id: String,
    /// Spatial dimensionality (bulk compartments match the grid dimension,
    /// membranes are one lower).
    pub spatial_dimensions: usize,
    /// Compartment size, when given.
    pub size: Option<f64>,
}

/// How a species' initial value is expressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeciesInitial {
    /// Initial amount.
    Amount(f64),
    /// Initial concentration.
    Concentration(f64),
}

impl SpeciesInitial {
    fn value(self) -> f64 {
        match self {
            SpeciesInitial::Amount(v) | SpeciesInitial::Concentration(v) => v,
        }
    }
}

/// Species description.
#[derive(Debug, Clone)]
pub struct SpeciesDesc {
    /// Stable identifier.
    pub id: String,
    /// Owning compartment id.
    pub compartment: String,
    /// Whether the species is defined per grid node.
    pub is_spatial: bool,
    /// Initial value, when given.
    pub initial: Option<SpeciesInitial>,
    /// Whether the species is declared constant.
    pub constant: bool,
    /// Whether the species is a boundary-condition species.
    pub boundary_condition: bool,
}

/// Diffusion-coefficient kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffusionKind {
    /// One coefficient applied to every axis.
    Isotropic,
    /// Coefficient for a single axis.
    Anisotropic(SpatialAxis),
    /// Tensor entry keyed by two axes.
    Tensor(SpatialAxis, SpatialAxis),
}

/// Spatial role of a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterRole {
    /// Ordinary scalar parameter.
    Plain,
    /// Diffusion coefficient of a species.
    Diffusion {
        /// Target species id.
        species: String,
        /// Coefficient kind.
        kind: DiffusionKind,
    },
    /// Advection coefficient of a species along one axis.
    Advection {
        /// Target species id.
        species: String,
        /// Transport axis.
        axis: SpatialAxis,
    },
    /// Boundary condition of a species at one bounding-box face.
    BoundaryCondition {
        /// Target species id.
        species: String,
        /// Bounding-box face.
        face: BoundaryFace,
    },
    /// Synthetic per-node coordinate variable for one axis.
    CoordinateAxis {
        /// Coordinate axis.
        axis: SpatialAxis,
    },
}

/// Parameter description.
#[derive(Debug, Clone)]
pub struct ParameterDesc {
    /// Stable identifier.
    pub id: String,
    /// Literal value, when given.
    pub value: Option<f64>,
    /// Spatial role.
    pub role: ParameterRole,
}

/// Local kinetic parameter of one reaction.
#[derive(Debug, Clone)]
pub struct LocalParameterDesc {
    /// Stable identifier.
    pub id: String,
    /// Literal value, when given.
    pub value: Option<f64>,
}

/// Reactant or product reference.
#[derive(Debug, Clone)]
pub struct SpeciesRefDesc {
    /// Referenced species id.
    pub species: String,
    /// Stoichiometric coefficient.
    pub stoichiometry: f64,
}

/// Reaction description.
#[derive(Debug, Clone)]
pub struct ReactionDesc {
    /// Stable identifier.
    pub id: String,
    /// Whether the reaction belongs to the fast set.
    pub fast: bool,
    /// Ordered reactant references.
    pub reactants: Vec<SpeciesRefDesc>,
    /// Ordered product references.
    pub products: Vec<SpeciesRefDesc>,
    /// Ordered modifier species ids.
    pub modifiers: Vec<String>,
    /// Kinetic-law math; reactions without one are skipped.
    pub kinetic_law: Option<MathNode>,
    /// Local kinetic parameters scoped to this reaction.
    pub local_parameters: Vec<LocalParameterDesc>,
}

/// Rate-rule description (`d target / dt = math`).
#[derive(Debug, Clone)]
pub struct RateRuleDesc {
    /// Target binding id.
    pub variable: String,
    /// Rate expression.
    pub math: MathNode,
}

/// Full model description consumed by ingestion.
#[derive(Debug, Clone, Default)]
pub struct ModelDescription {
    pub compartments: Vec<CompartmentDesc>,
    pub species: Vec<SpeciesDesc>,
    pub parameters: Vec<ParameterDesc>,
    pub reactions: Vec<ReactionDesc>,
    pub rate_rules: Vec<RateRuleDesc>,
}

/// A model ingested into solver-ready form.
#[derive(Debug, Clone)]
pub struct Model {
    /// Binding arena for every named quantity.
    pub table: VarTable,
    /// Compiled reactions and rate rules, in ingestion order.
    pub programs: Vec<ReactionProgram>,
    /// Compiled fast reactions.
    pub fast_programs: Vec<ReactionProgram>,
    /// Synthetic axis bindings, when the description declares them.
    pub axes: [Option<VarId>; 3],
    /// The reserved simulation-time binding.
    pub time: VarId,
}

impl Model {
    /// Ingests a model description over a given grid.
    pub fn from_description(desc: &ModelDescription, grid: &GridDim) -> Result<Self, CompileError> {
        let num_indexes = grid.num_indexes();
        let num_faces = 2 * grid.dimension();
        let mut table = VarTable::new();
        let time = table.insert_time()?;
        let mut axes = [None; 3];

        // Identifiers governed by a rate rule stay unresolved until the
        // solver evaluates the rule.
        let ruled: HashSet<&str> = desc.rate_rules.iter().map(|r| r.variable.as_str()).collect();

        for compartment in &desc.compartments {
            let mut binding = VariableBinding::new(compartment.id.as_str());
            if !ruled.contains(compartment.id.as_str()) {
                binding.is_resolved = true;
                binding.value = Value::Scalar(compartment.size.unwrap_or(1.0));
            }
            table.insert(binding)?;
        }

        let compartment_dims: HashMap<&str, usize> = desc
            .compartments
            .iter()
            .map(|c| (c.id.as_str(), c.spatial_dimensions))
            .collect();

        for species in &desc.species {
            // Non-spatial species carry no per-node state and stay outside
            // the grid machinery.
            if !species.is_spatial {
                continue;
            }
            let mut binding = VariableBinding::new(species.id.as_str());
            let initial = species.initial.map(SpeciesInitial::value).unwrap_or(0.0);
            binding.value = Value::Field(vec![initial; num_indexes]);
            binding.delta = Some(vec![0.0; num_faces * num_indexes]);
            binding.is_resolved = species.initial.is_some();
            binding.in_vol = compartment_dims
                .get(species.compartment.as_str())
                .is_some_and(|&dims| dims == grid.dimension());
            table.insert(binding)?;
        }

        for parameter in &desc.parameters {
            ingest_parameter(parameter, &ruled, grid, &mut table, &mut axes)?;
        }

        let species_by_id: HashMap<&str, &SpeciesDesc> =
            desc.species.iter().map(|s| (s.id.as_str(), s)).collect();

        let mut programs = Vec::new();
        let mut fast_programs = Vec::new();
        for reaction in &desc.reactions {
            let Some(program) =
                build_reaction(reaction, &species_by_id, &mut table, num_indexes)?
            else {
                continue;
            };
            if reaction.fast {
                fast_programs.push(program);
            } else {
                programs.push(program);
            }
        }
        for rule in &desc.rate_rules {
            programs.push(build_rate_rule(rule, &species_by_id, &table, num_indexes)?);
        }

        Ok(Self {
            table,
            programs,
            fast_programs,
            axes,
            time,
        })
    }
}

/// Ingests one parameter, wiring spatial roles into their target species.
fn ingest_parameter(
    parameter: &ParameterDesc,
    ruled: &HashSet<&str>,
    grid: &GridDim,
    table: &mut VarTable,
    axes: &mut [Option<VarId>; 3],
) -> Result<(), CompileError> {
    let mut binding = VariableBinding::new(parameter.id.as_str());
    if !matches!(parameter.role, ParameterRole::CoordinateAxis { .. }) {
        if let (false, Some(value)) = (ruled.contains(parameter.id.as_str()), parameter.value) {
            binding.is_resolved = true;
            binding.value = Value::Scalar(value);
        }
    }

    match &parameter.role {
        ParameterRole::Plain => {
            table.insert(binding)?;
        }
        ParameterRole::Diffusion { species, kind } => {
            let id = table.insert(binding)?;
            let target = lookup_species(table, species, &parameter.id)?;
            let wiring = &mut table.get_mut(target).diffusion;
            match kind {
                DiffusionKind::Isotropic => {
                    wiring[0] = Some(id);
                    wiring[1] = Some(id);
                    if grid.dimension() == 3 {
                        wiring[2] = Some(id);
                    }
                }
                DiffusionKind::Anisotropic(axis) => wiring[axis.index()] = Some(id),
                DiffusionKind::Tensor(first, second) => {
                    wiring[first.index()] = Some(id);
                    wiring[second.index()] = Some(id);
                }
            }
        }
        ParameterRole::Advection { species, axis } => {
            let id = table.insert(binding)?;
            let target = lookup_species(table, species, &parameter.id)?;
            table.get_mut(target).advection[axis.index()] = Some(id);
        }
        ParameterRole::BoundaryCondition { species, face } => {
            let id = table.insert(binding)?;
            let target = lookup_species(table, species, &parameter.id)?;
            table.get_mut(target).boundary[face.index()] = Some(id);
        }
        ParameterRole::CoordinateAxis { axis } => {
            // Per-node coordinate field over the doubled-resolution grid.
            let num_indexes = grid.num_indexes();
            let mut values = vec![0.0; num_indexes];
            for (index, value) in values.iter_mut().enumerate() {
                *value = grid.axis_coordinate(*axis, index);
            }
            binding.is_resolved = true;
            binding.value = Value::Field(values);
            let id = table.insert(binding)?;
            axes[axis.index()] = Some(id);
        }
    }
    Ok(())
}

fn lookup_species(
    table: &VarTable,
    species: &str,
    parameter: &str,
) -> Result<VarId, CompileError> {
    table.lookup(species).ok_or_else(|| {
        CompileError::message_in_origin(
            format!("Spatial parameter targets unknown species '{species}'"),
            parameter,
        )
    })
}
