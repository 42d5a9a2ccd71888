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

//! Variable bindings, the binding arena, and model ingestion.
//!
//! Every named quantity of the model (compartment, species, parameter, local
//! kinetic parameter, synthetic axis variable, simulation time) becomes one
//! [`VariableBinding`] in a [`VarTable`] arena. Compiled programs and
//! coefficient wirings reference bindings by [`VarId`] index, never by
//! address, so the solver can mutate values in place every step without
//! invalidating anything.

mod describe;
mod reaction;

pub use describe::{
    CompartmentDesc, DiffusionKind, LocalParameterDesc, Model, ModelDescription, ParameterDesc,
    ParameterRole, RateRuleDesc, ReactionDesc, SpeciesDesc, SpeciesInitial, SpeciesRefDesc,
};
pub use reaction::{Participant, ReactionProgram};

use crate::ast::MathNode;
use crate::diagnostics::CompileError;
use std::collections::HashMap;

/// Reserved identifier the current simulation time is registered under.
pub const TIME_SYMBOL: &str = "t";

/// Index of a binding inside a [`VarTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(crate) usize);

/// Spatial axis selector for per-axis coefficient wirings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpatialAxis {
    X,
    Y,
    Z,
}

impl SpatialAxis {
    /// Returns the wiring-array index of this axis.
    pub fn index(self) -> usize {
        match self {
            SpatialAxis::X => 0,
            SpatialAxis::Y => 1,
            SpatialAxis::Z => 2,
        }
    }
}

/// Bounding-box face selector for boundary-condition wirings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryFace {
    XMax,
    XMin,
    YMax,
    YMin,
    ZMax,
    ZMin,
}

impl BoundaryFace {
    /// Returns the wiring-array index of this face.
    pub fn index(self) -> usize {
        match self {
            BoundaryFace::XMax => 0,
            BoundaryFace::XMin => 1,
            BoundaryFace::YMax => 2,
            BoundaryFace::YMin => 3,
            BoundaryFace::ZMax => 4,
            BoundaryFace::ZMin => 5,
        }
    }
}

/// Binding storage: one scalar for uniform quantities, one value per grid
/// node otherwise. The enum enforces that exactly one of the two forms is
/// ever populated.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Single scalar shared by every grid node.
    Scalar(f64),
    /// One value per node of the doubled-resolution grid.
    Field(Vec<f64>),
}

impl Value {
    /// Reads the value at a grid node index.
    pub fn at(&self, index: usize) -> Option<f64> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Field(values) => values.get(index).copied(),
        }
    }
}

/// One named quantity of the model.
///
/// Created once during ingestion, mutated in place by the solver every step.
#[derive(Debug, Clone)]
pub struct VariableBinding {
    /// Stable identifier.
    pub id: String,
    /// Whether the value is already known, vs. pending evaluation of a rule.
    pub is_resolved: bool,
    /// Scalar or per-node storage.
    pub value: Value,
    /// Flux bookkeeping buffer, one value per (grid node, face direction).
    pub delta: Option<Vec<f64>>,
    /// Whether the quantity lives in a bulk compartment (species only).
    pub in_vol: bool,
    /// Diffusion-coefficient bindings keyed by spatial axis.
    pub diffusion: [Option<VarId>; 3],
    /// Advection-coefficient bindings keyed by spatial axis.
    pub advection: [Option<VarId>; 3],
    /// Boundary-condition bindings keyed by bounding-box face.
    pub boundary: [Option<VarId>; 6],
}

impl VariableBinding {
    /// Creates an unresolved binding with scalar storage.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_resolved: false,
            value: Value::Scalar(0.0),
            delta: None,
            in_vol: true,
            diffusion: [None; 3],
            advection: [None; 3],
            boundary: [None; 6],
        }
    }

    /// Returns whether this binding is a single scalar rather than a field.
    pub fn is_uniform(&self) -> bool {
        matches!(self.value, Value::Scalar(_))
    }
}

/// Arena of all variable bindings of one model.
#[derive(Debug, Clone, Default)]
pub struct VarTable {
    bindings: Vec<VariableBinding>,
    by_id: HashMap<String, VarId>,
}

impl VarTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a binding, failing on duplicate identifiers.
    pub fn insert(&mut self, binding: VariableBinding) -> Result<VarId, CompileError> {
        if self.by_id.contains_key(&binding.id) {
            return Err(CompileError::message_only(format!(
                "Duplicate binding '{}'",
                binding.id
            )));
        }
        let id = VarId(self.bindings.len());
        self.by_id.insert(binding.id.clone(), id);
        self.bindings.push(binding);
        Ok(id)
    }

    /// Inserts a resolved uniform scalar binding.
    pub fn insert_uniform(
        &mut self,
        id: impl Into<String>,
        value: f64,
    ) -> Result<VarId, CompileError> {
        let mut binding = VariableBinding::new(id);
        binding.is_resolved = true;
        binding.value = Value::Scalar(value);
        self.insert(binding)
    }

    /// Inserts a resolved per-node field binding.
    pub fn insert_field(
        &mut self,
        id: impl Into<String>,
        values: Vec<f64>,
        delta: Option<Vec<f64>>,
    ) -> Result<VarId, CompileError> {
        let mut binding = VariableBinding::new(id);
        binding.is_resolved = true;
        binding.value = Value::Field(values);
        binding.delta = delta;
        self.insert(binding)
    }

    /// Registers the reserved simulation-time binding at `t = 0`.
    pub fn insert_time(&mut self) -> Result<VarId, CompileError> {
        self.insert_uniform(TIME_SYMBOL, 0.0)
    }

    /// Looks a binding up by identifier.
    pub fn lookup(&self, id: &str) -> Option<VarId> {
        self.by_id.get(id).copied()
    }

    /// Returns a binding by index.
    pub fn get(&self, id: VarId) -> &VariableBinding {
        &self.bindings[id.0]
    }

    /// Returns a binding mutably by index.
    pub fn get_mut(&mut self, id: VarId) -> &mut VariableBinding {
        &mut self.bindings[id.0]
    }

    /// Returns the number of bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns whether the table holds no bindings.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Iterates over all bindings with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (VarId, &VariableBinding)> + '_ {
        self.bindings
            .iter()
            .enumerate()
            .map(|(i, b)| (VarId(i), b))
    }

    /// Collects the distinct bindings an expression depends on.
    ///
    /// Names without a matching binding are skipped; the compiler reports
    /// them when the expression is actually compiled.
    pub fn expression_dependencies(&self, node: &MathNode) -> Vec<VarId> {
        let mut deps = Vec::new();
        for name in node.named_references() {
            if let Some(id) = self.lookup(name) {
                if !deps.contains(&id) {
                    deps.push(id);
                }
            }
        }
        deps
    }
}
