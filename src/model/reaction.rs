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

//! Compiled reactions and rate rules.

use super::describe::{RateRuleDesc, ReactionDesc, SpeciesDesc};
use super::{Value, VarId, VarTable, VariableBinding};
use crate::compiler::{CompiledProgram, compile_expression};
use crate::diagnostics::CompileError;
use crate::normalize::normalize;
use log::info;
use std::collections::HashMap;

/// One participating species of a compiled reaction.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Binding of the species.
    pub var: VarId,
    /// Stoichiometric coefficient (`0` for modifiers).
    pub stoichiometry: f64,
    /// Whether the solver may update this species (`false` for constant and
    /// boundary-condition species).
    pub is_mutable: bool,
}

/// A reaction or rate rule compiled for repeated evaluation.
#[derive(Debug, Clone)]
pub struct ReactionProgram {
    /// Reaction or rate-rule target identifier.
    pub id: String,
    /// Compiled rate expression.
    pub program: CompiledProgram,
    /// Reactants, then products, then modifiers; a rate rule carries its
    /// single target here.
    pub participants: Vec<Participant>,
    /// Whether any reactant/product pair lives in different bulk domains,
    /// which forces cross-domain flux handling downstream.
    pub is_mem_transport: bool,
    /// Per-node result buffer over the full volumetric grid.
    pub result: Vec<f64>,
}

/// Returns whether any reactant and product live in different compartments.
fn crosses_compartments(
    reaction: &ReactionDesc,
    species: &HashMap<&str, &SpeciesDesc>,
) -> bool {
    for reactant in &reaction.reactants {
        let Some(re) = species.get(reactant.species.as_str()) else {
            continue;
        };
        for product in &reaction.products {
            let Some(pr) = species.get(product.species.as_str()) else {
                continue;
            };
            if re.compartment != pr.compartment {
                return true;
            }
        }
    }
    false
}

/// Returns whether the solver may update a species.
fn is_mutable(desc: &SpeciesDesc) -> bool {
    !(desc.constant || desc.boundary_condition)
}

fn participant(
    species_id: &str,
    stoichiometry: f64,
    species: &HashMap<&str, &SpeciesDesc>,
    table: &VarTable,
    reaction_id: &str,
) -> Result<Participant, CompileError> {
    let var = table.lookup(species_id).ok_or_else(|| {
        CompileError::message_in_origin(
            format!("Reaction references unknown species '{species_id}'"),
            reaction_id,
        )
    })?;
    let is_mutable = species
        .get(species_id)
        .map(|desc| is_mutable(desc))
        .unwrap_or(true);
    Ok(Participant {
        var,
        stoichiometry,
        is_mutable,
    })
}

/// Builds the compiled program for one reaction.
///
/// Returns `None` when the reaction has no kinetic law. Local kinetic
/// parameters are registered in the table before the law is compiled so its
/// references resolve.
pub(super) fn build_reaction(
    reaction: &ReactionDesc,
    species: &HashMap<&str, &SpeciesDesc>,
    table: &mut VarTable,
    num_indexes: usize,
) -> Result<Option<ReactionProgram>, CompileError> {
    let Some(kinetic_law) = &reaction.kinetic_law else {
        return Ok(None);
    };

    for local in &reaction.local_parameters {
        let mut binding = VariableBinding::new(local.id.as_str());
        if let Some(value) = local.value {
            binding.is_resolved = true;
            binding.value = Value::Scalar(value);
        }
        table
            .insert(binding)
            .map_err(|err| err.with_origin(reaction.id.as_str()))?;
    }

    let is_mem_transport = crosses_compartments(reaction, species);

    let mut participants = Vec::new();
    for reactant in &reaction.reactants {
        participants.push(participant(
            &reactant.species,
            reactant.stoichiometry,
            species,
            table,
            &reaction.id,
        )?);
    }
    for product in &reaction.products {
        participants.push(participant(
            &product.species,
            product.stoichiometry,
            species,
            table,
            &reaction.id,
        )?);
    }
    for modifier in &reaction.modifiers {
        participants.push(participant(modifier, 0.0, species, table, &reaction.id)?);
    }

    let mut math = kinetic_law.clone();
    normalize(&mut math).map_err(|err| err.with_origin(reaction.id.as_str()))?;
    if is_mem_transport {
        info!("mem transport {}: {math}", reaction.id);
    } else {
        info!("reaction {}: {math}", reaction.id);
    }
    let program = compile_expression(&math, table, true)
        .map_err(|err| err.with_origin(reaction.id.as_str()))?;

    Ok(Some(ReactionProgram {
        id: reaction.id.clone(),
        program,
        participants,
        is_mem_transport,
        result: vec![0.0; num_indexes],
    }))
}

/// Builds the compiled program for one rate rule.
pub(super) fn build_rate_rule(
    rule: &RateRuleDesc,
    species: &HashMap<&str, &SpeciesDesc>,
    table: &VarTable,
    num_indexes: usize,
) -> Result<ReactionProgram, CompileError> {
    let target = table.lookup(&rule.variable).ok_or_else(|| {
        CompileError::message_in_origin(
            format!("Rate rule targets unknown binding '{}'", rule.variable),
            rule.variable.as_str(),
        )
    })?;
    let is_target_mutable = species
        .get(rule.variable.as_str())
        .map(|desc| is_mutable(desc))
        .unwrap_or(true);

    let mut math = rule.math.clone();
    normalize(&mut math).map_err(|err| err.with_origin(rule.variable.as_str()))?;
    info!("rate rule {}: {math}", rule.variable);
    let program = compile_expression(&math, table, true)
        .map_err(|err| err.with_origin(rule.variable.as_str()))?;

    Ok(ReactionProgram {
        id: rule.variable.clone(),
        program,
        participants: vec![Participant {
            var: target,
            stoichiometry: 1.0,
            is_mutable: is_target_mutable,
        }],
        is_mem_transport: false,
        result: vec![0.0; num_indexes],
    })
}
