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

//! Flat reverse-Polish program representation.

use crate::ast::MathOp;
use crate::model::VarId;

/// Rolling slot cursor threaded through compile calls.
///
/// The cursor assigns each tree node the next program slot in post-order and
/// wraps back to zero at the declared program length, so sibling expressions
/// can share one set of flat arrays. It is owned by the caller, never by
/// process-global state, which keeps compilation re-entrant.
#[derive(Debug, Clone)]
pub struct Cursor {
    next: usize,
    limit: usize,
}

impl Cursor {
    /// Creates a cursor that wraps at `limit` slots.
    pub fn new(limit: usize) -> Self {
        Self {
            next: 0,
            limit: limit.max(1),
        }
    }

    /// Returns the slot the next node will be assigned.
    pub fn position(&self) -> usize {
        self.next
    }

    /// Claims the current slot and advances, wrapping at the limit.
    pub(crate) fn advance(&mut self) -> usize {
        let at = self.next;
        self.next += 1;
        if self.next == self.limit {
            self.next = 0;
        }
        at
    }
}

/// Constant operand slot.
///
/// A literal owns its value outright; a resolved-uniform binding is
/// referenced by arena index so edits to the binding between evaluations are
/// observed without recompiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstSlot {
    /// Literal or named-constant value.
    Value(f64),
    /// Uniform binding read from the variable table at evaluation time.
    Binding(VarId),
}

/// A compiled rate expression.
///
/// Four parallel fixed-length arrays indexed by post-order evaluation
/// position. At each index exactly one of the operator code, the constant
/// slot, or the variable slot is active; the derivative slot is only ever
/// populated alongside the variable slot.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledProgram {
    ops: Vec<Option<MathOp>>,
    consts: Vec<Option<ConstSlot>>,
    vars: Vec<Option<VarId>>,
    derivs: Vec<Option<VarId>>,
}

impl CompiledProgram {
    /// Creates an empty program with `len` slots.
    pub fn with_len(len: usize) -> Self {
        Self {
            ops: vec![None; len],
            consts: vec![None; len],
            vars: vec![None; len],
            derivs: vec![None; len],
        }
    }

    /// Returns the number of slots.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns whether the program has no slots.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Returns the operator code at a slot.
    pub fn op_at(&self, at: usize) -> Option<MathOp> {
        self.ops.get(at).copied().flatten()
    }

    /// Returns the constant operand at a slot.
    pub fn const_at(&self, at: usize) -> Option<ConstSlot> {
        self.consts.get(at).copied().flatten()
    }

    /// Returns the variable operand at a slot.
    pub fn var_at(&self, at: usize) -> Option<VarId> {
        self.vars.get(at).copied().flatten()
    }

    /// Returns the derivative reference at a slot.
    pub fn deriv_at(&self, at: usize) -> Option<VarId> {
        self.derivs.get(at).copied().flatten()
    }

    /// Stores an operator application, clearing the operand slots.
    pub(crate) fn set_operator(&mut self, at: usize, op: MathOp) {
        self.ops[at] = Some(op);
        self.consts[at] = None;
        self.vars[at] = None;
        self.derivs[at] = None;
    }

    /// Stores a constant leaf, clearing the other slots.
    pub(crate) fn set_constant(&mut self, at: usize, value: ConstSlot) {
        self.ops[at] = None;
        self.consts[at] = Some(value);
        self.vars[at] = None;
        self.derivs[at] = None;
    }

    /// Stores a per-node variable leaf, clearing the other slots.
    pub(crate) fn set_variable(&mut self, at: usize, var: VarId, deriv: Option<VarId>) {
        self.ops[at] = None;
        self.consts[at] = None;
        self.vars[at] = Some(var);
        self.derivs[at] = deriv;
    }
}
