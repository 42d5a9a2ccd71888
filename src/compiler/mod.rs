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

//! Linearization of normalized math trees into reverse-Polish programs.
//!
//! The compiler walks children before self, assigning each node the next
//! slot from an explicit [`Cursor`]. Leaves become constant or variable
//! operands; applications become operator codes consuming the preceding
//! operand slots. Compiling the same tree against the same table twice
//! produces identical programs.

mod eval;
mod program;

pub use eval::{EvalError, evaluate, evaluate_uniform};
pub use program::{CompiledProgram, ConstSlot, Cursor};

use crate::ast::MathNode;
use crate::diagnostics::CompileError;
use crate::model::{TIME_SYMBOL, VarId, VarTable};
use crate::normalize::MAX_EXPRESSION_DEPTH;

/// Compiles a normalized tree into a fresh program sized to its node count.
pub fn compile_expression(
    node: &MathNode,
    table: &VarTable,
    track_derivatives: bool,
) -> Result<CompiledProgram, CompileError> {
    let len = node.node_count();
    let mut program = CompiledProgram::with_len(len);
    let mut cursor = Cursor::new(len);
    compile_into(node, table, track_derivatives, &mut program, &mut cursor)?;
    Ok(program)
}

/// Compiles a normalized tree into caller-owned slots.
///
/// Sibling expressions that share flat arrays pass the same cursor to each
/// call; the cursor wraps at the program length.
pub fn compile_into(
    node: &MathNode,
    table: &VarTable,
    track_derivatives: bool,
    program: &mut CompiledProgram,
    cursor: &mut Cursor,
) -> Result<(), CompileError> {
    compile_at(node, table, track_derivatives, program, cursor, 0)
}

fn compile_at(
    node: &MathNode,
    table: &VarTable,
    track_derivatives: bool,
    program: &mut CompiledProgram,
    cursor: &mut Cursor,
    depth: usize,
) -> Result<(), CompileError> {
    if depth >= MAX_EXPRESSION_DEPTH {
        return Err(CompileError::message_only(format!(
            "Expression exceeds maximum depth {MAX_EXPRESSION_DEPTH}"
        )));
    }

    for child in node.children() {
        compile_at(child, table, track_derivatives, program, cursor, depth + 1)?;
    }

    match node {
        MathNode::Apply(op, kids) => {
            match op.arity() {
                Some(arity) if arity == kids.len() => {}
                Some(arity) => {
                    return Err(CompileError::message_only(format!(
                        "Operator '{op:?}' expects {arity} operand(s), found {}; \
                         the tree must be normalized before compilation",
                        kids.len()
                    )));
                }
                None => {
                    return Err(CompileError::message_only(
                        "piecewise must be normalized before compilation",
                    ));
                }
            }
            program.set_operator(cursor.advance(), *op);
        }
        MathNode::Real(v) => program.set_constant(cursor.advance(), ConstSlot::Value(*v)),
        MathNode::Integer(v) => {
            program.set_constant(cursor.advance(), ConstSlot::Value(*v as f64));
        }
        MathNode::Constant(c) => {
            program.set_constant(cursor.advance(), ConstSlot::Value(c.value()));
        }
        MathNode::Name(name) => {
            let var = table.lookup(name).ok_or_else(|| {
                CompileError::message_only(format!("Unresolved reference '{name}'"))
            })?;
            compile_reference(var, table, track_derivatives, program, cursor);
        }
        MathNode::Time => {
            // The implicit time symbol resolves through the table under its
            // reserved identifier.
            let var = table.lookup(TIME_SYMBOL).ok_or_else(|| {
                CompileError::message_only(format!(
                    "Time symbol '{TIME_SYMBOL}' is not registered in the variable table"
                ))
            })?;
            compile_reference(var, table, track_derivatives, program, cursor);
        }
    }
    Ok(())
}

/// Stores a resolved binding reference into the next slot.
fn compile_reference(
    var: VarId,
    table: &VarTable,
    track_derivatives: bool,
    program: &mut CompiledProgram,
    cursor: &mut Cursor,
) {
    let binding = table.get(var);
    if binding.is_uniform() {
        // A uniform quantity needs no per-node indirection; the slot reads
        // the binding's current scalar at evaluation time.
        program.set_constant(cursor.advance(), ConstSlot::Binding(var));
    } else {
        let deriv = if track_derivatives && binding.delta.is_some() {
            Some(var)
        } else {
            None
        };
        program.set_variable(cursor.advance(), var, deriv);
    }
}
