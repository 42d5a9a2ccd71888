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

//! Stack execution of compiled reverse-Polish programs.
//!
//! The solver calls this once per grid point per time step, so evaluation is
//! a single left-to-right pass over the flat slots with an explicit value
//! stack and no tree traversal.

use super::program::{CompiledProgram, ConstSlot};
use crate::ast::MathOp;
use crate::model::{Value, VarTable};
use std::fmt;

/// Failure executing a compiled program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A slot carries neither operator nor operand.
    EmptySlot { slot: usize },
    /// An operator found fewer operands on the stack than its arity.
    StackUnderflow { slot: usize },
    /// A constant slot references a binding without scalar storage.
    NonUniformConstant { slot: usize },
    /// A variable slot was indexed past its per-node storage.
    NodeIndexOutOfRange { slot: usize, index: usize },
    /// An operator that cannot be executed directly reached evaluation.
    UnsupportedOperator { slot: usize },
    /// The final stack did not hold exactly one value.
    UnbalancedProgram { remaining: usize },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::EmptySlot { slot } => {
                write!(f, "Program slot {slot} carries neither operator nor operand")
            }
            EvalError::StackUnderflow { slot } => {
                write!(f, "Operand stack underflow at program slot {slot}")
            }
            EvalError::NonUniformConstant { slot } => write!(
                f,
                "Constant slot {slot} references a binding without scalar storage"
            ),
            EvalError::NodeIndexOutOfRange { slot, index } => write!(
                f,
                "Variable slot {slot} indexed past per-node storage (index {index})"
            ),
            EvalError::UnsupportedOperator { slot } => {
                write!(f, "Unsupported operator at program slot {slot}")
            }
            EvalError::UnbalancedProgram { remaining } => write!(
                f,
                "Program left {remaining} values on the stack instead of one"
            ),
        }
    }
}

impl std::error::Error for EvalError {}

/// Executes a compiled program at one grid node index.
pub fn evaluate(
    program: &CompiledProgram,
    table: &VarTable,
    node_index: usize,
) -> Result<f64, EvalError> {
    let mut stack: Vec<f64> = Vec::with_capacity(program.len());
    for slot in 0..program.len() {
        if let Some(op) = program.op_at(slot) {
            apply(op, slot, &mut stack)?;
        } else if let Some(constant) = program.const_at(slot) {
            let value = match constant {
                ConstSlot::Value(v) => v,
                ConstSlot::Binding(var) => match &table.get(var).value {
                    Value::Scalar(v) => *v,
                    Value::Field(_) => return Err(EvalError::NonUniformConstant { slot }),
                },
            };
            stack.push(value);
        } else if let Some(var) = program.var_at(slot) {
            let value = match &table.get(var).value {
                Value::Scalar(v) => *v,
                Value::Field(values) => *values
                    .get(node_index)
                    .ok_or(EvalError::NodeIndexOutOfRange {
                        slot,
                        index: node_index,
                    })?,
            };
            stack.push(value);
        } else {
            return Err(EvalError::EmptySlot { slot });
        }
    }

    if stack.len() != 1 {
        return Err(EvalError::UnbalancedProgram {
            remaining: stack.len(),
        });
    }
    Ok(stack[0])
}

/// Executes a program containing only uniform operands.
pub fn evaluate_uniform(program: &CompiledProgram, table: &VarTable) -> Result<f64, EvalError> {
    evaluate(program, table, 0)
}

fn pop(stack: &mut Vec<f64>, slot: usize) -> Result<f64, EvalError> {
    stack.pop().ok_or(EvalError::StackUnderflow { slot })
}

fn truth(v: f64) -> bool {
    v != 0.0
}

fn boolean(b: bool) -> f64 {
    if b { 1.0 } else { 0.0 }
}

/// Pops an operator's arguments, applies it, and pushes the result.
fn apply(op: MathOp, slot: usize, stack: &mut Vec<f64>) -> Result<(), EvalError> {
    let result = match op.arity() {
        Some(1) => {
            let a = pop(stack, slot)?;
            match op {
                MathOp::Abs => a.abs(),
                MathOp::Ceil => a.ceil(),
                MathOp::Floor => a.floor(),
                MathOp::Exp => a.exp(),
                MathOp::Ln => a.ln(),
                MathOp::Sqrt => a.sqrt(),
                MathOp::Sin => a.sin(),
                MathOp::Cos => a.cos(),
                MathOp::Tan => a.tan(),
                MathOp::Asin => a.asin(),
                MathOp::Acos => a.acos(),
                MathOp::Atan => a.atan(),
                MathOp::Sinh => a.sinh(),
                MathOp::Cosh => a.cosh(),
                MathOp::Tanh => a.tanh(),
                MathOp::Not => boolean(!truth(a)),
                _ => return Err(EvalError::UnsupportedOperator { slot }),
            }
        }
        Some(2) => {
            // Post-order pushes the left operand first.
            let b = pop(stack, slot)?;
            let a = pop(stack, slot)?;
            match op {
                MathOp::Plus => a + b,
                MathOp::Minus => a - b,
                MathOp::Times => a * b,
                MathOp::Divide => a / b,
                MathOp::Power => a.powf(b),
                // `log(base, x)` and `root(degree, x)` carry their qualifier
                // as first operand.
                MathOp::Log => b.log(a),
                MathOp::Root => b.powf(1.0 / a),
                MathOp::Eq => boolean(a == b),
                MathOp::Neq => boolean(a != b),
                MathOp::Gt => boolean(a > b),
                MathOp::Lt => boolean(a < b),
                MathOp::Geq => boolean(a >= b),
                MathOp::Leq => boolean(a <= b),
                MathOp::And => boolean(truth(a) && truth(b)),
                MathOp::Or => boolean(truth(a) || truth(b)),
                MathOp::Xor => boolean(truth(a) ^ truth(b)),
                _ => return Err(EvalError::UnsupportedOperator { slot }),
            }
        }
        _ => return Err(EvalError::UnsupportedOperator { slot }),
    };
    stack.push(result);
    Ok(())
}
