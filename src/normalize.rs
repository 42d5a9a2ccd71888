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

//! In-place canonicalisation of math trees ahead of compilation.
//!
//! The rewrite rules turn forms the flat evaluator cannot execute into
//! algebraically equivalent ones it can:
//!
//! - `-a` becomes `(-1.0) * a`, `+a` becomes `1.0 * a`
//! - `piecewise(v1, c1, ..., o)` becomes
//!   `o * (not(c1) && ... && not(ck)) + (c1 * v1 + (c2 * v2 + ...))`
//! - one-operand logical operators other than `not` gain a literal `1`
//!   second operand; operators with more than two operands are reduced to a
//!   left-associated binary chain (`and(a, b, c)` becomes `and(and(a, b), c)`)
//! - a multiplication with a literal-zero operand collapses to the literal
//!   `0.0`, discarding both children
//!
//! A node is rewritten before its children are visited, so trees produced by
//! a rewrite are themselves normalized on the same pass.

use crate::ast::{MathNode, MathOp};
use crate::diagnostics::CompileError;

/// Maximum tree depth accepted by the normalizer and compiler.
///
/// Rate formulas are shallow in practice; the bound exists so that malformed
/// input fails with a diagnostic instead of exhausting the call stack.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

/// Rewrites a math tree into canonical form, in place.
pub fn normalize(node: &mut MathNode) -> Result<(), CompileError> {
    normalize_at(node, 0)
}

fn normalize_at(node: &mut MathNode, depth: usize) -> Result<(), CompileError> {
    if depth >= MAX_EXPRESSION_DEPTH {
        return Err(CompileError::message_only(format!(
            "Expression exceeds maximum depth {MAX_EXPRESSION_DEPTH}"
        )));
    }

    rewrite(node);
    if let MathNode::Apply(_, kids) = node {
        for kid in kids {
            normalize_at(kid, depth + 1)?;
        }
    }
    Ok(())
}

/// Applies the single most-specific matching rewrite rule to one node.
fn rewrite(node: &mut MathNode) {
    let MathNode::Apply(op, kids) = node else {
        // Leaves and unrecognized shapes pass through unmodified.
        return;
    };

    match (*op, kids.len()) {
        // Unary sign elimination.
        (MathOp::Minus, 1) => {
            let operand = kids.pop().unwrap_or(MathNode::Real(0.0));
            *node = MathNode::Apply(MathOp::Times, vec![MathNode::Real(-1.0), operand]);
        }
        (MathOp::Plus, 1) => {
            let operand = kids.pop().unwrap_or(MathNode::Real(0.0));
            *node = MathNode::Apply(MathOp::Times, vec![MathNode::Real(1.0), operand]);
        }
        (MathOp::Piecewise, _) => {
            let args = std::mem::take(kids);
            *node = lower_piecewise(args);
        }
        (MathOp::And | MathOp::Or | MathOp::Xor, 1) => {
            // An implicit second operand keeps the binary evaluator happy.
            kids.push(MathNode::Integer(1));
        }
        (MathOp::And | MathOp::Or | MathOp::Xor, n) if n > 2 => {
            let logical = *op;
            let mut args = std::mem::take(kids);
            let rest = args.split_off(2);
            // Left-associated chain: and(a, b, c) => and(and(a, b), c).
            let mut chain = MathNode::Apply(logical, args);
            for arg in rest {
                chain = MathNode::Apply(logical, vec![chain, arg]);
            }
            *node = chain;
        }
        (MathOp::Times, 2) => {
            if kids[0].is_literal_zero() || kids[1].is_literal_zero() {
                // Constant-zero short circuit drops both children outright.
                *node = MathNode::Real(0.0);
            }
        }
        _ => {}
    }
}

/// Lowers a piecewise application into plain arithmetic.
///
/// Arguments alternate `value, condition` pairs, optionally followed by a
/// trailing otherwise-expression. Pairs are consumed left-to-right. With no
/// otherwise branch the implicit "none matched" term is the literal `0`.
fn lower_piecewise(mut args: Vec<MathNode>) -> MathNode {
    let otherwise = if args.len() % 2 != 0 {
        args.pop()
    } else {
        None
    };

    let mut conditions = Vec::with_capacity(args.len() / 2);
    let mut branch_terms = Vec::with_capacity(args.len() / 2);
    let mut pairs = args.into_iter();
    while let (Some(value), Some(condition)) = (pairs.next(), pairs.next()) {
        conditions.push(condition.clone());
        branch_terms.push(MathNode::Apply(MathOp::Times, vec![condition, value]));
    }

    // Degenerate forms: a lone otherwise-expression is the whole value, and
    // an empty piecewise is the literal zero.
    if branch_terms.is_empty() {
        return otherwise.unwrap_or(MathNode::Real(0.0));
    }

    let otherwise_term = match otherwise {
        Some(expr) => {
            // The otherwise branch contributes only when no condition held.
            let nots = conditions
                .into_iter()
                .map(|c| MathNode::Apply(MathOp::Not, vec![c]))
                .collect();
            MathNode::Apply(
                MathOp::Times,
                vec![MathNode::Apply(MathOp::And, nots), expr],
            )
        }
        None => MathNode::Integer(0),
    };

    // Branch terms fold into a right-nested binary sum.
    let mut chain = branch_terms.pop().unwrap_or(MathNode::Real(0.0));
    while let Some(term) = branch_terms.pop() {
        chain = MathNode::Apply(MathOp::Plus, vec![term, chain]);
    }
    MathNode::Apply(MathOp::Plus, vec![otherwise_term, chain])
}
