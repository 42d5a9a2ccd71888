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

//! Symbolic math tree for kinetic laws and rate rules.
//!
//! The parser creates this tree first. The normalizer rewrites it in place
//! into a canonical form, and the compiler then linearizes it into a flat
//! reverse-Polish program.

use nom_locate::LocatedSpan;
use std::fmt;

/// Parser input span type carrying byte offsets and line/column info.
pub type Span<'a> = LocatedSpan<&'a str>;

/// Source range and anchor position for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpan {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based UTF-8 column.
    pub column: usize,
}

impl SourceSpan {
    /// Creates a source span from parser start/end positions.
    pub fn from_bounds(start: Span<'_>, end: Span<'_>) -> Self {
        Self {
            start: start.location_offset(),
            end: end.location_offset(),
            line: start.location_line() as usize,
            column: start.get_utf8_column(),
        }
    }

    /// Returns span length in bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Returns whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Named math constants with fixed numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathConstant {
    /// Euler's number.
    E,
    /// The circle constant.
    Pi,
    /// Boolean true, evaluated as `1.0`.
    True,
    /// Boolean false, evaluated as `0.0`.
    False,
    /// Avogadro's number.
    Avogadro,
}

impl MathConstant {
    /// Returns the numeric value of this constant.
    pub fn value(self) -> f64 {
        match self {
            MathConstant::E => std::f64::consts::E,
            MathConstant::Pi => std::f64::consts::PI,
            MathConstant::True => 1.0,
            MathConstant::False => 0.0,
            MathConstant::Avogadro => 6.022_136_7e23,
        }
    }

    /// Returns the identifier this constant is written as.
    pub fn name(self) -> &'static str {
        match self {
            MathConstant::E => "exponentiale",
            MathConstant::Pi => "pi",
            MathConstant::True => "true",
            MathConstant::False => "false",
            MathConstant::Avogadro => "avogadro",
        }
    }
}

/// Operator and function codes applied to child expressions.
///
/// The classification mirrors the four groups the compiler cares about:
/// arithmetic operators, named functions, relational operators, and logical
/// operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathOp {
    Plus,
    Minus,
    Times,
    Divide,
    Power,

    Abs,
    Ceil,
    Floor,
    Exp,
    Ln,
    Log,
    Root,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Piecewise,

    Eq,
    Neq,
    Gt,
    Lt,
    Geq,
    Leq,

    And,
    Or,
    Xor,
    Not,
}

impl MathOp {
    /// Returns whether this code is an arithmetic operator.
    pub fn is_operator(self) -> bool {
        matches!(
            self,
            MathOp::Plus | MathOp::Minus | MathOp::Times | MathOp::Divide | MathOp::Power
        )
    }

    /// Returns whether this code is a named function.
    pub fn is_function(self) -> bool {
        matches!(
            self,
            MathOp::Abs
                | MathOp::Ceil
                | MathOp::Floor
                | MathOp::Exp
                | MathOp::Ln
                | MathOp::Log
                | MathOp::Root
                | MathOp::Sqrt
                | MathOp::Sin
                | MathOp::Cos
                | MathOp::Tan
                | MathOp::Asin
                | MathOp::Acos
                | MathOp::Atan
                | MathOp::Sinh
                | MathOp::Cosh
                | MathOp::Tanh
                | MathOp::Piecewise
        )
    }

    /// Returns whether this code is a relational operator.
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            MathOp::Eq | MathOp::Neq | MathOp::Gt | MathOp::Lt | MathOp::Geq | MathOp::Leq
        )
    }

    /// Returns whether this code is a logical operator.
    pub fn is_logical(self) -> bool {
        matches!(self, MathOp::And | MathOp::Or | MathOp::Xor | MathOp::Not)
    }

    /// Returns the evaluation arity, or `None` for `piecewise`, which must be
    /// lowered away before compilation.
    pub fn arity(self) -> Option<usize> {
        match self {
            MathOp::Piecewise => None,
            MathOp::Abs
            | MathOp::Ceil
            | MathOp::Floor
            | MathOp::Exp
            | MathOp::Ln
            | MathOp::Sqrt
            | MathOp::Sin
            | MathOp::Cos
            | MathOp::Tan
            | MathOp::Asin
            | MathOp::Acos
            | MathOp::Atan
            | MathOp::Sinh
            | MathOp::Cosh
            | MathOp::Tanh
            | MathOp::Not => Some(1),
            _ => Some(2),
        }
    }

    /// Returns the function-call spelling used by the formula syntax, when
    /// this code has one.
    pub fn function_name(self) -> Option<&'static str> {
        let name = match self {
            MathOp::Abs => "abs",
            MathOp::Ceil => "ceil",
            MathOp::Floor => "floor",
            MathOp::Exp => "exp",
            MathOp::Ln => "ln",
            MathOp::Log => "log",
            MathOp::Root => "root",
            MathOp::Sqrt => "sqrt",
            MathOp::Sin => "sin",
            MathOp::Cos => "cos",
            MathOp::Tan => "tan",
            MathOp::Asin => "asin",
            MathOp::Acos => "acos",
            MathOp::Atan => "atan",
            MathOp::Sinh => "sinh",
            MathOp::Cosh => "cosh",
            MathOp::Tanh => "tanh",
            MathOp::Piecewise => "piecewise",
            MathOp::And => "and",
            MathOp::Or => "or",
            MathOp::Xor => "xor",
            MathOp::Not => "not",
            _ => return None,
        };
        Some(name)
    }

    /// Resolves a function-call spelling to its code.
    pub fn from_function_name(name: &str) -> Option<MathOp> {
        let op = match name {
            "abs" => MathOp::Abs,
            "ceil" => MathOp::Ceil,
            "floor" => MathOp::Floor,
            "exp" => MathOp::Exp,
            "ln" => MathOp::Ln,
            "log" => MathOp::Log,
            "root" => MathOp::Root,
            "sqrt" => MathOp::Sqrt,
            "sin" => MathOp::Sin,
            "cos" => MathOp::Cos,
            "tan" => MathOp::Tan,
            "asin" => MathOp::Asin,
            "acos" => MathOp::Acos,
            "atan" => MathOp::Atan,
            "sinh" => MathOp::Sinh,
            "cosh" => MathOp::Cosh,
            "tanh" => MathOp::Tanh,
            "piecewise" => MathOp::Piecewise,
            "pow" => MathOp::Power,
            "and" => MathOp::And,
            "or" => MathOp::Or,
            "xor" => MathOp::Xor,
            "not" => MathOp::Not,
            _ => return None,
        };
        Some(op)
    }
}

/// Symbolic expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum MathNode {
    /// Real literal.
    Real(f64),
    /// Integer literal.
    Integer(i64),
    /// Named constant with a fixed value.
    Constant(MathConstant),
    /// Named reference resolved against the variable table at compile time.
    Name(String),
    /// The implicit current-simulation-time symbol.
    Time,
    /// Operator/function application.
    Apply(MathOp, Vec<MathNode>),
}

impl MathNode {
    /// Returns the children of this node.
    pub fn children(&self) -> &[MathNode] {
        match self {
            MathNode::Apply(_, kids) => kids,
            _ => &[],
        }
    }

    /// Counts the nodes of this tree in evaluation order.
    ///
    /// Iterative on an explicit stack so the count carries no recursion-depth
    /// requirement of its own.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            if let MathNode::Apply(_, kids) = node {
                stack.extend(kids.iter());
            }
        }
        count
    }

    /// Returns whether this node is a literal zero.
    pub fn is_literal_zero(&self) -> bool {
        match self {
            MathNode::Real(v) => v.abs() == 0.0,
            MathNode::Integer(v) => *v == 0,
            _ => false,
        }
    }

    /// Collects the distinct named references of this tree.
    ///
    /// Children are visited before their parent, and each name is reported at
    /// its first occurrence.
    pub fn named_references(&self) -> Vec<&str> {
        fn visit<'a>(node: &'a MathNode, out: &mut Vec<&'a str>) {
            for child in node.children() {
                visit(child, out);
            }
            if let MathNode::Name(name) = node {
                if !out.iter().any(|seen| *seen == name.as_str()) {
                    out.push(name.as_str());
                }
            }
        }

        let mut out = Vec::new();
        visit(self, &mut out);
        out
    }

    /// Returns the infix precedence used when rendering this node.
    fn precedence(&self) -> u8 {
        match self {
            MathNode::Apply(op, _) => match op {
                MathOp::Or | MathOp::Xor => 1,
                MathOp::And => 2,
                MathOp::Eq | MathOp::Neq | MathOp::Gt | MathOp::Lt | MathOp::Geq | MathOp::Leq => 3,
                MathOp::Plus | MathOp::Minus => 4,
                MathOp::Times | MathOp::Divide => 5,
                MathOp::Power => 6,
                _ => 7,
            },
            _ => 7,
        }
    }

    fn fmt_child(&self, parent_prec: u8, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.precedence() < parent_prec {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

impl fmt::Display for MathNode {
    /// Renders the tree back to infix formula syntax.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MathNode::Real(v) => write!(f, "{v}"),
            MathNode::Integer(v) => write!(f, "{v}"),
            MathNode::Constant(c) => write!(f, "{}", c.name()),
            MathNode::Name(name) => write!(f, "{name}"),
            MathNode::Time => write!(f, "time"),
            MathNode::Apply(op, kids) => {
                let infix = match op {
                    MathOp::Plus => Some(" + "),
                    MathOp::Minus => Some(" - "),
                    MathOp::Times => Some(" * "),
                    MathOp::Divide => Some(" / "),
                    MathOp::Power => Some("^"),
                    MathOp::Eq => Some(" == "),
                    MathOp::Neq => Some(" != "),
                    MathOp::Gt => Some(" > "),
                    MathOp::Lt => Some(" < "),
                    MathOp::Geq => Some(" >= "),
                    MathOp::Leq => Some(" <= "),
                    _ => None,
                };
                if let (Some(sep), 2) = (infix, kids.len()) {
                    let prec = self.precedence();
                    kids[0].fmt_child(prec, f)?;
                    write!(f, "{sep}")?;
                    // Right child gets one extra level so `a - (b - c)` keeps
                    // its parentheses.
                    kids[1].fmt_child(prec + 1, f)
                } else {
                    let name = op.function_name().unwrap_or("?");
                    write!(f, "{name}(")?;
                    for (i, kid) in kids.iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{kid}")?;
                    }
                    write!(f, ")")
                }
            }
        }
    }
}
