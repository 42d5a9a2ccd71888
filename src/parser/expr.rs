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

//! Formula expression parser.

use crate::ast::{MathConstant, MathNode, MathOp, Span};
use nom::{
    branch::alt,
    combinator::{map_res, opt},
    error::{VerboseError, VerboseErrorKind, context},
    multi::separated_list0,
    number::complete::recognize_float,
    sequence::delimited,
};

use super::PResult;
use super::utils::{identifier, ws, ws_char, ws_tag};

/// Top-level expression parser.
pub(super) fn expr(input: Span<'_>) -> PResult<'_, MathNode> {
    parse_or(input)
}

/// Parses left-associative `||`.
fn parse_or(input: Span<'_>) -> PResult<'_, MathNode> {
    let (mut input, mut left) = parse_and(input)?;
    loop {
        let (next, op) = opt(ws_tag("||"))(input)?;
        if op.is_none() {
            break;
        }

        let (next, right) = parse_and(next)?;
        left = MathNode::Apply(MathOp::Or, vec![left, right]);
        input = next;
    }
    Ok((input, left))
}

/// Parses left-associative `&&`.
fn parse_and(input: Span<'_>) -> PResult<'_, MathNode> {
    let (mut input, mut left) = parse_relational(input)?;
    loop {
        let (next, op) = opt(ws_tag("&&"))(input)?;
        if op.is_none() {
            break;
        }

        let (next, right) = parse_relational(next)?;
        left = MathNode::Apply(MathOp::And, vec![left, right]);
        input = next;
    }
    Ok((input, left))
}

/// Parses a single, non-chained relational comparison.
fn parse_relational(input: Span<'_>) -> PResult<'_, MathNode> {
    let (input, left) = parse_add_sub(input)?;
    // Two-character operators are tried first so `>=` never parses as `>`.
    let (input, op) = opt(alt((
        ws_tag("=="),
        ws_tag("!="),
        ws_tag(">="),
        ws_tag("<="),
        ws_tag(">"),
        ws_tag("<"),
    )))(input)?;
    let Some(op_tag) = op else {
        return Ok((input, left));
    };

    let (input, right) = parse_add_sub(input)?;
    let op = match *op_tag.fragment() {
        "==" => MathOp::Eq,
        "!=" => MathOp::Neq,
        ">=" => MathOp::Geq,
        "<=" => MathOp::Leq,
        ">" => MathOp::Gt,
        _ => MathOp::Lt,
    };
    Ok((input, MathNode::Apply(op, vec![left, right])))
}

/// Parses left-associative `+`/`-`.
fn parse_add_sub(input: Span<'_>) -> PResult<'_, MathNode> {
    let (mut input, mut left) = parse_mul_div(input)?;
    loop {
        let (next, op) = opt(alt((ws_char('+'), ws_char('-'))))(input)?;
        let Some(op_char) = op else {
            break;
        };

        // Left-associative fold: `a-b-c` becomes `(a-b)-c`.
        let (next, right) = parse_mul_div(next)?;
        let op = if op_char == '+' {
            MathOp::Plus
        } else {
            MathOp::Minus
        };
        left = MathNode::Apply(op, vec![left, right]);
        input = next;
    }
    Ok((input, left))
}

/// Parses left-associative `*`/`/`.
fn parse_mul_div(input: Span<'_>) -> PResult<'_, MathNode> {
    let (mut input, mut left) = parse_unary(input)?;
    loop {
        let (next, op) = opt(alt((ws_char('*'), ws_char('/'))))(input)?;
        let Some(op_char) = op else {
            break;
        };

        // Left-associative fold: `a/b/c` becomes `(a/b)/c`.
        let (next, right) = parse_unary(next)?;
        let op = if op_char == '*' {
            MathOp::Times
        } else {
            MathOp::Divide
        };
        left = MathNode::Apply(op, vec![left, right]);
        input = next;
    }
    Ok((input, left))
}

/// Parses unary operators.
fn parse_unary(input: Span<'_>) -> PResult<'_, MathNode> {
    // Unary operators are parsed recursively to support chains like `---x`.
    // A one-child `-`/`not` application is the normalizer's input form.
    if let Ok((input, _)) = ws_char('-')(input) {
        let (input, inner) = parse_unary(input)?;
        return Ok((input, MathNode::Apply(MathOp::Minus, vec![inner])));
    }
    if let Ok((input, _)) = ws_char('!')(input) {
        let (input, inner) = parse_unary(input)?;
        return Ok((input, MathNode::Apply(MathOp::Not, vec![inner])));
    }
    parse_power(input)
}

/// Parses right-associative `^`.
fn parse_power(input: Span<'_>) -> PResult<'_, MathNode> {
    let (input, base) = parse_primary(input)?;
    let (input, caret) = opt(ws_char('^'))(input)?;
    if caret.is_none() {
        return Ok((input, base));
    }

    // The exponent re-enters the unary level so `a^-b` and `a^b^c` parse.
    let (input, exponent) = parse_unary(input)?;
    Ok((input, MathNode::Apply(MathOp::Power, vec![base, exponent])))
}

/// Parses expression atoms.
fn parse_primary(input: Span<'_>) -> PResult<'_, MathNode> {
    alt((parse_parenthesized, parse_number, parse_ident_or_call))(input)
}

/// Parses parenthesized expressions.
fn parse_parenthesized(input: Span<'_>) -> PResult<'_, MathNode> {
    delimited(ws_char('('), expr, context("')'", ws_char(')')))(input)
}

/// Parses numeric literal expressions.
///
/// Literals without a fraction or exponent are kept as integers, matching the
/// distinction the normalizer's zero test relies on.
fn parse_number(input: Span<'_>) -> PResult<'_, MathNode> {
    let (input, node) = ws(map_res(recognize_float, |s: Span<'_>| {
        let text = s.fragment();
        if let Ok(i) = text.parse::<i64>() {
            return Ok(MathNode::Integer(i));
        }
        text.parse::<f64>().map(MathNode::Real)
    }))(input)?;
    Ok((input, node))
}

/// Parses an identifier, named constant, or function call.
fn parse_ident_or_call(input: Span<'_>) -> PResult<'_, MathNode> {
    let name_start = input;
    let (input, name) = ws(identifier)(input)?;
    let (input, args) = opt(delimited(
        ws_char('('),
        separated_list0(ws_char(','), expr),
        context("')'", ws_char(')')),
    ))(input)?;

    // A name followed by `(...)` must be a known function.
    if let Some(args) = args {
        let Some(op) = MathOp::from_function_name(&name) else {
            return Err(nom::Err::Failure(VerboseError {
                errors: vec![(name_start, VerboseErrorKind::Context("known function name"))],
            }));
        };
        return Ok((input, MathNode::Apply(op, args)));
    }

    let node = match name.as_str() {
        "pi" => MathNode::Constant(MathConstant::Pi),
        "exponentiale" => MathNode::Constant(MathConstant::E),
        "avogadro" => MathNode::Constant(MathConstant::Avogadro),
        "true" => MathNode::Constant(MathConstant::True),
        "false" => MathNode::Constant(MathConstant::False),
        "time" => MathNode::Time,
        _ => MathNode::Name(name),
    };
    Ok((input, node))
}
