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

//! `nom` parser for infix rate formulas.
//!
//! The grammar supports:
//! - numeric literals (integers kept distinct from reals)
//! - identifiers, and the named constants `pi`, `exponentiale`, `avogadro`,
//!   `true`, `false`, and `time`
//! - binary `+ - * / ^` with the usual precedence, `^` right-associative
//! - relational `== != > < >= <=`
//! - logical `&&`, `||`, and `!`, plus the call forms `and(...)`, `or(...)`,
//!   `xor(...)`, `not(...)`
//! - function calls (`exp`, `ln`, `log`, `root`, `sqrt`, trig/hyperbolic
//!   families, `piecewise(v1, c1, ..., otherwise)`)

mod expr;
mod utils;

use crate::ast::{MathNode, SourceSpan, Span};
use crate::diagnostics::CompileError;
use nom::{
    IResult,
    combinator::all_consuming,
    error::{VerboseError, VerboseErrorKind},
    sequence::delimited,
};

use self::expr::expr;
use self::utils::ws0;

type PResult<'a, O> = IResult<Span<'a>, O, VerboseError<Span<'a>>>;

/// Parses an infix formula into a symbolic math tree.
pub fn parse_formula(source: &str) -> Result<MathNode, CompileError> {
    let input = Span::new(source);
    // `all_consuming` ensures trailing garbage is treated as syntax error.
    match all_consuming(delimited(ws0, expr, ws0))(input) {
        Ok((_, node)) => Ok(node),
        Err(err) => Err(parse_error_to_compile_error(err, source)),
    }
}

/// Converts a `nom` verbose error to crate-level compile diagnostics.
fn parse_error_to_compile_error(
    err: nom::Err<VerboseError<Span<'_>>>,
    source: &str,
) -> CompileError {
    match err {
        nom::Err::Incomplete(_) => CompileError::message_only("Incomplete input"),
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            // Use the deepest recorded parser error as the diagnostic anchor.
            if let Some((span, kind)) = e.errors.last() {
                let span = SourceSpan::from_bounds(*span, *span);
                let detail = match kind {
                    VerboseErrorKind::Context(ctx) => format!("Syntax error: expected {ctx}"),
                    VerboseErrorKind::Char(c) => format!("Syntax error: expected '{c}'"),
                    VerboseErrorKind::Nom(kind) => format!("Syntax error near {kind:?}"),
                };
                CompileError::from_span(detail, source, &span)
            } else {
                CompileError::message_only("Syntax error")
            }
        }
    }
}
