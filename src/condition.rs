//! MSBuild condition parser and evaluator.
//!
//! Parses and evaluates the `Condition` attributes found on `.vcxproj`
//! `<PropertyGroup>`, `<ItemDefinitionGroup>` and per-item metadata elements,
//! for example:
//!
//! - `'$(Configuration)|$(Platform)'=='Debug|Win32'`
//! - `'$(Configuration)'=='Release' and '$(Platform)'=='x64'`
//! - `!Exists('$(SolutionDir)local.props')`
//!
//! Uses [`chumsky`] for the parsing grammar.
//!
//! ## Grammar (case-insensitive keywords)
//!
//! ```text
//! expr       = or_expr
//! or_expr    = and_expr ('or' and_expr)*
//! and_expr   = unary ('and' unary)*
//! unary      = '!' unary | atom
//! atom       = comparison | exists | '(' expr ')'
//! comparison = quoted ('==' | '!=') quoted
//! exists     = 'Exists' '(' quoted ')'
//! quoted     = "'" chars "'"
//! ```
//!
//! String comparisons are ASCII case-insensitive, as in MSBuild.

use chumsky::prelude::*;
use std::collections::HashMap;

use crate::error::Error;

// ═══════════════════════════════════════════════════════════════════════════════
//  AST
// ═══════════════════════════════════════════════════════════════════════════════

/// A parsed MSBuild condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// `'lhs' == 'rhs'` or `'lhs' != 'rhs'`.
    Compare {
        lhs: Vec<ExprValue>,
        op: CompareOp,
        rhs: Vec<ExprValue>,
    },
    /// `Exists('path')`; always true, the filesystem is not consulted.
    Exists(Vec<ExprValue>),
    /// `!expr`.
    Not(Box<Expression>),
    /// `a and b` (case-insensitive keyword).
    And(Box<Expression>, Box<Expression>),
    /// `a or b` (case-insensitive keyword).
    Or(Box<Expression>, Box<Expression>),
}

/// Comparison operator used inside an [`Expression::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
}

/// A fragment of a string value that may contain `$(Variable)` references.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    /// Literal text (no variable expansion needed).
    Literal(String),
    /// A `$(VarName)` reference that will be expanded during evaluation.
    Variable(String),
}

// ═══════════════════════════════════════════════════════════════════════════════
//  String-part splitting
// ═══════════════════════════════════════════════════════════════════════════════

/// Split the raw text between single quotes into [`ExprValue`] fragments.
///
/// `$(VarName)` sequences become [`ExprValue::Variable`]; everything else
/// becomes [`ExprValue::Literal`].
fn parse_string_parts(s: &str) -> Vec<ExprValue> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'(') {
            if !literal.is_empty() {
                parts.push(ExprValue::Literal(std::mem::take(&mut literal)));
            }
            chars.next(); // consume '('
            let var_name: String = chars.by_ref().take_while(|&ch| ch != ')').collect();
            parts.push(ExprValue::Variable(var_name));
        } else {
            literal.push(c);
        }
    }

    if !literal.is_empty() {
        parts.push(ExprValue::Literal(literal));
    }

    parts
}

/// Render parts back to MSBuild text, keeping `$(Var)` references intact.
fn render_parts(parts: &[ExprValue]) -> String {
    parts
        .iter()
        .map(|part| match part {
            ExprValue::Literal(s) => s.clone(),
            ExprValue::Variable(name) => format!("$({name})"),
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Chumsky parser
// ═══════════════════════════════════════════════════════════════════════════════

/// Build the chumsky parser for MSBuild condition expressions.
fn condition_parser<'a>() -> impl Parser<'a, &'a str, Expression, extra::Err<Simple<'a, char>>> {
    recursive(|expr| {
        // ── Single-quoted string value ───────────────────────────────────
        let quoted = just('\'')
            .ignore_then(none_of('\'').repeated().to_slice())
            .then_ignore(just('\''))
            .map(parse_string_parts);

        // ── Comparison operators ─────────────────────────────────────────
        let cmp_op = just("==")
            .to(CompareOp::Equal)
            .or(just("!=").to(CompareOp::NotEqual));

        // ── Comparison:  'lhs' op 'rhs' ─────────────────────────────────
        let comparison = quoted
            .padded()
            .then(cmp_op.padded())
            .then(quoted.padded())
            .map(|((lhs, op), rhs)| Expression::Compare { lhs, op, rhs });

        // ── Case-insensitive alphabetic word (for keyword matching) ──────
        let alpha_word = any()
            .filter(|c: &char| c.is_ascii_alphabetic())
            .repeated()
            .at_least(1)
            .to_slice();

        // ── Exists('path') ───────────────────────────────────────────────
        let exists = alpha_word
            .filter(|s: &&str| s.eq_ignore_ascii_case("exists"))
            .ignore_then(just('(').padded())
            .ignore_then(quoted)
            .then_ignore(just(')').padded())
            .map(Expression::Exists);

        // ── Parenthesized expression ─────────────────────────────────────
        let paren_expr = expr.delimited_by(just('(').padded(), just(')').padded());

        // ── Atom ─────────────────────────────────────────────────────────
        let atom = choice((comparison, exists, paren_expr)).padded();

        // ── '!' prefix ───────────────────────────────────────────────────
        let unary = recursive(|unary| {
            just('!')
                .padded()
                .ignore_then(unary)
                .map(|inner| Expression::Not(Box::new(inner)))
                .or(atom)
        });

        // ── 'and' binds tighter than 'or' ─────────────────────────
        let and_kw = alpha_word
            .filter(|s: &&str| s.eq_ignore_ascii_case("and"))
            .padded();

        let and_expr = unary.clone().foldl(
            and_kw.ignore_then(unary).repeated(),
            |lhs, rhs| Expression::And(Box::new(lhs), Box::new(rhs)),
        );

        // ── 'or', lowest precedence ──────────────────────────────────────
        let or_kw = alpha_word
            .filter(|s: &&str| s.eq_ignore_ascii_case("or"))
            .padded();

        and_expr.clone().foldl(
            or_kw.ignore_then(and_expr).repeated(),
            |lhs, rhs| Expression::Or(Box::new(lhs), Box::new(rhs)),
        )
    })
}

/// Parse a condition attribute string into an [`Expression`] AST.
pub fn parse_condition(input: &str) -> Result<Expression, Error> {
    condition_parser()
        .parse(input)
        .into_result()
        .map_err(|errs| {
            let messages: Vec<String> = errs.iter().map(|e| format!("{e}")).collect();
            Error::Condition {
                condition: input.to_string(),
                message: messages.join("; "),
            }
        })
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Evaluation
// ═══════════════════════════════════════════════════════════════════════════════

/// Expand `$(Var)` references in a parsed string expression.
/// Unknown variables expand to the empty string.
fn expand_string(parts: &[ExprValue], vars: &HashMap<String, String>) -> String {
    parts
        .iter()
        .map(|part| match part {
            ExprValue::Literal(s) => s.clone(),
            ExprValue::Variable(name) => vars.get(name.as_str()).cloned().unwrap_or_default(),
        })
        .collect()
}

/// Evaluate a condition expression against a set of variable bindings.
///
/// `Exists(…)` always evaluates to `true`; filesystem checks are not
/// performed.
pub fn evaluate(expr: &Expression, vars: &HashMap<String, String>) -> bool {
    match expr {
        Expression::Compare { lhs, op, rhs } => {
            let l = expand_string(lhs, vars);
            let r = expand_string(rhs, vars);
            match op {
                CompareOp::Equal => l.eq_ignore_ascii_case(&r),
                CompareOp::NotEqual => !l.eq_ignore_ascii_case(&r),
            }
        }
        Expression::Exists(_) => true,
        Expression::Not(inner) => !evaluate(inner, vars),
        Expression::And(a, b) => evaluate(a, vars) && evaluate(b, vars),
        Expression::Or(a, b) => evaluate(a, vars) || evaluate(b, vars),
    }
}

/// Variable bindings for one `(configuration, platform)` pair.
pub fn build_vars(configuration: &str, platform: &str) -> HashMap<String, String> {
    HashMap::from([
        ("Configuration".to_string(), configuration.to_string()),
        ("Platform".to_string(), platform.to_string()),
    ])
}

/// Parse and evaluate `condition` for one `(configuration, platform)` pair.
pub fn holds_for(condition: &str, configuration: &str, platform: &str) -> Result<bool, Error> {
    let expr = parse_condition(condition)?;
    Ok(evaluate(&expr, &build_vars(configuration, platform)))
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Configuration discovery
// ═══════════════════════════════════════════════════════════════════════════════

/// Extract the configuration name a condition selects, if it has the shape
/// `'$(Configuration)|$(Platform)'=='Debug|Win32'` or
/// `'$(Configuration)'=='Debug'` (possibly nested inside `and`/`or`).
///
/// Returns the first name found in document order.
pub fn configuration_of(expr: &Expression) -> Option<String> {
    match expr {
        Expression::Compare {
            lhs,
            op: CompareOp::Equal,
            rhs,
        } => {
            let lhs_text = render_parts(lhs);
            let rhs_text = render_parts(rhs);
            let (lhs_fields, rhs_fields) = if lhs_text.contains("$(") {
                (lhs_text, rhs_text)
            } else {
                (rhs_text, lhs_text)
            };
            lhs_fields
                .split('|')
                .zip(rhs_fields.split('|'))
                .find(|(var, _)| var.trim() == "$(Configuration)")
                .map(|(_, value)| value.trim().to_string())
                .filter(|value| !value.is_empty() && !value.contains("$("))
        }
        Expression::And(a, b) | Expression::Or(a, b) => {
            configuration_of(a).or_else(|| configuration_of(b))
        }
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════════════════════
