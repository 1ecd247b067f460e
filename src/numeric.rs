//! Numeric conditions and effects, lifted and ground.
//!
//! Lifted terms reference numeric functions applied to [`Term`]s; grounding
//! resolves every application to a fluent code using the same positional
//! numbering as ground atoms.

use crate::ast::Term;
use crate::error::GroundError;
use crate::symbols::{FluentCode, FunctionId, ObjectId, SymbolTable};
use serde::{Deserialize, Serialize};

/// Comparison operator of a numeric precondition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
}

/// Update operator of a numeric effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    Assign,
    Increase,
    Decrease,
    ScaleUp,
    ScaleDown,
}

/// A lifted numeric expression.
#[derive(Clone, Debug, PartialEq)]
pub enum NumericExpr {
    Const(f64),
    /// A numeric function applied to terms.
    Fluent {
        function: FunctionId,
        args: Vec<Term>,
    },
    Add(Box<NumericExpr>, Box<NumericExpr>),
    Sub(Box<NumericExpr>, Box<NumericExpr>),
    Mul(Box<NumericExpr>, Box<NumericExpr>),
    Div(Box<NumericExpr>, Box<NumericExpr>),
}

/// A lifted numeric precondition: `lhs <op> rhs`.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericCondition {
    pub comparison: Comparison,
    pub lhs: NumericExpr,
    pub rhs: NumericExpr,
}

/// A lifted numeric effect: `<op> target expr`.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericEffect {
    pub op: AssignOp,
    pub function: FunctionId,
    pub args: Vec<Term>,
    pub expr: NumericExpr,
}

/// A ground numeric expression over fluent codes.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum GroundNumericExpr {
    Const(f64),
    Fluent(FluentCode),
    Add(Box<GroundNumericExpr>, Box<GroundNumericExpr>),
    Sub(Box<GroundNumericExpr>, Box<GroundNumericExpr>),
    Mul(Box<GroundNumericExpr>, Box<GroundNumericExpr>),
    Div(Box<GroundNumericExpr>, Box<GroundNumericExpr>),
}

/// A ground numeric precondition.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroundNumericCondition {
    pub comparison: Comparison,
    pub lhs: GroundNumericExpr,
    pub rhs: GroundNumericExpr,
}

/// A ground numeric effect.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroundNumericEffect {
    pub op: AssignOp,
    pub fluent: FluentCode,
    pub expr: GroundNumericExpr,
}

fn validate_application(
    function: FunctionId,
    args: &[Term],
    scope: usize,
    symbols: &SymbolTable,
    context: &str,
) -> Result<(), GroundError> {
    if !symbols.valid_function(function.raw()) {
        return Err(GroundError::UnknownFunction {
            context: context.to_string(),
            id: function.raw(),
        });
    }
    let expected = symbols.function_arity(function);
    if args.len() != expected {
        return Err(GroundError::ArityMismatch {
            context: context.to_string(),
            name: symbols.function_name(function).to_string(),
            expected,
            found: args.len(),
        });
    }
    for term in args {
        if let Term::Param(i) = term {
            if *i >= scope {
                return Err(GroundError::ParameterOutOfRange {
                    schema: context.to_string(),
                    index: *i,
                });
            }
        }
    }
    Ok(())
}

pub(crate) fn validate_expr(
    expr: &NumericExpr,
    scope: usize,
    symbols: &SymbolTable,
    context: &str,
) -> Result<(), GroundError> {
    match expr {
        NumericExpr::Const(_) => Ok(()),
        NumericExpr::Fluent { function, args } => {
            validate_application(*function, args, scope, symbols, context)
        }
        NumericExpr::Add(l, r)
        | NumericExpr::Sub(l, r)
        | NumericExpr::Mul(l, r)
        | NumericExpr::Div(l, r) => {
            validate_expr(l, scope, symbols, context)?;
            validate_expr(r, scope, symbols, context)
        }
    }
}

pub(crate) fn validate_condition(
    cond: &NumericCondition,
    scope: usize,
    symbols: &SymbolTable,
    context: &str,
) -> Result<(), GroundError> {
    validate_expr(&cond.lhs, scope, symbols, context)?;
    validate_expr(&cond.rhs, scope, symbols, context)
}

pub(crate) fn validate_effect(
    eff: &NumericEffect,
    scope: usize,
    symbols: &SymbolTable,
    context: &str,
) -> Result<(), GroundError> {
    validate_application(eff.function, &eff.args, scope, symbols, context)?;
    validate_expr(&eff.expr, scope, symbols, context)
}

fn ground_application(
    function: FunctionId,
    args: &[Term],
    binding: &[ObjectId],
    symbols: &SymbolTable,
) -> FluentCode {
    let objs: Vec<ObjectId> = args
        .iter()
        .map(|t| match t {
            Term::Param(i) => binding[*i],
            Term::Object(o) => *o,
        })
        .collect();
    symbols.encode_fluent(function, &objs)
}

pub(crate) fn ground_expr(
    expr: &NumericExpr,
    binding: &[ObjectId],
    symbols: &SymbolTable,
) -> GroundNumericExpr {
    match expr {
        NumericExpr::Const(c) => GroundNumericExpr::Const(*c),
        NumericExpr::Fluent { function, args } => {
            GroundNumericExpr::Fluent(ground_application(*function, args, binding, symbols))
        }
        NumericExpr::Add(l, r) => GroundNumericExpr::Add(
            Box::new(ground_expr(l, binding, symbols)),
            Box::new(ground_expr(r, binding, symbols)),
        ),
        NumericExpr::Sub(l, r) => GroundNumericExpr::Sub(
            Box::new(ground_expr(l, binding, symbols)),
            Box::new(ground_expr(r, binding, symbols)),
        ),
        NumericExpr::Mul(l, r) => GroundNumericExpr::Mul(
            Box::new(ground_expr(l, binding, symbols)),
            Box::new(ground_expr(r, binding, symbols)),
        ),
        NumericExpr::Div(l, r) => GroundNumericExpr::Div(
            Box::new(ground_expr(l, binding, symbols)),
            Box::new(ground_expr(r, binding, symbols)),
        ),
    }
}

pub(crate) fn ground_condition(
    cond: &NumericCondition,
    binding: &[ObjectId],
    symbols: &SymbolTable,
) -> GroundNumericCondition {
    GroundNumericCondition {
        comparison: cond.comparison,
        lhs: ground_expr(&cond.lhs, binding, symbols),
        rhs: ground_expr(&cond.rhs, binding, symbols),
    }
}

pub(crate) fn ground_effect(
    eff: &NumericEffect,
    binding: &[ObjectId],
    symbols: &SymbolTable,
) -> GroundNumericEffect {
    GroundNumericEffect {
        op: eff.op,
        fluent: ground_application(eff.function, &eff.args, binding, symbols),
        expr: ground_expr(&eff.expr, binding, symbols),
    }
}
