use log::debug;
use lpcheck_solver::{LinearExpr, Rational, SolvingState, parse_rational};
use num_traits::Zero;
use thiserror::Error;

use crate::Parser;
use crate::ast::*;
use crate::parser::ParseError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Product of two non-constant expressions: {0}")]
    NonLinear(String),
    #[error("Division by a non-constant expression: {0}")]
    NonConstantDivisor(String),
    #[error("Division by zero in expression: {0}")]
    DivisionByZero(String),
    #[error("Bound on {variable} must be constant, found {expr}")]
    NonConstantBound { variable: String, expr: String },
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

/// Lowers parsed statements into a [`SolvingState`].
///
/// Variables are registered in order of first textual appearance, so the
/// model printed after a check lists them in the order the file mentions
/// them. Repeated `load` calls append to the same state.
#[derive(Debug, Default)]
pub struct Compiler {
    state: SolvingState,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a single program into a fresh state.
    pub fn compile(program: &Program) -> Result<SolvingState, CompileError> {
        let mut compiler = Compiler::new();
        compiler.load(program)?;
        Ok(compiler.into_state())
    }

    pub fn compile_source(source: &str) -> Result<SolvingState, CompileError> {
        let program = Parser::parse(source)?;
        Self::compile(&program)
    }

    pub fn load(&mut self, program: &Program) -> Result<(), CompileError> {
        for statement in &program.statements {
            match statement {
                Statement::Constraint(c) => self.add_constraint(c)?,
                Statement::Bound(b) => self.add_bound(b)?,
            }
        }
        debug!(
            "compiled {} statements: {} variables, {} constraints",
            program.statements.len(),
            self.state.variables().num_variables(),
            self.state.constraints().len()
        );
        Ok(())
    }

    pub fn state(&self) -> &SolvingState {
        &self.state
    }

    pub fn into_state(self) -> SolvingState {
        self.state
    }

    fn add_constraint(&mut self, constraint: &ConstraintStmt) -> Result<(), CompileError> {
        let lhs = self.lower(&constraint.lhs)?;
        let rhs = self.lower(&constraint.rhs)?;
        match constraint.relation {
            Relation::LessEq => self.state.add_inequality(lhs, rhs),
            Relation::GreaterEq => self.state.add_greater_or_equal(lhs, rhs),
            Relation::Equal => self.state.add_equality(lhs, rhs),
        }
        Ok(())
    }

    fn add_bound(&mut self, bound: &BoundStmt) -> Result<(), CompileError> {
        let name = bound.variable.as_str();
        // registers the variable even if the value turns out to be invalid
        self.state.variable(name);
        match &bound.kind {
            BoundKind::Lower(expr) => {
                let value = self.bound_value(name, expr)?;
                self.state.set_lower_bound(name, value);
            }
            BoundKind::Upper(expr) => {
                let value = self.bound_value(name, expr)?;
                self.state.set_upper_bound(name, value);
            }
            BoundKind::Range(lower, upper) => {
                let lower = self.bound_value(name, lower)?;
                let upper = self.bound_value(name, upper)?;
                self.state.set_lower_bound(name, lower);
                self.state.set_upper_bound(name, upper);
            }
        }
        Ok(())
    }

    fn bound_value(&self, variable: &str, expr: &Expr) -> Result<Rational, CompileError> {
        evaluate_constant(expr)?.ok_or_else(|| CompileError::NonConstantBound {
            variable: variable.to_string(),
            expr: expr.to_string(),
        })
    }

    fn lower(&mut self, expr: &Expr) -> Result<LinearExpr, CompileError> {
        match expr {
            Expr::Number(text) => Ok(LinearExpr::constant(number(text)?)),
            Expr::Variable(var) => Ok(self.state.variable(&var.name)),
            Expr::Neg(inner) => Ok(-self.lower(inner)?),
            Expr::Paren(inner) => self.lower(inner),
            Expr::BinaryOp { left, op, right } => {
                let l = self.lower(left)?;
                let r = self.lower(right)?;
                match op {
                    BinaryOp::Add => Ok(l + r),
                    BinaryOp::Sub => Ok(l - r),
                    BinaryOp::Mul => {
                        if l.is_constant() {
                            Ok(r.scale(&l.constant_term()))
                        } else if r.is_constant() {
                            Ok(l.scale(&r.constant_term()))
                        } else {
                            Err(CompileError::NonLinear(expr.to_string()))
                        }
                    }
                    BinaryOp::Div => {
                        if !r.is_constant() {
                            return Err(CompileError::NonConstantDivisor(expr.to_string()));
                        }
                        let divisor = r.constant_term();
                        if divisor.is_zero() {
                            return Err(CompileError::DivisionByZero(expr.to_string()));
                        }
                        Ok(l.scale(&divisor.recip()))
                    }
                }
            }
        }
    }
}

fn number(text: &str) -> Result<Rational, CompileError> {
    parse_rational(text).ok_or_else(|| CompileError::InvalidNumber(text.to_string()))
}

/// Value of a variable-free expression, or `None` if it mentions a variable.
fn evaluate_constant(expr: &Expr) -> Result<Option<Rational>, CompileError> {
    let value = match expr {
        Expr::Number(text) => number(text)?,
        Expr::Variable(_) => return Ok(None),
        Expr::Neg(inner) => match evaluate_constant(inner)? {
            Some(v) => -v,
            None => return Ok(None),
        },
        Expr::Paren(inner) => return evaluate_constant(inner),
        Expr::BinaryOp { left, op, right } => {
            let (Some(l), Some(r)) = (evaluate_constant(left)?, evaluate_constant(right)?) else {
                return Ok(None);
            };
            match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => {
                    if r.is_zero() {
                        return Err(CompileError::DivisionByZero(expr.to_string()));
                    }
                    l / r
                }
            }
        }
    };
    Ok(Some(value))
}
