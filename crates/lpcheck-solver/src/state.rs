use std::collections::BTreeMap;

use num_traits::Zero;
use thiserror::Error;

use crate::expr::LinearExpr;
use crate::rational::Rational;
use crate::registry::VariableRegistry;
use crate::solution::Model;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Variable list must start with the empty sentinel, found {0:?}")]
    InvalidSentinel(String),
    #[error("Variable {0} has an empty name")]
    EmptyVariableName(usize),
    #[error("Duplicate variable: {0}")]
    DuplicateVariable(String),
    #[error("Constraint {0} has no constant slot")]
    EmptyConstraint(usize),
    #[error("Constraint {constraint} references variable index {index}, but only {known} variables are registered")]
    UnknownVariable {
        constraint: usize,
        index: usize,
        known: usize,
    },
    #[error("Bounds given for index {0}, which is not a registered variable")]
    UnknownBoundIndex(usize),
}

/// A constraint in canonical form: `sum(coefficients[i] * x_i for i >= 1)`
/// compared against `coefficients[0]` with `<=` or `=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    pub coefficients: Vec<Rational>,
    pub equality: bool,
}

impl Constraint {
    pub fn new(coefficients: Vec<Rational>, equality: bool) -> Self {
        Self {
            coefficients,
            equality,
        }
    }

    /// Normalize `lhs <= rhs` (or `lhs = rhs`): subtract, then move the
    /// constant to the right-hand side by negating slot 0.
    pub fn from_comparison(lhs: &LinearExpr, rhs: &LinearExpr, equality: bool) -> Self {
        let mut coefficients = (lhs - rhs).into_coefficients();
        if let Some(constant) = coefficients.first_mut() {
            *constant = -constant.clone();
        }
        Self {
            coefficients,
            equality,
        }
    }

    pub fn rhs(&self) -> Rational {
        self.coefficient(0)
    }

    pub fn coefficient(&self, index: usize) -> Rational {
        self.coefficients
            .get(index)
            .cloned()
            .unwrap_or_else(Rational::zero)
    }

    /// Exact check against values indexed like the registry (slot 0 ignored).
    pub fn is_satisfied_by(&self, values: &[Rational]) -> bool {
        let lhs = self
            .coefficients
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, coeff)| !coeff.is_zero())
            .fold(Rational::zero(), |acc, (index, coeff)| {
                acc + coeff * values.get(index).cloned().unwrap_or_else(Rational::zero)
            });
        if self.equality {
            lhs == self.rhs()
        } else {
            lhs <= self.rhs()
        }
    }
}

/// Per-variable bounds. Variables are non-negative and unbounded above unless
/// stated otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bounds {
    pub lower: Rational,
    pub upper: Option<Rational>,
}

impl Bounds {
    pub fn new(lower: Rational, upper: Option<Rational>) -> Self {
        Self { lower, upper }
    }

    /// True when no value satisfies both bounds.
    pub fn is_empty(&self) -> bool {
        self.upper.as_ref().is_some_and(|upper| *upper < self.lower)
    }

    pub fn contains(&self, value: &Rational) -> bool {
        *value >= self.lower && self.upper.as_ref().is_none_or(|upper| value <= upper)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            lower: Rational::zero(),
            upper: None,
        }
    }
}

/// A complete, self-contained feasibility query.
///
/// Build it through [`SolvingState::variable`] and the `add_*` methods, then
/// hand it to [`crate::LpSolver::check`]. The solver only borrows it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolvingState {
    variables: VariableRegistry,
    constraints: Vec<Constraint>,
    bounds: BTreeMap<usize, Bounds>,
}

impl SolvingState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a state from raw parts. Only the name list is checked here;
    /// constraints and bounds are checked by [`SolvingState::validate`].
    pub fn from_parts(
        variable_names: Vec<String>,
        constraints: Vec<Constraint>,
        bounds: BTreeMap<usize, Bounds>,
    ) -> Result<Self, StateError> {
        Ok(Self {
            variables: VariableRegistry::from_names(variable_names)?,
            constraints,
            bounds,
        })
    }

    /// The expression `1 * name`, registering `name` on first use.
    pub fn variable(&mut self, name: &str) -> LinearExpr {
        LinearExpr::unit(self.variables.register_or_lookup(name))
    }

    /// Adds `lhs <= rhs`.
    pub fn add_inequality(&mut self, lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) {
        let constraint = Constraint::from_comparison(&lhs.into(), &rhs.into(), false);
        self.constraints.push(constraint);
    }

    /// Adds `lhs >= rhs`, stored as `rhs <= lhs`.
    pub fn add_greater_or_equal(
        &mut self,
        lhs: impl Into<LinearExpr>,
        rhs: impl Into<LinearExpr>,
    ) {
        self.add_inequality(rhs, lhs);
    }

    /// Adds `lhs = rhs`.
    pub fn add_equality(&mut self, lhs: impl Into<LinearExpr>, rhs: impl Into<LinearExpr>) {
        let constraint = Constraint::from_comparison(&lhs.into(), &rhs.into(), true);
        self.constraints.push(constraint);
    }

    /// Appends a constraint that is already in canonical form.
    pub fn push_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn set_lower_bound(&mut self, name: &str, lower: Rational) {
        let index = self.variables.register_or_lookup(name);
        self.bounds.entry(index).or_default().lower = lower;
    }

    pub fn set_upper_bound(&mut self, name: &str, upper: Rational) {
        let index = self.variables.register_or_lookup(name);
        self.bounds.entry(index).or_default().upper = Some(upper);
    }

    pub fn set_bounds(&mut self, name: &str, bounds: Bounds) {
        let index = self.variables.register_or_lookup(name);
        self.bounds.insert(index, bounds);
    }

    /// Explicit bounds of `index`, or the default `[0, inf)`.
    pub fn bounds(&self, index: usize) -> Bounds {
        self.bounds.get(&index).cloned().unwrap_or_default()
    }

    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Check the shape of every constraint and bound against the registry.
    pub fn validate(&self) -> Result<(), StateError> {
        let slots = self.variables.len();
        for (position, constraint) in self.constraints.iter().enumerate() {
            if constraint.coefficients.is_empty() {
                return Err(StateError::EmptyConstraint(position));
            }
            if constraint.coefficients.len() > slots {
                let index = constraint.coefficients.len() - 1;
                return Err(StateError::UnknownVariable {
                    constraint: position,
                    index,
                    known: self.variables.num_variables(),
                });
            }
        }
        for &index in self.bounds.keys() {
            if index == 0 || index >= slots {
                return Err(StateError::UnknownBoundIndex(index));
            }
        }
        Ok(())
    }

    /// Positions of the constraints `model` violates. Variables missing from
    /// the model are read as zero.
    pub fn unsatisfied_constraints(&self, model: &Model) -> Vec<usize> {
        let mut values = vec![Rational::zero(); self.variables.len()];
        for variable in self.variables.variables() {
            if let Some(value) = model.get(variable.name) {
                values[variable.index] = value.clone();
            }
        }

        self.constraints
            .iter()
            .enumerate()
            .filter(|(_, constraint)| !constraint.is_satisfied_by(&values))
            .map(|(position, _)| position)
            .collect()
    }

    /// Indices of variables that are missing from `model` or lie outside
    /// their bounds.
    pub fn violated_bounds(&self, model: &Model) -> Vec<usize> {
        self.variables
            .variables()
            .filter(|variable| match model.get(variable.name) {
                Some(value) => !self.bounds(variable.index).contains(value),
                None => true,
            })
            .map(|variable| variable.index)
            .collect()
    }

    pub fn is_satisfied_by(&self, model: &Model) -> bool {
        self.unsatisfied_constraints(model).is_empty() && self.violated_bounds(model).is_empty()
    }
}
