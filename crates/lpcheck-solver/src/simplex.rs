use log::{debug, trace};
use num_traits::{One, Signed, Zero};

use crate::rational::Rational;
use crate::registry::VariableRegistry;
use crate::solution::{LpResult, Model};
use crate::state::{SolvingState, StateError};

/// Exact bounded-variable simplex solver for feasibility queries
#[derive(Debug, Clone)]
pub struct LpSolver {
    /// Walk to the canonical vertex after a feasible point is found
    vertex_selection: bool,
    /// Re-check every model against the state before returning it
    verify_models: bool,
}

impl Default for LpSolver {
    fn default() -> Self {
        Self {
            vertex_selection: true,
            verify_models: cfg!(debug_assertions),
        }
    }
}

impl LpSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// With vertex selection off, `check` returns the first feasible point
    /// Phase 1 reaches. The verdict is the same either way.
    pub fn with_vertex_selection(mut self, enabled: bool) -> Self {
        self.vertex_selection = enabled;
        self
    }

    pub fn with_model_verification(mut self, enabled: bool) -> Self {
        self.verify_models = enabled;
        self
    }

    /// Decide feasibility of `state` and produce a witness when one exists.
    ///
    /// Panics if `state` is malformed (see [`SolvingState::validate`]); states
    /// built through the registry and the `add_*` methods never are.
    pub fn check(&self, state: &SolvingState) -> LpResult {
        match self.try_check(state) {
            Ok(result) => result,
            Err(err) => panic!("malformed solving state: {err}"),
        }
    }

    /// Like [`LpSolver::check`], but reports a malformed state as an error.
    pub fn try_check(&self, state: &SolvingState) -> Result<LpResult, StateError> {
        state.validate()?;

        let registry = state.variables();
        debug!(
            "checking {} variables, {} constraints",
            registry.num_variables(),
            state.constraints().len()
        );

        for variable in registry.variables() {
            let bounds = state.bounds(variable.index);
            if bounds.is_empty() {
                debug!("infeasible: bounds of {} cross", variable.name);
                return Ok(LpResult::Infeasible);
            }
        }

        let mut tableau = Tableau::build(state);
        debug!(
            "tableau: {} rows, {} structural, {} slack, {} artificial",
            tableau.rows.len(),
            tableau.n_structural,
            tableau.n_slack,
            tableau.n_artificial
        );

        if tableau.n_artificial > 0 {
            let costs = tableau.phase_one_costs();
            match tableau.optimize(&costs) {
                Outcome::Optimal { pivots } => {
                    debug!("phase 1 finished after {pivots} pivots");
                }
                Outcome::Unbounded { column, .. } => {
                    unreachable!("phase 1 objective is bounded by zero, column {column} is not")
                }
            }

            let residual = tableau.artificial_sum();
            if !residual.is_zero() {
                debug!("infeasible: artificial sum {residual} after phase 1");
                return Ok(LpResult::Infeasible);
            }
            tableau.pin_artificials();
        }

        if self.vertex_selection {
            let costs = tableau.vertex_costs(state);
            match tableau.optimize(&costs) {
                Outcome::Optimal { pivots } => {
                    debug!("vertex selection finished after {pivots} pivots");
                }
                Outcome::Unbounded { column, pivots } => {
                    debug!(
                        "vertex selection stopped after {pivots} pivots: column {column} is unbounded"
                    );
                }
            }
        }

        let model = tableau.model(registry);
        if self.verify_models {
            assert!(
                state.is_satisfied_by(&model),
                "extracted model violates the solving state: {model}"
            );
        }
        Ok(LpResult::Feasible(model))
    }
}

enum Outcome {
    Optimal { pivots: usize },
    Unbounded { column: usize, pivots: usize },
}

enum Step {
    /// The entering column runs into its own opposite bound
    Flip { theta: Rational },
    /// The basic variable of `row` hits a bound first and leaves
    Pivot { row: usize, theta: Rational },
}

/// Dense tableau in canonical form: `rows[i][basis[i]] == 1` and every other
/// row is zero in that column. `values` always satisfies the original
/// equalities; non-basic columns sit exactly on one of their bounds.
///
/// Columns are ordered structural variables (registry order), then one slack
/// per inequality, then one artificial per row that needs one.
///
/// `objective` holds the reduced costs of the objective being optimized and is
/// kept current by every pivot.
struct Tableau {
    rows: Vec<Vec<Rational>>,
    objective: Vec<Rational>,
    basis: Vec<usize>,
    basic_row: Vec<Option<usize>>,
    values: Vec<Rational>,
    lower: Vec<Rational>,
    upper: Vec<Option<Rational>>,
    n_structural: usize,
    n_slack: usize,
    n_artificial: usize,
}

impl Tableau {
    fn build(state: &SolvingState) -> Self {
        let n_structural = state.variables().num_variables();
        let constraints = state.constraints();

        let mut lower = Vec::with_capacity(n_structural);
        let mut upper = Vec::with_capacity(n_structural);
        for index in 1..=n_structural {
            let bounds = state.bounds(index);
            lower.push(bounds.lower);
            upper.push(bounds.upper);
        }

        // Each row's slack against the starting point where every structural
        // variable sits at its lower bound.
        let residuals: Vec<Rational> = constraints
            .iter()
            .map(|c| {
                c.coefficients
                    .iter()
                    .enumerate()
                    .skip(1)
                    .fold(c.rhs(), |acc, (index, coeff)| acc - coeff * &lower[index - 1])
            })
            .collect();
        let needs_artificial: Vec<bool> = constraints
            .iter()
            .zip(&residuals)
            .map(|(c, residual)| c.equality || residual.is_negative())
            .collect();

        let n_slack = constraints.iter().filter(|c| !c.equality).count();
        let n_artificial = needs_artificial.iter().filter(|&&needed| needed).count();
        let n_cols = n_structural + n_slack + n_artificial;

        let mut values = lower.clone();
        values.resize(n_cols, Rational::zero());
        lower.resize(n_cols, Rational::zero());
        upper.resize(n_cols, None);

        let mut rows = Vec::with_capacity(constraints.len());
        let mut basis = Vec::with_capacity(constraints.len());
        let mut slack_col = n_structural;
        let mut artificial_col = n_structural + n_slack;

        for (i, constraint) in constraints.iter().enumerate() {
            let mut row = vec![Rational::zero(); n_cols];
            for (index, coeff) in constraint.coefficients.iter().enumerate().skip(1) {
                row[index - 1] = coeff.clone();
            }

            let slack = (!constraint.equality).then(|| {
                row[slack_col] = Rational::one();
                slack_col += 1;
                slack_col - 1
            });

            let residual = &residuals[i];
            if needs_artificial[i] {
                if residual.is_negative() {
                    for entry in row.iter_mut() {
                        *entry = -entry.clone();
                    }
                }
                row[artificial_col] = Rational::one();
                values[artificial_col] = residual.abs();
                basis.push(artificial_col);
                artificial_col += 1;
            } else if let Some(slack) = slack {
                values[slack] = residual.clone();
                basis.push(slack);
            }
            rows.push(row);
        }

        let mut basic_row = vec![None; n_cols];
        for (row, &column) in basis.iter().enumerate() {
            basic_row[column] = Some(row);
        }

        Self {
            rows,
            objective: vec![Rational::zero(); n_cols],
            basis,
            basic_row,
            values,
            lower,
            upper,
            n_structural,
            n_slack,
            n_artificial,
        }
    }

    fn n_cols(&self) -> usize {
        self.values.len()
    }

    fn artificial_columns(&self) -> std::ops::Range<usize> {
        let start = self.n_structural + self.n_slack;
        start..start + self.n_artificial
    }

    /// Maximize `-sum(artificials)`.
    fn phase_one_costs(&self) -> Vec<Rational> {
        let mut costs = vec![Rational::zero(); self.n_cols()];
        for column in self.artificial_columns() {
            costs[column] = -Rational::one();
        }
        costs
    }

    /// Maximize the sum of the structural variables that occur in some
    /// constraint. Variables no constraint mentions stay at their lower bound.
    fn vertex_costs(&self, state: &SolvingState) -> Vec<Rational> {
        let mut costs = vec![Rational::zero(); self.n_cols()];
        for constraint in state.constraints() {
            for (index, coeff) in constraint.coefficients.iter().enumerate().skip(1) {
                if !coeff.is_zero() {
                    costs[index - 1] = Rational::one();
                }
            }
        }
        costs
    }

    fn artificial_sum(&self) -> Rational {
        self.artificial_columns()
            .fold(Rational::zero(), |acc, column| acc + &self.values[column])
    }

    /// Fix every artificial to zero. Basic ones stay put until a pivot through
    /// their row moves them out.
    fn pin_artificials(&mut self) {
        for column in self.artificial_columns() {
            self.upper[column] = Some(Rational::zero());
        }
    }

    fn is_fixed(&self, column: usize) -> bool {
        self.upper[column].as_ref() == Some(&self.lower[column])
    }

    /// Price out the basic columns: `d_j = c_j - sum(c_B * a_ij)`.
    fn set_objective(&mut self, costs: &[Rational]) {
        self.objective = (0..self.n_cols())
            .map(|column| self.reduced_cost(costs, column))
            .collect();
    }

    fn reduced_cost(&self, costs: &[Rational], column: usize) -> Rational {
        self.rows
            .iter()
            .zip(&self.basis)
            .filter(|(row, basic)| !costs[**basic].is_zero() && !row[column].is_zero())
            .fold(costs[column].clone(), |acc, (row, &basic)| {
                acc - &costs[basic] * &row[column]
            })
    }

    /// Bland's rule: the lowest column whose reduced cost improves the
    /// objective in a direction its bounds allow. Returns the column and
    /// whether it should increase.
    fn entering_column(&self) -> Option<(usize, bool)> {
        (0..self.n_cols())
            .filter(|&column| self.basic_row[column].is_none() && !self.is_fixed(column))
            .find_map(|column| {
                let reduced = &self.objective[column];
                let below_upper = self.upper[column]
                    .as_ref()
                    .is_none_or(|upper| self.values[column] < *upper);
                if reduced.is_positive() && below_upper {
                    Some((column, true))
                } else if reduced.is_negative() && self.values[column] > self.lower[column] {
                    Some((column, false))
                } else {
                    None
                }
            })
    }

    /// Longest step the entering column can take before it or some basic
    /// variable hits a bound. A flip wins ties; among rows the lowest basic
    /// column wins. `None` means the direction is unbounded.
    fn ratio_test(&self, column: usize, increase: bool) -> Option<Step> {
        let mut limit = self.upper[column]
            .as_ref()
            .map(|upper| upper - &self.lower[column]);
        let mut leaving: Option<usize> = None;

        for (row, entries) in self.rows.iter().enumerate() {
            let entry = &entries[column];
            if entry.is_zero() {
                continue;
            }
            let basic = self.basis[row];
            // change of the basic variable per unit step of the entering one
            let rate = if increase { -entry.clone() } else { entry.clone() };
            let room = if rate.is_negative() {
                Some((&self.values[basic] - &self.lower[basic]) / -&rate)
            } else {
                self.upper[basic]
                    .as_ref()
                    .map(|upper| (upper - &self.values[basic]) / &rate)
            };
            let Some(room) = room else {
                continue;
            };

            let better = match (&limit, leaving) {
                (None, _) => true,
                (Some(current), None) => room < *current,
                (Some(current), Some(previous)) => {
                    room < *current || (room == *current && basic < self.basis[previous])
                }
            };
            if better {
                limit = Some(room);
                leaving = Some(row);
            }
        }

        match (limit, leaving) {
            (None, _) => None,
            (Some(theta), None) => Some(Step::Flip { theta }),
            (Some(theta), Some(row)) => Some(Step::Pivot { row, theta }),
        }
    }

    /// Move the entering column by `theta` and carry the basic variables
    /// along so every row stays satisfied.
    fn shift(&mut self, column: usize, increase: bool, theta: &Rational) {
        let delta = if increase { theta.clone() } else { -theta.clone() };
        self.values[column] = &self.values[column] + &delta;
        for (row, entries) in self.rows.iter().enumerate() {
            let entry = &entries[column];
            if entry.is_zero() {
                continue;
            }
            let basic = self.basis[row];
            self.values[basic] = &self.values[basic] - entry * &delta;
        }
    }

    fn pivot(&mut self, row: usize, column: usize) {
        let inverse = self.rows[row][column].recip();
        for entry in self.rows[row].iter_mut() {
            if !entry.is_zero() {
                *entry = &*entry * &inverse;
            }
        }

        let pivot_row = self.rows[row].clone();
        for (other, entries) in self.rows.iter_mut().enumerate() {
            if other == row || entries[column].is_zero() {
                continue;
            }
            let factor = entries[column].clone();
            for (entry, pivot_entry) in entries.iter_mut().zip(&pivot_row) {
                if !pivot_entry.is_zero() {
                    *entry = &*entry - &factor * pivot_entry;
                }
            }
        }

        let factor = self.objective[column].clone();
        if !factor.is_zero() {
            for (entry, pivot_entry) in self.objective.iter_mut().zip(&pivot_row) {
                if !pivot_entry.is_zero() {
                    *entry = &*entry - &factor * pivot_entry;
                }
            }
        }

        let leaving = self.basis[row];
        self.basic_row[leaving] = None;
        self.basic_row[column] = Some(row);
        self.basis[row] = column;
        trace!("pivot: column {column} enters at row {row}, column {leaving} leaves");
    }

    fn optimize(&mut self, costs: &[Rational]) -> Outcome {
        self.set_objective(costs);
        let mut pivots = 0;
        loop {
            let Some((column, increase)) = self.entering_column() else {
                return Outcome::Optimal { pivots };
            };
            match self.ratio_test(column, increase) {
                None => return Outcome::Unbounded { column, pivots },
                Some(Step::Flip { theta }) => {
                    trace!("bound flip: column {column} moves by {theta}");
                    self.shift(column, increase, &theta);
                }
                Some(Step::Pivot { row, theta }) => {
                    self.shift(column, increase, &theta);
                    self.pivot(row, column);
                }
            }
            pivots += 1;
        }
    }

    fn model(&self, registry: &VariableRegistry) -> Model {
        registry
            .variables()
            .map(|variable| {
                (
                    variable.name.to_string(),
                    self.values[variable.index - 1].clone(),
                )
            })
            .collect()
    }
}
