//! Property-based checks of the feasibility solver.
//!
//! Problems are small random systems over up to three variables with integer
//! coefficients, so every run terminates quickly and counterexamples shrink to
//! something readable.

use lpcheck_solver::{Bounds, LinearExpr, LpResult, LpSolver, Rational, SolvingState, rational};
use num_traits::{Signed, Zero};
use proptest::prelude::*;

const NAMES: [&str; 3] = ["x", "y", "z"];

#[derive(Clone, Debug)]
struct RawConstraint {
    coefficients: Vec<i64>,
    rhs: i64,
    equality: bool,
}

impl RawConstraint {
    fn scaled(&self, factor: i64) -> Self {
        Self {
            coefficients: self.coefficients.iter().map(|c| c * factor).collect(),
            rhs: self.rhs * factor,
            equality: self.equality,
        }
    }
}

fn constraint_strategy(num_vars: usize) -> impl Strategy<Value = RawConstraint> {
    (
        prop::collection::vec(-3i64..=3, num_vars),
        -5i64..=10,
        prop::bool::weighted(0.2),
    )
        .prop_map(|(coefficients, rhs, equality)| RawConstraint {
            coefficients,
            rhs,
            equality,
        })
}

fn problem_strategy() -> impl Strategy<Value = Vec<RawConstraint>> {
    (1usize..=3).prop_flat_map(|num_vars| {
        prop::collection::vec(constraint_strategy(num_vars), 1..=4)
    })
}

fn build(constraints: &[RawConstraint]) -> SolvingState {
    let mut state = SolvingState::new();
    let num_vars = constraints.first().map_or(0, |c| c.coefficients.len());
    let vars: Vec<LinearExpr> = NAMES[..num_vars]
        .iter()
        .map(|name| state.variable(name))
        .collect();

    for constraint in constraints {
        let lhs = constraint
            .coefficients
            .iter()
            .zip(&vars)
            .fold(LinearExpr::from(0), |acc, (&coeff, var)| {
                acc + coeff * var.clone()
            });
        if constraint.equality {
            state.add_equality(lhs, constraint.rhs);
        } else {
            state.add_inequality(lhs, constraint.rhs);
        }
    }
    state
}

fn solver() -> LpSolver {
    // verified explicitly by the properties below
    LpSolver::new().with_model_verification(false)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_check_is_deterministic(problem in problem_strategy()) {
        let state = build(&problem);
        let first = solver().check(&state);
        let second = solver().check(&state);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_models_satisfy_every_constraint(problem in problem_strategy()) {
        let state = build(&problem);
        if let LpResult::Feasible(model) = solver().check(&state) {
            prop_assert!(
                state.unsatisfied_constraints(&model).is_empty(),
                "violated constraints {:?} by\n{}",
                state.unsatisfied_constraints(&model),
                model
            );
            prop_assert_eq!(model.len(), state.variables().num_variables());
        }
    }

    #[test]
    fn prop_unbounded_variables_are_non_negative(problem in problem_strategy()) {
        let state = build(&problem);
        if let Some(model) = solver().check(&state).into_model() {
            for (name, value) in model.iter() {
                prop_assert!(!value.is_negative(), "{} = {}", name, value);
            }
        }
    }

    #[test]
    fn prop_vertex_selection_keeps_verdict(problem in problem_strategy()) {
        let state = build(&problem);
        let selected = solver().check(&state);
        let first_found = solver().with_vertex_selection(false).check(&state);
        prop_assert_eq!(selected.is_feasible(), first_found.is_feasible());
        if let Some(model) = first_found.model() {
            prop_assert!(state.is_satisfied_by(model));
        }
    }

    #[test]
    fn prop_scaling_a_constraint_keeps_verdict(
        problem in problem_strategy(),
        which in any::<prop::sample::Index>(),
        factor in 1i64..=5,
    ) {
        let position = which.index(problem.len());
        let mut scaled = problem.clone();
        scaled[position] = problem[position].scaled(factor);

        let original = solver().check(&build(&problem));
        let rescaled = solver().check(&build(&scaled));
        prop_assert_eq!(original.is_feasible(), rescaled.is_feasible());
    }

    #[test]
    fn prop_infeasibility_survives_tightening(
        problem in problem_strategy(),
        extra in constraint_strategy(3),
    ) {
        let state = build(&problem);
        prop_assume!(!solver().check(&state).is_feasible());

        let mut tightened = problem.clone();
        let num_vars = problem[0].coefficients.len();
        tightened.push(RawConstraint {
            coefficients: extra.coefficients[..num_vars].to_vec(),
            ..extra
        });
        prop_assert_eq!(solver().check(&build(&tightened)), LpResult::Infeasible);
    }
}

/// A random system together with explicit per-variable bounds: lowers may be
/// negative, uppers may be absent, and the two may cross.
#[derive(Clone, Debug)]
struct BoundedProblem {
    constraints: Vec<RawConstraint>,
    bounds: Vec<(i64, Option<i64>)>,
}

impl BoundedProblem {
    fn state(&self) -> SolvingState {
        let mut state = build(&self.constraints);
        for (name, &(lower, upper)) in NAMES.iter().zip(&self.bounds) {
            state.set_bounds(
                name,
                Bounds::new(rational(lower, 1), upper.map(|u| rational(u, 1))),
            );
        }
        state
    }

    fn num_vars(&self) -> usize {
        self.bounds.len()
    }

    fn satisfied_by(&self, point: &[Rational]) -> bool {
        let rows_hold = self.constraints.iter().all(|c| {
            let lhs = c
                .coefficients
                .iter()
                .zip(point)
                .fold(Rational::zero(), |acc, (&coeff, value)| {
                    acc + rational(coeff, 1) * value
                });
            let rhs = rational(c.rhs, 1);
            if c.equality { lhs == rhs } else { lhs <= rhs }
        });
        let bounds_hold = self.bounds.iter().zip(point).all(|(&(lower, upper), value)| {
            *value >= rational(lower, 1) && upper.is_none_or(|u| *value <= rational(u, 1))
        });
        rows_hold && bounds_hold
    }

    /// Every finite lower bound makes the region pointed, so it is non-empty
    /// exactly when some vertex is feasible. Vertices are the unique solutions
    /// of `n` tight hyperplanes drawn from the rows and the bounds.
    fn has_feasible_vertex(&self) -> bool {
        let n = self.num_vars();
        let mut planes: Vec<(Vec<Rational>, Rational)> = self
            .constraints
            .iter()
            .map(|c| {
                let coeffs = c.coefficients.iter().map(|&a| rational(a, 1)).collect();
                (coeffs, rational(c.rhs, 1))
            })
            .collect();
        for (var, &(lower, upper)) in self.bounds.iter().enumerate() {
            let unit: Vec<Rational> = (0..n)
                .map(|i| if i == var { rational(1, 1) } else { Rational::zero() })
                .collect();
            planes.push((unit.clone(), rational(lower, 1)));
            if let Some(upper) = upper {
                planes.push((unit, rational(upper, 1)));
            }
        }

        let mut chosen = Vec::with_capacity(n);
        self.any_vertex(&planes, 0, &mut chosen)
    }

    fn any_vertex(
        &self,
        planes: &[(Vec<Rational>, Rational)],
        start: usize,
        chosen: &mut Vec<usize>,
    ) -> bool {
        if chosen.len() == self.num_vars() {
            let system = chosen
                .iter()
                .map(|&i| {
                    let (coeffs, rhs) = &planes[i];
                    let mut row = coeffs.clone();
                    row.push(rhs.clone());
                    row
                })
                .collect();
            return solve(system).is_some_and(|point| self.satisfied_by(&point));
        }
        for next in start..planes.len() {
            chosen.push(next);
            let found = self.any_vertex(planes, next + 1, chosen);
            chosen.pop();
            if found {
                return true;
            }
        }
        false
    }
}

/// Gauss-Jordan elimination on an `n x (n + 1)` augmented matrix. `None` when
/// the system is singular.
fn solve(mut rows: Vec<Vec<Rational>>) -> Option<Vec<Rational>> {
    let n = rows.len();
    for col in 0..n {
        let pivot = (col..n).find(|&r| !rows[r][col].is_zero())?;
        rows.swap(col, pivot);
        let inverse = rows[col][col].recip();
        for entry in rows[col].iter_mut() {
            *entry = &*entry * &inverse;
        }
        let pivot_row = rows[col].clone();
        for (r, row) in rows.iter_mut().enumerate() {
            if r == col || row[col].is_zero() {
                continue;
            }
            let factor = row[col].clone();
            for (entry, p) in row.iter_mut().zip(&pivot_row) {
                *entry = &*entry - &factor * p;
            }
        }
    }
    Some(rows.into_iter().map(|row| row[n].clone()).collect())
}

fn bounded_problem_strategy() -> impl Strategy<Value = BoundedProblem> {
    (1usize..=3)
        .prop_flat_map(|num_vars| {
            (
                prop::collection::vec(constraint_strategy(num_vars), 1..=4),
                prop::collection::vec((-3i64..=2, prop::option::of(-1i64..=6)), num_vars),
            )
        })
        .prop_map(|(constraints, bounds)| BoundedProblem {
            constraints,
            bounds,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    #[test]
    fn prop_verdict_matches_vertex_enumeration(problem in bounded_problem_strategy()) {
        let state = problem.state();
        let expected = problem.has_feasible_vertex();

        for selection in [true, false] {
            let result = solver().with_vertex_selection(selection).check(&state);
            prop_assert_eq!(
                result.is_feasible(),
                expected,
                "vertex selection {}: {:?}",
                selection,
                result
            );
            if let Some(model) = result.model() {
                let point: Vec<Rational> = NAMES[..problem.num_vars()]
                    .iter()
                    .map(|name| model.get(name).cloned().unwrap_or_else(Rational::zero))
                    .collect();
                prop_assert!(problem.satisfied_by(&point), "model violates the problem:\n{}", model);
            }
        }
    }
}
