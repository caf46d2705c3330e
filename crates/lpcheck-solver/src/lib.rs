mod expr;
mod rational;
mod registry;
mod simplex;
mod solution;
mod state;

pub use expr::LinearExpr;
pub use rational::{
    Rational, add_vectors, parse_rational, rational, scale_vector, sub_vectors, zero_extended,
};
pub use registry::{Variable, VariableRegistry};
pub use simplex::LpSolver;
pub use solution::{LpResult, Model};
pub use state::{Bounds, Constraint, SolvingState, StateError};
