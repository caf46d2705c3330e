use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_traits::{One, Signed, Zero};

use crate::rational::{Rational, add_vectors, scale_vector, sub_vectors};

/// A linear expression stored as a dense coefficient vector.
///
/// Slot 0 holds the constant term and slot `i` the coefficient of the variable
/// with registry index `i`. Vectors built before a variable existed are simply
/// shorter; every operation treats missing high slots as zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearExpr {
    coefficients: Vec<Rational>,
}

impl LinearExpr {
    pub fn constant(value: Rational) -> Self {
        Self {
            coefficients: vec![value],
        }
    }

    /// The expression `1 * x_index`. Index 0 is the constant slot, so
    /// `unit(0)` is the constant one.
    pub fn unit(index: usize) -> Self {
        let mut coefficients = vec![Rational::zero(); index + 1];
        coefficients[index] = Rational::one();
        Self { coefficients }
    }

    pub fn coefficient(&self, index: usize) -> Rational {
        self.coefficients
            .get(index)
            .cloned()
            .unwrap_or_else(Rational::zero)
    }

    pub fn constant_term(&self) -> Rational {
        self.coefficient(0)
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// True when no variable has a non-zero coefficient.
    pub fn is_constant(&self) -> bool {
        self.coefficients.iter().skip(1).all(Zero::is_zero)
    }

    pub fn scale(&self, factor: &Rational) -> Self {
        Self {
            coefficients: scale_vector(&self.coefficients, factor),
        }
    }

    pub fn as_slice(&self) -> &[Rational] {
        &self.coefficients
    }

    pub fn into_coefficients(self) -> Vec<Rational> {
        self.coefficients
    }
}

impl From<Vec<Rational>> for LinearExpr {
    fn from(coefficients: Vec<Rational>) -> Self {
        Self { coefficients }
    }
}

impl From<Rational> for LinearExpr {
    fn from(value: Rational) -> Self {
        Self::constant(value)
    }
}

impl Add for LinearExpr {
    type Output = LinearExpr;

    fn add(self, rhs: LinearExpr) -> LinearExpr {
        &self + &rhs
    }
}

impl Add<&LinearExpr> for &LinearExpr {
    type Output = LinearExpr;

    fn add(self, rhs: &LinearExpr) -> LinearExpr {
        LinearExpr {
            coefficients: add_vectors(&self.coefficients, &rhs.coefficients),
        }
    }
}

impl Sub for LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: LinearExpr) -> LinearExpr {
        &self - &rhs
    }
}

impl Sub<&LinearExpr> for &LinearExpr {
    type Output = LinearExpr;

    fn sub(self, rhs: &LinearExpr) -> LinearExpr {
        LinearExpr {
            coefficients: sub_vectors(&self.coefficients, &rhs.coefficients),
        }
    }
}

impl Neg for LinearExpr {
    type Output = LinearExpr;

    fn neg(self) -> LinearExpr {
        LinearExpr {
            coefficients: self.coefficients.into_iter().map(|c| -c).collect(),
        }
    }
}

impl Mul<Rational> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, factor: Rational) -> LinearExpr {
        self.scale(&factor)
    }
}

impl Mul<LinearExpr> for Rational {
    type Output = LinearExpr;

    fn mul(self, expr: LinearExpr) -> LinearExpr {
        expr.scale(&self)
    }
}

impl From<i64> for LinearExpr {
    fn from(value: i64) -> Self {
        Self::constant(Rational::from_integer(value.into()))
    }
}

impl Mul<i64> for LinearExpr {
    type Output = LinearExpr;

    fn mul(self, factor: i64) -> LinearExpr {
        self.scale(&Rational::from_integer(factor.into()))
    }
}

impl Mul<LinearExpr> for i64 {
    type Output = LinearExpr;

    fn mul(self, expr: LinearExpr) -> LinearExpr {
        expr * self
    }
}

/// Renders with positional names (`x1`, `x2`, ...) since the expression does
/// not know its registry.
impl fmt::Display for LinearExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut wrote = false;
        for (index, coeff) in self.coefficients.iter().enumerate().skip(1) {
            if coeff.is_zero() {
                continue;
            }
            let sign = if coeff.is_negative() { "-" } else { "+" };
            if wrote {
                write!(f, " {sign} ")?;
            } else if coeff.is_negative() {
                write!(f, "-")?;
            }
            let magnitude = coeff.abs();
            if magnitude.is_one() {
                write!(f, "x{index}")?;
            } else {
                write!(f, "{magnitude}*x{index}")?;
            }
            wrote = true;
        }

        let constant = self.constant_term();
        if !wrote {
            return write!(f, "{constant}");
        }
        if !constant.is_zero() {
            let sign = if constant.is_negative() { "-" } else { "+" };
            write!(f, " {sign} {}", constant.abs())?;
        }
        Ok(())
    }
}
