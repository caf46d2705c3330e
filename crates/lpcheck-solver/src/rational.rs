use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::Zero;

/// Exact rational number used for every coefficient, bound and model value.
pub type Rational = BigRational;

/// Build `numer / denom`. Panics if `denom` is zero.
pub fn rational(numer: i64, denom: i64) -> Rational {
    Rational::new(BigInt::from(numer), BigInt::from(denom))
}

/// Parse `"5"`, `"-3"`, `"5/8"` or `"0.125"` into an exact rational.
///
/// Decimal literals are read digit by digit, so `"0.1"` is exactly `1/10`.
/// Returns `None` for malformed text or a zero denominator.
pub fn parse_rational(text: &str) -> Option<Rational> {
    let text = text.trim();
    if let Some((numer, denom)) = text.split_once('/') {
        let numer = parse_decimal(numer.trim())?;
        let denom = parse_decimal(denom.trim())?;
        if denom.is_zero() {
            return None;
        }
        return Some(numer / denom);
    }
    parse_decimal(text)
}

fn parse_decimal(text: &str) -> Option<Rational> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mantissa: BigInt = format!("{whole}{fraction}").parse().ok()?;
    let scale = num_traits::pow(BigInt::from(10), fraction.len());
    let value = Rational::new(mantissa, scale);
    Some(if negative { -value } else { value })
}

/// Element-wise `a + b`, zero-extending the shorter operand.
pub fn add_vectors(a: &[Rational], b: &[Rational]) -> Vec<Rational> {
    combine(a, b, |x, y| x + y)
}

/// Element-wise `a - b`, zero-extending the shorter operand.
pub fn sub_vectors(a: &[Rational], b: &[Rational]) -> Vec<Rational> {
    combine(a, b, |x, y| x - y)
}

pub fn scale_vector(v: &[Rational], factor: &Rational) -> Vec<Rational> {
    v.iter().map(|x| x * factor).collect()
}

/// Copy of `v` padded with zeros up to `len`. Never truncates.
pub fn zero_extended(v: &[Rational], len: usize) -> Vec<Rational> {
    let mut out = v.to_vec();
    if out.len() < len {
        out.resize(len, Rational::zero());
    }
    out
}

fn combine(
    a: &[Rational],
    b: &[Rational],
    op: impl Fn(&Rational, &Rational) -> Rational,
) -> Vec<Rational> {
    let zero = Rational::zero();
    (0..a.len().max(b.len()))
        .map(|i| op(a.get(i).unwrap_or(&zero), b.get(i).unwrap_or(&zero)))
        .collect()
}
