//! Exact computer algebra for equivalence checking.
//!
//! Expressions are parsed into an [`Expr`] tree and then reduced to a
//! [`RationalFunction`] over multivariate polynomials with exact rational
//! coefficients. Two expressions are equivalent when the numerator of
//! their difference is the zero polynomial.

pub mod expr;
pub mod poly;

pub use expr::{parse, Expr, Func};
pub use poly::{canonicalize, Atom, Monomial, Poly, RationalFunction};

/// Errors from parsing or simplifying an expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CasError {
    /// Malformed input.
    #[error("parse error: {0}")]
    Parse(String),

    /// Well-formed input outside the supported algebra.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Simplification exceeded the term or exponent limits.
    #[error("expression too complex: {0}")]
    TooComplex(String),

    #[error("division by zero")]
    DivisionByZero,
}

/// Parse and simplify `text`, returning the canonical printed form.
pub fn simplify_str(text: &str) -> Result<String, CasError> {
    Ok(canonicalize(&parse(text)?)?.to_string())
}

/// Whether `lhs - rhs` simplifies to exactly zero.
///
/// A nonzero difference is only reported as `false` when every embedded
/// argument is known to be in lowest terms; otherwise two equal
/// arguments could print differently and the answer is
/// [`CasError::Unsupported`].
pub fn equivalent(lhs: &Expr, rhs: &Expr) -> Result<bool, CasError> {
    let diff = canonicalize(lhs)?.sub(&canonicalize(rhs)?)?;
    if diff.is_zero() {
        return Ok(true);
    }
    if !diff.atoms_reduced() {
        return Err(CasError::Unsupported(
            "function argument not known to be in lowest terms".into(),
        ));
    }
    Ok(false)
}

/// String form of [`equivalent`].
pub fn equivalent_str(lhs: &str, rhs: &str) -> Result<bool, CasError> {
    equivalent(&parse(lhs)?, &parse(rhs)?)
}
