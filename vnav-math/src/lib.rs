#![allow(
    clippy::excessive_precision,
    clippy::unreadable_literal,
    reason = "we don't really want to read the mathematical constants in this file."
)]

use std::fmt;

mod units;
pub use units::*;

mod physics;
pub use physics::*;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

pub trait Between<U>: PartialOrd<U> {
    fn between_inclusive(&self, min: &U, max: &U) -> bool { self >= min && self <= max }
}

impl<T: PartialOrd<U>, U> Between<U> for T {}

/// Error returned by the `assert_approx` family when two quantities diverge
/// by more than the accepted epsilon.
#[derive(thiserror::Error)]
#[error("{actual:?} deviates from {expect:?} by more than {epsilon:?}")]
pub struct AssertApproxError<V: fmt::Debug, E: fmt::Debug> {
    pub actual:  V,
    pub expect:  V,
    pub epsilon: E,
}

impl<V: fmt::Debug, E: fmt::Debug> fmt::Debug for AssertApproxError<V, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}
