use std::{fmt, ops};

use crate::{AssertApproxError, Length};

/// An altitude above mean sea level.
#[derive(Clone, Copy, Default, PartialEq, PartialOrd, serde::Serialize)]
pub struct Position<T>(pub Length<T>);

impl<'de, T: serde::Deserialize<'de> + super::IsFinite> serde::Deserialize<'de> for Position<T> {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        <Length<T> as serde::Deserialize<'de>>::deserialize(d).map(Self)
    }
}

impl<T> Position<T> {
    pub const fn new(value: T) -> Self { Position(Length::new(value)) }

    pub fn get(self) -> T { self.0.0 }
}

impl Position<f32> {
    pub const SEA_LEVEL: Self = Self(Length::new(0.));

    #[must_use]
    pub const fn from_amsl_feet(z: f32) -> Self { Position(Length::from_feet(z)) }

    #[must_use]
    pub const fn from_amsl_meters(z: f32) -> Self { Position(Length::from_meters(z)) }

    #[must_use]
    pub const fn amsl(self) -> Length<f32> { self.0 }

    /// Inverse lerp function.
    #[must_use]
    pub fn ratio_between(self, start: Self, end: Self) -> f32 {
        self.0.ratio_between(start.0, end.0)
    }

    #[must_use]
    pub fn min(self, other: Self) -> Self { Self(self.0.min(other.0)) }

    #[must_use]
    pub fn max(self, other: Self) -> Self { Self(self.0.max(other.0)) }

    #[must_use]
    pub fn clamp(self, min: Self, max: Self) -> Self { Self(self.0.clamp(min.0, max.0)) }

    #[must_use]
    pub fn lerp(self, other: Self, s: f32) -> Self { Self(self.0.lerp(other.0, s)) }

    /// Asserts that the altitude is within `epsilon` of `expect`.
    ///
    /// # Errors
    /// If the absolute difference between `self` and `expect` is greater than `epsilon`.
    pub fn assert_near(
        self,
        expect: Self,
        epsilon: Length<f32>,
    ) -> Result<(), AssertApproxError<Self, Length<f32>>> {
        if (self - expect).abs() > epsilon {
            Err(AssertApproxError { actual: self, expect, epsilon })
        } else {
            Ok(())
        }
    }
}

impl fmt::Debug for Position<f32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("nm", &self.0.0)
            .field("feet", &self.0.into_feet())
            .finish()
    }
}

impl<T: ops::AddAssign> ops::Add<Length<T>> for Position<T> {
    type Output = Self;

    fn add(mut self, rhs: Length<T>) -> Self::Output {
        self.0 += rhs;
        self
    }
}

impl<T: ops::AddAssign> ops::AddAssign<Length<T>> for Position<T> {
    fn add_assign(&mut self, rhs: Length<T>) { self.0 += rhs; }
}

impl<T: ops::SubAssign> ops::Sub<Length<T>> for Position<T> {
    type Output = Self;

    fn sub(mut self, rhs: Length<T>) -> Self::Output {
        self.0 -= rhs;
        self
    }
}

impl<T: ops::SubAssign> ops::SubAssign<Length<T>> for Position<T> {
    fn sub_assign(&mut self, rhs: Length<T>) { self.0 -= rhs; }
}

impl<T: ops::Sub<Output = T>> ops::Sub for Position<T> {
    type Output = Length<T>;

    fn sub(self, rhs: Self) -> Length<T> { self.0 - rhs.0 }
}
