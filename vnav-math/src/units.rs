use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::marker::PhantomData;
use std::time::Duration;
use std::{cmp, fmt, iter, ops};

use bevy_math::{Dir2, Vec2, VectorSpace};

use crate::{AssertApproxError, Sign};

mod heading;
pub use heading::Heading;
mod position;
pub use position::Position;
mod temp;
pub use temp::{Temp, TempBase, TempDelta};

/// Converts nautical miles to feet.
pub const FEET_PER_NM: f32 = 6076.12;
/// Converts nautical miles to meter.
pub const METERS_PER_NM: f32 = 1852.;
/// Converts minutes to seconds.
pub const SECONDS_PER_MINUTE: f32 = 60.;
/// Converts hours to seconds.
pub const SECONDS_PER_HOUR: f32 = 3600.;

pub struct Quantity<T, Base, Dt>(pub T, pub PhantomData<(Base, Dt)>);

impl<T, Base, Dt> Quantity<T, Base, Dt> {
    pub const fn new(value: T) -> Self { Self(value, PhantomData) }
}

pub trait QuantityTrait: Sized {
    /// The type of the raw value of this unit.
    type Raw;
    /// Returns a unit with the same dimensional characteristics but with a different raw value type.
    type WithRaw<U>;
    /// The unit type representing the rate of change of this unit.
    /// Internal representation is in s^-1.
    type Rate;

    fn into_raw(self) -> Self::Raw;
    fn as_raw_mut(&mut self) -> &mut Self::Raw;
    fn from_raw(value: Self::Raw) -> Self;
}

impl<T, Base, Dt> QuantityTrait for Quantity<T, Base, Dt> {
    type Raw = T;
    type WithRaw<U> = Quantity<U, Base, Dt>;
    type Rate = Quantity<T, Base, Ddt<Dt>>;

    fn into_raw(self) -> T { self.0 }

    fn as_raw_mut(&mut self) -> &mut T { &mut self.0 }

    fn from_raw(value: T) -> Self { Self(value, PhantomData) }
}

impl<T, Base, Dt> Quantity<T, Base, Dt>
where
    T: VectorSpace<Scalar = f32>,
{
    pub const ZERO: Self = Self(T::ZERO, PhantomData);

    #[must_use]
    pub fn lerp(self, other: Self, s: f32) -> Self { Self(self.0.lerp(other.0, s), PhantomData) }
}

impl<T, Base, Dt> Default for Quantity<T, Base, Dt>
where
    T: Default,
{
    fn default() -> Self { Self(T::default(), PhantomData) }
}

impl<T, Base, Dt> num_traits::Zero for Quantity<T, Base, Dt>
where
    T: Default + PartialEq + ops::Add<Output = T>,
{
    fn zero() -> Self { Self::default() }

    fn is_zero(&self) -> bool { self.0 == T::default() }
}

impl<T, Base, Dt> Clone for Quantity<T, Base, Dt>
where
    T: Clone,
{
    fn clone(&self) -> Self { Self(self.0.clone(), PhantomData) }
}

impl<T, Base, Dt> Copy for Quantity<T, Base, Dt> where T: Copy {}

impl<T, Base, Dt> PartialEq for Quantity<T, Base, Dt>
where
    T: PartialEq,
{
    fn eq(&self, other: &Self) -> bool { self.0 == other.0 }
}

impl<T, Base, Dt> Eq for Quantity<T, Base, Dt> where T: Eq {}

impl<T, Base, Dt> PartialOrd for Quantity<T, Base, Dt>
where
    T: PartialOrd,
{
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> { self.0.partial_cmp(&other.0) }
}

impl<T, Base, Dt> Ord for Quantity<T, Base, Dt>
where
    T: Ord,
{
    fn cmp(&self, other: &Self) -> cmp::Ordering { self.0.cmp(&other.0) }
}

impl<T, Base, Dt> ops::Add for Quantity<T, Base, Dt>
where
    T: ops::Add<Output = T>,
{
    type Output = Self;

    fn add(self, other: Self) -> Self { Self(self.0 + other.0, PhantomData) }
}

impl<T, Base, Dt> ops::AddAssign for Quantity<T, Base, Dt>
where
    T: ops::AddAssign,
{
    fn add_assign(&mut self, other: Self) { self.0 += other.0; }
}

impl<T, Base, Dt> ops::Sub for Quantity<T, Base, Dt>
where
    T: ops::Sub<Output = T>,
{
    type Output = Self;

    fn sub(self, other: Self) -> Self { Self(self.0 - other.0, PhantomData) }
}

impl<T, Base, Dt> ops::SubAssign for Quantity<T, Base, Dt>
where
    T: ops::SubAssign,
{
    fn sub_assign(&mut self, other: Self) { self.0 -= other.0; }
}

impl<T, Base, Dt> ops::Mul<f32> for Quantity<T, Base, Dt>
where
    T: ops::Mul<f32, Output = T>,
{
    type Output = Self;

    fn mul(self, other: f32) -> Self { Self(self.0 * other, PhantomData) }
}

impl<T, Base, Dt> ops::MulAssign<f32> for Quantity<T, Base, Dt>
where
    T: ops::MulAssign<f32>,
{
    fn mul_assign(&mut self, other: f32) { self.0 *= other; }
}

impl<T, Base, Dt> ops::Div<f32> for Quantity<T, Base, Dt>
where
    T: ops::Div<f32, Output = T>,
{
    type Output = Self;

    fn div(self, other: f32) -> Self { Self(self.0 / other, PhantomData) }
}

impl<T, Base, Dt> ops::DivAssign<f32> for Quantity<T, Base, Dt>
where
    T: ops::DivAssign<f32>,
{
    fn div_assign(&mut self, other: f32) { self.0 /= other; }
}

impl<T, Base, Dt> ops::Div for Quantity<T, Base, Dt>
where
    T: ops::Div,
{
    type Output = T::Output;

    fn div(self, other: Self) -> Self::Output { self.0 / other.0 }
}

impl<T, Base, Dt> ops::Rem for Quantity<T, Base, Dt>
where
    T: ops::Rem<Output = T>,
{
    type Output = Self;

    fn rem(self, rhs: Self) -> Self::Output { Self(self.0 % rhs.0, PhantomData) }
}

impl<T, Base, Dt> ops::RemAssign for Quantity<T, Base, Dt>
where
    T: ops::RemAssign,
{
    fn rem_assign(&mut self, rhs: Self) { self.0 %= rhs.0; }
}

impl<T, Base, Dt> ops::Neg for Quantity<T, Base, Dt>
where
    T: ops::Neg<Output = T>,
{
    type Output = Self;

    fn neg(self) -> Self { Self(-self.0, PhantomData) }
}

impl<T: Default + ops::Add<Output = T>, Base, Dt> iter::Sum for Quantity<T, Base, Dt> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |sum, value| sum + value)
    }
}

impl<T, Base, Dt> From<T> for Quantity<T, Base, Dt> {
    fn from(value: T) -> Self { Self(value, PhantomData) }
}

/// Used as `Dt` in `Quantity` to indicate that the unit is not a rate of change.
pub struct DtZero;
/// Used as `Dt` in `Quantity` to indicate that the unit is the rate of change of `Quantity<Dt=Dt>`.
pub struct Ddt<Dt>(Dt);

pub type DtOne = Ddt<DtZero>;
pub type DtTwo = Ddt<DtOne>;

impl<T, Base, Dt> ops::Mul<Duration> for Quantity<T, Base, Ddt<Dt>>
where
    T: ops::Mul<f32, Output = T>,
{
    type Output = Quantity<T, Base, Dt>;

    fn mul(self, other: Duration) -> Self::Output {
        Quantity(self.0 * other.as_secs_f32(), PhantomData)
    }
}

impl<T, Base, Dt> ops::Div<Duration> for Quantity<T, Base, Dt>
where
    T: ops::Div<f32, Output = T>,
{
    type Output = Quantity<T, Base, Ddt<Dt>>;

    fn div(self, other: Duration) -> Self::Output {
        Quantity(self.0 / other.as_secs_f32(), PhantomData)
    }
}

/// (B / T^n) / (B / T^(n+1)) = T
impl<T, Base, Dt> ops::Div<Quantity<T, Base, Ddt<Dt>>> for Quantity<T, Base, Dt>
where
    T: ops::Div<Output = f32>,
{
    type Output = Duration;

    fn div(self, rhs: Quantity<T, Base, Ddt<Dt>>) -> Self::Output {
        Duration::from_secs_f32(self.0 / rhs.0)
    }
}

/// (B / T^n) / (B / T^(n+1)) = T
impl<T, Base, Dt> Quantity<T, Base, Dt>
where
    T: ops::Div<Output = f32>,
{
    pub fn try_div(self, rhs: Quantity<T, Base, Ddt<Dt>>) -> Option<Duration> {
        Duration::try_from_secs_f32(self.0 / rhs.0).ok()
    }
}

/// (B / T^(n+1)) / (B / T^n) = 1/T
impl<Base, Dt> ops::Div<Quantity<f32, Base, Dt>> for Quantity<f32, Base, Ddt<Dt>> {
    type Output = Frequency;

    fn div(self, rhs: Quantity<f32, Base, Dt>) -> Self::Output {
        Quantity(self.0 / rhs.0, PhantomData)
    }
}

impl<T, Base, Dt> Quantity<T, Base, Dt>
where
    T: ops::Mul<f32, Output = T>,
{
    pub fn per_second(self, other: Frequency) -> Quantity<T, Base, Ddt<Dt>> {
        Quantity(self.0 * other.0, PhantomData)
    }
}

impl<Base, Dt> Quantity<f32, Base, Dt> {
    #[must_use]
    pub fn is_positive(self) -> bool { self.0 > 0. }

    #[must_use]
    pub fn is_negative(self) -> bool { self.0 < 0. }

    #[must_use]
    pub fn is_zero(self) -> bool { self.0 == 0. }

    #[must_use]
    pub fn sign(self) -> Sign {
        if self.0 == 0. {
            Sign::Zero
        } else if self.0 < 0. {
            Sign::Negative
        } else {
            Sign::Positive
        }
    }

    #[must_use]
    pub fn abs(self) -> Self { Self(self.0.abs(), PhantomData) }

    #[must_use]
    pub fn copysign(self, other: Self) -> Self { Self(self.0.copysign(other.0), PhantomData) }

    #[must_use]
    pub fn signum(self) -> f32 { self.0.signum() }

    /// Inverse lerp function.
    #[must_use]
    pub fn ratio_between(self, start: Self, end: Self) -> f32 { (self - start).0 / (end - start).0 }

    #[must_use]
    pub fn min(self, other: Self) -> Self { Self(self.0.min(other.0), PhantomData) }

    #[must_use]
    pub fn max(self, other: Self) -> Self { Self(self.0.max(other.0), PhantomData) }

    #[must_use]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self(self.0.clamp(min.0, max.0), PhantomData)
    }

    #[must_use]
    pub fn midpoint(self, other: Self) -> Self { Self(self.0.midpoint(other.0), PhantomData) }

    #[must_use]
    pub fn with_heading(self, heading: Heading) -> <Self as QuantityTrait>::WithRaw<Vec2> {
        Quantity(heading.into_dir2() * self.0, PhantomData)
    }

    /// Asserts that the quantity is within `epsilon` of `expect`.
    ///
    /// # Errors
    /// If the absolute difference between `self` and `expect` is greater than `epsilon`.
    pub fn assert_approx(self, expect: Self, epsilon: Self) -> Result<(), AssertApproxError<Self, Self>>
    where
        Self: fmt::Debug,
    {
        if (self - expect).abs() > epsilon {
            Err(AssertApproxError { actual: self, expect, epsilon })
        } else {
            Ok(())
        }
    }
}

impl<Base, Dt> Quantity<Vec2, Base, Dt> {
    #[must_use]
    pub fn x(self) -> Quantity<f32, Base, Dt> { Quantity(self.0.x, PhantomData) }

    #[must_use]
    pub fn y(self) -> Quantity<f32, Base, Dt> { Quantity(self.0.y, PhantomData) }

    #[must_use]
    pub fn magnitude_exact(self) -> Quantity<f32, Base, Dt> {
        Quantity(self.0.length(), PhantomData)
    }

    /// Returns the vector component projected along `dir`.
    #[must_use]
    pub fn project_onto_dir(self, dir: Dir2) -> Quantity<f32, Base, Dt> {
        Quantity(self.0.dot(*dir), PhantomData)
    }
}

impl<Base, Dt> From<(Quantity<f32, Base, Dt>, Quantity<f32, Base, Dt>)>
    for Quantity<Vec2, Base, Dt>
{
    fn from((x, y): (Quantity<f32, Base, Dt>, Quantity<f32, Base, Dt>)) -> Self {
        Self(Vec2 { x: x.0, y: y.0 }, PhantomData)
    }
}

impl<Dt> Quantity<f32, LengthBase, Dt> {
    #[must_use]
    pub fn atan2(self, x: Self) -> Angle { Angle::from_raw(self.0.atan2(x.0)) }
}

pub struct LengthBase;

/// A distance quantity. Internal representation is in nautical miles.
pub type Length<T> = Quantity<T, LengthBase, DtZero>;

/// A linear speed (rate of [length](Length) change) quantity.
pub type Speed<T> = Quantity<T, LengthBase, DtOne>;

/// A linear acceleration (rate of linear [speed](Speed) change) quantity.
pub type Accel<T> = Quantity<T, LengthBase, DtTwo>;

pub struct AngleBase;

/// A relative angle. Internal representation is in radians.
pub type Angle = Quantity<f32, AngleBase, DtZero>;

pub struct RatioBase;

/// A rate of change of a dimensionless ratio. Always in s^-1.
pub type Frequency = Quantity<f32, RatioBase, DtOne>;

pub struct PressureBase;

/// An air pressure quantity. Internal representation is in pascals.
pub type Pressure = Quantity<f32, PressureBase, DtZero>;

impl fmt::Debug for Length<f32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Length")
            .field("nm", &self.into_nm())
            .field("feet", &self.into_feet())
            .finish()
    }
}

impl fmt::Debug for Speed<f32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Speed")
            .field("knots", &self.into_knots())
            .field("fpm", &self.into_fpm())
            .finish()
    }
}

impl fmt::Debug for Speed<Vec2> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Speed")
            .field("x.knots", &self.x().into_knots())
            .field("y.knots", &self.y().into_knots())
            .finish()
    }
}

impl fmt::Debug for Accel<f32> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accel").field("knots/s", &self.into_knots_per_sec()).finish()
    }
}

impl fmt::Debug for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Angle").field("degrees", &self.into_degrees()).finish()
    }
}

impl fmt::Debug for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frequency").field("per_second", &self.0).finish()
    }
}

impl fmt::Debug for Pressure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pressure").field("pascals", &self.0).finish()
    }
}

impl Length<f32> {
    #[must_use]
    pub const fn into_nm(self) -> f32 { self.0 }

    #[must_use]
    pub const fn from_nm(nm: f32) -> Self { Self(nm, PhantomData) }

    #[must_use]
    pub const fn into_feet(self) -> f32 { self.0 * FEET_PER_NM }

    #[must_use]
    pub const fn from_feet(feet: f32) -> Self { Self(feet / FEET_PER_NM, PhantomData) }

    #[must_use]
    pub const fn into_meters(self) -> f32 { self.0 * METERS_PER_NM }

    #[must_use]
    pub const fn from_meters(meters: f32) -> Self { Self(meters / METERS_PER_NM, PhantomData) }
}

impl Speed<f32> {
    #[must_use]
    pub const fn into_knots(self) -> f32 { self.0 * SECONDS_PER_HOUR }

    #[must_use]
    pub const fn from_knots(knots: f32) -> Self { Self(knots / SECONDS_PER_HOUR, PhantomData) }

    #[must_use]
    pub const fn into_meter_per_sec(self) -> f32 { self.0 * METERS_PER_NM }

    #[must_use]
    pub const fn from_meter_per_sec(mps: f32) -> Self { Self(mps / METERS_PER_NM, PhantomData) }

    #[must_use]
    pub const fn into_fpm(self) -> f32 { self.0 * (SECONDS_PER_MINUTE * FEET_PER_NM) }

    #[must_use]
    pub const fn from_fpm(fpm: f32) -> Self {
        Self(fpm / (SECONDS_PER_MINUTE * FEET_PER_NM), PhantomData)
    }
}

impl Speed<Vec2> {
    #[must_use]
    pub const fn into_knots_vec2(self) -> Vec2 {
        Vec2::new(self.0.x * SECONDS_PER_HOUR, self.0.y * SECONDS_PER_HOUR)
    }

    #[must_use]
    pub const fn vec2_from_knots(knots: Vec2) -> Self {
        Self(Vec2::new(knots.x / SECONDS_PER_HOUR, knots.y / SECONDS_PER_HOUR), PhantomData)
    }
}

impl<T: ops::Mul<f32, Output = T> + ops::Div<f32, Output = T>> Accel<T> {
    #[must_use]
    pub fn into_knots_per_sec(self) -> T { self.0 * SECONDS_PER_HOUR }

    #[must_use]
    pub fn from_knots_per_sec(knots: T) -> Self { Self(knots / SECONDS_PER_HOUR, PhantomData) }
}

impl Accel<f32> {
    #[must_use]
    pub const fn into_meters_per_sec2(self) -> f32 { self.0 * METERS_PER_NM }

    #[must_use]
    pub const fn from_meters_per_sec2(mps2: f32) -> Self {
        Self(mps2 / METERS_PER_NM, PhantomData)
    }
}

impl Angle {
    pub const RIGHT: Self = Self(FRAC_PI_2, PhantomData);
    pub const STRAIGHT: Self = Self(PI, PhantomData);
    pub const FULL: Self = Self(TAU, PhantomData);

    #[must_use]
    pub const fn from_radians(radians: f32) -> Self { Self(radians, PhantomData) }

    #[must_use]
    pub const fn into_radians(self) -> f32 { self.0 }

    #[must_use]
    pub const fn from_degrees(degrees: f32) -> Self { Self(degrees.to_radians(), PhantomData) }

    #[must_use]
    pub fn into_degrees(self) -> f32 { self.0.to_degrees() }

    #[must_use]
    pub fn sin(self) -> f32 { self.0.sin() }
    #[must_use]
    pub fn cos(self) -> f32 { self.0.cos() }

    /// Returns the angle whose sine is `sin`, in `-RIGHT..=RIGHT`.
    ///
    /// Returns a NaN angle if `sin` is outside `-1..=1`.
    #[must_use]
    pub fn asin(sin: f32) -> Self { Self(sin.asin(), PhantomData) }

    /// Returns the slope of a line whose angle of elevation is the receiver value.
    ///
    /// This function clamps the angle between `-Angle::RIGHT..=Angle::RIGHT`,
    /// and defines the following special cases:
    /// - The tangent of `-Angle::RIGHT` (line downwards) is negative infinity.
    /// - The tangent of `Angle::RIGHT` (line upwards) is positive infinity.
    ///
    /// This function is monotonic, and is strictly monotonic within the clamped closed range.
    #[must_use]
    pub fn acute_signed_tan(self) -> f32 {
        if self <= -Self::RIGHT {
            f32::NEG_INFINITY
        } else if self >= Self::RIGHT {
            f32::INFINITY
        } else {
            self.0.tan()
        }
    }
}

impl Frequency {
    #[must_use]
    pub const fn into_per_second(self) -> f32 { self.0 }

    #[must_use]
    pub const fn from_per_second(value: f32) -> Self { Self(value, PhantomData) }
}

impl Pressure {
    #[must_use]
    pub const fn into_pascals(self) -> f32 { self.0 }

    #[must_use]
    pub const fn from_pascals(pascals: f32) -> Self { Self(pascals, PhantomData) }
}

pub trait IsFinite: Copy {
    fn is_finite(self) -> bool;
}

impl IsFinite for f32 {
    fn is_finite(self) -> bool { f32::is_finite(self) }
}

impl IsFinite for Vec2 {
    fn is_finite(self) -> bool { Vec2::is_finite(self) }
}

impl<T, Base, Dt> serde::Serialize for Quantity<T, Base, Dt>
where
    T: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, T, Base, Dt> serde::Deserialize<'de> for Quantity<T, Base, Dt>
where
    T: serde::Deserialize<'de> + IsFinite,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let value = T::deserialize(deserializer)?;

        if !value.is_finite() {
            return Err(<D::Error as serde::de::Error>::custom("non-finite quantity"));
        }

        Ok(Self(value, PhantomData))
    }
}
