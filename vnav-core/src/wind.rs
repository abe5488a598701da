//! Wind lookup by altitude, with decomposition along a flown course.

use bevy_math::Vec2;
use math::{Frequency, Heading, Position, Speed};


/// Forecast wind at an altitude.
pub trait WindProfile {
    /// East/north wind components at `altitude`.
    fn wind_at(&self, altitude: Position<f32>) -> Speed<Vec2>;

    /// Vertical derivative of the east and north wind components at
    /// `altitude`.
    fn gradient_at(&self, altitude: Position<f32>) -> (Frequency, Frequency);
}

/// Still air at all altitudes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calm;

impl WindProfile for Calm {
    fn wind_at(&self, _altitude: Position<f32>) -> Speed<Vec2> { Speed::ZERO }

    fn gradient_at(&self, _altitude: Position<f32>) -> (Frequency, Frequency) {
        (Frequency::ZERO, Frequency::ZERO)
    }
}

/// One forecast level of a [`WindTable`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct WindLevel {
    pub altitude: Position<f32>,
    /// East/north wind components at `altitude`.
    pub wind:     Speed<Vec2>,
}

/// Piecewise-linear wind profile over sorted forecast levels.
///
/// Lookups clamp to the lowest/highest level outside the forecast range,
/// where the gradient is zero.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct WindTable {
    levels: Vec<WindLevel>,
}

impl WindTable {
    #[must_use]
    pub fn new(mut levels: Vec<WindLevel>) -> Self {
        levels.sort_by(|a, b| a.altitude.amsl().into_nm().total_cmp(&b.altitude.amsl().into_nm()));
        Self { levels }
    }

    #[must_use]
    pub fn levels(&self) -> &[WindLevel] { &self.levels }

    /// The forecast levels bracketing `altitude`, if it lies strictly inside
    /// the forecast range.
    fn bracket(&self, altitude: Position<f32>) -> Option<(&WindLevel, &WindLevel)> {
        let upper = self.levels.partition_point(|level| level.altitude < altitude);
        if upper == 0 || upper >= self.levels.len() {
            return None;
        }
        Some((&self.levels[upper - 1], &self.levels[upper]))
    }
}

impl WindProfile for WindTable {
    fn wind_at(&self, altitude: Position<f32>) -> Speed<Vec2> {
        if let Some((lower, upper)) = self.bracket(altitude) {
            let ratio = altitude.ratio_between(lower.altitude, upper.altitude);
            lower.wind.lerp(upper.wind, ratio)
        } else if let Some(first) = self.levels.first()
            && altitude < first.altitude
        {
            first.wind
        } else {
            self.levels.last().map_or(Speed::ZERO, |level| level.wind)
        }
    }

    fn gradient_at(&self, altitude: Position<f32>) -> (Frequency, Frequency) {
        let Some((lower, upper)) = self.bracket(altitude) else {
            return (Frequency::ZERO, Frequency::ZERO);
        };
        let thickness = upper.altitude - lower.altitude;
        let delta = upper.wind - lower.wind;
        (delta.x() / thickness, delta.y() / thickness)
    }
}

/// Wind resolved along and across a flown course.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedWind {
    /// East/north components, as sampled from the profile.
    pub vector:        Speed<Vec2>,
    /// Component along the course; positive is a tailwind.
    pub parallel:      Speed<f32>,
    /// Component across the course.
    pub perpendicular: Speed<f32>,
}

/// Samples `profile` at `altitude` and decomposes the wind
/// into components parallel and perpendicular to `course`.
#[must_use]
pub fn resolve(profile: &dyn WindProfile, altitude: Position<f32>, course: Heading) -> ResolvedWind {
    let vector = profile.wind_at(altitude);
    ResolvedWind {
        vector,
        parallel: vector.project_onto_dir(course.into_dir2()),
        perpendicular: vector.project_onto_dir(course.perpendicular_dir()),
    }
}
