//! Sample buffer holding a predicted vertical profile.
//!
//! A profile is built in reverse time order: index 0 is the route end at
//! time-to-go zero, and later indices lie progressively further from the
//! route end, earlier in real time. Distance and time-to-go are therefore
//! non-decreasing across the buffer.

use std::time::Duration;

use bevy_math::Vec2;
use math::{Accel, Angle, Length, Position, Speed};


/// Which integration law produced a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Serialize, serde::Deserialize, strum::Display, strum::IntoStaticStr)]
pub enum SegmentKind {
    /// Seed sample at the route end, before any integrator has run.
    #[default]
    Undetermined,
    ConstantCas,
    ConstantMach,
    Fpa,
    FpaDecel,
    Level,
    LevelDecelToSpeed,
    LevelDecelToSpeedOrDistance,
    ConstantDecel,
    FpaToCurrentPosition,
}

/// Flap configuration assumed at a sample.
///
/// Kinematic integration does not model flap drag,
/// so predicted samples always carry [`FlapSetting::Undefined`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Serialize, serde::Deserialize, strum::Display)]
pub enum FlapSetting {
    #[default]
    Undefined,
    Cruise,
    Approach,
    Landing,
}

/// One simultaneous record of the predicted trajectory state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathSample {
    /// Along-path distance from the route end.
    pub distance:      Length<f32>,
    /// Altitude AMSL.
    pub altitude:      Position<f32>,
    /// Calibrated airspeed.
    pub cas:           Speed<f32>,
    /// True airspeed.
    pub tas:           Speed<f32>,
    /// Mach number flown at `cas` and `altitude`.
    pub mach:          f32,
    pub ground_speed:  Speed<f32>,
    /// Rate of climb; negative in a descent.
    pub altitude_rate: Speed<f32>,
    /// Rate of true airspeed change.
    pub tas_rate:      Accel<f32>,
    /// Flight path angle flown at this sample.
    pub theta:         Angle,
    /// East/north wind components at the sample altitude.
    pub wind:          Speed<Vec2>,
    /// Aircraft mass, when a mass-aware predictor produced the sample.
    pub mass_kg:       Option<f32>,
    pub segment:       SegmentKind,
    pub flap:          FlapSetting,
    /// Cumulative time from the route end, increasing backwards in real time.
    pub time_to_go:    Duration,
}

/// Ordered, append-only vertical profile.
///
/// Owned by exactly one predictor and replaced wholesale on each replan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerticalPath {
    pub samples: Vec<PathSample>,
}

impl VerticalPath {
    /// A path holding only the given route-end sample.
    #[must_use]
    pub fn seeded(seed: PathSample) -> Self { Self { samples: vec![seed] } }

    pub fn push(&mut self, sample: PathSample) { self.samples.push(sample); }

    /// The most recently appended sample.
    ///
    /// A path always holds at least its seed sample;
    /// an empty buffer behaves as an all-zero seed.
    #[must_use]
    pub fn last(&self) -> PathSample { self.samples.last().copied().unwrap_or_default() }

    #[must_use]
    pub fn len(&self) -> usize { self.samples.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    /// Removes samples that repeat the time-to-go of their predecessor.
    ///
    /// Segment boundaries duplicate the handover sample;
    /// the first record of each time wins. Idempotent.
    pub fn trim_duplicate_times(&mut self) {
        self.samples.dedup_by_key(|sample| sample.time_to_go);
    }

    /// Drops every sample after `index`, keeping `0..=index`.
    ///
    /// An out-of-range index is a caller bug; the path is left unchanged.
    pub fn truncate_after(&mut self, index: usize) {
        if index >= self.samples.len() {
            tracing::error!(index, len = self.samples.len(), "truncation index out of range");
            return;
        }
        self.samples.truncate(index + 1);
    }

    /// Upper index bounding `distance` within the monotone distance column.
    ///
    /// Returns 0 when `distance` lies at or below the first sample and
    /// `len - 1` when it lies above the second-to-last sample; otherwise the
    /// returned index `i` satisfies `samples[i-1].distance <= distance <=
    /// samples[i].distance`.
    #[must_use]
    pub fn upper_index(&self, distance: Length<f32>) -> usize {
        let n = self.samples.len();
        if n < 2 || distance <= self.samples[0].distance {
            return 0;
        }
        if distance > self.samples[n - 2].distance {
            return n - 1;
        }
        self.samples.partition_point(|sample| sample.distance < distance)
    }
}
