//! Waypoint altitude and speed constraint windows.

use math::{Length, Position, Speed};

#[cfg(test)]
mod tests;

/// Speed must lag the ceiling by more than this margin
/// before a deceleration segment is scheduled.
pub const SPEED_DIFFERENCE_THRESHOLD: Speed<f32> = Speed::from_meter_per_sec(-0.1);

/// Speed ceilings at or above this value act as "no ceiling" sentinels.
pub const HIGH_SPEED_CONSTRAINT_THRESHOLD: Speed<f32> = Speed::from_knots(1000.0);

/// Altitude margin separating "still below the ceiling" from "at the ceiling".
pub const ALT_DIFFERENCE_THRESHOLD: Length<f32> = Length::from_feet(100.0);

/// Classification of the build state against the active constraint window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(serde::Serialize, serde::Deserialize, strum::Display)]
pub enum ConstraintActivity {
    /// No constraint window has been matched yet.
    #[default]
    Unset,
    /// Below the ceiling with speed already on target.
    BelowAltOnSpeed,
    /// At or above the ceiling before the constraint distance, speed on target.
    AtAltOnSpeed,
    /// Below the ceiling but still slower than the speed ceiling.
    BelowAltSlow,
    /// Past the constraint distance below the altitude floor.
    SegEndLowAlt,
    /// Past the constraint distance inside the altitude window.
    SegEndMidAlt,
    /// At or above the ceiling and slower than the speed ceiling.
    AtAltSlow,
    /// Past the constraint distance at or above the ceiling.
    SegEndAtAlt,
}

impl ConstraintActivity {
    /// Dispatch precedence.
    ///
    /// `SegEndAtAlt` shares a rank with `AtAltOnSpeed`: a segment ending at
    /// the ceiling dispatches through the same correction as holding the
    /// ceiling ahead of the constraint.
    #[must_use]
    pub fn precedence(self) -> u8 {
        match self {
            Self::Unset => 0,
            Self::BelowAltOnSpeed => 1,
            Self::AtAltOnSpeed | Self::SegEndAtAlt => 2,
            Self::BelowAltSlow => 3,
            Self::SegEndLowAlt => 4,
            Self::SegEndMidAlt => 5,
            Self::AtAltSlow => 6,
        }
    }

    /// Whether an integrator may keep stepping without a correction segment.
    #[must_use]
    pub fn continues_unconstrained(self) -> bool {
        self.precedence() <= Self::BelowAltOnSpeed.precedence()
    }
}

/// One waypoint's constraint window, with the activity state last computed
/// against it.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct PrecalcConstraint {
    /// Cumulative along-path distance of the waypoint from the route end.
    pub distance:   Length<f32>,
    /// Altitude ceiling of the window.
    pub alt_high:   Position<f32>,
    /// Altitude floor of the window.
    pub alt_low:    Position<f32>,
    /// Speed ceiling.
    pub speed_high: Speed<f32>,
    pub speed_low:  Speed<f32>,
    /// 1-based table position of the matched waypoint; 0 when unmatched.
    pub index:      usize,
    pub activity:   ConstraintActivity,
    pub violation:  bool,
}

/// Ordered per-waypoint constraint windows,
/// sorted by increasing along-path distance from the route end.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ConstraintTable {
    pub waypoints: Vec<PrecalcConstraint>,
}

impl ConstraintTable {
    #[must_use]
    pub fn new(waypoints: Vec<PrecalcConstraint>) -> Self { Self { waypoints } }

    /// Returns the constraint window ahead of the build position:
    /// the first entry whose cumulative distance exceeds `distance_to_go`.
    ///
    /// The result carries the entry's 1-based table index and starts in the
    /// [`ConstraintActivity::BelowAltOnSpeed`] state. When no entry lies
    /// ahead, or when only the final entry does, a default (unmatched)
    /// constraint is returned.
    #[must_use]
    pub fn find_active(&self, distance_to_go: Length<f32>) -> PrecalcConstraint {
        let mut result = PrecalcConstraint::default();

        let found = self.waypoints.iter().position(|waypoint| distance_to_go < waypoint.distance);
        if let Some(position) = found {
            let index = position + 1;
            if index < self.waypoints.len() {
                result = self.waypoints[index - 1];
                result.activity = ConstraintActivity::BelowAltOnSpeed;
                result.violation = false;
                result.index = index;
            }
        }

        result
    }
}

/// Classifies the current build state against `constraints`,
/// returning the updated constraint record. Pure; no side effects.
#[must_use]
pub fn check_active(
    distance_to_go: Length<f32>,
    altitude: Position<f32>,
    cas: Speed<f32>,
    constraints: PrecalcConstraint,
    transition_altitude: Position<f32>,
) -> PrecalcConstraint {
    let mut result = constraints;

    let slow = cas - constraints.speed_high < SPEED_DIFFERENCE_THRESHOLD
        && cas < constraints.speed_high
        && constraints.speed_high < HIGH_SPEED_CONSTRAINT_THRESHOLD;

    if distance_to_go > constraints.distance {
        // past the constraint distance; classify by the altitude window
        if altitude >= constraints.alt_low && altitude <= constraints.alt_high {
            result.violation = false;
            result.activity = ConstraintActivity::SegEndMidAlt;
        } else if altitude <= constraints.alt_low {
            result.violation = true;
            result.activity = ConstraintActivity::SegEndLowAlt;
        } else if altitude >= constraints.alt_high {
            result.violation = true;
            result.activity = ConstraintActivity::SegEndAtAlt;
        }
    } else if altitude >= constraints.alt_high {
        result.violation = true;

        if cas - constraints.speed_high < SPEED_DIFFERENCE_THRESHOLD
            && constraints.speed_high < HIGH_SPEED_CONSTRAINT_THRESHOLD
            && constraints.alt_high - altitude <= ALT_DIFFERENCE_THRESHOLD
            && altitude < transition_altitude
        {
            result.activity = ConstraintActivity::AtAltSlow;
        } else {
            result.activity = ConstraintActivity::AtAltOnSpeed;
        }
    } else if slow && constraints.alt_high - altitude > ALT_DIFFERENCE_THRESHOLD {
        result.violation = true;
        result.activity = ConstraintActivity::BelowAltSlow;
    } else if slow
        && constraints.alt_high - altitude <= ALT_DIFFERENCE_THRESHOLD
        && altitude < transition_altitude
    {
        result.violation = true;
        result.activity = ConstraintActivity::AtAltSlow;
    } else {
        result.violation = false;
    }

    result
}
