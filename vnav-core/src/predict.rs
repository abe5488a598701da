//! Backward-time construction of the descent profile.
//!
//! The orchestrator seeds a profile at the route end and integrates backward
//! in time from low altitude toward cruise, selecting among segment laws as
//! each waypoint's constraint window activates. Once a sample passes the
//! aircraft's live distance-to-go, the predicted altitude is reconciled
//! against the aircraft's actual altitude and the profile is replanned with a
//! direct flight path angle when they disagree by more than the tolerance.

use std::time::Duration;

use math::{
    Accel, Angle, Barometrics, Length, Position, Pressure, Speed, Temp,
    EARTH_SURFACE_GRAVITY, ISA_SEA_LEVEL_PRESSURE, ISA_SEA_LEVEL_TEMPERATURE,
};
use smallvec::SmallVec;

use crate::constraint::{check_active, ConstraintActivity, ConstraintTable, PrecalcConstraint};
use crate::course::CourseProfile;
use crate::path::{FlapSetting, PathSample, SegmentKind, VerticalPath};
use crate::wind::{self, ResolvedWind, WindProfile};

#[cfg(test)]
mod tests;

/// Distance bound meaning "no live aircraft position to reconcile against".
pub const UNBOUNDED_DISTANCE: Length<f32> = Length::new(f32::INFINITY);

/// Fatal build failures. Mismatch flags and degraded builds are not errors;
/// they are reported through [`DescentPredictor`] state instead.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// The flight path angle and realized ground speed imply a vertical rate
    /// faster than the true airspeed, so no pitch attitude can fly the leg.
    #[error("vertical rate {rate:?} exceeds true airspeed {tas:?}")]
    ExcessiveVerticalRate { rate: Speed<f32>, tas: Speed<f32> },
    /// A constraint boundary was revisited without the trajectory advancing.
    #[error("no forward progress at distance {distance:?}")]
    NoProgress { distance: Length<f32> },
}

/// ISA atmosphere with an adjustable sea level state.
#[derive(Debug, Clone, Copy)]
pub struct Atmosphere {
    pub sea_level_pressure: Pressure,
    pub sea_level_temp:     Temp,
}

impl Default for Atmosphere {
    fn default() -> Self {
        Self {
            sea_level_pressure: ISA_SEA_LEVEL_PRESSURE,
            sea_level_temp:     ISA_SEA_LEVEL_TEMPERATURE,
        }
    }
}

impl Atmosphere {
    /// Barometric state at a true altitude.
    #[must_use]
    pub fn at(&self, altitude: Position<f32>) -> Barometrics {
        math::compute_barometric(altitude, self.sea_level_pressure, self.sea_level_temp)
    }
}

/// External services consulted during a build.
pub struct BuildInputs<'a> {
    pub course:      &'a dyn CourseProfile,
    pub wind:        &'a dyn WindProfile,
    pub constraints: &'a ConstraintTable,
    pub atmosphere:  Atmosphere,
}

/// Tunable parameters of the descent profile.
/// Constructed once and read-only during a build.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DescentConfig {
    pub cruise_altitude:       Position<f32>,
    /// Mach number held above the transition altitude. Non-positive disables
    /// the Mach regime entirely.
    pub cruise_mach:           f32,
    /// Calibrated airspeed held below the transition altitude.
    pub transition_ias:        Speed<f32>,
    /// Altitude at which speed control switches from CAS to Mach.
    pub transition_altitude:   Position<f32>,
    /// Default speed at the end of the route, inside the terminal area.
    pub tracon_ias:            Speed<f32>,
    /// Terminal-area ceiling separating the two constant-CAS descent angles.
    pub tracon_altitude:       Position<f32>,
    /// Deceleration used by the shallow transitional descent.
    pub deceleration:          Accel<f32>,
    /// Deceleration used by level segments.
    pub deceleration_level:    Accel<f32>,
    /// Deceleration used by fixed flight-path-angle segments.
    pub deceleration_fpa:      Accel<f32>,
    /// Descent angle of constant-CAS segments below the terminal-area
    /// ceiling.
    pub gamma_cas_terminal:    Angle,
    /// Descent angle of constant-CAS segments above the terminal-area
    /// ceiling.
    pub gamma_cas_enroute:     Angle,
    /// Descent angle of constant-Mach segments.
    pub gamma_mach:            Angle,
    /// Steepest flight path angle allowed when replanning.
    pub descent_angle_max:     Angle,
    /// Replanned angles beyond this are logged but still flown.
    pub descent_angle_warning: Angle,
    /// Predicted-versus-actual altitude disagreement tolerated at the
    /// aircraft's distance-to-go.
    pub vertical_tolerance:    Length<f32>,
    /// Magnitude of the fixed integration step. Integration runs backward in
    /// time, so each step subtracts the rates over this interval.
    pub time_step:             Duration,
}

impl Default for DescentConfig {
    fn default() -> Self {
        let transition_ias = Speed::from_knots(310.0);
        let cruise_mach = 0.80;
        Self {
            cruise_altitude: Position::from_amsl_feet(37_000.0),
            cruise_mach,
            transition_ias,
            transition_altitude: math::mach_ias_transition_altitude(transition_ias, cruise_mach),
            tracon_ias: Speed::from_knots(250.0),
            tracon_altitude: Position::from_amsl_feet(10_000.0),
            deceleration: Accel::from_knots_per_sec(0.5),
            deceleration_level: Accel::from_knots_per_sec(0.75),
            deceleration_fpa: Accel::from_knots_per_sec(0.3),
            gamma_cas_terminal: Angle::from_degrees(2.9),
            gamma_cas_enroute: Angle::from_degrees(3.1),
            gamma_mach: Angle::from_degrees(4.0),
            descent_angle_max: Angle::from_degrees(6.0),
            descent_angle_warning: Angle::from_degrees(4.0),
            vertical_tolerance: Length::from_feet(400.0),
            time_step: Duration::from_millis(500),
        }
    }
}

/// Builds and stores the vertical profile for one aircraft.
///
/// A build fully owns and replaces the stored path; queries through
/// [`crate::guidance`] read from the finished buffer until the next replan.
pub struct DescentPredictor {
    pub config: DescentConfig,

    /// Effective transition altitude: the configured one, or infinite when
    /// the cruise Mach is invalid and the whole descent stays CAS-based.
    pub(crate) transition_altitude: Position<f32>,

    end_of_route_altitude: Position<f32>,
    end_of_route_ias:      Speed<f32>,
    /// Time-to-go carried by the seed sample.
    pub descent_start_time: Duration,

    /// Aircraft's actual altitude at build time.
    start_altitude: Position<f32>,

    pub(crate) path:          VerticalPath,
    pub(crate) current_index: usize,

    /// Indices into the path at each waypoint boundary crossed so far,
    /// searched backward when replanning.
    waypoint_indices:      SmallVec<[usize; 8]>,
    /// Index into the final trimmed path for each constraint-table waypoint.
    waypoint_path_indices: Vec<usize>,

    /// Constraint window last evaluated by an integrator.
    active: PrecalcConstraint,

    /// Set when the profile passed the aircraft's distance-to-go more than
    /// the tolerance below its actual altitude.
    pub prediction_too_low:  bool,
    /// Set when the profile passed the aircraft's distance-to-go more than
    /// the tolerance above its actual altitude.
    pub prediction_too_high: bool,
}

impl DescentPredictor {
    #[must_use]
    pub fn new(config: DescentConfig) -> Self {
        let transition_altitude = if config.cruise_mach > 0.0 {
            config.transition_altitude
        } else {
            Position::new(f32::INFINITY)
        };
        let end_of_route_ias = config.tracon_ias;
        Self {
            config,
            transition_altitude,
            end_of_route_altitude: Position::SEA_LEVEL,
            end_of_route_ias,
            descent_start_time: Duration::ZERO,
            start_altitude: Position::SEA_LEVEL,
            path: VerticalPath::default(),
            current_index: 0,
            waypoint_indices: SmallVec::new(),
            waypoint_path_indices: Vec::new(),
            active: PrecalcConstraint::default(),
            prediction_too_low: false,
            prediction_too_high: false,
        }
    }

    pub fn set_conditions_at_end_of_route(&mut self, altitude: Position<f32>, ias: Speed<f32>) {
        self.end_of_route_altitude = altitude;
        self.end_of_route_ias = ias;
    }

    #[must_use]
    pub fn path(&self) -> &VerticalPath { &self.path }

    #[must_use]
    pub fn transition_altitude(&self) -> Position<f32> { self.transition_altitude }

    /// Index into the built path nearest each constraint-table waypoint.
    #[must_use]
    pub fn waypoint_path_indices(&self) -> &[usize] { &self.waypoint_path_indices }

    /// Whether the last build left an unreconciled altitude mismatch.
    #[must_use]
    pub fn mismatch(&self) -> bool { self.prediction_too_low || self.prediction_too_high }

    /// Builds the full profile from the route end to the end of the ground
    /// track.
    ///
    /// `start_altitude` is the aircraft's actual altitude;
    /// `aircraft_distance_to_go` its remaining along-track distance, or
    /// [`UNBOUNDED_DISTANCE`] when no live position should be reconciled.
    /// On success the mismatch flags may still be set if replanning could not
    /// reach the aircraft's state.
    pub fn build_vertical_prediction(
        &mut self,
        inputs: &BuildInputs,
        start_altitude: Position<f32>,
        aircraft_distance_to_go: Length<f32>,
    ) -> Result<(), PredictError> {
        self.start_altitude = start_altitude;
        self.prediction_too_low = false;
        self.prediction_too_high = false;
        tracing::debug!(
            altitude = ?start_altitude,
            distance_to_go = ?aircraft_distance_to_go,
            "building vertical prediction",
        );

        self.constrained_vertical_path(inputs, aircraft_distance_to_go)?;

        self.path.trim_duplicate_times();
        self.waypoint_path_indices = inputs
            .constraints
            .waypoints
            .iter()
            .map(|waypoint| self.path.upper_index(waypoint.distance))
            .collect();
        self.current_index = self.path.len().saturating_sub(1);
        Ok(())
    }

    /// Seeds the profile at the route end and drives the segment integrators
    /// until the profile spans the whole ground track.
    fn constrained_vertical_path(
        &mut self,
        inputs: &BuildInputs,
        aircraft_distance_to_go: Length<f32>,
    ) -> Result<(), PredictError> {
        self.waypoint_indices.clear();

        let baro = inputs.atmosphere.at(self.end_of_route_altitude);
        let tas = baro.cas_to_tas(self.end_of_route_ias);
        let course = inputs.course.course_at(Length::ZERO);
        let wind = wind::resolve(inputs.wind, self.end_of_route_altitude, course);
        let ground_speed =
            math::solve_ground_speed(tas, Angle::ZERO, wind.parallel, wind.perpendicular);

        self.path = VerticalPath::seeded(PathSample {
            distance: Length::ZERO,
            altitude: self.end_of_route_altitude,
            cas: self.end_of_route_ias,
            tas,
            mach: baro.mach(tas),
            ground_speed,
            altitude_rate: Speed::ZERO,
            tas_rate: Accel::ZERO,
            theta: Angle::ZERO,
            wind: wind.vector,
            mass_kg: None,
            segment: SegmentKind::Undetermined,
            flap: FlapSetting::Undefined,
            time_to_go: self.descent_start_time,
        });
        self.waypoint_indices.push(0);

        let mut last_state = self.path.clone();
        let mut last_waypoint_state = self.path.clone();

        let below_transition_ceiling = self.transition_altitude.min(self.config.cruise_altitude);

        if aircraft_distance_to_go < Length::from_nm(1.0) {
            tracing::warn!(
                "less than 1 nautical mile to go; degrading to a level path",
            );
            let end = inputs
                .constraints
                .waypoints
                .last()
                .map_or(Length::ZERO, |waypoint| waypoint.distance);
            self.level_path(inputs, end, aircraft_distance_to_go);
            return Ok(());
        }

        // Constant-CAS regime up to the transition (or cruise) altitude.
        loop {
            let last = self.path.last();
            if last.altitude >= below_transition_ceiling
                || last.distance > inputs.course.total_length()
            {
                break;
            }

            let gamma = if last.altitude < self.config.tracon_altitude {
                self.config.gamma_cas_terminal
            } else {
                self.config.gamma_cas_enroute
            };
            self.constant_cas_path(inputs, below_transition_ceiling, gamma, aircraft_distance_to_go);
            if self.mismatch() {
                break;
            }

            if self.active.violation {
                match self.active.activity {
                    ConstraintActivity::SegEndLowAlt => {
                        let from = last_waypoint_state.last();
                        let fpa = (self.active.alt_low - from.altitude)
                            .atan2(self.active.distance - from.distance);
                        self.path = last_waypoint_state.clone();
                        self.fpa_decel_path(
                            inputs,
                            self.active.alt_low,
                            self.config.deceleration_fpa,
                            self.active.speed_high,
                            fpa,
                            aircraft_distance_to_go,
                        )?;
                        if self.mismatch() {
                            break;
                        }
                        self.geometric_fpa_path(
                            inputs,
                            self.active.alt_low,
                            fpa,
                            aircraft_distance_to_go,
                        )?;
                    }
                    ConstraintActivity::AtAltOnSpeed | ConstraintActivity::SegEndAtAlt => {
                        let from = last_state.last();
                        let fpa = (self.active.alt_high - from.altitude)
                            .atan2(self.active.distance - from.distance);
                        if fpa > Angle::from_degrees(0.10) {
                            self.path = last_state.clone();
                            self.geometric_fpa_path(
                                inputs,
                                self.active.alt_high,
                                fpa,
                                aircraft_distance_to_go,
                            )?;
                            if self.mismatch() {
                                break;
                            }
                        }
                        self.level_path(inputs, self.active.distance, aircraft_distance_to_go);
                    }
                    ConstraintActivity::BelowAltSlow => {
                        if self.active.index < inputs.constraints.waypoints.len() {
                            self.constant_decel_path(
                                inputs,
                                self.active.distance,
                                self.active.alt_high,
                                self.config.deceleration,
                                self.active.speed_high,
                                aircraft_distance_to_go,
                            );
                        }
                        if self.mismatch() {
                            break;
                        }

                        let reached = self.path.last();
                        if reached.distance > self.active.distance
                            && reached.altitude < self.active.alt_low
                        {
                            // The shallow transitional descent undershot the
                            // altitude floor; redo the leg as a constant-FPA
                            // deceleration.
                            let from = last_state.last();
                            let fpa = (self.active.alt_low - from.altitude)
                                .atan2(self.active.distance - from.distance);
                            if fpa > self.config.descent_angle_max {
                                tracing::warn!(
                                    fpa_degrees = fpa.into_degrees(),
                                    warning_degrees =
                                        self.config.descent_angle_warning.into_degrees(),
                                    "replanned flight path angle exceeds the maximum",
                                );
                            }
                            if fpa < self.config.descent_angle_max {
                                self.path = last_state.clone();
                                self.fpa_decel_path(
                                    inputs,
                                    self.active.alt_low,
                                    self.config.deceleration_fpa,
                                    self.active.speed_high,
                                    fpa,
                                    aircraft_distance_to_go,
                                )?;
                            }
                        }
                    }
                    ConstraintActivity::AtAltSlow => {
                        if self.active.index < inputs.constraints.waypoints.len() {
                            self.level_decel_bounded_path(
                                inputs,
                                self.active.distance,
                                self.config.deceleration_level,
                                self.active.speed_high,
                                aircraft_distance_to_go,
                            );
                        }
                    }
                    _ => {}
                }

                if self.mismatch() {
                    break;
                }
            }

            last_state = self.path.clone();

            if self.path.last().distance > self.active.distance {
                if last_waypoint_state == self.path {
                    return Err(PredictError::NoProgress { distance: self.path.last().distance });
                }

                last_waypoint_state = self.path.clone();
                while let Some(&top) = self.waypoint_indices.last() {
                    if top >= last_waypoint_state.len() {
                        self.waypoint_indices.pop();
                    } else {
                        break;
                    }
                }
                let boundary = last_waypoint_state.len() - 1;
                if self.waypoint_indices.last().is_none_or(|&top| top < boundary) {
                    self.waypoint_indices.push(boundary);
                }

                if self.path.last().altitude > self.start_altitude {
                    break;
                }
            }
        }

        // Constant-Mach regime up to the aircraft's altitude.
        last_state = self.path.clone();
        if !self.mismatch() {
            loop {
                let last = self.path.last();
                if last.altitude >= self.start_altitude
                    || last.distance > inputs.course.total_length()
                {
                    break;
                }

                self.path = last_state.clone();
                self.constant_mach_path(inputs, self.start_altitude, aircraft_distance_to_go);
                if self.mismatch() {
                    break;
                }

                if self.active.violation {
                    match self.active.activity {
                        ConstraintActivity::SegEndLowAlt => {
                            let from = last_state.last();
                            let fpa = (self.active.alt_low - from.altitude)
                                .atan2(self.active.distance - from.distance);

                            if fpa > Angle::from_degrees(10.0) {
                                // The floor is unreachable at any sane angle;
                                // stay on the constant-Mach profile.
                                tracing::warn!(
                                    fpa_degrees = fpa.into_degrees(),
                                    "cannot reach the low altitude constraint in the Mach regime",
                                );
                            } else if fpa > Angle::from_degrees(0.10) {
                                self.path = last_state.clone();
                                self.geometric_fpa_path(
                                    inputs,
                                    self.active.alt_low,
                                    fpa,
                                    aircraft_distance_to_go,
                                )?;
                            } else {
                                self.path = last_state.clone();
                                self.level_path(
                                    inputs,
                                    self.active.distance,
                                    aircraft_distance_to_go,
                                );
                            }

                            if self.mismatch() {
                                break;
                            }
                            self.level_path(inputs, self.active.distance, aircraft_distance_to_go);
                        }
                        ConstraintActivity::AtAltOnSpeed | ConstraintActivity::SegEndAtAlt => {
                            let from = last_state.last();
                            let fpa = (self.active.alt_high - from.altitude)
                                .atan2(self.active.distance - from.distance);

                            if fpa > Angle::from_degrees(0.10) {
                                self.path = last_state.clone();
                                self.geometric_fpa_path(
                                    inputs,
                                    self.active.alt_high,
                                    fpa,
                                    aircraft_distance_to_go,
                                )?;
                            } else {
                                self.path = last_state.clone();
                                self.level_path(
                                    inputs,
                                    self.active.distance,
                                    aircraft_distance_to_go,
                                );
                            }
                            self.level_path(inputs, self.active.distance, aircraft_distance_to_go);
                        }
                        _ => {}
                    }
                }

                last_state = self.path.clone();
            }
        }

        if self.prediction_too_low {
            tracing::debug!("prediction too low; replanning with a direct flight path angle");
        }
        if self.prediction_too_high {
            tracing::debug!("prediction too high; replanning with a direct flight path angle");
        }
        if self.mismatch() {
            self.replan_to_aircraft(inputs, aircraft_distance_to_go)?;
        }

        // Level tail to the end of the ground track, decelerating where a
        // speed ceiling binds.
        if self.path.last().altitude < self.transition_altitude {
            while self.path.last().distance < inputs.course.total_length() {
                let last = self.path.last();
                self.active = inputs.constraints.find_active(last.distance);
                self.active = check_active(
                    last.distance,
                    last.altitude,
                    last.cas,
                    self.active,
                    self.transition_altitude,
                );
                if self.active.violation
                    && matches!(
                        self.active.activity,
                        ConstraintActivity::BelowAltSlow | ConstraintActivity::AtAltSlow
                    )
                {
                    self.level_decel_path(
                        inputs,
                        self.config.deceleration_level,
                        self.active.speed_high,
                        aircraft_distance_to_go,
                    );
                }
                self.level_path(inputs, inputs.course.total_length(), aircraft_distance_to_go);
            }
        }
        self.level_path(inputs, inputs.course.total_length(), aircraft_distance_to_go);
        Ok(())
    }

    /// Searches backward through the waypoint boundaries for the most recent
    /// point from which a direct flight path angle reaches the aircraft's
    /// actual state without violating intervening altitude windows, then
    /// truncates the profile there and rebuilds forward.
    fn replan_to_aircraft(
        &mut self,
        inputs: &BuildInputs,
        aircraft_distance_to_go: Length<f32>,
    ) -> Result<(), PredictError> {
        let mut start_index = 0;
        let mut fpa_start_found = false;

        while let Some(index) = self.waypoint_indices.pop() {
            start_index = index;
            let Some(&sample) = self.path.samples.get(index) else { continue };

            let distance_to_aircraft = aircraft_distance_to_go - sample.distance;
            let altitude_to_aircraft = self.start_altitude - sample.altitude;
            let fpa = altitude_to_aircraft.atan2(distance_to_aircraft);
            if fpa < self.config.descent_angle_max {
                fpa_start_found = true;
                let slope = altitude_to_aircraft / distance_to_aircraft;
                for waypoint in inputs.constraints.waypoints.iter().skip(start_index + 1) {
                    if aircraft_distance_to_go < waypoint.distance {
                        break;
                    }
                    let pred_alt = sample.altitude + waypoint.distance * slope;
                    if pred_alt > waypoint.alt_high || pred_alt < waypoint.alt_low {
                        fpa_start_found = false;
                        break;
                    }
                }
                if fpa_start_found {
                    break;
                }
            }
        }

        if fpa_start_found {
            self.path.truncate_after(start_index);
            self.fpa_to_current_position_path(inputs, aircraft_distance_to_go)?;
        } else {
            tracing::warn!(
                "unable to reach the aircraft altitude at the aircraft position",
            );
        }

        if self.path.last().altitude < self.start_altitude {
            tracing::debug!(
                altitude = ?self.path.last().altitude,
                "replanned profile ends below the aircraft altitude",
            );
        }
        if self.path.last().distance < aircraft_distance_to_go {
            tracing::debug!("replanned profile ends before the aircraft position");
        }
        Ok(())
    }

    /// Atmosphere, airspeed, and wind at the head of a step.
    fn step_env(
        &self,
        inputs: &BuildInputs,
        distance: Length<f32>,
        altitude: Position<f32>,
        cas: Speed<f32>,
    ) -> (Barometrics, Speed<f32>, ResolvedWind) {
        let baro = inputs.atmosphere.at(altitude);
        let tas = baro.cas_to_tas(cas);
        let course = inputs.course.course_at(distance);
        let wind = wind::resolve(inputs.wind, altitude, course);
        (baro, tas, wind)
    }

    /// First-sample-past-the-aircraft reconciliation. Sets a mismatch flag
    /// and returns true when predicted and actual altitude disagree by more
    /// than the tolerance, in which case the integrator stops early.
    fn check_bracket(
        &mut self,
        previous_altitude: Position<f32>,
        new_altitude: Position<f32>,
    ) -> bool {
        let tolerance = self.config.vertical_tolerance;
        if previous_altitude - tolerance > self.start_altitude {
            tracing::debug!(
                predicted = ?new_altitude,
                actual = ?self.start_altitude,
                "prediction altitude too high",
            );
            self.prediction_too_high = true;
            return true;
        }
        if new_altitude + tolerance < self.start_altitude {
            tracing::debug!(
                predicted = ?new_altitude,
                actual = ?self.start_altitude,
                "prediction altitude too low",
            );
            self.prediction_too_low = true;
            return true;
        }
        false
    }

    /// Post-loop check for descent-style segments: a finished segment that
    /// still sits above the aircraft is a too-high prediction.
    fn flag_if_still_above(
        &mut self,
        altitude: Position<f32>,
        aircraft_distance_to_go: Length<f32>,
    ) {
        if aircraft_distance_to_go.into_nm().is_finite()
            && altitude - self.config.vertical_tolerance > self.start_altitude
        {
            tracing::debug!(
                predicted = ?altitude,
                actual = ?self.start_altitude,
                "prediction altitude too high",
            );
            self.prediction_too_high = true;
        }
    }

    /// Post-loop check for level-style segments: a segment that passed the
    /// aircraft's distance while sitting below it is a too-low prediction.
    fn flag_if_still_below(
        &mut self,
        altitude: Position<f32>,
        aircraft_distance_to_go: Length<f32>,
    ) {
        if self.path.last().distance > aircraft_distance_to_go
            && altitude + self.config.vertical_tolerance < self.start_altitude
        {
            tracing::debug!(
                predicted = ?altitude,
                actual = ?self.start_altitude,
                "prediction altitude too low",
            );
            self.prediction_too_low = true;
        }
    }

    /// Constant-CAS climb (in backward time) at the fixed descent angle
    /// `gamma`, up to `altitude_at_end` or until the active constraint window
    /// demands a correction.
    fn constant_cas_path(
        &mut self,
        inputs: &BuildInputs,
        altitude_at_end: Position<f32>,
        gamma: Angle,
        aircraft_distance_to_go: Length<f32>,
    ) {
        let dt = self.config.time_step;
        let mut last = self.path.last();
        let mut bracket_found = false;

        self.active = inputs.constraints.find_active(last.distance);
        self.active = check_active(
            last.distance,
            last.altitude,
            last.cas,
            self.active,
            self.transition_altitude,
        );

        while last.altitude < altitude_at_end && self.active.activity.continues_unconstrained() {
            let (baro, tas, wind) = self.step_env(inputs, last.distance, last.altitude, last.cas);
            let esf = math::energy_share_constant_cas(tas, last.altitude, baro.temp);

            let altitude_rate = -(tas * gamma.sin());
            let tas_rate =
                altitude_rate.per_second(EARTH_SURFACE_GRAVITY / tas) * (1.0 / esf - 1.0);

            let new_altitude = last.altitude - altitude_rate * dt;
            let new_tas = tas - tas_rate * dt;
            let new_baro = inputs.atmosphere.at(new_altitude);
            let new_cas = new_baro.tas_to_cas(new_tas);
            let ground_speed =
                math::solve_ground_speed(new_tas, gamma, wind.parallel, wind.perpendicular);
            let new_distance = last.distance + ground_speed * dt;

            let sample = PathSample {
                distance: new_distance,
                altitude: new_altitude,
                cas: new_cas,
                tas: new_tas,
                mach: new_baro.mach(new_tas),
                ground_speed,
                altitude_rate,
                tas_rate,
                theta: gamma,
                wind: wind.vector,
                mass_kg: None,
                segment: SegmentKind::ConstantCas,
                flap: FlapSetting::Undefined,
                time_to_go: last.time_to_go + dt,
            };
            self.path.push(sample);

            if !bracket_found && new_distance > aircraft_distance_to_go {
                bracket_found = true;
                if self.check_bracket(last.altitude, new_altitude) {
                    return;
                }
            }

            last = sample;
            if self.active.activity == ConstraintActivity::BelowAltOnSpeed {
                self.active = check_active(
                    last.distance,
                    last.altitude,
                    last.cas,
                    self.active,
                    self.transition_altitude,
                );
            }
        }

        self.flag_if_still_above(last.altitude, aircraft_distance_to_go);
    }

    /// Constant-Mach climb (in backward time) at the configured Mach descent
    /// angle, up to `altitude_at_end`. Deceleration-pending states keep the
    /// segment going; their corrections happen on a later dispatch.
    fn constant_mach_path(
        &mut self,
        inputs: &BuildInputs,
        altitude_at_end: Position<f32>,
        aircraft_distance_to_go: Length<f32>,
    ) {
        let dt = self.config.time_step;
        let gamma = self.config.gamma_mach;
        let mut last = self.path.last();

        self.active = inputs.constraints.find_active(last.distance);
        self.active = check_active(
            last.distance,
            last.altitude,
            last.cas,
            self.active,
            self.transition_altitude,
        );

        let continues = |activity: ConstraintActivity| {
            activity.continues_unconstrained()
                || activity == ConstraintActivity::BelowAltSlow
                || activity == ConstraintActivity::AtAltSlow
        };

        while last.altitude < altitude_at_end && continues(self.active.activity) {
            let (baro, tas, wind) = self.step_env(inputs, last.distance, last.altitude, last.cas);
            let esf = math::energy_share_constant_mach(tas, last.altitude, baro.temp);

            let altitude_rate = -(tas * gamma.sin());
            let tas_rate =
                altitude_rate.per_second(EARTH_SURFACE_GRAVITY / tas) * (1.0 / esf - 1.0);

            let new_altitude = last.altitude - altitude_rate * dt;
            let new_tas = tas - tas_rate * dt;
            let new_baro = inputs.atmosphere.at(new_altitude);
            let new_cas = new_baro.tas_to_cas(new_tas);
            let ground_speed =
                math::solve_ground_speed(new_tas, gamma, wind.parallel, wind.perpendicular);
            let new_distance = last.distance + ground_speed * dt;

            let sample = PathSample {
                distance: new_distance,
                altitude: new_altitude,
                cas: new_cas,
                tas: new_tas,
                mach: new_baro.mach(new_tas),
                ground_speed,
                altitude_rate,
                tas_rate,
                theta: gamma,
                wind: wind.vector,
                mass_kg: None,
                segment: SegmentKind::ConstantMach,
                flap: FlapSetting::Undefined,
                time_to_go: last.time_to_go + dt,
            };
            self.path.push(sample);

            if new_distance > aircraft_distance_to_go
                && self.check_bracket(last.altitude, new_altitude)
            {
                return;
            }

            last = sample;
            if continues(self.active.activity) && self.active.activity != ConstraintActivity::Unset
            {
                self.active = check_active(
                    last.distance,
                    last.altitude,
                    last.cas,
                    self.active,
                    self.transition_altitude,
                );
            }
        }

        self.flag_if_still_above(last.altitude, aircraft_distance_to_go);
    }

    /// Fixed flight-path-angle climb (in backward time) up to
    /// `altitude_at_end`. The pitch `theta` is re-derived each step from the
    /// realized ground speed so the flown path matches `flight_path_angle`
    /// over ground in the presence of wind.
    fn geometric_fpa_path(
        &mut self,
        inputs: &BuildInputs,
        altitude_at_end: Position<f32>,
        flight_path_angle: Angle,
        aircraft_distance_to_go: Length<f32>,
    ) -> Result<(), PredictError> {
        let dt = self.config.time_step;
        let mut last = self.path.last();
        let mut theta = last.theta;
        let mut bracket_found = false;

        while last.altitude < altitude_at_end {
            let (baro, tas, wind) = self.step_env(inputs, last.distance, last.altitude, last.cas);
            let esf = if last.altitude <= self.transition_altitude {
                math::energy_share_constant_cas(tas, last.altitude, baro.temp)
            } else {
                math::energy_share_constant_mach(tas, last.altitude, baro.temp)
            };

            let altitude_rate = -(tas * theta.sin());
            let tas_rate =
                altitude_rate.per_second(EARTH_SURFACE_GRAVITY / tas) * (1.0 / esf - 1.0);

            let new_altitude = last.altitude - altitude_rate * dt;
            let new_tas = tas - tas_rate * dt;
            let new_baro = inputs.atmosphere.at(new_altitude);
            let new_cas = new_baro.tas_to_cas(new_tas);
            let ground_speed =
                math::solve_ground_speed(new_tas, theta, wind.parallel, wind.perpendicular);
            let new_distance = last.distance + ground_speed * dt;

            let tracked_rate = -(ground_speed * flight_path_angle.acute_signed_tan());
            if tracked_rate.abs() > new_tas {
                tracing::error!(
                    rate = ?tracked_rate,
                    tas = ?new_tas,
                    "flight path angle implies a vertical rate beyond the airspeed",
                );
                return Err(PredictError::ExcessiveVerticalRate {
                    rate: tracked_rate,
                    tas:  new_tas,
                });
            }
            let new_theta = Angle::asin(-tracked_rate / new_tas);

            let sample = PathSample {
                distance: new_distance,
                altitude: new_altitude,
                cas: new_cas,
                tas: new_tas,
                mach: new_baro.mach(new_tas),
                ground_speed,
                altitude_rate,
                tas_rate,
                theta: new_theta,
                wind: wind.vector,
                mass_kg: None,
                segment: SegmentKind::Fpa,
                flap: FlapSetting::Undefined,
                time_to_go: last.time_to_go + dt,
            };
            self.path.push(sample);

            if !bracket_found && new_distance > aircraft_distance_to_go {
                bracket_found = true;
                if self.check_bracket(last.altitude, new_altitude) {
                    return Ok(());
                }
            }

            last = sample;
            theta = new_theta;
        }

        self.flag_if_still_above(last.altitude, aircraft_distance_to_go);
        Ok(())
    }

    /// Fixed flight-path-angle descent with a fixed deceleration, meeting an
    /// altitude and a speed target on a single leg. Terminates at whichever
    /// of `altitude_at_end` and `cas_at_end` is reached first.
    fn fpa_decel_path(
        &mut self,
        inputs: &BuildInputs,
        altitude_at_end: Position<f32>,
        deceleration: Accel<f32>,
        cas_at_end: Speed<f32>,
        flight_path_angle: Angle,
        aircraft_distance_to_go: Length<f32>,
    ) -> Result<(), PredictError> {
        let dt = self.config.time_step;
        let mut last = self.path.last();
        let mut theta = last.theta;

        while last.altitude < altitude_at_end && last.cas < cas_at_end {
            let (_, tas, wind) = self.step_env(inputs, last.distance, last.altitude, last.cas);

            let ground_speed =
                math::solve_ground_speed(tas, theta, wind.parallel, wind.perpendicular);
            let altitude_rate = -(ground_speed * flight_path_angle.acute_signed_tan());
            let tas_rate = -deceleration;

            let new_altitude = last.altitude - altitude_rate * dt;
            let new_tas = tas - tas_rate * dt;
            let new_baro = inputs.atmosphere.at(new_altitude);
            let new_cas = new_baro.tas_to_cas(new_tas);
            let new_distance = last.distance + ground_speed * dt;

            if altitude_rate.abs() > new_tas {
                tracing::error!(
                    rate = ?altitude_rate,
                    tas = ?new_tas,
                    "flight path angle implies a vertical rate beyond the airspeed",
                );
                return Err(PredictError::ExcessiveVerticalRate {
                    rate: altitude_rate,
                    tas:  new_tas,
                });
            }
            theta = Angle::asin(-altitude_rate / new_tas);

            let sample = PathSample {
                distance: new_distance,
                altitude: new_altitude,
                cas: new_cas,
                tas: new_tas,
                mach: new_baro.mach(new_tas),
                ground_speed,
                altitude_rate,
                tas_rate,
                theta,
                wind: wind.vector,
                mass_kg: None,
                segment: SegmentKind::FpaDecel,
                flap: FlapSetting::Undefined,
                time_to_go: last.time_to_go + dt,
            };
            self.path.push(sample);

            if new_distance > aircraft_distance_to_go
                && self.check_bracket(last.altitude, new_altitude)
            {
                return Ok(());
            }

            last = sample;
        }

        self.flag_if_still_above(last.altitude, aircraft_distance_to_go);
        Ok(())
    }

    /// Level flight with a fixed deceleration, terminating on the speed
    /// target alone.
    fn level_decel_path(
        &mut self,
        inputs: &BuildInputs,
        deceleration: Accel<f32>,
        cas_at_end: Speed<f32>,
        aircraft_distance_to_go: Length<f32>,
    ) {
        self.level_decel_segment(
            inputs,
            UNBOUNDED_DISTANCE,
            deceleration,
            cas_at_end,
            aircraft_distance_to_go,
            SegmentKind::LevelDecelToSpeed,
        );
    }

    /// Level flight with a fixed deceleration, terminating on the speed
    /// target or at `distance_at_end`, whichever comes first.
    fn level_decel_bounded_path(
        &mut self,
        inputs: &BuildInputs,
        distance_at_end: Length<f32>,
        deceleration: Accel<f32>,
        cas_at_end: Speed<f32>,
        aircraft_distance_to_go: Length<f32>,
    ) {
        self.level_decel_segment(
            inputs,
            distance_at_end,
            deceleration,
            cas_at_end,
            aircraft_distance_to_go,
            SegmentKind::LevelDecelToSpeedOrDistance,
        );
    }

    fn level_decel_segment(
        &mut self,
        inputs: &BuildInputs,
        distance_at_end: Length<f32>,
        deceleration: Accel<f32>,
        cas_at_end: Speed<f32>,
        aircraft_distance_to_go: Length<f32>,
        segment: SegmentKind,
    ) {
        let dt = self.config.time_step;
        let mut last = self.path.last();

        while last.cas < cas_at_end && last.distance <= distance_at_end {
            let (baro, tas, wind) = self.step_env(inputs, last.distance, last.altitude, last.cas);

            let tas_rate = -deceleration;
            let new_tas = tas - tas_rate * dt;
            let new_cas = baro.tas_to_cas(new_tas);
            let ground_speed =
                math::solve_ground_speed(new_tas, Angle::ZERO, wind.parallel, wind.perpendicular);
            let new_distance = last.distance + ground_speed * dt;

            let sample = PathSample {
                distance: new_distance,
                altitude: last.altitude,
                cas: new_cas,
                tas: new_tas,
                mach: baro.mach(new_tas),
                ground_speed,
                altitude_rate: Speed::ZERO,
                tas_rate,
                theta: Angle::ZERO,
                wind: wind.vector,
                mass_kg: None,
                segment,
                flap: FlapSetting::Undefined,
                time_to_go: last.time_to_go + dt,
            };
            self.path.push(sample);
            last = sample;
        }

        self.flag_if_still_below(last.altitude, aircraft_distance_to_go);
    }

    /// Level flight at constant speed out to the along-path distance `x_end`.
    /// A call with `x_end` at or before the last stored distance is a no-op.
    fn level_path(
        &mut self,
        inputs: &BuildInputs,
        x_end: Length<f32>,
        aircraft_distance_to_go: Length<f32>,
    ) {
        let dt = self.config.time_step;
        let mut last = self.path.last();

        while last.distance.abs() < x_end.abs() {
            let (baro, tas, wind) = self.step_env(inputs, last.distance, last.altitude, last.cas);

            let new_cas = baro.tas_to_cas(tas);
            let ground_speed =
                math::solve_ground_speed(tas, Angle::ZERO, wind.parallel, wind.perpendicular);
            let new_distance = last.distance + ground_speed * dt;

            let sample = PathSample {
                distance: new_distance,
                altitude: last.altitude,
                cas: new_cas,
                tas,
                mach: baro.mach(tas),
                ground_speed,
                altitude_rate: Speed::ZERO,
                tas_rate: Accel::ZERO,
                theta: Angle::ZERO,
                wind: wind.vector,
                mass_kg: None,
                segment: SegmentKind::Level,
                flap: FlapSetting::Undefined,
                time_to_go: last.time_to_go + dt,
            };
            self.path.push(sample);
            last = sample;
        }

        self.flag_if_still_below(last.altitude, aircraft_distance_to_go);
    }

    /// Shallow transitional descent at a fixed one-degree angle with a fixed
    /// deceleration, bounded by distance, an altitude ceiling, and a speed
    /// target simultaneously.
    fn constant_decel_path(
        &mut self,
        inputs: &BuildInputs,
        distance_at_end: Length<f32>,
        altitude_at_end: Position<f32>,
        deceleration: Accel<f32>,
        cas_at_end: Speed<f32>,
        aircraft_distance_to_go: Length<f32>,
    ) {
        let dt = self.config.time_step;
        let theta = Angle::from_degrees(1.0);
        let mut last = self.path.last();
        let mut bracket_found = false;

        while last.cas < cas_at_end
            && last.altitude < altitude_at_end
            && last.distance < distance_at_end
        {
            let (_, tas, wind) = self.step_env(inputs, last.distance, last.altitude, last.cas);

            let altitude_rate = -(tas * theta.sin());
            let tas_rate = -deceleration;

            let new_altitude = last.altitude - altitude_rate * dt;
            let new_tas = tas - tas_rate * dt;
            let new_baro = inputs.atmosphere.at(new_altitude);
            let new_cas = new_baro.tas_to_cas(new_tas);
            let ground_speed =
                math::solve_ground_speed(new_tas, theta, wind.parallel, wind.perpendicular);
            let new_distance = last.distance + ground_speed * dt;

            let sample = PathSample {
                distance: new_distance,
                altitude: new_altitude,
                cas: new_cas,
                tas: new_tas,
                mach: new_baro.mach(new_tas),
                ground_speed,
                altitude_rate,
                tas_rate,
                theta,
                wind: wind.vector,
                mass_kg: None,
                segment: SegmentKind::ConstantDecel,
                flap: FlapSetting::Undefined,
                time_to_go: last.time_to_go + dt,
            };
            self.path.push(sample);

            if !bracket_found && new_distance > aircraft_distance_to_go {
                bracket_found = true;
                if self.check_bracket(last.altitude, new_altitude) {
                    return;
                }
            }

            last = sample;
        }

        self.flag_if_still_above(last.altitude, aircraft_distance_to_go);
    }

    /// Rebuilds the truncated profile forward to the aircraft's position as
    /// alternating deceleration and pure-FPA legs per intervening constraint,
    /// falling back to constant-Mach above the transition altitude, then
    /// levels to the final waypoint.
    fn fpa_to_current_position_path(
        &mut self,
        inputs: &BuildInputs,
        aircraft_distance_to_go: Length<f32>,
    ) -> Result<(), PredictError> {
        if !aircraft_distance_to_go.into_nm().is_finite() {
            tracing::error!("replanning requested with an infinite distance to go");
        }

        if let Some(sample) = self.path.samples.last_mut() {
            sample.segment = SegmentKind::FpaToCurrentPosition;
        }

        let start = self.path.last();
        let mut dist = start.distance;
        let mut v_cas = start.cas;
        let mut altitude = start.altitude;

        let descent_ratio =
            (self.start_altitude - altitude) / (aircraft_distance_to_go - dist);
        let mut fpa =
            (self.start_altitude - altitude).atan2(aircraft_distance_to_go - dist);

        while dist < aircraft_distance_to_go && altitude < self.transition_altitude {
            self.active = inputs.constraints.find_active(dist);
            self.active =
                check_active(dist, altitude, v_cas, self.active, self.transition_altitude);

            let distance_left = self.active.distance.min(aircraft_distance_to_go);
            let altitude_at_end = altitude + (distance_left - dist) * descent_ratio;

            if descent_ratio > 0.2 {
                // Too close to the waypoint for the angle to settle: the
                // geometric law re-derives theta from the previous sample, so
                // the first step flies a provisional angle. Clamp the leg end
                // back onto the target altitude afterward.
                tracing::debug!(
                    descent_ratio,
                    "aircraft too close to the waypoint for an adequate flight path angle",
                );
                if fpa > self.config.descent_angle_max {
                    fpa = self.config.descent_angle_max;
                }
                self.geometric_fpa_path(inputs, altitude_at_end, fpa, UNBOUNDED_DISTANCE)?;
                let len = self.path.len();
                if let Some(sample) = self.path.samples.last_mut() {
                    sample.altitude = altitude_at_end;
                }
                if len > 2 {
                    self.path.samples[len - 2].altitude = altitude_at_end;
                }
                altitude = self.path.last().altitude;
                dist = self.path.last().distance;
            }

            while dist < self.active.distance && altitude < altitude_at_end {
                if v_cas < self.active.speed_high {
                    let deceleration = if self.mismatch() {
                        self.config.deceleration_fpa
                    } else {
                        self.config.deceleration
                    };
                    self.fpa_decel_path(
                        inputs,
                        altitude_at_end,
                        deceleration,
                        self.active.speed_high,
                        fpa,
                        UNBOUNDED_DISTANCE,
                    )?;
                }
                self.geometric_fpa_path(inputs, altitude_at_end, fpa, UNBOUNDED_DISTANCE)?;

                let last = self.path.last();
                dist = last.distance;
                v_cas = last.cas;
                altitude = last.altitude;
                if dist > aircraft_distance_to_go {
                    break;
                }
            }

            if altitude > altitude_at_end && dist < self.active.distance {
                self.level_path(inputs, self.active.distance, UNBOUNDED_DISTANCE);
                let last = self.path.last();
                dist = last.distance;
                v_cas = last.cas;
                altitude = last.altitude;
            }
        }

        // Either at the transition altitude or past the aircraft position.
        if self.path.last().altitude < self.start_altitude {
            self.constant_mach_path(inputs, self.start_altitude, UNBOUNDED_DISTANCE);
        }

        let prediction_dist = inputs
            .constraints
            .waypoints
            .last()
            .map_or(inputs.course.total_length(), |waypoint| waypoint.distance);
        self.level_path(inputs, prediction_dist, UNBOUNDED_DISTANCE);
        Ok(())
    }
}
