//! Guidance commands interpolated from a built profile.

use math::{Length, Position, Speed};

use crate::predict::DescentPredictor;

#[cfg(test)]
mod tests;

/// Speed to fly, in whichever regime applies at the current altitude.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SpeedCommand {
    Mach(f32),
    Ias(Speed<f32>),
}

/// Commands steering the aircraft onto the predicted profile.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Guidance {
    /// Altitude the profile holds at the aircraft's distance-to-go.
    pub reference_altitude: Position<f32>,
    /// Commanded rate of climb; negative in a descent.
    pub vertical_speed:     Speed<f32>,
    /// Calibrated airspeed the profile flies at the aircraft's
    /// distance-to-go.
    pub ias_command:        Speed<f32>,
    /// Ground speed the profile predicts at the aircraft's distance-to-go.
    pub ground_speed:       Speed<f32>,
    /// Selected speed. Populated from the profile on the first update
    /// if the caller left it empty.
    pub selected_speed:     Option<SpeedCommand>,
}

impl Default for Guidance {
    fn default() -> Self {
        Self {
            reference_altitude: Position::SEA_LEVEL,
            vertical_speed:     Speed::ZERO,
            ias_command:        Speed::ZERO,
            ground_speed:       Speed::ZERO,
            selected_speed:     None,
        }
    }
}

impl DescentPredictor {
    /// Refreshes `guidance` from the stored profile at the aircraft's current
    /// altitude and distance-to-go.
    ///
    /// Commands only refresh while the aircraft remains within the profile's
    /// distance span; beyond the far end the previous commands are held.
    pub fn update_guidance(
        &mut self,
        altitude: Position<f32>,
        distance_to_go: Length<f32>,
        guidance: &mut Guidance,
    ) {
        if guidance.selected_speed.is_none() {
            guidance.selected_speed = Some(if altitude > self.transition_altitude {
                SpeedCommand::Mach(self.config.cruise_mach)
            } else {
                let sample =
                    self.path.samples.get(self.current_index).copied().unwrap_or_default();
                SpeedCommand::Ias(sample.cas)
            });
        }

        if distance_to_go > self.path.last().distance.abs() {
            return;
        }
        self.current_index = self.path.upper_index(distance_to_go);

        let sample = if self.current_index == 0 {
            // short of the first sample; hold the route-end state
            self.path.samples.first().copied().unwrap_or_default()
        } else {
            let previous = self.path.samples[self.current_index - 1];
            let next = self.path.samples[self.current_index];
            let ratio = distance_to_go.ratio_between(previous.distance, next.distance);

            let mut sample = next;
            sample.altitude = previous.altitude.lerp(next.altitude, ratio);
            sample.cas = previous.cas.lerp(next.cas, ratio);
            sample.altitude_rate = previous.altitude_rate.lerp(next.altitude_rate, ratio);
            sample.ground_speed = previous.ground_speed.lerp(next.ground_speed, ratio);
            sample
        };

        guidance.reference_altitude = sample.altitude;
        guidance.vertical_speed = sample.altitude_rate;
        guidance.ias_command = sample.cas;
        guidance.ground_speed = sample.ground_speed;
    }
}
