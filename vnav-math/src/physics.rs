//! Algorithms and constants related to aviation physics.

use std::ops;

use crate::units::Position;
use crate::{Accel, Angle, FEET_PER_NM, Length, Pressure, QuantityTrait, Speed, Temp, TempDelta};


/// Altitude of the tropopause.
pub const TROPOPAUSE_ALTITUDE: Position<f32> = Position::new(36089.24 / FEET_PER_NM);

/// Standard pressure at sea level pressure (QNH).
pub const ISA_SEA_LEVEL_PRESSURE: Pressure = Pressure::new(101325.0);

/// Standard sea level temperature.
pub const ISA_SEA_LEVEL_TEMPERATURE: Temp = Temp::from_kelvins(288.15);

pub const ISA_SEA_LEVEL_AIR_DENSITY: f32 =
    air_density(ISA_SEA_LEVEL_PRESSURE, ISA_SEA_LEVEL_TEMPERATURE);

/// Standard pressure at tropopause.
//
// The value needs to be hardcoded because powf is not const yet
pub const ISA_TROPOPAUSE_PRESSURE: Pressure = Pressure::new(22632.1);

/// Standard temperature at tropopause.
pub const ISA_TROPOPAUSE_TEMPERATURE: Temp = Temp::from_kelvins(
    ISA_SEA_LEVEL_TEMPERATURE.into_kelvins()
        - isa_temp_lapse(TROPOPAUSE_ALTITUDE.amsl()).into_kelvins(),
);

/// Standard temperature lapse rate, in K/m.
///
/// Consider using [`isa_temp_lapse`] instead for better dimensional safety.
pub const ISA_LAPSE_RATE: f32 = 6.5e-3;

/// Computes the ISA temperature change over a given distance.
///
/// The input and output have the same sign.
/// That is, if `distance` is positive, the output is positive,
/// indicating the temperature increase when altitude decreases by `distance`.
#[must_use]
pub const fn isa_temp_lapse(distance: Length<f32>) -> TempDelta {
    TempDelta::new(ISA_LAPSE_RATE * distance.into_meters())
}

/// Specific gas constant for dry air, in SI unit (J/kg/K).
pub const DRY_AIR_GAS_CONSTANT: f32 = 287.052874;

/// Isentropic expansion coefficient for dry air.
pub const ADIABATIC_INDEX: f32 = 1.4;

/// `(gamma - 1) / gamma`, the exponent in the compressible airspeed conversions.
pub const COMPRESSIBILITY_EXPONENT: f32 = (ADIABATIC_INDEX - 1.0) / ADIABATIC_INDEX;

#[must_use]
pub const fn air_density(pressure: Pressure, temp: Temp) -> f32 {
    pressure.into_pascals() / (DRY_AIR_GAS_CONSTANT * temp.into_kelvins())
}

/// Standard gravity at Earth's surface.
pub const EARTH_SURFACE_GRAVITY: Accel<f32> = Accel::from_meters_per_sec2(9.80665);

/// g0 / R.
pub const G_OVER_R: f32 = EARTH_SURFACE_GRAVITY.into_meters_per_sec2() / DRY_AIR_GAS_CONSTANT;

/// g0 / RL, in SI units, used as the exponent in the barometric formula in the troposphere.
pub const GRL_EXPONENT: f32 = G_OVER_R / ISA_LAPSE_RATE;

/// Computes the barometrics at an airborne position.
pub struct Barometrics {
    /// Atmospheric pressure at the given true altitude.
    pub pressure:          Pressure,
    /// Indicated pressure altitude at the given true altitude.
    pub pressure_altitude: Position<f32>,
    /// Outside temperature at the given true altitude.
    pub temp:              Temp,
    /// Air density in kg/m^3.
    pub air_density:       f32,
    /// Ratio of TAS/IAS at the given true altitude.
    /// Equal to `sqrt(sea_level_air_density / air_density)`.
    pub tas_ias_ratio:     f32,
}

impl Barometrics {
    /// Computes the true airspeed from indicated airspeed,
    /// using the incompressible density-ratio approximation.
    #[must_use]
    pub fn true_airspeed<T>(&self, indicated_airspeed: Speed<T>) -> Speed<T>
    where
        T: ops::Mul<f32, Output = T>,
    {
        indicated_airspeed * self.tas_ias_ratio
    }

    /// Computes the indicated airspeed from true airspeed,
    /// using the incompressible density-ratio approximation.
    #[must_use]
    pub fn indicated_airspeed<T>(&self, true_airspeed: Speed<T>) -> Speed<T>
    where
        T: ops::Div<f32, Output = T>,
    {
        true_airspeed / self.tas_ias_ratio
    }

    /// Speed of sound at the outside temperature.
    #[must_use]
    pub fn speed_of_sound(&self) -> Speed<f32> {
        Speed::from_meter_per_sec((ADIABATIC_INDEX * DRY_AIR_GAS_CONSTANT * self.temp.into_kelvins()).sqrt())
    }

    /// Mach number flown at the given true airspeed.
    #[must_use]
    pub fn mach(&self, true_airspeed: Speed<f32>) -> f32 {
        true_airspeed.into_meter_per_sec() / self.speed_of_sound().into_meter_per_sec()
    }

    /// True airspeed flown at the given Mach number.
    #[must_use]
    pub fn mach_to_tas(&self, mach: f32) -> Speed<f32> { self.speed_of_sound() * mach }

    /// Computes the true airspeed from calibrated airspeed
    /// with the full compressible-flow correction.
    #[must_use]
    pub fn cas_to_tas(&self, cas: Speed<f32>) -> Speed<f32> {
        let mu = COMPRESSIBILITY_EXPONENT;
        let p = self.pressure.into_pascals();
        let rho = self.air_density;
        let p0 = ISA_SEA_LEVEL_PRESSURE.into_pascals();
        let rho0 = ISA_SEA_LEVEL_AIR_DENSITY;

        let impact = 1.0 + mu / 2.0 * (rho0 / p0) * cas.into_meter_per_sec().powi(2);
        let ratio = impact.powf(1.0 / mu) - 1.0;
        let expanded = (1.0 + p0 / p * ratio).powf(mu);
        Speed::from_meter_per_sec((2.0 / mu * p / rho * (expanded - 1.0)).sqrt())
    }

    /// Computes the calibrated airspeed from true airspeed
    /// with the full compressible-flow correction.
    #[must_use]
    pub fn tas_to_cas(&self, tas: Speed<f32>) -> Speed<f32> {
        let mu = COMPRESSIBILITY_EXPONENT;
        let p = self.pressure.into_pascals();
        let rho = self.air_density;
        let p0 = ISA_SEA_LEVEL_PRESSURE.into_pascals();
        let rho0 = ISA_SEA_LEVEL_AIR_DENSITY;

        let impact = 1.0 + mu / 2.0 * (rho / p) * tas.into_meter_per_sec().powi(2);
        let ratio = impact.powf(1.0 / mu) - 1.0;
        let expanded = (1.0 + p / p0 * ratio).powf(mu);
        Speed::from_meter_per_sec((2.0 / mu * p0 / rho0 * (expanded - 1.0)).sqrt())
    }

    /// Computes the calibrated airspeed flown at the given Mach number.
    #[must_use]
    pub fn mach_to_cas(&self, mach: f32) -> Speed<f32> { self.tas_to_cas(self.mach_to_tas(mach)) }
}

#[must_use]
pub fn compute_barometric(
    true_altitude: Position<f32>,
    sea_level_pressure: Pressure,
    sea_level_temp: Temp,
) -> Barometrics {
    let temp;
    let pressure;
    let pressure_altitude;

    if true_altitude <= TROPOPAUSE_ALTITUDE {
        temp = sea_level_temp - isa_temp_lapse(true_altitude.amsl());
        pressure = sea_level_pressure
            * (temp.from_abs_zero() / sea_level_temp.from_abs_zero()).powf(GRL_EXPONENT);

        pressure_altitude = Position::SEA_LEVEL
            + Length::from_meters(
                ISA_SEA_LEVEL_TEMPERATURE.into_kelvins() / ISA_LAPSE_RATE
                    * (1.0 - (pressure / ISA_SEA_LEVEL_PRESSURE).powf(1.0 / GRL_EXPONENT)),
            );
    } else {
        temp = sea_level_temp - isa_temp_lapse(TROPOPAUSE_ALTITUDE.amsl());
        let true_tropopause_pressure = sea_level_pressure
            * (temp.from_abs_zero() / sea_level_temp.from_abs_zero()).powf(GRL_EXPONENT);
        pressure = true_tropopause_pressure
            * (-G_OVER_R * (true_altitude - TROPOPAUSE_ALTITUDE).into_meters()
                / temp.into_kelvins())
            .exp();

        pressure_altitude = TROPOPAUSE_ALTITUDE
            + Length::from_meters(
                ISA_TROPOPAUSE_TEMPERATURE.into_kelvins() / G_OVER_R
                    * (ISA_TROPOPAUSE_PRESSURE / pressure).ln(),
            );
    }

    let air_density = air_density(pressure, temp);
    let tas_ias_ratio = (ISA_SEA_LEVEL_AIR_DENSITY / air_density).sqrt();

    Barometrics { pressure, pressure_altitude, temp, air_density, tas_ias_ratio }
}

/// The Mach-number term shared by both energy-share laws:
/// `gamma * R * (-L) / (2 g0) * M^2`, negative in a standard (cooling) lapse.
fn lapse_mach_term(mach: f32) -> f32 {
    ADIABATIC_INDEX * DRY_AIR_GAS_CONSTANT * (-ISA_LAPSE_RATE)
        / (2.0 * EARTH_SURFACE_GRAVITY.into_meters_per_sec2())
        * mach.powi(2)
}

/// Energy share factor for a constant-calibrated-airspeed climb or descent.
///
/// Relates the rate of speed change to the rate of altitude change:
/// `dv/dt = (1/esf - 1) * (g0/v) * dh/dt`.
#[must_use]
pub fn energy_share_constant_cas(
    true_airspeed: Speed<f32>,
    altitude: Position<f32>,
    temp: Temp,
) -> f32 {
    let mach = true_airspeed.into_meter_per_sec()
        / (ADIABATIC_INDEX * DRY_AIR_GAS_CONSTANT * temp.into_kelvins()).sqrt();

    let impact = 1.0 + (ADIABATIC_INDEX - 1.0) / 2.0 * mach.powi(2);
    let compressibility = impact.powf(-1.0 / (ADIABATIC_INDEX - 1.0))
        * (impact.powf(ADIABATIC_INDEX / (ADIABATIC_INDEX - 1.0)) - 1.0);

    let denom = if altitude <= TROPOPAUSE_ALTITUDE {
        1.0 + lapse_mach_term(mach) + compressibility
    } else {
        1.0 + compressibility
    };
    1.0 / denom
}

/// Energy share factor for a constant-Mach climb or descent.
///
/// Exactly 1 above the tropopause, where a constant Mach number implies
/// constant true airspeed.
#[must_use]
pub fn energy_share_constant_mach(
    true_airspeed: Speed<f32>,
    altitude: Position<f32>,
    temp: Temp,
) -> f32 {
    if altitude <= TROPOPAUSE_ALTITUDE {
        let mach = true_airspeed.into_meter_per_sec()
            / (ADIABATIC_INDEX * DRY_AIR_GAS_CONSTANT * temp.into_kelvins()).sqrt();
        1.0 / (1.0 + lapse_mach_term(mach))
    } else {
        1.0
    }
}

/// Solves the altitude at which an aircraft climbing at constant `ias`
/// reaches the given Mach number in a standard atmosphere.
#[must_use]
pub fn mach_ias_transition_altitude(ias: Speed<f32>, mach: f32) -> Position<f32> {
    let a0 = (ADIABATIC_INDEX * DRY_AIR_GAS_CONSTANT * ISA_SEA_LEVEL_TEMPERATURE.into_kelvins())
        .sqrt();
    let exponent = ADIABATIC_INDEX / (ADIABATIC_INDEX - 1.0);

    let ias_impact = 1.0 + (ADIABATIC_INDEX - 1.0) / 2.0 * (ias.into_meter_per_sec() / a0).powi(2);
    let mach_impact = 1.0 + (ADIABATIC_INDEX - 1.0) / 2.0 * mach.powi(2);
    let delta_trans = (ias_impact.powf(exponent) - 1.0) / (mach_impact.powf(exponent) - 1.0);
    let theta_trans = delta_trans.powf(1.0 / GRL_EXPONENT);

    Position::SEA_LEVEL
        + Length::from_meters(
            ISA_SEA_LEVEL_TEMPERATURE.into_kelvins() / ISA_LAPSE_RATE * (1.0 - theta_trans),
        )
}

/// Ground speed realized when flying `true_airspeed` at flight path angle `theta`,
/// crabbing to cancel the crosswind component and keep the track on course.
///
/// `wind_parallel` is the wind component along the course,
/// `wind_perpendicular` the component across it.
#[must_use]
pub fn solve_ground_speed(
    true_airspeed: Speed<f32>,
    theta: Angle,
    wind_parallel: Speed<f32>,
    wind_perpendicular: Speed<f32>,
) -> Speed<f32> {
    let horizontal = true_airspeed.into_raw() * theta.cos();
    let along_track_sq = horizontal.powi(2) - wind_perpendicular.into_raw().powi(2);
    Speed::from_raw(along_track_sq.max(0.0).sqrt() + wind_parallel.into_raw())
}
