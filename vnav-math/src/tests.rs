use std::time::Duration;

use approx::assert_relative_eq;

use crate::{Accel, Angle, Heading, Length, Speed};

#[test]
fn length_conversions() {
    assert_relative_eq!(Length::from_feet(6076.12).into_nm(), 1.0, max_relative = 1e-6);
    assert_relative_eq!(Length::from_meters(1852.0).into_nm(), 1.0, max_relative = 1e-6);
}

#[test]
fn speed_rate_integration() {
    // 6 kt/s of deceleration over half a second removes 3 kt
    let decel = Accel::from_knots_per_sec(6.0);
    let delta = decel * Duration::from_millis(500);
    assert_relative_eq!(delta.into_knots(), 3.0, max_relative = 1e-6);
}

#[test]
fn speed_distance_integration() {
    let speed = Speed::from_knots(360.0);
    let step = speed * Duration::from_secs(10);
    assert_relative_eq!(step.into_nm(), 1.0, max_relative = 1e-6);
}

#[test]
fn heading_wind_decomposition() {
    // northerly course, pure westerly wind (blowing towards east)
    let course = Heading::NORTH;
    let wind = Speed::vec2_from_knots(bevy_math::Vec2::new(10.0, 0.0));
    let parallel = wind.project_onto_dir(course.into_dir2());
    let perpendicular = wind.project_onto_dir(course.perpendicular_dir());
    assert_relative_eq!(parallel.into_knots(), 0.0, epsilon = 1e-4);
    assert_relative_eq!(perpendicular.into_knots(), -10.0, max_relative = 1e-4);
}

#[test]
fn angle_asin_roundtrip() {
    let angle = Angle::from_degrees(2.9);
    assert_relative_eq!(Angle::asin(angle.sin()).into_degrees(), 2.9, max_relative = 1e-4);
}
