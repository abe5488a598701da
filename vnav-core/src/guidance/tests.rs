use math::{Length, Position, Speed};

use crate::guidance::{Guidance, SpeedCommand};
use crate::path::{PathSample, VerticalPath};
use crate::predict::{DescentConfig, DescentPredictor};

fn sample(distance_nm: f32, alt_ft: f32, cas_kt: f32, gs_kt: f32, rate_kt: f32) -> PathSample {
    PathSample {
        distance: Length::from_nm(distance_nm),
        altitude: Position::from_amsl_feet(alt_ft),
        cas: Speed::from_knots(cas_kt),
        ground_speed: Speed::from_knots(gs_kt),
        altitude_rate: Speed::from_knots(rate_kt),
        ..PathSample::default()
    }
}

fn predictor() -> DescentPredictor {
    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor.path = VerticalPath {
        samples: vec![
            sample(0.0, 2000.0, 250.0, 240.0, 0.0),
            sample(10.0, 6000.0, 280.0, 290.0, -10.0),
        ],
    };
    predictor.current_index = 1;
    predictor
}

#[test]
fn test_interpolates_between_samples() {
    let mut predictor = predictor();
    let mut guidance = Guidance::default();
    predictor.update_guidance(Position::from_amsl_feet(4500.0), Length::from_nm(5.0), &mut guidance);

    guidance
        .reference_altitude
        .assert_near(Position::from_amsl_feet(4000.0), Length::from_feet(1.0))
        .unwrap();
    guidance.ias_command.assert_approx(Speed::from_knots(265.0), Speed::from_knots(0.1)).unwrap();
    guidance.ground_speed.assert_approx(Speed::from_knots(265.0), Speed::from_knots(0.1)).unwrap();
    guidance.vertical_speed.assert_approx(Speed::from_knots(-5.0), Speed::from_knots(0.1)).unwrap();
}

#[test]
fn test_holds_route_end_state_past_first_sample() {
    let mut predictor = predictor();
    let mut guidance = Guidance::default();
    predictor.update_guidance(
        Position::from_amsl_feet(2000.0),
        Length::from_nm(-1.0),
        &mut guidance,
    );

    assert_eq!(guidance.reference_altitude, Position::from_amsl_feet(2000.0));
    assert_eq!(guidance.ias_command, Speed::from_knots(250.0));
}

#[test]
fn test_holds_commands_beyond_profile_span() {
    let mut predictor = predictor();
    let mut guidance = Guidance::default();
    predictor.update_guidance(Position::from_amsl_feet(4500.0), Length::from_nm(5.0), &mut guidance);
    let held = guidance;

    predictor.update_guidance(
        Position::from_amsl_feet(8000.0),
        Length::from_nm(20.0),
        &mut guidance,
    );
    assert_eq!(guidance.reference_altitude, held.reference_altitude);
    assert_eq!(guidance.ias_command, held.ias_command);
}

#[test]
fn test_selected_speed_defaults_to_profile_ias_below_transition() {
    let mut predictor = predictor();
    let mut guidance = Guidance::default();
    predictor.update_guidance(Position::from_amsl_feet(4500.0), Length::from_nm(5.0), &mut guidance);

    // populated from the tracked sample before the index update
    assert_eq!(guidance.selected_speed, Some(SpeedCommand::Ias(Speed::from_knots(280.0))));
}

#[test]
fn test_selected_speed_defaults_to_cruise_mach_above_transition() {
    let mut predictor = predictor();
    let mut guidance = Guidance::default();
    predictor.update_guidance(
        Position::from_amsl_feet(35_000.0),
        Length::from_nm(5.0),
        &mut guidance,
    );

    assert_eq!(guidance.selected_speed, Some(SpeedCommand::Mach(0.8)));
}

#[test]
fn test_selected_speed_is_not_overwritten() {
    let mut predictor = predictor();
    let mut guidance =
        Guidance { selected_speed: Some(SpeedCommand::Ias(Speed::from_knots(220.0))), ..Guidance::default() };
    predictor.update_guidance(Position::from_amsl_feet(4500.0), Length::from_nm(5.0), &mut guidance);

    assert_eq!(guidance.selected_speed, Some(SpeedCommand::Ias(Speed::from_knots(220.0))));
}
