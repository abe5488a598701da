use itertools::Itertools;
use math::{Angle, Heading, Length, Position, Speed};

use crate::constraint::{ConstraintTable, PrecalcConstraint};
use crate::course::PiecewiseCourse;
use crate::path::{PathSample, SegmentKind, VerticalPath};
use crate::predict::{
    Atmosphere, BuildInputs, DescentConfig, DescentPredictor, UNBOUNDED_DISTANCE,
};
use crate::wind::Calm;

/// A constraint window wide enough to never bind.
fn open_window(distance_nm: f32) -> PrecalcConstraint {
    PrecalcConstraint {
        distance: Length::from_nm(distance_nm),
        alt_low: Position::SEA_LEVEL,
        alt_high: Position::from_amsl_feet(50_000.0),
        speed_high: Speed::from_knots(2000.0),
        ..PrecalcConstraint::default()
    }
}

fn assert_monotone(predictor: &DescentPredictor) {
    for (previous, next) in predictor.path().samples.iter().tuple_windows() {
        assert!(
            next.distance >= previous.distance,
            "distance regressed: {:?} after {:?}",
            next.distance,
            previous.distance,
        );
        assert!(
            next.time_to_go > previous.time_to_go,
            "time to go must be strictly increasing after trimming",
        );
        assert!(
            next.altitude >= previous.altitude,
            "altitude dropped away from the route end: {:?} after {:?}",
            next.altitude,
            previous.altitude,
        );
    }
}

fn segments(predictor: &DescentPredictor) -> Vec<SegmentKind> {
    predictor.path().samples.iter().map(|sample| sample.segment).dedup().collect()
}

#[test]
fn test_unconstrained_build_reaches_cruise() {
    let course = PiecewiseCourse::constant(Heading::NORTH, Length::from_nm(400.0));
    let constraints = ConstraintTable::new(vec![open_window(500.0), open_window(550.0)]);
    let inputs = BuildInputs {
        course: &course,
        wind: &Calm,
        constraints: &constraints,
        atmosphere: Atmosphere::default(),
    };

    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor
        .set_conditions_at_end_of_route(Position::from_amsl_feet(2000.0), Speed::from_knots(250.0));
    predictor
        .build_vertical_prediction(&inputs, Position::from_amsl_feet(37_000.0), UNBOUNDED_DISTANCE)
        .unwrap();

    assert!(!predictor.mismatch());
    assert_monotone(&predictor);

    let last = predictor.path().last();
    assert!(last.altitude >= Position::from_amsl_feet(36_999.0), "top of descent at cruise");
    assert!(last.distance >= Length::from_nm(400.0), "profile spans the whole track");

    let kinds = segments(&predictor);
    assert!(kinds.contains(&SegmentKind::ConstantCas));
    assert!(kinds.contains(&SegmentKind::ConstantMach));
    assert!(kinds.contains(&SegmentKind::Level));

    assert_eq!(predictor.waypoint_path_indices().len(), 2);
}

#[test]
fn test_short_route_degrades_to_level() {
    let course = PiecewiseCourse::constant(Heading::NORTH, Length::from_nm(10.0));
    let constraints = ConstraintTable::new(vec![open_window(5.0), open_window(8.0)]);
    let inputs = BuildInputs {
        course: &course,
        wind: &Calm,
        constraints: &constraints,
        atmosphere: Atmosphere::default(),
    };

    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor
        .set_conditions_at_end_of_route(Position::from_amsl_feet(2000.0), Speed::from_knots(250.0));
    predictor
        .build_vertical_prediction(
            &inputs,
            Position::from_amsl_feet(2000.0),
            Length::from_nm(0.5),
        )
        .unwrap();

    assert!(!predictor.mismatch());
    for sample in &predictor.path().samples {
        assert_eq!(sample.altitude, Position::from_amsl_feet(2000.0));
        assert!(matches!(sample.segment, SegmentKind::Undetermined | SegmentKind::Level));
    }
    assert!(predictor.path().last().distance >= Length::from_nm(8.0));
}

#[test]
fn test_speed_limit_schedules_transitional_descent() {
    // 280 kt ceiling at the first waypoint while the route ends at 250 kt:
    // the build must open with the shallow decelerating descent.
    let course = PiecewiseCourse::constant(Heading::NORTH, Length::from_nm(100.0));
    let constraints = ConstraintTable::new(vec![
        PrecalcConstraint {
            distance: Length::from_nm(30.0),
            alt_low: Position::SEA_LEVEL,
            alt_high: Position::from_amsl_feet(50_000.0),
            speed_high: Speed::from_knots(280.0),
            ..PrecalcConstraint::default()
        },
        open_window(200.0),
    ]);
    let inputs = BuildInputs {
        course: &course,
        wind: &Calm,
        constraints: &constraints,
        atmosphere: Atmosphere::default(),
    };

    let config = DescentConfig {
        cruise_altitude: Position::from_amsl_feet(12_000.0),
        cruise_mach: 0.0,
        ..DescentConfig::default()
    };
    let mut predictor = DescentPredictor::new(config);
    assert!(!predictor.transition_altitude().amsl().into_nm().is_finite());

    predictor
        .set_conditions_at_end_of_route(Position::from_amsl_feet(3000.0), Speed::from_knots(250.0));
    predictor
        .build_vertical_prediction(&inputs, Position::from_amsl_feet(12_000.0), UNBOUNDED_DISTANCE)
        .unwrap();

    assert!(!predictor.mismatch());
    assert_monotone(&predictor);

    let kinds = segments(&predictor);
    assert!(kinds.contains(&SegmentKind::ConstantDecel), "got {kinds:?}");
    assert!(kinds.contains(&SegmentKind::ConstantCas), "got {kinds:?}");
    assert!(kinds.contains(&SegmentKind::Level), "got {kinds:?}");

    let last = predictor.path().last();
    assert!(last.altitude >= Position::from_amsl_feet(11_999.0));
    assert!(last.distance >= Length::from_nm(100.0));
    assert!(last.cas >= Speed::from_knots(279.0), "decelerated up to the ceiling");
}

#[test]
fn test_prediction_above_aircraft_replans_direct() {
    // The aircraft sits at 10,000 ft only 60 NM out; the nominal profile
    // passes far above it, so the build replans a direct angle to it.
    let course = PiecewiseCourse::constant(Heading::NORTH, Length::from_nm(150.0));
    let constraints = ConstraintTable::new(vec![open_window(200.0), open_window(250.0)]);
    let inputs = BuildInputs {
        course: &course,
        wind: &Calm,
        constraints: &constraints,
        atmosphere: Atmosphere::default(),
    };

    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor
        .set_conditions_at_end_of_route(Position::from_amsl_feet(2000.0), Speed::from_knots(250.0));
    predictor
        .build_vertical_prediction(
            &inputs,
            Position::from_amsl_feet(10_000.0),
            Length::from_nm(60.0),
        )
        .unwrap();

    assert!(predictor.prediction_too_high);
    assert!(!predictor.prediction_too_low);
    assert_monotone(&predictor);

    let kinds = segments(&predictor);
    assert!(kinds.contains(&SegmentKind::FpaToCurrentPosition), "got {kinds:?}");
    assert!(kinds.contains(&SegmentKind::FpaDecel), "got {kinds:?}");

    let last = predictor.path().last();
    assert!(last.altitude >= Position::from_amsl_feet(9_999.0));
    assert!(last.distance >= Length::from_nm(250.0), "levels out to the final waypoint");
}

#[test]
fn test_prediction_below_aircraft_too_steep_to_replan() {
    // The aircraft is at 25,000 ft only 20 NM out; reaching it would take
    // more than the maximum descent angle, so the flag stays set.
    let course = PiecewiseCourse::constant(Heading::NORTH, Length::from_nm(50.0));
    let constraints = ConstraintTable::new(vec![open_window(200.0), open_window(250.0)]);
    let inputs = BuildInputs {
        course: &course,
        wind: &Calm,
        constraints: &constraints,
        atmosphere: Atmosphere::default(),
    };

    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor
        .set_conditions_at_end_of_route(Position::from_amsl_feet(2000.0), Speed::from_knots(250.0));
    predictor
        .build_vertical_prediction(
            &inputs,
            Position::from_amsl_feet(25_000.0),
            Length::from_nm(20.0),
        )
        .unwrap();

    assert!(predictor.prediction_too_low);
    assert!(!predictor.prediction_too_high);
    assert!(!segments(&predictor).contains(&SegmentKind::FpaToCurrentPosition));
    assert!(predictor.path().last().distance >= Length::from_nm(50.0));
}

#[test]
fn test_default_config_transition_altitude() {
    let config = DescentConfig::default();
    config
        .transition_altitude
        .assert_near(Position::from_amsl_feet(29_075.0), Length::from_feet(200.0))
        .unwrap();
}

#[test]
fn test_bracket_flags_only_outside_tolerance() {
    let start = Position::from_amsl_feet(10_000.0);

    // crossing step straddles the aircraft within 400 ft on both sides
    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor.start_altitude = start;
    assert!(!predictor
        .check_bracket(Position::from_amsl_feet(10_300.0), Position::from_amsl_feet(9_700.0)));
    assert!(!predictor.prediction_too_high);
    assert!(!predictor.prediction_too_low);

    // the step began more than 400 ft above the aircraft
    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor.start_altitude = start;
    assert!(predictor
        .check_bracket(Position::from_amsl_feet(10_500.0), Position::from_amsl_feet(10_450.0)));
    assert!(predictor.prediction_too_high);
    assert!(!predictor.prediction_too_low);

    // the step ends more than 400 ft below the aircraft
    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor.start_altitude = start;
    assert!(predictor
        .check_bracket(Position::from_amsl_feet(10_200.0), Position::from_amsl_feet(9_500.0)));
    assert!(!predictor.prediction_too_high);
    assert!(predictor.prediction_too_low);
}

#[test]
fn test_level_leg_to_current_distance_appends_nothing() {
    let course = PiecewiseCourse::constant(Heading::NORTH, Length::from_nm(50.0));
    let constraints = ConstraintTable::new(vec![open_window(200.0)]);
    let inputs = BuildInputs {
        course: &course,
        wind: &Calm,
        constraints: &constraints,
        atmosphere: Atmosphere::default(),
    };

    let seed = PathSample {
        distance: Length::from_nm(12.0),
        altitude: Position::from_amsl_feet(5000.0),
        cas: Speed::from_knots(250.0),
        segment: SegmentKind::Level,
        ..PathSample::default()
    };
    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor.path = VerticalPath::seeded(seed);

    predictor.level_path(&inputs, Length::from_nm(12.0), UNBOUNDED_DISTANCE);

    assert_eq!(predictor.path().len(), 1, "no sample past the requested end distance");
    assert_eq!(predictor.path().last(), seed);
    assert!(!predictor.mismatch());
}

#[test]
fn test_steep_replan_clamp_spares_earlier_samples() {
    // The aircraft sits 20 ft above and 0.015 NM ahead of the truncation
    // point: the direct leg resolves in a single integration step, so the
    // altitude clamp lands on the newest sample only.
    let course = PiecewiseCourse::constant(Heading::NORTH, Length::from_nm(1.0));
    let constraints = ConstraintTable::new(vec![open_window(1.0)]);
    let inputs = BuildInputs {
        course: &course,
        wind: &Calm,
        constraints: &constraints,
        atmosphere: Atmosphere::default(),
    };

    let seed = PathSample {
        distance: Length::from_nm(0.0),
        altitude: Position::from_amsl_feet(5000.0),
        cas: Speed::from_knots(250.0),
        theta: Angle::from_degrees(6.0),
        ..PathSample::default()
    };
    let mut predictor = DescentPredictor::new(DescentConfig::default());
    predictor.start_altitude = Position::from_amsl_feet(5020.0);
    predictor.path = VerticalPath::seeded(seed);

    predictor.fpa_to_current_position_path(&inputs, Length::from_nm(0.015)).unwrap();

    let samples = &predictor.path().samples;
    assert_eq!(samples[0].altitude, Position::from_amsl_feet(5000.0), "seed left untouched");
    samples[1]
        .altitude
        .assert_near(Position::from_amsl_feet(5020.0), Length::from_feet(0.1))
        .unwrap();
    assert!(samples[1].distance > Length::from_nm(0.015));
}

#[test]
fn test_headwind_shortens_each_step() {
    use crate::wind::{WindLevel, WindTable};

    let course = PiecewiseCourse::constant(Heading::NORTH, Length::from_nm(400.0));
    let constraints = ConstraintTable::new(vec![open_window(500.0), open_window(550.0)]);
    let atmosphere = Atmosphere::default();

    let calm_inputs =
        BuildInputs { course: &course, wind: &Calm, constraints: &constraints, atmosphere };
    let mut calm = DescentPredictor::new(DescentConfig::default());
    calm.set_conditions_at_end_of_route(Position::from_amsl_feet(2000.0), Speed::from_knots(250.0));
    calm.build_vertical_prediction(&calm_inputs, Position::from_amsl_feet(37_000.0), UNBOUNDED_DISTANCE)
        .unwrap();

    // flying north against a wind from the north at all levels
    let wind = WindTable::new(vec![
        WindLevel {
            altitude: Position::SEA_LEVEL,
            wind:     Speed::from_knots(50.0).with_heading(Heading::SOUTH),
        },
        WindLevel {
            altitude: Position::from_amsl_feet(40_000.0),
            wind:     Speed::from_knots(50.0).with_heading(Heading::SOUTH),
        },
    ]);
    let windy_inputs =
        BuildInputs { course: &course, wind: &wind, constraints: &constraints, atmosphere };
    let mut windy = DescentPredictor::new(DescentConfig::default());
    windy
        .set_conditions_at_end_of_route(Position::from_amsl_feet(2000.0), Speed::from_knots(250.0));
    windy
        .build_vertical_prediction(&windy_inputs, Position::from_amsl_feet(37_000.0), UNBOUNDED_DISTANCE)
        .unwrap();

    // same cruise altitude is reached, but over less ground
    let calm_tod = calm
        .path()
        .samples
        .iter()
        .find(|sample| sample.altitude >= Position::from_amsl_feet(36_999.0))
        .map(|sample| sample.distance)
        .unwrap();
    let windy_tod = windy
        .path()
        .samples
        .iter()
        .find(|sample| sample.altitude >= Position::from_amsl_feet(36_999.0))
        .map(|sample| sample.distance)
        .unwrap();
    assert!(
        windy_tod < calm_tod,
        "headwind top of descent {windy_tod:?} not closer than calm {calm_tod:?}",
    );
}
