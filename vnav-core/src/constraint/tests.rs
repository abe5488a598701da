use math::{Length, Position, Speed};

use crate::constraint::{ConstraintActivity, ConstraintTable, PrecalcConstraint, check_active};

const TRANSITION: Position<f32> = Position::from_amsl_feet(29_000.0);

fn window(distance_nm: f32, alt_low_ft: f32, alt_high_ft: f32, speed_high_kt: f32) -> PrecalcConstraint {
    PrecalcConstraint {
        distance: Length::from_nm(distance_nm),
        alt_low: Position::from_amsl_feet(alt_low_ft),
        alt_high: Position::from_amsl_feet(alt_high_ft),
        speed_high: Speed::from_knots(speed_high_kt),
        ..PrecalcConstraint::default()
    }
}

fn table() -> ConstraintTable {
    ConstraintTable::new(vec![
        window(10.0, 2000.0, 6000.0, 280.0),
        window(50.0, 8000.0, 12000.0, 300.0),
        window(100.0, 0.0, 50000.0, 2000.0),
    ])
}

#[test]
fn test_find_active_selects_first_window_ahead() {
    let active = table().find_active(Length::from_nm(5.0));
    assert_eq!(active.index, 1);
    assert_eq!(active.distance, Length::from_nm(10.0));
    assert_eq!(active.activity, ConstraintActivity::BelowAltOnSpeed);
    assert!(!active.violation);

    let active = table().find_active(Length::from_nm(20.0));
    assert_eq!(active.index, 2);
    assert_eq!(active.distance, Length::from_nm(50.0));
}

#[test]
fn test_find_active_final_window_never_matches() {
    // only the last entry lies ahead, which does not activate
    let active = table().find_active(Length::from_nm(60.0));
    assert_eq!(active.index, 0);
    assert_eq!(active.activity, ConstraintActivity::Unset);

    // nothing lies ahead at all
    let active = table().find_active(Length::from_nm(200.0));
    assert_eq!(active.index, 0);
    assert_eq!(active.activity, ConstraintActivity::Unset);
}

#[test]
fn test_check_active_below_ceiling_on_speed() {
    let result = check_active(
        Length::from_nm(5.0),
        Position::from_amsl_feet(3000.0),
        Speed::from_knots(280.0),
        table().find_active(Length::from_nm(5.0)),
        TRANSITION,
    );
    assert!(!result.violation);
    assert_eq!(result.activity, ConstraintActivity::BelowAltOnSpeed);
}

#[test]
fn test_check_active_past_distance_below_floor() {
    let result = check_active(
        Length::from_nm(12.0),
        Position::from_amsl_feet(1000.0),
        Speed::from_knots(280.0),
        table().find_active(Length::from_nm(5.0)),
        TRANSITION,
    );
    assert!(result.violation);
    assert_eq!(result.activity, ConstraintActivity::SegEndLowAlt);
}

#[test]
fn test_check_active_past_distance_inside_window() {
    let result = check_active(
        Length::from_nm(12.0),
        Position::from_amsl_feet(4000.0),
        Speed::from_knots(280.0),
        table().find_active(Length::from_nm(5.0)),
        TRANSITION,
    );
    assert!(!result.violation);
    assert_eq!(result.activity, ConstraintActivity::SegEndMidAlt);
}

#[test]
fn test_check_active_past_distance_at_ceiling() {
    let result = check_active(
        Length::from_nm(12.0),
        Position::from_amsl_feet(9000.0),
        Speed::from_knots(280.0),
        table().find_active(Length::from_nm(5.0)),
        TRANSITION,
    );
    assert!(result.violation);
    assert_eq!(result.activity, ConstraintActivity::SegEndAtAlt);
}

#[test]
fn test_check_active_at_ceiling_on_speed() {
    let result = check_active(
        Length::from_nm(5.0),
        Position::from_amsl_feet(7000.0),
        Speed::from_knots(280.0),
        table().find_active(Length::from_nm(5.0)),
        TRANSITION,
    );
    assert!(result.violation);
    assert_eq!(result.activity, ConstraintActivity::AtAltOnSpeed);
}

#[test]
fn test_check_active_at_ceiling_slow() {
    // within the altitude margin of the ceiling, still below the speed ceiling
    let result = check_active(
        Length::from_nm(5.0),
        Position::from_amsl_feet(5950.0),
        Speed::from_knots(250.0),
        table().find_active(Length::from_nm(5.0)),
        TRANSITION,
    );
    assert!(result.violation);
    assert_eq!(result.activity, ConstraintActivity::AtAltSlow);
}

#[test]
fn test_check_active_below_ceiling_slow() {
    let result = check_active(
        Length::from_nm(5.0),
        Position::from_amsl_feet(3000.0),
        Speed::from_knots(250.0),
        table().find_active(Length::from_nm(5.0)),
        TRANSITION,
    );
    assert!(result.violation);
    assert_eq!(result.activity, ConstraintActivity::BelowAltSlow);
}

#[test]
fn test_check_active_sentinel_speed_disables_slow() {
    // ceiling 50,000 ft with a 2,000 kt speed sentinel: being slower than the
    // sentinel must not schedule a deceleration
    let wide = check_active(
        Length::from_nm(60.0),
        Position::from_amsl_feet(20_000.0),
        Speed::from_knots(250.0),
        window(100.0, 0.0, 50000.0, 2000.0),
        TRANSITION,
    );
    assert!(!wide.violation);
}

#[test]
fn test_precedence_aliases_segment_end_at_ceiling() {
    assert_eq!(
        ConstraintActivity::SegEndAtAlt.precedence(),
        ConstraintActivity::AtAltOnSpeed.precedence(),
    );
    assert!(ConstraintActivity::Unset.continues_unconstrained());
    assert!(ConstraintActivity::BelowAltOnSpeed.continues_unconstrained());
    assert!(!ConstraintActivity::BelowAltSlow.continues_unconstrained());
}
