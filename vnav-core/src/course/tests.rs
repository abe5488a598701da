use math::{Heading, Length};

use crate::course::{CourseLeg, CourseProfile, PiecewiseCourse};

#[test]
fn test_constant_course() {
    let course = PiecewiseCourse::constant(Heading::EAST, Length::from_nm(100.0));
    assert_eq!(course.course_at(Length::ZERO), Heading::EAST);
    assert_eq!(course.course_at(Length::from_nm(99.0)), Heading::EAST);
    assert_eq!(course.total_length(), Length::from_nm(100.0));
}

#[test]
fn test_step_lookup() {
    let course = PiecewiseCourse {
        legs:         vec![
            CourseLeg { start: Length::ZERO, course: Heading::NORTH },
            CourseLeg { start: Length::from_nm(10.0), course: Heading::EAST },
        ],
        total_length: Length::from_nm(30.0),
    };

    assert_eq!(course.course_at(Length::from_nm(5.0)), Heading::NORTH);
    // boundary belongs to the later leg
    assert_eq!(course.course_at(Length::from_nm(10.0)), Heading::EAST);
    assert_eq!(course.course_at(Length::from_nm(25.0)), Heading::EAST);
    // the first leg covers distances before its start
    assert_eq!(course.course_at(Length::from_nm(-1.0)), Heading::NORTH);
}
