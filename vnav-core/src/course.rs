//! Ground course along the precomputed horizontal track.

use math::{Heading, Length};

#[cfg(test)]
mod tests;

/// Course geometry of the ground track,
/// parameterized by along-path distance from the route end.
pub trait CourseProfile {
    /// Course flown at `distance` from the route end.
    fn course_at(&self, distance: Length<f32>) -> Heading;

    /// Total length of the ground track.
    fn total_length(&self) -> Length<f32>;
}

/// One straight leg of a [`PiecewiseCourse`].
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CourseLeg {
    /// Along-path distance from the route end at which the leg starts.
    pub start:  Length<f32>,
    pub course: Heading,
}

/// Step-function course over ordered legs.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PiecewiseCourse {
    /// Legs sorted by increasing start distance. The first leg also covers
    /// any distance before its start.
    pub legs:         Vec<CourseLeg>,
    pub total_length: Length<f32>,
}

impl PiecewiseCourse {
    /// A single-leg track flying `course` for its whole length.
    #[must_use]
    pub fn constant(course: Heading, total_length: Length<f32>) -> Self {
        Self { legs: vec![CourseLeg { start: Length::ZERO, course }], total_length }
    }
}

impl CourseProfile for PiecewiseCourse {
    fn course_at(&self, distance: Length<f32>) -> Heading {
        let upper = self.legs.partition_point(|leg| leg.start <= distance);
        let index = upper.saturating_sub(1);
        self.legs.get(index).map_or(Heading::NORTH, |leg| leg.course)
    }

    fn total_length(&self) -> Length<f32> { self.total_length }
}
