#![warn(clippy::pedantic)]
#![allow(clippy::needless_pass_by_value, clippy::too_many_arguments)]
#![allow(clippy::collapsible_else_if)] // this is usually intentional
#![allow(clippy::missing_panics_doc)]

pub mod constraint;
pub mod course;
pub mod guidance;
pub mod path;
pub mod predict;
pub mod wind;
