pub mod detector;
pub mod model;
