pub mod diff;
pub mod patch;
pub mod render;
pub mod trim;
