// Atlas module
//
// Plans the grid geometry for a set of unique tiles and composes them into a
// single RGBA buffer.

pub mod layout;
pub mod compose;

pub use compose::{compose, Atlas, Placement};
pub use layout::{plan, AtlasGeometry, LayoutPolicy};
