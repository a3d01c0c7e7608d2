pub mod bank;
pub mod codec;
pub mod common;
pub mod draw;
pub mod palette;
pub mod persist;
pub mod project;
pub mod render;
pub mod state;
pub mod symmetry;
pub mod tile;
