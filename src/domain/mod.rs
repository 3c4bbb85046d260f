pub mod entity;
pub mod physics;
pub mod rules;
pub mod tile;
pub mod tilemap;
