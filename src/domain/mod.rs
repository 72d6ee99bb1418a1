pub mod entity;
pub mod grid;
pub mod prefab;
pub mod rules;
pub mod sprite;
pub mod tile;
