pub mod activation;
pub mod delivery;
pub mod event;
pub mod level;
pub mod movement;
pub mod occupancy;
pub mod room;
pub mod step;
pub mod store;
pub mod transition;
pub mod view;
pub mod world;
