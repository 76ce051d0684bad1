pub mod app;
pub mod audio;
pub mod collision;
pub mod config;
pub mod entities;
pub mod events;
pub mod house;
pub mod spawners;
