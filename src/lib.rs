pub mod assets;
pub mod catalog;
pub mod config;
pub mod errors;
pub mod player;
pub mod web;
