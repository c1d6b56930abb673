//! Web handlers module
//!
//! HTTP request handlers organized by area.

pub mod catalog;
pub mod health;
pub mod player;
pub mod static_assets;
