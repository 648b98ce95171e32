//! A small always-on-top widget that mirrors and remote-controls the Music
//! app.

pub mod app;
pub mod artwork;
pub mod bridge;
pub mod chime;
pub mod config;
pub mod controller;
pub mod format;
pub mod model;
pub mod prefs;
pub mod rating;
pub mod slider;
pub mod timers;
pub mod volume;
