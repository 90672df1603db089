pub mod capture;
pub mod clock;
pub mod config;
pub mod display;
pub mod error;
pub mod logging;
pub mod recorder;
pub mod runtime;
pub mod sequencer;
pub mod session;
pub mod trial;
pub mod ui;
