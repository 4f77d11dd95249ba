pub mod config;
pub mod gesture;
pub mod outfit;
pub mod overlay;
pub mod pose;
pub mod recorder;
pub mod renderer;
pub mod session;
