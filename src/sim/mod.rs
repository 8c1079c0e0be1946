pub mod acoustics;
pub mod config;
pub mod engine;
pub mod image_source;
pub mod materials;
pub mod rays;
pub mod rir;
pub mod room;
