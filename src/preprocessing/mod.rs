//! Image enhancement applied to standalone uploads before recognition.

pub mod enhance;
pub mod steps;

pub use enhance::ImageEnhancer;
