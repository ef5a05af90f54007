//! Individual enhancement steps

pub mod grayscale;
pub mod threshold;
