//! Services layer

pub mod assets;
pub mod sync;
