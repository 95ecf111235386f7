pub mod collaborator;
pub mod renderer;
pub mod strategy;

pub use collaborator::*;
pub use renderer::*;
pub use strategy::*;
