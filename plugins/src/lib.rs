pub mod collaborators;
pub mod executor;
pub mod factory;
pub mod store;
