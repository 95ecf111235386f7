use thiserror::Error;

/// Raised when layering stops making progress while units remain unassigned.
///
/// `unresolved` lists every unit that could not be placed in a layer, in
/// declaration order. It is a superset of the cycle itself: units that only
/// depend on a cycle are unresolved too.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("dependency cycle among unresolved units: {}", unresolved.join(", "))]
pub struct CycleError {
    pub unresolved: Vec<String>,
}

/// Errors raised while turning a unit list into a layered graph.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("duplicate unit id: {0}")]
    DuplicateUnit(String),

    #[error("unit '{unit}' depends on unknown unit '{missing}'")]
    UnknownDependency { unit: String, missing: String },

    #[error("unit '{unit}' depends on '{dependency}', which already finished as {status}")]
    RetiredDependency {
        unit: String,
        dependency: String,
        status: String,
    },

    #[error(transparent)]
    Cycle(#[from] CycleError),
}

impl GraphError {
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Cycle(_))
    }
}
