use std::sync::Arc;

use crate::executor::remediation::FixerRegistry;
use crate::executor::traits::{BuildRunner, Publisher, QualityChecker, TestRunner};
use crate::report::ReportStore;

/// External collaborators for one run.
#[derive(Clone)]
pub struct Collaborators {
    pub build: Arc<dyn BuildRunner>,
    pub test: Arc<dyn TestRunner>,
    pub quality: Arc<dyn QualityChecker>,
    pub publisher: Arc<dyn Publisher>,
    pub fixers: FixerRegistry,
    pub report_store: Option<Arc<dyn ReportStore>>,
}

impl Collaborators {
    pub fn new(
        build: Arc<dyn BuildRunner>,
        test: Arc<dyn TestRunner>,
        quality: Arc<dyn QualityChecker>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            build,
            test,
            quality,
            publisher,
            fixers: FixerRegistry::default(),
            report_store: None,
        }
    }

    pub fn with_fixers(mut self, fixers: FixerRegistry) -> Self {
        self.fixers = fixers;
        self
    }

    pub fn with_report_store(mut self, store: Arc<dyn ReportStore>) -> Self {
        self.report_store = Some(store);
        self
    }
}
