//! Reporter trait for dependency injection
//!
//! Lets the synchronizer report progress without being coupled to a
//! particular console or UI.

use luk3_schema::{BundleName, Version};

use crate::plan::InstallTask;

/// Receives user-facing progress events.
pub trait Reporter: Send + Sync {
    /// A new phase has started (e.g. "Configuration", "Bundles").
    fn section(&self, title: &str);

    /// Planning of a bundle has started.
    fn bundle_started(&self, bundle: &BundleName);

    /// Every file of the bundle already verifies; nothing will be fetched.
    fn bundle_up_to_date(&self, bundle: &BundleName);

    /// The bundle needs work. `tasks` is in the order it will be performed.
    fn bundle_planned(&self, bundle: &BundleName, tasks: &[InstallTask]);

    /// The bundle archive is being fetched.
    fn fetching(&self, bundle: &BundleName);

    /// The bundle archive was fetched and extracted.
    fn fetched(&self, bundle: &BundleName, version: &Version);

    /// One file was installed.
    fn task_done(&self, task: &InstallTask);

    /// One file could not be installed.
    fn task_failed(&self, task: &InstallTask, reason: &str);

    /// The bundle could not be planned or fetched.
    fn bundle_failed(&self, bundle: &BundleName, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a success message.
    fn success(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Log an error message.
    fn error(&self, msg: &str);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title);
    }
    fn bundle_started(&self, bundle: &BundleName) {
        (**self).bundle_started(bundle);
    }
    fn bundle_up_to_date(&self, bundle: &BundleName) {
        (**self).bundle_up_to_date(bundle);
    }
    fn bundle_planned(&self, bundle: &BundleName, tasks: &[InstallTask]) {
        (**self).bundle_planned(bundle, tasks);
    }
    fn fetching(&self, bundle: &BundleName) {
        (**self).fetching(bundle);
    }
    fn fetched(&self, bundle: &BundleName, version: &Version) {
        (**self).fetched(bundle, version);
    }
    fn task_done(&self, task: &InstallTask) {
        (**self).task_done(task);
    }
    fn task_failed(&self, task: &InstallTask, reason: &str) {
        (**self).task_failed(task, reason);
    }
    fn bundle_failed(&self, bundle: &BundleName, reason: &str) {
        (**self).bundle_failed(bundle, reason);
    }
    fn info(&self, msg: &str) {
        (**self).info(msg);
    }
    fn success(&self, msg: &str) {
        (**self).success(msg);
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg);
    }
    fn error(&self, msg: &str) {
        (**self).error(msg);
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Debug, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn bundle_started(&self, _: &BundleName) {}
    fn bundle_up_to_date(&self, _: &BundleName) {}
    fn bundle_planned(&self, _: &BundleName, _: &[InstallTask]) {}
    fn fetching(&self, _: &BundleName) {}
    fn fetched(&self, _: &BundleName, _: &Version) {}
    fn task_done(&self, _: &InstallTask) {}
    fn task_failed(&self, _: &InstallTask, _: &str) {}
    fn bundle_failed(&self, _: &BundleName, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
}
