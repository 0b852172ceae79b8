//! Bundle synchronization.
//!
//! Each bundle walks an explicit state machine:
//!
//! ```text
//! Planning ──(empty plan)──────────────────────────────> UpToDate
//!    │
//!    └──> Fetching ──> Installing (every task attempted) ──> Complete
//!            │
//! (plan or fetch error) ─────────────────────────────────> Failed
//! ```
//!
//! Bundles are processed strictly in configuration order and a failure never
//! stops the next bundle. Within a bundle, a failed file never stops the next
//! file.

use luk3_schema::{Bundle, BundleName, Configuration, Version};
use thiserror::Error;
use tracing::{info, warn};

use crate::install::{TaskError, install};
use crate::paths::InstallRoot;
use crate::plan::{InstallTask, plan};
use crate::registry::{FetchError, FetchedBundle, PackageFetcher};
use crate::reporter::Reporter;
use crate::verify::IntegrityError;

/// How bundle and task failures map to the process outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitPolicy {
    /// Isolated failures are reported but the run still succeeds.
    #[default]
    Lenient,
    /// Any failed bundle or task fails the run.
    Strict,
}

/// A bundle could not be planned or fetched.
#[derive(Error, Debug)]
pub enum BundleError {
    /// Checking an installed file failed.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    /// The bundle archive could not be obtained.
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Outcome of one install task.
#[derive(Debug)]
pub struct TaskReport {
    /// The task that was attempted.
    pub task: InstallTask,
    /// What happened.
    pub result: Result<(), TaskError>,
}

impl TaskReport {
    /// Whether the file was installed.
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Terminal state of one bundle.
#[derive(Debug)]
pub enum BundleOutcome {
    /// Every file already verified. Nothing was fetched.
    UpToDate,
    /// Dry run: these tasks would have been performed.
    Pending {
        /// Planned tasks.
        tasks: Vec<InstallTask>,
    },
    /// The archive was fetched and every task attempted.
    Complete {
        /// Version of the archive that was installed from.
        version: Version,
        /// One entry per task, in planner order.
        tasks: Vec<TaskReport>,
    },
    /// Planning or fetching failed; no file of this bundle was touched.
    Failed {
        /// Why.
        error: BundleError,
        /// Tasks that were planned before the failure, if any.
        planned: Vec<InstallTask>,
    },
}

/// Result of synchronizing one bundle.
#[derive(Debug)]
pub struct BundleReport {
    /// Bundle name.
    pub bundle: BundleName,
    /// Terminal state.
    pub outcome: BundleOutcome,
}

impl BundleReport {
    /// Number of files written.
    pub fn installed_count(&self) -> usize {
        match &self.outcome {
            BundleOutcome::Complete { tasks, .. } => tasks.iter().filter(|t| t.is_ok()).count(),
            _ => 0,
        }
    }

    /// Tasks that were attempted and failed.
    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskReport> {
        let tasks: &[TaskReport] = match &self.outcome {
            BundleOutcome::Complete { tasks, .. } => tasks,
            _ => &[],
        };
        tasks.iter().filter(|t| !t.is_ok())
    }

    /// Whether the bundle as a whole failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, BundleOutcome::Failed { .. })
    }
}

/// Result of a whole run.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// One entry per bundle, in configuration order.
    pub bundles: Vec<BundleReport>,
}

impl SyncReport {
    /// Files written across all bundles.
    pub fn installed_count(&self) -> usize {
        self.bundles.iter().map(BundleReport::installed_count).sum()
    }

    /// Bundles that failed to plan or fetch.
    pub fn failed_bundles(&self) -> impl Iterator<Item = &BundleReport> {
        self.bundles.iter().filter(|b| b.is_failed())
    }

    /// Tasks that failed across all bundles.
    pub fn failed_tasks(&self) -> impl Iterator<Item = &TaskReport> {
        self.bundles.iter().flat_map(BundleReport::failed_tasks)
    }

    /// Bundles that were already in sync.
    pub fn up_to_date_count(&self) -> usize {
        self.bundles
            .iter()
            .filter(|b| matches!(b.outcome, BundleOutcome::UpToDate))
            .count()
    }

    /// Whether the run counts as successful under `policy`.
    pub fn is_success(&self, policy: ExitPolicy) -> bool {
        match policy {
            ExitPolicy::Lenient => true,
            ExitPolicy::Strict => {
                self.failed_bundles().next().is_none() && self.failed_tasks().next().is_none()
            }
        }
    }
}

enum Step {
    Planning,
    Fetching(Vec<InstallTask>),
    Installing(Vec<InstallTask>, FetchedBundle),
}

/// Drives plan, fetch and install for every bundle of a configuration.
pub struct Synchronizer<'a> {
    root: &'a InstallRoot,
    fetcher: &'a dyn PackageFetcher,
    reporter: &'a dyn Reporter,
    dry_run: bool,
}

impl std::fmt::Debug for Synchronizer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("root", &self.root)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl<'a> Synchronizer<'a> {
    /// Create a synchronizer for the installation at `root`.
    pub fn new(
        root: &'a InstallRoot,
        fetcher: &'a dyn PackageFetcher,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            root,
            fetcher,
            reporter,
            dry_run: false,
        }
    }

    /// Only plan and report; never fetch or write.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Synchronize every bundle, in order.
    pub async fn run(&self, config: &Configuration) -> SyncReport {
        let mut report = SyncReport::default();
        for bundle in &config.bundles {
            report.bundles.push(self.sync_bundle(bundle).await);
        }
        report
    }

    /// Synchronize a single bundle. Never fails; the outcome carries errors.
    pub async fn sync_bundle(&self, bundle: &Bundle) -> BundleReport {
        let name = &bundle.name;
        self.reporter.bundle_started(name);

        let mut step = Step::Planning;
        let outcome = loop {
            step = match step {
                Step::Planning => match plan(bundle, self.root).await {
                    Ok(tasks) if tasks.is_empty() => {
                        info!(bundle = %name, "up to date");
                        self.reporter.bundle_up_to_date(name);
                        break BundleOutcome::UpToDate;
                    }
                    Ok(tasks) => {
                        info!(bundle = %name, tasks = tasks.len(), "update required");
                        self.reporter.bundle_planned(name, &tasks);
                        if self.dry_run {
                            break BundleOutcome::Pending { tasks };
                        }
                        Step::Fetching(tasks)
                    }
                    Err(e) => {
                        break self.fail(name, BundleError::from(e), Vec::new());
                    }
                },

                Step::Fetching(tasks) => {
                    self.reporter.fetching(name);
                    match self.fetcher.fetch(name, &self.root.cache_dir()).await {
                        Ok(fetched) => {
                            info!(bundle = %name, version = %fetched.version, "fetched");
                            self.reporter.fetched(name, &fetched.version);
                            Step::Installing(tasks, fetched)
                        }
                        Err(e) => break self.fail(name, BundleError::from(e), tasks),
                    }
                }

                Step::Installing(tasks, fetched) => {
                    let mut reports = Vec::with_capacity(tasks.len());
                    for task in tasks {
                        let result = install(&task, &fetched.dist_dir).await;
                        match &result {
                            Ok(()) => self.reporter.task_done(&task),
                            Err(e) => {
                                warn!(bundle = %name, file = %task.display_path(), "{e}");
                                self.reporter.task_failed(&task, &e.to_string());
                            }
                        }
                        reports.push(TaskReport { task, result });
                    }
                    break BundleOutcome::Complete {
                        version: fetched.version,
                        tasks: reports,
                    };
                }
            };
        };

        BundleReport {
            bundle: name.clone(),
            outcome,
        }
    }

    fn fail(&self, name: &BundleName, error: BundleError, planned: Vec<InstallTask>) -> BundleOutcome {
        warn!(bundle = %name, "{error}");
        self.reporter.bundle_failed(name, &error.to_string());
        BundleOutcome::Failed { error, planned }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths;
    use crate::registry::RegistryError;
    use crate::reporter::NullReporter;
    use async_trait::async_trait;
    use luk3_schema::{Md5Digest, PackageFile, TargetName};
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::Mutex;

    // md5("hello world")
    const HELLO: &str = "5eb63bbbe01eeed093cb22bb8f5acdc3";
    // md5("a")
    const A: &str = "0cc175b9c0f1b6a831c399e269772661";

    /// Serves archives from memory and counts fetches per package.
    #[derive(Default)]
    struct FakeFetcher {
        archives: HashMap<String, Vec<(&'static str, &'static str)>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn with(mut self, package: &str, files: &[(&'static str, &'static str)]) -> Self {
            self.archives.insert(package.to_string(), files.to_vec());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PackageFetcher for FakeFetcher {
        async fn fetch(&self, package: &str, cache_dir: &Path) -> Result<FetchedBundle, FetchError> {
            self.calls.lock().unwrap().push(package.to_string());

            let Some(files) = self.archives.get(package) else {
                return Err(FetchError::RegistryUnreachable {
                    package: package.to_string(),
                    source: RegistryError::Status {
                        url: format!("https://registry.test/{package}"),
                        status: 404,
                    },
                });
            };

            let package_dir = paths::package_dir(cache_dir, package);
            let dist_dir = paths::dist_dir(&package_dir);
            std::fs::create_dir_all(&dist_dir).unwrap();
            for (name, data) in files {
                std::fs::write(dist_dir.join(name), data).unwrap();
            }

            Ok(FetchedBundle {
                name: package.to_string(),
                version: Version::from("1.0.0"),
                package_dir,
                dist_dir,
            })
        }
    }

    fn bundle(name: &str, targets: &[&str], files: &[(&str, &str)]) -> Bundle {
        Bundle {
            name: name.into(),
            targets: targets.iter().map(|t| TargetName::from(*t)).collect(),
            pak3ts: files
                .iter()
                .map(|(name, hash)| PackageFile {
                    name: (*name).to_string(),
                    hash: Md5Digest::new(*hash).unwrap(),
                })
                .collect(),
        }
    }

    fn installation(targets: &[&str]) -> (tempfile::TempDir, InstallRoot) {
        let dir = tempfile::tempdir().unwrap();
        for t in targets {
            std::fs::create_dir_all(dir.path().join(t)).unwrap();
        }
        let root = InstallRoot::new(dir.path());
        (dir, root)
    }

    fn config(bundles: Vec<Bundle>) -> Configuration {
        Configuration {
            version: "1".to_string(),
            bundles,
        }
    }

    #[tokio::test]
    async fn partially_installed_bundle_fetches_once_and_fills_the_gap() {
        let (dir, root) = installation(&["main", "mainta"]);
        std::fs::write(dir.path().join("main/a.pk3"), b"hello world").unwrap();

        let fetcher = FakeFetcher::default().with("skinpack-01", &[("a.pk3", "hello world")]);
        let sync = Synchronizer::new(&root, &fetcher, &NullReporter);

        let report = sync
            .sync_bundle(&bundle("skinpack-01", &["main", "mainta"], &[("a.pk3", HELLO)]))
            .await;

        assert_eq!(fetcher.calls(), ["skinpack-01"]);
        match &report.outcome {
            BundleOutcome::Complete { version, tasks } => {
                assert_eq!(*version, "1.0.0");
                assert_eq!(tasks.len(), 1);
                assert_eq!(tasks[0].task.display_path(), "mainta/a.pk3");
                assert!(tasks[0].is_ok());
            }
            other => panic!("expected Complete, got {other:?}"),
        }
        assert_eq!(
            std::fs::read(dir.path().join("mainta/a.pk3")).unwrap(),
            b"hello world"
        );
    }

    #[tokio::test]
    async fn fully_synced_bundle_is_never_fetched() {
        let (dir, root) = installation(&["main", "mainta"]);
        std::fs::write(dir.path().join("main/a.pk3"), b"hello world").unwrap();
        std::fs::write(dir.path().join("mainta/a.pk3"), b"hello world").unwrap();

        let fetcher = FakeFetcher::default();
        let sync = Synchronizer::new(&root, &fetcher, &NullReporter);
        let report = sync
            .sync_bundle(&bundle("skinpack-01", &["main", "mainta"], &[("a.pk3", HELLO)]))
            .await;

        assert!(matches!(report.outcome, BundleOutcome::UpToDate));
        assert!(fetcher.calls().is_empty());
        assert_eq!(report.installed_count(), 0);
    }

    #[tokio::test]
    async fn outdated_files_are_repaired() {
        let (dir, root) = installation(&["main"]);
        std::fs::write(dir.path().join("main/a.pk3"), b"stale").unwrap();

        let fetcher = FakeFetcher::default().with("skinpack-01", &[("a.pk3", "hello world")]);
        let sync = Synchronizer::new(&root, &fetcher, &NullReporter);
        let cfg = config(vec![bundle("skinpack-01", &["main"], &[("a.pk3", HELLO)])]);

        let first = sync.run(&cfg).await;
        assert_eq!(first.installed_count(), 1);

        let second = sync.run(&cfg).await;
        assert_eq!(second.up_to_date_count(), 1);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn fetch_failure_does_not_stop_the_next_bundle() {
        let (dir, root) = installation(&["main"]);

        let fetcher = FakeFetcher::default().with("b", &[("b.pk3", "a")]);
        let sync = Synchronizer::new(&root, &fetcher, &NullReporter);
        let report = sync
            .run(&config(vec![
                bundle("a", &["main"], &[("a.pk3", HELLO)]),
                bundle("b", &["main"], &[("b.pk3", A)]),
            ]))
            .await;

        assert_eq!(fetcher.calls(), ["a", "b"]);
        assert!(report.bundles[0].is_failed());
        match &report.bundles[0].outcome {
            BundleOutcome::Failed { error, planned } => {
                assert!(matches!(error, BundleError::Fetch(_)));
                assert_eq!(planned.len(), 1);
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert_eq!(report.installed_count(), 1);
        assert!(dir.path().join("main/b.pk3").exists());
        assert!(!dir.path().join("main/a.pk3").exists());

        assert!(report.is_success(ExitPolicy::Lenient));
        assert!(!report.is_success(ExitPolicy::Strict));
    }

    #[tokio::test]
    async fn file_missing_from_archive_fails_only_that_task() {
        let (dir, root) = installation(&["main"]);
        std::fs::write(dir.path().join("main/a.pk3"), b"old").unwrap();

        let fetcher = FakeFetcher::default().with("skinpack-01", &[("b.pk3", "a")]);
        let sync = Synchronizer::new(&root, &fetcher, &NullReporter);
        let report = sync
            .sync_bundle(&bundle(
                "skinpack-01",
                &["main"],
                &[("a.pk3", HELLO), ("b.pk3", A)],
            ))
            .await;

        let failed: Vec<_> = report.failed_tasks().collect();
        assert_eq!(failed.len(), 1);
        assert!(matches!(
            failed[0].result,
            Err(TaskError::NotFoundInArchive { .. })
        ));
        assert_eq!(report.installed_count(), 1);
        assert_eq!(std::fs::read(dir.path().join("main/a.pk3")).unwrap(), b"old");
        assert!(dir.path().join("main/b.pk3").exists());
    }

    #[tokio::test]
    async fn dry_run_plans_without_fetching() {
        let (dir, root) = installation(&["main"]);

        let fetcher = FakeFetcher::default().with("skinpack-01", &[("a.pk3", "hello world")]);
        let sync = Synchronizer::new(&root, &fetcher, &NullReporter).dry_run(true);
        let report = sync
            .sync_bundle(&bundle("skinpack-01", &["main"], &[("a.pk3", HELLO)]))
            .await;

        assert!(matches!(
            &report.outcome,
            BundleOutcome::Pending { tasks } if tasks.len() == 1
        ));
        assert!(fetcher.calls().is_empty());
        assert!(!dir.path().join("main/a.pk3").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn planning_error_fails_the_bundle_without_fetching() {
        let (dir, root) = installation(&["main"]);
        std::fs::create_dir(dir.path().join("main/a.pk3")).unwrap();

        let fetcher = FakeFetcher::default().with("skinpack-01", &[("a.pk3", "hello world")]);
        let sync = Synchronizer::new(&root, &fetcher, &NullReporter);
        let report = sync
            .sync_bundle(&bundle("skinpack-01", &["main"], &[("a.pk3", HELLO)]))
            .await;

        assert!(matches!(
            report.outcome,
            BundleOutcome::Failed {
                error: BundleError::Integrity(_),
                ..
            }
        ));
        assert!(fetcher.calls().is_empty());
    }

    #[test]
    fn empty_report_succeeds_under_any_policy() {
        let report = SyncReport::default();
        assert!(report.is_success(ExitPolicy::Lenient));
        assert!(report.is_success(ExitPolicy::Strict));
    }
}
