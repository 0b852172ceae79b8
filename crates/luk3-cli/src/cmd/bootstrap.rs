//! Bootstrap command: bring every managed package file in sync.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use luk3_core::registry::DEFAULT_TAG;
use luk3_core::setup::{
    ConfigSource, RELEASES_URL, check_for_update, check_marker, load_configuration, read_token,
};
use luk3_core::{
    ExitPolicy, InstallRoot, RegistryClient, RegistryOptions, Reporter, SyncReport, Synchronizer,
};
use luk3_schema::Version;
use tracing::debug;

use super::EXIT_SYNC_FAILURE;
use crate::BootstrapArgs;
use crate::ui::ConsoleReporter;
use crate::ui::theme::plural;

/// Everything a run needs, resolved once from the command line.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub root: InstallRoot,
    pub registry: RegistryOptions,
    pub config: ConfigSource,
    pub force: bool,
    pub dry_run: bool,
    pub policy: ExitPolicy,
}

impl SyncSettings {
    /// Resolve arguments against `cwd`. The token is filled in later, once
    /// the installation root is known to be valid.
    pub fn from_args(args: &BootstrapArgs, cwd: &Path) -> Self {
        let scope = args.scope.trim();
        Self {
            root: InstallRoot::resolve(&args.path, cwd),
            registry: RegistryOptions {
                registry: args.registry.clone(),
                scope: (!scope.is_empty()).then(|| scope.to_string()),
                token: None,
                prefer_offline: !args.online,
                tag: DEFAULT_TAG.to_string(),
            },
            config: args
                .config_file
                .as_ref()
                .map_or(ConfigSource::Registry, |file| {
                    ConfigSource::File(cwd.join(file))
                }),
            force: args.force,
            dry_run: args.dry_run,
            policy: if args.strict {
                ExitPolicy::Strict
            } else {
                ExitPolicy::Lenient
            },
        }
    }
}

/// Run the bootstrap.
///
/// Setup failures are returned as errors; bundle and file failures are
/// reported and only affect the exit code under `--strict`.
pub async fn bootstrap(args: &BootstrapArgs) -> Result<ExitCode> {
    let output = ConsoleReporter::new();
    let cwd = std::env::current_dir().context("Failed to determine current directory")?;
    let mut settings = SyncSettings::from_args(args, &cwd);
    debug!(?settings, "resolved settings");

    output.section(&format!("luk3 {}", crate::VERSION));
    output.info(&format!("Installation: {}", settings.root.path().display()));

    check_marker(&settings.root, settings.force)?;
    settings.registry.token = Some(read_token(&settings.root, args.token.as_deref())?);

    let client = RegistryClient::new(settings.registry.clone())
        .context("Failed to initialize registry client")?;

    if let Some(latest) = check_for_update(&client, &Version::from(crate::VERSION)).await {
        let (headline, download) = update_notice(&latest, crate::VERSION);
        output.warning(&headline);
        output.info(&download);
    }

    output.section("Configuration");
    let config = load_configuration(&settings.config, &client, &settings.root).await?;
    output.info(&format!(
        "Configuration {}: {}, {} managed",
        config.version,
        plural(config.bundles.len(), "bundle"),
        plural(config.managed_file_count(), "file")
    ));

    output.section("Bundles");
    let report = Synchronizer::new(&settings.root, &client, &output)
        .dry_run(settings.dry_run)
        .run(&config)
        .await;

    summarize(&output, &report, settings.dry_run);

    if report.is_success(settings.policy) {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_SYNC_FAILURE))
    }
}

fn update_notice(latest: &Version, running: &str) -> (String, String) {
    (
        format!("luk3 {latest} is available (running {running})"),
        format!("Download it from {RELEASES_URL}"),
    )
}

fn summarize(output: &ConsoleReporter, report: &SyncReport, dry_run: bool) {
    output.section("Summary");

    let failed_bundles = report.failed_bundles().count();
    let failed_tasks = report.failed_tasks().count();

    if dry_run {
        let pending: usize = report
            .bundles
            .iter()
            .map(|b| match &b.outcome {
                luk3_core::BundleOutcome::Pending { tasks } => tasks.len(),
                _ => 0,
            })
            .sum();
        output.info(&format!("Dry run: {} would be installed", plural(pending, "file")));
    } else {
        output.success(&format!(
            "{} installed, {} already up to date",
            plural(report.installed_count(), "file"),
            plural(report.up_to_date_count(), "bundle")
        ));
    }

    if failed_bundles > 0 {
        output.warning(&format!("{} could not be fetched", plural(failed_bundles, "bundle")));
    }
    if failed_tasks > 0 {
        output.warning(&format!("{} could not be installed", plural(failed_tasks, "file")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> BootstrapArgs {
        let mut full = vec!["luk3"];
        full.extend_from_slice(argv);
        crate::Cli::try_parse_from(full).unwrap().bootstrap
    }

    #[test]
    fn defaults_prefer_offline_and_lenient() {
        let settings = SyncSettings::from_args(
            &args(&["--registry", "https://r.test/", "--scope", "@a4t1"]),
            Path::new("/games"),
        );
        assert!(settings.registry.prefer_offline);
        assert_eq!(settings.policy, ExitPolicy::Lenient);
        assert_eq!(settings.config, ConfigSource::Registry);
        assert_eq!(settings.registry.scope.as_deref(), Some("@a4t1"));
        assert_eq!(settings.root.path(), Path::new("/games/."));
    }

    #[test]
    fn update_notice_points_at_releases() {
        let (headline, download) = update_notice(&Version::from("0.3.0"), "0.2.1");
        assert_eq!(headline, "luk3 0.3.0 is available (running 0.2.1)");
        assert_eq!(
            download,
            "Download it from https://github.com/a4t1/luk3/releases"
        );
    }

    #[test]
    fn flags_map_onto_settings() {
        let settings = SyncSettings::from_args(
            &args(&[
                "--online",
                "--strict",
                "--dry-run",
                "--scope",
                "",
                "--config-file",
                "conf.json",
            ]),
            Path::new("/games"),
        );
        assert!(!settings.registry.prefer_offline);
        assert_eq!(settings.policy, ExitPolicy::Strict);
        assert!(settings.dry_run);
        assert_eq!(settings.registry.scope, None);
        assert_eq!(
            settings.config,
            ConfigSource::File(Path::new("/games/conf.json").to_path_buf())
        );
    }
}
