//! Export job execution.
//!
//! Walks an acquisition plan, stages every item into a scratch tree, packages
//! the tree into the output archive and cleans up. A job runs on its own
//! worker thread and reports through an event channel; cancellation is a
//! shared flag polled at safe points, so an in-flight item always completes
//! before the job winds down.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::application::planner::build_plan;
use crate::application::resolver::CategoryResolver;
use crate::domain::{AcquisitionPlan, AppError, ExportError, JOURNAL_APP_MARKER};
use crate::infrastructure::{ArchiveBackend, FileLocator, LogCatalog, LogTransfer};

/// Fixed share of the progress total reserved for the archiving phase.
pub const ARCHIVE_WEIGHT: usize = 10;

/// Progress bump emitted once the archive has been written; together with the
/// per-item increments this lands a complete run exactly on the total.
const ARCHIVE_DONE_BUMP: usize = 9;

/// Signals emitted by a running export job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportEvent {
    /// Total progress units, emitted once before staging starts.
    TotalItems(usize),
    /// Monotonically increasing current progress.
    Progress(usize),
    /// Terminal signal; `true` only for a complete, un-canceled export.
    Finished(bool),
}

/// Executes export jobs against injected collaborators.
#[derive(Clone)]
pub struct Exporter {
    locator: Arc<dyn FileLocator>,
    catalog: Arc<dyn LogCatalog>,
    transfer: Arc<dyn LogTransfer>,
    archiver: Arc<dyn ArchiveBackend>,
    staging_dir: PathBuf,
    journal_supported: bool,
}

/// Caller-side handle for a started job.
pub struct ExportHandle {
    cancel_flag: Arc<AtomicBool>,
    events: Receiver<ExportEvent>,
    worker: JoinHandle<bool>,
}

impl ExportHandle {
    /// Request cancellation; observed at the next polling point.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::SeqCst);
    }

    /// Event stream of the running job.
    #[must_use]
    pub const fn events(&self) -> &Receiver<ExportEvent> {
        &self.events
    }

    /// Block until the job finishes and return its success bit.
    #[must_use]
    pub fn wait(self) -> bool {
        self.worker.join().unwrap_or(false)
    }
}

impl Exporter {
    /// Assemble an exporter from its collaborators.
    #[must_use]
    pub fn new(
        locator: Arc<dyn FileLocator>,
        catalog: Arc<dyn LogCatalog>,
        transfer: Arc<dyn LogTransfer>,
        archiver: Arc<dyn ArchiveBackend>,
        staging_dir: PathBuf,
        journal_supported: bool,
    ) -> Self {
        Self {
            locator,
            catalog,
            transfer,
            archiver,
            staging_dir,
            journal_supported,
        }
    }

    /// Start an export job on a dedicated worker thread.
    #[must_use]
    pub fn start(&self, tokens: Vec<String>, output: PathBuf) -> ExportHandle {
        let cancel_flag = Arc::new(AtomicBool::new(false));
        let (tx, events) = mpsc::channel();

        let exporter = self.clone();
        let flag = Arc::clone(&cancel_flag);
        let worker = std::thread::spawn(move || {
            let emit_tx = tx.clone();
            let emit = move |event| {
                let _ = emit_tx.send(event);
            };

            let success = match exporter.run(&tokens, &output, &flag, &emit) {
                Ok(()) => true,
                Err(error) => {
                    tracing::error!(error = %error, "Export failed");
                    false
                }
            };
            let _ = tx.send(ExportEvent::Finished(success));
            success
        });

        ExportHandle {
            cancel_flag,
            events,
            worker,
        }
    }

    /// Run an export job to completion on the calling thread.
    ///
    /// # Errors
    /// Returns the fatal `ExportError` that ended the job; item-level
    /// acquisition failures are logged and skipped instead.
    pub fn run(
        &self,
        tokens: &[String],
        output: &Path,
        cancel: &AtomicBool,
        emit: &dyn Fn(ExportEvent),
    ) -> Result<(), ExportError> {
        tracing::info!(output = %output.display(), "Starting export");

        // Checked before any scratch state exists.
        let parent = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !dir_writable(&parent) {
            return Err(ExportError::OutputUnwritable(output.to_path_buf()));
        }

        let resolver =
            CategoryResolver::new(&*self.locator, &*self.catalog, self.journal_supported);
        let plan = build_plan(&resolver, tokens, cancel)?;

        if output.exists() && fs::remove_file(output).is_err() {
            return Err(ExportError::OutputCollision(output.to_path_buf()));
        }

        let total = plan.item_count() + ARCHIVE_WEIGHT;
        emit(ExportEvent::TotalItems(total));
        let mut current = 1usize;

        let _ = fs::remove_dir_all(&self.staging_dir);
        fs::create_dir_all(&self.staging_dir).map_err(|e| {
            ExportError::ArchiveFailure(AppError::io("Failed to create staging directory", e))
        })?;

        self.stage(&plan, cancel, emit, &mut current);

        let canceled = cancel.load(Ordering::SeqCst);
        let archive_result = if canceled {
            Ok(())
        } else {
            let result = self.archive_step(output);
            current += ARCHIVE_DONE_BUMP;
            emit(ExportEvent::Progress(current));
            result
        };

        // The scratch tree goes away no matter how the job ended.
        let _ = fs::remove_dir_all(&self.staging_dir);

        if canceled {
            if output.exists() {
                let _ = fs::remove_file(output);
            }
            return Err(ExportError::Canceled);
        }

        archive_result?;
        if output.exists() {
            tracing::info!(output = %output.display(), "Export complete");
            Ok(())
        } else {
            Err(ExportError::ArchiveFailure(AppError::Config {
                message: format!("Archive missing at {}", output.display()),
            }))
        }
    }

    /// Stage every bucket; stops at the next safe boundary once the
    /// cancellation flag is observed.
    fn stage(
        &self,
        plan: &AcquisitionPlan,
        cancel: &AtomicBool,
        emit: &dyn Fn(ExportEvent),
        current: &mut usize,
    ) {
        'staging: for bucket in &plan.buckets {
            let category_dir = self.staging_dir.join(&bucket.category);
            if let Err(error) = fs::create_dir_all(&category_dir) {
                tracing::warn!(
                    category = bucket.category.as_str(),
                    error = %error,
                    "Failed to create category directory"
                );
            }

            for file in &bucket.files {
                if cancel.load(Ordering::SeqCst) {
                    break 'staging;
                }
                self.transfer_item(&category_dir, &file.to_string_lossy(), true);
                advance(emit, current);
            }

            for (group, paths) in &bucket.groups {
                if cancel.load(Ordering::SeqCst) {
                    break 'staging;
                }
                if paths.is_empty() {
                    continue;
                }
                let group_dir = category_dir.join(group);
                if let Err(error) = fs::create_dir_all(&group_dir) {
                    tracing::warn!(group = group.as_str(), error = %error, "Failed to create group directory");
                }
                for path in paths {
                    if cancel.load(Ordering::SeqCst) {
                        break 'staging;
                    }
                    let source = path.to_string_lossy();
                    // Journal markers produce fresh files; nothing to preserve.
                    let preserve = source != JOURNAL_APP_MARKER;
                    self.transfer_item(&group_dir, &source, preserve);
                    advance(emit, current);
                }
            }

            for command in &bucket.commands {
                if cancel.load(Ordering::SeqCst) {
                    break 'staging;
                }
                self.transfer_item(&category_dir, command, false);
                advance(emit, current);
            }
        }
    }

    /// One item transfer; failures are logged and skipped.
    fn transfer_item(&self, dest_dir: &Path, source: &str, preserve_permissions: bool) {
        if let Err(error) = self
            .transfer
            .export_item(dest_dir, source, preserve_permissions)
        {
            tracing::warn!(source = source, error = %error, "Skipping acquisition item");
        }
    }

    /// Package the staging tree and open up the result for the consumer,
    /// who may run with fewer privileges than this process.
    fn archive_step(&self, output: &Path) -> Result<(), ExportError> {
        self.archiver.archive(&self.staging_dir, output)?;
        if let Err(error) = fs::set_permissions(output, fs::Permissions::from_mode(0o666)) {
            tracing::warn!(error = %error, "Failed to normalize archive permissions");
        }
        Ok(())
    }
}

/// Emit the current progress value, then advance it.
fn advance(emit: &dyn Fn(ExportEvent), current: &mut usize) {
    emit(ExportEvent::Progress(*current));
    *current += 1;
}

/// Whether a directory accepts new files, verified with a probe file.
fn dir_writable(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    let probe = dir.join(format!(".logbundle-probe-{}", std::process::id()));
    match fs::write(&probe, b"") {
        Ok(()) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AppLogConfig, Result as AppResult, CMD_JOURNAL_SYSTEM};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct FakeLocator {
        responses: HashMap<String, Vec<PathBuf>>,
    }

    impl FileLocator for FakeLocator {
        fn locate(&self, subsystem_or_path: &str, _recursive: bool) -> Vec<PathBuf> {
            self.responses
                .get(subsystem_or_path)
                .cloned()
                .unwrap_or_default()
        }
    }

    struct FakeCatalog {
        applications: Vec<(String, PathBuf)>,
        app_configs: HashMap<String, AppLogConfig>,
    }

    impl FakeCatalog {
        fn empty() -> Self {
            Self {
                applications: Vec::new(),
                app_configs: HashMap::new(),
            }
        }

        fn journal_app() -> Self {
            Self {
                applications: vec![("Editor".into(), PathBuf::from("/usr/bin/editor"))],
                app_configs: HashMap::from([(
                    "editor".to_string(),
                    AppLogConfig {
                        log_type: "journal".into(),
                    },
                )]),
            }
        }
    }

    impl LogCatalog for FakeCatalog {
        fn applications(&self) -> Vec<(String, PathBuf)> {
            self.applications.clone()
        }
        fn app_config(&self, app_name: &str) -> Option<AppLogConfig> {
            self.app_configs.get(app_name).cloned()
        }
        fn other_logs(&self) -> Vec<(String, String)> {
            Vec::new()
        }
        fn custom_logs(&self) -> Vec<(String, PathBuf)> {
            Vec::new()
        }
    }

    /// Records every transfer; optionally trips the cancellation flag after
    /// a fixed number of calls.
    struct RecordingTransfer {
        calls: Mutex<Vec<(PathBuf, String, bool)>>,
        cancel_after: Option<(usize, Arc<AtomicBool>)>,
    }

    impl RecordingTransfer {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                cancel_after: None,
            }
        }

        fn canceling_after(count: usize, flag: Arc<AtomicBool>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                cancel_after: Some((count, flag)),
            }
        }

        fn calls(&self) -> Vec<(PathBuf, String, bool)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl LogTransfer for RecordingTransfer {
        fn export_item(
            &self,
            dest_dir: &Path,
            source: &str,
            preserve_permissions: bool,
        ) -> AppResult<()> {
            let mut calls = self.calls.lock().unwrap();
            calls.push((dest_dir.to_path_buf(), source.to_string(), preserve_permissions));
            if let Some((count, flag)) = &self.cancel_after {
                if calls.len() >= *count {
                    flag.store(true, Ordering::SeqCst);
                }
            }
            Ok(())
        }
    }

    /// Writes a marker byte to the output path, or refuses to.
    struct FakeArchiver {
        succeed: bool,
    }

    impl ArchiveBackend for FakeArchiver {
        fn archive(&self, _source_dir: &Path, output: &Path) -> AppResult<()> {
            if self.succeed {
                fs::write(output, b"archive").map_err(|e| AppError::io("write", e))
            } else {
                Err(AppError::Config {
                    message: "refused".into(),
                })
            }
        }
    }

    struct Fixture {
        exporter: Exporter,
        transfer: Arc<RecordingTransfer>,
        staging: PathBuf,
        _dir: tempfile::TempDir,
        output: PathBuf,
    }

    fn fixture(
        locator: FakeLocator,
        catalog: FakeCatalog,
        transfer: RecordingTransfer,
        archiver_succeeds: bool,
    ) -> Fixture {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("staging");
        let output = dir.path().join("out/bundle.zip");
        fs::create_dir_all(output.parent().unwrap()).unwrap();

        let transfer = Arc::new(transfer);
        let exporter = Exporter::new(
            Arc::new(locator),
            Arc::new(catalog),
            Arc::clone(&transfer) as Arc<dyn LogTransfer>,
            Arc::new(FakeArchiver {
                succeed: archiver_succeeds,
            }),
            staging.clone(),
            true,
        );

        Fixture {
            exporter,
            transfer,
            staging,
            _dir: dir,
            output,
        }
    }

    fn dpkg_locator() -> FakeLocator {
        FakeLocator {
            responses: HashMap::from([(
                "dpkg".to_string(),
                vec![
                    PathBuf::from("/var/log/dpkg.log"),
                    PathBuf::from("/var/log/dpkg.log.1"),
                ],
            )]),
        }
    }

    fn collect_events() -> (mpsc::Sender<ExportEvent>, mpsc::Receiver<ExportEvent>) {
        mpsc::channel()
    }

    #[test]
    fn test_full_export_stages_archives_and_cleans_up() {
        let fx = fixture(dpkg_locator(), FakeCatalog::empty(), RecordingTransfer::new(), true);
        let (tx, rx) = collect_events();

        let tokens = vec!["system".to_string(), "dpkg".to_string()];
        let result = fx.exporter.run(
            &tokens,
            &fx.output,
            &AtomicBool::new(false),
            &move |e| {
                let _ = tx.send(e);
            },
        );

        assert!(result.is_ok());
        assert!(fx.output.is_file());
        assert!(!fx.staging.exists());

        // system command, then the two dpkg files.
        let calls = fx.transfer.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].0, fx.staging.join("system"));
        assert_eq!(calls[0].1, CMD_JOURNAL_SYSTEM);
        assert!(!calls[0].2);
        assert_eq!(calls[1].0, fx.staging.join("dpkg"));
        assert!(calls[1].2);

        let events: Vec<ExportEvent> = rx.try_iter().collect();
        assert_eq!(events[0], ExportEvent::TotalItems(3 + ARCHIVE_WEIGHT));
        let progress: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                ExportEvent::Progress(value) => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2, 3, 13]);
        assert!(progress.windows(2).all(|w| w[0] <= w[1]));
        assert!(progress.iter().all(|p| *p <= 3 + ARCHIVE_WEIGHT));
    }

    #[test]
    fn test_journal_fallback_scenario_counts_marker_as_item() {
        // Tokens ["system", "apps"], no files on disk for the application,
        // journal parsing declared: the apps bucket carries one marker group
        // and the total is 2 items + the archive weight.
        let locator = FakeLocator {
            responses: HashMap::new(),
        };
        let fx = fixture(locator, FakeCatalog::journal_app(), RecordingTransfer::new(), true);
        let (tx, rx) = collect_events();

        let tokens = vec!["system".to_string(), "apps".to_string()];
        let result = fx.exporter.run(
            &tokens,
            &fx.output,
            &AtomicBool::new(false),
            &move |e| {
                let _ = tx.send(e);
            },
        );

        assert!(result.is_ok());
        let events: Vec<ExportEvent> = rx.try_iter().collect();
        assert_eq!(events[0], ExportEvent::TotalItems(2 + ARCHIVE_WEIGHT));

        let calls = fx.transfer.calls();
        let marker = calls
            .iter()
            .find(|(_, source, _)| source == JOURNAL_APP_MARKER)
            .unwrap();
        assert_eq!(marker.0, fx.staging.join("apps/editor"));
        assert!(!marker.2, "journal marker must not preserve permissions");
    }

    #[test]
    fn test_cancellation_stops_staging_and_removes_output() {
        let cancel = Arc::new(AtomicBool::new(false));
        let fx = fixture(
            dpkg_locator(),
            FakeCatalog::empty(),
            RecordingTransfer::canceling_after(1, Arc::clone(&cancel)),
            true,
        );

        let tokens = vec!["dpkg".to_string(), "system".to_string()];
        let result = fx
            .exporter
            .run(&tokens, &fx.output, &cancel, &|_| {});

        assert!(matches!(result, Err(ExportError::Canceled)));
        assert!(!fx.output.exists());
        assert!(!fx.staging.exists());
        // First dpkg file completed, everything after the flag was skipped.
        assert_eq!(fx.transfer.calls().len(), 1);
    }

    #[test]
    fn test_unwritable_output_short_circuits_before_staging() {
        let fx = fixture(dpkg_locator(), FakeCatalog::empty(), RecordingTransfer::new(), true);
        let missing_parent = fx.output.parent().unwrap().join("missing/bundle.zip");

        let result = fx.exporter.run(
            &["dpkg".to_string()],
            &missing_parent,
            &AtomicBool::new(false),
            &|_| {},
        );

        assert!(matches!(result, Err(ExportError::OutputUnwritable(_))));
        assert!(!fx.staging.exists());
        assert!(fx.transfer.calls().is_empty());
    }

    #[test]
    fn test_empty_token_list_fails_without_archiving() {
        let fx = fixture(dpkg_locator(), FakeCatalog::empty(), RecordingTransfer::new(), true);

        let result = fx
            .exporter
            .run(&[], &fx.output, &AtomicBool::new(false), &|_| {});

        assert!(matches!(result, Err(ExportError::EmptyPlan)));
        assert!(!fx.output.exists());
        assert!(!fx.staging.exists());
    }

    #[test]
    fn test_archiver_failure_is_fatal_but_still_cleans_up() {
        let fx = fixture(dpkg_locator(), FakeCatalog::empty(), RecordingTransfer::new(), false);

        let result = fx.exporter.run(
            &["dpkg".to_string()],
            &fx.output,
            &AtomicBool::new(false),
            &|_| {},
        );

        assert!(matches!(result, Err(ExportError::ArchiveFailure(_))));
        assert!(!fx.output.exists());
        assert!(!fx.staging.exists());
    }

    #[test]
    fn test_existing_output_file_is_replaced() {
        let fx = fixture(dpkg_locator(), FakeCatalog::empty(), RecordingTransfer::new(), true);
        fs::write(&fx.output, b"stale").unwrap();

        let result = fx.exporter.run(
            &["dpkg".to_string()],
            &fx.output,
            &AtomicBool::new(false),
            &|_| {},
        );

        assert!(result.is_ok());
        assert_eq!(fs::read(&fx.output).unwrap(), b"archive");
    }

    /// Blocks each transfer until the test releases it, so cancellation can
    /// be requested at a known point of a running job.
    struct GatedTransfer {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl LogTransfer for GatedTransfer {
        fn export_item(
            &self,
            _dest_dir: &Path,
            _source: &str,
            _preserve_permissions: bool,
        ) -> AppResult<()> {
            let _ = self.gate.lock().unwrap().recv();
            Ok(())
        }
    }

    #[test]
    fn test_handle_cancel_reports_finished_false_and_removes_output() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("staging");
        let output = dir.path().join("bundle.zip");

        let (release, gate) = mpsc::channel();
        let exporter = Exporter::new(
            Arc::new(dpkg_locator()),
            Arc::new(FakeCatalog::empty()),
            Arc::new(GatedTransfer {
                gate: Mutex::new(gate),
            }),
            Arc::new(FakeArchiver { succeed: true }),
            staging.clone(),
            true,
        );

        let handle = exporter.start(vec!["dpkg".to_string()], output.clone());

        // First item is in flight; cancel, then let it complete.
        handle.cancel();
        let _ = release.send(());
        drop(release);

        let mut finished = None;
        while let Ok(event) = handle.events().recv() {
            if let ExportEvent::Finished(success) = event {
                finished = Some(success);
                break;
            }
        }

        assert_eq!(finished, Some(false));
        assert!(!handle.wait());
        assert!(!output.exists());
        assert!(!staging.exists());
    }

    #[test]
    fn test_started_job_emits_finished_and_wait_reports_success() {
        let fx = fixture(dpkg_locator(), FakeCatalog::empty(), RecordingTransfer::new(), true);

        let handle = fx
            .exporter
            .start(vec!["dpkg".to_string()], fx.output.clone());

        let mut finished = None;
        while let Ok(event) = handle.events().recv() {
            if let ExportEvent::Finished(success) = event {
                finished = Some(success);
                break;
            }
        }

        assert_eq!(finished, Some(true));
        assert!(handle.wait());
        assert!(fx.output.is_file());
    }
}
