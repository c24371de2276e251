//! Render dispatcher.
//!
//! Runs the cache check and the rendering engine for every entry on a
//! bounded pool of scoped worker threads. Outcomes flow through a channel to
//! the calling thread, which is the only place they are aggregated; they
//! arrive in completion order, not inventory order.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crossbeam_channel::unbounded;
use shipsheet_core::{
    CancelToken, EngineFailure, ModelEntry, OrientationStore, RenderEngine, RenderOutcome,
    RenderRequest, RenderStatus, SizeTable,
};

use crate::cache::{self, CacheDecision};

/// Default square output resolution in pixels.
pub const DEFAULT_RESOLUTION: u32 = 512;

/// Per-run render settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSettings {
    /// Square output resolution in pixels.
    pub resolution: u32,
    /// Number of concurrent engine invocations.
    pub jobs: usize,
    /// Re-render entries whose output already exists.
    pub force: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            jobs: 1,
            force: false,
        }
    }
}

/// How far a dispatch run got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Entries that produced an outcome.
    pub processed: usize,
    /// Entries never picked up because the run was cancelled.
    pub not_attempted: usize,
    /// True when cancellation was requested during the run.
    pub cancelled: bool,
}

/// Drives a [`RenderEngine`] over an inventory.
pub struct Dispatcher<'a> {
    engine: &'a dyn RenderEngine,
    out_root: &'a Path,
    orientations: &'a OrientationStore,
    sizes: &'a SizeTable,
    settings: RenderSettings,
    cancel: CancelToken,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        engine: &'a dyn RenderEngine,
        out_root: &'a Path,
        orientations: &'a OrientationStore,
        sizes: &'a SizeTable,
        settings: RenderSettings,
    ) -> Self {
        Self {
            engine,
            out_root,
            orientations,
            sizes,
            settings,
            cancel: CancelToken::new(),
        }
    }

    /// Uses a shared cancellation token, typically wired to Ctrl-C.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Processes every entry, handing each outcome to `on_outcome` as soon
    /// as it is produced.
    ///
    /// Failures never stop the run. Cancellation stops workers from picking
    /// up new entries; in-flight engine calls are terminated by the engine.
    pub fn run<F>(&self, entries: &[ModelEntry], mut on_outcome: F) -> DispatchSummary
    where
        F: FnMut(RenderOutcome),
    {
        let workers = self.settings.jobs.max(1).min(entries.len().max(1));
        let next = AtomicUsize::new(0);
        let (tx, rx) = unbounded::<RenderOutcome>();
        let mut processed = 0;

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let next = &next;
                scope.spawn(move || loop {
                    if self.cancel.is_cancelled() {
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(entry) = entries.get(index) else {
                        break;
                    };
                    if tx.send(self.process(entry)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for outcome in rx.iter() {
                processed += 1;
                on_outcome(outcome);
            }
        });

        DispatchSummary {
            processed,
            not_attempted: entries.len() - processed,
            cancelled: self.cancel.is_cancelled(),
        }
    }

    /// Cache check, render and classification for one entry.
    pub fn process(&self, entry: &ModelEntry) -> RenderOutcome {
        let output_path = entry.output_path(self.out_root);
        if cache::check(&output_path, self.settings.force) == CacheDecision::AlreadyRendered {
            return RenderOutcome::skipped(entry.clone(), output_path);
        }

        let start = Instant::now();
        let outcome = |status: RenderStatus, detail: Option<String>| RenderOutcome {
            entry: entry.clone(),
            status,
            output_path: output_path.clone(),
            detail,
            duration: start.elapsed(),
        };

        if let Some(parent) = output_path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return outcome(
                    RenderStatus::FailedEngineError,
                    Some(format!("Failed to create {}: {}", parent.display(), e)),
                );
            }
        }

        let key = entry.key();
        let request = RenderRequest {
            key: &key,
            source_path: &entry.source_path,
            output_path: &output_path,
            resolution: self.settings.resolution,
            fill_ratio: self.sizes.fill_ratio_for(entry),
            directive: self.orientations.get(&key),
        };

        let previous = match PreviousOutput::set_aside(&output_path) {
            Ok(previous) => previous,
            Err(e) => {
                return outcome(
                    RenderStatus::FailedEngineError,
                    Some(format!("Failed to move aside {}: {}", output_path.display(), e)),
                );
            }
        };

        let result = self.engine.render(&request, &self.cancel);
        let (status, detail) = classify(result, &output_path);

        if status.is_failure() {
            discard_failed_output(&output_path);
        }
        if let Some(previous) = previous {
            previous.settle(status.is_failure());
        }
        outcome(status, detail)
    }
}

/// Classifies an engine result. Engine failure wins over the output check.
pub fn classify(
    result: Result<(), EngineFailure>,
    output_path: &Path,
) -> (RenderStatus, Option<String>) {
    match result {
        Err(EngineFailure::Timeout { timeout_secs }) => (
            RenderStatus::FailedTimeout,
            Some(format!("timed out after {} seconds", timeout_secs)),
        ),
        Err(failure) => (RenderStatus::FailedEngineError, Some(failure.to_string())),
        Ok(()) if cache::is_usable_output(output_path) => (RenderStatus::Rendered, None),
        Ok(()) => (
            RenderStatus::FailedEmptyOutput,
            Some("engine succeeded but wrote no image".to_string()),
        ),
    }
}

/// A usable sprite moved out of the way of a forced re-render.
///
/// The engine only ever sees an empty output path, so an invocation that
/// writes nothing cannot pass for a fresh render. The previous sprite comes
/// back if the render fails.
#[derive(Debug)]
struct PreviousOutput {
    original: PathBuf,
    backup: PathBuf,
}

impl PreviousOutput {
    fn set_aside(path: &Path) -> std::io::Result<Option<Self>> {
        if !cache::is_usable_output(path) {
            return Ok(None);
        }
        let Some(file_name) = path.file_name() else {
            return Ok(None);
        };
        let mut backup_name = std::ffi::OsString::from(".");
        backup_name.push(file_name);
        backup_name.push(".previous");
        let backup = path.with_file_name(backup_name);

        std::fs::rename(path, &backup)?;
        Ok(Some(Self {
            original: path.to_path_buf(),
            backup,
        }))
    }

    /// Restores the previous sprite after a failure, drops it otherwise.
    fn settle(self, failed: bool) {
        if failed {
            let _ = std::fs::rename(&self.backup, &self.original);
        } else {
            let _ = std::fs::remove_file(&self.backup);
        }
    }
}

/// Removes whatever a failed invocation left at `path`, so the next run
/// sees it as missing.
fn discard_failed_output(path: &Path) {
    if path.is_file() {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Writes a fixed payload, fails, or writes nothing, depending on the
    /// model name.
    struct ScriptedEngine {
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, f64, bool)>>,
    }

    impl ScriptedEngine {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl RenderEngine for ScriptedEngine {
        fn name(&self) -> &str {
            "scripted"
        }

        fn render(&self, request: &RenderRequest<'_>, _cancel: &CancelToken) -> Result<(), EngineFailure> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push((
                request.key.to_string(),
                request.fill_ratio,
                request.directive.is_some(),
            ));
            let name = request.source_path.file_stem().unwrap().to_string_lossy();
            match name.as_ref() {
                "broken" => {
                    std::fs::write(request.output_path, b"half").unwrap();
                    Err(EngineFailure::failed("exit status 1"))
                }
                "slow" => Err(EngineFailure::Timeout { timeout_secs: 1 }),
                "blank" => Ok(()),
                "zero" => {
                    std::fs::write(request.output_path, b"").unwrap();
                    Ok(())
                }
                _ => {
                    std::fs::write(request.output_path, b"\x89PNG sprite").unwrap();
                    Ok(())
                }
            }
        }
    }

    fn entries(root: &Path, relatives: &[&str]) -> Vec<ModelEntry> {
        relatives
            .iter()
            .map(|r| ModelEntry::from_relative(root, Path::new(r)).unwrap())
            .collect()
    }

    fn run_all(
        engine: &ScriptedEngine,
        out_root: &Path,
        entries: &[ModelEntry],
        settings: RenderSettings,
    ) -> (Vec<RenderOutcome>, DispatchSummary) {
        let orientations = OrientationStore::empty();
        let sizes = SizeTable::empty();
        let dispatcher = Dispatcher::new(engine, out_root, &orientations, &sizes, settings);
        let mut outcomes = Vec::new();
        let summary = dispatcher.run(entries, |o| outcomes.push(o));
        outcomes.sort_by(|a, b| a.entry.relative_path.cmp(&b.entry.relative_path));
        (outcomes, summary)
    }

    fn statuses(outcomes: &[RenderOutcome]) -> Vec<RenderStatus> {
        outcomes.iter().map(|o| o.status).collect()
    }

    #[test]
    fn test_classification() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sprites");
        let list = entries(
            Path::new("models"),
            &[
                "amarr/frigate/blank.stl",
                "amarr/frigate/broken.stl",
                "amarr/frigate/good.stl",
                "amarr/frigate/slow.stl",
                "amarr/frigate/zero.stl",
            ],
        );

        let engine = ScriptedEngine::new();
        let (outcomes, summary) = run_all(&engine, &out, &list, RenderSettings::default());

        assert_eq!(
            statuses(&outcomes),
            vec![
                RenderStatus::FailedEmptyOutput,
                RenderStatus::FailedEngineError,
                RenderStatus::Rendered,
                RenderStatus::FailedTimeout,
                RenderStatus::FailedEmptyOutput,
            ]
        );
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.not_attempted, 0);

        // Partial output of the failed engine call is gone, the good one stays.
        assert!(!out.join("amarr/frigate/broken.png").exists());
        assert!(!out.join("amarr/frigate/zero.png").exists());
        assert!(out.join("amarr/frigate/good.png").exists());
    }

    #[test]
    fn test_second_run_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sprites");
        let list = entries(Path::new("models"), &["a/x/one.stl", "a/y/two.stl", "b/three.stl"]);

        let engine = ScriptedEngine::new();
        run_all(&engine, &out, &list, RenderSettings::default());
        assert_eq!(engine.calls.load(Ordering::SeqCst), 3);

        let again = ScriptedEngine::new();
        let (outcomes, _) = run_all(&again, &out, &list, RenderSettings::default());
        assert_eq!(again.calls.load(Ordering::SeqCst), 0);
        assert!(outcomes.iter().all(|o| o.status == RenderStatus::SkippedExisting));
    }

    #[test]
    fn test_force_rerenders() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sprites");
        let list = entries(Path::new("models"), &["a/x/one.stl"]);
        let target = out.join("a/x/one.png");
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"old render").unwrap();

        let engine = ScriptedEngine::new();
        let settings = RenderSettings {
            force: true,
            ..Default::default()
        };
        let (outcomes, _) = run_all(&engine, &out, &list, settings);
        assert_eq!(statuses(&outcomes), vec![RenderStatus::Rendered]);
        assert_eq!(std::fs::read(&target).unwrap(), b"\x89PNG sprite");
    }

    #[test]
    fn test_parallel_workers_process_every_entry() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sprites");
        let names: Vec<String> = (0..40).map(|i| format!("g{}/c/ship{:02}.stl", i % 3, i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let list = entries(Path::new("models"), &refs);

        let engine = ScriptedEngine::new();
        let settings = RenderSettings {
            jobs: 4,
            ..Default::default()
        };
        let (outcomes, summary) = run_all(&engine, &out, &list, settings);
        assert_eq!(outcomes.len(), 40);
        assert_eq!(summary.processed, 40);
        assert!(outcomes.iter().all(|o| o.status == RenderStatus::Rendered));
    }

    #[test]
    fn test_cancelled_run_attempts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let list = entries(Path::new("models"), &["a/one.stl", "a/two.stl"]);
        let orientations = OrientationStore::empty();
        let sizes = SizeTable::empty();
        let engine = ScriptedEngine::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let dispatcher = Dispatcher::new(
            &engine,
            dir.path(),
            &orientations,
            &sizes,
            RenderSettings::default(),
        )
        .with_cancel(cancel);
        let summary = dispatcher.run(&list, |_| panic!("no outcome expected"));
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.not_attempted, 2);
        assert!(summary.cancelled);
    }

    #[test]
    fn test_request_carries_directive_and_fill_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let list = entries(Path::new("models"), &["amarr/frigate/punisher.stl", "amarr/titan/avatar.stl"]);
        let orientations =
            OrientationStore::from_json(r#"{ "amarr/frigate/punisher": { "flip": true } }"#).unwrap();
        let sizes = SizeTable::from_json(r#"{ "amarr/titan/avatar": 14000 }"#).unwrap();
        let engine = ScriptedEngine::new();

        let dispatcher = Dispatcher::new(
            &engine,
            dir.path(),
            &orientations,
            &sizes,
            RenderSettings::default(),
        );
        dispatcher.run(&list, |_| {});

        let mut seen = engine.seen.lock().unwrap().clone();
        seen.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(seen[0].0, "amarr/frigate/punisher");
        assert!(seen[0].2);
        assert_eq!(seen[1].0, "amarr/titan/avatar");
        assert!((seen[1].1 - 1.0).abs() < 1e-9);
        assert!(!seen[1].2);
    }

    fn write_previous(out: &Path, relative: &str) -> PathBuf {
        let target = out.join(relative);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(&target, b"old render").unwrap();
        target
    }

    fn leftovers(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_forced_render_writing_nothing_is_a_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sprites");
        let list = entries(Path::new("models"), &["a/x/blank.stl"]);
        let target = write_previous(&out, "a/x/blank.png");

        let engine = ScriptedEngine::new();
        let settings = RenderSettings {
            force: true,
            ..Default::default()
        };
        let (outcomes, _) = run_all(&engine, &out, &list, settings);
        assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
        assert_eq!(statuses(&outcomes), vec![RenderStatus::FailedEmptyOutput]);

        // The previous sprite is back and nothing else is left behind.
        assert_eq!(std::fs::read(&target).unwrap(), b"old render");
        assert_eq!(leftovers(&out.join("a/x")), vec!["blank.png"]);
    }

    #[test]
    fn test_failed_forced_render_restores_previous_sprite() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sprites");
        let list = entries(Path::new("models"), &["a/x/broken.stl"]);
        let target = write_previous(&out, "a/x/broken.png");

        let engine = ScriptedEngine::new();
        let settings = RenderSettings {
            force: true,
            ..Default::default()
        };
        let (outcomes, _) = run_all(&engine, &out, &list, settings);
        assert_eq!(statuses(&outcomes), vec![RenderStatus::FailedEngineError]);
        assert_eq!(std::fs::read(&target).unwrap(), b"old render");
        assert_eq!(leftovers(&out.join("a/x")), vec!["broken.png"]);
    }

    #[test]
    fn test_successful_forced_render_drops_previous_sprite() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sprites");
        let list = entries(Path::new("models"), &["a/x/one.stl"]);
        write_previous(&out, "a/x/one.png");

        let engine = ScriptedEngine::new();
        let settings = RenderSettings {
            force: true,
            ..Default::default()
        };
        run_all(&engine, &out, &list, settings);
        assert_eq!(leftovers(&out.join("a/x")), vec!["one.png"]);
    }
}
