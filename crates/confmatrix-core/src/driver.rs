//! Top-level matrix sequencing.
//!
//! Entries run strictly one at a time: every entry mutates the same build
//! state, so there is no isolation between variants and no concurrency. The
//! first failure at any stage aborts the remaining entries, and nothing is
//! cleaned up afterwards so the operator can inspect the failed state.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::builder::{ArtifactHandle, BuildContext, VariantBuilder};
use crate::capability::CapabilityProber;
use crate::envprobe::EnvironmentProfile;
use crate::error::{MatrixError, MatrixResult};
use crate::exec::CommandExecutor;
use crate::layout::ProjectLayout;
use crate::matrix::{plan_digest, BuildPlacement, MatrixEntry, MatrixPhase};
use crate::report::Reporter;
use crate::suites::{SkipNote, SuiteDispatcher};

/// Process-wide counters for one orchestration run. Threaded explicitly
/// through the stages instead of living in ambient state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunState {
    /// Index of the entry being processed (1-based).
    pub index: usize,

    /// Total entry count across all phases.
    pub total: usize,

    /// Memory-check wrapper, present only while a memory-check entry runs.
    pub memcheck_prefix: Option<Vec<String>>,

    /// Skip reasons accumulated for the current variant.
    pub skip_notes: Vec<SkipNote>,
}

/// Sequences the whole configuration matrix.
pub struct MatrixDriver {
    exec: Arc<dyn CommandExecutor>,
    layout: ProjectLayout,
    source_root: PathBuf,
    reporter: Reporter,
    state: RunState,
}

impl MatrixDriver {
    pub fn new(
        exec: Arc<dyn CommandExecutor>,
        layout: ProjectLayout,
        source_root: PathBuf,
        reporter: Reporter,
    ) -> Self {
        Self {
            exec,
            layout,
            source_root,
            reporter,
            state: RunState::default(),
        }
    }

    /// Terminal run state; after a failed run it still points at the entry
    /// that failed.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Run every entry of the plan in order, stopping at the first failure.
    pub async fn run(
        &mut self,
        phases: &[MatrixPhase],
        env: &EnvironmentProfile,
    ) -> MatrixResult<()> {
        let total: usize = phases.iter().map(|p| p.entries.len()).sum();
        let digest = plan_digest(phases);
        info!(total, digest = %&digest[..12], "starting configuration matrix");

        self.state = RunState {
            total,
            ..RunState::default()
        };

        let builder = VariantBuilder::new(self.exec.clone(), self.layout.clone());
        let prober = CapabilityProber::new(self.exec.clone());
        let dispatcher = SuiteDispatcher::new(self.exec.clone(), self.layout.clone());

        let mut index = 0usize;
        for phase in phases {
            if phase.distclean_before {
                let result = builder.distclean(&self.source_root).await;
                if let Err(e) = result {
                    self.reporter.failure(&e);
                    return Err(e);
                }
            }

            for entry in &phase.entries {
                index += 1;
                self.state.index = index;
                self.state.memcheck_prefix = entry
                    .memcheck
                    .then(|| self.layout.memcheck_prefix.clone());
                self.state.skip_notes.clear();

                let result = self
                    .run_entry(entry, env, index, total, &builder, &prober, &dispatcher)
                    .await;
                if let Err(e) = result {
                    self.reporter.failure(&e);
                    return Err(e);
                }
            }
        }

        self.reporter.completed(total);
        Ok(())
    }

    async fn run_entry(
        &mut self,
        entry: &MatrixEntry,
        env: &EnvironmentProfile,
        index: usize,
        total: usize,
        builder: &VariantBuilder,
        prober: &CapabilityProber,
        dispatcher: &SuiteDispatcher,
    ) -> MatrixResult<()> {
        self.reporter.configuring(index, total, &entry.flags);

        let work_dir = match entry.placement {
            BuildPlacement::InTree => self.source_root.clone(),
            BuildPlacement::OutOfTree => self.prepare_out_of_tree()?,
        };

        let mut cflags = env.warning_flags.clone();
        cflags.extend(entry.cflags.iter().cloned());

        let ctx = BuildContext {
            source_root: self.source_root.clone(),
            work_dir: work_dir.clone(),
            flags: entry.flags.clone(),
            cflags,
            ldflags: entry.ldflags.clone(),
        };

        let artifact = builder.build(&ctx, &self.reporter).await?;

        if self.reporter.verbose() {
            let report = prober.report(&artifact).await?;
            self.reporter.capability_dump(&report);
        }

        let profile = prober.probe(&artifact).await?;
        let memcheck_prefix = self.state.memcheck_prefix.clone();
        let dispatch = dispatcher
            .dispatch(
                &profile,
                &artifact.work_dir,
                memcheck_prefix.as_deref(),
                &self.reporter,
            )
            .await?;
        self.state.skip_notes = dispatch.skips.clone();

        if let Some(failure) = dispatch.first_failure() {
            return Err(MatrixError::Suite {
                suite: failure.suite.clone(),
                code: failure.output.exit_code,
                output: failure.output.clone(),
            });
        }

        if entry.placement == BuildPlacement::OutOfTree {
            // Only a fully successful out-of-tree entry earns cleanup.
            self.remove_out_of_tree(&artifact)?;
        }

        Ok(())
    }

    /// Create the out-of-tree build directory afresh. A pre-existing
    /// non-directory at the path is a fatal setup error.
    fn prepare_out_of_tree(&self) -> MatrixResult<PathBuf> {
        let dir = &self.layout.out_of_tree_dir;
        if dir.exists() {
            if !dir.is_dir() {
                return Err(MatrixError::Setup {
                    reason: format!("{} exists and is not a directory", dir.display()),
                });
            }
            std::fs::remove_dir_all(dir)?;
        }
        std::fs::create_dir_all(dir)?;
        info!(dir = %dir.display(), "out-of-tree build directory created");
        Ok(dir.clone())
    }

    fn remove_out_of_tree(&self, artifact: &ArtifactHandle) -> MatrixResult<()> {
        std::fs::remove_dir_all(&artifact.work_dir)?;
        info!(dir = %artifact.work_dir.display(), "out-of-tree build directory removed");
        Ok(())
    }
}
