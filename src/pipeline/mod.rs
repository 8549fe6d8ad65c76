//! File-staged hub identification run over a subject manifest

pub mod stages;

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use ndarray::Array2;
use rand::Rng;
use rayon::prelude::*;

use crate::cluster::{CommunityDetector, DetectorKind, InfomapDetector, LouvainDetector};
use crate::config::{Config, Threshold};
use crate::data::loaders::load_csv_matrix;
use crate::data::{ensure_unique_subjects, Subject};
use crate::error::{HubError, Result};
use crate::storage::formats::read_indices;
use crate::storage::{save_summary, ArtifactId, ArtifactStore, SubjectReport, SubjectStatus};
use crate::viz::{LabelTable, LabelWriter, Workbench};

pub use stages::{CentralityStage, ConnectivityStage, HubLabelStage, PartitionStage};

/// One step of the per-subject pipeline, reading and writing persisted artifacts
pub trait Stage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Files that must exist before the stage can run
    fn inputs(&self, ctx: &StageContext, subject: &Subject) -> Vec<PathBuf>;

    /// Artifacts the stage writes
    fn outputs(&self, ctx: &StageContext, subject: &Subject) -> Vec<ArtifactId>;

    fn run(&self, ctx: &StageContext, subject: &Subject) -> Result<()>;
}

/// Label writer together with the template labels it paints over
pub struct LabelSet {
    pub writer: Box<dyn LabelWriter>,
    pub template: LabelTable,
}

/// Everything a stage needs besides the subject itself
pub struct StageContext {
    pub config: Config,
    pub mask: Arc<Array2<f64>>,
    pub store: ArtifactStore,
    pub detector: Box<dyn CommunityDetector>,
    pub labels: Option<LabelSet>,
}

impl StageContext {
    /// Validate the configuration, load the shared mask and set up collaborators
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        log::info!("Loading distance mask: {}", config.distance_mask.display());
        let mask = Arc::new(load_csv_matrix(&config.distance_mask)?);

        let store = ArtifactStore::new(&config.output_dir);
        store.ensure_layout()?;

        let detector = build_detector(&config, &store);
        let labels = if config.skip_labels {
            None
        } else {
            let mut workbench = Workbench::new(config.wb_command.clone(), config.parcel_template.clone());
            workbench.launch_retries = config.launch_retries;
            workbench.launch_backoff = config.launch_backoff;
            log::info!("Exporting template labels: {}", config.parcel_template.display());
            let template = workbench.template_labels(store.root())?;
            Some(LabelSet {
                writer: Box::new(workbench),
                template,
            })
        };

        Ok(Self {
            config,
            mask,
            store,
            detector,
            labels,
        })
    }

    /// Seed for one detection call, in `1..=9999`.
    ///
    /// With a base seed configured the value depends only on the base, the
    /// subject and the threshold; otherwise a fresh random seed is drawn.
    pub fn detection_seed(&self, subject: &str, threshold: Threshold) -> u64 {
        match self.config.seed {
            Some(base) => {
                // FNV-1a over the subject ID and threshold slot
                let mut hash = 0xcbf2_9ce4_8422_2325 ^ base;
                for byte in subject.bytes().chain([threshold.index() as u8]) {
                    hash ^= u64::from(byte);
                    hash = hash.wrapping_mul(0x0100_0000_01b3);
                }
                hash % 9999 + 1
            }
            None => rand::thread_rng().gen_range(1..=9999),
        }
    }
}

fn build_detector(config: &Config, store: &ArtifactStore) -> Box<dyn CommunityDetector> {
    match config.detector {
        DetectorKind::Infomap => Box::new(InfomapDetector {
            binary: config.infomap_binary.clone(),
            network_dir: store.dir("pajek_files"),
            output_dir: store.dir("infomap_outputs"),
            timeout: config.detector_timeout,
            launch_retries: config.launch_retries,
            launch_backoff: config.launch_backoff,
        }),
        DetectorKind::Louvain => Box::new(LouvainDetector),
    }
}

/// Stages in execution order
pub fn default_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(ConnectivityStage),
        Box::new(PartitionStage),
        Box::new(CentralityStage),
        Box::new(HubLabelStage),
    ]
}

/// Run every stage for one subject.
///
/// With `resume` on, stages up to and including the last one whose outputs all
/// exist are skipped.
pub fn run_subject(ctx: &StageContext, stages: &[Box<dyn Stage>], subject: &Subject) -> Result<()> {
    let start = if ctx.config.resume {
        stages
            .iter()
            .rposition(|stage| {
                stage
                    .outputs(ctx, subject)
                    .iter()
                    .all(|id| ctx.store.exists(id))
            })
            .map_or(0, |done| done + 1)
    } else {
        0
    };

    for stage in &stages[..start] {
        log::info!(" -{}: {} already complete, skipping", subject.id, stage.name());
    }

    for stage in &stages[start..] {
        if let Some(missing) = stage
            .inputs(ctx, subject)
            .into_iter()
            .find(|path| !path.exists())
        {
            return Err(HubError::MissingInput(missing));
        }
        log::info!(" -{}: {}", subject.id, stage.name());
        stage.run(ctx, subject)?;
    }
    Ok(())
}

/// Identify hubs for every subject in the manifest.
///
/// Run-level problems (bad configuration, missing templates, duplicate
/// subjects) are returned as errors. A failing subject is logged and recorded
/// in the run summary while the others continue.
pub fn run_identification(config: Config, subjects: &[Subject]) -> Result<Vec<SubjectReport>> {
    ensure_unique_subjects(subjects)?;
    let ctx = StageContext::from_config(config)?;
    let stages = default_stages();

    let threads = ctx.config.worker_threads();
    let reports: Vec<SubjectReport> = if threads > 1 {
        log::info!("Processing {} subjects on {} threads", subjects.len(), threads);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| HubError::Config(format!("could not build thread pool: {e}")))?;
        pool.install(|| {
            subjects
                .par_iter()
                .map(|subject| process_subject(&ctx, &stages, subject))
                .collect()
        })
    } else {
        subjects
            .iter()
            .map(|subject| process_subject(&ctx, &stages, subject))
            .collect()
    };

    save_summary(&ctx.store, &ctx.config, &reports)?;

    if ctx.config.cleanup {
        ctx.store.cleanup_working_dirs();
        let exported = ctx.store.root().join(crate::viz::workbench::TEMPLATE_TABLE);
        if exported.exists() {
            if let Err(e) = fs::remove_file(&exported) {
                log::debug!("  -Could not remove {}: {}", exported.display(), e);
            }
        }
    }

    let failed = reports
        .iter()
        .filter(|r| r.status == SubjectStatus::Failed)
        .count();
    log::info!(
        "Hub identification complete: {} succeeded, {} failed",
        reports.len() - failed,
        failed
    );
    Ok(reports)
}

fn process_subject(ctx: &StageContext, stages: &[Box<dyn Stage>], subject: &Subject) -> SubjectReport {
    log::info!("Processing subject {}", subject.id);
    let started = Instant::now();

    let outcome = run_subject(ctx, stages, subject).and_then(|()| {
        read_indices(&ctx.store.path(&ArtifactId::HubIndices {
            subject: subject.id.clone(),
        }))
    });
    let seconds = started.elapsed().as_secs_f64();

    match outcome {
        Ok(hubs) => {
            log::info!("Subject {} done: {} hubs in {:.1}s", subject.id, hubs.len(), seconds);
            SubjectReport {
                subject: subject.id.clone(),
                status: SubjectStatus::Completed,
                hub_count: Some(hubs.len()),
                hubs,
                error: None,
                seconds,
            }
        }
        Err(e) => {
            log::error!("Subject {} failed: {}", subject.id, e);
            SubjectReport {
                subject: subject.id.clone(),
                status: SubjectStatus::Failed,
                hub_count: None,
                hubs: Vec::new(),
                error: Some(e.to_string()),
                seconds,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(dir: &std::path::Path, seed: Option<u64>) -> StageContext {
        let mut config = Config::new(
            dir.to_path_buf(),
            dir.join("mask.csv"),
            dir.join("parcels.dlabel.nii"),
        );
        config.seed = seed;
        StageContext {
            store: ArtifactStore::new(dir),
            config,
            mask: Arc::new(Array2::ones((3, 3))),
            detector: Box::new(LouvainDetector),
            labels: None,
        }
    }

    #[test]
    fn seeds_stay_in_range() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        for seed in [None, Some(0), Some(u64::MAX)] {
            let ctx = context(dir.path(), seed);
            for threshold in Threshold::all() {
                let value = ctx.detection_seed("sub01", threshold);
                assert!((1..=9999).contains(&value));
            }
        }
    }

    #[test]
    fn base_seed_is_reproducible_per_subject_and_threshold() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let ctx = context(dir.path(), Some(42));
        let first = Threshold::all().next().expect("sweep is not empty");

        assert_eq!(
            ctx.detection_seed("sub01", first),
            ctx.detection_seed("sub01", first)
        );
        let seeds: Vec<u64> = Threshold::all()
            .map(|t| ctx.detection_seed("sub01", t))
            .collect();
        assert!(seeds.iter().any(|&s| s != seeds[0]));
    }

    #[test]
    fn missing_timeseries_fails_only_that_subject() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let ctx = context(dir.path(), Some(1));
        ctx.store.ensure_layout().expect("layout should be created");
        let subject = Subject {
            id: "sub01".into(),
            timeseries: dir.path().join("missing.txt"),
        };

        let report = process_subject(&ctx, &default_stages(), &subject);
        assert_eq!(report.status, SubjectStatus::Failed);
        assert!(report
            .error
            .as_deref()
            .is_some_and(|e| e.contains("missing.txt")));
    }

    #[test]
    fn duplicate_subjects_abort_the_run() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let config = Config::new(
            dir.path().to_path_buf(),
            dir.path().join("mask.csv"),
            dir.path().join("parcels.dlabel.nii"),
        );
        let subject = Subject {
            id: "sub01".into(),
            timeseries: dir.path().join("ts.txt"),
        };

        let err = run_identification(config, &[subject.clone(), subject])
            .expect_err("duplicates are rejected");
        assert!(err.is_run_fatal());
    }
}
