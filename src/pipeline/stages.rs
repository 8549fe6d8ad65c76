//! The four per-subject stages: connectivity, partition, centrality, hub labels

use std::path::PathBuf;

use crate::cluster::{Affiliation, DetectionRequest};
use crate::config::Threshold;
use crate::data::loaders::load_timeseries;
use crate::data::preprocessing::{build_connectivity, distance_censor};
use crate::data::Subject;
use crate::error::Result;
use crate::graph::algorithms::{nonzero_count, strict_upper_triangle, threshold_for_sweep};
use crate::graph::builder::parcel_graph;
use crate::hubs::{average_percentiles, censored_pc_percentiles, hub_indices};
use crate::pipeline::{Stage, StageContext};
use crate::storage::formats::{
    read_affiliation_vector, read_float_vector, read_matrix_csv, write_affiliation,
    write_float_vector, write_indices, write_matrix_csv,
};
use crate::storage::{network_name, ArtifactId};
use crate::viz::hub_label_table;

fn censored_matrix(subject: &Subject) -> ArtifactId {
    ArtifactId::DistCensoredMatrix {
        subject: subject.id.clone(),
    }
}

/// Timeseries to distance-censored z-matrix
pub struct ConnectivityStage;

impl Stage for ConnectivityStage {
    fn name(&self) -> &'static str {
        "connectivity"
    }

    fn inputs(&self, _ctx: &StageContext, subject: &Subject) -> Vec<PathBuf> {
        vec![subject.timeseries.clone()]
    }

    fn outputs(&self, _ctx: &StageContext, subject: &Subject) -> Vec<ArtifactId> {
        vec![censored_matrix(subject)]
    }

    fn run(&self, ctx: &StageContext, subject: &Subject) -> Result<()> {
        let timeseries = load_timeseries(&subject.timeseries)?;
        log::debug!(
            "  -{} parcels x {} timepoints",
            timeseries.nrows(),
            timeseries.ncols()
        );

        let zmat = build_connectivity(&timeseries)?;
        let censored = distance_censor(&zmat, &ctx.mask)?;

        let path = ctx.store.path(&censored_matrix(subject));
        log::debug!("  -Writing distance censored matrix: {}", path.display());
        write_matrix_csv(&censored, &path)
    }
}

/// Community detection at every threshold of the sweep
pub struct PartitionStage;

impl Stage for PartitionStage {
    fn name(&self) -> &'static str {
        "partition"
    }

    fn inputs(&self, ctx: &StageContext, subject: &Subject) -> Vec<PathBuf> {
        vec![ctx.store.path(&censored_matrix(subject))]
    }

    fn outputs(&self, _ctx: &StageContext, subject: &Subject) -> Vec<ArtifactId> {
        Threshold::all()
            .flat_map(|threshold| {
                [
                    ArtifactId::AffiliationReference {
                        subject: subject.id.clone(),
                        threshold,
                    },
                    ArtifactId::AffiliationVector {
                        subject: subject.id.clone(),
                        threshold,
                    },
                ]
            })
            .collect()
    }

    fn run(&self, ctx: &StageContext, subject: &Subject) -> Result<()> {
        let matrix = read_matrix_csv(&ctx.store.path(&censored_matrix(subject)))?;
        let parcels = matrix.nrows();

        for threshold in Threshold::all() {
            let thresholded = threshold_for_sweep(&matrix, threshold)?;
            let graph = parcel_graph(&thresholded);
            let name = network_name(&subject.id, threshold);
            let seed = ctx.detection_seed(&subject.id, threshold);

            log::debug!(
                "  -Threshold {}: {} edges, seed {}",
                threshold,
                nonzero_count(&thresholded) / 2,
                seed
            );
            let assignments = ctx.detector.detect(&DetectionRequest {
                graph: &graph,
                name: &name,
                seed,
                attempts: ctx.config.attempts,
            })?;

            let source = ctx.detector.source(&name);
            let affiliation = Affiliation::from_assignments(assignments, parcels, &source)?;
            log::debug!(
                "  -Threshold {}: {} communities",
                threshold,
                affiliation.community_count()
            );

            write_affiliation(
                &affiliation,
                &ctx.store.path(&ArtifactId::AffiliationReference {
                    subject: subject.id.clone(),
                    threshold,
                }),
                &ctx.store.path(&ArtifactId::AffiliationVector {
                    subject: subject.id.clone(),
                    threshold,
                }),
            )?;
        }
        Ok(())
    }
}

/// Degree-censored participation percentiles per threshold, then their average
pub struct CentralityStage;

impl Stage for CentralityStage {
    fn name(&self) -> &'static str {
        "centrality"
    }

    fn inputs(&self, ctx: &StageContext, subject: &Subject) -> Vec<PathBuf> {
        std::iter::once(ctx.store.path(&censored_matrix(subject)))
            .chain(Threshold::all().map(|threshold| {
                ctx.store.path(&ArtifactId::AffiliationVector {
                    subject: subject.id.clone(),
                    threshold,
                })
            }))
            .collect()
    }

    fn outputs(&self, _ctx: &StageContext, subject: &Subject) -> Vec<ArtifactId> {
        Threshold::all()
            .map(|threshold| ArtifactId::CensoredPcPercentiles {
                subject: subject.id.clone(),
                threshold,
            })
            .chain([ArtifactId::AveragePcPercentiles {
                subject: subject.id.clone(),
            }])
            .collect()
    }

    fn run(&self, ctx: &StageContext, subject: &Subject) -> Result<()> {
        let matrix = read_matrix_csv(&ctx.store.path(&censored_matrix(subject)))?;

        let mut per_threshold = Vec::with_capacity(Threshold::all().count());
        for threshold in Threshold::all() {
            let upper = strict_upper_triangle(&threshold_for_sweep(&matrix, threshold)?);
            let affiliation = read_affiliation_vector(
                &ctx.store.path(&ArtifactId::AffiliationVector {
                    subject: subject.id.clone(),
                    threshold,
                }),
                matrix.nrows(),
            )?;

            let percentiles =
                censored_pc_percentiles(&upper, &affiliation, ctx.config.low_degree_percentile)?;
            write_float_vector(
                &percentiles,
                &ctx.store.path(&ArtifactId::CensoredPcPercentiles {
                    subject: subject.id.clone(),
                    threshold,
                }),
            )?;
            per_threshold.push(percentiles);
        }

        let averaged = average_percentiles(&per_threshold)?;
        write_float_vector(
            &averaged.to_vec(),
            &ctx.store.path(&ArtifactId::AveragePcPercentiles {
                subject: subject.id.clone(),
            }),
        )
    }
}

/// Hub flagging and, when a label writer is configured, the hub label file
pub struct HubLabelStage;

impl Stage for HubLabelStage {
    fn name(&self) -> &'static str {
        "hub labels"
    }

    fn inputs(&self, ctx: &StageContext, subject: &Subject) -> Vec<PathBuf> {
        vec![ctx.store.path(&ArtifactId::AveragePcPercentiles {
            subject: subject.id.clone(),
        })]
    }

    fn outputs(&self, ctx: &StageContext, subject: &Subject) -> Vec<ArtifactId> {
        let mut outputs = vec![ArtifactId::HubIndices {
            subject: subject.id.clone(),
        }];
        if ctx.labels.is_some() {
            outputs.push(ArtifactId::HubLabelTable {
                subject: subject.id.clone(),
            });
            outputs.push(ArtifactId::HubLabels {
                subject: subject.id.clone(),
            });
        }
        outputs
    }

    fn run(&self, ctx: &StageContext, subject: &Subject) -> Result<()> {
        let averaged = read_float_vector(&ctx.store.path(&ArtifactId::AveragePcPercentiles {
            subject: subject.id.clone(),
        }))?;
        let hubs = hub_indices(&averaged, ctx.config.hub_cutoff);
        log::info!("  -{}: {} hubs found", subject.id, hubs.len());

        write_indices(
            &hubs,
            &ctx.store.path(&ArtifactId::HubIndices {
                subject: subject.id.clone(),
            }),
        )?;

        if let Some(labels) = &ctx.labels {
            let table = hub_label_table(&labels.template, &hubs, ctx.config.overlay);
            let output = ctx.store.path(&ArtifactId::HubLabels {
                subject: subject.id.clone(),
            });
            log::debug!("  -Writing hub labels: {}", output.display());
            labels.writer.write_labels(
                &table,
                &ctx.store.path(&ArtifactId::HubLabelTable {
                    subject: subject.id.clone(),
                }),
                &output,
            )?;
        }
        Ok(())
    }
}
