//! Two-level Infomap run as an external process

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cluster::{Assignment, CommunityDetector, DetectionRequest};
use crate::error::{HubError, Result};
use crate::graph::pajek::write_pajek;
use crate::process::ExternalCommand;

/// Detector that shells out to the `infomap` binary
#[derive(Debug, Clone)]
pub struct InfomapDetector {
    /// Infomap executable
    pub binary: PathBuf,

    /// Directory receiving the Pajek network files
    pub network_dir: PathBuf,

    /// Directory receiving Infomap's `.clu` output
    pub output_dir: PathBuf,

    pub timeout: Duration,
    pub launch_retries: u32,
    pub launch_backoff: Duration,
}

impl InfomapDetector {
    pub fn network_path(&self, name: &str) -> PathBuf {
        self.network_dir.join(format!("{name}.net"))
    }

    pub fn clu_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(format!("{name}.clu"))
    }
}

impl CommunityDetector for InfomapDetector {
    fn detect(&self, request: &DetectionRequest<'_>) -> Result<Vec<Assignment>> {
        let network = self.network_path(request.name);
        let clu = self.clu_path(request.name);

        log::debug!("  -Creating pajek file: {}", network.display());
        write_pajek(request.graph, &network)?;

        // Never parse a partition left over from an earlier run
        if clu.exists() {
            fs::remove_file(&clu).map_err(HubError::io(&clu))?;
        }

        log::debug!(
            "  -Running infomap ({} attempts, seed {}) silently",
            request.attempts,
            request.seed
        );
        ExternalCommand::new(&self.binary)
            .arg(&network)
            .arg(&self.output_dir)
            .arg("--clu")
            .arg("-2")
            .arg("-s")
            .arg(request.seed.to_string())
            .arg("-N")
            .arg(request.attempts.to_string())
            .arg("--out-name")
            .arg(request.name)
            .arg("--silent")
            .timeout(self.timeout)
            .retries(self.launch_retries, self.launch_backoff)
            .run()?;

        read_clu(&clu)
    }

    fn source(&self, name: &str) -> PathBuf {
        self.clu_path(name)
    }
}

/// Parse an Infomap `.clu` file: `#` comment lines, then `node module ...` rows
pub fn read_clu(path: &Path) -> Result<Vec<Assignment>> {
    if !path.exists() {
        return Err(HubError::MissingInput(path.to_path_buf()));
    }
    let text = fs::read_to_string(path).map_err(HubError::io(path))?;

    let mut assignments = Vec::new();
    for (line_idx, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let parsed = match (fields.next(), fields.next()) {
            (Some(node), Some(module)) => node.parse().ok().zip(module.parse().ok()),
            _ => None,
        };
        let Some((node, module)) = parsed else {
            return Err(HubError::Parse {
                path: path.to_path_buf(),
                line: line_idx + 1,
                message: format!("expected `node module`, found {line:?}"),
            });
        };
        assignments.push(Assignment { node, module });
    }
    Ok(assignments)
}


#[cfg(all(test, unix))]
mod command_tests {
    use std::os::unix::fs::PermissionsExt;

    use ndarray::Array2;

    use super::*;
    use crate::graph::builder::parcel_graph;

    /// Stand-in `infomap` that records its arguments and writes a partition
    /// for `--out-name` into the output directory
    const RECORDING_INFOMAP: &str = r#"#!/bin/sh
echo "$@" > "$2/args.txt"
printf '# v1.3.0\n# node module flow\n2 1 0.5\n1 2 0.25\n3 1 0.25\n' > "$2/${10}.clu"
"#;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("script should be written");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("script should be executable");
        path
    }

    fn detector(dir: &Path, binary: PathBuf) -> InfomapDetector {
        let network_dir = dir.join("pajek_files");
        let output_dir = dir.join("infomap_outputs");
        fs::create_dir_all(&network_dir).expect("network dir should be created");
        fs::create_dir_all(&output_dir).expect("output dir should be created");
        InfomapDetector {
            binary,
            network_dir,
            output_dir,
            timeout: Duration::from_secs(30),
            launch_retries: 3,
            launch_backoff: Duration::from_millis(20),
        }
    }

    fn triangle() -> Array2<f64> {
        let mut matrix = Array2::zeros((3, 3));
        matrix[[0, 1]] = 0.5;
        matrix[[1, 0]] = 0.5;
        matrix[[1, 2]] = 0.25;
        matrix[[2, 1]] = 0.25;
        matrix
    }

    #[test]
    fn runs_infomap_with_two_level_arguments() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let binary = script(dir.path(), "infomap", RECORDING_INFOMAP);
        let detector = detector(dir.path(), binary);
        let graph = parcel_graph(&triangle());

        let assignments = detector
            .detect(&DetectionRequest {
                graph: &graph,
                name: "sub01_0.05_upper_mat",
                seed: 42,
                attempts: 7,
            })
            .expect("infomap run should succeed");

        let args = fs::read_to_string(detector.output_dir.join("args.txt"))
            .expect("arguments should be recorded");
        let expected = format!(
            "{} {} --clu -2 -s 42 -N 7 --out-name sub01_0.05_upper_mat --silent",
            detector.network_path("sub01_0.05_upper_mat").display(),
            detector.output_dir.display()
        );
        assert_eq!(args.trim(), expected);
        assert!(detector.network_path("sub01_0.05_upper_mat").exists());
        assert_eq!(
            assignments,
            vec![
                Assignment { node: 2, module: 1 },
                Assignment { node: 1, module: 2 },
                Assignment { node: 3, module: 1 },
            ]
        );
        assert_eq!(
            detector.source("sub01_0.05_upper_mat"),
            detector.output_dir.join("sub01_0.05_upper_mat.clu")
        );
    }

    #[test]
    fn stale_partition_is_never_reused() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let binary = script(dir.path(), "infomap", "#!/bin/sh\nexit 0\n");
        let detector = detector(dir.path(), binary);
        let clu = detector.clu_path("sub01_0.01_upper_mat");
        fs::write(&clu, "1 1\n2 1\n3 1\n").expect("stale clu should be written");
        let graph = parcel_graph(&triangle());

        let err = detector
            .detect(&DetectionRequest {
                graph: &graph,
                name: "sub01_0.01_upper_mat",
                seed: 1,
                attempts: 1,
            })
            .expect_err("infomap wrote no partition");
        assert!(matches!(err, HubError::MissingInput(path) if path == clu));
    }
}
