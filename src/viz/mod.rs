//! Hub label tables and the brain-surface file writers that render them

pub mod workbench;

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{HubError, Result};

pub use workbench::Workbench;

/// RGBA color with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub alpha: f64,
}

impl Rgba {
    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Components scaled to 0..=255
    pub fn to_bytes(self) -> [u8; 4] {
        [self.red, self.green, self.blue, self.alpha].map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
    }

    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        let [r, g, b, a] = bytes.map(|c| f64::from(c) / 255.0);
        Self::new(r, g, b, a)
    }
}

/// Preset overlay colors for hub parcels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OverlayColor {
    Pink,
    Crimson,
    Lime,
}

impl OverlayColor {
    pub fn rgba(self) -> Rgba {
        match self {
            OverlayColor::Pink => Rgba::new(1.0, 0.07843, 0.57647, 1.0),
            OverlayColor::Crimson => Rgba::new(0.8627, 0.07843, 0.23529, 1.0),
            OverlayColor::Lime => Rgba::new(0.0, 1.0, 0.0, 1.0),
        }
    }
}

/// One entry of a label table
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    pub color: Rgba,
}

/// Label key to name and color, ordered by key
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelTable {
    pub labels: BTreeMap<u32, Label>,
}

impl LabelTable {
    /// Read a Workbench label list: a name line followed by `key r g b a`
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(HubError::io(path))?;
        let lines: Vec<(usize, &str)> = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .collect();

        let mut labels = BTreeMap::new();
        for pair in lines.chunks(2) {
            let [(_, name), (line_idx, values)] = pair else {
                return Err(HubError::Parse {
                    path: path.to_path_buf(),
                    line: pair[0].0 + 1,
                    message: "label name without a key/color line".into(),
                });
            };
            let fields: Vec<u32> = values
                .split_whitespace()
                .map(str::parse)
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| HubError::Parse {
                    path: path.to_path_buf(),
                    line: line_idx + 1,
                    message: format!("bad key/color value: {e}"),
                })?;
            let &[key, r, g, b, a] = &fields[..] else {
                return Err(HubError::Parse {
                    path: path.to_path_buf(),
                    line: line_idx + 1,
                    message: format!("expected 5 values, found {}", fields.len()),
                });
            };
            let channel = |v: u32| v.min(255) as u8;
            labels.insert(
                key,
                Label {
                    name: name.trim().to_string(),
                    color: Rgba::from_bytes([channel(r), channel(g), channel(b), channel(a)]),
                },
            );
        }
        Ok(Self { labels })
    }

    /// Write the table in the format [`LabelTable::read`] accepts
    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(HubError::io(path))?;
        let mut out = BufWriter::new(file);
        for (key, label) in &self.labels {
            let [r, g, b, a] = label.color.to_bytes();
            writeln!(out, "{}", label.name).map_err(HubError::io(path))?;
            writeln!(out, "{key} {r} {g} {b} {a}").map_err(HubError::io(path))?;
        }
        out.flush().map_err(HubError::io(path))
    }
}

/// Relabel a parcellation template to highlight one subject's hubs.
///
/// Hub keys are renamed `Subject_Hub_<n>` in key order and painted with the
/// overlay color. Every other key keeps its name and becomes fully
/// transparent. Key 0 is the background and is left as is.
pub fn hub_label_table(template: &LabelTable, hubs: &[usize], overlay: OverlayColor) -> LabelTable {
    let hub_set: HashSet<usize> = hubs.iter().copied().collect();
    let mut hub_number = 1;

    let labels = template
        .labels
        .iter()
        .map(|(&key, label)| {
            let relabeled = if key == 0 {
                label.clone()
            } else if hub_set.contains(&(key as usize)) {
                log::debug!("   -found hub {}", hub_number);
                let hub = Label {
                    name: format!("Subject_Hub_{hub_number}"),
                    color: overlay.rgba(),
                };
                hub_number += 1;
                hub
            } else {
                Label {
                    name: label.name.clone(),
                    color: Rgba {
                        alpha: 0.0,
                        ..label.color
                    },
                }
            };
            (key, relabeled)
        })
        .collect();

    LabelTable { labels }
}

/// Renders a label table onto the parcellation as a `.dlabel.nii`
pub trait LabelWriter: Send + Sync {
    /// Labels of the parcellation template
    fn template_labels(&self, scratch: &Path) -> Result<LabelTable>;

    /// Write the template's parcels with `table` as their labels
    fn write_labels(&self, table: &LabelTable, table_path: &Path, output: &Path) -> Result<()>;
}

/// Renders a per-parcel value vector as a scalar map
pub trait ScalarMapWriter {
    fn write_scalars(&self, values: &Path, template: &Path, output: &Path) -> Result<()>;
}
