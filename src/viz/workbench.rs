//! Connectome Workbench (`wb_command`) as the label and scalar map writer

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::process::ExternalCommand;
use crate::viz::{LabelTable, LabelWriter, ScalarMapWriter};

/// File name of the label table exported from the template
pub const TEMPLATE_TABLE: &str = "template_label_table.txt";

/// Thin wrapper over the `wb_command` binary
#[derive(Debug, Clone)]
pub struct Workbench {
    pub binary: PathBuf,

    /// Parcellation `.dlabel.nii` the hub labels are painted onto
    pub template: PathBuf,

    pub launch_retries: u32,
    pub launch_backoff: Duration,
}

impl Workbench {
    pub fn new(binary: PathBuf, template: PathBuf) -> Self {
        Self {
            binary,
            template,
            launch_retries: 0,
            launch_backoff: Duration::from_millis(250),
        }
    }

    fn command(&self) -> ExternalCommand {
        ExternalCommand::new(&self.binary).retries(self.launch_retries, self.launch_backoff)
    }
}

impl LabelWriter for Workbench {
    fn template_labels(&self, scratch: &Path) -> Result<LabelTable> {
        let exported = scratch.join(TEMPLATE_TABLE);
        self.command()
            .arg("-cifti-label-export-table")
            .arg(&self.template)
            .arg("1")
            .arg(&exported)
            .run()?;
        LabelTable::read(&exported)
    }

    fn write_labels(&self, table: &LabelTable, table_path: &Path, output: &Path) -> Result<()> {
        table.write(table_path)?;
        self.command()
            .arg("-cifti-label-import")
            .arg(&self.template)
            .arg(table_path)
            .arg(output)
            .run()
    }
}

impl ScalarMapWriter for Workbench {
    fn write_scalars(&self, values: &Path, template: &Path, output: &Path) -> Result<()> {
        self.command()
            .arg("-cifti-convert")
            .arg("-from-text")
            .arg(values)
            .arg(template)
            .arg(output)
            .run()
    }
}
