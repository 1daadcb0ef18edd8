use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use tabflow_core::{ColumnKind, DType, Workflow, WorkflowArtifact, WorkflowBackend};
use tabflow_core::Result;
use tracing::info;

use crate::ModelConfig;

/// What the host hands over when a model is initialized.
#[derive(Clone, Debug)]
pub struct ModelDescriptor {
    pub name: String,
    pub version: u64,
    pub repository: PathBuf,
    pub config_json: String,
}

/// Per-model state: the loaded workflow (shared read-mostly by all instances
/// of the model) plus everything cached at load time. The column-type table
/// is immutable after `load` returns.
pub struct ModelState {
    pub name: String,
    pub version: u64,
    output_columns: Vec<(String, DType)>,
    output_names: Vec<String>,
    column_types: HashMap<String, ColumnKind>,
    workflow: Mutex<Box<dyn Workflow>>,
}

impl ModelState {
    /// Parse the config, resolve the versioned artifact directory, and load
    /// the workflow through the backend. Foreign load failures arrive here
    /// already wrapped as `WorkflowLoad` and propagate verbatim.
    pub fn load<B: WorkflowBackend>(backend: &B, descriptor: &ModelDescriptor) -> Result<Self> {
        let config = ModelConfig::parse(&descriptor.config_json)?;
        let dtypes = config.column_dtypes()?;
        let output_columns = config.output_columns()?;

        let artifact = WorkflowArtifact {
            path: descriptor.repository.join(descriptor.version.to_string()),
            module: config.python_module().map(str::to_string),
        };

        info!(
            model = %descriptor.name,
            version = descriptor.version,
            artifact = %artifact.path.display(),
            backend = backend.name(),
            "loading workflow"
        );
        let workflow = backend.load(&artifact, &dtypes)?;
        let column_types = workflow.column_types().clone();

        let output_names = output_columns.iter().map(|(n, _)| n.clone()).collect();
        Ok(Self {
            name: descriptor.name.clone(),
            version: descriptor.version,
            output_columns,
            output_names,
            column_types,
            workflow: Mutex::new(Box::new(workflow)),
        })
    }

    pub fn output_columns(&self) -> &[(String, DType)] {
        &self.output_columns
    }

    pub fn output_names(&self) -> &[String] {
        &self.output_names
    }

    pub fn column_types(&self) -> &HashMap<String, ColumnKind> {
        &self.column_types
    }

    pub(crate) fn workflow(&self) -> &Mutex<Box<dyn Workflow>> {
        &self.workflow
    }
}
