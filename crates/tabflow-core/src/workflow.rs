use std::collections::HashMap;
use std::path::PathBuf;

use bytes::Bytes;

use crate::{DType, NamedView, Result};

/// On-disk location of a serialized workflow specification, plus the optional
/// module-name override from the model config.
#[derive(Clone, Debug)]
pub struct WorkflowArtifact {
    pub path: PathBuf,
    pub module: Option<String>,
}

/// Whether an output column carries one scalar per row or a variable-width
/// vector. Queried once at load time and immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    SingleHot,
    MultiHot,
}

/// One marshaled batch-of-one request: named borrowed views over the host
/// input buffers, valid only for the transform call they are passed to.
#[derive(Debug)]
pub struct ViewRequest<'a> {
    pub inputs: Vec<NamedView<'a>>,
}

impl ViewRequest<'_> {
    /// Input row count, taken from the first input's leading dimension.
    pub fn rows(&self) -> usize {
        self.inputs.first().map(|i| i.view.rows).unwrap_or(0)
    }
}

/// Everything extracted from the foreign runtime while the global lock was
/// held: raw result bytes per output column plus the per-request lengths.
/// No foreign object outlives the call that produced this.
#[derive(Debug, Default)]
pub struct TransformResult {
    pub outputs: HashMap<String, Bytes>,
    pub lengths: HashMap<String, u64>,
}

/// A loaded transform entry point. The capability surface is fixed: anything
/// a backend loads must provide transform and the column-type table, checked
/// at load time rather than per call.
pub trait Workflow: Send {
    /// Run one batch-of-one request. The implementation acquires the global
    /// runtime lock around the foreign call and releases it after extracting
    /// result bytes and lengths.
    fn transform(
        &mut self,
        request: &ViewRequest<'_>,
        output_names: &[String],
    ) -> Result<TransformResult>;

    /// Batch boundary: one result per request, in request order. The default
    /// maps `transform` over the slice and therefore cannot miscount; an
    /// implementation that overrides this is still checked by the caller.
    fn execute(
        &mut self,
        requests: &[ViewRequest<'_>],
        output_names: &[String],
    ) -> Vec<Result<TransformResult>> {
        requests
            .iter()
            .map(|request| self.transform(request, output_names))
            .collect()
    }

    /// The output column-type table cached at load.
    fn column_types(&self) -> &HashMap<String, ColumnKind>;
}

/// A workflow loader bound to one foreign runtime. `initialize`/`finalize`
/// drive the process-wide runtime lifecycle; both must be idempotent.
pub trait WorkflowBackend: Send + Sync + 'static {
    type Workflow: Workflow + 'static;

    fn name(&self) -> &'static str;

    /// Bring up the foreign runtime. Called exactly once per process before
    /// any workflow is loaded; failure is fatal to backend load.
    fn initialize(&self) -> Result<()>;

    /// Tear the foreign runtime down exactly once.
    fn finalize(&self) -> Result<()>;

    /// Construct and initialize a workflow from its on-disk artifact under
    /// the global runtime lock.
    fn load(
        &self,
        artifact: &WorkflowArtifact,
        dtypes: &HashMap<String, DType>,
    ) -> Result<Self::Workflow>;
}
