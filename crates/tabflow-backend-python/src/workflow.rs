use std::collections::HashMap;

use bytes::Bytes;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyModule};
use tabflow_core::{
    ArrayView, ColumnKind, DType, Error, Result, TransformResult, ViewRequest, Workflow,
    WorkflowArtifact, WorkflowBackend,
};
use tracing::info;

use crate::interpreter;

/// Default on-disk convention: a `model.py` bundled inside the versioned
/// artifact directory, overridable via the `python_module` config parameter.
pub const DEFAULT_MODULE: &str = "model";
const ENTRY_CLASS: &str = "WorkflowModel";
const REQUIRED_METHODS: [&str; 4] = ["initialize", "transform", "get_column_types", "get_lengths"];

/// Workflow loader backed by the embedded CPython interpreter.
pub struct PythonBackend;

impl PythonBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PythonBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowBackend for PythonBackend {
    type Workflow = PythonWorkflow;

    fn name(&self) -> &'static str {
        "python"
    }

    fn initialize(&self) -> Result<()> {
        interpreter::initialize()
    }

    fn finalize(&self) -> Result<()> {
        interpreter::finalize()
    }

    fn load(
        &self,
        artifact: &WorkflowArtifact,
        dtypes: &HashMap<String, DType>,
    ) -> Result<Self::Workflow> {
        Python::with_gil(|py| {
            let module = import_workflow_module(py, artifact)?;
            let model = module
                .getattr(ENTRY_CLASS)
                .and_then(|class| class.call0())
                .map_err(load_err)?;

            // capability check happens at load, not per call
            for method in REQUIRED_METHODS {
                if !model.hasattr(method).map_err(load_err)? {
                    return Err(Error::WorkflowLoad(format!(
                        "workflow class '{ENTRY_CLASS}' is missing required method '{method}'"
                    )));
                }
            }

            let dtypes_py = PyDict::new(py);
            for (name, dtype) in dtypes {
                dtypes_py
                    .set_item(name, dtype.numpy_name())
                    .map_err(load_err)?;
            }
            let path = artifact.path.display().to_string();
            model
                .call_method1("initialize", (path, dtypes_py))
                .map_err(load_err)?;

            let column_types = model
                .call_method0("get_column_types")
                .and_then(|t| t.extract::<HashMap<String, bool>>())
                .map_err(load_err)?
                .into_iter()
                .map(|(name, single_hot)| {
                    let kind = if single_hot {
                        ColumnKind::SingleHot
                    } else {
                        ColumnKind::MultiHot
                    };
                    (name, kind)
                })
                .collect();

            Ok(PythonWorkflow {
                model: model.unbind(),
                column_types,
            })
        })
    }
}

/// A loaded Python workflow object plus its cached column-type table. The
/// `Py` handle is only ever dereferenced under the GIL.
pub struct PythonWorkflow {
    model: Py<PyAny>,
    column_types: HashMap<String, ColumnKind>,
}

impl Workflow for PythonWorkflow {
    fn transform(
        &mut self,
        request: &ViewRequest<'_>,
        output_names: &[String],
    ) -> Result<TransformResult> {
        // GIL scope covers the foreign call plus extraction of result bytes
        // and lengths; nothing foreign is touched after it drops.
        Python::with_gil(|py| {
            let model = self.model.bind(py);

            let names = PyList::new(py, request.inputs.iter().map(|i| i.name))
                .map_err(transform_err)?;
            let arrays = PyList::empty(py);
            for input in &request.inputs {
                arrays
                    .append(array_interface(py, &input.view).map_err(transform_err)?)
                    .map_err(transform_err)?;
            }
            let outputs_py = PyList::new(py, output_names).map_err(transform_err)?;

            let result = model
                .call_method1("transform", (names, arrays, outputs_py))
                .map_err(transform_err)?;
            let result = result.downcast::<PyDict>().map_err(|_| {
                Error::Transform("transform must return a mapping of output name to array".into())
            })?;

            let lengths = model
                .call_method0("get_lengths")
                .and_then(|l| l.extract::<HashMap<String, u64>>())
                .map_err(transform_err)?;

            let mut outputs = HashMap::with_capacity(output_names.len());
            for name in output_names {
                let array = result
                    .get_item(name)
                    .map_err(transform_err)?
                    .ok_or_else(|| {
                        Error::Transform(format!("transform result is missing output '{name}'"))
                    })?;
                let raw: Vec<u8> = array
                    .call_method0("tobytes")
                    .and_then(|b| b.extract())
                    .map_err(transform_err)?;
                outputs.insert(name.clone(), Bytes::from(raw));
            }

            Ok(TransformResult { outputs, lengths })
        })
    }

    fn column_types(&self) -> &HashMap<String, ColumnKind> {
        &self.column_types
    }
}

/// Import the workflow module: either the configured override, or `model.py`
/// from the versioned artifact directory (prepended to the module search
/// path, matching the on-disk convention).
fn import_workflow_module<'py>(
    py: Python<'py>,
    artifact: &WorkflowArtifact,
) -> Result<Bound<'py, PyModule>> {
    match &artifact.module {
        Some(name) => {
            info!(module = %name, "loading workflow from configured module");
            PyModule::import(py, name.as_str()).map_err(load_err)
        }
        None => {
            let dir = artifact.path.display().to_string();
            info!(path = %dir, "loading workflow from artifact directory");
            let sys = PyModule::import(py, "sys").map_err(load_err)?;
            sys.getattr("path")
                .and_then(|p| p.call_method1("insert", (0, dir)))
                .map_err(load_err)?;
            PyModule::import(py, DEFAULT_MODULE).map_err(load_err)
        }
    }
}

/// The `__array_interface__` mapping describing one borrowed view: shape,
/// writable data pointer, typestr, descr, protocol version 3. The pointer is
/// only valid while the view's backing buffer is alive, which the caller
/// guarantees for the span of the transform call.
fn array_interface<'py>(py: Python<'py>, view: &ArrayView<'_>) -> PyResult<Bound<'py, PyDict>> {
    let ai = PyDict::new(py);
    ai.set_item("shape", (view.rows,))?;
    ai.set_item("data", (view.data.as_ptr() as usize, false))?;
    ai.set_item("typestr", view.typestr.as_str())?;
    ai.set_item("descr", vec![("", view.typestr.as_str())])?;
    ai.set_item("version", 3)?;
    Ok(ai)
}

fn load_err(e: PyErr) -> Error {
    Error::WorkflowLoad(e.to_string())
}

fn transform_err(e: PyErr) -> Error {
    Error::Transform(e.to_string())
}
