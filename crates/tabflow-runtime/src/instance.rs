use std::sync::Arc;

use tabflow_core::{
    build_numeric_view, build_string_scratch, build_string_view, DType, Error, NamedView,
    StringScratch, TransformResult, ViewRequest,
};
use tracing::debug;

use crate::{materialize, ModelState, OutputAllocator, Request, RequestOutcome};

/// Per-instance binding of a loaded workflow. Binding is cheap (an Arc clone
/// and bookkeeping); no foreign calls happen here beyond what model load
/// already did. Instances are not shared, even though the underlying
/// interpreter is process-wide.
pub struct InstanceState {
    pub name: String,
    pub device_id: i32,
    model: Arc<ModelState>,
}

impl InstanceState {
    pub fn bind(name: impl Into<String>, device_id: i32, model: Arc<ModelState>) -> Self {
        Self {
            name: name.into(),
            device_id,
            model,
        }
    }

    pub fn model(&self) -> &Arc<ModelState> {
        &self.model
    }

    /// Run a batch: marshal each request into borrowed views, drive the
    /// workflow once for the marshalable ones, and materialize outputs per
    /// request. Always returns exactly one outcome per request, in order.
    pub fn execute_batch<A: OutputAllocator>(
        &self,
        requests: &[Request],
        allocator: &mut A,
    ) -> Vec<RequestOutcome> {
        let model = &self.model;
        let output_names = model.output_names();

        if let Err(err) = check_output_names(model) {
            // config mismatch is a caller programming error; fail the call
            return requests.iter().map(|_| Err(clone_error(&err))).collect();
        }

        debug!(
            instance = %self.name,
            model = %model.name,
            batch = requests.len(),
            "executing requests"
        );

        // String inputs need owned transcode scratch built before the views
        // that borrow from it.
        let mut scratch: Vec<Vec<Option<StringScratch>>> = Vec::with_capacity(requests.len());
        let mut failures: Vec<Option<Error>> = Vec::with_capacity(requests.len());
        for request in requests {
            let mut buffers = Vec::with_capacity(request.inputs.len());
            let mut failure = None;
            for input in &request.inputs {
                if input.dtype == DType::Bytes {
                    match build_string_scratch(input) {
                        Ok(s) => buffers.push(Some(s)),
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                } else {
                    buffers.push(None);
                }
            }
            scratch.push(buffers);
            failures.push(failure);
        }

        let mut prepared: Vec<Option<ViewRequest<'_>>> = Vec::with_capacity(requests.len());
        for ((request, buffers), failure) in
            requests.iter().zip(&scratch).zip(failures.iter_mut())
        {
            if failure.is_some() {
                prepared.push(None);
                continue;
            }
            let mut inputs = Vec::with_capacity(request.inputs.len());
            for (input, buffer) in request.inputs.iter().zip(buffers) {
                let view = match buffer {
                    Some(s) => build_string_view(s, input.rows()),
                    None => match build_numeric_view(input) {
                        Ok(v) => v,
                        Err(e) => {
                            *failure = Some(e);
                            break;
                        }
                    },
                };
                inputs.push(NamedView {
                    name: &input.name,
                    view,
                });
            }
            if failure.is_some() {
                prepared.push(None);
            } else {
                prepared.push(Some(ViewRequest { inputs }));
            }
        }

        // Requests that failed marshaling are excluded from the foreign call;
        // their siblings still run.
        let mut live_index = Vec::new();
        let mut live = Vec::new();
        for (i, view_request) in prepared.into_iter().enumerate() {
            if let Some(vr) = view_request {
                live_index.push(i);
                live.push(vr);
            }
        }

        let mut results = if live.is_empty() {
            Vec::new()
        } else {
            // Lock scope: the one call that touches foreign objects. Output
            // allocation and copies happen after the guard drops.
            let mut workflow = match model.workflow().lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            workflow.execute(&live, output_names)
        };

        if results.len() != live.len() {
            let (expected, got) = (live.len(), results.len());
            return requests
                .iter()
                .map(|_| {
                    Err(Error::ResponseCountMismatch { expected, got })
                })
                .collect();
        }

        // Stitch outcomes back into request order and materialize.
        let mut outcomes: Vec<Option<RequestOutcome>> =
            failures.into_iter().map(|f| f.map(Err)).collect();
        for (i, result) in live_index.into_iter().zip(results.drain(..)) {
            let rows = requests[i].rows();
            outcomes[i] = Some(result.and_then(|r| self.materialize_request(rows, &r, allocator)));
        }
        outcomes
            .into_iter()
            .map(|o| o.expect("every request has an outcome"))
            .collect()
    }

    fn materialize_request<A: OutputAllocator>(
        &self,
        rows: usize,
        result: &TransformResult,
        allocator: &mut A,
    ) -> Result<Vec<crate::OutputTensor>, Error> {
        let model = &self.model;
        let mut outputs = Vec::with_capacity(model.output_columns().len());
        for (name, dtype) in model.output_columns() {
            let length = output_length(model, name, rows, result)?;
            let raw = result.outputs.get(name).ok_or_else(|| {
                Error::Transform(format!("transform produced no output '{name}'"))
            })?;
            outputs.push(materialize(name, *dtype, length, raw, allocator)?);
        }
        Ok(outputs)
    }
}

/// Per-request output length. The transform reports lengths by name; a
/// single-hot column that omits its length is one scalar per input row.
fn output_length(
    model: &ModelState,
    name: &str,
    rows: usize,
    result: &TransformResult,
) -> Result<u64, Error> {
    if let Some(len) = result.lengths.get(name) {
        return Ok(*len);
    }
    match model.column_types().get(name) {
        Some(tabflow_core::ColumnKind::SingleHot) => Ok(rows as u64),
        _ => Err(Error::Transform(format!(
            "transform reported no length for output '{name}'"
        ))),
    }
}

/// Outputs must be declared and known to the workflow before anything runs.
fn check_output_names(model: &ModelState) -> Result<(), Error> {
    let names = model.output_names();
    if names.is_empty() {
        return Err(Error::InvalidArgument(
            "model config declares no outputs".into(),
        ));
    }
    for name in names {
        if !model.column_types().contains_key(name) {
            return Err(Error::InvalidArgument(format!(
                "output '{name}' is not produced by the workflow"
            )));
        }
    }
    Ok(())
}

// Error is not Clone; rebuild the two variants this path can produce.
fn clone_error(err: &Error) -> Error {
    match err {
        Error::InvalidArgument(msg) => Error::InvalidArgument(msg.clone()),
        other => Error::InvalidArgument(other.to_string()),
    }
}
