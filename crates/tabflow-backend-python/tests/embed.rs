//! End-to-end test against a real embedded interpreter. Kept as a single
//! scenario because interpreter init and teardown are process-wide.

use std::fs;

use anyhow::Result;
use bytes::Bytes;
use tabflow_backend_python::PythonBackend;
use tabflow_core::{DType, Error, InputTensor};
use tabflow_runtime::{
    BackendState, CpuAllocator, InstanceDescriptor, ModelDescriptor, Request,
};

/// A workflow stub that reads its inputs through the array-interface data
/// pointer (ctypes, no numpy) and echoes the raw bytes back.
const MODEL_PY: &str = r#"
import ctypes


class _Array:
    def __init__(self, typestr, data):
        self._data = data
        self.dtype = type("_dtype", (), {"str": typestr})()

    def tobytes(self):
        return self._data


class WorkflowModel:
    def __init__(self):
        self._lengths = {}

    def initialize(self, path, dtypes):
        self._path = path
        self._dtypes = dict(dtypes)

    def get_column_types(self):
        return {"clicks": True}

    def get_lengths(self):
        return dict(self._lengths)

    def transform(self, names, arrays, output_names):
        out = {}
        for name, array in zip(names, arrays):
            if name not in output_names:
                continue
            (rows,) = array["shape"]
            ptr, _writable = array["data"]
            width = int(array["typestr"][2:])
            raw = ctypes.string_at(ptr, rows * width)
            out[name] = _Array(array["typestr"], raw)
            self._lengths[name] = rows
        return out
"#;

const CONFIG: &str = r#"{
    "input": [{"name": "clicks", "data_type": "TYPE_INT64", "dims": [-1]}],
    "output": [{"name": "clicks", "data_type": "TYPE_INT64", "dims": [-1]}]
}"#;

fn i64_request(values: &[i64]) -> (Request, Vec<u8>) {
    let mut data = Vec::new();
    for v in values {
        data.extend_from_slice(&v.to_le_bytes());
    }
    let request = Request::new(vec![InputTensor::from_cpu_bytes(
        "clicks",
        DType::Int64,
        &[values.len() as i64],
        Bytes::from(data.clone()),
    )]);
    (request, data)
}

#[test]
fn embedded_interpreter_round_trip() -> Result<()> {
    let repository = tempfile::tempdir()?;
    let artifact = repository.path().join("1");
    fs::create_dir(&artifact)?;
    fs::write(artifact.join("model.py"), MODEL_PY)?;

    let mut state = BackendState::new(PythonBackend::new());
    state.initialize()?;
    state.initialize()?; // second call is a no-op

    state.model_init(&ModelDescriptor {
        name: "demo".into(),
        version: 1,
        repository: repository.path().into(),
        config_json: CONFIG.into(),
    })?;
    state.instance_init(&InstanceDescriptor {
        name: "demo_0".into(),
        model: "demo".into(),
        device_id: 0,
    })?;

    // the workflow echoes the zero-copy view, so output bytes must equal
    // the host input buffer exactly
    let (request, expected) = i64_request(&[7, -1, 1 << 40]);
    let outcomes = state.execute("demo_0", &[request], &mut CpuAllocator)?;
    assert_eq!(outcomes.len(), 1);
    let outputs = outcomes[0].as_ref().expect("transform succeeds");
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].dtype, DType::Int64);
    assert_eq!(outputs[0].shape.as_slice(), &[3, 1]);
    assert_eq!(outputs[0].buffer.data, expected);

    // a missing module override fails the model load, wrapped verbatim
    let err = state
        .model_init(&ModelDescriptor {
            name: "broken".into(),
            version: 1,
            repository: repository.path().into(),
            config_json: r#"{
                "input": [{"name": "clicks", "data_type": "TYPE_INT64"}],
                "output": [{"name": "clicks", "data_type": "TYPE_INT64"}],
                "parameters": {"python_module": {"string_value": "no_such_module_xyz"}}
            }"#
            .into(),
        })
        .unwrap_err();
    match err {
        Error::WorkflowLoad(msg) => assert!(msg.contains("no_such_module_xyz"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }

    state.finalize()?;
    state.finalize()?; // teardown runs exactly once
    Ok(())
}
