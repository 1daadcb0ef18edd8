use tabflow_core::{DType, Error, InputTensor, Shape};

use crate::OutputBuffer;

/// One host inference request: a batch-of-one set of named input tensors.
/// Request and correlation ids are carried for logging only.
#[derive(Clone, Debug, Default)]
pub struct Request {
    pub id: String,
    pub correlation_id: u64,
    pub inputs: Vec<InputTensor>,
}

impl Request {
    pub fn new(inputs: Vec<InputTensor>) -> Self {
        Self {
            id: String::new(),
            correlation_id: 0,
            inputs,
        }
    }

    /// Leading-dimension row count of the first input.
    pub fn rows(&self) -> usize {
        self.inputs.first().map(|i| i.rows()).unwrap_or(0)
    }
}

/// A materialized output: host-owned buffer of `length * element_width`
/// bytes, shape reported as `[length, 1]`.
#[derive(Debug)]
pub struct OutputTensor {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    pub buffer: OutputBuffer,
}

/// Exactly one outcome per request, success or error, in request order.
pub type RequestOutcome = Result<Vec<OutputTensor>, Error>;
