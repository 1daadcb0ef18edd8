use bytes::Bytes;
use smallvec::SmallVec;

use crate::{DType, Error, Result};

/// Where a host buffer lives. This backend has no device-copy path, so
/// anything other than `Cpu` is rejected before a foreign call is made.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryKind {
    Cpu,
    Gpu { device_id: i32 },
}

pub type Shape = SmallVec<[i64; 2]>;

/// One named input tensor as handed over by the host. Immutable once
/// constructed; lifetime is a single execute call.
#[derive(Clone, Debug)]
pub struct InputTensor {
    pub name: String,
    pub dtype: DType,
    pub shape: Shape,
    pub data: Bytes,
    pub memory: MemoryKind,
}

impl InputTensor {
    pub fn from_cpu_bytes(name: impl Into<String>, dtype: DType, shape: &[i64], data: Bytes) -> Self {
        Self {
            name: name.into(),
            dtype,
            shape: shape.iter().copied().collect(),
            data,
            memory: MemoryKind::Cpu,
        }
    }

    /// First-dimension element count. Higher dimensions are not supported on
    /// the view path.
    pub fn rows(&self) -> usize {
        self.shape.first().map(|d| *d as usize).unwrap_or(0)
    }

    pub fn ensure_host_resident(&self) -> Result<()> {
        match self.memory {
            MemoryKind::Cpu => Ok(()),
            MemoryKind::Gpu { device_id } => Err(Error::UnsupportedLocation(format!(
                "input '{}' resides on GPU device {device_id}; host-resident buffers are required",
                self.name
            ))),
        }
    }
}
