use smallvec::smallvec;
use tabflow_core::{DType, Error, MemoryKind, Result};

use crate::OutputTensor;

/// Host-owned output storage handed back by the allocator, tagged with where
/// it landed. Device placement is never acceptable here.
#[derive(Debug)]
pub struct OutputBuffer {
    pub data: Vec<u8>,
    pub memory: MemoryKind,
}

/// The host's per-output allocation call. Runs after the global runtime lock
/// has been released, so a slow allocator never serializes foreign calls.
pub trait OutputAllocator {
    fn allocate(&mut self, name: &str, dtype: DType, byte_size: usize) -> Result<OutputBuffer>;
}

/// Plain heap allocator used when the host does not supply one.
#[derive(Debug, Default)]
pub struct CpuAllocator;

impl OutputAllocator for CpuAllocator {
    fn allocate(&mut self, _name: &str, _dtype: DType, byte_size: usize) -> Result<OutputBuffer> {
        Ok(OutputBuffer {
            data: vec![0u8; byte_size],
            memory: MemoryKind::Cpu,
        })
    }
}

/// Size a host buffer from the per-request length and copy the transform's
/// raw result bytes into it verbatim. Element widths on both sides match by
/// construction (dtype is threaded from config through the output request).
pub fn materialize<A: OutputAllocator>(
    name: &str,
    dtype: DType,
    length: u64,
    raw: &[u8],
    allocator: &mut A,
) -> Result<OutputTensor> {
    let width = match dtype {
        DType::Fp16 => {
            return Err(Error::UnsupportedDtype(format!(
                "fp16 output is not supported (output '{name}')"
            )))
        }
        DType::Bytes => {
            return Err(Error::UnsupportedDtype(format!(
                "variable-length string output is not supported (output '{name}')"
            )))
        }
        other => other.element_width().expect("fixed-width dtype"),
    };

    let byte_size = length as usize * width;
    if raw.len() < byte_size {
        return Err(Error::Transform(format!(
            "transform produced {} bytes for output '{name}', need {byte_size} for {length} rows",
            raw.len()
        )));
    }

    let mut buffer = allocator.allocate(name, dtype, byte_size)?;
    if let MemoryKind::Gpu { device_id } = buffer.memory {
        return Err(Error::UnsupportedLocation(format!(
            "allocator placed output '{name}' on GPU device {device_id}; this backend has no device-copy path"
        )));
    }
    buffer.data[..byte_size].copy_from_slice(&raw[..byte_size]);

    Ok(OutputTensor {
        name: name.to_string(),
        dtype,
        shape: smallvec![length as i64, 1],
        buffer,
    })
}
