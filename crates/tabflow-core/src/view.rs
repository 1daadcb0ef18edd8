//! Borrowed array views over host buffers. A view is valid only for the
//! duration of the one transform call it is built for; it is never stored or
//! returned past that call.

use crate::{strings, DType, Error, InputTensor, Result};

/// A zero-copy description of a one-dimensional foreign array: raw bytes,
/// first-dimension element count, and an array-interface typestr.
#[derive(Debug)]
pub struct ArrayView<'a> {
    pub data: &'a [u8],
    pub rows: usize,
    pub typestr: String,
}

/// A view paired with its input name, in host-supplied order.
#[derive(Debug)]
pub struct NamedView<'a> {
    pub name: &'a str,
    pub view: ArrayView<'a>,
}

/// Owned scratch backing a fixed-width string view. Kept alive by the caller
/// across the transform call that consumes the view.
#[derive(Debug)]
pub struct StringScratch {
    pub max_len: usize,
    buffer: Vec<u8>,
}

/// Build a zero-copy view over a fixed-width input buffer. Only the first
/// shape dimension is honored; higher dimensions are a non-goal.
pub fn build_numeric_view(input: &InputTensor) -> Result<ArrayView<'_>> {
    input.ensure_host_resident()?;
    let width = input.dtype.element_width().ok_or_else(|| {
        Error::InvalidArgument(format!(
            "input '{}' is a string tensor; use the transcode path",
            input.name
        ))
    })?;
    let rows = input.rows();
    if input.data.len() < rows * width {
        return Err(Error::InvalidArgument(format!(
            "input '{}' holds {} bytes, expected at least {} for {} rows",
            input.name,
            input.data.len(),
            rows * width,
            rows
        )));
    }
    Ok(ArrayView {
        data: &input.data,
        rows,
        typestr: input.dtype.typestr()?.to_string(),
    })
}

/// Scan a length-prefixed string input and transcode it into fixed-width
/// UCS-4 scratch. One scan computes the width; the transcode fills the slots.
pub fn build_string_scratch(input: &InputTensor) -> Result<StringScratch> {
    input.ensure_host_resident()?;
    if input.dtype != DType::Bytes {
        return Err(Error::InvalidArgument(format!(
            "input '{}' is not a string tensor",
            input.name
        )));
    }
    let max_len = strings::max_string_len(&input.data)?;
    let buffer = strings::transcode_fixed_width(&input.data, input.rows(), max_len)?;
    Ok(StringScratch { max_len, buffer })
}

/// View over previously built string scratch, typed `<U{max_len}`.
pub fn build_string_view(scratch: &StringScratch, rows: usize) -> ArrayView<'_> {
    ArrayView {
        data: &scratch.buffer,
        rows,
        typestr: format!("<U{}", scratch.max_len),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::MemoryKind;

    fn f32_input(name: &str, values: &[f32]) -> InputTensor {
        let mut data = Vec::new();
        for v in values {
            data.extend_from_slice(&v.to_le_bytes());
        }
        InputTensor::from_cpu_bytes(name, DType::Fp32, &[values.len() as i64], Bytes::from(data))
    }

    #[test]
    fn numeric_view_is_zero_copy() {
        let input = f32_input("x", &[1.0, 2.0, 3.0]);
        let view = build_numeric_view(&input).unwrap();
        assert_eq!(view.rows, 3);
        assert_eq!(view.typestr, "<f4");
        assert_eq!(view.data.as_ptr(), input.data.as_ptr());
    }

    #[test]
    fn fp16_is_viewable_on_input() {
        let input = InputTensor::from_cpu_bytes("h", DType::Fp16, &[2], Bytes::from(vec![0u8; 4]));
        assert_eq!(build_numeric_view(&input).unwrap().typestr, "<f2");
    }

    #[test]
    fn short_buffer_is_rejected() {
        let mut input = f32_input("x", &[1.0, 2.0]);
        input.shape[0] = 5;
        assert!(matches!(
            build_numeric_view(&input),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn gpu_resident_input_is_rejected() {
        let mut input = f32_input("x", &[1.0]);
        input.memory = MemoryKind::Gpu { device_id: 0 };
        assert!(matches!(
            build_numeric_view(&input),
            Err(Error::UnsupportedLocation(_))
        ));
    }

    #[test]
    fn string_view_reports_fixed_width_typestr() {
        let data = strings::encode(&["alpha", "be"]);
        let input = InputTensor::from_cpu_bytes("s", DType::Bytes, &[2], Bytes::from(data));
        let scratch = build_string_scratch(&input).unwrap();
        assert_eq!(scratch.max_len, 5);
        let view = build_string_view(&scratch, input.rows());
        assert_eq!(view.typestr, "<U5");
        assert_eq!(view.data.len(), 2 * 5 * 4);
    }
}
