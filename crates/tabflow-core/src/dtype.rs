use crate::{Error, Result};

/// Element types a workflow column can carry. `Bytes` is the variable-length
/// string encoding; everything else is fixed width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Fp16,
    Fp32,
    Fp64,
    Bytes,
}

impl DType {
    /// Parse the host config `data_type` string (`TYPE_FP32` etc).
    pub fn from_config_str(s: &str) -> Result<Self> {
        Ok(match s {
            "TYPE_BOOL" => DType::Bool,
            "TYPE_INT8" => DType::Int8,
            "TYPE_INT16" => DType::Int16,
            "TYPE_INT32" => DType::Int32,
            "TYPE_INT64" => DType::Int64,
            "TYPE_UINT8" => DType::UInt8,
            "TYPE_UINT16" => DType::UInt16,
            "TYPE_UINT32" => DType::UInt32,
            "TYPE_UINT64" => DType::UInt64,
            "TYPE_FP16" => DType::Fp16,
            "TYPE_FP32" => DType::Fp32,
            "TYPE_FP64" => DType::Fp64,
            "TYPE_STRING" => DType::Bytes,
            other => return Err(Error::Config(format!("unknown data_type '{other}'"))),
        })
    }

    /// Bytes per element. `None` for the variable-length string encoding.
    pub fn element_width(self) -> Option<usize> {
        Some(match self {
            DType::Bool | DType::Int8 | DType::UInt8 => 1,
            DType::Int16 | DType::UInt16 | DType::Fp16 => 2,
            DType::Int32 | DType::UInt32 | DType::Fp32 => 4,
            DType::Int64 | DType::UInt64 | DType::Fp64 => 8,
            DType::Bytes => return None,
        })
    }

    /// The array-interface typestr (byte order + kind + width) for fixed-width
    /// dtypes. String columns get a per-request `<U{n}` typestr instead.
    pub fn typestr(self) -> Result<&'static str> {
        Ok(match self {
            DType::Bool => "|b1",
            DType::Int8 => "<i1",
            DType::Int16 => "<i2",
            DType::Int32 => "<i4",
            DType::Int64 => "<i8",
            DType::UInt8 => "<u1",
            DType::UInt16 => "<u2",
            DType::UInt32 => "<u4",
            DType::UInt64 => "<u8",
            DType::Fp16 => "<f2",
            DType::Fp32 => "<f4",
            DType::Fp64 => "<f8",
            DType::Bytes => {
                return Err(Error::UnsupportedDtype(
                    "variable-length strings have no fixed typestr".into(),
                ))
            }
        })
    }

    /// The numpy dtype name handed to the workflow's `initialize` call.
    pub fn numpy_name(self) -> &'static str {
        match self {
            DType::Bool => "bool",
            DType::Int8 => "int8",
            DType::Int16 => "int16",
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::UInt8 => "uint8",
            DType::UInt16 => "uint16",
            DType::UInt32 => "uint32",
            DType::UInt64 => "uint64",
            DType::Fp16 => "float16",
            DType::Fp32 => "float32",
            DType::Fp64 => "float64",
            DType::Bytes => "str",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_strings_round_trip() {
        for (s, dtype) in [
            ("TYPE_BOOL", DType::Bool),
            ("TYPE_INT64", DType::Int64),
            ("TYPE_UINT16", DType::UInt16),
            ("TYPE_FP32", DType::Fp32),
            ("TYPE_STRING", DType::Bytes),
        ] {
            assert_eq!(DType::from_config_str(s).unwrap(), dtype);
        }
        assert!(matches!(
            DType::from_config_str("TYPE_COMPLEX64"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn typestr_width_agrees_with_element_width() {
        let all = [
            DType::Bool,
            DType::Int8,
            DType::Int16,
            DType::Int32,
            DType::Int64,
            DType::UInt8,
            DType::UInt16,
            DType::UInt32,
            DType::UInt64,
            DType::Fp16,
            DType::Fp32,
            DType::Fp64,
        ];
        for dtype in all {
            let ts = dtype.typestr().unwrap();
            let width: usize = ts[2..].parse().unwrap();
            assert_eq!(width, dtype.element_width().unwrap(), "{ts}");
        }
        assert!(DType::Bytes.typestr().is_err());
        assert_eq!(DType::Bytes.element_width(), None);
    }
}
