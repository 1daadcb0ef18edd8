//! Codec for the host's variable-length string tensor encoding: each element
//! is a 4-byte little-endian length followed by that many bytes, elements
//! concatenated with no padding. The element count is only discoverable by
//! scanning forward.

use crate::{Error, Result};

const PREFIX: usize = 4;

fn read_prefix(buffer: &[u8], at: usize) -> Result<usize> {
    let Some(raw) = buffer.get(at..at + PREFIX) else {
        return Err(Error::InvalidArgument(format!(
            "truncated string tensor: length prefix at byte {at} runs past buffer of {} bytes",
            buffer.len()
        )));
    };
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as usize)
}

/// Maximum decoded string length across all elements in the buffer.
pub fn max_string_len(buffer: &[u8]) -> Result<usize> {
    let mut max = 0;
    let mut at = 0;
    while at < buffer.len() {
        let len = read_prefix(buffer, at)?;
        if at + PREFIX + len > buffer.len() {
            return Err(Error::InvalidArgument(format!(
                "truncated string tensor: element of {len} bytes at byte {at} runs past buffer"
            )));
        }
        max = max.max(len);
        at += PREFIX + len;
    }
    Ok(max)
}

/// Decode every element. Bytes are taken as-is; only used where the caller
/// interprets them (tests, diagnostics).
pub fn decode(buffer: &[u8]) -> Result<Vec<Vec<u8>>> {
    let mut out = Vec::new();
    let mut at = 0;
    while at < buffer.len() {
        let len = read_prefix(buffer, at)?;
        if at + PREFIX + len > buffer.len() {
            return Err(Error::InvalidArgument(format!(
                "truncated string tensor: element of {len} bytes at byte {at} runs past buffer"
            )));
        }
        out.push(buffer[at + PREFIX..at + PREFIX + len].to_vec());
        at += PREFIX + len;
    }
    Ok(out)
}

/// Transcode the length-prefixed buffer into a zero-filled fixed-width UCS-4
/// array of `rows * max_len` code units (little-endian u32 per unit), one
/// code unit per input byte. Non-ASCII bytes map to the same numeric code
/// point, which is only correct for ASCII input; accepted limitation.
///
/// The returned buffer backs a `<U{max_len}` array view and must outlive the
/// transform call that consumes it.
pub fn transcode_fixed_width(buffer: &[u8], rows: usize, max_len: usize) -> Result<Vec<u8>> {
    let mut out = vec![0u8; rows * max_len * 4];
    let mut at = 0;
    let mut row = 0;
    while at < buffer.len() {
        let len = read_prefix(buffer, at)?;
        if at + PREFIX + len > buffer.len() {
            return Err(Error::InvalidArgument(format!(
                "truncated string tensor: element of {len} bytes at byte {at} runs past buffer"
            )));
        }
        if row >= rows {
            return Err(Error::InvalidArgument(format!(
                "string tensor holds more than the declared {rows} elements"
            )));
        }
        if len > max_len {
            return Err(Error::InvalidArgument(format!(
                "string element of {len} bytes exceeds the computed width {max_len}"
            )));
        }
        let slot = row * max_len * 4;
        for (i, byte) in buffer[at + PREFIX..at + PREFIX + len].iter().enumerate() {
            out[slot + i * 4..slot + i * 4 + 4].copy_from_slice(&(*byte as u32).to_le_bytes());
        }
        at += PREFIX + len;
        row += 1;
    }
    Ok(out)
}

/// Encode strings into the length-prefixed wire form. Test/fixture helper.
pub fn encode<S: AsRef<[u8]>>(values: &[S]) -> Vec<u8> {
    let mut out = Vec::new();
    for v in values {
        let v = v.as_ref();
        out.extend_from_slice(&(v.len() as u32).to_le_bytes());
        out.extend_from_slice(v);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ucs4_slot(buffer: &[u8], row: usize, max_len: usize) -> Vec<u32> {
        let slot = &buffer[row * max_len * 4..(row + 1) * max_len * 4];
        slot.chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    #[test]
    fn max_len_scans_all_elements() {
        let buffer = encode(&["a", "abcd", "ab"]);
        assert_eq!(max_string_len(&buffer).unwrap(), 4);
        assert_eq!(max_string_len(&[]).unwrap(), 0);
    }

    #[test]
    fn decode_preserves_content_and_order() {
        let values = ["user_a", "", "user_bb"];
        let decoded = decode(&encode(&values)).unwrap();
        assert_eq!(decoded.len(), 3);
        for (got, want) in decoded.iter().zip(values) {
            assert_eq!(got.as_slice(), want.as_bytes());
        }
    }

    #[test]
    fn transcode_pads_with_zero_code_units() {
        let values = ["hi", "abcd"];
        let buffer = encode(&values);
        let max_len = max_string_len(&buffer).unwrap();
        let wide = transcode_fixed_width(&buffer, values.len(), max_len).unwrap();
        assert_eq!(wide.len(), 2 * 4 * 4);

        assert_eq!(ucs4_slot(&wide, 0, max_len), vec![104, 105, 0, 0]);
        assert_eq!(ucs4_slot(&wide, 1, max_len), vec![97, 98, 99, 100]);
    }

    #[test]
    fn transcode_round_trips_ascii() {
        let values = ["aaaa", "bbbb", "cccc", "aaaa"];
        let buffer = encode(&values);
        let max_len = max_string_len(&buffer).unwrap();
        let wide = transcode_fixed_width(&buffer, values.len(), max_len).unwrap();

        for (row, want) in values.iter().enumerate() {
            let units = ucs4_slot(&wide, row, max_len);
            let text: String = units
                .into_iter()
                .take_while(|u| *u != 0)
                .map(|u| char::from_u32(u).unwrap())
                .collect();
            assert_eq!(&text, want);
        }
    }

    #[test]
    fn truncated_buffers_are_rejected() {
        let mut buffer = encode(&["abc"]);
        buffer.truncate(5);
        assert!(matches!(
            max_string_len(&buffer),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(decode(&buffer), Err(Error::InvalidArgument(_))));

        // prefix that claims more bytes than remain
        let bad = 10u32.to_le_bytes().to_vec();
        assert!(max_string_len(&bad).is_err());
    }

    #[test]
    fn more_elements_than_declared_rows_is_an_error() {
        let buffer = encode(&["a", "b", "c"]);
        let err = transcode_fixed_width(&buffer, 2, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
