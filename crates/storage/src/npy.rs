//! NumPy `.npy` (format version 1.0) encoding.

use acquisition::PixelBuffer;
use sat_common::DataType;

use crate::error::{SaveError, SaveResult};

const MAGIC: &[u8] = b"\x93NUMPY";

/// Header lengths are padded so the data starts on this boundary.
const ALIGNMENT: usize = 64;

fn descr(dtype: DataType) -> &'static str {
    match dtype {
        DataType::UInt8 => "|u1",
        DataType::UInt16 => "<u2",
        DataType::Int16 => "<i2",
        DataType::Float32 => "<f4",
    }
}

fn shape_tuple(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({},)", single),
        dims => format!(
            "({})",
            dims.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Encode `buffer` as a C-ordered array of `shape`.
pub fn encode_npy(buffer: &PixelBuffer, shape: &[usize]) -> SaveResult<Vec<u8>> {
    let expected: usize = shape.iter().product();
    if expected != buffer.len() {
        return Err(SaveError::Encode(format!(
            "shape {:?} needs {} values, buffer has {}",
            shape,
            expected,
            buffer.len()
        )));
    }

    let mut header = format!(
        "{{'descr': '{}', 'fortran_order': False, 'shape': {}, }}",
        descr(buffer.dtype()),
        shape_tuple(shape)
    );
    // magic + version + u16 length + header + newline
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| SaveError::Encode(format!("npy header too long for shape {:?}", shape)))?;

    let body = buffer.to_le_bytes();
    let mut out = Vec::with_capacity(MAGIC.len() + 4 + header.len() + body.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&[1, 0]);
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_of(bytes: &[u8]) -> &str {
        let len = u16::from_le_bytes([bytes[8], bytes[9]]) as usize;
        std::str::from_utf8(&bytes[10..10 + len]).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let buffer = PixelBuffer::UInt16(vec![1, 2, 3, 4, 5, 6]);
        let bytes = encode_npy(&buffer, &[2, 3]).unwrap();

        assert_eq!(&bytes[..6], MAGIC);
        assert_eq!(&bytes[6..8], &[1, 0]);
        let header = header_of(&bytes);
        assert!(header.starts_with("{'descr': '<u2', 'fortran_order': False, 'shape': (2, 3), }"));
        assert!(header.ends_with('\n'));
        assert_eq!((10 + header.len()) % ALIGNMENT, 0);

        let data = &bytes[10 + header.len()..];
        assert_eq!(data.len(), 12);
        assert_eq!(&data[..4], &[1, 0, 2, 0]);
    }

    #[test]
    fn test_descr_per_dtype() {
        let cases = [
            (PixelBuffer::UInt8(vec![0]), "|u1"),
            (PixelBuffer::Int16(vec![-1]), "<i2"),
            (PixelBuffer::Float32(vec![0.5]), "<f4"),
        ];
        for (buffer, expected) in cases {
            let bytes = encode_npy(&buffer, &[1]).unwrap();
            let header = header_of(&bytes);
            assert!(header.contains(expected), "{}", header);
            assert!(header.contains("'shape': (1,)"));
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let buffer = PixelBuffer::UInt8(vec![0; 5]);
        assert!(encode_npy(&buffer, &[2, 3]).is_err());
    }
}
