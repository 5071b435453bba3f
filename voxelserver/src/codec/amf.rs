//! AMF3 `Vector.<uint>` encoding.
//!
//! Layout: marker byte `0x0E`, a U29 header `count << 1 | 1` (inline value),
//! a fixed-length flag byte, then `count` big-endian `u32` values.

use super::PayloadError;

/// AMF3 marker for `Vector.<uint>`.
pub const VECTOR_UINT_MARKER: u8 = 0x0E;

/// Largest value representable as a U29.
pub const U29_MAX: u32 = (1 << 29) - 1;

/// Append a U29 variable-length integer.
pub fn write_u29(out: &mut Vec<u8>, value: u32) -> Result<(), PayloadError> {
    match value {
        0..=0x7F => out.push(value as u8),
        0x80..=0x3FFF => {
            out.push(((value >> 7) as u8) | 0x80);
            out.push((value & 0x7F) as u8);
        }
        0x4000..=0x1F_FFFF => {
            out.push(((value >> 14) as u8) | 0x80);
            out.push((((value >> 7) & 0x7F) as u8) | 0x80);
            out.push((value & 0x7F) as u8);
        }
        0x20_0000..=U29_MAX => {
            out.push(((value >> 22) as u8) | 0x80);
            out.push((((value >> 15) & 0x7F) as u8) | 0x80);
            out.push((((value >> 8) & 0x7F) as u8) | 0x80);
            out.push(value as u8);
        }
        _ => return Err(PayloadError::U29Overflow(value)),
    }
    Ok(())
}

/// Read a U29 from the front of `input`, returning the value and bytes used.
pub fn read_u29(input: &[u8]) -> Result<(u32, usize), PayloadError> {
    let mut value: u32 = 0;
    for i in 0..3 {
        let byte = *input.get(i).ok_or(PayloadError::Truncated)?;
        if byte & 0x80 == 0 {
            return Ok(((value << 7) | byte as u32, i + 1));
        }
        value = (value << 7) | (byte & 0x7F) as u32;
    }
    let byte = *input.get(3).ok_or(PayloadError::Truncated)?;
    Ok(((value << 8) | byte as u32, 4))
}

/// Append `values` as an AMF3 `Vector.<uint>`.
pub fn write_uint_vector(out: &mut Vec<u8>, values: &[u32]) -> Result<(), PayloadError> {
    let count = u32::try_from(values.len())
        .ok()
        .filter(|&n| n <= U29_MAX >> 1)
        .ok_or(PayloadError::VectorTooLong(values.len()))?;

    out.reserve(values.len() * 4 + 6);
    out.push(VECTOR_UINT_MARKER);
    write_u29(out, (count << 1) | 1)?;
    out.push(0x00);
    for &value in values {
        out.extend_from_slice(&value.to_be_bytes());
    }
    Ok(())
}

/// Read an AMF3 `Vector.<uint>` from the front of `input`.
pub fn read_uint_vector(input: &[u8]) -> Result<(Vec<u32>, usize), PayloadError> {
    let marker = *input.first().ok_or(PayloadError::Truncated)?;
    if marker != VECTOR_UINT_MARKER {
        return Err(PayloadError::UnexpectedMarker(marker));
    }
    let (header, used) = read_u29(&input[1..])?;
    if header & 1 == 0 {
        return Err(PayloadError::ReferenceNotSupported);
    }
    let count = (header >> 1) as usize;

    let start = 1 + used + 1;
    let end = start + count * 4;
    if input.len() < end {
        return Err(PayloadError::Truncated);
    }
    let values = input[start..end]
        .chunks_exact(4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((values, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u29_boundaries() {
        for value in [0, 0x7F, 0x80, 0x3FFF, 0x4000, 0x1F_FFFF, 0x20_0000, U29_MAX] {
            let mut out = Vec::new();
            write_u29(&mut out, value).unwrap();
            assert_eq!(read_u29(&out).unwrap(), (value, out.len()));
        }
    }

    #[test]
    fn test_u29_lengths() {
        let len = |v| {
            let mut out = Vec::new();
            write_u29(&mut out, v).unwrap();
            out.len()
        };
        assert_eq!(len(0x7F), 1);
        assert_eq!(len(0x80), 2);
        assert_eq!(len(0x4000), 3);
        assert_eq!(len(0x20_0000), 4);
    }

    #[test]
    fn test_u29_overflow() {
        let mut out = Vec::new();
        assert_eq!(
            write_u29(&mut out, U29_MAX + 1),
            Err(PayloadError::U29Overflow(U29_MAX + 1))
        );
    }

    #[test]
    fn test_vector_layout() {
        let mut out = Vec::new();
        write_uint_vector(&mut out, &[1, 0x0102_0304]).unwrap();
        assert_eq!(
            out,
            vec![0x0E, 0x05, 0x00, 0, 0, 0, 1, 0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn test_empty_vector() {
        let mut out = Vec::new();
        write_uint_vector(&mut out, &[]).unwrap();
        assert_eq!(out, vec![0x0E, 0x01, 0x00]);
        assert_eq!(read_uint_vector(&out).unwrap(), (vec![], 3));
    }

    #[test]
    fn test_rejects_wrong_marker() {
        assert_eq!(
            read_uint_vector(&[0x0D, 0x01, 0x00]),
            Err(PayloadError::UnexpectedMarker(0x0D))
        );
    }

    #[test]
    fn test_rejects_truncated_body() {
        assert_eq!(
            read_uint_vector(&[0x0E, 0x05, 0x00, 0, 0, 0, 1]),
            Err(PayloadError::Truncated)
        );
    }
}
