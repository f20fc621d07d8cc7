//! Bounds-checked DER framing
//!
//! Reads only tag/length headers. Every declared length is checked against
//! the bytes actually present before a structure parser sees the buffer.

use error_common::CredentialError;

const TAG_SEQUENCE: u8 = 0x30;

/// Largest length-of-length accepted (4 bytes covers any realistic structure)
const MAX_LENGTH_OCTETS: usize = 4;

/// Returns the total encoded size (header + contents) of the DER element at
/// the start of `input`.
pub fn element_len(input: &[u8]) -> Result<usize, CredentialError> {
    let (&tag, rest) = input
        .split_first()
        .ok_or_else(|| CredentialError::malformed("empty DER input"))?;
    if tag & 0x1f == 0x1f {
        return Err(CredentialError::malformed("multi-byte DER tags are not supported"));
    }

    let (&first, rest) = rest
        .split_first()
        .ok_or_else(|| CredentialError::malformed("truncated DER length"))?;

    let (content_len, header_len) = if first & 0x80 == 0 {
        (usize::from(first), 2)
    } else {
        let octets = usize::from(first & 0x7f);
        if octets == 0 {
            return Err(CredentialError::malformed("indefinite DER length"));
        }
        if octets > MAX_LENGTH_OCTETS {
            return Err(CredentialError::malformed("DER length field too large"));
        }
        let bytes = rest
            .get(..octets)
            .ok_or_else(|| CredentialError::malformed("truncated DER length"))?;
        if bytes.first() == Some(&0) {
            return Err(CredentialError::malformed("non-minimal DER length"));
        }
        let len = bytes
            .iter()
            .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));
        if len < 0x80 {
            return Err(CredentialError::malformed("non-minimal DER length"));
        }
        (len, 2 + octets)
    };

    let total = header_len
        .checked_add(content_len)
        .ok_or_else(|| CredentialError::malformed("DER length overflow"))?;
    if total > input.len() {
        return Err(CredentialError::malformed(format!(
            "DER element declares {} bytes but only {} are present",
            total,
            input.len()
        )));
    }
    Ok(total)
}

/// Split a buffer of back-to-back DER SEQUENCE elements.
pub fn split_sequences(input: &[u8]) -> Result<Vec<&[u8]>, CredentialError> {
    let mut elements = Vec::new();
    let mut rest = input;
    while !rest.is_empty() {
        if rest.first() != Some(&TAG_SEQUENCE) {
            return Err(CredentialError::malformed("expected a DER SEQUENCE"));
        }
        let len = element_len(rest)?;
        let (element, tail) = rest.split_at(len);
        elements.push(element);
        rest = tail;
    }
    if elements.is_empty() {
        return Err(CredentialError::malformed("no DER elements found"));
    }
    Ok(elements)
}

/// Require `input` to hold exactly one DER SEQUENCE.
pub fn single_sequence(input: &[u8]) -> Result<&[u8], CredentialError> {
    if input.first() != Some(&TAG_SEQUENCE) {
        return Err(CredentialError::malformed("expected a DER SEQUENCE"));
    }
    let len = element_len(input)?;
    if len != input.len() {
        return Err(CredentialError::malformed(format!(
            "{} trailing bytes after DER structure",
            input.len() - len
        )));
    }
    Ok(input)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form_length() {
        assert_eq!(element_len(&[0x30, 0x02, 0x05, 0x00]).unwrap(), 4);
    }

    #[test]
    fn test_long_form_length() {
        let mut input = vec![0x30, 0x81, 0x80];
        input.extend(std::iter::repeat(0u8).take(0x80));
        assert_eq!(element_len(&input).unwrap(), 0x83);
    }

    #[test]
    fn test_declared_length_beyond_buffer_is_rejected() {
        // Claims 0xFFFF content bytes with only two present
        let input = [0x30, 0x82, 0xff, 0xff, 0x00, 0x00];
        assert!(matches!(element_len(&input), Err(CredentialError::MalformedInput(_))));
    }

    #[test]
    fn test_indefinite_and_oversized_lengths_are_rejected() {
        assert!(element_len(&[0x30, 0x80, 0x00, 0x00]).is_err());
        assert!(element_len(&[0x30, 0x85, 1, 2, 3, 4, 5]).is_err());
        assert!(element_len(&[0x30, 0x81, 0x05, 0, 0, 0, 0, 0]).is_err());
    }

    #[test]
    fn test_split_sequences() {
        let input = [0x30, 0x00, 0x30, 0x01, 0x05];
        let parts = split_sequences(&input).unwrap();
        assert_eq!(parts, vec![&[0x30, 0x00][..], &[0x30, 0x01, 0x05][..]]);
    }

    #[test]
    fn test_split_sequences_rejects_truncated_tail() {
        let input = [0x30, 0x00, 0x30, 0x05, 0x05];
        assert!(split_sequences(&input).is_err());
        assert!(split_sequences(&[]).is_err());
    }

    #[test]
    fn test_single_sequence_rejects_trailing_bytes() {
        assert!(single_sequence(&[0x30, 0x00]).is_ok());
        assert!(single_sequence(&[0x30, 0x00, 0x00]).is_err());
        assert!(single_sequence(&[0x02, 0x01, 0x00]).is_err());
    }
}
