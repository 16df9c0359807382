//! XPay hex-plus-rotating-delimiter text codec
//!
//! Each byte becomes its lowercase hex form (a single digit for values below
//! 16) followed by a delimiter taken from a fixed rotating table. Slot 0 of
//! the table is reserved and never emitted; slots 1 through 12 are used in
//! order and then wrap back to slot 1. Some symbols appear twice in the
//! table, so the delimiter carries no position information.
//!
//! ```text
//! bytes:  0x4d   0x05  0x3d
//! text:   4d g   5 h   3d G
//! ```
//!
//! Decoding splits on any of the ten distinct delimiter symbols. Because runs
//! are delimiter-terminated the short form for small bytes round-trips, but
//! every byte must be terminated.

use crate::{Result, SigningError};

/// Delimiter table; slot 0 is never emitted
pub const DELIMITERS: [u8; 13] = [
    b'0', b'g', b'h', b'G', b'k', b'g', b'J', b'K', b'I', b'h', b'i', b'j', b'H',
];

const LAST_SLOT: usize = DELIMITERS.len() - 1;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Whether `c` terminates a hex run
pub fn is_delimiter(c: u8) -> bool {
    matches!(
        c,
        b'g' | b'h' | b'G' | b'k' | b'J' | b'K' | b'I' | b'i' | b'j' | b'H'
    )
}

/// Encode bytes into XPay text
pub fn encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 3);
    let mut slot = 0usize;

    for &b in bytes {
        slot = if slot == LAST_SLOT { 1 } else { slot + 1 };

        if b >= 16 {
            out.push(HEX_DIGITS[(b >> 4) as usize] as char);
        }
        out.push(HEX_DIGITS[(b & 0x0f) as usize] as char);
        out.push(DELIMITERS[slot] as char);
    }
    out
}

/// Decode XPay text back into bytes
pub fn decode(text: &str) -> Result<Vec<u8>> {
    let input = text.as_bytes();
    let mut out = Vec::with_capacity(input.len() / 2);
    let mut start = 0usize;

    for (pos, &c) in input.iter().enumerate() {
        if !is_delimiter(c) {
            continue;
        }
        if start == pos {
            return Err(SigningError::malformed(pos, "empty hex run before delimiter"));
        }
        out.push(parse_run(&input[start..pos], start)?);
        start = pos + 1;
    }

    if start < input.len() {
        return Err(SigningError::malformed(
            start,
            "trailing hex run without delimiter",
        ));
    }
    Ok(out)
}

/// Decode XPay text into a UTF-8 string
pub fn decode_to_string(text: &str) -> Result<String> {
    let bytes = decode(text)?;
    String::from_utf8(bytes).map_err(|e| {
        SigningError::malformed(e.utf8_error().valid_up_to(), "decoded bytes are not UTF-8")
    })
}

fn parse_run(run: &[u8], start: usize) -> Result<u8> {
    if run.len() > 2 {
        return Err(SigningError::malformed(
            start,
            format!("hex run of {} digits exceeds one byte", run.len()),
        ));
    }

    let mut value = 0u8;
    for (offset, &c) in run.iter().enumerate() {
        let digit = (c as char).to_digit(16).ok_or_else(|| {
            SigningError::malformed(start + offset, format!("invalid hex digit {:?}", c as char))
        })?;
        value = (value << 4) | digit as u8;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_empty() {
        assert_eq!(encode(&[]), "");
        assert_eq!(decode("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_encode_short_and_long_bytes() {
        assert_eq!(encode(&[0x4d, 0x05, 0x3d]), "4dg5h3dG");
        assert_eq!(encode(&[0x00, 0xff]), "0gffh");
    }

    #[test]
    fn test_encode_ascii() {
        assert_eq!(encode(b"ID=1"), "49g44h3dG31k");
    }

    #[test]
    fn test_rotation_wraps_after_twelve() {
        let encoded = encode(&[1u8; 14]);
        let delims: Vec<u8> = encoded.bytes().skip(1).step_by(2).collect();
        assert_eq!(delims.len(), 14);
        assert_eq!(&delims[..12], &DELIMITERS[1..]);
        assert_eq!(delims[12], DELIMITERS[1]);
        assert_eq!(delims[13], DELIMITERS[2]);
        assert!(!encoded.contains('0'));
    }

    #[test]
    fn test_decode_uses_any_delimiter() {
        assert_eq!(decode("4dH5K3di").unwrap(), vec![0x4d, 0x05, 0x3d]);
        assert_eq!(decode("ffj80I").unwrap(), vec![0xff, 0x80]);
    }

    #[test]
    fn test_decode_rejects_empty_run() {
        let err = decode("4dgg").unwrap_err();
        assert_eq!(
            err,
            SigningError::MalformedEncoding {
                position: 3,
                reason: "empty hex run before delimiter".into(),
            }
        );
        assert!(decode("g").is_err());
    }

    #[test]
    fn test_decode_rejects_trailing_run() {
        match decode("4dg5") {
            Err(SigningError::MalformedEncoding { position, .. }) => assert_eq!(position, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_bad_runs() {
        assert!(decode("123g").is_err());
        assert!(decode("zzg").is_err());
        assert!(decode("4 g").is_err());
    }

    #[test]
    fn test_decode_to_string() {
        let text = "RefID=R1&Curr=THB";
        assert_eq!(decode_to_string(&encode(text.as_bytes())).unwrap(), text);
        assert!(decode_to_string(&encode(&[0xff])).is_err());
    }
}
