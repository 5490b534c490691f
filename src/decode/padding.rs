//! Padding checks for word-aligned values
//!
//! Each check takes the full bytes read from state and the number of bytes
//! the value actually occupies. Bytes outside that window are padding.

/// Padding on the left must be zero (unsigned integers, addresses, ...)
pub fn check_padding_left(bytes: &[u8], length: usize) -> bool {
    let padding = bytes.len().saturating_sub(length);
    bytes[..padding].iter().all(|&b| b == 0)
}

/// Padding on the right must be zero (static bytes, external functions)
pub fn check_padding_right(bytes: &[u8], length: usize) -> bool {
    let start = length.min(bytes.len());
    bytes[start..].iter().all(|&b| b == 0)
}

/// Padding on the left must sign-extend the value: 0xff when its top bit is
/// set, 0x00 otherwise
pub fn check_padding_signed(bytes: &[u8], length: usize) -> bool {
    let padding = bytes.len().saturating_sub(length);
    if padding == 0 {
        return true;
    }
    if length == 0 {
        return bytes.iter().all(|&b| b == 0);
    }
    let fill = if bytes[padding] & 0x80 != 0 { 0xff } else { 0x00 };
    bytes[..padding].iter().all(|&b| b == fill)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(tail: &[u8], fill: u8) -> Vec<u8> {
        let mut bytes = vec![fill; 32 - tail.len()];
        bytes.extend_from_slice(tail);
        bytes
    }

    #[test]
    fn test_left_padding() {
        assert!(check_padding_left(&word(&[0xff], 0), 1));
        assert!(!check_padding_left(&word(&[0x01, 0xff], 0), 1));
        assert!(check_padding_left(&word(&[0x01, 0xff], 0), 2));
        // nothing to check when the value fills the window
        assert!(check_padding_left(&[0xff; 4], 4));
        assert!(check_padding_left(&[0xff; 4], 8));
    }

    #[test]
    fn test_right_padding() {
        let mut bytes = vec![0xab, 0xcd];
        bytes.extend([0u8; 30]);
        assert!(check_padding_right(&bytes, 2));
        assert!(!check_padding_right(&bytes, 1));

        bytes[31] = 1;
        assert!(!check_padding_right(&bytes, 2));
        assert!(check_padding_right(&bytes, 32));
    }

    #[test]
    fn test_signed_padding() {
        // -1 as int8
        assert!(check_padding_signed(&word(&[0xff], 0xff), 1));
        // 0x7f as int8 must be zero-extended
        assert!(check_padding_signed(&word(&[0x7f], 0x00), 1));
        assert!(!check_padding_signed(&word(&[0x7f], 0xff), 1));
        // negative value with zero padding
        assert!(!check_padding_signed(&word(&[0x80], 0x00), 1));
        // mixed padding
        let mut bytes = word(&[0x80], 0xff);
        bytes[0] = 0x00;
        assert!(!check_padding_signed(&bytes, 1));
    }
}
