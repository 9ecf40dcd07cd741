use rand::RngExt;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Fill a fixed-size buffer from the thread-local generator.
fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    let mut rng = rand::rng();
    rng.fill(&mut bytes);
    bytes
}

/// Draw a random `u32` from the thread-local generator.
pub fn random_u32() -> u32 {
    u32::from_le_bytes(random_bytes::<4>())
}

/// Generate a random RFC4122 v4 GUID as raw 16 bytes
pub fn generate_guid_bytes() -> [u8; 16] {
    let mut bytes = random_bytes::<16>();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;
    bytes
}

/// Generate a random GUID in the form {XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}
///
/// Section lists identify each section by one of these.
pub fn generate_guid_braced() -> String {
    format_guid_braced(&generate_guid_bytes())
}

/// Format raw GUID bytes as a braced, upper-case string.
pub fn format_guid_braced(bytes: &[u8; 16]) -> String {
    let mut out = String::with_capacity(38);
    out.push('{');
    for (i, b) in bytes.iter().enumerate() {
        if matches!(i, 4 | 6 | 8 | 10) {
            out.push('-');
        }
        out.push(HEX_UPPER[(b >> 4) as usize] as char);
        out.push(HEX_UPPER[(b & 0x0f) as usize] as char);
    }
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_guid_braced_format() {
        let s = generate_guid_braced();
        assert_eq!(s.len(), 38);
        assert!(s.starts_with('{'));
        assert!(s.ends_with('}'));
        for dash in [9, 14, 19, 24] {
            assert_eq!(&s[dash..dash + 1], "-");
        }
        for (i, ch) in s.chars().enumerate() {
            if matches!(i, 0 | 37 | 9 | 14 | 19 | 24) {
                continue;
            }
            assert!(ch.is_ascii_hexdigit());
            assert!(!ch.is_ascii_lowercase());
        }
    }

    #[test]
    fn test_format_guid_braced_known_bytes() {
        let bytes = [
            0x52, 0x14, 0x15, 0xD9, 0x36, 0xF7, 0x43, 0xE2, 0xAB, 0x2F, 0xB9, 0x0A, 0xF2, 0x6B,
            0x5E, 0x84,
        ];
        assert_eq!(
            format_guid_braced(&bytes),
            "{521415D9-36F7-43E2-AB2F-B90AF26B5E84}"
        );
    }

    #[test]
    fn test_guids_differ() {
        assert_ne!(generate_guid_braced(), generate_guid_braced());
    }
}
