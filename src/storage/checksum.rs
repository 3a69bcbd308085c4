//! CRC32 checksums for table file headers and page frames
//!
//! Uses CRC32 (IEEE polynomial). Every load verifies; a mismatch aborts the load.

use crc32fast::Hasher;

/// Computes a CRC32 checksum over the provided data.
///
/// This function is deterministic: the same input always produces the same output.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Verifies that the computed checksum matches the expected checksum.
pub fn verify_checksum(data: &[u8], expected: u32) -> bool {
    compute_checksum(data) == expected
}

/// Checksum of a page frame body: `[u32 used][page bytes, zero-padded to page_size]`.
///
/// Hashes incrementally, so callers need not materialize the padding.
pub fn frame_checksum(used: usize, page_bytes: &[u8], page_size: usize) -> u32 {
    const ZEROS: [u8; 64] = [0; 64];

    let mut hasher = Hasher::new();
    hasher.update(&(used as u32).to_le_bytes());
    hasher.update(page_bytes);
    let mut pad = page_size.saturating_sub(page_bytes.len());
    while pad > 0 {
        let n = pad.min(ZEROS.len());
        hasher.update(&ZEROS[..n]);
        pad -= n;
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::page::Page;

    fn frame_body(page: &Page, page_size: usize) -> Vec<u8> {
        let mut body = (page.used() as u32).to_le_bytes().to_vec();
        body.extend_from_slice(page.as_bytes());
        body.resize(4 + page_size, 0);
        body
    }

    #[test]
    fn test_frame_checksum_matches_padded_body() {
        let mut page = Page::new(200);
        page.append(b"string[eng] int[30]").unwrap();
        page.append(b"string[sales] int[5]").unwrap();

        let body = frame_body(&page, 200);
        let crc = frame_checksum(page.used(), page.as_bytes(), 200);
        assert_eq!(crc, compute_checksum(&body));
        assert!(verify_checksum(&body, crc));
    }

    #[test]
    fn test_frame_checksum_covers_used_length() {
        let mut page = Page::new(64);
        page.append(&[7u8; 10]).unwrap();
        let crc = frame_checksum(page.used(), page.as_bytes(), 64);

        let mut body = frame_body(&page, 64);
        // A truncated used-length must not verify, even with identical bytes
        body[0] ^= 0x01;
        assert!(!verify_checksum(&body, crc));
        assert_ne!(crc, frame_checksum(page.used() - 1, page.as_bytes(), 64));
    }

    #[test]
    fn test_empty_frame_is_all_padding() {
        let page = Page::new(128);
        assert_eq!(page.used(), 0);
        assert_eq!(
            frame_checksum(0, page.as_bytes(), 128),
            compute_checksum(&[0u8; 4 + 128])
        );
    }

    #[test]
    fn test_verify_checksum() {
        let data = b"AGG\x01header";
        let checksum = compute_checksum(data);
        assert!(verify_checksum(data, checksum));
        assert!(!verify_checksum(data, checksum ^ 1));
    }
}
