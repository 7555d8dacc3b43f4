//! Streaming CRC-32 over file contents.
//!
//! Files are read in fixed-size chunks so working memory stays constant no
//! matter how large the file is. The checksum catches accidental or incidental
//! modification only; it is not a defense against a deliberate second preimage.

use std::io::{ErrorKind, Read};

/// Read buffer size: one common page.
pub const CHUNK_SIZE: usize = 4096;

/// Compute the CRC-32 of everything `reader` yields.
///
/// `Interrupted` reads are retried. Any other read error aborts the
/// computation; callers must treat the file as unreadable, never as checksum 0.
pub fn checksum_reader<R: Read>(mut reader: R) -> std::io::Result<u32> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buffer[..n]),
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(hasher.finalize())
}

/// Checksum of an in-memory buffer, identical to streaming the same bytes.
#[must_use]
pub fn checksum_bytes(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Render a checksum the way the report does: uppercase hex, no padding.
#[must_use]
pub fn format_checksum(checksum: u32) -> String {
    format!("{checksum:X}")
}
