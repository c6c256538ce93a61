//! XOR-RLE compression for Quetzal CMem chunks
//!
//! The compression works by XORing the current memory with the original
//! story file, then run-length encoding the zeros. A zero byte is followed
//! by a count n standing for n + 1 unchanged bytes; a run that reaches the
//! end of memory is left out entirely.

use log::debug;

use crate::error::SaveError;

fn malformed(reason: String) -> SaveError {
    SaveError::Malformed {
        chunk: "CMem",
        reason,
    }
}

/// Compress dynamic memory against the original image
pub fn compress_memory(current: &[u8], original: &[u8]) -> Result<Vec<u8>, SaveError> {
    if current.len() != original.len() {
        return Err(SaveError::MemorySizeMismatch {
            saved: current.len(),
            expected: original.len(),
        });
    }

    let mut compressed = Vec::new();
    let mut i = 0;

    while i < current.len() {
        let xor_byte = current[i] ^ original[i];
        if xor_byte != 0 {
            compressed.push(xor_byte);
            i += 1;
            continue;
        }

        let start = i;
        while i < current.len() && current[i] == original[i] {
            i += 1;
        }
        if i == current.len() {
            // trailing unchanged bytes are implied
            break;
        }

        let mut remaining = i - start;
        while remaining > 256 {
            compressed.push(0);
            compressed.push(255);
            remaining -= 256;
        }
        compressed.push(0);
        compressed.push((remaining - 1) as u8);
    }

    debug!(
        "Compressed {} bytes to {} bytes",
        current.len(),
        compressed.len()
    );
    Ok(compressed)
}

/// Rebuild dynamic memory from compressed data and the original image
pub fn decompress_memory(compressed: &[u8], original: &[u8]) -> Result<Vec<u8>, SaveError> {
    let mut decompressed = Vec::with_capacity(original.len());
    let mut bytes = compressed.iter();

    while let Some(&byte) = bytes.next() {
        if byte == 0 {
            let count = *bytes
                .next()
                .ok_or_else(|| malformed("run of zeros without a length".to_string()))?;
            let run_end = decompressed.len() + count as usize + 1;
            if run_end > original.len() {
                return Err(malformed(format!(
                    "run ends at {:#06x}, past dynamic memory ({:#06x} bytes)",
                    run_end,
                    original.len()
                )));
            }
            let start = decompressed.len();
            decompressed.extend_from_slice(&original[start..run_end]);
        } else {
            let index = decompressed.len();
            let base = original.get(index).ok_or_else(|| {
                malformed(format!(
                    "data continues past dynamic memory ({:#06x} bytes)",
                    original.len()
                ))
            })?;
            decompressed.push(base ^ byte);
        }
    }

    let filled = decompressed.len();
    decompressed.extend_from_slice(&original[filled..]);
    Ok(decompressed)
}
