//! Log record format for the on-disk engine
//!
//! Each record carries one batch of operations and is applied atomically on
//! replay:
//!
//! ```text
//! +------------------+
//! | Record Length    | (u32 LE, whole record including this field)
//! +------------------+
//! | Op Count         | (u32 LE)
//! +------------------+
//! | Op 1..n          | kind (u8: 1 = put, 2 = delete)
//! |                  | key (u32 LE length + bytes)
//! |                  | value (u32 LE length + bytes, empty for delete)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 over everything before it)
//! +------------------+
//! ```

use std::io::{self, Cursor, Read};

use crc32fast::Hasher;

use super::engine::BatchOp;

const OP_PUT: u8 = 1;
const OP_DELETE: u8 = 2;

/// Length + op count + checksum
pub(crate) const MIN_RECORD_SIZE: usize = 4 + 4 + 4;

/// Computes a CRC32 (IEEE) checksum over the provided data.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// One atomic batch as stored in the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Operations in application order
    pub ops: Vec<BatchOp>,
}

impl LogRecord {
    /// Wraps a batch
    pub fn new(ops: Vec<BatchOp>) -> Self {
        Self { ops }
    }

    fn serialize_body(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(self.ops.len() as u32).to_le_bytes());

        for op in &self.ops {
            let (kind, key, value): (u8, &[u8], &[u8]) = match op {
                BatchOp::Put { key, value } => (OP_PUT, key.as_slice(), value.as_slice()),
                BatchOp::Delete { key } => (OP_DELETE, key.as_slice(), &[][..]),
            };
            buf.push(kind);
            buf.extend_from_slice(&(key.len() as u32).to_le_bytes());
            buf.extend_from_slice(key);
            buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
            buf.extend_from_slice(value);
        }

        buf
    }

    /// Serialize the complete record to bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let body = self.serialize_body();
        let record_length = (4 + body.len() + 4) as u32;

        let mut record = Vec::with_capacity(record_length as usize);
        record.extend_from_slice(&record_length.to_le_bytes());
        record.extend_from_slice(&body);

        let checksum = compute_checksum(&record);
        record.extend_from_slice(&checksum.to_le_bytes());

        record
    }

    /// Deserialize a record from bytes, verifying the checksum.
    ///
    /// Returns the record and the number of bytes consumed.
    pub fn deserialize(data: &[u8]) -> io::Result<(Self, usize)> {
        if data.len() < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "Record too short",
            ));
        }

        let record_length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;

        if record_length < MIN_RECORD_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid record length: {}", record_length),
            ));
        }

        if data.len() < record_length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "Record truncated: expected {} bytes, got {}",
                    record_length,
                    data.len()
                ),
            ));
        }

        let checksum_offset = record_length - 4;
        let stored = u32::from_le_bytes([
            data[checksum_offset],
            data[checksum_offset + 1],
            data[checksum_offset + 2],
            data[checksum_offset + 3],
        ]);
        let computed = compute_checksum(&data[..checksum_offset]);

        if computed != stored {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Checksum mismatch: computed {:08x}, stored {:08x}",
                    computed, stored
                ),
            ));
        }

        let body = &data[4..checksum_offset];
        let mut cursor = Cursor::new(body);

        let op_count = read_u32(&mut cursor)? as usize;
        let mut ops = Vec::with_capacity(op_count.min(body.len()));

        for _ in 0..op_count {
            let mut kind = [0u8; 1];
            cursor.read_exact(&mut kind)?;
            let key = read_bytes(&mut cursor)?;
            let value = read_bytes(&mut cursor)?;

            ops.push(match kind[0] {
                OP_PUT => BatchOp::Put { key, value },
                OP_DELETE => BatchOp::Delete { key },
                other => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("Unknown op kind: {}", other),
                    ))
                }
            });
        }

        if cursor.position() as usize != body.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "Trailing bytes after last op",
            ));
        }

        Ok((Self { ops }, record_length))
    }
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_bytes(cursor: &mut Cursor<&[u8]>) -> io::Result<Vec<u8>> {
    let len = read_u32(cursor)? as usize;
    let remaining = cursor.get_ref().len() - cursor.position() as usize;
    if len > remaining {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Field length {} exceeds remaining {} bytes", len, remaining),
        ));
    }
    let mut buf = vec![0u8; len];
    cursor.read_exact(&mut buf)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LogRecord {
        LogRecord::new(vec![
            BatchOp::Put {
                key: b"\x01key".to_vec(),
                value: br#"{"id":1}"#.to_vec(),
            },
            BatchOp::Delete {
                key: b"\x02gone".to_vec(),
            },
        ])
    }

    #[test]
    fn test_record_roundtrip() {
        let record = sample();
        let serialized = record.serialize();
        let (back, consumed) = LogRecord::deserialize(&serialized).unwrap();

        assert_eq!(back, record);
        assert_eq!(consumed, serialized.len());
    }

    #[test]
    fn test_empty_batch_roundtrip() {
        let record = LogRecord::new(Vec::new());
        let serialized = record.serialize();
        assert_eq!(serialized.len(), MIN_RECORD_SIZE);
        assert_eq!(LogRecord::deserialize(&serialized).unwrap().0, record);
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let mut serialized = sample().serialize();
        let mid = serialized.len() / 2;
        serialized[mid] ^= 0xFF;

        let err = LogRecord::deserialize(&serialized).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_truncated_record_rejected() {
        let serialized = sample().serialize();
        let err = LogRecord::deserialize(&serialized[..serialized.len() - 1]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn test_checksum_deterministic() {
        assert_eq!(compute_checksum(b"depot"), compute_checksum(b"depot"));
        assert_ne!(compute_checksum(b"depot"), compute_checksum(b"depoT"));
    }
}
