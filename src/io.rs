use std::{
    convert::TryInto,
    fs::{File, OpenOptions},
    io::{Read, Seek, SeekFrom, Write},
    mem::size_of,
    path::Path,
};

use crate::{error::DbError, types::DbResult};

/// A read/write file handle with the seek arithmetic the storage
/// layer needs. Opened once, shared behind the owner's mutex.
pub struct DbFile {
    file: File,
}

impl DbFile {
    pub fn new<P: AsRef<Path>>(file_path: P) -> Result<Self, DbError> {
        let file = OpenOptions::new()
            .write(true)
            .read(true)
            .create(true)
            .open(file_path)?;

        Ok(Self { file })
    }

    pub fn get_size(&self) -> Result<u64, DbError> {
        let metadata = self.file.metadata()?;
        Ok(metadata.len())
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, DbError> {
        Ok(self.file.seek(pos)?)
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> DbResult {
        self.file.read_exact(buf)?;
        Ok(())
    }

    pub fn write_all(&mut self, buf: &[u8]) -> DbResult {
        self.file.write_all(buf)?;
        Ok(())
    }

    pub fn flush(&mut self) -> DbResult {
        self.file.flush()?;
        Ok(())
    }

    pub fn set_len(&self, len: u64) -> DbResult {
        self.file.set_len(len)?;
        Ok(())
    }
}

pub fn read_into<T: Decodeable, R: Read>(reader: &mut R) -> T {
    T::decode_from(reader)
}

pub fn read_exact<R: Read>(reader: &mut R, bytes_count: usize) -> Vec<u8> {
    let mut buffer = vec![0u8; bytes_count];
    reader
        .read_exact(&mut buffer)
        .unwrap_or_else(|e| panic!("io error, expect {} bytes: {}", bytes_count, e));
    buffer
}

/// In-memory byte sink used to build page images and log records.
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn write<T: Encodeable>(&mut self, obj: &T) {
        self.buf.extend_from_slice(obj.encode().as_slice());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn size(&self) -> usize {
        self.buf.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.buf.clone()
    }

    pub fn to_padded_bytes(&self, size: usize) -> Vec<u8> {
        let mut buf = self.buf.clone();

        if buf.len() > size {
            panic!(
                "buffer size is larger than the given size: {} > {}",
                buf.len(),
                size
            );
        }

        buf.resize(size, 0);
        buf
    }
}

pub trait Encodeable {
    fn encode(&self) -> Vec<u8>;
}

pub trait Decodeable {
    fn decode_from<R: Read>(reader: &mut R) -> Self;
}

/// # Format
///
/// - 1 byte (0 for false, 1 for true)
impl Encodeable for bool {
    fn encode(&self) -> Vec<u8> {
        vec![*self as u8]
    }
}

impl Decodeable for bool {
    fn decode_from<R: Read>(reader: &mut R) -> Self {
        u8::decode_from(reader) == 1
    }
}

// All fixed-width integers go over the wire big-endian, matching the
// on-disk page format.
macro_rules! impl_serialization {
    (for $($t:ty),+) => {
        $(
            impl Encodeable for $t {
                fn encode(&self) -> Vec<u8> {
                    self.to_be_bytes().to_vec()
                }
            }

            impl Decodeable for $t {
                fn decode_from<R: Read>(reader: &mut R) -> Self {
                    let bytes = read_exact(reader, size_of::<Self>());
                    Self::from_be_bytes(bytes.try_into().unwrap())
                }
            }
        )*
    }
}

impl_serialization!(for u8, u16, u32, u64, i8, i16, i32, i64, usize);

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn test_int_round_trip() {
        let mut writer = ByteWriter::new();
        writer.write(&42i32);
        writer.write(&-7i32);

        let bytes = writer.to_bytes();
        assert_eq!(bytes.len(), 8);
        // big-endian on the wire
        assert_eq!(&bytes[..4], &[0, 0, 0, 42]);

        let mut reader = Cursor::new(bytes);
        assert_eq!(i32::decode_from(&mut reader), 42);
        assert_eq!(i32::decode_from(&mut reader), -7);
    }

    #[test]
    fn test_padded_bytes() {
        let mut writer = ByteWriter::new();
        writer.write(&1u8);
        let padded = writer.to_padded_bytes(8);
        assert_eq!(padded, vec![1, 0, 0, 0, 0, 0, 0, 0]);
    }
}
