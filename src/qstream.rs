//! Qt datastream reading and writing for tdata files
//!
//! Telegram Desktop serializes its local storage with Qt's QDataStream
//! (version Qt_5_1). All integers are Big Endian; QByteArrays are 32-bit
//! length-prefixed with 0xFFFFFFFF marking null.

use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

use crate::{Error, Result};

/// Marker for a null QByteArray
const NULL_MARKER: u32 = 0xFFFFFFFF;

/// Marker for extended 64-bit length (Qt 6.7+, not used in tdata)
const EXTENDED_LENGTH_MARKER: u32 = 0xFFFFFFFE;

/// Reader over Qt binary serialization
pub struct QtReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> QtReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Current position in the stream
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Remaining bytes count
    pub fn remaining(&self) -> usize {
        let pos = self.cursor.position() as usize;
        self.cursor.get_ref().len().saturating_sub(pos)
    }

    fn eof(&self) -> Error {
        Error::UnexpectedEof {
            offset: self.position(),
        }
    }

    /// Read an unsigned 32-bit integer (quint32)
    pub fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<BigEndian>().map_err(|_| self.eof())
    }

    /// Read a signed 32-bit integer (qint32)
    pub fn read_i32(&mut self) -> Result<i32> {
        self.cursor.read_i32::<BigEndian>().map_err(|_| self.eof())
    }

    /// Read an unsigned 64-bit integer (quint64)
    pub fn read_u64(&mut self) -> Result<u64> {
        self.cursor.read_u64::<BigEndian>().map_err(|_| self.eof())
    }

    /// Read a signed 64-bit integer (qint64)
    pub fn read_i64(&mut self) -> Result<i64> {
        self.cursor.read_i64::<BigEndian>().map_err(|_| self.eof())
    }

    /// Read raw bytes of specified length
    pub fn read_raw(&mut self, len: usize) -> Result<Vec<u8>> {
        if self.remaining() < len {
            return Err(self.eof());
        }

        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf).map_err(|_| self.eof())?;
        Ok(buf)
    }

    /// Read a QByteArray
    ///
    /// Wire format: quint32 length, then the raw data. 0xFFFFFFFF is the
    /// null array; 0xFFFFFFFE switches to a quint64 length.
    pub fn read_qbytearray(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()?;

        match len {
            NULL_MARKER => Ok(Vec::new()),
            EXTENDED_LENGTH_MARKER => {
                let real_len = self.read_u64()? as usize;
                self.read_raw(real_len)
            }
            _ => self.read_raw(len as usize),
        }
    }
}

/// Writer producing Qt binary serialization
///
/// Writes into an owned buffer, so the individual put calls cannot fail.
#[derive(Default)]
pub struct QtWriter {
    buf: Vec<u8>,
}

impl QtWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_i64(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_raw(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn put_qbytearray(&mut self, data: &[u8]) {
        self.put_u32(data.len() as u32);
        self.put_raw(data);
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_u32() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut stream = QtReader::new(&data);
        assert_eq!(stream.read_u32().unwrap(), 0x12345678);
    }

    #[test]
    fn test_read_i32() {
        let data = [0xFF, 0xFF, 0xFF, 0xFE]; // -2 in big endian
        let mut stream = QtReader::new(&data);
        assert_eq!(stream.read_i32().unwrap(), -2);
    }

    #[test]
    fn test_read_qbytearray() {
        let data = [0x00, 0x00, 0x00, 0x04, 0x01, 0x02, 0x03, 0x04];
        let mut stream = QtReader::new(&data);
        assert_eq!(
            stream.read_qbytearray().unwrap(),
            vec![0x01, 0x02, 0x03, 0x04]
        );
    }

    #[test]
    fn test_read_null_qbytearray() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF];
        let mut stream = QtReader::new(&data);
        assert!(stream.read_qbytearray().unwrap().is_empty());
    }

    #[test]
    fn test_eof_reports_offset() {
        let data = [0x00, 0x00];
        let mut stream = QtReader::new(&data);
        assert!(matches!(
            stream.read_u32().unwrap_err(),
            Error::UnexpectedEof { .. }
        ));
    }

    #[test]
    fn test_truncated_qbytearray() {
        // Claims 16 bytes, provides 2
        let data = [0x00, 0x00, 0x00, 0x10, 0x01, 0x02];
        let mut stream = QtReader::new(&data);
        assert!(stream.read_qbytearray().is_err());
    }

    #[test]
    fn test_writer_reader_round_trip() {
        let mut writer = QtWriter::new();
        writer.put_i32(-7);
        writer.put_i64(1 << 40);
        writer.put_qbytearray(&[0xAA, 0xBB, 0xCC]);
        let bytes = writer.into_bytes();

        let mut reader = QtReader::new(&bytes);
        assert_eq!(reader.read_i32().unwrap(), -7);
        assert_eq!(reader.read_i64().unwrap(), 1 << 40);
        assert_eq!(reader.read_qbytearray().unwrap(), vec![0xAA, 0xBB, 0xCC]);
        assert_eq!(reader.remaining(), 0);
    }
}
