//! Helper functions for reading binary data

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::error::ItError;

/// Read a single byte
pub(crate) fn read_u8(cursor: &mut Cursor<&[u8]>) -> Result<u8, ItError> {
    let mut buf = [0u8; 1];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| ItError::UnexpectedEof)?;
    Ok(buf[0])
}

/// Read a single signed byte
pub(crate) fn read_i8(cursor: &mut Cursor<&[u8]>) -> Result<i8, ItError> {
    Ok(read_u8(cursor)? as i8)
}

/// Read a 16-bit little-endian integer
pub(crate) fn read_u16(cursor: &mut Cursor<&[u8]>) -> Result<u16, ItError> {
    let mut buf = [0u8; 2];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| ItError::UnexpectedEof)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read a 32-bit little-endian integer
pub(crate) fn read_u32(cursor: &mut Cursor<&[u8]>) -> Result<u32, ItError> {
    let mut buf = [0u8; 4];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| ItError::UnexpectedEof)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a fixed-size byte array
pub(crate) fn read_array<const N: usize>(cursor: &mut Cursor<&[u8]>) -> Result<[u8; N], ItError> {
    let mut buf = [0u8; N];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| ItError::UnexpectedEof)?;
    Ok(buf)
}

/// Read `len` bytes
pub(crate) fn read_vec(cursor: &mut Cursor<&[u8]>, len: usize) -> Result<Vec<u8>, ItError> {
    let mut buf = vec![0u8; len];
    cursor
        .read_exact(&mut buf)
        .map_err(|_| ItError::UnexpectedEof)?;
    Ok(buf)
}

/// Seek to an absolute offset
pub(crate) fn seek_to(cursor: &mut Cursor<&[u8]>, offset: u64) -> Result<(), ItError> {
    cursor.seek(SeekFrom::Start(offset))?;
    Ok(())
}

/// Bytes left after the cursor
pub(crate) fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    (cursor.get_ref().len() as u64).saturating_sub(cursor.position()) as usize
}

/// Read a null-terminated or fixed-length string, keeping at most `max` bytes
pub(crate) fn read_string(bytes: &[u8], max: usize) -> String {
    let bytes = &bytes[..bytes.len().min(max)];
    let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..len])
        .trim_end()
        .to_string()
}
