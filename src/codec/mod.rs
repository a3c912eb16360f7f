//! Little-endian binary codec and PDA/ATA derivation.

pub mod pda;

use crate::error::{EngineError, EngineResult};
use solana_sdk::pubkey::Pubkey;

/// Borrows an account's raw byte slice and decodes little-endian primitives
/// at explicit offsets, with no intermediate copy of the account data.
pub struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check(&self, offset: usize, width: usize) -> EngineResult<()> {
        if offset + width > self.data.len() {
            return Err(EngineError::invalid_account_data(format!(
                "insufficient data: offset {offset} + width {width} > len {}",
                self.data.len()
            )));
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> EngineResult<u8> {
        self.check(offset, 1)?;
        Ok(self.data[offset])
    }

    pub fn read_bool(&self, offset: usize) -> EngineResult<bool> {
        Ok(self.read_u8(offset)? != 0)
    }

    pub fn read_u16(&self, offset: usize) -> EngineResult<u16> {
        self.check(offset, 2)?;
        Ok(u16::from_le_bytes(self.data[offset..offset + 2].try_into().unwrap()))
    }

    pub fn read_u32(&self, offset: usize) -> EngineResult<u32> {
        self.check(offset, 4)?;
        Ok(u32::from_le_bytes(self.data[offset..offset + 4].try_into().unwrap()))
    }

    pub fn read_u64(&self, offset: usize) -> EngineResult<u64> {
        self.check(offset, 8)?;
        Ok(u64::from_le_bytes(self.data[offset..offset + 8].try_into().unwrap()))
    }

    pub fn read_pubkey(&self, offset: usize) -> EngineResult<Pubkey> {
        self.check(offset, 32)?;
        let bytes: [u8; 32] = self.data[offset..offset + 32].try_into().unwrap();
        Ok(Pubkey::new_from_array(bytes))
    }

    pub fn remaining_from(&self, offset: usize) -> usize {
        self.data.len().saturating_sub(offset)
    }
}

/// Strips the 8-byte Anchor account discriminator most program-owned
/// accounts carry before their struct payload.
pub fn strip_anchor_discriminator(data: &[u8]) -> EngineResult<&[u8]> {
    if data.len() < 8 {
        return Err(EngineError::invalid_account_data(format!(
            "account data too short for an anchor discriminator: {} bytes",
            data.len()
        )));
    }
    Ok(&data[8..])
}

/// Little-endian writer used by instruction-data builders.
#[derive(Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity) }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn write_u32(&mut self, value: u32) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u64(&mut self, value: u64) -> &mut Self {
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_reads() {
        let data = [1u8, 2, 3];
        let reader = ByteReader::new(&data);
        assert!(reader.read_u64(0).is_err());
        assert_eq!(reader.read_u8(2).unwrap(), 3);
    }

    #[test]
    fn round_trips_u64_le() {
        let mut writer = ByteWriter::with_capacity(8);
        writer.write_u64(123_456_789);
        let bytes = writer.into_vec();
        let reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u64(0).unwrap(), 123_456_789);
    }

    #[test]
    fn round_trips_pubkey() {
        let key = Pubkey::new_unique();
        let mut writer = ByteWriter::with_capacity(32);
        writer.write_bytes(key.as_ref());
        let bytes = writer.into_vec();
        let reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_pubkey(0).unwrap(), key);
    }
}
