use crate::error::{Result, StoreError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use crc64fast::Digest;
use flashguard::types::{BlockLocation, BlockMap};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// Upper bound on entries; a 16MB chip has 4096 blocks.
const MAX_ENTRIES: u32 = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMapHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub fw_size: u64,
    pub count: u32,
}

impl BlockMapHeader {
    pub const SIZE: usize = 4 + 4 + 8 + 4; // 20 bytes
    pub const MAGIC: [u8; 4] = *b"BMAP";
    pub const ENTRY_SIZE: usize = 4 + 4;

    pub fn new(fw_size: u64, count: u32) -> Self {
        Self {
            magic: Self::MAGIC,
            version: 1,
            fw_size,
            count,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.magic);
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..16].copy_from_slice(&self.fw_size.to_le_bytes());
        buf[16..20].copy_from_slice(&self.count.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; Self::SIZE]) -> Result<Self> {
        let mut cursor = &buf[..];
        let mut magic = [0u8; 4];
        cursor.read_exact(&mut magic)?;
        if magic != Self::MAGIC {
            return Err(StoreError::InvalidMagic);
        }

        let version = cursor.read_u32::<LittleEndian>()?;
        if version != 1 {
            return Err(StoreError::InvalidFormat(format!("unsupported version {}", version)));
        }
        let fw_size = cursor.read_u64::<LittleEndian>()?;
        let count = cursor.read_u32::<LittleEndian>()?;
        if count > MAX_ENTRIES {
            return Err(StoreError::InvalidFormat(format!("{} entries is too many", count)));
        }

        Ok(Self {
            magic,
            version,
            fw_size,
            count,
        })
    }
}

/// A persisted allocation: the image size it was recorded for plus the map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockMapFile {
    pub fw_size: u64,
    pub map: BlockMap,
}

pub fn encode(fw_size: u64, map: &BlockMap) -> Vec<u8> {
    let header = BlockMapHeader::new(fw_size, map.len() as u32);
    let mut buf = Vec::with_capacity(BlockMapHeader::SIZE + map.len() * BlockMapHeader::ENTRY_SIZE + 8);
    buf.extend_from_slice(&header.to_bytes());
    for loc in map {
        buf.write_u32::<LittleEndian>(loc.block_id).unwrap();
        buf.write_u32::<LittleEndian>(loc.offset).unwrap();
    }

    let mut digest = Digest::new();
    digest.write(&buf);
    buf.write_u64::<LittleEndian>(digest.sum64()).unwrap();
    buf
}

pub fn read_from<R: Read>(mut reader: R) -> Result<BlockMapFile> {
    let mut head = [0u8; BlockMapHeader::SIZE];
    reader.read_exact(&mut head)?;
    let header = BlockMapHeader::from_bytes(&head)?;

    let mut body = vec![0u8; header.count as usize * BlockMapHeader::ENTRY_SIZE];
    reader.read_exact(&mut body)?;
    let expected = reader.read_u64::<LittleEndian>()?;

    let mut digest = Digest::new();
    digest.write(&head);
    digest.write(&body);
    let found = digest.sum64();
    if found != expected {
        return Err(StoreError::ChecksumMismatch { expected, found });
    }

    let mut cursor = &body[..];
    let mut locations = Vec::with_capacity(header.count as usize);
    for _ in 0..header.count {
        let block_id = cursor.read_u32::<LittleEndian>()?;
        let offset = cursor.read_u32::<LittleEndian>()?;
        locations.push(BlockLocation { block_id, offset });
    }

    Ok(BlockMapFile {
        fw_size: header.fw_size,
        map: BlockMap::new(locations),
    })
}

pub fn write_to(path: impl AsRef<Path>, fw_size: u64, map: &BlockMap) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(&encode(fw_size, map))?;
    file.sync_data()?;
    Ok(())
}

pub fn read_file(path: impl AsRef<Path>) -> Result<BlockMapFile> {
    let file = File::open(path)?;
    read_from(BufReader::new(file))
}
