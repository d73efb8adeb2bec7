// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Firmware image source.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::config::BLOCK_SIZE;
use crate::error::Result;

/// A readable image of known length.
pub struct FirmwareImage<R> {
    reader: R,
    len: u64,
}

impl FirmwareImage<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Self {
            reader: BufReader::new(file),
            len,
        })
    }
}

impl FirmwareImage<Cursor<Vec<u8>>> {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        let len = bytes.len() as u64;
        Self {
            reader: Cursor::new(bytes),
            len,
        }
    }
}

impl<R: Read + Seek> FirmwareImage<R> {
    pub fn new(reader: R, len: u64) -> Self {
        Self { reader, len }
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the whole image once in block-sized chunks and discards it.
    /// Returns the number of bytes seen.
    pub fn drain(&mut self) -> Result<u64> {
        self.drain_with(|_| {})
    }

    /// `drain`, calling `on_chunk` with the length of every chunk read. This
    /// is the staging pass: the programmer captures block placement while the
    /// source is read.
    pub fn drain_with<F: FnMut(usize)>(&mut self, mut on_chunk: F) -> Result<u64> {
        let mut buf = vec![0u8; BLOCK_SIZE];
        let mut total = 0u64;
        loop {
            let n = self.reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            on_chunk(n);
            total += n as u64;
        }
        if total != self.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("image declared {} bytes but yielded {}", self.len, total),
            )
            .into());
        }
        Ok(total)
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        Ok(())
    }

    /// Fills `buf` with the next unread image bytes.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf)?;
        Ok(())
    }
}
