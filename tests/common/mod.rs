#![allow(dead_code)]

use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::{Compression, Crc};

/// Builds KIWAD archives in memory.
pub struct WadBuilder {
    version: u32,
    flags: u8,
    files: Vec<File>,
}

struct File {
    path: Vec<u8>,
    contents: Vec<u8>,
    compressed: bool,
    checksum: Option<u32>,
}

impl WadBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            version,
            flags: 0,
            files: Vec::new(),
        }
    }

    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    pub fn stored(self, path: &str, contents: &[u8]) -> Self {
        self.push(path.as_bytes(), contents, false, None)
    }

    pub fn compressed(self, path: &str, contents: &[u8]) -> Self {
        self.push(path.as_bytes(), contents, true, None)
    }

    /// Adds an entry whose table checksum is `checksum` instead of the real CRC.
    pub fn with_checksum(self, path: &str, contents: &[u8], checksum: u32) -> Self {
        self.push(path.as_bytes(), contents, false, Some(checksum))
    }

    fn push(mut self, path: &[u8], contents: &[u8], compressed: bool, checksum: Option<u32>) -> Self {
        self.files.push(File {
            path: path.to_vec(),
            contents: contents.to_vec(),
            compressed,
            checksum,
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let payloads: Vec<Vec<u8>> = self
            .files
            .iter()
            .map(|f| {
                if f.compressed {
                    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                    encoder.write_all(&f.contents).unwrap();
                    encoder.finish().unwrap()
                } else {
                    f.contents.clone()
                }
            })
            .collect();

        let has_flags = self.version >= 2;
        let table_len: usize = self
            .files
            .iter()
            .map(|f| 21 + f.path.len() + 1)
            .sum();
        let mut offset = 5 + 8 + has_flags as usize + table_len;

        let mut out = b"KIWAD".to_vec();
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&(self.files.len() as u32).to_le_bytes());
        if has_flags {
            out.push(self.flags);
        }

        for (f, payload) in self.files.iter().zip(&payloads) {
            let checksum = f.checksum.unwrap_or_else(|| {
                let mut crc = Crc::new();
                crc.update(&f.contents);
                crc.sum()
            });

            out.extend_from_slice(&(offset as u32).to_le_bytes());
            out.extend_from_slice(&(f.contents.len() as u32).to_le_bytes());
            out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
            out.push(f.compressed as u8);
            out.extend_from_slice(&checksum.to_le_bytes());
            out.extend_from_slice(&(f.path.len() as u32 + 1).to_le_bytes());
            out.extend_from_slice(&f.path);
            out.push(0);
            offset += payload.len();
        }

        for payload in &payloads {
            out.extend_from_slice(payload);
        }
        out
    }
}

/// Offset of the first payload byte in an archive built by [`WadBuilder`].
pub fn first_payload_offset(archive: &[u8]) -> usize {
    u32::from_le_bytes(archive[archive_table_start(archive)..][..4].try_into().unwrap()) as usize
}

fn archive_table_start(archive: &[u8]) -> usize {
    let version = u32::from_le_bytes(archive[5..9].try_into().unwrap());
    if version >= 2 { 14 } else { 13 }
}
