// Copyright 2024 Kevin Ludwig
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A persistent, fixed-length byte array with flush.
//!
//! The store engine never touches `std::fs` directly; it only ever talks
//! to a [`PersistentRegion`], so the same engine can be driven by a plain
//! file, a ramdisk-backed file, or a test double.

use std::{
    fs::{File, OpenOptions},
    os::unix::fs::FileExt,
    path::Path,
};

use store_err::Result;

/// A fixed-length region of persistent bytes.
///
/// `len()` is fixed for the lifetime of the region; the store engine reads
/// it once at open time and never expects it to change.
pub trait PersistentRegion: Send + Sync {
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads exactly `buf.len()` bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes exactly `buf.len()` bytes starting at `offset`.
    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Makes prior writes durable. May be asynchronous; callers only
    /// require that it eventually lands.
    fn flush(&self) -> Result<()>;
}

/// A [`PersistentRegion`] backed by a single host file, opened once and
/// accessed by positioned reads/writes so no shared cursor state is
/// needed across concurrent callers.
pub struct FileRegion {
    file: File,
    len: u64,
}

impl FileRegion {
    /// Opens `path` for reading and writing. The file must already exist
    /// and have the size the caller expects; this type never resizes it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        Ok(Self { file, len })
    }
}

impl PersistentRegion for FileRegion {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.read_exact_at(buf, offset)?;
        Ok(())
    }

    fn write_at(&self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.write_all_at(buf, offset)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.file.sync_data()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("region");
        std::fs::write(&path, vec![0u8; 64]).unwrap();

        let region = FileRegion::open(&path).unwrap();
        assert_eq!(region.len(), 64);

        region.write_at(10, b"hello").unwrap();
        region.flush().unwrap();

        let mut buf = [0u8; 5];
        region.read_at(10, &mut buf).unwrap();
        assert_eq!(&buf, b"hello");
    }
}
