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

//! A persistent, single-volume file store backed by three fixed-size
//! regions: file contents, a flat directory table, and a Merkle hash
//! tree over the contents. Every operation goes through [`Store`], which
//! serializes access behind one lock and keeps the directory table and
//! hash tree consistent with every mutation it makes.

mod alloc;
mod constants;
mod descriptor;
mod dir;
mod hash;
mod index;
mod ops;
mod repack;
mod resize;
mod state;

use std::sync::Mutex;

pub use constants::{BLOCK_LEN, HASH_LEN, MAX_DATA_LEN, META_LEN, NAME_LEN, OUT_OF_BAND};
pub use hash::fletcher;
pub use store_err::{Result, StoreError};

use state::State;
use store_io::PersistentRegion;

/// A persistent single-volume file store over three backing regions.
///
/// `IO` is the backing storage abstraction for all three regions; see
/// [`store_io::PersistentRegion`]. All methods lock the store for their
/// whole duration, so concurrent callers serialize rather than race.
pub struct Store<IO: PersistentRegion> {
    state: Mutex<State<IO>>,
}

impl<IO: PersistentRegion> Store<IO> {
    /// Opens a store over the given `data`, `dir`, and `hash` regions,
    /// loading the directory table into memory.
    ///
    /// `n_processors` is recorded but not otherwise used: the original
    /// multi-threaded engine this store is modeled on split work across
    /// processor-affine ranges, but a single internal lock makes that
    /// unnecessary here.
    ///
    /// Panics if the three regions' sizes are not mutually consistent —
    /// a malformed volume is treated as a fatal condition on open rather
    /// than a reportable error.
    pub fn open(data: IO, dir: IO, hash: IO, n_processors: u32) -> Self {
        Self {
            state: Mutex::new(State::open(data, dir, hash, n_processors)),
        }
    }

    /// Flushes every backing region. Panics on I/O failure: a flush that
    /// cannot complete leaves the volume's durability guarantees unknown,
    /// which this store treats the same as any other fatal I/O failure.
    pub fn close(&self) {
        self.lock().close();
    }

    /// Creates a new file of `length` zero-filled bytes.
    ///
    /// Returns [`StoreError::Exists`] if the name is taken,
    /// [`StoreError::BadArg`] for an empty or malformed name, and
    /// [`StoreError::NoSpace`] if no slot or no contiguous space (even
    /// after a repack) can hold it.
    pub fn create_file(&self, name: &str, length: u32) -> Result<()> {
        self.lock().create_file(name, length)
    }

    /// Deletes a file. Its slot is freed for reuse; the bytes it
    /// occupied are left untouched until something else claims them.
    ///
    /// Returns [`StoreError::NotFound`] if no such file exists.
    pub fn delete_file(&self, name: &str) -> Result<()> {
        self.lock().delete_file(name)
    }

    /// Renames a file. Renaming a file to its own current name succeeds
    /// as a no-op.
    ///
    /// Returns [`StoreError::NotFound`] if `old_name` doesn't exist, or
    /// [`StoreError::Exists`] if `new_name` is already taken by a
    /// different file.
    pub fn rename_file(&self, old_name: &str, new_name: &str) -> Result<()> {
        self.lock().rename_file(old_name, new_name)
    }

    /// Grows or shrinks a file to exactly `new_len` bytes. Growth zero-
    /// fills the new bytes; shrinking leaves the file's remaining
    /// directory length authoritative over whatever stale bytes trail
    /// it in the data region.
    ///
    /// Returns [`StoreError::NotFound`] if the file doesn't exist, or
    /// [`StoreError::NoSpace`] if growth has nowhere to go even after a
    /// repack.
    pub fn resize_file(&self, name: &str, new_len: u32) -> Result<()> {
        self.lock().resize_file(name, new_len)
    }

    /// Compacts every live file leftward in the data region, preserving
    /// relative order, closing every gap left by deletions and resizes.
    pub fn repack(&self) -> Result<()> {
        self.lock().repack()
    }

    /// Reads `buf.len()` bytes starting `off` bytes into the file,
    /// verifying the covered range against the hash tree first.
    ///
    /// Returns [`StoreError::NotFound`] if the file doesn't exist,
    /// [`StoreError::BadArg`] if `off + buf.len()` extends past the
    /// file's current length, or [`StoreError::IntegrityFailure`] if the
    /// covered range fails verification.
    pub fn read_file(&self, name: &str, off: u64, buf: &mut [u8]) -> Result<()> {
        self.lock().read_file(name, off, buf)
    }

    /// Writes `data` starting `off` bytes into the file, growing it
    /// first if `off + data.len()` extends past its current length.
    ///
    /// Returns [`StoreError::NotFound`] if the file doesn't exist,
    /// [`StoreError::BadArg`] if `off` itself is past the current
    /// length, or [`StoreError::NoSpace`] if growth has nowhere to go.
    pub fn write_file(&self, name: &str, off: u64, data: &[u8]) -> Result<()> {
        self.lock().write_file(name, off, data)
    }

    /// Current length of a file, in bytes.
    ///
    /// Returns [`StoreError::NotFound`] if the file doesn't exist.
    pub fn file_size(&self, name: &str) -> Result<u32> {
        self.lock().file_size(name)
    }

    /// Recomputes the whole Merkle hash tree from the live data region,
    /// discarding whatever was previously stored.
    pub fn rebuild_hash_tree(&self) {
        self.lock().rebuild_tree()
    }

    /// Digest of the leaf covering `block`.
    pub fn block_digest(&self, block: u32) -> [u8; HASH_LEN] {
        self.lock().block_digest(block)
    }

    /// Digest of the tree's root node.
    pub fn root_digest(&self) -> [u8; HASH_LEN] {
        self.lock().root_digest()
    }

    /// Recomputes the hashes covering `[offset, offset+len)` against the
    /// live data region and compares them, and every ancestor derived
    /// from them, against what is currently stored. Returns the index of
    /// the first disagreeing node, if any.
    ///
    /// Unlike the other operations, a detected mismatch here is exactly
    /// what this method exists to report, so it is returned as
    /// [`StoreError::IntegrityFailure`] rather than treated as fatal.
    pub fn verify_range(&self, offset: u64, len: u64) -> Result<()> {
        match self.lock().verify_range(offset, len) {
            Some(node) => Err(StoreError::IntegrityFailure(node)),
            None => Ok(()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State<IO>> {
        self.state
            .lock()
            .expect("another thread panicked while holding the store lock")
    }
}
