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

use std::{cell::RefCell, rc::Rc};

use zerocopy::FromBytes;

use crate::{
    constants::{BLOCK_LEN, META_LEN, NAME_LEN, OUT_OF_BAND},
    descriptor::{DescRef, DirEntryRaw, FileDescriptor},
    index::{IndexKind, SortedIndex},
};
use store_io::PersistentRegion;

/// All mutable state behind a [`crate::Store`]'s single lock.
pub(crate) struct State<IO: PersistentRegion> {
    pub(crate) data: IO,
    pub(crate) dir: IO,
    pub(crate) hash: IO,

    pub(crate) data_len: u64,
    pub(crate) max_slots: u32,
    pub(crate) tree_len: u32,
    pub(crate) leaf_offset: u32,

    pub(crate) used: u64,
    pub(crate) slot_in_use: Vec<bool>,
    pub(crate) slot_count: u32,

    pub(crate) by_offset: SortedIndex,
    pub(crate) by_name: SortedIndex,

    #[allow(dead_code)]
    pub(crate) n_processors: u32,
}

impl<IO: PersistentRegion> State<IO> {
    /// Opens the three backing regions and loads the directory table
    /// a fresh store.
    ///
    /// Panics if the regions' sizes don't satisfy the store's length
    /// relations — a malformed volume is a fatal condition, not
    /// a reportable error.
    pub(crate) fn open(data: IO, dir: IO, hash: IO, n_processors: u32) -> Self {
        let data_len = data.len();
        assert!(
            data_len <= crate::constants::MAX_DATA_LEN,
            "data region ({data_len} bytes) exceeds 2^32 bytes"
        );

        let dir_len = dir.len();
        assert!(
            dir_len % META_LEN as u64 == 0,
            "directory table size ({dir_len}) is not a multiple of META_LEN ({META_LEN})"
        );
        let max_slots = (dir_len / META_LEN as u64) as u32;

        let min_leaves = data_len.div_ceil(BLOCK_LEN as u64).max(1);
        let leaf_count = min_leaves.next_power_of_two();
        let tree_len = (2 * leaf_count - 1) as u32;
        let leaf_offset = tree_len - leaf_count as u32;

        let hash_len = hash.len();
        assert!(
            hash_len == tree_len as u64 * crate::constants::HASH_LEN as u64,
            "hash region size ({hash_len}) does not match the {tree_len}-node tree it must hold"
        );

        let mut state = Self {
            data,
            dir,
            hash,
            data_len,
            max_slots,
            tree_len,
            leaf_offset,
            used: 0,
            slot_in_use: vec![false; max_slots as usize],
            slot_count: 0,
            by_offset: SortedIndex::new(IndexKind::Offset, max_slots as usize),
            by_name: SortedIndex::new(IndexKind::Name, max_slots as usize),
            n_processors,
        };
        state.load_directory_table();
        state
    }

    fn load_directory_table(&mut self) {
        for slot in 0..self.max_slots {
            let mut raw = [0u8; META_LEN];
            self.dir
                .read_at(slot as u64 * META_LEN as u64, &mut raw)
                .expect("directory table read failed");
            if raw[0] == 0 {
                continue;
            }

            let entry =
                DirEntryRaw::read_from_bytes(&raw).expect("directory row has the wrong size");
            let length = entry.length.get();
            let offset = if length == 0 {
                OUT_OF_BAND
            } else {
                entry.offset.get() as u64
            };

            let desc = Rc::new(RefCell::new(FileDescriptor::from_raw(
                entry.name, length, slot,
            )));
            desc.borrow_mut().offset = offset;
            self.insert_into_views(desc);

            self.slot_in_use[slot as usize] = true;
            self.slot_count += 1;
            self.used += length as u64;
        }
    }

    pub(crate) fn insert_into_views(&mut self, d: DescRef) {
        self.by_offset
            .insert(d.clone())
            .ok()
            .expect("offset collision inserting a descriptor");
        self.by_name
            .insert(d)
            .ok()
            .expect("duplicate name slipped past an existence check");
    }

    pub(crate) fn find_by_name(&self, name: &str) -> Option<DescRef> {
        let mut key = [0u8; NAME_LEN - 1];
        let bytes = name.as_bytes();
        let n = bytes.len().min(NAME_LEN - 1);
        key[..n].copy_from_slice(&bytes[..n]);
        self.by_name.find_by_name(&key).map(|i| self.by_name.get(i))
    }

    pub(crate) fn close(&mut self) {
        self.data.flush().expect("data region flush failed");
        self.dir.flush().expect("directory table flush failed");
        self.hash.flush().expect("hash region flush failed");
    }

    pub(crate) fn flush_all(&mut self) {
        self.data.flush().expect("data region flush failed");
        self.dir.flush().expect("directory table flush failed");
        self.hash.flush().expect("hash region flush failed");
    }

    pub(crate) fn zero_fill(&mut self, offset: u64, len: u64) {
        if len == 0 {
            return;
        }
        let buf = vec![0u8; len as usize];
        self.data
            .write_at(offset, &buf)
            .expect("data region write failed while zero-filling");
    }
}
