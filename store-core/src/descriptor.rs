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

use zerocopy::{little_endian::U32, FromBytes, IntoBytes, KnownLayout};

use crate::constants::{META_LEN, NAME_LEN, OUT_OF_BAND};

/// Bit-exact mirror of one directory-table row.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout)]
pub(crate) struct DirEntryRaw {
    pub name: [u8; NAME_LEN],
    pub offset: U32,
    pub length: U32,
}

const _: () = assert!(std::mem::size_of::<DirEntryRaw>() == META_LEN);

/// In-memory record for one live file.
///
/// Shared by reference between the two sorted views; never owned
/// exclusively by either one.
#[derive(Debug)]
pub struct FileDescriptor {
    name: [u8; NAME_LEN],
    pub length: u32,
    pub offset: u64,
    pub slot: u32,
    pub offset_index: i32,
    pub name_index: i32,
}

pub(crate) type DescRef = Rc<RefCell<FileDescriptor>>;

impl FileDescriptor {
    pub(crate) fn new(name: &str, offset: u64, length: u32, slot: u32) -> Self {
        let mut d = Self {
            name: [0; NAME_LEN],
            length,
            offset,
            slot,
            offset_index: -1,
            name_index: -1,
        };
        d.set_name(name);
        d
    }

    pub(crate) fn from_raw(raw_name: [u8; NAME_LEN], length: u32, slot: u32) -> Self {
        let offset = if length == 0 { OUT_OF_BAND } else { 0 };
        Self {
            name: raw_name,
            length,
            offset,
            slot,
            offset_index: -1,
            name_index: -1,
        }
    }

    /// Truncates to the first 63 bytes and re-nul-terminates, matching
    /// `update_file_name`'s `strncpy` behavior in the original.
    pub(crate) fn set_name(&mut self, name: &str) {
        let bytes = name.as_bytes();
        let n = bytes.len().min(NAME_LEN - 1);
        self.name = [0; NAME_LEN];
        self.name[..n].copy_from_slice(&bytes[..n]);
    }

    /// The first 63 bytes, used for ordering and equality.
    pub(crate) fn name_key(&self) -> &[u8] {
        &self.name[..NAME_LEN - 1]
    }

    pub(crate) fn name_bytes(&self) -> [u8; NAME_LEN] {
        self.name
    }

    pub fn name(&self) -> &str {
        let end = self.name_key().iter().position(|&b| b == 0).unwrap_or(NAME_LEN - 1);
        std::str::from_utf8(&self.name[..end]).unwrap_or_default()
    }

    pub(crate) fn is_zero_length(&self) -> bool {
        self.length == 0
    }

    /// The on-disk offset: always `0` for zero-length files regardless
    /// of the in-memory sentinel.
    pub(crate) fn disk_offset(&self) -> u32 {
        if self.length == 0 {
            0
        } else {
            self.offset as u32
        }
    }

    pub(crate) fn to_dir_entry(&self) -> DirEntryRaw {
        DirEntryRaw {
            name: self.name,
            offset: self.disk_offset().into(),
            length: self.length.into(),
        }
    }
}
