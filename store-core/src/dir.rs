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

//! Directory-table mirror writers. Every descriptor mutation that
//! is visible on disk goes through one of these.

use zerocopy::IntoBytes;

use crate::{constants::NAME_LEN, descriptor::FileDescriptor, state::State};
use store_io::PersistentRegion;

impl<IO: PersistentRegion> State<IO> {
    fn slot_offset(slot: u32) -> u64 {
        slot as u64 * crate::constants::META_LEN as u64
    }

    pub(crate) fn write_dir_entry(&mut self, slot: u32, d: &FileDescriptor) {
        let raw = d.to_dir_entry();
        self.dir
            .write_at(Self::slot_offset(slot), raw.as_bytes())
            .expect("directory table write failed");
    }

    pub(crate) fn write_dir_name(&mut self, slot: u32, d: &FileDescriptor) {
        self.dir
            .write_at(Self::slot_offset(slot), &d.name_bytes())
            .expect("directory table write failed");
    }

    /// Writes the offset field, honoring the zero-length canon: `0` on
    /// disk whenever `length == 0`.
    pub(crate) fn write_dir_offset(&mut self, slot: u32, offset: u64, length: u32) {
        let disk_offset: u32 = if length == 0 { 0 } else { offset as u32 };
        self.dir
            .write_at(
                Self::slot_offset(slot) + NAME_LEN as u64,
                &disk_offset.to_le_bytes(),
            )
            .expect("directory table write failed");
    }

    pub(crate) fn write_dir_length(&mut self, slot: u32, length: u32) {
        self.dir
            .write_at(
                Self::slot_offset(slot) + NAME_LEN as u64 + 4,
                &length.to_le_bytes(),
            )
            .expect("directory table write failed");
    }

    /// Marks a slot free by zeroing the first name byte.
    pub(crate) fn clear_dir_name(&mut self, slot: u32) {
        self.dir
            .write_at(Self::slot_offset(slot), &[0u8])
            .expect("directory table write failed");
    }
}
