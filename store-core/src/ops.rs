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

//! The public file operations, each mapped onto one outcome of the
//! error taxonomy in `store-err`.

use store_err::{Result, StoreError};
use store_io::PersistentRegion;

use crate::{descriptor::FileDescriptor, state::State};

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(StoreError::BadArg("file name must not be empty"));
    }
    if name.as_bytes().iter().any(|&b| b == 0) {
        return Err(StoreError::BadArg("file name must not contain a nul byte"));
    }
    Ok(())
}

impl<IO: PersistentRegion> State<IO> {
    pub(crate) fn create_file(&mut self, name: &str, length: u32) -> Result<()> {
        validate_name(name)?;
        if self.find_by_name(name).is_some() {
            return Err(StoreError::Exists(name.to_string()));
        }
        if self.slot_count >= self.max_slots {
            return Err(StoreError::NoSpace);
        }
        if self.used + length as u64 > self.data_len {
            return Err(StoreError::NoSpace);
        }

        let slot = self.next_slot();
        let (offset, repacked_from) = self.next_offset(length);

        let desc = FileDescriptor::new(name, offset, length, slot);
        let desc = std::rc::Rc::new(std::cell::RefCell::new(desc));

        self.slot_in_use[slot as usize] = true;
        self.slot_count += 1;
        self.used += length as u64;
        self.write_dir_entry(slot, &desc.borrow());
        self.insert_into_views(desc);

        if length > 0 {
            self.zero_fill(offset, length as u64);
        }
        if let Some(from) = repacked_from {
            self.rehash_from(from);
        } else {
            self.recompute_block_range(offset, length as u64);
        }

        self.flush_all();
        log::trace!("created {name:?} at offset {offset} ({length} bytes)");
        Ok(())
    }

    pub(crate) fn delete_file(&mut self, name: &str) -> Result<()> {
        let desc = self
            .find_by_name(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let (slot, offset_index, name_index, length) = {
            let d = desc.borrow();
            (d.slot, d.offset_index, d.name_index, d.length)
        };
        debug_assert!(offset_index >= 0 && name_index >= 0);
        self.by_offset.remove_at(offset_index as usize);
        self.by_name.remove_at(name_index as usize);

        self.slot_in_use[slot as usize] = false;
        self.slot_count -= 1;
        self.used -= length as u64;
        self.clear_dir_name(slot);

        self.flush_all();
        log::trace!("deleted {name:?}");
        Ok(())
    }

    pub(crate) fn rename_file(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        validate_name(new_name)?;
        let desc = self
            .find_by_name(old_name)
            .ok_or_else(|| StoreError::NotFound(old_name.to_string()))?;

        if old_name != new_name && self.find_by_name(new_name).is_some() {
            return Err(StoreError::Exists(new_name.to_string()));
        }

        let name_index = desc.borrow().name_index;
        debug_assert!(name_index >= 0);
        self.by_name.remove_at(name_index as usize);

        let slot = {
            let mut d = desc.borrow_mut();
            d.set_name(new_name);
            d.slot
        };
        self.by_name
            .insert(desc.clone())
            .ok()
            .expect("renamed descriptor collided after a fresh existence check");
        self.write_dir_name(slot, &desc.borrow());

        self.flush_all();
        Ok(())
    }

    pub(crate) fn resize_file(&mut self, name: &str, new_len: u32) -> Result<()> {
        let desc = self
            .find_by_name(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let old_len = desc.borrow().length;
        if new_len == old_len {
            return Ok(());
        }
        if new_len > old_len && self.used - old_len as u64 + new_len as u64 > self.data_len {
            return Err(StoreError::NoSpace);
        }

        let repacked_from = self.resize_or_relocate(&desc, new_len, old_len);

        if new_len > old_len {
            let offset = desc.borrow().offset;
            self.zero_fill(offset + old_len as u64, (new_len - old_len) as u64);
        }
        if let Some(from) = repacked_from {
            self.rehash_from(from);
        } else if new_len > old_len {
            let offset = desc.borrow().offset;
            self.recompute_block_range(offset + old_len as u64, (new_len - old_len) as u64);
        }

        self.flush_all();
        Ok(())
    }

    pub(crate) fn repack(&mut self) -> Result<()> {
        if let Some(from) = self.repack_engine() {
            self.rehash_from(from);
        }
        self.flush_all();
        Ok(())
    }

    /// Reads `buf.len()` bytes starting at `off` bytes into the file.
    pub(crate) fn read_file(&self, name: &str, off: u64, buf: &mut [u8]) -> Result<()> {
        let desc = self
            .find_by_name(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let d = desc.borrow();
        let count = buf.len() as u64;
        if off + count > d.length as u64 {
            return Err(StoreError::BadArg(
                "read range extends past the file's current length",
            ));
        }
        if count == 0 {
            return Ok(());
        }
        if let Some(node) = self.verify_range(d.offset + off, count) {
            return Err(StoreError::IntegrityFailure(node));
        }
        self.data
            .read_at(d.offset + off, buf)
            .expect("data region read failed");
        Ok(())
    }

    /// Writes `data` starting at `off` bytes into the file, growing it
    /// first if `off + data.len()` extends past its current length.
    pub(crate) fn write_file(&mut self, name: &str, off: u64, data: &[u8]) -> Result<()> {
        let desc = self
            .find_by_name(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;

        let old_len = desc.borrow().length;
        if off > old_len as u64 {
            return Err(StoreError::BadArg(
                "write offset starts past the file's current length",
            ));
        }

        let count = data.len() as u64;
        if count == 0 {
            return Ok(());
        }

        let end = off + count;
        let growing = end > old_len as u64;
        let new_len: u32 = if growing {
            end.try_into()
                .map_err(|_| StoreError::BadArg("file contents must fit in 2^32 bytes"))?
        } else {
            old_len
        };

        if growing && self.used - old_len as u64 + new_len as u64 > self.data_len {
            return Err(StoreError::NoSpace);
        }

        // Every byte of the old file beyond `off` is about to be
        // overwritten by this write (since `off <= old_len <= end`), so
        // a relocation only needs to carry over the untouched prefix.
        let repacked_from = self.resize_or_relocate(&desc, new_len, off as u32);

        let offset = desc.borrow().offset;
        self.data
            .write_at(offset + off, data)
            .expect("data region write failed");

        if let Some(from) = repacked_from {
            self.rehash_from(from);
        } else {
            self.recompute_block_range(offset + off, count);
        }

        self.flush_all();
        Ok(())
    }

    pub(crate) fn file_size(&self, name: &str) -> Result<u32> {
        self.find_by_name(name)
            .map(|d| d.borrow().length)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    /// Rehashes every block from `from` to the end of the live data
    /// region, since a repack can shift file contents without bound.
    fn rehash_from(&mut self, from: u64) {
        let len = self.used.saturating_sub(from);
        self.recompute_block_range(from, len);
    }

    fn recompute_block_range(&mut self, offset: u64, len: u64) {
        self.recompute_range(offset, len);
    }
}
