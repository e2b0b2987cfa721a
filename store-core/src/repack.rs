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

use crate::state::State;
use store_io::PersistentRegion;

impl<IO: PersistentRegion> State<IO> {
    /// Compacts every non-zero-length live file leftwards, preserving
    /// their relative order, so the live region becomes contiguous
    /// starting at offset `0`. Zero-length files are never
    /// touched. Returns the lowest offset any byte was written to, or
    /// `None` if nothing moved.
    pub(crate) fn repack_engine(&mut self) -> Option<u64> {
        let mut write_cursor = 0u64;
        let mut moved_from: Option<u64> = None;

        for i in 0..self.by_offset.len() {
            let d = self.by_offset.get(i);
            let (old_offset, length, slot) = {
                let d = d.borrow();
                if d.is_zero_length() {
                    break;
                }
                (d.offset, d.length, d.slot)
            };

            if old_offset != write_cursor {
                self.copy_within_data(old_offset, write_cursor, length as u64);
                d.borrow_mut().offset = write_cursor;
                self.write_dir_offset(slot, write_cursor, length);
                moved_from.get_or_insert(write_cursor);
            }
            write_cursor += length as u64;
        }

        if moved_from.is_some() {
            log::debug!("repack moved data starting at offset {:?}", moved_from);
            self.dir.flush().expect("directory table flush failed");
        }
        moved_from
    }

    /// Overlap-safe move: reads the whole span into a scratch buffer
    /// before writing it back, so it is correct regardless of whether
    /// `src` and `dst` overlap (they never do here, since compaction
    /// only ever moves bytes left of their current position, but the
    /// read-then-write shape makes that unnecessary to prove).
    fn copy_within_data(&mut self, src: u64, dst: u64, len: u64) {
        if len == 0 || src == dst {
            return;
        }
        let mut buf = vec![0u8; len as usize];
        self.data
            .read_at(src, &mut buf)
            .expect("data region read failed during repack");
        self.data
            .write_at(dst, &buf)
            .expect("data region write failed during repack");
    }
}
