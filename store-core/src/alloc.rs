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

use crate::{constants::OUT_OF_BAND, state::State};
use store_io::PersistentRegion;

impl<IO: PersistentRegion> State<IO> {
    /// Finds an insertion offset for a new file of `length` bytes.
    /// Returns the offset and, if a repack was needed to make
    /// room, the offset of the first byte that repack moved.
    ///
    /// The caller must already have verified `used + length <= data_len`
    /// (the operation layer's `NoSpace` check); that invariant is what
    /// makes this function infallible.
    pub(crate) fn next_offset(&mut self, length: u32) -> (u64, Option<u64>) {
        if length == 0 {
            return (OUT_OF_BAND, None);
        }
        let length = length as u64;

        let mut prev_end = 0u64;
        for i in 0..self.by_offset.len() {
            let d = self.by_offset.get(i);
            let d = d.borrow();
            if d.is_zero_length() {
                break;
            }
            let gap = d.offset.saturating_sub(prev_end);
            if gap >= length {
                return (prev_end, None);
            }
            prev_end = d.offset + d.length as u64;
        }

        let tail_gap = self.data_len.saturating_sub(prev_end);
        if tail_gap >= length {
            return (prev_end, None);
        }

        let repacked_from = self.repack_engine();
        assert!(
            self.data_len - self.used >= length,
            "allocator found no room after repack despite a prior space check"
        );
        (self.used, repacked_from)
    }

    /// Lowest free slot index. The caller must already have
    /// verified `slot_count < max_slots`.
    pub(crate) fn next_slot(&self) -> u32 {
        self.slot_in_use
            .iter()
            .position(|&used| !used)
            .expect("slot_count accounting disagrees with slot_in_use") as u32
    }
}
