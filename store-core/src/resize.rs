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

use crate::{constants::OUT_OF_BAND, descriptor::DescRef, state::State};
use store_io::PersistentRegion;

impl<IO: PersistentRegion> State<IO> {
    /// Grows or shrinks `d` to `new_len`, relocating it only when the
    /// data region has no room to grow in place.
    ///
    /// `bytes_to_preserve` bounds how many of `d`'s current bytes a
    /// relocation actually needs to carry over, so `write_file` can skip
    /// copying bytes it is about to overwrite anyway.
    ///
    /// Returns the offset of the first byte a repack wrote, if one was
    /// needed to make room.
    pub(crate) fn resize_or_relocate(
        &mut self,
        d: &DescRef,
        new_len: u32,
        bytes_to_preserve: u32,
    ) -> Option<u64> {
        let old_len = d.borrow().length;

        let repacked_from = if new_len > old_len {
            if old_len == 0 {
                self.grow_from_zero(d, new_len)
            } else {
                self.grow_nonzero(d, new_len, bytes_to_preserve)
            }
        } else {
            None
        };

        if new_len != old_len {
            self.used = self.used - old_len as u64 + new_len as u64;
            let slot = d.borrow().slot;
            d.borrow_mut().length = new_len;

            if new_len == 0 {
                self.shrink_to_zero_canon(d);
            }

            let offset = d.borrow().offset;
            self.write_dir_length(slot, new_len);
            self.write_dir_offset(slot, offset, new_len);
        }

        repacked_from
    }

    /// Shrinking a file to zero length must re-establish the zero-length
    /// canon: the in-memory offset becomes the `OUT_OF_BAND` sentinel,
    /// and the descriptor has to move to the tail of the by-offset view
    /// (it no longer occupies real data-region space, so leaving it at
    /// its old position would make `repack_engine`/`next_offset` treat
    /// everything after it as past the end of the live region).
    fn shrink_to_zero_canon(&mut self, d: &DescRef) {
        let idx = d.borrow().offset_index;
        debug_assert!(idx >= 0, "descriptor missing from the by-offset view");
        self.by_offset.remove_at(idx as usize);
        d.borrow_mut().offset = OUT_OF_BAND;
        self.by_offset
            .insert(d.clone())
            .ok()
            .expect("offset collision reinserting a descriptor shrunk to zero");
    }

    /// A zero-length descriptor sitting at the tail grows in place if
    /// the live region's head leaves room, otherwise it repacks and
    /// moves to the new contiguous tail.
    fn grow_from_zero(&mut self, d: &DescRef, new_len: u32) -> Option<u64> {
        let idx = d.borrow().offset_index;
        debug_assert!(idx >= 0, "descriptor missing from the by-offset view");
        self.by_offset.remove_at(idx as usize);

        let head_room = self.first_live_nonzero_offset();
        let repacked_from = if head_room >= new_len as u64 {
            d.borrow_mut().offset = 0;
            None
        } else {
            let from = self.repack_engine();
            d.borrow_mut().offset = self.used;
            from
        };

        self.by_offset
            .insert(d.clone())
            .ok()
            .expect("offset collision reinserting a descriptor grown from zero");
        repacked_from
    }

    /// A non-zero-length descriptor grows in place if there is room
    /// before its next live neighbor, otherwise the bytes the caller
    /// wants kept are copied aside, the region is repacked, and `d` is
    /// relocated to the new tail.
    fn grow_nonzero(&mut self, d: &DescRef, new_len: u32, bytes_to_preserve: u32) -> Option<u64> {
        let (offset, old_len) = {
            let d = d.borrow();
            (d.offset, d.length)
        };

        if self.next_live_boundary_after(d) - offset >= new_len as u64 {
            return None;
        }

        let preserve = bytes_to_preserve.min(old_len) as usize;
        let mut scratch = vec![0u8; preserve];
        self.data
            .read_at(offset, &mut scratch)
            .expect("data region read failed before relocating a file");

        let idx = d.borrow().offset_index;
        debug_assert!(idx >= 0, "descriptor missing from the by-offset view");
        self.by_offset.remove_at(idx as usize);
        let repacked_from = self.repack_engine();

        let new_offset = self.used - old_len as u64;
        self.data
            .write_at(new_offset, &scratch)
            .expect("data region write failed while relocating a file");
        d.borrow_mut().offset = new_offset;
        self.by_offset
            .insert(d.clone())
            .ok()
            .expect("offset collision reinserting a relocated descriptor");

        Some(repacked_from.unwrap_or(new_offset))
    }

    /// Start of the first live non-zero-length file, or `data_len` if
    /// none are live. Since zero-length entries always sort last, index
    /// `0` is non-zero-length iff any non-zero-length file exists.
    fn first_live_nonzero_offset(&self) -> u64 {
        if self.by_offset.len() == 0 {
            return self.data_len;
        }
        let d = self.by_offset.get(0);
        let d = d.borrow();
        if d.is_zero_length() {
            self.data_len
        } else {
            d.offset
        }
    }

    /// The offset `d` must stay clear of: its next live non-zero-length
    /// neighbor in by-offset order, or `data_len` if `d` is the last one.
    fn next_live_boundary_after(&self, d: &DescRef) -> u64 {
        let idx = d.borrow().offset_index;
        debug_assert!(idx >= 0, "descriptor missing from the by-offset view");
        let next_idx = idx as usize + 1;
        if next_idx >= self.by_offset.len() {
            return self.data_len;
        }
        let next = self.by_offset.get(next_idx);
        let next = next.borrow();
        if next.is_zero_length() {
            self.data_len
        } else {
            next.offset
        }
    }
}
