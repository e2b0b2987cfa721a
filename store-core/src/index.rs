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

use std::cmp::Ordering;

use crate::descriptor::DescRef;

#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) enum IndexKind {
    Offset,
    Name,
}

/// A key collision on insert; the caller is expected to have already
/// checked for this.
pub(crate) struct AlreadyPresent;

/// One of the two sorted views over the live descriptor set.
///
/// Both views reference the same descriptor records; every shift updates
/// the moved record's `offset_index`/`name_index` so lookups stay O(1)
/// once a [`DescRef`] is in hand.
pub(crate) struct SortedIndex {
    kind: IndexKind,
    capacity: usize,
    entries: Vec<DescRef>,
}

impl SortedIndex {
    pub fn new(kind: IndexKind, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, i: usize) -> DescRef {
        self.entries[i].clone()
    }

    fn key_order(&self, a: &DescRef, b: &DescRef) -> Ordering {
        let a = a.borrow();
        let b = b.borrow();
        match self.kind {
            IndexKind::Name => a.name_key().cmp(b.name_key()),
            IndexKind::Offset => match (a.is_zero_length(), b.is_zero_length()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => a.offset.cmp(&b.offset),
            },
        }
    }

    fn set_position(&self, d: &DescRef, idx: i32) {
        let mut d = d.borrow_mut();
        match self.kind {
            IndexKind::Offset => d.offset_index = idx,
            IndexKind::Name => d.name_index = idx,
        }
    }

    /// Places `d` into sorted position. A zero-length descriptor
    /// in the by-offset view bypasses the search and appends directly,
    /// since every zero-length entry shares the same sort key.
    pub fn insert(&mut self, d: DescRef) -> Result<usize, AlreadyPresent> {
        assert!(
            self.entries.len() < self.capacity,
            "sorted index capacity exhausted"
        );

        if self.kind == IndexKind::Offset && d.borrow().is_zero_length() {
            let idx = self.entries.len();
            self.entries.push(d.clone());
            self.set_position(&d, idx as i32);
            return Ok(idx);
        }

        let mut lo = 0usize;
        let mut hi = self.entries.len();
        while lo < hi {
            let mid = (lo + hi) / 2;
            if self.key_order(&self.entries[mid], &d) == Ordering::Less {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo < self.entries.len() && self.key_order(&self.entries[lo], &d) == Ordering::Equal {
            return Err(AlreadyPresent);
        }

        self.entries.insert(lo, d);
        for i in lo..self.entries.len() {
            self.set_position(&self.entries[i], i as i32);
        }
        Ok(lo)
    }

    /// Removes the entry at position `i`, left-shifting the remainder
    /// and fixing up every shifted entry's stored position. The removed
    /// record's position field is set to `-1`.
    pub fn remove_at(&mut self, i: usize) -> DescRef {
        let removed = self.entries.remove(i);
        self.set_position(&removed, -1);
        for j in i..self.entries.len() {
            self.set_position(&self.entries[j], j as i32);
        }
        removed
    }

    /// Binary search by name. Only meaningful on the by-name view.
    pub fn find_by_name(&self, name: &[u8]) -> Option<usize> {
        debug_assert!(self.kind == IndexKind::Name);
        self.entries
            .binary_search_by(|e| e.borrow().name_key().cmp(name))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use proptest::prelude::*;

    use super::*;
    use crate::descriptor::FileDescriptor;

    fn desc(name: &str, offset: u64, length: u32) -> DescRef {
        Rc::new(RefCell::new(FileDescriptor::new(name, offset, length, 0)))
    }

    #[test]
    fn by_offset_sorts_zero_length_last() {
        let mut idx = SortedIndex::new(IndexKind::Offset, 8);
        idx.insert(desc("b", 100, 10)).ok().unwrap();
        idx.insert(desc("z", crate::constants::OUT_OF_BAND, 0))
            .ok()
            .unwrap();
        idx.insert(desc("a", 0, 50)).ok().unwrap();

        assert_eq!(idx.get(0).borrow().name(), "a");
        assert_eq!(idx.get(1).borrow().name(), "b");
        assert_eq!(idx.get(2).borrow().name(), "z");
    }

    #[test]
    fn by_name_rejects_duplicates() {
        let mut idx = SortedIndex::new(IndexKind::Name, 8);
        idx.insert(desc("a", 0, 10)).ok().unwrap();
        assert!(idx.insert(desc("a", 20, 5)).is_err());
    }

    #[test]
    fn shrinking_to_zero_mid_array_moves_to_the_tail_on_reinsert() {
        // Models what `resize_or_relocate` does on a shrink-to-zero: pull
        // the descriptor out of its old position, flip it over to the
        // sentinel offset, then reinsert it. The by-offset view must end
        // up with it last, not stuck in its old middle slot, or a later
        // scan that stops at the first zero-length entry would treat
        // everything after that slot as already past the live region.
        let mut idx = SortedIndex::new(IndexKind::Offset, 8);
        let a = desc("a", 0, 50);
        let b = desc("b", 50, 50);
        let c = desc("c", 100, 50);
        idx.insert(a.clone()).ok().unwrap();
        idx.insert(b.clone()).ok().unwrap();
        idx.insert(c.clone()).ok().unwrap();

        let idx_of_a = a.borrow().offset_index;
        idx.remove_at(idx_of_a as usize);
        a.borrow_mut().offset = crate::constants::OUT_OF_BAND;
        a.borrow_mut().length = 0;
        idx.insert(a.clone()).ok().unwrap();

        assert_eq!(idx.get(0).borrow().name(), "b");
        assert_eq!(idx.get(1).borrow().name(), "c");
        assert_eq!(idx.get(2).borrow().name(), "a");
        assert_eq!(b.borrow().offset_index, 0);
        assert_eq!(c.borrow().offset_index, 1);
        assert_eq!(a.borrow().offset_index, 2);
    }

    #[test]
    fn remove_updates_positions_of_shifted_entries() {
        let mut idx = SortedIndex::new(IndexKind::Name, 8);
        let a = desc("a", 0, 10);
        let b = desc("b", 20, 10);
        let c = desc("c", 40, 10);
        idx.insert(a.clone()).ok().unwrap();
        idx.insert(b.clone()).ok().unwrap();
        idx.insert(c.clone()).ok().unwrap();

        idx.remove_at(0);
        assert_eq!(a.borrow().name_index, -1);
        assert_eq!(b.borrow().name_index, 0);
        assert_eq!(c.borrow().name_index, 1);
    }

    proptest! {
        /// However many distinct-named, non-zero-length descriptors get
        /// inserted in whatever order, both views come out sorted by
        /// their own key, and every descriptor's stored position field
        /// matches where it actually landed.
        #[test]
        fn insert_keeps_both_views_sorted(
            mut offsets in prop::collection::hash_set(1u64..10_000, 1..40),
        ) {
            let offsets: Vec<u64> = offsets.drain().collect();
            let mut by_offset = SortedIndex::new(IndexKind::Offset, offsets.len());
            let mut by_name = SortedIndex::new(IndexKind::Name, offsets.len());

            for (i, &offset) in offsets.iter().enumerate() {
                let d = desc(&format!("f{i:04}"), offset, 8);
                by_offset.insert(d.clone()).ok().unwrap();
                by_name.insert(d).ok().unwrap();
            }

            for i in 1..by_offset.len() {
                prop_assert!(by_offset.get(i - 1).borrow().offset < by_offset.get(i).borrow().offset);
            }
            for i in 1..by_name.len() {
                prop_assert!(by_name.get(i - 1).borrow().name_key() < by_name.get(i).borrow().name_key());
            }
            for i in 0..by_offset.len() {
                prop_assert_eq!(by_offset.get(i).borrow().offset_index, i as i32);
            }
            for i in 0..by_name.len() {
                prop_assert_eq!(by_name.get(i).borrow().name_index, i as i32);
            }
        }
    }
}
