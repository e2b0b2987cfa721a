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

/// Capacity of a directory-table row's name field, including the
/// reserved nul terminator.
pub const NAME_LEN: usize = 64;

/// Size in bytes of one directory-table row: name + offset + length.
pub const META_LEN: usize = NAME_LEN + 4 + 4;

/// Unit of Merkle-tree hashing over the data region.
pub const BLOCK_LEN: usize = 256;

/// Size in bytes of one stored hash (four little-endian u32 words).
pub const HASH_LEN: usize = 16;

/// In-memory sentinel offset shared by every zero-length descriptor, so
/// it sorts after every real offset in the by-offset view.
pub const OUT_OF_BAND: u64 = 1 << 32;

/// The data region's offset field is 32 bits wide, so it can never
/// exceed this.
pub const MAX_DATA_LEN: u64 = 1 << 32;
