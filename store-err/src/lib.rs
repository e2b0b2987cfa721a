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

/// Error taxonomy surfaced by every public store operation.
///
/// Each variant corresponds to one of the integer return codes the
/// operation layer's source contract specifies; the mapping is noted on
/// each operation in `store-core`.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("no file named {0:?}")]
    NotFound(String),
    #[error("a file named {0:?} already exists")]
    Exists(String),
    #[error("invalid argument: {0}")]
    BadArg(&'static str),
    #[error("not enough space for the request")]
    NoSpace,
    #[error("hash verification failed for block {0}")]
    IntegrityFailure(u32),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
