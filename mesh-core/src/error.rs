/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MeshError>;

/// Small, flat error kinds. These are never chained or wrapped; a caller
/// matches the kind and decides locally what to do.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshError {
    /// Malformed argument or out-of-range index. Indicates a caller bug.
    #[error("invalid parameter")]
    Invalid,
    /// Lookup missed.
    #[error("not found")]
    NotFound,
    /// Value not yet known (no best hop, no protection window entry).
    #[error("not available")]
    NotAvailable,
    /// A blocking primitive expired, or a protection window aged out.
    #[error("timed out")]
    TimedOut,
    /// Duplicate state transition, or an already-seen sequence number.
    #[error("already present")]
    AlreadyPresent,
    /// Per-node path reference slots exhausted.
    #[error("busy")]
    Busy,
    /// Global table region exhausted.
    #[error("no memory")]
    NoMem,
    /// Requested neighbour/originator view is missing.
    #[error("no link")]
    NoLink,
    /// RBBQ frame header claims more bytes than are available.
    #[error("corrupted frame")]
    Corrupted,
    /// Internal assertion violated.
    #[error("internal fault")]
    Fault,
}

impl MeshError {
    /// True for kinds that represent normal, expected control flow rather
    /// than a hard failure (callers often treat these as success).
    #[inline(always)]
    pub fn is_soft(&self) -> bool {
        matches!(self, MeshError::AlreadyPresent | MeshError::NotAvailable)
    }
}
