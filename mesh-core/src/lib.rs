/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod error;
pub mod util;
pub mod clock;
pub mod port;
pub mod protect;
pub mod path;
pub mod node;
pub mod proto;

pub use error::{MeshError, Result};
pub use clock::{Clock, NodeId};
pub use node::NodeTable;

/// Protocol version carried in heartbeat and originator statements.
///
/// Statements carrying any other value are dropped silently.
pub const PROTOCOL_VERSION: u8 = 0;
