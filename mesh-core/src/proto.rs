/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Data-object and function-code identifiers assigned on the wire.
//!
//! Statements themselves are carried by an enclosing codec (CBOR/JSON over
//! an identifier -> value map); this module only names the identifiers the
//! mesh core cares about. Encoding/decoding the map itself is an external
//! collaborator.

/// Heartbeat statement group id.
pub const DO_HEARTBEAT: u16 = 0x08;
/// Originator statement group id.
pub const DO_ORIGINATOR: u16 = 0x09;
/// Node name data object id.
pub const DO_NODE_NAME: u16 = 0x17;

pub const DO_HEARTBEAT_VERSION: u16 = 0x8000;
pub const DO_HEARTBEAT_PERIOD_S: u16 = 0x8001;
pub const DO_HEARTBEAT_NAME_MAPPING_ID: u16 = 0x8002;
pub const DO_ORIGINATOR_VERSION: u16 = 0x8003;
pub const DO_ORIGINATOR_AGE_MS: u16 = 0x8004;
pub const DO_ORIGINATOR_NAME_MAPPING_ID: u16 = 0x8005;
pub const DO_ORIGINATOR_ROUTER_NODE_ID: u16 = 0x8006;
pub const DO_ORIGINATOR_THROUGHPUT: u16 = 0x8007;

/// Binary function codes.
pub const FN_GET: u8 = 0x10;
pub const FN_APPEND: u8 = 0x11;
pub const FN_DELETE: u8 = 0x12;
pub const FN_FETCH: u8 = 0x13;
pub const FN_UPDATE: u8 = 0x14;
pub const FN_RESPONSE: u8 = 0x15;
pub const FN_STATEMENT: u8 = 0x16;

/// Text function code equivalents, in the same order as the binary codes above.
pub const FN_TEXT: [u8; 7] = [b'G', b'A', b'D', b'F', b'U', b'R', b'S'];
