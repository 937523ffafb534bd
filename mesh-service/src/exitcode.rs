/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Minimal subset of BSD sysexits.h constants, the subset the CLI actually
//! returns from `main`.

pub const OK: i32 = 0;
pub const ERR_USAGE: i32 = 64;
pub const ERR_IOERR: i32 = 74;
pub const ERR_CONFIG: i32 = 78;
