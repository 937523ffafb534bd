/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! CLI argument validators, used as `clap::Arg::validator` callbacks.

pub fn is_valid_port(s: &str) -> Result<(), String> {
    s.parse::<u16>().map(|_| ()).map_err(|_| format!("'{}' is not a valid port number", s))
}

pub fn is_valid_bool(s: &str) -> Result<(), String> {
    match s {
        "true" | "false" | "1" | "0" => Ok(()),
        _ => Err(format!("'{}' is not a valid boolean (true/false/1/0)", s)),
    }
}

pub fn is_valid_node_id(s: &str) -> Result<(), String> {
    u64::from_str_radix(s.trim_start_matches("0x"), 16).map(|_| ()).map_err(|_| format!("'{}' is not a valid node ID", s))
}
