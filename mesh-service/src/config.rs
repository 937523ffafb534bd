/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

//! Layered TOML configuration, loaded over the compile-time defaults that
//! used to be preprocessor constants.

use serde::{Deserialize, Serialize};

fn default_buf_count() -> usize {
    16
}
fn default_buf_data_size() -> usize {
    1024
}
fn default_node_count() -> usize {
    16
}
fn default_node_paths_max() -> usize {
    2
}
fn default_seqno_expected_range() -> u8 {
    10
}
fn default_seqno_max_age_ms() -> i64 {
    3_000
}
fn default_seqno_cache_size() -> usize {
    8
}
fn default_local_node_id() -> String {
    "0".to_string()
}
fn default_listen_port() -> u16 {
    9981
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub local_node_id: String,
    pub listen_port: u16,
    pub buf_count: usize,
    pub buf_data_size: usize,
    pub node_count: usize,
    pub node_paths_max: usize,
    pub seqno_expected_range: u8,
    pub seqno_max_age_ms: i64,
    pub seqno_cache_size: usize,
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            local_node_id: default_local_node_id(),
            listen_port: default_listen_port(),
            buf_count: default_buf_count(),
            buf_data_size: default_buf_data_size(),
            node_count: default_node_count(),
            node_paths_max: default_node_paths_max(),
            seqno_expected_range: default_seqno_expected_range(),
            seqno_max_age_ms: default_seqno_max_age_ms(),
            seqno_cache_size: default_seqno_cache_size(),
        }
    }
}

impl MeshConfig {
    pub fn local_node_id_parsed(&self) -> mesh_core::Result<u64> {
        u64::from_str_radix(self.local_node_id.trim_start_matches("0x"), 16)
            .or_else(|_| self.local_node_id.parse::<u64>())
            .map_err(|_| mesh_core::MeshError::Invalid)
    }

    pub fn load(path: &std::path::Path) -> std::io::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => toml::from_str(&s).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let cfg: MeshConfig = toml::from_str("listen_port = 4001\n").unwrap();
        assert_eq!(cfg.listen_port, 4001);
        assert_eq!(cfg.buf_count, default_buf_count());
        assert_eq!(cfg.seqno_expected_range, default_seqno_expected_range());
    }

    #[test]
    fn hex_node_id_parses() {
        let cfg = MeshConfig { local_node_id: "0xFF".into(), ..MeshConfig::default() };
        assert_eq!(cfg.local_node_id_parsed().unwrap(), 0xFF);
    }
}
