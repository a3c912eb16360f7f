//! Engine configuration surface.
//!
//! Deserializable with `serde`; the caller owns loading it from disk, env,
//! or wherever (parsing task files and CLI flags is out of scope here).

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use crate::constants::trade::{
    DEFAULT_COMPUTE_UNITS, DEFAULT_MONITOR_INTERVAL, DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS,
    DEFAULT_PROTOCOL_FEE_PERCENT, DEFAULT_SLIPPAGE_PERCENT, LAMPORTS_PER_SOL, MAX_SLIPPAGE_BPS,
};
use crate::error::{EngineError, EngineResult};
use crate::metadata::KnownTokenConfig;
use crate::rpc::pool::{RpcEndpointConfig, RpcPoolConfig as RpcRetryConfig};

/// `"default"` resolves to `DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS`; a number is
/// interpreted as whole SOL and converted to micro-lamports per compute
/// unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriorityFeeSetting {
    Default(String),
    Sol(f64),
}

impl Default for PriorityFeeSetting {
    fn default() -> Self {
        PriorityFeeSetting::Default("default".to_string())
    }
}

impl PriorityFeeSetting {
    pub fn to_micro_lamports(&self) -> u64 {
        match self {
            PriorityFeeSetting::Default(tag) if tag.eq_ignore_ascii_case("default") => {
                DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS
            }
            PriorityFeeSetting::Default(_) => DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS,
            PriorityFeeSetting::Sol(amount_sol) => {
                (amount_sol * LAMPORTS_PER_SOL as f64).round() as u64
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct KnownTokenEntry {
    pub decimals: u8,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_monitor_interval_secs() -> u64 {
    DEFAULT_MONITOR_INTERVAL.as_secs()
}

fn default_slippage_percent() -> f64 {
    DEFAULT_SLIPPAGE_PERCENT
}

fn default_protocol_fee_percent() -> f64 {
    DEFAULT_PROTOCOL_FEE_PERCENT
}

fn default_max_slippage_bps() -> u64 {
    MAX_SLIPPAGE_BPS
}

fn default_compute_units() -> u32 {
    DEFAULT_COMPUTE_UNITS
}

/// Top-level configuration: the engine's enumerated configuration surface.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub rpc_endpoints: Vec<String>,

    #[serde(default = "default_monitor_interval_secs")]
    pub monitor_interval_secs: u64,

    #[serde(default = "default_slippage_percent")]
    pub default_slippage_percent: f64,

    #[serde(default = "default_protocol_fee_percent")]
    pub protocol_fee_percent: f64,

    #[serde(default = "default_max_slippage_bps")]
    pub max_slippage_bps: u64,

    #[serde(default = "default_compute_units")]
    pub default_compute_units: u32,

    #[serde(default)]
    pub default_priority_fee: PriorityFeeSetting,

    #[serde(default)]
    pub known_tokens: HashMap<String, KnownTokenEntry>,

    /// Base URLs of community API mirrors consulted on a token-metadata
    /// cache miss, tried in order; each is queried as `GET {mirror}/{mint}`.
    #[serde(default)]
    pub metadata_api_mirrors: Vec<String>,
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.rpc_endpoints.is_empty() {
            return Err(EngineError::invalid_task("rpc_endpoints must contain at least one URL"));
        }
        if !(0.0..=100.0).contains(&self.default_slippage_percent) {
            return Err(EngineError::invalid_task("default_slippage_percent must be within [0, 100]"));
        }
        Ok(())
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    pub fn rpc_endpoints(&self) -> Vec<RpcEndpointConfig> {
        self.rpc_endpoints.iter().map(|url| RpcEndpointConfig { url: url.clone() }).collect()
    }

    pub fn rpc_pool_config(&self) -> RpcRetryConfig {
        RpcRetryConfig::default()
    }

    pub fn metadata_api_mirrors(&self) -> Vec<String> {
        self.metadata_api_mirrors.clone()
    }

    /// Parses `known_tokens`' string mint keys into `KnownTokenConfig`
    /// entries, skipping (and logging) keys that are not valid base58
    /// pubkeys rather than failing the whole config.
    pub fn known_token_configs(&self) -> Vec<KnownTokenConfig> {
        self.known_tokens
            .iter()
            .filter_map(|(mint, entry)| match Pubkey::from_str(mint) {
                Ok(mint) => Some(KnownTokenConfig {
                    mint,
                    decimals: entry.decimals,
                    symbol: entry.symbol.clone(),
                    name: entry.name.clone(),
                }),
                Err(_) => {
                    tracing::warn!(%mint, "skipping known_tokens entry with an invalid mint key");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_rpc_endpoints() {
        let config = EngineConfig {
            rpc_endpoints: vec![],
            monitor_interval_secs: 5,
            default_slippage_percent: 0.5,
            protocol_fee_percent: 1.0,
            max_slippage_bps: 500,
            default_compute_units: 200_000,
            default_priority_fee: PriorityFeeSetting::default(),
            known_tokens: HashMap::new(),
            metadata_api_mirrors: Vec::new(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn default_priority_fee_tag_resolves_to_constant() {
        let setting = PriorityFeeSetting::Default("default".into());
        assert_eq!(setting.to_micro_lamports(), DEFAULT_PRIORITY_FEE_MICRO_LAMPORTS);
    }

    #[test]
    fn sol_priority_fee_converts_to_micro_lamports() {
        let setting = PriorityFeeSetting::Sol(0.000005);
        assert_eq!(setting.to_micro_lamports(), 5_000);
    }

    #[test]
    fn skips_invalid_known_token_mint_keys() {
        let mut known_tokens = HashMap::new();
        known_tokens
            .insert("not-a-pubkey".to_string(), KnownTokenEntry { decimals: 6, symbol: None, name: None });
        let config = EngineConfig {
            rpc_endpoints: vec!["http://localhost:8899".into()],
            monitor_interval_secs: 5,
            default_slippage_percent: 0.5,
            protocol_fee_percent: 1.0,
            max_slippage_bps: 500,
            default_compute_units: 200_000,
            default_priority_fee: PriorityFeeSetting::default(),
            known_tokens,
            metadata_api_mirrors: Vec::new(),
        };
        assert!(config.known_token_configs().is_empty());
    }
}
