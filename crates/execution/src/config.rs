//! Contract configuration.
//!
//! One explicit object is injected into the batch executor, the swap
//! coordinators and the contract facade at construction time.

use crate::ConfigError;
use serde::Deserialize;
use swapledger_types::{ContractId, Hash};

/// Default prefix under which staged calls are stored.
pub const DEFAULT_BATCH_PREFIX: &str = "batchTransactions";

/// Default lifetime of a swap on the initiating side, in seconds.
pub const DEFAULT_USER_SIDE_TIMEOUT_SECS: u64 = 10800;

/// Default lifetime of an answered swap on the responding side, in seconds.
pub const DEFAULT_RESPONDER_TIMEOUT_SECS: u64 = 300;

/// Configuration of one contract instance.
///
/// # Example
///
/// ```
/// use swapledger_execution::ContractConfig;
///
/// let config = ContractConfig::new("VT").with_nonce_ttl_ms(50_000);
/// assert!(config.is_window_mode());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    /// Identifier of this contract (its native asset symbol).
    pub contract_id: ContractId,

    /// Lifetime of a staged call, in seconds. Zero disables expiry.
    pub tx_ttl_secs: u64,

    /// Prefix of staged calls in the world state.
    pub batch_prefix: String,

    /// Nonce acceptance window, in milliseconds.
    ///
    /// Zero selects strict mode: the nonce is checked once, at staging, and
    /// must exceed the previous one.
    pub nonce_ttl_ms: u64,

    /// Store nonce records under the alternate prefix.
    pub alternate_nonce_prefix: bool,

    /// Skip batch-embedded single-asset swaps and their operations.
    pub disable_swaps: bool,

    /// Skip batch-embedded multi-asset swaps and their operations.
    pub disable_multi_swaps: bool,

    /// Swap lifetime on the initiating side, in seconds.
    pub user_side_timeout_secs: u64,

    /// Swap lifetime once answered by the responder, in seconds.
    pub responder_timeout_secs: u64,

    /// Fingerprint of the only identity allowed to submit batches.
    ///
    /// Required: batches, and the swap answers they embed, are rejected
    /// while it is unset.
    pub batch_submitter: Option<Hash>,

    /// Operations removed from the registry.
    pub disabled_operations: Vec<String>,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            contract_id: ContractId::new("CC"),
            tx_ttl_secs: 0,
            batch_prefix: DEFAULT_BATCH_PREFIX.to_string(),
            nonce_ttl_ms: 0,
            alternate_nonce_prefix: false,
            disable_swaps: false,
            disable_multi_swaps: false,
            user_side_timeout_secs: DEFAULT_USER_SIDE_TIMEOUT_SECS,
            responder_timeout_secs: DEFAULT_RESPONDER_TIMEOUT_SECS,
            batch_submitter: None,
            disabled_operations: Vec::new(),
        }
    }
}

impl ContractConfig {
    /// Create a default config for the given contract.
    pub fn new(contract_id: impl Into<String>) -> Self {
        Self {
            contract_id: ContractId::new(contract_id),
            ..Default::default()
        }
    }

    /// Parse a TOML document. Missing fields take their defaults.
    pub fn from_toml_str(data: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(data).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the executor cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.contract_id.as_str().is_empty() {
            return Err(ConfigError::EmptyContractId);
        }
        if self.batch_prefix.is_empty() {
            return Err(ConfigError::EmptyBatchPrefix);
        }
        if self.responder_timeout_secs > self.user_side_timeout_secs {
            return Err(ConfigError::TimeoutOrder {
                responder: self.responder_timeout_secs,
                user_side: self.user_side_timeout_secs,
            });
        }
        if self.batch_submitter.is_none() {
            return Err(ConfigError::MissingSubmitter);
        }
        Ok(())
    }

    pub fn with_tx_ttl_secs(mut self, ttl: u64) -> Self {
        self.tx_ttl_secs = ttl;
        self
    }

    pub fn with_batch_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.batch_prefix = prefix.into();
        self
    }

    pub fn with_nonce_ttl_ms(mut self, ttl: u64) -> Self {
        self.nonce_ttl_ms = ttl;
        self
    }

    pub fn with_alternate_nonce_prefix(mut self) -> Self {
        self.alternate_nonce_prefix = true;
        self
    }

    pub fn with_swaps_disabled(mut self) -> Self {
        self.disable_swaps = true;
        self
    }

    pub fn with_multi_swaps_disabled(mut self) -> Self {
        self.disable_multi_swaps = true;
        self
    }

    pub fn with_batch_submitter(mut self, fingerprint: Hash) -> Self {
        self.batch_submitter = Some(fingerprint);
        self
    }

    pub fn with_disabled_operation(mut self, name: impl Into<String>) -> Self {
        self.disabled_operations.push(name.into());
        self
    }

    /// Whether nonces are checked against a sliding window at batch time.
    pub fn is_window_mode(&self) -> bool {
        self.nonce_ttl_ms > 0
    }

    pub fn is_disabled(&self, operation: &str) -> bool {
        self.disabled_operations.iter().any(|name| name == operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ContractConfig::default();
        assert_eq!(config.batch_prefix, "batchTransactions");
        assert_eq!(config.user_side_timeout_secs, 10800);
        assert_eq!(config.responder_timeout_secs, 300);
        assert!(!config.is_window_mode());
        assert_eq!(config.validate(), Err(ConfigError::MissingSubmitter));
        assert!(config
            .with_batch_submitter(Hash::from_bytes(b"robot"))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_from_toml_fills_defaults() {
        let config = ContractConfig::from_toml_str(&format!(
            r#"
            contract_id = "VT"
            nonce_ttl_ms = 50000
            disabled_operations = ["burn"]
            batch_submitter = "{}"
            "#,
            Hash::from_bytes(b"robot").to_hex()
        ))
        .unwrap();

        assert_eq!(config.contract_id.as_str(), "VT");
        assert!(config.is_window_mode());
        assert!(config.is_disabled("burn"));
        assert_eq!(config.batch_prefix, DEFAULT_BATCH_PREFIX);
    }

    #[test]
    fn test_from_toml_rejects_invalid() {
        assert_eq!(
            ContractConfig::from_toml_str(r#"batch_prefix = """#),
            Err(ConfigError::EmptyBatchPrefix)
        );
        assert!(matches!(
            ContractConfig::from_toml_str("tx_ttl_secs = \"soon\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_validate_timeout_order() {
        let mut config = ContractConfig::new("VT");
        config.responder_timeout_secs = config.user_side_timeout_secs + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TimeoutOrder { .. })
        ));
    }

    #[test]
    fn test_from_toml_requires_submitter() {
        assert_eq!(
            ContractConfig::from_toml_str(r#"contract_id = "VT""#),
            Err(ConfigError::MissingSubmitter)
        );
    }

    #[test]
    fn test_batch_submitter_from_toml() {
        let fingerprint = Hash::from_bytes(b"robot");
        let config = ContractConfig::from_toml_str(&format!(
            "batch_submitter = \"{}\"",
            fingerprint.to_hex()
        ))
        .unwrap();
        assert_eq!(config.batch_submitter, Some(fingerprint));
    }
}
