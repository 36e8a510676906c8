//! JSON-RPC implementation of the chain ports.
//!
//! A fresh provider is built per call. Reads go through a plain provider;
//! writes attach the executor wallet and wait for the receipt.

use std::fmt::Display;
use std::str::FromStr;

use alloy_primitives::{keccak256, Address, Bytes, FixedBytes, U256};
use alloy_provider::network::EthereumWallet;
use alloy_provider::{Provider, ProviderBuilder};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{decode_revert_reason, sol};
use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::config::{Config, PRIVATE_KEY_ENV};
use crate::domain::RoundData;
use crate::error::{ConfigError, Result, TransportError, TransportErrorKind};
use crate::port::{
    Balances, ExecutionGateway, FeedRegistry, PriceOracle, RawOutcome, Registry, SubmitRequest,
};

sol! {
    #[sol(rpc)]
    contract IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }

    #[sol(rpc)]
    contract IDSProxy {
        function execute(address target, bytes data) external payable returns (bytes32 response);
    }

    #[sol(rpc)]
    contract IContractRegistry {
        function getAddr(bytes4 id) external view returns (address);
    }

    #[sol(rpc)]
    contract IFeedRegistry {
        function getFeed(address base, address quote) external view returns (address aggregator);
    }

    #[sol(rpc)]
    contract IAggregatorV3 {
        function latestRoundData() external view returns (
            uint80 roundId,
            int256 answer,
            uint256 startedAt,
            uint256 updatedAt,
            uint80 answeredInRound
        );
    }
}

/// Registry id of a contract: first four bytes of `keccak256(name)`.
#[must_use]
pub fn registry_id(name: &str) -> FixedBytes<4> {
    FixedBytes::from_slice(&keccak256(name.as_bytes())[..4])
}

/// Chain access over HTTP JSON-RPC.
pub struct RpcChain {
    rpc_url: Url,
    signer: Option<PrivateKeySigner>,
    registry: Option<Address>,
    feed_registry: Option<Address>,
}

impl RpcChain {
    #[must_use]
    pub const fn new(rpc_url: Url) -> Self {
        Self {
            rpc_url,
            signer: None,
            registry: None,
            feed_registry: None,
        }
    }

    /// Build from config. The signer is attached when `EXECUTOR_PRIVATE_KEY`
    /// is set.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for an unparsable URL or key.
    #[allow(clippy::result_large_err)]
    pub fn from_config(config: &Config) -> Result<Self> {
        let rpc_url = Url::parse(&config.network.rpc_url).map_err(|e| ConfigError::InvalidValue {
            field: "rpc_url",
            reason: e.to_string(),
        })?;

        let signer = config
            .private_key
            .as_deref()
            .map(|key| {
                PrivateKeySigner::from_str(key)
                    .map(|signer| signer.with_chain_id(Some(config.network.chain_id)))
                    .map_err(|e| ConfigError::InvalidValue {
                        field: PRIVATE_KEY_ENV,
                        reason: e.to_string(),
                    })
            })
            .transpose()?;

        Ok(Self {
            rpc_url,
            signer,
            registry: config.network.registry,
            feed_registry: config.monitor.feed_registry,
        })
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Address) -> Self {
        self.registry = Some(registry);
        self
    }

    #[must_use]
    pub fn with_feed_registry(mut self, feed_registry: Address) -> Self {
        self.feed_registry = Some(feed_registry);
        self
    }

    /// Address of the configured signer, if any.
    #[must_use]
    pub fn signer_address(&self) -> Option<Address> {
        self.signer.as_ref().map(PrivateKeySigner::address)
    }

    fn read_provider(&self) -> impl Provider {
        ProviderBuilder::new().connect_http(self.rpc_url.clone())
    }

    fn write_provider(&self) -> std::result::Result<impl Provider, TransportError> {
        let signer = self.signer.clone().ok_or_else(|| {
            TransportError::new(
                TransportErrorKind::Signature,
                format!("{PRIVATE_KEY_ENV} is not set"),
            )
        })?;
        Ok(ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(self.rpc_url.clone()))
    }
}

fn transport_error(context: &str, e: impl Display) -> TransportError {
    let message = format!("{context}: {e}");
    if message.to_lowercase().contains("nonce") {
        TransportError::new(TransportErrorKind::Nonce, message)
    } else {
        TransportError::network(message)
    }
}

/// Node errors that mean the call exhausted its gas limit.
fn is_out_of_gas(message: &str) -> bool {
    let message = message.to_lowercase();
    ["out of gas", "gas required exceeds", "intrinsic gas too low"]
        .iter()
        .any(|needle| message.contains(needle))
}

fn failed_simulation(gas_used: u64, revert_reason: Option<String>) -> RawOutcome {
    RawOutcome {
        succeeded: false,
        gas_used,
        revert_reason,
        emitted_data: Bytes::new(),
        tx_hash: None,
    }
}

fn missing(what: &str) -> TransportError {
    TransportError::rpc(format!("{what} address is not configured"))
}

#[async_trait]
impl Registry for RpcChain {
    async fn resolve_address(&self, name: &str) -> std::result::Result<Address, TransportError> {
        let registry = self.registry.ok_or_else(|| missing("registry"))?;
        let provider = self.read_provider();
        let address = IContractRegistry::new(registry, &provider)
            .getAddr(registry_id(name))
            .call()
            .await
            .map_err(|e| transport_error("registry lookup failed", e))?;

        if address.is_zero() {
            return Err(TransportError::rpc(format!("{name} is not registered")));
        }
        debug!(name, address = %address, "Resolved registry entry");
        Ok(address)
    }
}

#[async_trait]
impl Balances for RpcChain {
    async fn balance_of(
        &self,
        asset: Address,
        holder: Address,
    ) -> std::result::Result<U256, TransportError> {
        let provider = self.read_provider();
        IERC20::new(asset, &provider)
            .balanceOf(holder)
            .call()
            .await
            .map_err(|e| transport_error("balance read failed", e))
    }

    async fn allowance(
        &self,
        asset: Address,
        owner: Address,
        spender: Address,
    ) -> std::result::Result<U256, TransportError> {
        let provider = self.read_provider();
        IERC20::new(asset, &provider)
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| transport_error("allowance read failed", e))
    }

    async fn approve(
        &self,
        asset: Address,
        spender: Address,
        amount: U256,
    ) -> std::result::Result<(), TransportError> {
        let provider = self.write_provider()?;
        let receipt = IERC20::new(asset, &provider)
            .approve(spender, amount)
            .send()
            .await
            .map_err(|e| transport_error("failed to send approval", e))?
            .get_receipt()
            .await
            .map_err(|e| transport_error("failed to get receipt", e))?;

        if !receipt.status() {
            return Err(TransportError::rpc(format!(
                "approval {:?} reverted",
                receipt.transaction_hash
            )));
        }
        info!(
            asset = %asset,
            spender = %spender,
            tx_hash = ?receipt.transaction_hash,
            "Approval confirmed"
        );
        Ok(())
    }
}

#[async_trait]
impl ExecutionGateway for RpcChain {
    async fn submit(
        &self,
        request: SubmitRequest,
    ) -> std::result::Result<RawOutcome, TransportError> {
        let provider = self.write_provider()?;
        let proxy = IDSProxy::new(request.account.proxy, &provider);
        let call = proxy
            .execute(request.target, request.payload.clone())
            .from(request.account.owner)
            .gas(request.gas_limit);

        // A revert found by simulation never reaches the mempool.
        if let Err(e) = call.call().await {
            if let Some(data) = e.as_revert_data() {
                return Ok(failed_simulation(0, decode_revert_reason(&data)));
            }
            let message = e.to_string();
            if is_out_of_gas(&message) {
                debug!(gas_limit = request.gas_limit, error = %message, "Simulation ran out of gas");
                return Ok(failed_simulation(request.gas_limit, None));
            }
            return Err(transport_error("simulation failed", e));
        }

        let receipt = call
            .send()
            .await
            .map_err(|e| transport_error("failed to send recipe", e))?
            .get_receipt()
            .await
            .map_err(|e| transport_error("failed to get receipt", e))?;

        Ok(RawOutcome {
            succeeded: receipt.status(),
            gas_used: receipt.gas_used,
            revert_reason: None,
            emitted_data: Bytes::new(),
            tx_hash: Some(receipt.transaction_hash),
        })
    }

    fn gateway_name(&self) -> &'static str {
        "json-rpc"
    }
}

#[async_trait]
impl FeedRegistry for RpcChain {
    async fn get_feed(
        &self,
        base: Address,
        quote: Address,
    ) -> std::result::Result<Address, TransportError> {
        let registry = self.feed_registry.ok_or_else(|| missing("feed registry"))?;
        let provider = self.read_provider();
        IFeedRegistry::new(registry, &provider)
            .getFeed(base, quote)
            .call()
            .await
            .map_err(|e| transport_error("feed registry read failed", e))
    }
}

#[async_trait]
impl PriceOracle for RpcChain {
    async fn latest_round(&self, feed: Address) -> std::result::Result<RoundData, TransportError> {
        let provider = self.read_provider();
        let round = IAggregatorV3::new(feed, &provider)
            .latestRoundData()
            .call()
            .await
            .map_err(|e| transport_error("aggregator read failed", e))?;

        Ok(RoundData {
            answer: round.answer,
            updated_at: round.updatedAt.saturating_to(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ActionKind;

    #[test]
    fn registry_id_matches_action_ids() {
        for kind in ActionKind::ALL {
            assert_eq!(registry_id(kind.contract_name()), kind.id());
        }
    }

    #[test]
    fn out_of_gas_messages_are_recognized() {
        assert!(is_out_of_gas("server returned an error response: error code -32000: out of gas"));
        assert!(is_out_of_gas("Gas required exceeds allowance (3000000)"));
        assert!(!is_out_of_gas("connection reset by peer"));
        assert!(!is_out_of_gas("nonce too low"));
    }

    #[test]
    fn out_of_gas_simulation_classifies_as_out_of_gas() {
        let raw = failed_simulation(3_000_000, None);
        assert!(!raw.succeeded);
        assert_eq!(raw.gas_used, 3_000_000);
        assert!(raw.revert_reason.is_none());
    }

    #[test]
    fn signer_takes_configured_chain_id() {
        let mut config = Config::parse(
            r#"
[network]
rpc_url = "http://localhost:8545"
chain_id = 10
"#,
        )
        .unwrap();
        config.private_key = Some(
            "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318".to_string(),
        );
        let chain = RpcChain::from_config(&config).unwrap();
        assert_eq!(chain.signer.as_ref().and_then(|signer| signer.chain_id()), Some(10));
    }

    #[test]
    fn missing_signer_is_signature_error() {
        let chain = RpcChain::new(Url::parse("http://localhost:8545").unwrap());
        let err = chain.write_provider().err().unwrap();
        assert_eq!(err.kind, TransportErrorKind::Signature);
    }
}
