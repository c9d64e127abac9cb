//! Contract client with read failover and per-call timeouts.
//!
//! # Responsibilities
//! - Bind the question board contract on every configured RPC endpoint
//! - Serve reads from the first endpoint that answers in time
//! - Send writes through the primary endpoint with the signing wallet

use std::future::Future;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use futures_util::future::{BoxFuture, FutureExt};
use tokio::time::timeout;

use crate::blockchain::contract::{BountyBoard, IQuestionBoard::IQuestionBoardInstance, PendingTx};
use crate::blockchain::transaction::AlloyPendingTx;
use crate::blockchain::types::{
    BlockchainError, BlockchainResult, ChainConfig, ChainId, LedgerAnswer, LedgerQuestion,
};
use crate::blockchain::wallet::Wallet;

type Instance = IQuestionBoardInstance<DynProvider>;

/// Alloy-backed [`BountyBoard`] implementation.
#[derive(Clone)]
pub struct ContractClient {
    /// Contract bound on the primary (signing) provider, then each failover.
    instances: Vec<Instance>,
    address: Address,
    config: ChainConfig,
    timeout_duration: Duration,
}

impl ContractClient {
    /// Bind the contract at `address` using `wallet` for writes.
    pub fn new(config: ChainConfig, address: Address, wallet: &Wallet) -> BlockchainResult<Self> {
        let timeout_duration = Duration::from_secs(config.rpc_timeout_secs);
        let mut instances = Vec::new();

        // 1. Primary provider signs
        let primary_url: url::Url = config.rpc_url.parse().map_err(|e| {
            BlockchainError::Rpc(format!("Invalid RPC URL '{}': {}", config.rpc_url, e))
        })?;
        let primary = ProviderBuilder::new()
            .wallet(wallet.network_wallet())
            .connect_http(primary_url)
            .erased();
        instances.push(Instance::new(address, primary));

        // 2. Failover providers are read-only
        for url_str in &config.failover_urls {
            match url_str.parse::<url::Url>() {
                Ok(url) => {
                    let provider = ProviderBuilder::new().connect_http(url).erased();
                    instances.push(Instance::new(address, provider));
                }
                Err(_) => tracing::warn!(url = %url_str, "Ignoring invalid failover RPC URL"),
            }
        }

        tracing::debug!(
            contract = %address,
            endpoints = instances.len(),
            "Contract client created"
        );

        Ok(Self {
            instances,
            address,
            config,
            timeout_duration,
        })
    }

    /// Get the chain ID reported by the first reachable endpoint.
    pub async fn get_chain_id(&self) -> BlockchainResult<ChainId> {
        self.read("chain_id", |instance| async move {
            instance.provider().get_chain_id().await.map_err(|e| e.to_string())
        })
        .await
        .map(ChainId)
    }

    /// Verify the connected chain ID matches configuration.
    pub async fn verify_chain_id(&self) -> BlockchainResult<()> {
        let chain_id = self.get_chain_id().await?;
        if chain_id.0 != self.config.chain_id {
            return Err(BlockchainError::ChainMismatch {
                expected: self.config.chain_id,
                actual: chain_id.0,
            });
        }
        Ok(())
    }

    /// Run a read against each endpoint in order until one succeeds.
    async fn read<T, F, Fut>(&self, what: &'static str, op: F) -> BlockchainResult<T>
    where
        F: Fn(Instance) -> Fut,
        Fut: Future<Output = Result<T, String>>,
    {
        let mut all_timed_out = true;
        for (i, instance) in self.instances.iter().enumerate() {
            match timeout(self.timeout_duration, op(instance.clone())).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) => {
                    all_timed_out = false;
                    tracing::warn!(provider_idx = i, call = what, error = %e, "RPC error, trying next provider");
                }
                Err(_) => {
                    tracing::warn!(provider_idx = i, call = what, "RPC timeout, trying next provider");
                }
            }
        }

        if all_timed_out {
            Err(BlockchainError::Timeout(self.config.rpc_timeout_secs))
        } else {
            Err(BlockchainError::Rpc(format!("All providers failed: {}", what)))
        }
    }

}

impl BountyBoard for ContractClient {
    fn address(&self) -> Address {
        self.address
    }

    fn question_count(&self) -> BoxFuture<'_, BlockchainResult<U256>> {
        self.read("questionCount", |instance| async move {
            instance.questionCount().call().await.map_err(|e| e.to_string())
        })
        .boxed()
    }

    fn question(&self, index: U256) -> BoxFuture<'_, BlockchainResult<LedgerQuestion>> {
        self.read("questions", move |instance| async move {
            instance
                .questions(index)
                .call()
                .await
                .map(LedgerQuestion::from)
                .map_err(|e| e.to_string())
        })
        .boxed()
    }

    fn answers(&self, question_id: U256) -> BoxFuture<'_, BlockchainResult<Vec<LedgerAnswer>>> {
        self.read("getAnswers", move |instance| async move {
            instance
                .getAnswers(question_id)
                .call()
                .await
                .map(|answers| answers.into_iter().map(LedgerAnswer::from).collect())
                .map_err(|e| e.to_string())
        })
        .boxed()
    }

    fn post_question(
        &self,
        content: String,
        value: U256,
    ) -> BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>> {
        async move {
            let pending = self.instances[0]
                .postQuestion(content)
                .value(value)
                .send()
                .await
                .map_err(|e| BlockchainError::Rpc(format!("postQuestion submission failed: {}", e)))?
                .with_required_confirmations(self.config.confirmation_blocks);

            tracing::info!(tx_hash = %pending.tx_hash(), value = %value, "Question transaction submitted");
            Ok(Box::new(AlloyPendingTx::new(pending)) as Box<dyn PendingTx>)
        }
        .boxed()
    }

    fn post_answer(
        &self,
        question_id: U256,
        content: String,
    ) -> BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>> {
        async move {
            let pending = self.instances[0]
                .postAnswer(question_id, content)
                .send()
                .await
                .map_err(|e| BlockchainError::Rpc(format!("postAnswer submission failed: {}", e)))?
                .with_required_confirmations(self.config.confirmation_blocks);

            tracing::info!(tx_hash = %pending.tx_hash(), question_id = %question_id, "Answer transaction submitted");
            Ok(Box::new(AlloyPendingTx::new(pending)) as Box<dyn PendingTx>)
        }
        .boxed()
    }

    fn accept_answer(
        &self,
        question_id: U256,
        answer_id: U256,
    ) -> BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>> {
        async move {
            let pending = self.instances[0]
                .acceptAnswer(question_id, answer_id)
                .send()
                .await
                .map_err(|e| BlockchainError::Rpc(format!("acceptAnswer submission failed: {}", e)))?
                .with_required_confirmations(self.config.confirmation_blocks);

            tracing::info!(
                tx_hash = %pending.tx_hash(),
                question_id = %question_id,
                answer_id = %answer_id,
                "Accept transaction submitted"
            );
            Ok(Box::new(AlloyPendingTx::new(pending)) as Box<dyn PendingTx>)
        }
        .boxed()
    }
}

impl std::fmt::Debug for ContractClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContractClient")
            .field("contract", &self.address)
            .field("rpc_url", &self.config.rpc_url)
            .field("chain_id", &self.config.chain_id)
            .field("timeout_secs", &self.config.rpc_timeout_secs)
            .finish()
    }
}
