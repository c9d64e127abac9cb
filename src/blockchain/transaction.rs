//! Confirmation of submitted transactions.
//!
//! Waiting is unbounded: a pending write resolves only when the provider
//! reports a receipt (or fails), never because a deadline passed.

use alloy::network::Ethereum;
use alloy::primitives::TxHash;
use alloy::providers::PendingTransactionBuilder;
use alloy::rpc::types::TransactionReceipt;
use futures_util::future::{BoxFuture, FutureExt};

use crate::blockchain::contract::PendingTx;
use crate::blockchain::types::{BlockchainError, BlockchainResult, TxConfirmation};

/// Alloy pending transaction awaiting its receipt.
pub struct AlloyPendingTx {
    inner: PendingTransactionBuilder<Ethereum>,
}

impl AlloyPendingTx {
    pub fn new(inner: PendingTransactionBuilder<Ethereum>) -> Self {
        Self { inner }
    }
}

impl PendingTx for AlloyPendingTx {
    fn tx_hash(&self) -> TxHash {
        *self.inner.tx_hash()
    }

    fn confirm(self: Box<Self>) -> BoxFuture<'static, BlockchainResult<TxConfirmation>> {
        let tx_hash = *self.inner.tx_hash();
        async move {
            tracing::debug!(tx_hash = %tx_hash, "Waiting for confirmation");
            let receipt = self
                .inner
                .get_receipt()
                .await
                .map_err(|e| BlockchainError::Rpc(format!("Confirmation failed: {}", e)))?;
            confirmation_from_receipt(&receipt)
        }
        .boxed()
    }
}

/// Turn a receipt into a confirmation, treating failed status as a revert.
pub fn confirmation_from_receipt(receipt: &TransactionReceipt) -> BlockchainResult<TxConfirmation> {
    if !receipt.status() {
        return Err(BlockchainError::Reverted(format!(
            "transaction {} reverted",
            receipt.transaction_hash
        )));
    }

    tracing::info!(
        tx_hash = %receipt.transaction_hash,
        block_number = ?receipt.block_number,
        "Transaction confirmed"
    );

    Ok(TxConfirmation {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
    })
}
