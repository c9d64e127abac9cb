//! Wallet and contract binding.
//!
//! # States
//! ```text
//! not connected ──connect() ok──▶ connected(account, contract)
//!       ▲                               │
//!       └──── disconnect() / failed ────┘
//! ```
//!
//! Every published change bumps `Binding::generation`. Consumers hold a
//! `watch::Receiver` and see each change without re-subscribing; the
//! controller uses the generation to drop results computed for an older
//! binding.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use alloy::primitives::Address;
use arc_swap::ArcSwap;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::watch;

use crate::blockchain::contract::BountyBoard;
use crate::blockchain::types::{BlockchainError, BlockchainResult};
use crate::blockchain::{ContractClient, Wallet};
use crate::config::BoardConfig;

/// Shared, read-only contract handle.
pub type ContractHandle = Arc<dyn BountyBoard>;

/// Current account and contract, as seen by consumers.
#[derive(Clone, Default)]
pub struct Binding {
    pub account: Option<Address>,
    pub contract: Option<ContractHandle>,
    pub generation: u64,
}

impl Binding {
    pub fn is_connected(&self) -> bool {
        self.contract.is_some()
    }

    fn matches(&self, account: Option<Address>, contract: Option<&ContractHandle>) -> bool {
        let same_contract = match (&self.contract, contract) {
            (None, None) => true,
            (Some(a), Some(b)) => same_handle(a, b),
            _ => false,
        };
        self.account == account && same_contract
    }
}

/// Identity comparison of two contract handles.
pub fn same_handle(a: &ContractHandle, b: &ContractHandle) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("account", &self.account)
            .field("contract", &self.contract.as_ref().map(|c| c.address()))
            .field("generation", &self.generation)
            .finish()
    }
}

/// A successful wallet handshake.
pub struct Connection {
    pub account: Address,
    pub contract: ContractHandle,
}

/// Performs the wallet/contract handshake.
pub trait WalletConnector: Send + Sync {
    fn connect(&self) -> BoxFuture<'_, BlockchainResult<Connection>>;
}

/// Changes reported by the wallet side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalletEvent {
    AccountChanged,
    ChainChanged,
    Disconnected,
}

/// Connector backed by a local signer and JSON-RPC endpoints.
#[derive(Debug, Clone)]
pub struct RpcConnector {
    config: BoardConfig,
}

impl RpcConnector {
    pub fn new(config: BoardConfig) -> Self {
        Self { config }
    }
}

impl WalletConnector for RpcConnector {
    fn connect(&self) -> BoxFuture<'_, BlockchainResult<Connection>> {
        async move {
            let address: Address = self.config.contract.address.parse().map_err(|e| {
                BlockchainError::NotAvailable(format!(
                    "invalid contract address '{}': {}",
                    self.config.contract.address, e
                ))
            })?;
            let wallet = Wallet::from_env(&self.config.wallet.private_key_env, self.config.chain.chain_id)?;
            let client = ContractClient::new(self.config.chain.clone(), address, &wallet)?;
            client.verify_chain_id().await?;

            Ok(Connection {
                account: wallet.address(),
                contract: Arc::new(client) as ContractHandle,
            })
        }
        .boxed()
    }
}

/// Owns the binding and publishes every change to subscribers.
pub struct ConnectionContext {
    connector: ArcSwap<Box<dyn WalletConnector>>,
    tx: watch::Sender<Binding>,
    /// Bumped by every connect/disconnect so a slow handshake cannot
    /// overwrite a newer one.
    attempts: AtomicU64,
}

impl ConnectionContext {
    pub fn new(connector: impl WalletConnector + 'static) -> Self {
        let (tx, _) = watch::channel(Binding::default());
        Self {
            connector: ArcSwap::from_pointee(Box::new(connector) as Box<dyn WalletConnector>),
            tx,
            attempts: AtomicU64::new(0),
        }
    }

    /// Receive the current binding and every later change.
    pub fn subscribe(&self) -> watch::Receiver<Binding> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Binding {
        self.tx.borrow().clone()
    }

    /// Establish or refresh the binding.
    ///
    /// Failure is not an error for the caller: the binding becomes "not
    /// connected" and `false` is returned. No retry is attempted.
    pub async fn connect(&self) -> bool {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let connector = self.connector.load_full();

        let result = connector.connect().await;

        if self.attempts.load(Ordering::SeqCst) != attempt {
            tracing::debug!(attempt, "Discarding superseded wallet handshake");
            return self.current().is_connected();
        }

        match result {
            Ok(connection) => {
                tracing::info!(
                    account = %connection.account,
                    contract = %connection.contract.address(),
                    "Wallet connected"
                );
                self.publish(Some(connection.account), Some(connection.contract));
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Wallet not connected");
                self.publish(None, None);
                false
            }
        }
    }

    /// Drop the binding.
    pub fn disconnect(&self) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.publish(None, None) {
            tracing::info!("Wallet disconnected");
        }
    }

    /// React to an account switch, network switch or disconnect.
    pub async fn handle_event(&self, event: WalletEvent) -> bool {
        tracing::debug!(?event, "Wallet event");
        match event {
            WalletEvent::AccountChanged | WalletEvent::ChainChanged => self.connect().await,
            WalletEvent::Disconnected => {
                self.disconnect();
                false
            }
        }
    }

    /// Use a different connector for future handshakes.
    pub fn replace_connector(&self, connector: impl WalletConnector + 'static) {
        self.connector
            .store(Arc::new(Box::new(connector) as Box<dyn WalletConnector>));
    }

    /// Publish a new binding if it differs from the current one.
    fn publish(&self, account: Option<Address>, contract: Option<ContractHandle>) -> bool {
        self.tx.send_if_modified(|binding| {
            if binding.matches(account, contract.as_ref()) {
                return false;
            }
            *binding = Binding {
                account,
                contract,
                generation: binding.generation + 1,
            };
            true
        })
    }
}
