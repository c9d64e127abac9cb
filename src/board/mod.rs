//! Board synchronization subsystem.
//!
//! # Data Flow
//! ```text
//! WalletConnector ──handshake──▶ ConnectionContext ──watch<Binding>──▶ BoardController
//!                                                                        │   │
//!                              ledger reads/writes via BountyBoard ◀────┘   │
//!                                                 Notifier (toasts) ◀───────┘
//! ```
//!
//! The context owns the binding; the controller owns the mirrored questions,
//! the answer visibility cache, the loading flags and the draft.

pub mod connection;
pub mod controller;
pub mod error;
pub mod notify;
pub mod types;

pub use connection::{Binding, Connection, ConnectionContext, ContractHandle, RpcConnector, WalletConnector, WalletEvent};
pub use controller::BoardController;
pub use error::{BoardError, BoardResult};
pub use notify::{ChannelNotifier, Notice, NoticeLevel, Notifier, TracingNotifier};
pub use types::{Answer, AnswerView, Draft, LoadOutcome, LoadingSnapshot, Question, SubmissionState, ToggleOutcome};
