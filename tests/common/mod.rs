//! Shared test doubles for the board integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{address, Address, TxHash, U256};
use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::{oneshot, watch};

use bounty_board::blockchain::{
    BlockchainError, BlockchainResult, BountyBoard, LedgerAnswer, LedgerQuestion, PendingTx, TxConfirmation,
};
use bounty_board::board::{
    Binding, BoardController, Connection, ContractHandle, Notice, NoticeLevel, Notifier, WalletConnector,
};

pub const ALICE: Address = address!("0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1");
pub const BOB: Address = address!("0xb0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0");

pub fn ledger_question(id: u64, content: &str) -> LedgerQuestion {
    LedgerQuestion {
        id: U256::from(id),
        content: content.to_string(),
        author: ALICE,
        bounty: U256::from(id) * U256::from(100_000_000_000_000_000u64),
        answered: false,
    }
}

pub fn ledger_answer(id: u64, question_id: u64, content: &str) -> LedgerAnswer {
    LedgerAnswer {
        id: U256::from(id),
        content: content.to_string(),
        author: BOB,
        accepted: false,
        question_id: U256::from(question_id),
    }
}

/// One scripted reply to `answers()`.
struct AnswerReply {
    gate: Option<oneshot::Receiver<()>>,
    result: Result<Vec<LedgerAnswer>, String>,
}

/// How the next submitted question behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostBehavior {
    Confirm,
    RejectSubmit,
    Revert,
}

/// In-memory question board with controllable timing and failures.
pub struct MockBoard {
    address: Address,
    questions: Arc<Mutex<Vec<LedgerQuestion>>>,
    answers: Arc<Mutex<HashMap<u64, Vec<LedgerAnswer>>>>,
    question_gates: Mutex<HashMap<u64, oneshot::Receiver<()>>>,
    answer_script: Mutex<VecDeque<AnswerReply>>,
    confirm_gate: Mutex<Option<oneshot::Receiver<()>>>,
    failing_index: Mutex<Option<u64>>,
    fail_count: AtomicBool,
    post_behavior: Mutex<PostBehavior>,
    completion_order: Mutex<Vec<u64>>,
    pub count_calls: AtomicUsize,
    pub question_calls: AtomicUsize,
    pub answer_calls: AtomicUsize,
    pub post_calls: AtomicUsize,
    pub answer_post_calls: AtomicUsize,
    pub accept_calls: AtomicUsize,
}

impl MockBoard {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            questions: Arc::new(Mutex::new(Vec::new())),
            answers: Arc::new(Mutex::new(HashMap::new())),
            question_gates: Mutex::new(HashMap::new()),
            answer_script: Mutex::new(VecDeque::new()),
            confirm_gate: Mutex::new(None),
            failing_index: Mutex::new(None),
            fail_count: AtomicBool::new(false),
            post_behavior: Mutex::new(PostBehavior::Confirm),
            completion_order: Mutex::new(Vec::new()),
            count_calls: AtomicUsize::new(0),
            question_calls: AtomicUsize::new(0),
            answer_calls: AtomicUsize::new(0),
            post_calls: AtomicUsize::new(0),
            answer_post_calls: AtomicUsize::new(0),
            accept_calls: AtomicUsize::new(0),
        }
    }

    /// A board holding questions `0..n` with content `"question {i}"`.
    pub fn with_questions(address: Address, n: u64) -> Self {
        let board = Self::new(address);
        for i in 0..n {
            board.push_question(ledger_question(i, &format!("question {}", i)));
        }
        board
    }

    pub fn push_question(&self, question: LedgerQuestion) {
        self.questions.lock().unwrap().push(question);
    }

    pub fn set_answers(&self, question_id: u64, answers: Vec<LedgerAnswer>) {
        self.answers.lock().unwrap().insert(question_id, answers);
    }

    /// Hold the read of question `index` until the returned sender fires.
    pub fn gate_question(&self, index: u64) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.question_gates.lock().unwrap().insert(index, rx);
        tx
    }

    /// Queue a reply for the next `answers()` call, released by the sender.
    pub fn script_answers(&self, result: Result<Vec<LedgerAnswer>, String>) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.answer_script.lock().unwrap().push_back(AnswerReply {
            gate: Some(rx),
            result,
        });
        tx
    }

    /// Hold the next confirmation until the returned sender fires.
    pub fn gate_confirmation(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.confirm_gate.lock().unwrap() = Some(rx);
        tx
    }

    pub fn fail_question_at(&self, index: Option<u64>) {
        *self.failing_index.lock().unwrap() = index;
    }

    pub fn fail_count(&self, fail: bool) {
        self.fail_count.store(fail, Ordering::SeqCst);
    }

    pub fn set_post_behavior(&self, behavior: PostBehavior) {
        *self.post_behavior.lock().unwrap() = behavior;
    }

    pub fn completion_order(&self) -> Vec<u64> {
        self.completion_order.lock().unwrap().clone()
    }

    pub fn total_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
            + self.question_calls.load(Ordering::SeqCst)
            + self.answer_calls.load(Ordering::SeqCst)
            + self.post_calls.load(Ordering::SeqCst)
            + self.answer_post_calls.load(Ordering::SeqCst)
            + self.accept_calls.load(Ordering::SeqCst)
    }

    pub fn answers_of(&self, question_id: u64) -> Vec<LedgerAnswer> {
        self.answers.lock().unwrap().get(&question_id).cloned().unwrap_or_default()
    }

    /// Build the pending write for the current post behavior; `effect` runs on confirmation.
    fn pending(&self, effect: Box<dyn FnOnce() + Send>) -> BlockchainResult<Box<dyn PendingTx>> {
        let behavior = *self.post_behavior.lock().unwrap();
        if behavior == PostBehavior::RejectSubmit {
            return Err(BlockchainError::Wallet("user rejected the request".to_string()));
        }

        let gate = self.confirm_gate.lock().unwrap().take();
        Ok(Box::new(MockPending {
            tx_hash: TxHash::repeat_byte(0x11),
            gate,
            revert: behavior == PostBehavior::Revert,
            effect,
        }))
    }
}

impl BountyBoard for MockBoard {
    fn address(&self) -> Address {
        self.address
    }

    fn question_count(&self) -> BoxFuture<'_, BlockchainResult<U256>> {
        async move {
            self.count_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_count.load(Ordering::SeqCst) {
                return Err(BlockchainError::Rpc("questionCount unavailable".to_string()));
            }
            let len = self.questions.lock().unwrap().len();
            Ok(U256::from(len))
        }
        .boxed()
    }

    fn question(&self, index: U256) -> BoxFuture<'_, BlockchainResult<LedgerQuestion>> {
        async move {
            self.question_calls.fetch_add(1, Ordering::SeqCst);
            let index: u64 = index.to();

            let gate = self.question_gates.lock().unwrap().remove(&index);
            if let Some(gate) = gate {
                let _ = gate.await;
            }

            let failing = *self.failing_index.lock().unwrap() == Some(index);
            if failing {
                return Err(BlockchainError::Rpc(format!("questions({}) failed", index)));
            }

            self.completion_order.lock().unwrap().push(index);
            let question = self.questions.lock().unwrap().get(index as usize).cloned();
            question.ok_or_else(|| BlockchainError::Rpc(format!("no question at {}", index)))
        }
        .boxed()
    }

    fn answers(&self, question_id: U256) -> BoxFuture<'_, BlockchainResult<Vec<LedgerAnswer>>> {
        async move {
            self.answer_calls.fetch_add(1, Ordering::SeqCst);
            let question_id: u64 = question_id.to();

            let scripted = self.answer_script.lock().unwrap().pop_front();
            if let Some(reply) = scripted {
                if let Some(gate) = reply.gate {
                    let _ = gate.await;
                }
                return reply.result.map_err(BlockchainError::Rpc);
            }

            let answers = self.answers.lock().unwrap().get(&question_id).cloned();
            Ok(answers.unwrap_or_default())
        }
        .boxed()
    }

    fn post_question(&self, content: String, value: U256) -> BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>> {
        async move {
            self.post_calls.fetch_add(1, Ordering::SeqCst);
            let questions = self.questions.clone();
            self.pending(Box::new(move || {
                let mut questions = questions.lock().unwrap();
                let id = questions.len() as u64;
                questions.push(LedgerQuestion {
                    id: U256::from(id),
                    content,
                    author: ALICE,
                    bounty: value,
                    answered: false,
                });
            }))
        }
        .boxed()
    }

    fn post_answer(&self, question_id: U256, content: String) -> BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>> {
        async move {
            self.answer_post_calls.fetch_add(1, Ordering::SeqCst);
            let answers = self.answers.clone();
            let question_id: u64 = question_id.to();
            self.pending(Box::new(move || {
                let mut answers = answers.lock().unwrap();
                let list = answers.entry(question_id).or_default();
                let id = list.len() as u64;
                list.push(ledger_answer(id, question_id, &content));
            }))
        }
        .boxed()
    }

    fn accept_answer(&self, question_id: U256, answer_id: U256) -> BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>> {
        async move {
            self.accept_calls.fetch_add(1, Ordering::SeqCst);
            let questions = self.questions.clone();
            let answers = self.answers.clone();
            self.pending(Box::new(move || {
                let question_id: u64 = question_id.to();
                if let Some(list) = answers.lock().unwrap().get_mut(&question_id) {
                    for answer in list.iter_mut().filter(|a| a.id == answer_id) {
                        answer.accepted = true;
                    }
                }
                if let Some(question) = questions.lock().unwrap().get_mut(question_id as usize) {
                    question.answered = true;
                }
            }))
        }
        .boxed()
    }
}

struct MockPending {
    tx_hash: TxHash,
    gate: Option<oneshot::Receiver<()>>,
    revert: bool,
    effect: Box<dyn FnOnce() + Send>,
}

impl PendingTx for MockPending {
    fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    fn confirm(self: Box<Self>) -> BoxFuture<'static, BlockchainResult<TxConfirmation>> {
        async move {
            let MockPending {
                tx_hash,
                gate,
                revert,
                effect,
            } = *self;

            if let Some(gate) = gate {
                let _ = gate.await;
            }
            if revert {
                return Err(BlockchainError::Reverted("bounty too low".to_string()));
            }
            effect();

            Ok(TxConfirmation {
                tx_hash,
                block_number: Some(42),
            })
        }
        .boxed()
    }
}

/// Connector whose outcome the test can change between handshakes.
#[derive(Clone, Default)]
pub struct MockConnector {
    next: Arc<Mutex<Option<(Address, ContractHandle)>>>,
    pub connects: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new(account: Address, board: ContractHandle) -> Self {
        let connector = Self::default();
        connector.set(Some((account, board)));
        connector
    }

    /// `None` makes the next handshake fail as if the user rejected it.
    pub fn set(&self, next: Option<(Address, ContractHandle)>) {
        *self.next.lock().unwrap() = next;
    }
}

impl WalletConnector for MockConnector {
    fn connect(&self) -> BoxFuture<'_, BlockchainResult<Connection>> {
        async move {
            self.connects.fetch_add(1, Ordering::SeqCst);
            let next = self.next.lock().unwrap().clone();
            match next {
                Some((account, contract)) => Ok(Connection { account, contract }),
                None => Err(BlockchainError::Wallet("user rejected the request".to_string())),
            }
        }
        .boxed()
    }
}

/// Notifier that remembers everything it was told.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count(&self, level: NoticeLevel) -> usize {
        self.notices().iter().filter(|n| n.level == level).count()
    }

    pub fn last(&self) -> Option<Notice> {
        self.notices().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// A controller bound directly to `board`, without a connection context.
pub fn bound_controller(
    board: Arc<MockBoard>,
) -> (Arc<BoardController>, watch::Sender<Binding>, Arc<RecordingNotifier>) {
    let (tx, rx) = watch::channel(Binding {
        account: Some(ALICE),
        contract: Some(board as ContractHandle),
        generation: 1,
    });
    let notifier = Arc::new(RecordingNotifier::default());
    let controller = Arc::new(BoardController::new(rx, notifier.clone()));
    (controller, tx, notifier)
}

/// Let spawned tasks run until they block.
pub async fn settle() {
    for _ in 0..64 {
        tokio::task::yield_now().await;
    }
}
