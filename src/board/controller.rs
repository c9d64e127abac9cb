//! Question/answer synchronization and question submission.
//!
//! # Responsibilities
//! - Mirror the ledger's question collection, reloading whenever the binding changes
//! - Fetch a question's answers on demand and toggle their visibility
//! - Drive writes (questions, answers, acceptance) through submit → confirm → reload
//!
//! # Invariants
//! - The question collection is replaced in one swap, never patched
//! - A failed load leaves the previous collection untouched
//! - Results computed under an older binding generation are dropped and never
//!   touch state belonging to the current generation
//! - At most one write is in `Submitting`; others are rejected, not queued

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use alloy::primitives::utils::parse_ether;
use alloy::primitives::U256;
use arc_swap::ArcSwap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{try_join_all, BoxFuture};
use tokio::sync::{broadcast, watch};

use crate::blockchain::contract::{BountyBoard, PendingTx};
use crate::blockchain::types::{BlockchainError, BlockchainResult, TxConfirmation};
use crate::board::connection::{Binding, ContractHandle};
use crate::board::error::{BoardError, BoardResult};
use crate::board::notify::{Notice, Notifier};
use crate::board::types::{
    Answer, AnswerView, Draft, LoadOutcome, LoadingSnapshot, Question, SubmissionState, ToggleOutcome,
};
use crate::observability::metrics;

/// Keeps the local mirror of the board in sync with the ledger.
pub struct BoardController {
    binding: watch::Receiver<Binding>,
    notifier: Arc<dyn Notifier>,
    questions: ArcSwap<Vec<Question>>,
    /// Question loads currently running; the loading flag is `> 0`.
    loads_in_flight: AtomicUsize,
    answers: DashMap<u64, AnswerView>,
    submitting: AtomicBool,
    draft: ArcSwap<Draft>,
}

impl BoardController {
    /// Create a controller observing `binding` (from `ConnectionContext::subscribe`).
    pub fn new(binding: watch::Receiver<Binding>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            binding,
            notifier,
            questions: ArcSwap::from_pointee(Vec::new()),
            loads_in_flight: AtomicUsize::new(0),
            answers: DashMap::new(),
            submitting: AtomicBool::new(false),
            draft: ArcSwap::from_pointee(Draft::default()),
        }
    }

    /// Follow binding changes until shutdown.
    ///
    /// Loads once immediately, then on every change drops the answer cache and
    /// starts a fresh load. Loads run as separate tasks so an old load never
    /// delays the reaction to a newer binding.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut changes = self.binding.clone();
        let generation = changes.borrow_and_update().generation;
        tracing::info!(generation, "Board sync started");
        self.spawn_load();

        loop {
            tokio::select! {
                changed = changes.changed() => {
                    if changed.is_err() {
                        tracing::info!("Connection context dropped, stopping board sync");
                        break;
                    }
                    let generation = changes.borrow_and_update().generation;
                    tracing::debug!(generation, "Binding changed, reloading questions");
                    self.answers.clear();
                    self.spawn_load();
                }
                _ = shutdown.recv() => {
                    tracing::info!("Board sync received shutdown signal");
                    break;
                }
            }
        }
    }

    fn spawn_load(self: &Arc<Self>) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            // Failures are already reported through the notifier.
            let _ = this.load_questions().await;
        });
    }

    /// Reload the whole question collection from the ledger.
    ///
    /// A no-op when no contract is bound. Reads for every index run
    /// concurrently; the result keeps ledger index order.
    pub async fn load_questions(&self) -> BoardResult<LoadOutcome> {
        let binding = self.binding.borrow().clone();
        let Some(contract) = binding.contract else {
            tracing::debug!("No contract bound, skipping question load");
            return Ok(LoadOutcome::Skipped);
        };
        let generation = binding.generation;

        let _loading = InFlight::enter(&self.loads_in_flight);
        let result = fetch_questions(contract.as_ref()).await;

        match result {
            Ok(questions) => {
                let count = questions.len();
                let committed = self.commit_if_current(generation, || {
                    self.questions.store(Arc::new(questions));
                });
                if !committed {
                    return Ok(discard_stale_load(generation));
                }

                metrics::record_question_load("ok");
                metrics::record_question_count(count);
                tracing::info!(count, generation, "Questions loaded");
                Ok(LoadOutcome::Loaded(count))
            }
            Err(e) => {
                if !self.is_current(generation) {
                    return Ok(discard_stale_load(generation));
                }

                metrics::record_question_load("error");
                tracing::error!(error = %e, "Failed to load questions");
                self.notifier.notify(Notice::error("Failed to load questions"));
                Err(BoardError::Read(e))
            }
        }
    }

    /// Show or hide the answers of one question.
    ///
    /// Hiding evicts the cached answers, so showing again always refetches.
    /// Concurrent expands of the same id each fetch; the last one to settle wins.
    pub async fn toggle_answers(&self, question_id: u64) -> BoardResult<ToggleOutcome> {
        if self
            .answers
            .remove_if(&question_id, |_, view| matches!(view, AnswerView::Shown(_)))
            .is_some()
        {
            tracing::debug!(question_id, "Answers hidden");
            return Ok(ToggleOutcome::Collapsed);
        }

        self.show_answers(question_id).await
    }

    /// Fetch the answers of `question_id` and show them, replacing any shown ones.
    pub async fn show_answers(&self, question_id: u64) -> BoardResult<ToggleOutcome> {
        let binding = self.binding.borrow().clone();
        let Some(contract) = binding.contract else {
            tracing::debug!(question_id, "No contract bound, skipping answer fetch");
            return Ok(ToggleOutcome::Skipped);
        };
        let generation = binding.generation;

        self.mark_answers_loading(question_id, generation);
        let result = fetch_answers(contract.as_ref(), question_id).await;

        match result {
            Ok(answers) => {
                let count = answers.len();
                let committed = self.commit_if_current(generation, || {
                    self.answers.insert(question_id, AnswerView::Shown(answers));
                });
                if !committed {
                    return Ok(self.discard_stale_answers(question_id, generation));
                }

                metrics::record_answer_fetch("ok");
                tracing::debug!(question_id, count, "Answers shown");
                Ok(ToggleOutcome::Shown(count))
            }
            Err(e) => {
                if !self.is_current(generation) {
                    return Ok(self.discard_stale_answers(question_id, generation));
                }

                self.settle_fetch(question_id, generation);
                metrics::record_answer_fetch("error");
                tracing::error!(question_id, error = %e, "Failed to load answers");
                self.notifier.notify(Notice::error("Failed to load answers"));
                Err(BoardError::Read(e))
            }
        }
    }

    fn mark_answers_loading(&self, question_id: u64, generation: u64) {
        match self.answers.entry(question_id) {
            Entry::Occupied(mut entry) => match entry.get_mut() {
                AnswerView::Loading { pending, generation: issued } if *issued == generation => *pending += 1,
                other => *other = AnswerView::Loading { pending: 1, generation },
            },
            Entry::Vacant(entry) => {
                entry.insert(AnswerView::Loading { pending: 1, generation });
            }
        }
    }

    /// A fetch issued under `generation` settled without producing answers.
    ///
    /// Only a loading marker of the same generation is touched. Shown answers
    /// stay, and a newer marker belongs to a fetch that is still running.
    fn settle_fetch(&self, question_id: u64, generation: u64) {
        if let Entry::Occupied(mut entry) = self.answers.entry(question_id) {
            let last = match entry.get_mut() {
                AnswerView::Loading { pending, generation: issued } if *issued == generation => {
                    if *pending > 1 {
                        *pending -= 1;
                        false
                    } else {
                        true
                    }
                }
                _ => false,
            };
            if last {
                entry.remove();
            }
        }
    }

    fn discard_stale_answers(&self, question_id: u64, generation: u64) -> ToggleOutcome {
        self.settle_fetch(question_id, generation);
        tracing::debug!(question_id, generation, "Discarding answers for stale binding");
        metrics::record_answer_fetch("stale");
        ToggleOutcome::Stale
    }

    /// Post a question with `bounty` ether attached and wait for confirmation.
    ///
    /// Input and connection problems are rejected before any network access.
    /// On confirmation the draft is cleared and the collection is reloaded;
    /// on failure the draft is kept so the user can retry.
    pub async fn post_question(&self, content: &str, bounty: &str) -> BoardResult<TxConfirmation> {
        if content.trim().is_empty() || bounty.trim().is_empty() {
            self.notifier.notify(Notice::warning("Please fill all fields"));
            return Err(BoardError::Validation("question content and bounty are required".to_string()));
        }

        let contract = self.contract_for_write()?;

        let value = match parse_bounty(bounty) {
            Ok(value) => value,
            Err(e) => {
                self.notifier.notify(Notice::warning("Invalid bounty amount"));
                return Err(e);
            }
        };

        let submission = self.begin_submission()?;

        tracing::info!(bounty_wei = %value, "Submitting question");
        let result = confirm_write(contract.post_question(content.to_string(), value)).await;

        match result {
            Ok(confirmation) => {
                self.draft.store(Arc::new(Draft::default()));
                self.notifier.notify(Notice::success("Question posted!"));
                drop(submission);
                metrics::record_transaction("question", "confirmed");

                if let Err(e) = self.load_questions().await {
                    tracing::warn!(error = %e, "Reload after confirmed question failed");
                }
                Ok(confirmation)
            }
            Err(e) => {
                drop(submission);
                Err(self.write_failed("question", e))
            }
        }
    }

    /// Post the current draft.
    pub async fn submit_draft(&self) -> BoardResult<TxConfirmation> {
        let draft = self.draft.load_full();
        self.post_question(&draft.content, &draft.bounty).await
    }

    /// Answer question `question_id` and wait for confirmation.
    ///
    /// Shares the single submission slot with every other write. On
    /// confirmation the question's answers are refetched and shown.
    pub async fn post_answer(&self, question_id: u64, content: &str) -> BoardResult<TxConfirmation> {
        if content.trim().is_empty() {
            self.notifier.notify(Notice::warning("Please fill all fields"));
            return Err(BoardError::Validation("answer content is required".to_string()));
        }

        let contract = self.contract_for_write()?;
        let submission = self.begin_submission()?;

        tracing::info!(question_id, "Submitting answer");
        let result = confirm_write(contract.post_answer(U256::from(question_id), content.to_string())).await;

        match result {
            Ok(confirmation) => {
                self.notifier.notify(Notice::success("Answer posted!"));
                drop(submission);
                metrics::record_transaction("answer", "confirmed");

                if let Err(e) = self.show_answers(question_id).await {
                    tracing::warn!(question_id, error = %e, "Reload after confirmed answer failed");
                }
                Ok(confirmation)
            }
            Err(e) => {
                drop(submission);
                Err(self.write_failed("answer", e))
            }
        }
    }

    /// Accept answer `answer_id` of question `question_id`, releasing its bounty.
    ///
    /// When the question is in the local collection, accepting someone
    /// else's question or an already answered one is rejected locally. On
    /// confirmation both the answers and the question collection are reloaded.
    pub async fn accept_answer(&self, question_id: u64, answer_id: u64) -> BoardResult<TxConfirmation> {
        let contract = self.contract_for_write()?;

        let account = self.binding.borrow().account;
        if let Some(question) = self.questions().iter().find(|q| q.id == question_id) {
            if question.answered {
                self.notifier.notify(Notice::warning("Question already has an accepted answer"));
                return Err(BoardError::Validation(format!("question {} is already answered", question_id)));
            }
            if account != Some(question.author) {
                self.notifier.notify(Notice::warning("Only the question author can accept answers"));
                return Err(BoardError::Validation(format!("question {} belongs to {}", question_id, question.author)));
            }
        }

        let submission = self.begin_submission()?;

        tracing::info!(question_id, answer_id, "Accepting answer");
        let result = confirm_write(contract.accept_answer(U256::from(question_id), U256::from(answer_id))).await;

        match result {
            Ok(confirmation) => {
                self.notifier.notify(Notice::success("Answer accepted!"));
                drop(submission);
                metrics::record_transaction("accept", "confirmed");

                if let Err(e) = self.show_answers(question_id).await {
                    tracing::warn!(question_id, error = %e, "Answer reload after acceptance failed");
                }
                if let Err(e) = self.load_questions().await {
                    tracing::warn!(error = %e, "Question reload after acceptance failed");
                }
                Ok(confirmation)
            }
            Err(e) => {
                drop(submission);
                Err(self.write_failed("accept", e))
            }
        }
    }

    fn contract_for_write(&self) -> BoardResult<ContractHandle> {
        let contract = self.binding.borrow().contract.clone();
        contract.ok_or_else(|| {
            self.notifier.notify(Notice::error("Please connect wallet first"));
            BoardError::NotConnected
        })
    }

    fn begin_submission(&self) -> BoardResult<Submission<'_>> {
        Submission::begin(&self.submitting).ok_or_else(|| {
            tracing::warn!("Rejecting write while another transaction is in flight");
            self.notifier.notify(Notice::warning("A transaction is already in progress"));
            BoardError::TransactionInFlight
        })
    }

    fn write_failed(&self, kind: &'static str, error: BlockchainError) -> BoardError {
        metrics::record_transaction(kind, "failed");
        tracing::error!(kind, error = %error, "Transaction failed");
        self.notifier.notify(Notice::error("Transaction failed"));
        BoardError::Write(error)
    }

    pub fn set_draft(&self, content: impl Into<String>, bounty: impl Into<String>) {
        self.draft.store(Arc::new(Draft {
            content: content.into(),
            bounty: bounty.into(),
        }));
    }

    pub fn draft(&self) -> Draft {
        self.draft.load().as_ref().clone()
    }

    /// The last successfully loaded question collection.
    pub fn questions(&self) -> Arc<Vec<Question>> {
        self.questions.load_full()
    }

    pub fn answer_view(&self, question_id: u64) -> AnswerView {
        self.answers
            .get(&question_id)
            .map(|view| view.value().clone())
            .unwrap_or_default()
    }

    /// Answers currently shown for `question_id`, if any.
    pub fn shown_answers(&self, question_id: u64) -> Option<Vec<Answer>> {
        match self.answer_view(question_id) {
            AnswerView::Shown(answers) => Some(answers),
            _ => None,
        }
    }

    pub fn is_loading_questions(&self) -> bool {
        self.loads_in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn is_loading_answers(&self, question_id: u64) -> bool {
        self.answers
            .get(&question_id)
            .map(|view| view.is_loading())
            .unwrap_or(false)
    }

    pub fn submission_state(&self) -> SubmissionState {
        if self.submitting.load(Ordering::SeqCst) {
            SubmissionState::Submitting
        } else {
            SubmissionState::Idle
        }
    }

    pub fn loading(&self) -> LoadingSnapshot {
        let answers = self
            .answers
            .iter()
            .filter(|entry| entry.value().is_loading())
            .map(|entry| (*entry.key(), true))
            .collect();

        LoadingSnapshot {
            questions: self.is_loading_questions(),
            answers,
            transaction: self.submission_state() == SubmissionState::Submitting,
        }
    }

    fn is_current(&self, generation: u64) -> bool {
        self.binding.borrow().generation == generation
    }

    /// Run `commit` only if the binding is still at `generation`.
    ///
    /// The binding stays borrowed while `commit` runs, so it cannot be
    /// republished between the check and the write.
    fn commit_if_current(&self, generation: u64, commit: impl FnOnce()) -> bool {
        let binding = self.binding.borrow();
        if binding.generation != generation {
            return false;
        }
        commit();
        true
    }
}

fn discard_stale_load(generation: u64) -> LoadOutcome {
    tracing::debug!(generation, "Discarding question load for stale binding");
    metrics::record_question_load("stale");
    LoadOutcome::Stale
}

async fn fetch_questions(contract: &dyn BountyBoard) -> BlockchainResult<Vec<Question>> {
    let count = contract.question_count().await?;
    let count = u64::try_from(count)
        .map_err(|_| BlockchainError::Decode(format!("question count {} does not fit in u64", count)))?;

    let reads = (0..count).map(|index| async move {
        let raw = contract.question(U256::from(index)).await?;
        Question::try_from(raw)
    });

    // try_join_all yields results in input order, whatever order they complete in
    try_join_all(reads).await
}

async fn fetch_answers(contract: &dyn BountyBoard, question_id: u64) -> BlockchainResult<Vec<Answer>> {
    contract
        .answers(U256::from(question_id))
        .await?
        .into_iter()
        .map(Answer::try_from)
        .collect()
}

/// Wait for a submitted write to be confirmed.
async fn confirm_write(
    submitted: BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>>,
) -> BlockchainResult<TxConfirmation> {
    let pending = submitted.await?;
    tracing::info!(tx_hash = %pending.tx_hash(), "Transaction pending confirmation");
    pending.confirm().await
}

/// Parse a decimal ether amount into wei.
pub fn parse_bounty(bounty: &str) -> BoardResult<U256> {
    let bounty = bounty.trim();
    if bounty.starts_with('-') {
        return Err(BoardError::Validation(format!("bounty '{}' is negative", bounty)));
    }
    parse_ether(bounty).map_err(|e| BoardError::Validation(format!("invalid bounty '{}': {}", bounty, e)))
}

/// Counts a running question load for as long as it is alive.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Holds the `Submitting` state; dropping it returns to `Idle`.
struct Submission<'a>(&'a AtomicBool);

impl<'a> Submission<'a> {
    /// Enter `Submitting`, only possible from `Idle`.
    fn begin(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for Submission<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
