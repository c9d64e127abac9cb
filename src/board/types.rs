//! Client-side view of questions and answers.

use std::collections::BTreeMap;

use alloy::primitives::utils::format_ether;
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::blockchain::types::{BlockchainError, BlockchainResult, LedgerAnswer, LedgerQuestion};

/// A question as displayed by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: u64,
    pub content: String,
    pub author: Address,
    /// Bounty in ether, as a decimal string.
    pub bounty: String,
    /// Bounty in wei, as stored on the ledger.
    pub bounty_wei: U256,
    pub answered: bool,
}

impl TryFrom<LedgerQuestion> for Question {
    type Error = BlockchainError;

    fn try_from(q: LedgerQuestion) -> BlockchainResult<Self> {
        Ok(Self {
            id: to_u64(q.id, "question id")?,
            content: q.content,
            author: q.author,
            bounty: format_ether(q.bounty),
            bounty_wei: q.bounty,
            answered: q.answered,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: u64,
    pub content: String,
    pub author: Address,
    pub accepted: bool,
    pub question_id: u64,
}

impl TryFrom<LedgerAnswer> for Answer {
    type Error = BlockchainError;

    fn try_from(a: LedgerAnswer) -> BlockchainResult<Self> {
        Ok(Self {
            id: to_u64(a.id, "answer id")?,
            content: a.content,
            author: a.author,
            accepted: a.accepted,
            question_id: to_u64(a.question_id, "answer question id")?,
        })
    }
}

fn to_u64(value: U256, what: &str) -> BlockchainResult<u64> {
    u64::try_from(value).map_err(|_| BlockchainError::Decode(format!("{} {} does not fit in u64", what, value)))
}

/// Visibility of one question's answers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AnswerView {
    #[default]
    Hidden,
    /// `pending` fetches issued under binding `generation` have not settled yet.
    Loading { pending: u32, generation: u64 },
    Shown(Vec<Answer>),
}

impl AnswerView {
    pub fn is_loading(&self) -> bool {
        matches!(self, AnswerView::Loading { .. })
    }
}

/// The three independent loading scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadingSnapshot {
    pub questions: bool,
    /// Only ids with a fetch in flight appear here.
    pub answers: BTreeMap<u64, bool>,
    pub transaction: bool,
}

/// Write submission state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
}

/// Unsent question inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub content: String,
    pub bounty: String,
}

/// Result of a question collection load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The collection was replaced with this many questions.
    Loaded(usize),
    /// No contract was bound.
    Skipped,
    /// The binding changed while loading; the result was dropped.
    Stale,
}

/// Result of an answer toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Shown(usize),
    Collapsed,
    Skipped,
    Stale,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_converts_bounty_to_ether() {
        let question = Question::try_from(LedgerQuestion {
            id: U256::from(3),
            content: "What is X?".to_string(),
            author: Address::ZERO,
            bounty: U256::from(500_000_000_000_000_000u64),
            answered: false,
        })
        .unwrap();

        assert_eq!(question.id, 3);
        assert!(question.bounty.starts_with("0.5"));
        assert_eq!(question.bounty_wei, U256::from(500_000_000_000_000_000u64));
    }

    #[test]
    fn test_oversized_id_is_decode_error() {
        let err = Answer::try_from(LedgerAnswer {
            id: U256::MAX,
            content: String::new(),
            author: Address::ZERO,
            accepted: false,
            question_id: U256::from(1),
        })
        .unwrap_err();

        assert!(matches!(err, BlockchainError::Decode(_)));
    }

    #[test]
    fn test_answer_view_default_is_hidden() {
        assert_eq!(AnswerView::default(), AnswerView::Hidden);
        assert!(AnswerView::Loading { pending: 1, generation: 1 }.is_loading());
        assert!(!AnswerView::Shown(Vec::new()).is_loading());
    }
}
