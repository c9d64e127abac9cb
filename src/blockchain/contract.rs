//! The question board contract as seen by the client.
//!
//! [`BountyBoard`] is the handle the rest of the crate talks to. Methods return
//! boxed futures so handles can be shared as `Arc<dyn BountyBoard>` and
//! compared by identity.

use alloy::primitives::{Address, TxHash, U256};
use alloy::sol;
use futures_util::future::BoxFuture;

use crate::blockchain::types::{BlockchainResult, LedgerAnswer, LedgerQuestion, TxConfirmation};

sol! {
    #[sol(rpc)]
    interface IQuestionBoard {
        struct Answer {
            uint256 id;
            string content;
            address author;
            bool accepted;
            uint256 questionId;
        }

        function questionCount() external view returns (uint256);

        function questions(uint256 index)
            external
            view
            returns (uint256 id, string content, address author, uint256 bounty, bool answered);

        function getAnswers(uint256 questionId) external view returns (Answer[] memory);

        function postQuestion(string content) external payable;

        function postAnswer(uint256 questionId, string content) external;

        function acceptAnswer(uint256 questionId, uint256 answerId) external;
    }
}

impl From<IQuestionBoard::Answer> for LedgerAnswer {
    fn from(a: IQuestionBoard::Answer) -> Self {
        Self {
            id: a.id,
            content: a.content,
            author: a.author,
            accepted: a.accepted,
            question_id: a.questionId,
        }
    }
}

impl From<IQuestionBoard::questionsReturn> for LedgerQuestion {
    fn from(q: IQuestionBoard::questionsReturn) -> Self {
        Self {
            id: q.id,
            content: q.content,
            author: q.author,
            bounty: q.bounty,
            answered: q.answered,
        }
    }
}

/// Read and write access to a deployed question board.
pub trait BountyBoard: Send + Sync {
    /// Address of the contract this handle is bound to.
    fn address(&self) -> Address;

    fn question_count(&self) -> BoxFuture<'_, BlockchainResult<U256>>;

    /// Question at ledger position `index`.
    fn question(&self, index: U256) -> BoxFuture<'_, BlockchainResult<LedgerQuestion>>;

    fn answers(&self, question_id: U256) -> BoxFuture<'_, BlockchainResult<Vec<LedgerAnswer>>>;

    /// Submit a new question with `value` wei attached as its bounty.
    ///
    /// Resolves once the transaction is accepted by the node, not when it is final.
    fn post_question(
        &self,
        content: String,
        value: U256,
    ) -> BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>>;

    /// Submit an answer to question `question_id`.
    fn post_answer(
        &self,
        question_id: U256,
        content: String,
    ) -> BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>>;

    /// Accept answer `answer_id`, paying out the question's bounty.
    ///
    /// Only the question's author may accept; the contract reverts otherwise.
    fn accept_answer(
        &self,
        question_id: U256,
        answer_id: U256,
    ) -> BoxFuture<'_, BlockchainResult<Box<dyn PendingTx>>>;
}

/// A submitted write that has not been confirmed yet.
pub trait PendingTx: Send {
    fn tx_hash(&self) -> TxHash;

    /// Wait until the ledger confirms or rejects the transaction. Never times out.
    fn confirm(self: Box<Self>) -> BoxFuture<'static, BlockchainResult<TxConfirmation>>;
}
