// 8.0.2: result types and errors for engine operations.
// every rejection carries the figures a caller needs to adjust and retry.

use crate::account::AccountError;
use crate::persistence::StoreError;
use crate::transaction::Transaction;
use crate::types::{AccountId, InstrumentId, Quantity, Quote, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub transaction: Transaction,
    pub cash_balance: Quote,
    pub instrument_available: Quantity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanReceipt {
    pub account_id: AccountId,
    pub amount: Quote,
    pub cash_balance: Quote,
    pub loan_balance: Quote,
    pub available_credit: Quote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickFailure {
    Instrument { instrument_id: InstrumentId, error: StoreError },
    Account { account_id: AccountId, error: TradeError },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub started_at: Timestamp,
    /// Another tick held the guard; nothing was touched.
    pub skipped: bool,
    pub instruments_updated: usize,
    pub accounts_revalued: usize,
    pub accounts_disabled: Vec<AccountId>,
    pub failures: Vec<TickFailure>,
}

impl TickReport {
    pub(super) fn new(started_at: Timestamp) -> Self {
        Self {
            started_at,
            skipped: false,
            instruments_updated: 0,
            accounts_revalued: 0,
            accounts_disabled: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub(super) fn skipped(started_at: Timestamp) -> Self {
        Self { skipped: true, ..Self::new(started_at) }
    }

    pub fn is_clean(&self) -> bool {
        !self.skipped && self.failures.is_empty()
    }
}

/// Fieldless tag for matching on the class of a rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotFound,
    Validation,
    IneligibleAccount,
    InsufficientFunds,
    InsufficientInventory,
    InsufficientHoldings,
    LoanLimitExceeded,
    TransientStoreFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TradeError {
    #[error("Account {0} not found")]
    AccountNotFound(AccountId),

    #[error("Instrument {0} not found")]
    InstrumentNotFound(InstrumentId),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Account {account_id} is not eligible to trade (cash {cash_balance}, loans {loan_balance})")]
    IneligibleAccount {
        account_id: AccountId,
        cash_balance: Quote,
        loan_balance: Quote,
    },

    #[error("Insufficient funds: required {required}, available {available}, shortfall {shortfall}")]
    InsufficientFunds {
        required: Quote,
        available: Quote,
        shortfall: Quote,
    },

    #[error("Not enough {instrument_id} available: requested {requested}, available {available}")]
    InsufficientInventory {
        instrument_id: InstrumentId,
        requested: Quantity,
        available: Quantity,
    },

    #[error("Not enough {instrument_id} to sell: requested {requested}, first lot holds {held}")]
    InsufficientHoldings {
        instrument_id: InstrumentId,
        requested: Quantity,
        held: Quantity,
    },

    #[error("Loan limit exceeded: current {current}, limit {limit}, available {available}, requested {requested}")]
    LoanLimitExceeded {
        current: Quote,
        limit: Quote,
        available: Quote,
        requested: Quote,
    },

    #[error("Store failure: {0}")]
    TransientStoreFailure(#[from] StoreError),
}

impl TradeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TradeError::AccountNotFound(_) | TradeError::InstrumentNotFound(_) => ErrorKind::NotFound,
            TradeError::Validation(_) => ErrorKind::Validation,
            TradeError::IneligibleAccount { .. } => ErrorKind::IneligibleAccount,
            TradeError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            TradeError::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
            TradeError::InsufficientHoldings { .. } => ErrorKind::InsufficientHoldings,
            TradeError::LoanLimitExceeded { .. } => ErrorKind::LoanLimitExceeded,
            TradeError::TransientStoreFailure(_) => ErrorKind::TransientStoreFailure,
        }
    }

    pub(super) fn validation(msg: impl Into<String>) -> Self {
        TradeError::Validation(msg.into())
    }
}

impl From<AccountError> for TradeError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::LoanLimitExceeded { current, limit, requested } => TradeError::LoanLimitExceeded {
                current,
                limit,
                available: limit.saturating_sub(current),
                requested,
            },
            AccountError::InsufficientHoldings { instrument_id, requested, held } => {
                TradeError::InsufficientHoldings { instrument_id, requested, held }
            }
            err @ AccountError::BalanceOverflow { .. } => TradeError::Validation(err.to_string()),
        }
    }
}
