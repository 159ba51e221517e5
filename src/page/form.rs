//! The state of the add/subtract form.

use time::OffsetDateTime;

use crate::{Error, Transaction, TransactionAction, parse_amount};

/// What the user has typed into the form, and the error shown below it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormState {
    /// The transaction name input.
    pub name: String,
    /// The amount input, exactly as typed.
    pub amount: String,
    /// The inline error message, if any.
    pub error: Option<String>,
}

impl FormState {
    /// Create a form with the given inputs and no error.
    pub fn new(name: &str, amount: &str) -> Self {
        Self {
            name: name.to_owned(),
            amount: amount.to_owned(),
            error: None,
        }
    }

    /// Build a transaction from the form inputs.
    ///
    /// # Errors
    /// Returns [Error::MissingInformation] if either input is empty, or
    /// [Error::InvalidAmount] if the amount does not start with a number.
    pub fn to_transaction(
        &self,
        action: TransactionAction,
        date: OffsetDateTime,
    ) -> Result<Transaction, Error> {
        if self.name.is_empty() || self.amount.is_empty() {
            return Err(Error::MissingInformation);
        }

        let amount =
            parse_amount(&self.amount).ok_or_else(|| Error::InvalidAmount(self.amount.clone()))?;

        Ok(Transaction::new(&self.name, action.apply(amount), date))
    }

    /// Show `error` below the form.
    pub fn set_error(&mut self, error: &Error) {
        self.error = Some(error.to_string());
    }

    /// Empty both inputs and hide the error.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
