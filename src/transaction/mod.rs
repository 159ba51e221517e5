//! Transactions: the data model, the database functions for storing them, and
//! the JSON API for reading and writing them.

mod api;
mod core;

pub use api::{
    create_transaction_endpoint, create_transactions_bulk_endpoint, get_transactions_endpoint,
};
pub use core::{
    Transaction, TransactionAction, create_transaction, create_transaction_table,
    create_transactions, get_transactions, parse_amount,
};

#[cfg(test)]
pub use core::count_transactions;
