//! The list of transactions shown on the page and the figures derived from it.

use time::OffsetDateTime;

use crate::Transaction;

/// The transactions currently shown on the page, most recent first.
///
/// The ledger only ever grows within a session: transactions are prepended
/// as they are made and are never edited or removed. Everything the page
/// displays is computed from the ledger on demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

/// One point on the running total chart.
#[derive(Debug, Clone, PartialEq)]
pub struct RunningTotal {
    /// The transaction's calendar date, e.g. "10/5/2025".
    pub label: String,
    /// The sum of this and every earlier transaction.
    pub total: i128,
}

impl Ledger {
    /// Create a ledger from transactions that are already most recent first.
    pub fn new(transactions: Vec<Transaction>) -> Self {
        Self { transactions }
    }

    /// The transactions in display order, most recent first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Add `transaction` to the top of the ledger.
    pub fn prepend(&mut self, transaction: Transaction) {
        self.transactions.insert(0, transaction);
    }

    /// The number of transactions in the ledger.
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    /// Whether the ledger has no transactions.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// The sum of every transaction's value.
    ///
    /// Summed as `i128` so that no number of `i64` values can overflow.
    pub fn total(&self) -> i128 {
        self.transactions
            .iter()
            .map(|transaction| i128::from(transaction.value))
            .sum()
    }

    /// The cumulative total after each transaction, oldest first.
    pub fn running_totals(&self) -> Vec<RunningTotal> {
        let mut sum: i128 = 0;

        self.transactions
            .iter()
            .rev()
            .map(|transaction| {
                sum += i128::from(transaction.value);
                RunningTotal {
                    label: date_label(transaction.date),
                    total: sum,
                }
            })
            .collect()
    }
}

/// Format a date as month/day/year without zero padding, e.g. "3/7/2025".
pub fn date_label(date: OffsetDateTime) -> String {
    format!("{}/{}/{}", u8::from(date.month()), date.day(), date.year())
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use crate::Transaction;

    use super::{Ledger, RunningTotal, date_label};

    fn test_ledger() -> Ledger {
        Ledger::new(vec![
            Transaction::new("Groceries", -50, datetime!(2025-03-09 18:00 UTC)),
            Transaction::new("Salary", 1000, datetime!(2025-03-08 09:00 UTC)),
            Transaction::new("Opening balance", 200, datetime!(2025-03-07 09:00 UTC)),
        ])
    }

    #[test]
    fn total_includes_withdrawals() {
        assert_eq!(test_ledger().total(), 1150);
    }

    #[test]
    fn total_of_empty_ledger_is_zero() {
        assert_eq!(Ledger::default().total(), 0);
    }

    #[test]
    fn prepend_puts_transaction_first() {
        let mut ledger = test_ledger();
        let transaction = Transaction::new("Coffee", -5, datetime!(2025-03-10 08:00 UTC));

        ledger.prepend(transaction.clone());

        assert_eq!(ledger.transactions().first(), Some(&transaction));
        assert_eq!(ledger.len(), 4);
        assert_eq!(ledger.total(), 1145);
    }

    #[test]
    fn running_totals_are_oldest_first() {
        let got = test_ledger().running_totals();

        assert_eq!(
            got,
            vec![
                RunningTotal {
                    label: "3/7/2025".to_owned(),
                    total: 200
                },
                RunningTotal {
                    label: "3/8/2025".to_owned(),
                    total: 1200
                },
                RunningTotal {
                    label: "3/9/2025".to_owned(),
                    total: 1150
                },
            ]
        );
    }

    #[test]
    fn last_running_total_equals_total() {
        let ledger = test_ledger();

        let last = ledger.running_totals().pop().unwrap();

        assert_eq!(last.total, ledger.total());
    }

    #[test]
    fn total_of_largest_amounts_does_not_overflow() {
        let ledger = Ledger::new(vec![
            Transaction::new("big", i64::MAX, datetime!(2025-03-09 18:00 UTC)),
            Transaction::new("big", i64::MAX, datetime!(2025-03-08 09:00 UTC)),
        ]);

        let expected = 2 * i128::from(i64::MAX);
        assert_eq!(ledger.total(), expected);
        assert_eq!(
            ledger.running_totals().pop().map(|point| point.total),
            Some(expected)
        );
    }

    #[test]
    fn date_label_is_not_zero_padded() {
        assert_eq!(date_label(datetime!(2025-01-02 00:00 UTC)), "1/2/2025");
        assert_eq!(date_label(datetime!(2024-12-31 23:59 UTC)), "12/31/2024");
    }
}
