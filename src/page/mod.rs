//! The budget page: a running total, a table of transactions and a chart of
//! the total over time, with a form for adding or subtracting funds.
//!
//! The page is rendered from explicit state ([Ledger] and [FormState]) so the
//! server and the offline client render exactly the same views.

mod chart;
mod form;
mod handlers;
mod ledger;
mod view;

pub use chart::{CHART_ID, running_total_chart};
pub use form::FormState;
pub(crate) use handlers::{get_index_page, submit_transaction_form};
pub use ledger::{Ledger, RunningTotal, date_label};
pub use view::{dashboard_view, page_view, table_view, total_view};
