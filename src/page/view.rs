//! HTML rendering for the budget page.
//!
//! Every function here is a pure projection of a [Ledger] and a [FormState].
//! Nothing is updated incrementally: each render produces the whole view.

use maud::{Markup, html};

use crate::{
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        HeadElement, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        amount_class, base,
    },
    page::{
        FormState, Ledger,
        chart::{chart_view, running_total_chart},
    },
};

/// The ID of the element that is swapped out when the form is submitted.
pub const DASHBOARD_ID: &str = "dashboard";

/// Render the full budget page.
pub fn page_view(ledger: &Ledger, form: &FormState) -> Markup {
    let head_elements = [
        HeadElement::ScriptLink("/static/htmx.min.js".to_owned()),
        HeadElement::ScriptLink("/static/echarts.min.js".to_owned()),
    ];

    let content = html! {
        main class=(PAGE_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { "Budget Tracker" }

            (dashboard_view(ledger, form))
        }
    };

    base("Budget", &head_elements, &content)
}

/// Render the total, form, table and chart.
///
/// This is also the partial returned when the form is submitted.
pub fn dashboard_view(ledger: &Ledger, form: &FormState) -> Markup {
    html! {
        div id=(DASHBOARD_ID) class="w-full max-w-3xl space-y-4"
        {
            (total_view(ledger))
            (form_view(form))
            (table_view(ledger))
            (chart_view(&running_total_chart(ledger)))
        }
    }
}

/// Render the running total as plain text.
pub fn total_view(ledger: &Ledger) -> Markup {
    html! {
        div class="text-2xl font-semibold"
        {
            "Your total is: $"
            span id="total" { (ledger.total()) }
        }
    }
}

fn form_view(form: &FormState) -> Markup {
    html! {
        form
            class="form space-y-4"
            method="post"
            action=(endpoints::TRANSACTION_FORM)
            hx-post=(endpoints::TRANSACTION_FORM)
            hx-target={ "#" (DASHBOARD_ID) }
            hx-swap="outerHTML"
        {
            div
            {
                label for="t-name" class=(FORM_LABEL_STYLE) { "Name" }
                input
                    type="text"
                    id="t-name"
                    name="name"
                    placeholder="Name of transaction"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(form.name);
            }

            div
            {
                label for="t-amount" class=(FORM_LABEL_STYLE) { "Amount" }
                input
                    type="number"
                    id="t-amount"
                    name="amount"
                    min="0"
                    placeholder="Transaction amount"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(form.amount);
            }

            div class="flex gap-4"
            {
                button
                    id="add-btn"
                    type="submit"
                    name="action"
                    value="add"
                    class=(BUTTON_PRIMARY_STYLE)
                {
                    "+ Add Funds"
                }

                button
                    id="sub-btn"
                    type="submit"
                    name="action"
                    value="subtract"
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "- Subtract Funds"
                }
            }

            p class="error text-red-500 text-base"
            {
                @if let Some(error) = &form.error { (error) }
            }
        }
    }
}

/// Render one row per transaction in ledger order.
pub fn table_view(ledger: &Ledger) -> Markup {
    html! {
        table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Transaction" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                }
            }

            tbody id="tbody"
            {
                @for transaction in ledger.transactions()
                {
                    tr class=(TABLE_ROW_STYLE)
                    {
                        td class=(TABLE_CELL_STYLE) { (transaction.name) }
                        td class={ (TABLE_CELL_STYLE) " " (amount_class(transaction.value)) }
                        {
                            (transaction.value)
                        }
                    }
                }
            }
        }
    }
}
