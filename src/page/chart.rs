//! The "Total Over Time" line chart.
//!
//! The chart is rebuilt from the ledger on every render. The browser side
//! script disposes any chart already attached to the canvas before creating
//! the new one, so a stale chart is never patched in place.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{AreaStyle, AxisType, Tooltip, Trigger},
    series::Line,
};
use maud::{Markup, PreEscaped, html};

use crate::page::Ledger;

/// The HTML element ID the chart is drawn into.
pub const CHART_ID: &str = "myChart";

const SERIES_NAME: &str = "Total Over Time";
const FILL_COLOUR: &str = "#6666ff";

/// Build the running total chart for `ledger`, oldest transaction first.
pub fn running_total_chart(ledger: &Ledger) -> Chart {
    let (labels, values): (Vec<String>, Vec<f64>) = ledger
        .running_totals()
        .into_iter()
        .map(|point| (point.label, point.total as f64))
        .unzip();

    Chart::new()
        .title(Title::new().text(SERIES_NAME))
        .tooltip(Tooltip::new().trigger(Trigger::Axis))
        .legend(Legend::new().right("4%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(Axis::new().type_(AxisType::Value))
        .series(
            Line::new()
                .name(SERIES_NAME)
                .area_style(AreaStyle::new().color(FILL_COLOUR))
                .data(values),
        )
}

/// Render the chart container and the script that draws `chart` into it.
pub fn chart_view(chart: &Chart) -> Markup {
    let script = format!(
        r#"(function() {{
            const chartDom = document.getElementById("{CHART_ID}");
            if (typeof echarts === "undefined" || !chartDom) {{
                return;
            }}
            const previous = echarts.getInstanceByDom(chartDom);
            if (previous) {{
                previous.dispose();
            }}
            const chart = echarts.init(chartDom);
            chart.setOption({options});
            window.addEventListener('resize', chart.resize);
        }})();"#,
        options = chart
    );

    html!(
        section class="w-full mx-auto mb-4"
        {
            div id=(CHART_ID) class="min-h-[380px] rounded dark:bg-gray-100" {}
            script { (PreEscaped(script)) }
        }
    )
}
