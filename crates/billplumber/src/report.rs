//! HTML spending report.
//!
//! [`ReportSummary`] aggregates a record set into the figures shown on the
//! report; [`render_html`] turns them into a standalone page of ECharts
//! charts whose options are serialized with `serde_json`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use billplumber_core::{AMOUNT_FIELD, RecordSet, TIMESTAMP_FIELD};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::{Value as Json, json};

use crate::export::ExportError;

/// Default page title.
pub const REPORT_TITLE: &str = "微信支付账单分析报告";

/// Columns that may hold the income/expense direction, in lookup order.
pub const TYPE_FIELDS: [&str; 2] = ["收/支/其他", "收/支"];
pub const COUNTERPARTY_FIELD: &str = "交易对方";
pub const EXPENSE: &str = "支出";
pub const INCOME: &str = "收入";
/// Label of the bucket collecting counterparties outside the top ten.
pub const OTHERS_LABEL: &str = "其他商户汇总";

const ECHARTS_CDN: &str = "https://cdn.jsdelivr.net/npm/echarts@5/dist/echarts.min.js";
const TOOLTIP_AXIS: &str = "axis";

const PAGE_CSS: &str = r#"<style>
    body {
        background: #ffffff;
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, 'Helvetica Neue', Arial, sans-serif;
        margin: 0;
        padding: 10px;
    }
    .chart-container {
        margin: 10px auto;
        max-width: 1400px;
    }
    .chart-row {
        display: flex;
        flex-wrap: wrap;
        justify-content: center;
    }
    h1 {
        text-align: center;
        color: #2c3e50;
        font-size: 28px;
        margin: 15px 0;
        font-weight: 600;
    }
</style>"#;

const SUMMARY_COLORS: [&str; 8] = [
    "#d14b41", "#5793f3", "#675bba", "#fac858", "#91cc75", "#73c0de", "#ee6666", "#3ba272",
];

/// Expense and income of one calendar month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyFlow {
    pub month: String,
    pub expense: f64,
    pub income: f64,
}

/// Everything the report displays, computed from one record set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_transactions: usize,
    pub total_expense: f64,
    pub total_income: f64,
    pub net_flow: f64,
    pub expense_count: usize,
    pub income_count: usize,
    pub avg_expense: f64,
    pub avg_income: f64,
    /// Distinct calendar days with any transaction.
    pub trading_days: usize,
    pub daily_avg_expense: f64,
    pub max_single_expense: f64,
    /// Distinct calendar days with an expense.
    pub expense_days: usize,
    pub counterparty_count: usize,
    /// Months in ascending order.
    pub monthly: Vec<MonthlyFlow>,
    /// Amount per direction value, by name. Empty without a direction column.
    pub type_distribution: Vec<(String, f64)>,
    /// Ten largest counterparties by expense, descending, plus an
    /// [`OTHERS_LABEL`] bucket when more exist.
    pub top_counterparties: Vec<(String, f64)>,
    /// Twenty largest counterparties by expense, ascending.
    pub counterparty_ranking: Vec<(String, f64)>,
    /// Number of expenses per hour of day.
    pub hourly_expense_counts: [usize; 24],
    /// Expense amount per hour of day.
    pub hourly_expense_amounts: [f64; 24],
    /// Fifteen counterparties with the longest run of consecutive expense
    /// days, ascending.
    pub consecutive_days: Vec<(String, usize)>,
}

/// One row reduced to the columns the report reads.
struct Entry<'a> {
    amount: f64,
    timestamp: Option<NaiveDateTime>,
    direction: Option<&'a str>,
    counterparty: Option<&'a str>,
}

impl Entry<'_> {
    fn date(&self) -> Option<NaiveDate> {
        self.timestamp.map(|ts| ts.date())
    }
}

impl ReportSummary {
    /// Summarize `record_set`.
    ///
    /// Returns `None` when the amount or timestamp column is missing or there
    /// are no rows. Without a direction column every row counts as an expense.
    pub fn from_record_set(record_set: &RecordSet) -> Option<Self> {
        let amount_col = record_set.column_index(AMOUNT_FIELD)?;
        let ts_col = record_set.column_index(TIMESTAMP_FIELD)?;
        if record_set.is_empty() {
            return None;
        }
        let type_col = TYPE_FIELDS
            .iter()
            .find_map(|name| record_set.column_index(name));
        let counterparty_col = record_set.column_index(COUNTERPARTY_FIELD);

        let entries: Vec<Entry<'_>> = record_set
            .rows()
            .iter()
            .map(|row| Entry {
                amount: row[amount_col].as_amount().unwrap_or(0.0),
                timestamp: row[ts_col].as_timestamp(),
                direction: type_col.and_then(|c| row[c].as_text()),
                counterparty: counterparty_col.and_then(|c| row[c].as_text()),
            })
            .collect();

        let (expenses, incomes): (Vec<&Entry<'_>>, Vec<&Entry<'_>>) = match type_col {
            Some(_) => (
                entries.iter().filter(|e| e.direction == Some(EXPENSE)).collect(),
                entries.iter().filter(|e| e.direction == Some(INCOME)).collect(),
            ),
            None => (entries.iter().collect(), Vec::new()),
        };

        let total_expense: f64 = expenses.iter().map(|e| e.amount).sum();
        let total_income: f64 = incomes.iter().map(|e| e.amount).sum();
        let trading_days = entries
            .iter()
            .filter_map(Entry::date)
            .collect::<BTreeSet<_>>()
            .len();
        let expense_days = expenses
            .iter()
            .filter_map(|e| e.date())
            .collect::<BTreeSet<_>>()
            .len();
        let counterparty_count = entries
            .iter()
            .filter_map(|e| e.counterparty)
            .collect::<BTreeSet<_>>()
            .len();

        let mut monthly: BTreeMap<String, (f64, f64)> = BTreeMap::new();
        for e in &expenses {
            if let Some(ts) = e.timestamp {
                monthly.entry(month_key(ts)).or_default().0 += e.amount;
            }
        }
        for e in &incomes {
            if let Some(ts) = e.timestamp {
                monthly.entry(month_key(ts)).or_default().1 += e.amount;
            }
        }

        let mut type_distribution: BTreeMap<&str, f64> = BTreeMap::new();
        for e in &entries {
            if let Some(direction) = e.direction {
                *type_distribution.entry(direction).or_default() += e.amount;
            }
        }

        let mut hourly_expense_counts = [0usize; 24];
        let mut hourly_expense_amounts = [0.0f64; 24];
        for e in &expenses {
            if let Some(ts) = e.timestamp {
                let hour = ts.hour() as usize;
                hourly_expense_counts[hour] += 1;
                hourly_expense_amounts[hour] += e.amount;
            }
        }

        let by_counterparty = expense_by_counterparty(&expenses);

        Some(Self {
            total_transactions: entries.len(),
            total_expense,
            total_income,
            net_flow: total_income - total_expense,
            expense_count: expenses.len(),
            income_count: incomes.len(),
            avg_expense: ratio(total_expense, expenses.len()),
            avg_income: ratio(total_income, incomes.len()),
            trading_days,
            daily_avg_expense: ratio(total_expense, trading_days),
            max_single_expense: expenses
                .iter()
                .map(|e| e.amount)
                .reduce(f64::max)
                .unwrap_or(0.0),
            expense_days,
            counterparty_count,
            monthly: monthly
                .into_iter()
                .map(|(month, (expense, income))| MonthlyFlow {
                    month,
                    expense,
                    income,
                })
                .collect(),
            type_distribution: type_distribution
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            top_counterparties: top_with_others(&by_counterparty, 10),
            counterparty_ranking: by_counterparty.iter().take(20).rev().cloned().collect(),
            hourly_expense_counts,
            hourly_expense_amounts,
            consecutive_days: longest_streaks(&expenses, 15),
        })
    }
}

fn month_key(ts: NaiveDateTime) -> String {
    format!("{:04}-{:02}", ts.year(), ts.month())
}

fn ratio(total: f64, count: usize) -> f64 {
    if count == 0 { 0.0 } else { total / count as f64 }
}

/// Expense per counterparty, largest first; ties by name.
fn expense_by_counterparty(expenses: &[&Entry<'_>]) -> Vec<(String, f64)> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for e in expenses {
        if let Some(name) = e.counterparty {
            *totals.entry(name).or_default() += e.amount;
        }
    }
    let mut sorted: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(name, total)| (name.to_string(), total))
        .collect();
    sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

fn top_with_others(sorted: &[(String, f64)], n: usize) -> Vec<(String, f64)> {
    let mut top: Vec<(String, f64)> = sorted.iter().take(n).cloned().collect();
    let others: f64 = sorted.iter().skip(n).map(|(_, v)| v).sum();
    if others > 0.0 {
        top.push((OTHERS_LABEL.to_string(), others));
    }
    top
}

/// Longest run of consecutive calendar days in an ascending, deduplicated list.
fn longest_run(dates: &BTreeSet<NaiveDate>) -> usize {
    let mut best = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for &date in dates {
        current = match previous {
            Some(p) if p.succ_opt() == Some(date) => current + 1,
            _ => 1,
        };
        best = best.max(current);
        previous = Some(date);
    }
    best
}

/// The `n` counterparties with the longest expense streaks, ascending.
fn longest_streaks(expenses: &[&Entry<'_>], n: usize) -> Vec<(String, usize)> {
    let mut dates: HashMap<&str, BTreeSet<NaiveDate>> = HashMap::new();
    for e in expenses {
        if let Some(name) = e.counterparty {
            let set = dates.entry(name).or_default();
            if let Some(date) = e.date() {
                set.insert(date);
            }
        }
    }
    let mut streaks: Vec<(String, usize)> = dates
        .into_iter()
        .map(|(name, set)| (name.to_string(), longest_run(&set)))
        .collect();
    streaks.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));
    let skip = streaks.len().saturating_sub(n);
    streaks.split_off(skip)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn toolbox() -> Json {
    json!({
        "feature": {
            "saveAsImage": { "title": "保存为图片", "pixelRatio": 2 },
            "restore": { "title": "还原" },
            "dataView": { "title": "数据视图", "readOnly": true },
        }
    })
}

/// A chart to place on the page: its ECharts option and CSS size.
struct Chart {
    option: Json,
    width: &'static str,
    height: &'static str,
}

impl Chart {
    fn full(option: Json) -> Self {
        Self {
            option,
            width: "100%",
            height: "500px",
        }
    }

    fn half(option: Json) -> Self {
        Self {
            option,
            width: "700px",
            height: "400px",
        }
    }
}

fn summary_chart(s: &ReportSummary) -> Chart {
    let labels = [
        "总支出", "总收入", "收支净额", "交易天数", "支出笔数", "收入笔数", "商户数",
        "笔均支出", "笔均收入", "日均支出", "最大单笔", "支出天数",
    ];
    let values = [
        round2(s.total_expense),
        round2(s.total_income),
        round2(s.net_flow),
        s.trading_days as f64,
        s.expense_count as f64,
        s.income_count as f64,
        s.counterparty_count as f64,
        round2(s.avg_expense),
        round2(s.avg_income),
        round2(s.daily_avg_expense),
        round2(s.max_single_expense),
        s.expense_days as f64,
    ];
    let data: Vec<Json> = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            json!({
                "value": v,
                "itemStyle": { "color": SUMMARY_COLORS[i % SUMMARY_COLORS.len()] },
            })
        })
        .collect();

    Chart {
        option: json!({
            "title": {
                "text": "💎 财务数据核心摘要",
                "subtext": format!(
                    "账单周期概览 | 总交易笔数: {} | 跨度: {} 天",
                    s.total_transactions, s.trading_days
                ),
                "left": "center",
            },
            "toolbox": toolbox(),
            "xAxis": { "type": "category", "data": labels, "axisLabel": { "fontSize": 11 } },
            "yAxis": { "type": "value", "show": false },
            "series": [{
                "name": "金额/数量",
                "type": "bar",
                "data": data,
                "label": { "show": true, "position": "top", "fontSize": 11, "fontWeight": "bold" },
            }],
        }),
        width: "100%",
        height: "220px",
    }
}

fn monthly_chart(s: &ReportSummary) -> Chart {
    let months: Vec<&str> = s.monthly.iter().map(|m| m.month.as_str()).collect();
    let expense: Vec<f64> = s.monthly.iter().map(|m| round2(m.expense)).collect();
    let income: Vec<f64> = s.monthly.iter().map(|m| round2(m.income)).collect();
    Chart::full(json!({
        "title": { "text": "📈 月度收支走势分析", "subtext": "观察跨月财务变动情况" },
        "tooltip": { "trigger": TOOLTIP_AXIS },
        "legend": { "top": "5%" },
        "toolbox": toolbox(),
        "dataZoom": [{ "type": "slider" }, { "type": "inside" }],
        "xAxis": { "type": "category", "data": months },
        "yAxis": { "type": "value" },
        "series": [
            { "name": "月度支出", "type": "bar", "data": expense, "itemStyle": { "color": "#d14b41" } },
            { "name": "月度收入", "type": "bar", "data": income, "itemStyle": { "color": "#5793f3" } },
        ],
    }))
}

fn pie_data(items: &[(String, f64)]) -> Vec<Json> {
    items
        .iter()
        .map(|(name, value)| json!({ "name": name, "value": round2(*value) }))
        .collect()
}

fn type_chart(s: &ReportSummary) -> Chart {
    Chart {
        option: json!({
            "title": { "text": "🏦 资金结构分布", "left": "center" },
            "toolbox": toolbox(),
            "series": [{
                "type": "pie",
                "radius": ["40%", "70%"],
                "data": pie_data(&s.type_distribution),
                "label": { "formatter": "{b}: {d}%" },
            }],
        }),
        width: "480px",
        height: "400px",
    }
}

fn counterparty_pie(s: &ReportSummary) -> Chart {
    Chart {
        option: json!({
            "title": { "text": "🍔 消费去向构成 (Top 10)", "left": "center" },
            "toolbox": toolbox(),
            "series": [{
                "type": "pie",
                "radius": ["30%", "65%"],
                "roseType": "area",
                "data": pie_data(&s.top_counterparties),
                "label": { "formatter": "{b}: {d}%" },
            }],
        }),
        width: "480px",
        height: "400px",
    }
}

fn ranking_chart(s: &ReportSummary) -> Chart {
    let names: Vec<&str> = s.counterparty_ranking.iter().map(|(n, _)| n.as_str()).collect();
    let values: Vec<f64> = s.counterparty_ranking.iter().map(|(_, v)| round2(*v)).collect();
    let max = values.iter().copied().fold(0.0, f64::max);
    Chart::full(json!({
        "title": { "text": "🥇 商户支出排行榜 (Top 20)", "subtext": "识别主要消费对象" },
        "toolbox": toolbox(),
        "visualMap": {
            "show": false,
            "min": 0,
            "max": max,
            "dimension": 0,
            "inRange": { "color": ["#7fb9d8", "#005ea1"] },
        },
        "xAxis": { "type": "value", "name": "金额" },
        "yAxis": { "type": "category", "data": names },
        "series": [{
            "name": "支出金额",
            "type": "bar",
            "data": values,
            "label": { "show": true, "position": "right" },
        }],
    }))
}

fn hourly_chart(s: &ReportSummary) -> Chart {
    let hours: Vec<String> = (0..24).map(|h| format!("{h}点")).collect();
    Chart::half(json!({
        "title": { "text": "🕒 24小时交易习惯分析", "subtext": "了解日常消费时间分布" },
        "tooltip": { "trigger": TOOLTIP_AXIS },
        "toolbox": toolbox(),
        "xAxis": { "type": "category", "boundaryGap": false, "data": hours },
        "legend": { "top": "bottom" },
        "yAxis": [
            { "type": "value", "name": "笔数" },
            { "type": "value", "name": "元" },
        ],
        "series": [
            {
                "name": "交易频次",
                "type": "line",
                "smooth": true,
                "data": s.hourly_expense_counts,
                "lineStyle": { "width": 3, "color": "#ff9900" },
                "areaStyle": { "opacity": 0.1, "color": "#ff9900" },
            },
            {
                "name": "交易金额",
                "type": "line",
                "smooth": true,
                "yAxisIndex": 1,
                "data": s.hourly_expense_amounts.map(round2),
                "lineStyle": { "width": 2, "color": "#5470c6" },
            },
        ],
    }))
}

fn streak_chart(s: &ReportSummary) -> Chart {
    let names: Vec<&str> = s.consecutive_days.iter().map(|(n, _)| n.as_str()).collect();
    let values: Vec<usize> = s.consecutive_days.iter().map(|(_, v)| *v).collect();
    Chart::half(json!({
        "title": { "text": "🔍 商户消费频率分析", "subtext": "识别高频消费商户" },
        "toolbox": toolbox(),
        "xAxis": { "type": "value", "name": "天数" },
        "yAxis": { "type": "category", "data": names },
        "series": [{
            "name": "最高连续消费天数",
            "type": "bar",
            "data": values,
            "itemStyle": { "color": "#fc8d59" },
            "label": { "show": true, "position": "right" },
        }],
    }))
}

/// Charts in page order; inner vectors share one row.
fn chart_rows(s: &ReportSummary) -> Vec<Vec<Chart>> {
    let mut rows = vec![vec![summary_chart(s)], vec![monthly_chart(s)]];

    if !s.type_distribution.is_empty() && !s.top_counterparties.is_empty() {
        rows.push(vec![type_chart(s), counterparty_pie(s)]);
    }
    if !s.counterparty_ranking.is_empty() {
        rows.push(vec![ranking_chart(s)]);
    }

    let mut habits = Vec::new();
    if s.expense_count > 0 {
        habits.push(hourly_chart(s));
    }
    if !s.consecutive_days.is_empty() {
        habits.push(streak_chart(s));
    }
    if !habits.is_empty() {
        rows.push(habits);
    }
    rows
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Serialize an option for embedding inside `<script>`.
fn script_json(option: &Json) -> String {
    option.to_string().replace("</", "<\\/")
}

/// Render the report page.
pub fn render_html(summary: &ReportSummary, title: &str) -> String {
    let title = escape_html(title);
    let mut body = String::new();
    let mut scripts = String::new();
    let mut index = 0;

    for row in chart_rows(summary) {
        body.push_str("<div class=\"chart-row\">\n");
        for chart in row {
            body.push_str(&format!(
                "  <div id=\"chart_{index}\" class=\"chart-container\" style=\"width:{};height:{};\"></div>\n",
                chart.width, chart.height
            ));
            scripts.push_str(&format!(
                "echarts.init(document.getElementById('chart_{index}')).setOption({});\n",
                script_json(&chart.option)
            ));
            index += 1;
        }
        body.push_str("</div>\n");
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<script src=\"{ECHARTS_CDN}\"></script>\n{PAGE_CSS}\n</head>\n\
         <body>\n<h1>📊 {title}</h1>\n{body}<script>\n{scripts}</script>\n</body>\n</html>\n"
    )
}

/// Write the report for `summary` to `path`.
///
/// # Errors
///
/// Returns [`ExportError::Io`] if the file cannot be written.
pub fn write_html(summary: &ReportSummary, path: impl AsRef<Path>) -> Result<(), ExportError> {
    std::fs::write(path, render_html(summary, REPORT_TITLE))?;
    Ok(())
}
