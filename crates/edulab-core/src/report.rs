//! Learning analytics report rendering.
//!
//! Pure transformation of the backend's aggregate report into chart-ready
//! series. No mutable state; an empty aggregate renders a placeholder
//! instead of charts.

use serde::{Deserialize, Serialize};

/// Totals across every tracked execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total_executions: u64,
    pub successful_executions: u64,
    pub failed_executions: u64,
    #[serde(default)]
    pub success_rate: f64,
}

/// One error type and how often it occurred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDistributionEntry {
    pub error_type: String,
    pub count: u64,
}

/// Per-cell average execution time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTime {
    pub cell_id: String,
    pub avg_time_ms: f64,
    pub execution_count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeAnalysis {
    pub total_time_ms: i64,
    pub avg_time_ms: f64,
    #[serde(default)]
    pub max_time_ms: i64,
    #[serde(default)]
    pub cell_times: Vec<CellTime>,
}

/// Executions counted into 15-minute blocks of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityBucket {
    pub hour: u32,
    pub minute_block: u32,
    pub count: u64,
}

/// Aggregate report as returned by the analytics endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub execution_summary: ExecutionSummary,
    #[serde(default)]
    pub error_distribution: Vec<ErrorDistributionEntry>,
    pub time_analysis: TimeAnalysis,
    #[serde(default)]
    pub activity_heatmap: Vec<ActivityBucket>,
}

/// One chart's labels and values, in matching order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

/// Renderable form of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReportView {
    /// Nothing has been executed yet.
    Empty { message: String },
    Charts {
        /// Successful vs failed executions.
        success_donut: ChartSeries,
        /// Error type frequencies.
        error_bars: ChartSeries,
        /// Average time per cell.
        time_line: ChartSeries,
        /// Activity per 15-minute block, labeled "HH:MM".
        activity_heatmap: ChartSeries,
    },
}

/// Turns a fetched aggregate into chart-ready series.
pub fn render_report(report: &AnalyticsReport) -> ReportView {
    if report.execution_summary.total_executions == 0 {
        return ReportView::Empty {
            message: "No executions recorded yet.".to_string(),
        };
    }

    let summary = &report.execution_summary;
    let success_donut = ChartSeries {
        labels: vec!["successful".to_string(), "failed".to_string()],
        values: vec![
            summary.successful_executions as f64,
            summary.failed_executions as f64,
        ],
    };

    let error_bars = ChartSeries {
        labels: report
            .error_distribution
            .iter()
            .map(|e| e.error_type.clone())
            .collect(),
        values: report
            .error_distribution
            .iter()
            .map(|e| e.count as f64)
            .collect(),
    };

    let time_line = ChartSeries {
        labels: report
            .time_analysis
            .cell_times
            .iter()
            .map(|c| c.cell_id.clone())
            .collect(),
        values: report
            .time_analysis
            .cell_times
            .iter()
            .map(|c| c.avg_time_ms)
            .collect(),
    };

    let activity_heatmap = ChartSeries {
        labels: report
            .activity_heatmap
            .iter()
            .map(|b| format!("{:02}:{:02}", b.hour, b.minute_block))
            .collect(),
        values: report.activity_heatmap.iter().map(|b| b.count as f64).collect(),
    };

    ReportView::Charts {
        success_donut,
        error_bars,
        time_line,
        activity_heatmap,
    }
}
