#![allow(clippy::format_push_string)]
#![allow(clippy::uninlined_format_args)]

use crate::records::{NamedMetrics, NextStepForecast};
use chrono::NaiveDate;

/// Everything the console report shows for one run.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub title: String,
    pub model: String,
    pub evaluation_period: Option<(NaiveDate, NaiveDate)>,
    pub train_samples: usize,
    pub eval_samples: usize,
    pub metrics: Vec<NamedMetrics>,
    /// Extra `label: value` lines printed under "Diagnostics"
    pub diagnostics: Vec<(String, String)>,
    pub next_step: Option<NextStepForecast>,
}

pub struct MetricsFormatter;

impl MetricsFormatter {
    #[must_use]
    pub fn format(summary: &MetricsSummary) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!("{:^63}\n", summary.title.to_uppercase()));
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push('\n');

        // Data
        output.push_str("Data\n");
        output.push_str("───────────────────────────────────────────────────────────────\n");
        output.push_str(&format!("Model:                 {}\n", summary.model));
        if let Some((start, end)) = summary.evaluation_period {
            output.push_str(&format!(
                "Evaluation Period:     {} to {}\n",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ));
        }
        output.push_str(&format!("Training Samples:      {}\n", summary.train_samples));
        output.push_str(&format!("Evaluation Samples:    {}\n", summary.eval_samples));
        output.push('\n');

        // Accuracy
        for named in &summary.metrics {
            output.push_str(&format!("Accuracy ({})\n", named.name));
            output.push_str("───────────────────────────────────────────────────────────────\n");
            output.push_str(&format!("MAE:                   {:.4}\n", named.metrics.mae));
            output.push_str(&format!("RMSE:                  {:.4}\n", named.metrics.rmse));
            output.push_str(&format!("MSE:                   {:.6}\n", named.metrics.mse));
            if named.metrics.mape.is_finite() {
                output.push_str(&format!(
                    "MAPE:                  {:.2}%\n",
                    named.metrics.mape * 100.0
                ));
            } else {
                output.push_str("MAPE:                  N/A\n");
            }
            output.push('\n');
        }

        if !summary.diagnostics.is_empty() {
            output.push_str("Diagnostics\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            for (label, value) in &summary.diagnostics {
                output.push_str(&format!("{:<23}{}\n", format!("{}:", label), value));
            }
            output.push('\n');
        }

        if let Some(next) = &summary.next_step {
            output.push_str("Next Step\n");
            output.push_str("───────────────────────────────────────────────────────────────\n");
            output.push_str(&format!(
                "After {}:      {:.4}\n",
                next.last_observed.format("%Y-%m-%d"),
                next.predicted_price
            ));
            output.push('\n');
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");

        if summary.eval_samples == 0 {
            output.push_str("\n⚠️  No evaluation samples were produced.\n");
            output.push_str("    Consider a longer history or a smaller window.\n\n");
        }

        output
    }
}
