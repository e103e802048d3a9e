//! Chart payloads in Plotly's `{data, layout}` shape.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::json;
use crate::anomaly::AnomalyOutcome;
use crate::input::{Column, Dataset};

const NORMAL_COLOR: &str = "#1f77b4";
const ANOMALY_COLOR: &str = "#d62728";

/// One chart, ready for a rendering client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    /// Stable key, `<column>_box` or `<column>_scatter`.
    pub key: String,
    /// Trace list.
    pub data: Value,
    pub layout: Value,
}

impl ChartPayload {
    pub fn title(&self) -> Option<&str> {
        self.layout.get("title")?.get("text")?.as_str()
    }

    /// Chart type of the first trace.
    pub fn chart_type(&self) -> Option<&str> {
        self.data.get(0)?.get("type")?.as_str()
    }
}

/// Distribution and anomaly charts for every numeric column the detector used.
///
/// Nothing is produced when the detector did not run.
pub fn build_charts(dataset: &Dataset, anomalies: &AnomalyOutcome) -> Vec<ChartPayload> {
    if anomalies.is_empty() {
        return Vec::new();
    }
    dataset
        .numeric_columns()
        .into_iter()
        .flat_map(|column| {
            [
                distribution_chart(dataset, column),
                anomaly_chart(dataset, column, anomalies),
            ]
        })
        .collect()
}

fn column_numbers(dataset: &Dataset, column: &Column) -> Vec<Value> {
    dataset
        .column_values(column.position)
        .map(|v| json::optional_number(v.as_number()))
        .collect()
}

fn layout(title: String, x_title: Option<&str>, y_title: &str) -> Value {
    let mut layout = json!({
        "title": { "text": title },
        "yaxis": { "title": { "text": y_title } },
    });
    if let Some(x_title) = x_title {
        layout["xaxis"] = json!({ "title": { "text": x_title } });
    }
    layout
}

fn distribution_chart(dataset: &Dataset, column: &Column) -> ChartPayload {
    ChartPayload {
        key: format!("{}_box", column.name),
        data: json!([{
            "type": "box",
            "name": column.name,
            "y": column_numbers(dataset, column),
            "boxpoints": "outliers",
        }]),
        layout: layout(format!("Distribution of {}", column.name), None, &column.name),
    }
}

fn anomaly_chart(dataset: &Dataset, column: &Column, anomalies: &AnomalyOutcome) -> ChartPayload {
    let values = column_numbers(dataset, column);
    let mut normal = (Vec::new(), Vec::new());
    let mut flagged = (Vec::new(), Vec::new());

    for (row, value) in values.into_iter().enumerate() {
        let id = row + 1;
        let is_anomaly = anomalies.get(row).is_some_and(|a| a.is_anomaly);
        let target = if is_anomaly { &mut flagged } else { &mut normal };
        target.0.push(json!(id));
        target.1.push(value);
    }

    let trace = |name: &str, (x, y): (Vec<Value>, Vec<Value>), color: &str| {
        json!({
            "type": "scatter",
            "mode": "markers",
            "name": name,
            "x": x,
            "y": y,
            "marker": { "color": color },
        })
    };

    ChartPayload {
        key: format!("{}_scatter", column.name),
        data: json!([
            trace("Normal", normal, NORMAL_COLOR),
            trace("Anomaly", flagged, ANOMALY_COLOR),
        ]),
        layout: layout(format!("Anomalies in {}", column.name), Some("Row"), &column.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::RowAnomaly;

    fn outcome(flags: &[bool]) -> AnomalyOutcome {
        AnomalyOutcome {
            rows: flags
                .iter()
                .map(|&is_anomaly| RowAnomaly {
                    anomaly_score: if is_anomaly { -0.7 } else { -0.4 },
                    is_anomaly,
                })
                .collect(),
            ..AnomalyOutcome::empty()
        }
    }

    #[test]
    fn test_two_charts_per_numeric_column() {
        let data = Dataset::from_cells(
            vec!["amount".into(), "name".into()],
            vec![
                vec!["1".into(), "a".into()],
                vec!["".into(), "b".into()],
                vec!["90".into(), "c".into()],
            ],
        )
        .unwrap();
        let charts = build_charts(&data, &outcome(&[false, false, true]));

        assert_eq!(charts.len(), 2);
        assert_eq!(charts[0].chart_type(), Some("box"));
        assert_eq!(charts[0].title(), Some("Distribution of amount"));
        assert_eq!(charts[0].data[0]["y"], json!([1, null, 90]));

        assert_eq!(charts[1].chart_type(), Some("scatter"));
        assert_eq!(charts[1].title(), Some("Anomalies in amount"));
        assert_eq!(charts[1].data[0]["x"], json!([1, 2]));
        assert_eq!(charts[1].data[1]["name"], json!("Anomaly"));
        assert_eq!(charts[1].data[1]["y"], json!([90]));
    }

    #[test]
    fn test_no_charts_without_detector_result() {
        let data = Dataset::from_cells(vec!["x".into()], vec![vec!["1".into()]]).unwrap();
        assert!(build_charts(&data, &AnomalyOutcome::empty()).is_empty());
    }
}
