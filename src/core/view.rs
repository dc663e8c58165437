//! Display records joining reading state with annotations.
//!
//! Composition is a pure function of the two current states. Only devices
//! with a reading get a record; annotations for unknown devices are ignored.

use crate::core::annotations::AnnotationTable;
use crate::core::device::DeviceId;
use crate::core::history::{HistoryBuffer, HistoryPoint};
use crate::core::readings::DeviceLatestState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Risk label shown before a device has been analysed.
pub const PENDING_RISK: &str = "PENDING";

/// Reason text shown before a device has been analysed.
pub const AWAITING_ANALYSIS: &str = "Waiting for AI analysis";

/// Substrings that mark a risk label as high risk (case-sensitive).
pub const HIGH_RISK_MARKERS: [&str; 2] = ["HIGH", "HEAT"];

/// Whether a risk label should be highlighted.
pub fn is_high_risk(label: &str) -> bool {
    HIGH_RISK_MARKERS.iter().any(|marker| label.contains(marker))
}

/// Everything needed to draw one device card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayRecord {
    pub device_id: DeviceId,
    pub online: bool,
    pub age_secs: i64,
    pub last_seen: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub status: Option<String>,
    pub risk: String,
    pub reason: String,
    pub high_risk: bool,
    /// No risk label has been received for this device yet
    pub pending: bool,
    pub history: Vec<HistoryPoint>,
    pub chartable: bool,
}

/// Join latest state, history and annotations into display records,
/// ordered by device id.
pub fn compose(
    latest: &BTreeMap<DeviceId, DeviceLatestState>,
    history: &BTreeMap<DeviceId, HistoryBuffer>,
    annotations: &AnnotationTable,
) -> Vec<DisplayRecord> {
    latest
        .iter()
        .map(|(id, state)| {
            let annotation = annotations.get(id.as_str());
            let risk = annotation.and_then(|a| a.risk.clone());
            let reason = annotation.and_then(|a| a.reason.clone());
            let buffer = history.get(id.as_str());

            let pending = risk.is_none();
            let risk = risk.unwrap_or_else(|| PENDING_RISK.to_string());

            DisplayRecord {
                device_id: id.clone(),
                online: state.online,
                age_secs: state.age_secs,
                last_seen: state.reading.timestamp,
                temperature: state.reading.temperature,
                humidity: state.reading.humidity,
                status: state.reading.status.clone(),
                high_risk: is_high_risk(&risk),
                risk,
                reason: reason.unwrap_or_else(|| AWAITING_ANALYSIS.to_string()),
                pending,
                history: buffer.map(|b| b.points().to_vec()).unwrap_or_default(),
                chartable: buffer.is_some_and(HistoryBuffer::is_chartable),
            }
        })
        .collect()
}

/// The complete display-ready state at one instant.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardView {
    pub records: Vec<DisplayRecord>,
    /// When the reading snapshot behind this view was processed
    pub readings_processed_at: Option<DateTime<Utc>>,
    /// When the annotation snapshot behind this view was processed
    pub annotations_processed_at: Option<DateTime<Utc>>,
}

impl DashboardView {
    /// No devices reporting. A valid, displayable state.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, device_id: &str) -> Option<&DisplayRecord> {
        self.records
            .iter()
            .find(|r| r.device_id.as_str() == device_id)
    }

    pub fn online_count(&self) -> usize {
        self.records.iter().filter(|r| r.online).count()
    }

    pub fn high_risk(&self) -> impl Iterator<Item = &DisplayRecord> {
        self.records.iter().filter(|r| r.high_risk)
    }
}

fn format_measure(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.1} {unit}"),
        None => "--".to_string(),
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.records.is_empty() {
            return writeln!(f, "No devices reporting yet");
        }

        writeln!(
            f,
            "{} device(s), {} online",
            self.records.len(),
            self.online_count()
        )?;

        for record in &self.records {
            writeln!(f)?;
            writeln!(
                f,
                "[{}] {}",
                record.device_id,
                if record.online { "ONLINE" } else { "OFFLINE" }
            )?;
            writeln!(
                f,
                "  AI: {}{} - {}",
                record.risk,
                if record.high_risk { " (!)" } else { "" },
                record.reason
            )?;
            writeln!(
                f,
                "  {} | {} | {}s ago",
                format_measure(record.temperature, "°C"),
                format_measure(record.humidity, "%"),
                record.age_secs
            )?;
            if record.chartable {
                writeln!(f, "  history: {} points", record.history.len())?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::device::{Annotation, Reading};
    use crate::core::history::HistoryBuilder;
    use crate::core::readings::ReadingAggregator;
    use chrono::Duration;

    fn reading(id: &str, timestamp: DateTime<Utc>, temperature: f64) -> Reading {
        Reading {
            device_id: DeviceId::new(id).unwrap(),
            timestamp,
            temperature: Some(temperature),
            humidity: Some(45.0),
            status: Some("ok".to_string()),
        }
    }

    fn annotation(id: &str, risk: &str, reason: &str) -> Annotation {
        Annotation {
            device_id: DeviceId::new(id).unwrap(),
            risk: Some(risk.to_string()),
            reason: Some(reason.to_string()),
        }
    }

    fn records(readings: &[Reading], annotations: Vec<Annotation>) -> Vec<DisplayRecord> {
        let now = Utc::now();
        let latest = ReadingAggregator::default().aggregate(readings, now);
        let history = HistoryBuilder::default().build(readings);
        compose(&latest, &history, &AnnotationTable::from_snapshot(annotations))
    }

    #[test]
    fn test_high_risk_markers() {
        assert!(is_high_risk("HIGH_TEMP_ALERT"));
        assert!(is_high_risk("HEAT_WARNING"));
        assert!(is_high_risk("VERY_HIGH"));
        assert!(!is_high_risk("LOW"));
        assert!(!is_high_risk(PENDING_RISK));
        assert!(!is_high_risk("high"));
    }

    #[test]
    fn test_device_without_annotation_is_pending() {
        let records = records(&[reading("C", Utc::now(), 20.0)], Vec::new());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].risk, PENDING_RISK);
        assert_eq!(records[0].reason, AWAITING_ANALYSIS);
        assert!(records[0].pending);
        assert!(!records[0].high_risk);
    }

    #[test]
    fn test_annotation_without_reading_is_not_rendered() {
        let records = records(
            &[reading("A", Utc::now(), 20.0)],
            vec![annotation("D", "HIGH", "hot")],
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].device_id.as_str(), "A");
    }

    #[test]
    fn test_annotation_joined() {
        let records = records(
            &[reading("A", Utc::now(), 38.0)],
            vec![annotation("A", "HEAT_WARNING", "Sustained heat above 35°C")],
        );
        let record = &records[0];
        assert_eq!(record.risk, "HEAT_WARNING");
        assert_eq!(record.reason, "Sustained heat above 35°C");
        assert!(record.high_risk);
        assert!(!record.pending);
        assert_eq!(record.status.as_deref(), Some("ok"));
    }

    #[test]
    fn test_blank_risk_falls_back_to_pending() {
        let now = Utc::now();
        let readings = [reading("A", now, 20.0)];
        let latest = ReadingAggregator::default().aggregate(&readings, now);
        let table = AnnotationTable::from_snapshot(vec![Annotation {
            device_id: DeviceId::new("A").unwrap(),
            risk: None,
            reason: Some("model still warming up".to_string()),
        }]);

        let records = compose(&latest, &BTreeMap::new(), &table);
        assert_eq!(records[0].risk, PENDING_RISK);
        assert_eq!(records[0].reason, "model still warming up");
        assert!(records[0].history.is_empty());
        assert!(!records[0].chartable);
    }

    #[test]
    fn test_history_attached() {
        let now = Utc::now();
        let records = records(
            &[
                reading("A", now, 21.0),
                reading("A", now - Duration::seconds(5), 20.0),
            ],
            Vec::new(),
        );
        assert!(records[0].chartable);
        assert_eq!(records[0].history[0].temperature, Some(20.0));
        assert_eq!(records[0].history[1].temperature, Some(21.0));
    }

    #[test]
    fn test_empty_view_renders() {
        let view = DashboardView::default();
        assert!(view.is_empty());
        assert_eq!(view.to_string(), "No devices reporting yet\n");
    }

    #[test]
    fn test_view_rendering() {
        let now = Utc::now();
        let view = DashboardView {
            records: records(
                &[reading("A", now, 21.0), reading("B", now - Duration::minutes(5), 19.0)],
                vec![annotation("A", "HIGH_TEMP_ALERT", "Too warm")],
            ),
            readings_processed_at: Some(now),
            annotations_processed_at: Some(now),
        };

        assert_eq!(view.online_count(), 1);
        assert_eq!(view.high_risk().count(), 1);

        let text = view.to_string();
        assert!(text.contains("2 device(s), 1 online"));
        assert!(text.contains("[A] ONLINE"));
        assert!(text.contains("[B] OFFLINE"));
        assert!(text.contains("AI: HIGH_TEMP_ALERT (!) - Too warm"));
        assert!(text.contains("21.0 °C"));
        assert!(text.contains(AWAITING_ANALYSIS));
    }
}
