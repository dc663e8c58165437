//! Latest AI annotation per device.

use crate::core::device::{Annotation, DeviceId};
use serde::Serialize;
use std::collections::BTreeMap;

/// One annotation per device, rebuilt wholesale from each snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AnnotationTable {
    entries: BTreeMap<DeviceId, Annotation>,
}

impl AnnotationTable {
    /// Build the table from a full annotation snapshot.
    ///
    /// Duplicate device ids resolve to the last one in iteration order.
    pub fn from_snapshot(annotations: impl IntoIterator<Item = Annotation>) -> Self {
        let mut entries = BTreeMap::new();
        for annotation in annotations {
            entries.insert(annotation.device_id.clone(), annotation);
        }
        Self { entries }
    }

    pub fn get(&self, device_id: &str) -> Option<&Annotation> {
        self.entries.get(device_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotation(id: &str, risk: &str) -> Annotation {
        Annotation {
            device_id: DeviceId::new(id).unwrap(),
            risk: Some(risk.to_string()),
            reason: None,
        }
    }

    #[test]
    fn test_duplicates_last_wins() {
        let table = AnnotationTable::from_snapshot(vec![
            annotation("A", "LOW"),
            annotation("B", "LOW"),
            annotation("A", "HIGH"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("A").unwrap().risk.as_deref(), Some("HIGH"));
    }

    #[test]
    fn test_each_snapshot_replaces_table() {
        let first = AnnotationTable::from_snapshot(vec![annotation("sensor-1", "LOW")]);
        assert!(first.get("sensor-1").is_some());

        let second = AnnotationTable::from_snapshot(vec![annotation("sensor-2", "HIGH")]);
        assert!(second.get("sensor-1").is_none());
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn test_empty_snapshot() {
        let table = AnnotationTable::from_snapshot(Vec::new());
        assert!(table.is_empty());
    }
}
