use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Company, EntityRecord, RecordKind};

/// Collection sizes plus the time of the last save.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Stats {
    pub total_companies: usize,
    pub total_contacts: usize,
    pub total_job_offers: usize,
    pub total_employees: usize,
    pub total_tasks: usize,
    pub last_updated: Option<DateTime<Utc>>,
}

/// The whole JSON-backed database: every collection and the stats block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrmDocument {
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub contacts: Vec<EntityRecord>,
    #[serde(default)]
    pub job_offers: Vec<EntityRecord>,
    #[serde(default)]
    pub employees: Vec<EntityRecord>,
    #[serde(default)]
    pub tasks: Vec<EntityRecord>,
    #[serde(default)]
    pub stats: Stats,
}

impl CrmDocument {
    pub fn records(&self, kind: RecordKind) -> &Vec<EntityRecord> {
        match kind {
            RecordKind::Contact => &self.contacts,
            RecordKind::JobOffer => &self.job_offers,
            RecordKind::Employee => &self.employees,
            RecordKind::Task => &self.tasks,
        }
    }

    pub fn records_mut(&mut self, kind: RecordKind) -> &mut Vec<EntityRecord> {
        match kind {
            RecordKind::Contact => &mut self.contacts,
            RecordKind::JobOffer => &mut self.job_offers,
            RecordKind::Employee => &mut self.employees,
            RecordKind::Task => &mut self.tasks,
        }
    }

    /// Recomputes the stats block from the current collections.
    pub fn refresh_stats(&mut self, now: DateTime<Utc>) {
        self.stats = Stats {
            total_companies: self.companies.len(),
            total_contacts: self.contacts.len(),
            total_job_offers: self.job_offers.len(),
            total_employees: self.employees.len(),
            total_tasks: self.tasks.len(),
            last_updated: Some(now),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    #[test]
    fn test_refresh_stats_counts_every_collection() {
        let mut doc = CrmDocument::default();
        let now = Utc::now();
        doc.tasks.push(EntityRecord::new(1, Map::new(), now));
        doc.tasks.push(EntityRecord::new(2, Map::new(), now));
        doc.contacts.push(EntityRecord::new(1, Map::new(), now));
        doc.refresh_stats(now);
        assert_eq!(doc.stats.total_tasks, 2);
        assert_eq!(doc.stats.total_contacts, 1);
        assert_eq!(doc.stats.total_companies, 0);
        assert_eq!(doc.stats.last_updated, Some(now));
    }

    #[test]
    fn test_partial_document_loads_with_defaults() {
        let doc: CrmDocument = serde_json::from_str(r#"{"companies": []}"#).unwrap();
        assert!(doc.job_offers.is_empty());
        assert_eq!(doc.stats, Stats::default());
    }
}
