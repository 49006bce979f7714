//! Agreement counts per entity category.

use serde::{Deserialize, Serialize};

use crate::presence::DiffStatus;

/// Always satisfies `total == common + partial + unique`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub total: usize,
    pub common: usize,
    pub partial: usize,
    pub unique: usize,
}

impl CategoryMetrics {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = DiffStatus>,
    {
        let mut metrics = Self::default();
        for status in statuses {
            metrics.record(status);
        }
        metrics
    }

    fn record(&mut self, status: DiffStatus) {
        self.total += 1;
        match status {
            DiffStatus::Common => self.common += 1,
            DiffStatus::Partial => self.partial += 1,
            DiffStatus::Unique => self.unique += 1,
        }
    }

    /// Share of entities present in every source; `1.0` for an empty category.
    pub fn agreement_ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.common as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementMetrics {
    pub parameters: CategoryMetrics,
    pub rules: CategoryMetrics,
    pub edges: CategoryMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_add_up() {
        let m = CategoryMetrics::from_statuses([
            DiffStatus::Common,
            DiffStatus::Unique,
            DiffStatus::Common,
            DiffStatus::Partial,
        ]);
        assert_eq!((m.total, m.common, m.partial, m.unique), (4, 2, 1, 1));
        assert!((m.agreement_ratio() - 0.5).abs() < f64::EPSILON);
        assert_eq!(CategoryMetrics::default().agreement_ratio(), 1.0);
    }
}
