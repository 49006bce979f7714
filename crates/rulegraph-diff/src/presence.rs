//! Presence vectors, agreement status and the status → style mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which sources an entity occurs in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceVector {
    /// Labels in source order, no duplicates.
    pub present_in: Vec<String>,
    pub total_sources: usize,
}

impl PresenceVector {
    pub fn new(total_sources: usize) -> Self {
        Self {
            present_in: Vec::new(),
            total_sources,
        }
    }

    /// Record `label`; repeated marks from the same source count once.
    pub fn mark(&mut self, label: &str) {
        if !self.contains(label) {
            self.present_in.push(label.to_string());
        }
    }

    pub fn contains(&self, label: &str) -> bool {
        self.present_in.iter().any(|l| l == label)
    }

    pub fn count(&self) -> usize {
        self.present_in.len()
    }

    pub fn status(&self) -> DiffStatus {
        DiffStatus::classify(self.count(), self.total_sources)
    }

    /// Short `present/total` label, e.g. `2/3`.
    pub fn fraction(&self) -> String {
        format!("{}/{}", self.count(), self.total_sources)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffStatus {
    Common,
    Partial,
    Unique,
}

impl DiffStatus {
    /// `common` when present everywhere, `unique` when present once,
    /// `partial` otherwise. Full presence wins when there is one source.
    pub fn classify(present: usize, total: usize) -> Self {
        if present == total {
            DiffStatus::Common
        } else if present == 1 {
            DiffStatus::Unique
        } else {
            DiffStatus::Partial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DiffStatus::Common => "common",
            DiffStatus::Partial => "partial",
            DiffStatus::Unique => "unique",
        }
    }

    /// Stable rendering contract consumed by visual projections.
    pub fn style(&self) -> StatusStyle {
        match self {
            DiffStatus::Common => StatusStyle {
                line: LineStyle::Solid,
                color: StyleColor::Black,
            },
            DiffStatus::Partial => StatusStyle {
                line: LineStyle::Dashed,
                color: StyleColor::Orange,
            },
            DiffStatus::Unique => StatusStyle {
                line: LineStyle::Bold,
                color: StyleColor::Red,
            },
        }
    }
}

impl fmt::Display for DiffStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineStyle {
    Solid,
    Dashed,
    Bold,
}

impl LineStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStyle::Solid => "solid",
            LineStyle::Dashed => "dashed",
            LineStyle::Bold => "bold",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleColor {
    Black,
    Orange,
    Red,
}

impl StyleColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleColor::Black => "black",
            StyleColor::Orange => "orange",
            StyleColor::Red => "red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusStyle {
    pub line: LineStyle,
    pub color: StyleColor,
}
