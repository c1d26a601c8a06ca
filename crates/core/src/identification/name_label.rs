use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Result of one identification request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelUpdate {
    pub sequence: u64,
    pub name: Option<String>,
}

/// Which completed identification a label shows when several overlap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LabelOrdering {
    /// Only the most recently submitted request may change the label.
    #[default]
    LatestIssued,
    /// Whichever request finishes last wins.
    LastCompleted,
}

impl FromStr for LabelOrdering {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "latest-issued" => Ok(Self::LatestIssued),
            "last-completed" => Ok(Self::LastCompleted),
            other => Err(format!(
                "label ordering must be 'latest-issued' or 'last-completed', got '{other}'"
            )),
        }
    }
}

impl fmt::Display for LabelOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelOrdering::LatestIssued => write!(f, "latest-issued"),
            LabelOrdering::LastCompleted => write!(f, "last-completed"),
        }
    }
}

/// On-screen name of the identified person. Hidden until a name arrives.
#[derive(Debug)]
pub struct NameLabel {
    text: String,
    hidden: bool,
    ordering: LabelOrdering,
    latest_issued: Arc<AtomicU64>,
}

impl NameLabel {
    /// `latest_issued` is the dispatcher's sequence counter.
    pub fn new(ordering: LabelOrdering, latest_issued: Arc<AtomicU64>) -> Self {
        Self {
            text: String::new(),
            hidden: true,
            ordering,
            latest_issued,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    /// Returns whether the update was applied.
    pub fn apply(&mut self, update: &LabelUpdate) -> bool {
        if self.ordering == LabelOrdering::LatestIssued {
            let latest = self.latest_issued.load(Ordering::Acquire);
            if update.sequence != latest {
                log::debug!(
                    "Dropping label result {} superseded by {latest}",
                    update.sequence
                );
                return false;
            }
        }

        match &update.name {
            Some(name) => {
                if self.hidden || self.text != *name {
                    log::info!("Identified: {name}");
                }
                self.text.clone_from(name);
                self.hidden = false;
            }
            None => self.hidden = true,
        }
        true
    }
}
