use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::leaves::types::LeaveType;
use crate::store::{KeyValueStore, StoreError};
use crate::utils::constants::{ALLOW_ANNUAL_KEY, ALLOW_CASUAL_KEY, ALLOW_SICK_KEY};

pub const DEFAULT_ANNUAL: u32 = 20;
pub const DEFAULT_SICK: u32 = 10;
pub const DEFAULT_CASUAL: u32 = 7;

/// Yearly day allowance per leave type, a local preference only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Allowances {
    pub annual: u32,
    pub sick: u32,
    pub casual: u32,
}

impl Default for Allowances {
    fn default() -> Self {
        Self {
            annual: DEFAULT_ANNUAL,
            sick: DEFAULT_SICK,
            casual: DEFAULT_CASUAL,
        }
    }
}

fn store_key(kind: LeaveType) -> &'static str {
    match kind {
        LeaveType::Annual => ALLOW_ANNUAL_KEY,
        LeaveType::Sick => ALLOW_SICK_KEY,
        LeaveType::Casual => ALLOW_CASUAL_KEY,
    }
}

impl Allowances {
    pub fn get(&self, kind: LeaveType) -> u32 {
        match kind {
            LeaveType::Annual => self.annual,
            LeaveType::Sick => self.sick,
            LeaveType::Casual => self.casual,
        }
    }

    pub fn set(&mut self, kind: LeaveType, days: u32) {
        match kind {
            LeaveType::Annual => self.annual = days,
            LeaveType::Sick => self.sick = days,
            LeaveType::Casual => self.casual = days,
        }
    }

    /// Read from the store. Missing, unreadable or non-numeric entries
    /// fall back to the default for that type.
    pub async fn load(store: &Arc<dyn KeyValueStore>) -> Self {
        let mut allowances = Self::default();
        for kind in LeaveType::ALL {
            let key = store_key(kind);
            match store.get(key).await {
                Ok(Some(raw)) => match raw.trim().parse::<u32>() {
                    Ok(days) => allowances.set(kind, days),
                    Err(_) => debug!(key, value = %raw, "ignoring non-numeric allowance"),
                },
                Ok(None) => {}
                Err(e) => warn!(key, store = store.name(), "reading allowance failed: {}", e),
            }
        }
        allowances
    }

    pub async fn save(&self, store: &Arc<dyn KeyValueStore>) -> Result<(), StoreError> {
        for kind in LeaveType::ALL {
            store.set(store_key(kind), &self.get(kind).to_string()).await?;
        }
        Ok(())
    }
}
