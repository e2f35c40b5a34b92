use serde::{Deserialize, Serialize};

use super::{Payload, RecordKind};
use crate::error::{ShiftboardError, ShiftboardResult};

/// One line in a day cell of the shift calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Day of the month (1-31).
    pub day: u32,
    /// Who the entry is about.
    pub name: String,
    /// Free text, e.g. "off" or a site name.
    pub text: String,
}

impl Payload for Entry {
    const KIND: RecordKind = RecordKind::Entry;
    const DEFAULT_COLLECTION: &'static str = "calendar_posts";
    const PARTITION_FIELD: &'static str = "ym";

    fn sort_key(&self) -> i64 {
        i64::from(self.day)
    }

    fn validate(&self) -> ShiftboardResult<()> {
        if !(1..=31).contains(&self.day) {
            return Err(ShiftboardError::InvalidInput(format!(
                "day {} is outside 1-31",
                self.day
            )));
        }
        if self.name.trim().is_empty() {
            return Err(ShiftboardError::InvalidInput("entry needs a name".into()));
        }
        if self.text.trim().is_empty() {
            return Err(ShiftboardError::InvalidInput("entry needs some text".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(day: u32, name: &str, text: &str) -> Entry {
        Entry {
            day,
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn validates_day_and_required_text() {
        assert!(entry(31, "Sato", "off").validate().is_ok());
        assert!(entry(0, "Sato", "off").validate().is_err());
        assert!(entry(32, "Sato", "off").validate().is_err());
        assert!(entry(5, " ", "off").validate().is_err());
        assert!(entry(5, "Sato", "").validate().is_err());
    }

    #[test]
    fn sorts_by_day() {
        assert!(entry(2, "a", "b").sort_key() < entry(10, "a", "b").sort_key());
    }
}
