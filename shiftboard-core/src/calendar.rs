//! Shared shift calendar: one month at a time, entries grouped per day.

use chrono::Weekday;

use crate::cache::LocalCache;
use crate::error::{ShiftboardError, ShiftboardResult};
use crate::partition::{CalendarDate, Month};
use crate::record::{Collection, Entry, Record, RecordId};
use crate::remote::RemoteStore;
use crate::sync::{Mode, SyncController, View};

/// One cell of the month grid.
#[derive(Debug)]
pub struct Day<'a> {
    pub day: u32,
    pub weekday: Weekday,
    pub entries: Vec<&'a Record<Entry>>,
}

pub struct ShiftCalendar<R: RemoteStore> {
    controller: SyncController<Entry, R>,
    month: Month,
}

impl<R: RemoteStore> ShiftCalendar<R> {
    /// Open the calendar showing `month`.
    pub fn open(collection: Collection, cache: LocalCache, remote: Option<R>, month: Month) -> Self {
        let mut controller = SyncController::open(collection, cache, remote);
        controller.activate(month.partition());
        ShiftCalendar { controller, month }
    }

    pub fn month(&self) -> Month {
        self.month
    }

    pub fn mode(&self) -> Mode {
        self.controller.mode()
    }

    pub fn is_degraded(&self) -> bool {
        self.controller.is_degraded()
    }

    pub fn on_change(&mut self, listener: impl FnMut(&View<'_, Entry>) + Send + 'static) {
        self.controller.on_change(listener);
    }

    pub fn show(&mut self, month: Month) {
        self.month = month;
        self.controller.activate(month.partition());
    }

    pub fn next_month(&mut self) {
        self.show(self.month.succ());
    }

    pub fn prev_month(&mut self) {
        self.show(self.month.pred());
    }

    /// Entries of the shown month in display order.
    pub fn entries(&self) -> &[Record<Entry>] {
        self.controller.records()
    }

    /// Every day of the shown month with its entries.
    pub fn days(&self) -> Vec<Day<'_>> {
        let mut days: Vec<Day<'_>> = (1..=self.month.days())
            .filter_map(|day| {
                let weekday = self.month.weekday_of(day)?;
                Some(Day {
                    day,
                    weekday,
                    entries: Vec::new(),
                })
            })
            .collect();

        for record in self.controller.records() {
            if let Some(slot) = days.get_mut(record.payload.day as usize - 1) {
                slot.entries.push(record);
            }
        }
        days
    }

    /// Add an entry on `date` ("YYYY-MM-DD"), switching to its month first if
    /// another month is shown.
    pub async fn post(&mut self, date: &str, name: &str, text: &str) -> ShiftboardResult<RecordId> {
        let name = name.trim();
        let text = text.trim();
        if name.is_empty() {
            return Err(ShiftboardError::InvalidInput("a name is required".into()));
        }
        if text.is_empty() {
            return Err(ShiftboardError::InvalidInput("entry text is empty".into()));
        }

        let date = CalendarDate::parse(date)?;
        if date.month() != self.month {
            self.show(date.month());
        }

        self.controller
            .add(Entry {
                day: date.day(),
                name: name.to_string(),
                text: text.to_string(),
            })
            .await
    }

    pub async fn remove(&mut self, id: &RecordId) -> ShiftboardResult<()> {
        self.controller.delete(id).await
    }

    /// Delete every entry of the shown month.
    pub async fn clear_month(&mut self) -> ShiftboardResult<()> {
        self.controller.clear_partition().await
    }

    pub async fn settle(&mut self) {
        self.controller.settle().await;
    }

    pub async fn next_feed(&mut self) -> bool {
        self.controller.next_feed().await
    }

    pub fn drain_pending(&mut self) -> usize {
        self.controller.drain_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MemoryStore;

    fn month(year: i32, month: u32) -> Month {
        Month::new(year, month).unwrap()
    }

    fn calendar(dir: &tempfile::TempDir, remote: Option<MemoryStore>) -> ShiftCalendar<MemoryStore> {
        ShiftCalendar::open(
            Collection::of::<Entry>(),
            LocalCache::new(dir.path()),
            remote,
            month(2025, 12),
        )
    }

    #[tokio::test]
    async fn post_trims_and_groups_by_day() {
        let dir = tempfile::tempdir().unwrap();
        let mut cal = calendar(&dir, None);

        cal.post("2025-12-03", "Sato", "  off  ").await.unwrap();
        cal.post("2025-12-03", "Ito", "site B").await.unwrap();
        cal.post("2025-12-01", "Kato", "site A").await.unwrap();

        let days = cal.days();
        assert_eq!(days.len(), 31);
        assert_eq!(days[0].weekday, Weekday::Mon);
        assert_eq!(days[0].entries[0].payload.name, "Kato");

        let third: Vec<_> = days[2].entries.iter().map(|r| r.payload.text.as_str()).collect();
        assert_eq!(third, vec!["off", "site B"]);
    }

    #[tokio::test]
    async fn post_to_another_month_switches_view() {
        let dir = tempfile::tempdir().unwrap();
        let mut cal = calendar(&dir, None);

        cal.post("2026-01-10", "Sato", "night").await.unwrap();
        assert_eq!(cal.month(), month(2026, 1));
        assert_eq!(cal.entries().len(), 1);

        cal.prev_month();
        assert_eq!(cal.month(), month(2025, 12));
        assert!(cal.entries().is_empty());

        cal.next_month();
        assert_eq!(cal.entries().len(), 1);
    }

    #[tokio::test]
    async fn post_rejects_bad_input_without_switching() {
        let dir = tempfile::tempdir().unwrap();
        let mut cal = calendar(&dir, None);

        for (date, name, text) in [
            ("2025-12-05", "Sato", "   "),
            ("2025-12-05", "", "off"),
            ("2026-02-30", "Sato", "off"),
            ("2026/02/01", "Sato", "off"),
        ] {
            let err = cal.post(date, name, text).await.unwrap_err();
            assert!(matches!(err, ShiftboardError::InvalidInput(_)), "{date} {name:?} {text:?}");
        }
        assert_eq!(cal.month(), month(2025, 12));
        assert!(cal.entries().is_empty());
    }

    #[tokio::test]
    async fn short_months_have_fewer_days() {
        let dir = tempfile::tempdir().unwrap();
        let mut cal = calendar(&dir, None);
        cal.show(month(2025, 2));
        assert_eq!(cal.days().len(), 28);
        cal.show(month(2024, 2));
        assert_eq!(cal.days().len(), 29);
    }

    #[tokio::test]
    async fn remote_calendar_clears_month() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::new();
        let mut cal = calendar(&dir, Some(store.clone()));
        cal.settle().await;

        cal.post("2025-12-24", "Sato", "off").await.unwrap();
        cal.post("2026-01-02", "Ito", "off").await.unwrap();
        cal.settle().await;
        cal.drain_pending();
        assert_eq!(cal.month(), month(2026, 1));
        assert_eq!(cal.entries().len(), 1);

        cal.clear_month().await.unwrap();
        cal.drain_pending();
        assert!(cal.entries().is_empty());
        assert_eq!(store.records("calendar_posts").len(), 1);
    }
}
