use anyhow::{Result, bail};
use chrono::{DateTime, Local};

use crate::alarm::model::{Alarm, AlarmDraft};
use crate::storage::KeyValueStore;

pub const ALARMS_KEY: &str = "alarms";

/// Canonical alarm list, mirrored to storage on every mutation. A
/// missing or unreadable stored list degrades to empty.
pub struct AlarmStore {
    storage: KeyValueStore,
    alarms: Vec<Alarm>,
}

impl AlarmStore {
    pub fn load(storage: KeyValueStore) -> Self {
        let alarms = storage.get::<Vec<Alarm>>(ALARMS_KEY).unwrap_or_default();
        Self { storage, alarms }
    }

    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    pub fn get(&self, id: &str) -> Option<&Alarm> {
        self.alarms.iter().find(|alarm| alarm.id == id)
    }

    pub fn create(&mut self, draft: AlarmDraft, now: DateTime<Local>) -> Result<Alarm> {
        let alarm = draft.into_alarm(self.fresh_id(now));
        alarm.validate()?;
        self.alarms.push(alarm.clone());
        self.persist()?;
        Ok(alarm)
    }

    /// Replaces every field except the identifier, keeping the alarm's
    /// position in the list.
    pub fn update(&mut self, id: &str, draft: AlarmDraft) -> Result<Alarm> {
        let alarm = draft.into_alarm(id.to_string());
        alarm.validate()?;
        let Some(slot) = self.alarms.iter_mut().find(|existing| existing.id == id) else {
            bail!("no alarm with id '{id}'");
        };
        *slot = alarm.clone();
        self.persist()?;
        Ok(alarm)
    }

    pub fn remove(&mut self, id: &str) -> Result<Alarm> {
        let Some(index) = self.alarms.iter().position(|alarm| alarm.id == id) else {
            bail!("no alarm with id '{id}'");
        };
        let removed = self.alarms.remove(index);
        self.persist()?;
        Ok(removed)
    }

    pub fn toggle(&mut self, id: &str) -> Result<Alarm> {
        let Some(alarm) = self.alarms.iter_mut().find(|alarm| alarm.id == id) else {
            bail!("no alarm with id '{id}'");
        };
        alarm.enabled = !alarm.enabled;
        let toggled = alarm.clone();
        self.persist()?;
        Ok(toggled)
    }

    // Creation-timestamp identifiers, bumped until unique so two alarms
    // created within the same millisecond stay distinct.
    fn fresh_id(&self, now: DateTime<Local>) -> String {
        let mut millis = now.timestamp_millis();
        while self.alarms.iter().any(|alarm| alarm.id == millis.to_string()) {
            millis += 1;
        }
        millis.to_string()
    }

    fn persist(&self) -> Result<()> {
        self.storage.set(ALARMS_KEY, &self.alarms)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use tempfile::tempdir;

    use super::*;
    use crate::alarm::model::WeekdayToken;

    fn draft(title: &str) -> AlarmDraft {
        AlarmDraft {
            title: title.to_string(),
            time: NaiveTime::from_hms_opt(7, 0, 0).expect("valid time"),
            days: vec![WeekdayToken::Mon],
            ..AlarmDraft::default()
        }
    }

    fn store(dir: &tempfile::TempDir) -> AlarmStore {
        AlarmStore::load(KeyValueStore::open(dir.path()).expect("open"))
    }

    #[test]
    fn create_assigns_unique_identifiers() {
        let dir = tempdir().expect("tempdir");
        let mut store = store(&dir);
        let now = Local::now();
        let first = store.create(draft("First"), now).expect("create");
        let second = store.create(draft("Second"), now).expect("create");
        assert_ne!(first.id, second.id);
        assert_eq!(store.alarms().len(), 2);
    }

    #[test]
    fn mutations_survive_a_reload() {
        let dir = tempdir().expect("tempdir");
        let mut store = store(&dir);
        let created = store.create(draft("Wake"), Local::now()).expect("create");
        store.toggle(&created.id).expect("toggle");

        let reloaded = AlarmStore::load(KeyValueStore::open(dir.path()).expect("open"));
        assert_eq!(reloaded.alarms().len(), 1);
        assert!(!reloaded.alarms()[0].enabled);
        assert_eq!(reloaded.alarms()[0].title, "Wake");
    }

    #[test]
    fn update_preserves_identifier_and_position() {
        let dir = tempdir().expect("tempdir");
        let mut store = store(&dir);
        let now = Local::now();
        let first = store.create(draft("First"), now).expect("create");
        let second = store.create(draft("Second"), now).expect("create");

        let mut replacement = draft("First, renamed");
        replacement.volume = 30;
        let updated = store.update(&first.id, replacement).expect("update");

        assert_eq!(updated.id, first.id);
        assert_eq!(store.alarms()[0].id, first.id);
        assert_eq!(store.alarms()[0].title, "First, renamed");
        assert_eq!(store.alarms()[0].volume, 30);
        assert_eq!(store.alarms()[1].id, second.id);
    }

    #[test]
    fn update_rejects_unknown_identifier() {
        let dir = tempdir().expect("tempdir");
        let mut store = store(&dir);
        let err = store.update("missing", draft("x")).expect_err("unknown id");
        assert!(err.to_string().contains("no alarm with id"));
    }

    #[test]
    fn remove_drops_only_the_named_alarm() {
        let dir = tempdir().expect("tempdir");
        let mut store = store(&dir);
        let now = Local::now();
        let first = store.create(draft("First"), now).expect("create");
        let second = store.create(draft("Second"), now).expect("create");

        let removed = store.remove(&first.id).expect("remove");
        assert_eq!(removed.id, first.id);
        assert_eq!(store.alarms().len(), 1);
        assert_eq!(store.alarms()[0].id, second.id);
    }

    #[test]
    fn toggle_flips_enabled_in_place() {
        let dir = tempdir().expect("tempdir");
        let mut store = store(&dir);
        let created = store.create(draft("Wake"), Local::now()).expect("create");
        assert!(created.enabled);
        assert!(!store.toggle(&created.id).expect("toggle off").enabled);
        assert!(store.toggle(&created.id).expect("toggle on").enabled);
    }

    #[test]
    fn invalid_draft_is_rejected_before_persisting() {
        let dir = tempdir().expect("tempdir");
        let mut store = store(&dir);
        let mut bad = draft("Loud");
        bad.volume = 150;
        assert!(store.create(bad, Local::now()).is_err());
        assert!(store.alarms().is_empty());
    }
}
