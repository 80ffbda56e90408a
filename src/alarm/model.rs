use std::collections::HashSet;
use std::fmt;

use anyhow::{Result, bail};
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

pub const SNOOZE_MINUTES: [u32; 4] = [5, 10, 15, 30];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: String,
    pub title: String,
    #[serde(with = "hour_minute")]
    pub time: NaiveTime,
    pub days: Vec<WeekdayToken>,
    pub enabled: bool,
    pub ringtone: Ringtone,
    pub volume: u8,
    pub vibration: bool,
    pub snooze: u32,
}

impl Alarm {
    pub fn is_one_time(&self) -> bool {
        self.days.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("alarm '{}' must have a non-empty title", self.id);
        }
        if self.volume > 100 {
            bail!(
                "alarm '{}' has volume {}, expected 0-100",
                self.id,
                self.volume
            );
        }
        if !SNOOZE_MINUTES.contains(&self.snooze) {
            bail!(
                "alarm '{}' has snooze {} minutes, expected one of {:?}",
                self.id,
                self.snooze,
                SNOOZE_MINUTES
            );
        }
        let mut seen = HashSet::new();
        for day in &self.days {
            if !seen.insert(*day) {
                bail!("alarm '{}' lists {} more than once", self.id, day);
            }
        }
        Ok(())
    }
}

/// All alarm fields except the identifier; the store assigns that on
/// create and preserves it on update.
#[derive(Debug, Clone)]
pub struct AlarmDraft {
    pub title: String,
    pub time: NaiveTime,
    pub days: Vec<WeekdayToken>,
    pub enabled: bool,
    pub ringtone: Ringtone,
    pub volume: u8,
    pub vibration: bool,
    pub snooze: u32,
}

impl AlarmDraft {
    pub fn into_alarm(self, id: String) -> Alarm {
        Alarm {
            id,
            title: self.title,
            time: self.time,
            days: self.days,
            enabled: self.enabled,
            ringtone: self.ringtone,
            volume: self.volume,
            vibration: self.vibration,
            snooze: self.snooze,
        }
    }

    pub fn from_alarm(alarm: &Alarm) -> Self {
        Self {
            title: alarm.title.clone(),
            time: alarm.time,
            days: alarm.days.clone(),
            enabled: alarm.enabled,
            ringtone: alarm.ringtone,
            volume: alarm.volume,
            vibration: alarm.vibration,
            snooze: alarm.snooze,
        }
    }
}

impl Default for AlarmDraft {
    fn default() -> Self {
        Self {
            title: "New alarm".to_string(),
            time: NaiveTime::from_hms_opt(7, 0, 0).expect("07:00 is a valid time"),
            days: Vec::new(),
            enabled: true,
            ringtone: Ringtone::Default,
            volume: 80,
            vibration: true,
            snooze: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WeekdayToken {
    Sun,
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
}

impl WeekdayToken {
    pub fn to_chrono(self) -> Weekday {
        match self {
            WeekdayToken::Sun => Weekday::Sun,
            WeekdayToken::Mon => Weekday::Mon,
            WeekdayToken::Tue => Weekday::Tue,
            WeekdayToken::Wed => Weekday::Wed,
            WeekdayToken::Thu => Weekday::Thu,
            WeekdayToken::Fri => Weekday::Fri,
            WeekdayToken::Sat => Weekday::Sat,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            WeekdayToken::Sun => "Sun",
            WeekdayToken::Mon => "Mon",
            WeekdayToken::Tue => "Tue",
            WeekdayToken::Wed => "Wed",
            WeekdayToken::Thu => "Thu",
            WeekdayToken::Fri => "Fri",
            WeekdayToken::Sat => "Sat",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        let token = match input.to_ascii_lowercase().as_str() {
            "sun" => WeekdayToken::Sun,
            "mon" => WeekdayToken::Mon,
            "tue" => WeekdayToken::Tue,
            "wed" => WeekdayToken::Wed,
            "thu" => WeekdayToken::Thu,
            "fri" => WeekdayToken::Fri,
            "sat" => WeekdayToken::Sat,
            _ => return None,
        };
        Some(token)
    }
}

impl fmt::Display for WeekdayToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ringtone {
    #[default]
    Default,
    Gentle,
    Energetic,
    Classic,
}

impl Ringtone {
    pub fn sound_file(self) -> &'static str {
        match self {
            Ringtone::Default => "beep.wav",
            Ringtone::Gentle => "gentle.wav",
            Ringtone::Energetic => "energetic.wav",
            Ringtone::Classic => "classic.wav",
        }
    }
}

impl fmt::Display for Ringtone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Ringtone::Default => "default",
            Ringtone::Gentle => "gentle",
            Ringtone::Energetic => "energetic",
            Ringtone::Classic => "classic",
        };
        f.write_str(label)
    }
}

/// The alarm time persists as "HH:MM", byte-compatible with the stored
/// form the app has always used.
mod hour_minute {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let text = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&text, "%H:%M")
            .map_err(|_| D::Error::custom(format!("invalid alarm time '{text}', expected HH:MM")))
    }
}
