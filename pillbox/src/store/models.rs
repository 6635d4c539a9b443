//! Store models
//!
//! Rust structs representing the stored entities.
//! All models use serde so they can be handed to a presentation layer
//! and written to snapshots unchanged.

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of a stored medicine, assigned by the store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MedicineId(Uuid);

impl MedicineId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MedicineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for MedicineId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of a stored alarm, assigned by the store on insert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlarmId(Uuid);

impl AlarmId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for AlarmId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Category stored on a medicine record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MedicineCategory {
    Medicine,
    Supplement,
    ExternalUse,
}

impl MedicineCategory {
    pub const ALL: [MedicineCategory; 3] = [
        MedicineCategory::Medicine,
        MedicineCategory::Supplement,
        MedicineCategory::ExternalUse,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            MedicineCategory::Medicine => "Medicine",
            MedicineCategory::Supplement => "Supplement",
            MedicineCategory::ExternalUse => "External use",
        }
    }
}

impl fmt::Display for MedicineCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for MedicineCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "medicine" => Ok(MedicineCategory::Medicine),
            "supplement" => Ok(MedicineCategory::Supplement),
            "external_use" => Ok(MedicineCategory::ExternalUse),
            other => Err(format!("Unknown medicine category: {}", other)),
        }
    }
}

/// Category filter for list queries.
///
/// `All` only exists here; it can never be stored on a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(MedicineCategory),
}

impl CategoryFilter {
    pub fn matches(self, category: MedicineCategory) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(wanted) => wanted == category,
        }
    }
}

impl From<MedicineCategory> for CategoryFilter {
    fn from(category: MedicineCategory) -> Self {
        CategoryFilter::Only(category)
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(CategoryFilter::All);
        }
        s.parse().map(CategoryFilter::Only)
    }
}

/// A medicine or supplement in the user's list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medicine {
    pub id: MedicineId,
    pub name: String,
    pub category: MedicineCategory,
    pub manufacturer: String,
    pub main_ingredient: String,
    pub description: String,
    /// Photo reference, e.g. `photo://<sha256>`
    pub image_uri: Option<String>,
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

/// Create medicine request
#[derive(Debug, Clone, Deserialize)]
pub struct NewMedicine {
    pub name: String,
    pub category: MedicineCategory,
    pub manufacturer: String,
    pub main_ingredient: String,
    pub description: String,
    #[serde(default)]
    pub image_uri: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl NewMedicine {
    pub fn new(name: impl Into<String>, category: MedicineCategory) -> Self {
        Self {
            name: name.into(),
            category,
            manufacturer: String::new(),
            main_ingredient: String::new(),
            description: String::new(),
            image_uri: None,
            active: true,
        }
    }
}

/// Day of week an alarm repeats on, ISO-8601 order (Monday first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

/// Numeric weekday encodings found in older data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayEncoding {
    /// 1 = Monday .. 7 = Sunday
    IsoMondayFirst,
    /// 0 = Sunday .. 6 = Saturday
    SundayZero,
}

impl AlarmDay {
    pub const ALL: [AlarmDay; 7] = [
        AlarmDay::Monday,
        AlarmDay::Tuesday,
        AlarmDay::Wednesday,
        AlarmDay::Thursday,
        AlarmDay::Friday,
        AlarmDay::Saturday,
        AlarmDay::Sunday,
    ];

    /// ISO-8601 weekday number, 1 (Monday) to 7 (Sunday)
    pub fn iso_number(self) -> u8 {
        match self {
            AlarmDay::Monday => 1,
            AlarmDay::Tuesday => 2,
            AlarmDay::Wednesday => 3,
            AlarmDay::Thursday => 4,
            AlarmDay::Friday => 5,
            AlarmDay::Saturday => 6,
            AlarmDay::Sunday => 7,
        }
    }

    pub fn from_iso_number(n: u8) -> Option<Self> {
        match n {
            1..=7 => Some(Self::ALL[usize::from(n - 1)]),
            _ => None,
        }
    }

    pub fn from_sunday_zero(n: u8) -> Option<Self> {
        match n {
            0 => Some(AlarmDay::Sunday),
            1..=6 => Self::from_iso_number(n),
            _ => None,
        }
    }

    /// Decode a legacy numeric day list. Any out-of-range value rejects the whole list.
    pub fn decode(encoding: DayEncoding, numbers: &[u8]) -> Option<BTreeSet<AlarmDay>> {
        numbers
            .iter()
            .map(|&n| match encoding {
                DayEncoding::IsoMondayFirst => Self::from_iso_number(n),
                DayEncoding::SundayZero => Self::from_sunday_zero(n),
            })
            .collect()
    }

    pub fn short_name(self) -> &'static str {
        match self {
            AlarmDay::Monday => "Mon",
            AlarmDay::Tuesday => "Tue",
            AlarmDay::Wednesday => "Wed",
            AlarmDay::Thursday => "Thu",
            AlarmDay::Friday => "Fri",
            AlarmDay::Saturday => "Sat",
            AlarmDay::Sunday => "Sun",
        }
    }

    pub fn weekdays() -> BTreeSet<AlarmDay> {
        Self::ALL[..5].iter().copied().collect()
    }

    pub fn every_day() -> BTreeSet<AlarmDay> {
        Self::ALL.iter().copied().collect()
    }
}

impl From<Weekday> for AlarmDay {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Mon => AlarmDay::Monday,
            Weekday::Tue => AlarmDay::Tuesday,
            Weekday::Wed => AlarmDay::Wednesday,
            Weekday::Thu => AlarmDay::Thursday,
            Weekday::Fri => AlarmDay::Friday,
            Weekday::Sat => AlarmDay::Saturday,
            Weekday::Sun => AlarmDay::Sunday,
        }
    }
}

/// Human-readable summary of a day set ("Every day", "Weekdays", "Mon, Wed")
pub fn describe_days(days: &BTreeSet<AlarmDay>) -> String {
    if days.len() == 7 {
        return "Every day".to_string();
    }
    if *days == AlarmDay::weekdays() {
        return "Weekdays".to_string();
    }
    if days.len() == 2 && days.contains(&AlarmDay::Saturday) && days.contains(&AlarmDay::Sunday) {
        return "Weekends".to_string();
    }
    if days.is_empty() {
        return "Never".to_string();
    }
    days.iter()
        .map(|d| d.short_name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a 24-hour `HH:mm` string. Exactly two digits on each side.
pub fn parse_time_of_day(time: &str) -> Option<NaiveTime> {
    let (hour, minute) = time.split_once(':')?;
    let two_digits = |s: &str| s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit());
    if !two_digits(hour) || !two_digits(minute) {
        return None;
    }
    NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)
}

/// Recurring dosage alarm for a medicine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alarm {
    pub id: AlarmId,
    pub medicine_id: MedicineId,
    /// Copy of the medicine name taken when the alarm was created.
    /// Not refreshed when the medicine is renamed.
    pub medicine_name: String,
    /// 24-hour `HH:mm`
    pub time: String,
    pub days: BTreeSet<AlarmDay>,
    pub sound_enabled: bool,
    pub vibration_enabled: bool,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

/// Create alarm request
#[derive(Debug, Clone, Deserialize)]
pub struct NewAlarm {
    pub medicine_id: MedicineId,
    pub medicine_name: String,
    pub time: String,
    pub days: BTreeSet<AlarmDay>,
    #[serde(default = "default_true")]
    pub sound_enabled: bool,
    #[serde(default = "default_true")]
    pub vibration_enabled: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Alarm {
    /// Parsed alarm time, `None` if the stored string is not a valid `HH:mm`
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        parse_time_of_day(&self.time)
    }

    /// Whether the alarm should ring during the minute containing `now`
    pub fn fires_at(&self, now: NaiveDateTime) -> bool {
        if !self.enabled || !self.days.contains(&AlarmDay::from(now.weekday())) {
            return false;
        }
        match self.time_of_day() {
            Some(t) => t.hour() == now.hour() && t.minute() == now.minute(),
            None => false,
        }
    }

    /// Next moment strictly after `now` at which the alarm rings
    pub fn next_trigger_after(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if !self.enabled || self.days.is_empty() {
            return None;
        }
        let time = self.time_of_day()?;

        // a full week plus today covers every day set
        (0..=7).find_map(|offset| {
            let date = now.date() + Duration::days(offset);
            let candidate = date.and_time(time);
            (candidate > now && self.days.contains(&AlarmDay::from(date.weekday())))
                .then_some(candidate)
        })
    }

    pub fn days_label(&self) -> String {
        describe_days(&self.days)
    }
}
