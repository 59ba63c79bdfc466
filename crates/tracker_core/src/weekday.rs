use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Day of the week with the host calendar numbering: Sunday=1 through Saturday=7.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    /// Canonical enumeration order, used when decoding a mask.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn code(self) -> u8 {
        match self {
            Weekday::Sunday => 1,
            Weekday::Monday => 2,
            Weekday::Tuesday => 3,
            Weekday::Wednesday => 4,
            Weekday::Thursday => 5,
            Weekday::Friday => 6,
            Weekday::Saturday => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Weekday::Sunday),
            2 => Some(Weekday::Monday),
            3 => Some(Weekday::Tuesday),
            4 => Some(Weekday::Wednesday),
            5 => Some(Weekday::Thursday),
            6 => Some(Weekday::Friday),
            7 => Some(Weekday::Saturday),
            _ => None,
        }
    }

    pub fn from_chrono(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Sun => Weekday::Sunday,
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
        }
    }

    pub fn of(date: NaiveDate) -> Self {
        Self::from_chrono(date.weekday())
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Sunday => "Sunday",
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
        }
    }

    pub fn short_name(self) -> &'static str {
        &self.name()[..3]
    }

    fn bit(self) -> u16 {
        1 << self.code()
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Subset of the week stored as a bitmask, bit `1 << code` per day.
///
/// The raw mask is the persisted form: it serializes as a plain integer so
/// existing stores stay readable if the backend is swapped out.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "u16", into = "u16")]
pub struct WeekdaySet(u16);

const VALID_BITS: u16 = 0b1111_1110;

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);
    pub const EVERY_DAY: WeekdaySet = WeekdaySet(VALID_BITS);

    pub fn encode<I>(days: I) -> u16
    where
        I: IntoIterator<Item = Weekday>,
    {
        days.into_iter().fold(0, |mask, day| mask | day.bit())
    }

    pub fn decode(value: u16) -> Vec<Weekday> {
        Weekday::ALL
            .into_iter()
            .filter(|day| value & day.bit() != 0)
            .collect()
    }

    pub fn from_days<I>(days: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        WeekdaySet(Self::encode(days))
    }

    /// Builds a set from a raw mask, dropping bits that map to no weekday.
    pub fn from_bits(value: u16) -> Self {
        WeekdaySet(value & VALID_BITS)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn days(self) -> Vec<Weekday> {
        Self::decode(self.0)
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & day.bit() != 0
    }

    pub fn is_due_on(self, date: NaiveDate) -> bool {
        self.contains(Weekday::of(date))
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= day.bit();
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !day.bit();
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Short label for schedule pickers, e.g. `"Mon, Wed"` or `"Every day"`.
    pub fn summary(self) -> String {
        if self == Self::EVERY_DAY {
            return "Every day".to_string();
        }
        self.days()
            .into_iter()
            .map(Weekday::short_name)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl From<u16> for WeekdaySet {
    fn from(value: u16) -> Self {
        WeekdaySet::from_bits(value)
    }
}

impl From<WeekdaySet> for u16 {
    fn from(set: WeekdaySet) -> Self {
        set.0
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        WeekdaySet::from_days(iter)
    }
}
