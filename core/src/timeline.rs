use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::{Mismatch, Result};
use crate::TopicId;

/// Per-topic document counts over a contiguous daily calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    calendar: Vec<Date>,
    /// topic x calendar slot
    counts: Vec<Vec<u32>>,
}

impl Histogram {
    pub fn calendar(&self) -> &[Date] { &self.calendar }

    pub fn n_topics(&self) -> usize { self.counts.len() }

    pub fn counts(&self, topic: TopicId) -> Option<&[u32]> {
        self.counts.get(topic).map(Vec::as_slice)
    }

    pub fn per_topic(&self) -> &[Vec<u32>] { &self.counts }

    /// Documents dated on each calendar day, over all topics.
    pub fn day_totals(&self) -> Vec<u32> {
        (0..self.calendar.len())
            .map(|slot| self.counts.iter().map(|row| row[slot]).sum())
            .collect()
    }
}

/// UTC calendar date of an epoch-second timestamp. `index` is the line the
/// value came from and is only used for error context.
pub fn date_from_epoch(index: usize, value: &str) -> Result<Date> {
    let bad = || Mismatch::Timestamp { index, value: value.to_string() };
    let secs: i64 = value.trim().parse().map_err(|_| bad())?;
    let dt = OffsetDateTime::from_unix_timestamp(secs).map_err(|_| bad())?;
    Ok(dt.date())
}

pub fn dates_from_epochs<S: AsRef<str>>(values: &[S]) -> Result<Vec<Date>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| date_from_epoch(i, v.as_ref()))
        .collect()
}

/// Every day from the earliest to the latest date, inclusive. Empty input
/// gives an empty calendar.
pub fn calendar(dates: &[Date]) -> Vec<Date> {
    let (Some(&first), Some(&last)) = (dates.iter().min(), dates.iter().max()) else {
        return Vec::new();
    };
    let mut days = Vec::with_capacity((last - first).whole_days() as usize + 1);
    let mut day = first;
    loop {
        days.push(day);
        match day.next_day() {
            Some(next) if next <= last => day = next,
            _ => break,
        }
    }
    days
}

/// Count documents per topic per calendar day. `assignments[i]` is the topic
/// of the document dated `dates[i]`.
pub fn histogram(assignments: &[TopicId], dates: &[Date], n_topics: usize) -> Result<Histogram> {
    if assignments.len() != dates.len() {
        return Err(Mismatch::Length { assignments: assignments.len(), dates: dates.len() }.into());
    }
    let calendar = calendar(dates);
    let mut counts = vec![vec![0u32; calendar.len()]; n_topics];
    for (index, (&topic, &date)) in assignments.iter().zip(dates).enumerate() {
        if topic >= n_topics {
            return Err(Mismatch::TopicOutOfRange { index, topic, n_topics }.into());
        }
        let slot = calendar
            .binary_search(&date)
            .map_err(|_| Mismatch::OutsideCalendar { index, date })?;
        counts[topic][slot] += 1;
    }
    Ok(Histogram { calendar, counts })
}

/// `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}
