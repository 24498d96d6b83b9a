use serde::Serialize;

use crate::timeline::{format_date, Histogram};
use crate::TopicId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: String,
    pub count: u32,
}

/// One topic's top words and its daily document counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicTimeline {
    pub topic: TopicId,
    pub words: Vec<String>,
    pub series: Vec<DayCount>,
}

pub fn timelines<S: AsRef<str>>(top_words: &[Vec<S>], histogram: &Histogram) -> Vec<TopicTimeline> {
    histogram
        .per_topic()
        .iter()
        .enumerate()
        .map(|(topic, counts)| TopicTimeline {
            topic,
            words: top_words
                .get(topic)
                .map(|ws| ws.iter().map(|w| w.as_ref().to_string()).collect())
                .unwrap_or_default(),
            series: histogram
                .calendar()
                .iter()
                .zip(counts)
                .map(|(&day, &count)| DayCount { date: format_date(day), count })
                .collect(),
        })
        .collect()
}

/// Text report: per topic a `Topic-<id>,<words>` header, one `<date>,<count>`
/// line per calendar day, then a blank line.
pub fn render(timelines: &[TopicTimeline]) -> String {
    let mut out = String::new();
    for tl in timelines {
        out.push_str(&format!("Topic-{},{}\n", tl.topic, tl.words.join(" ")));
        for day in &tl.series {
            out.push_str(&format!("{},{}\n", day.date, day.count));
        }
        out.push('\n');
    }
    out
}
