use chrono::{DateTime, Local};
use time_humanize::{Accuracy, HumanTime, Tense};

pub fn mean(data: &[f64]) -> Option<f64> {
    let sum = data.iter().sum::<f64>();
    let count = data.len();

    match count {
        positive if positive > 0 => Some(sum / count as f64),
        _ => None,
    }
}

/// "3 days ago" style rendering of how long ago `then` was
pub fn humanize_since(then: DateTime<Local>, now: DateTime<Local>) -> String {
    let elapsed = (now - then).to_std().unwrap_or_default();
    if elapsed.as_secs() < 60 {
        return "just now".to_string();
    }
    HumanTime::from(elapsed).to_text_en(Accuracy::Rough, Tense::Past)
}

/// Share of `part` in `whole` as a rounded percentage
pub fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        ((part as f64 / whole as f64) * 100.0).round()
    }
}
