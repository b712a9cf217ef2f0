use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionTally {
    pub option: String,
    pub count: u32,
    /// Share of all selections cast in the poll, one decimal.
    pub percentage: f64,
}

/// Per-option counts for one poll.
///
/// Entries keep the poll's option order. Repeated labels collapse into the first occurrence,
/// and choices that match no option are ignored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub entries: Vec<OptionTally>,
    pub total_selections: u32,
    pub total_ballots: u32,
}

impl Tally {
    pub fn compute<I, B>(options: &[String], ballots: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: AsRef<[String]>,
    {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(options.len());
        let mut counts: Vec<(&str, u32)> = Vec::with_capacity(options.len());
        for option in options {
            let label = option.as_str();
            if !index.contains_key(label) {
                index.insert(label, counts.len());
                counts.push((label, 0));
            }
        }

        let mut total_selections = 0;
        let mut total_ballots = 0;
        for ballot in ballots {
            total_ballots += 1;
            for choice in ballot.as_ref() {
                if let Some(&slot) = index.get(choice.as_str()) {
                    counts[slot].1 += 1;
                    total_selections += 1;
                }
            }
        }

        let entries = counts
            .into_iter()
            .map(|(option, count)| OptionTally {
                option: option.to_string(),
                count,
                percentage: percentage(count, total_selections),
            })
            .collect();

        Self {
            entries,
            total_selections,
            total_ballots,
        }
    }

    pub fn count(&self, option: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|entry| entry.option == option)
            .map(|entry| entry.count)
    }

    /// Display order: descending count. Ties keep the poll's option order.
    pub fn ranked(&self) -> Vec<OptionTally> {
        let mut ranked = self.entries.clone();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }
}

fn percentage(count: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (f64::from(count) * 1000.0 / f64::from(total)).round() / 10.0
}
