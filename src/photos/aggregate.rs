use crate::photos::cache::{PageCache, PageKind};
use crate::photos::record::{Record, YearMonth};
use anyhow::Result;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Metric {
    RecordCount,
    KeywordCount,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub month: YearMonth,
    pub owner: String,
    pub metric: Metric,
}

/// Keyword counts remembering the order keywords were first seen, which
/// breaks ties in the descending report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordFrequency {
    order: Vec<String>,
    counts: HashMap<String, u64>,
}

impl KeywordFrequency {
    pub fn add(&mut self, keyword: &str) {
        match self.counts.get_mut(keyword) {
            Some(count) => *count += 1,
            None => {
                self.order.push(keyword.to_string());
                self.counts.insert(keyword.to_string(), 1);
            }
        }
    }

    pub fn count(&self, keyword: &str) -> u64 {
        self.counts.get(keyword).copied().unwrap_or(0)
    }

    pub fn unique(&self) -> usize {
        self.order.len()
    }

    /// Descending by count; equal counts keep first-seen order.
    pub fn most_common(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut ranked: Vec<(&str, u64)> = self
            .order
            .iter()
            .map(|k| (k.as_str(), self.count(k)))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);
        ranked
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnerTotals {
    pub owner: String,
    pub records: u64,
    pub keywords: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub owners: Vec<String>,
    pub months: Vec<YearMonth>,
    pub keywords: KeywordFrequency,
    pub buckets: BTreeMap<BucketKey, u64>,
    pub totals: Vec<OwnerTotals>,
}

impl Aggregate {
    /// Every `(month, owner, metric)` cell in range starts at zero so the
    /// grid stays dense.
    pub fn new(owners: &[String], start: YearMonth, end: YearMonth) -> Self {
        let mut unique_owners: Vec<String> = Vec::new();
        for owner in owners {
            if !unique_owners.contains(owner) {
                unique_owners.push(owner.clone());
            }
        }
        let months = YearMonth::range_inclusive(start, end);
        let mut buckets = BTreeMap::new();
        for month in &months {
            for owner in &unique_owners {
                for metric in [Metric::RecordCount, Metric::KeywordCount] {
                    buckets.insert(
                        BucketKey {
                            month: *month,
                            owner: owner.clone(),
                            metric,
                        },
                        0,
                    );
                }
            }
        }
        let totals = unique_owners
            .iter()
            .map(|owner| OwnerTotals {
                owner: owner.clone(),
                ..OwnerTotals::default()
            })
            .collect();
        Self {
            owners: unique_owners,
            months,
            keywords: KeywordFrequency::default(),
            buckets,
            totals,
        }
    }

    pub fn bucket(&self, month: YearMonth, owner: &str, metric: Metric) -> Option<u64> {
        self.buckets
            .get(&BucketKey {
                month,
                owner: owner.to_string(),
                metric,
            })
            .copied()
    }

    fn bump(&mut self, month: YearMonth, owner: &str, metric: Metric) {
        let key = BucketKey {
            month,
            owner: owner.to_string(),
            metric,
        };
        // Absent key means the month is out of range.
        if let Some(cell) = self.buckets.get_mut(&key) {
            *cell += 1;
        }
    }

    /// Fold one record into the tables on behalf of `owner`.
    pub fn add_record(&mut self, owner: &str, record: &Record) {
        let Some(slot) = self.totals.iter().position(|t| t.owner == owner) else {
            return;
        };
        let month = record.taken_at.year_month();
        self.totals[slot].records += 1;
        self.bump(month, owner, Metric::RecordCount);

        // Every keyword except the owner's marker.
        for keyword in record.user_keywords() {
            self.totals[slot].keywords += 1;
            self.keywords.add(keyword);
            self.bump(month, owner, Metric::KeywordCount);
        }
    }
}

/// Build the tables from every cached `tags` page of `owners`. A page that
/// cannot be parsed aborts the run.
pub fn aggregate(
    cache: &PageCache,
    owners: &[String],
    start: YearMonth,
    end: YearMonth,
) -> Result<Aggregate> {
    let mut agg = Aggregate::new(owners, start, end);
    let owners = agg.owners.clone();
    for owner in &owners {
        for (_, path) in cache.pages(owner, PageKind::Tags)? {
            for record in cache.read_records(&path)? {
                agg.add_record(owner, &record);
            }
        }
    }
    Ok(agg)
}

pub fn owner_summary_lines(agg: &Aggregate) -> Vec<String> {
    agg.totals
        .iter()
        .map(|t| {
            format!(
                "{} = {} records, {} keywords total",
                t.owner, t.records, t.keywords
            )
        })
        .collect()
}

pub fn keyword_report_lines(agg: &Aggregate, top: usize) -> Vec<String> {
    let mut out = vec![format!(
        "Total unique keywords across {}: {}",
        agg.owners.join("/"),
        agg.keywords.unique()
    )];
    out.extend(
        agg.keywords
            .most_common(top)
            .into_iter()
            .map(|(keyword, count)| format!("{keyword} {count}")),
    );
    out
}

pub fn csv_lines(agg: &Aggregate) -> Vec<String> {
    let mut header = vec!["yearmonth".to_string()];
    for owner in &agg.owners {
        header.push(format!("{owner}-records"));
        header.push(format!("{owner}-keywords"));
    }
    let mut out = vec![header.join(",")];
    for month in &agg.months {
        let mut row = vec![month.to_string()];
        for owner in &agg.owners {
            for metric in [Metric::RecordCount, Metric::KeywordCount] {
                let value = agg.bucket(*month, owner, metric).unwrap_or(0);
                row.push(value.to_string());
            }
        }
        out.push(row.join(","));
    }
    out
}
