//! Worker activity profiling.
//!
//! Reconstructs, from the `worker` table's birth/death timestamps alone, how
//! many workers each analysis had running over time: the range is cut into
//! granularity buckets and every worker contributes its overlap with each
//! bucket, so a bucket value is the mean number of concurrent workers during
//! that bucket. Long runs of buckets with no activity at all are collapsed to
//! a short head and tail.

pub mod render;

use std::cmp::Ordering;
use std::io;
use std::str::FromStr;

use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::DatabaseConnection;

use crate::data::{AnalysisRepository, WorkerRepository};
use crate::error::{Error, ProfileError};

/// Kept at each end of a collapsed idle run.
const SKIP_EDGE_BUCKETS: usize = 2;

/// Counts below this are "no activity".
const IDLE_EPSILON: f64 = 1e-9;

/// Parameters of one profiling run.
pub struct ProfileOptions {
    /// Start of the profiled range; defaults to the first worker birth.
    pub start: Option<NaiveDateTime>,
    /// End of the profiled range; defaults to the last worker death.
    pub end: Option<NaiveDateTime>,
    /// Bucket width in minutes.
    pub granularity_minutes: u32,
    /// Idle runs longer than this many minutes are collapsed.
    pub skip_no_activity_minutes: u32,
}

impl Default for ProfileOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            granularity_minutes: 5,
            skip_no_activity_minutes: 120,
        }
    }
}

/// How many analyses to keep when rendering: a fixed count, or the smallest
/// prefix of the ranking covering a fraction of the total worker time.
#[derive(Clone, Debug, PartialEq)]
pub enum TopSelection {
    /// Keep exactly this many analyses.
    Count(usize),
    /// Keep the smallest prefix whose cumulative share reaches
    /// `0.995 × fraction`.
    Fraction(f64),
}

impl FromStr for TopSelection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Ok(count) = value.parse::<usize>() {
            if count > 0 {
                return Ok(Self::Count(count));
            }
        } else if let Ok(fraction) = value.parse::<f64>() {
            if fraction > 0.0 && fraction < 1.0 {
                return Ok(Self::Fraction(fraction));
            }
        }

        Err(format!(
            "expected a positive integer or a fraction below 1, got '{value}'"
        ))
    }
}

/// The activity of one analysis across the profiled buckets.
pub struct AnalysisSeries {
    /// Analysis these counts belong to.
    pub analysis_id: i32,
    /// Its logic name, used for ranking ties and output labels.
    pub logic_name: String,
    /// Total worker-seconds over the whole range; the ranking key.
    pub total_worker_seconds: f64,
    /// Mean concurrent workers per kept bucket.
    pub counts: Vec<f64>,
}

/// A reconstructed activity profile: per-analysis worker counts over a
/// compressed sequence of time buckets, ranked by total worker time.
pub struct ActivityProfile {
    /// Bucket width in minutes.
    pub granularity_minutes: u32,
    /// Start times of the kept buckets (idle gaps collapsed).
    pub bucket_starts: Vec<NaiveDateTime>,
    /// Per-analysis series, total worker time descending.
    pub series: Vec<AnalysisSeries>,
}

/// Labels and cumulative-ready per-bucket counts for stacked rendering.
pub struct StackedLayers {
    /// Layer labels, bottom of the stack first; may end with "OTHER".
    pub labels: Vec<String>,
    /// Per-layer bucket counts, parallel to `labels`.
    pub layers: Vec<Vec<f64>>,
}

impl ActivityProfile {
    /// Loads worker lifespans and rebuilds the activity profile.
    ///
    /// # Returns
    /// - `Ok(ActivityProfile)` - Ranked, gap-compressed per-analysis series
    /// - `Err(Error)` - Query failure, empty hive without an explicit range,
    ///   or an inverted range
    pub async fn load(
        db: &DatabaseConnection,
        options: &ProfileOptions,
    ) -> Result<Self, Error> {
        let lifespans = WorkerRepository::new(db).fetch_lifespans().await?;

        let logic_names: std::collections::HashMap<i32, String> = AnalysisRepository::new(db)
            .fetch_all()
            .await?
            .into_iter()
            .map(|analysis| (analysis.analysis_id, analysis.logic_name))
            .collect();

        let start = options
            .start
            .or_else(|| lifespans.iter().map(|(_, born, _)| *born).min());
        let end = options
            .end
            .or_else(|| lifespans.iter().filter_map(|(_, _, died)| *died).max())
            .or_else(|| {
                // Only living workers: the range runs up to now.
                (!lifespans.is_empty()).then(|| Utc::now().naive_utc())
            });

        let (Some(start), Some(end)) = (start, end) else {
            return Err(ProfileError::NoActivity.into());
        };
        if end <= start {
            return Err(ProfileError::InvalidRange { start, end }.into());
        }

        let bucket_secs = i64::from(options.granularity_minutes.max(1)) * 60;
        let span_secs = (end - start).num_seconds();
        let n_buckets = ((span_secs + bucket_secs - 1) / bucket_secs).max(1) as usize;

        let mut by_analysis: std::collections::BTreeMap<
            i32,
            Vec<(NaiveDateTime, Option<NaiveDateTime>)>,
        > = std::collections::BTreeMap::new();
        for (analysis_id, born, died) in lifespans {
            by_analysis.entry(analysis_id).or_default().push((born, died));
        }

        let mut series: Vec<AnalysisSeries> = by_analysis
            .into_iter()
            .map(|(analysis_id, intervals)| {
                let counts = bucket_mean_workers(
                    &intervals,
                    start,
                    n_buckets,
                    options.granularity_minutes.max(1),
                );
                let total_worker_seconds =
                    counts.iter().sum::<f64>() * bucket_secs as f64;
                let logic_name = logic_names
                    .get(&analysis_id)
                    .cloned()
                    .unwrap_or_else(|| format!("analysis_{analysis_id}"));

                AnalysisSeries {
                    analysis_id,
                    logic_name,
                    total_worker_seconds,
                    counts,
                }
            })
            .collect();

        series.sort_by(|a, b| {
            b.total_worker_seconds
                .partial_cmp(&a.total_worker_seconds)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    a.logic_name
                        .to_lowercase()
                        .cmp(&b.logic_name.to_lowercase())
                })
        });

        let bucket_starts: Vec<NaiveDateTime> = (0..n_buckets)
            .map(|i| start + Duration::seconds(i as i64 * bucket_secs))
            .collect();

        let idle: Vec<bool> = (0..n_buckets)
            .map(|i| series.iter().all(|s| s.counts[i] < IDLE_EPSILON))
            .collect();
        let threshold = (options.skip_no_activity_minutes / options.granularity_minutes.max(1))
            .max(1) as usize;
        let kept = kept_bucket_indices(&idle, threshold, SKIP_EDGE_BUCKETS);

        let bucket_starts = kept.iter().map(|&i| bucket_starts[i]).collect();
        for s in &mut series {
            s.counts = kept.iter().map(|&i| s.counts[i]).collect();
        }

        Ok(Self {
            granularity_minutes: options.granularity_minutes.max(1),
            bucket_starts,
            series,
        })
    }

    /// Writes the profile as a tab-separated table, one column per analysis
    /// in ranking order.
    pub fn write_tsv<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "when")?;
        for s in &self.series {
            write!(writer, "\t{}", s.logic_name)?;
        }
        writeln!(writer)?;

        for (i, when) in self.bucket_starts.iter().enumerate() {
            write!(writer, "{}", when.format("%Y-%m-%d %H:%M:%S"))?;
            for s in &self.series {
                write!(writer, "\t{:.2}", s.counts[i])?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Splits the ranking into the layers of a stacked chart: the selected
    /// top analyses in order, plus one aggregated "OTHER" layer when
    /// anything was cut off.
    pub fn stacked_layers(&self, top: Option<&TopSelection>) -> StackedLayers {
        let totals: Vec<f64> = self.series.iter().map(|s| s.total_worker_seconds).collect();
        let n_selected = top
            .map(|t| top_count(&totals, t))
            .unwrap_or(self.series.len());

        let mut labels = Vec::new();
        let mut layers = Vec::new();

        for s in self.series.iter().take(n_selected) {
            labels.push(s.logic_name.clone());
            layers.push(s.counts.clone());
        }

        if n_selected < self.series.len() {
            let mut other = vec![0f64; self.bucket_starts.len()];
            for s in self.series.iter().skip(n_selected) {
                for (slot, count) in other.iter_mut().zip(&s.counts) {
                    *slot += count;
                }
            }
            labels.push("OTHER".to_string());
            layers.push(other);
        }

        StackedLayers { labels, layers }
    }

    /// Which kept buckets carry no activity at all; these get the NOTHING
    /// marker on a rendered chart.
    pub fn idle_buckets(&self) -> Vec<bool> {
        (0..self.bucket_starts.len())
            .map(|i| self.series.iter().all(|s| s.counts[i] < IDLE_EPSILON))
            .collect()
    }
}

/// Mean concurrent workers per bucket for one analysis.
///
/// Each worker contributes `max(0, min(died, bucket_end) − max(born,
/// bucket_start))` seconds to every bucket it overlaps, divided by the bucket
/// width. A missing death means the worker lived through the end of the
/// range.
fn bucket_mean_workers(
    intervals: &[(NaiveDateTime, Option<NaiveDateTime>)],
    start: NaiveDateTime,
    n_buckets: usize,
    granularity_minutes: u32,
) -> Vec<f64> {
    let bucket_secs = i64::from(granularity_minutes) * 60;
    let range_end = start + Duration::seconds(bucket_secs * n_buckets as i64);
    let mut counts = vec![0f64; n_buckets];

    for (born, died) in intervals {
        let died = died.unwrap_or(range_end);
        if died <= start || *born >= range_end {
            continue;
        }

        let first = ((*born - start).num_seconds().max(0) / bucket_secs) as usize;
        let last_second = ((died - start).num_seconds() - 1)
            .min(bucket_secs * n_buckets as i64 - 1);
        let last = (last_second / bucket_secs) as usize;

        for (i, count) in counts.iter_mut().enumerate().take(last + 1).skip(first) {
            let bucket_start = start + Duration::seconds(i as i64 * bucket_secs);
            let bucket_end = bucket_start + Duration::seconds(bucket_secs);
            let overlap = (died.min(bucket_end) - (*born).max(bucket_start)).num_seconds();
            if overlap > 0 {
                *count += overlap as f64 / bucket_secs as f64;
            }
        }
    }

    counts
}

/// Indices of the buckets to keep after collapsing idle gaps: runs of idle
/// buckets no longer than `threshold` survive whole, longer runs keep only
/// `edge` buckets at each end.
fn kept_bucket_indices(idle: &[bool], threshold: usize, edge: usize) -> Vec<usize> {
    let mut kept = Vec::with_capacity(idle.len());
    let mut i = 0;

    while i < idle.len() {
        if !idle[i] {
            kept.push(i);
            i += 1;
            continue;
        }

        let run_start = i;
        while i < idle.len() && idle[i] {
            i += 1;
        }
        let run_len = i - run_start;

        if run_len <= threshold {
            kept.extend(run_start..i);
        } else {
            kept.extend(run_start..run_start + edge.min(run_len));
            kept.extend((i - edge.min(run_len)).max(run_start + edge)..i);
        }
    }

    kept
}

/// How many leading analyses a top selection keeps, given totals sorted
/// descending.
fn top_count(totals: &[f64], top: &TopSelection) -> usize {
    match top {
        TopSelection::Count(count) => (*count).min(totals.len()),
        TopSelection::Fraction(fraction) => {
            let grand_total: f64 = totals.iter().sum();
            if grand_total <= 0.0 {
                return totals.len();
            }

            let target = 0.995 * fraction * grand_total;
            let mut cumulative = 0.0;
            for (i, total) in totals.iter().enumerate() {
                cumulative += total;
                if cumulative >= target {
                    return i + 1;
                }
            }
            totals.len()
        }
    }
}
