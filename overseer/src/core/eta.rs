//! Remaining-time estimate from historical execution metrics.

use chrono::{DateTime, Duration, Utc};

use crate::core::evidence::MetricRecord;
use crate::core::types::{Confidence, Eta, PullRequest, SubIssue};

/// Inputs that shape the estimate besides the metric history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EtaSettings {
    /// Only samples newer than `now - window_days` count.
    pub window_days: u32,
    /// How many sub-issues agents can work on at once.
    pub max_concurrent: usize,
}

/// Job classes that contribute duration samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobClass {
    Implementation,
    Review,
}

fn classify(job: &str) -> Vec<JobClass> {
    let mut classes = Vec::new();
    if job.contains("work") {
        classes.push(JobClass::Implementation);
    }
    if job.contains("review") || job.contains("pr") {
        classes.push(JobClass::Review);
    }
    classes
}

/// Estimate remaining time for the program.
///
/// Returns `None` when no metric falls inside the window. The estimate itself
/// is absent when there are no implementation samples or nothing remains.
pub fn estimate(
    records: &[MetricRecord],
    now: DateTime<Utc>,
    settings: EtaSettings,
    sub_issues: &[SubIssue],
    prs: &[PullRequest],
) -> Option<Eta> {
    let cutoff = now - Duration::days(i64::from(settings.window_days));
    let recent: Vec<&MetricRecord> = records
        .iter()
        .filter(|record| {
            DateTime::parse_from_rfc3339(&record.timestamp)
                .is_ok_and(|at| at.with_timezone(&Utc) >= cutoff)
        })
        .collect();
    if recent.is_empty() {
        return None;
    }

    let mut implementation = Vec::new();
    let mut review = Vec::new();
    for record in recent {
        if record.status != "success"
            || !record.duration_s.is_finite()
            || record.duration_s <= 0.0
        {
            continue;
        }
        for class in classify(&record.job) {
            match class {
                JobClass::Implementation => implementation.push(record.duration_s),
                JobClass::Review => review.push(record.duration_s),
            }
        }
    }

    let avg_implementation_minutes = average_minutes(&implementation);
    let avg_review_minutes = average_minutes(&review);

    let remaining_issues = sub_issues.iter().filter(|issue| issue.is_open()).count();
    let open_prs = prs.iter().filter(|pr| pr.is_open() && !pr.merged).count();

    let mut estimated_minutes = None;
    let mut confidence = Confidence::Low;
    if let Some(avg_impl) = avg_implementation_minutes
        && remaining_issues > 0
    {
        let parallelism = remaining_issues.min(settings.max_concurrent);
        let rounds = if parallelism > 0 {
            remaining_issues.div_ceil(parallelism)
        } else {
            remaining_issues
        };
        let implementation_time = (rounds as u64).saturating_mul(avg_impl);
        let review_time = avg_review_minutes
            .map(|avg| (open_prs as u64).saturating_mul(avg))
            .unwrap_or(0);
        estimated_minutes = Some(implementation_time.saturating_add(review_time));

        confidence = if implementation.len() >= 5 && review.len() >= 3 {
            Confidence::High
        } else if implementation.len() >= 2 {
            Confidence::Medium
        } else {
            Confidence::Low
        };
    }

    Some(Eta {
        avg_implementation_minutes,
        avg_review_minutes,
        implementation_samples: implementation.len(),
        review_samples: review.len(),
        remaining_issues,
        open_prs,
        estimated_minutes,
        confidence,
    })
}

fn average_minutes(durations: &[f64]) -> Option<u64> {
    if durations.is_empty() {
        return None;
    }
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;
    Some((mean / 60.0).round() as u64)
}
