//! Derived productivity metrics
//!
//! Pure functions over stored time-series. Nothing here touches the store
//! directly; callers pass the records they already filtered.
//!
//! Two mobile-usage scoring policies coexist:
//! - [`ReportedProductiveTime`]: batch reports, productive minutes come from the caller
//! - [`AppBuckets`]: live ticks, productive minutes are the productive-app bucket

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Serialize, Serializer};
use std::cmp::Reverse;
use std::collections::BTreeMap;

use crate::models::{
    CodingProgress, CourseEnrollment, MobileUsageEntry, Platform, Student, UsageCategory,
};
use crate::{Error, Result};

/// Window used by overall productivity and forecasts
pub const TRAILING_DAYS: usize = 7;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// `round(100 * productive / total)`, 0 when total is 0, never above 100
pub fn ratio_score(productive: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let productive = productive.min(total) as f64;
    (100.0 * productive / total as f64).round() as u8
}

// ============================================================================
// Overall productivity and ranking
// ============================================================================

/// Productivity over the 7 most recent mobile-usage days of one student
pub fn overall_productivity<'a>(entries: impl IntoIterator<Item = &'a MobileUsageEntry>) -> u8 {
    let mut recent: Vec<&MobileUsageEntry> = entries.into_iter().collect();
    recent.sort_by(|a, b| b.date.cmp(&a.date));

    let (productive, screen) = recent
        .iter()
        .take(TRAILING_DAYS)
        .fold((0u64, 0u64), |(p, s), entry| {
            (
                p + entry.productive_minutes() as u64,
                s + entry.total_screen_time as u64,
            )
        });

    ratio_score(productive, screen)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranking {
    pub rank: usize,
    pub student_id: String,
    pub name: String,
    pub email: String,
    pub overall_productivity: u8,
}

/// Rank students by overall productivity, descending
///
/// Ties keep input order (stable sort), ranks run 1..=N without gaps.
pub fn rank_students(students: &[Student]) -> Vec<Ranking> {
    let mut ordered: Vec<&Student> = students.iter().collect();
    ordered.sort_by_key(|s| Reverse(s.overall_productivity));

    ordered
        .into_iter()
        .enumerate()
        .map(|(index, s)| Ranking {
            rank: index + 1,
            student_id: s.student_id.clone(),
            name: s.personal_info.name.clone(),
            email: s.personal_info.email.clone(),
            overall_productivity: s.overall_productivity,
        })
        .collect()
}

// ============================================================================
// Forecasts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductivityForecast {
    /// Mean of the scores in the window
    pub average: f64,
    /// `(last - first) / count`, per day
    pub slope: f64,
    /// Score expected a week ahead, 0-100
    pub predicted: u8,
    pub trend: Trend,
    /// Number of data points used
    pub samples: usize,
}

impl ProductivityForecast {
    fn neutral() -> Self {
        Self {
            average: 0.0,
            slope: 0.0,
            predicted: 0,
            trend: Trend::Stable,
            samples: 0,
        }
    }
}

/// Project daily productivity scores (oldest first) one week ahead
pub fn predict_productivity(scores: &[u8]) -> ProductivityForecast {
    let window = &scores[scores.len().saturating_sub(TRAILING_DAYS)..];
    let (first, last) = match (window.first(), window.last()) {
        (Some(first), Some(last)) => (*first as f64, *last as f64),
        _ => return ProductivityForecast::neutral(),
    };

    let count = window.len() as f64;
    let average = window.iter().map(|s| *s as f64).sum::<f64>() / count;
    let slope = (last - first) / count;
    let predicted = (average + slope * TRAILING_DAYS as f64).clamp(0.0, 100.0).round() as u8;

    let trend = if slope > 0.0 {
        Trend::Improving
    } else if slope < 0.0 {
        Trend::Declining
    } else {
        Trend::Stable
    };

    ProductivityForecast {
        average,
        slope,
        predicted,
        trend,
        samples: window.len(),
    }
}

/// When a course is expected to finish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEstimate {
    Completed,
    Expected(DateTime<Utc>),
    /// No progress anywhere to extrapolate from
    Unbounded,
}

impl Serialize for CompletionEstimate {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CompletionEstimate::Completed => serializer.serialize_str("Completed"),
            CompletionEstimate::Unbounded => serializer.serialize_str("Unbounded"),
            CompletionEstimate::Expected(at) => at.serialize(serializer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseForecast {
    pub course_id: String,
    pub course_name: String,
    pub progress: u8,
    pub predicted_completion: CompletionEstimate,
}

/// Extrapolate course completion from the average progress rate
///
/// An incomplete course needs `(100 - progress) / averageProgress` more days.
pub fn predict_course_completion(
    courses: &[CourseEnrollment],
    now: DateTime<Utc>,
) -> Vec<CourseForecast> {
    if courses.is_empty() {
        return Vec::new();
    }

    let average_progress =
        courses.iter().map(|c| c.progress as f64).sum::<f64>() / courses.len() as f64;

    courses
        .iter()
        .map(|course| {
            let predicted_completion = if course.is_complete() {
                CompletionEstimate::Completed
            } else if average_progress <= 0.0 {
                CompletionEstimate::Unbounded
            } else {
                let remaining = 100.0 - course.progress as f64;
                let millis = (remaining * MILLIS_PER_DAY / average_progress).round() as i64;
                CompletionEstimate::Expected(now + Duration::milliseconds(millis))
            };

            CourseForecast {
                course_id: course.course_id.clone(),
                course_name: course.course_name.clone(),
                progress: course.progress,
                predicted_completion,
            }
        })
        .collect()
}

// ============================================================================
// Mobile-usage scoring policies
// ============================================================================

/// How productive minutes are determined for a usage day
pub trait ScoringPolicy {
    fn productive_minutes(&self, entry: &MobileUsageEntry) -> u32;

    fn score(&self, entry: &MobileUsageEntry) -> u8 {
        ratio_score(
            self.productive_minutes(entry) as u64,
            entry.total_screen_time as u64,
        )
    }
}

/// Batch policy: the caller states the productive minutes
#[derive(Debug, Clone, Copy)]
pub struct ReportedProductiveTime(pub u32);

impl ScoringPolicy for ReportedProductiveTime {
    fn productive_minutes(&self, entry: &MobileUsageEntry) -> u32 {
        self.0.min(entry.total_screen_time)
    }
}

/// Tick policy: productive minutes are whatever the productive bucket holds
#[derive(Debug, Clone, Copy)]
pub struct AppBuckets;

impl ScoringPolicy for AppBuckets {
    fn productive_minutes(&self, entry: &MobileUsageEntry) -> u32 {
        entry.productive_app_minutes()
    }
}

/// A full day's usage report from the batch endpoint
#[derive(Debug, Clone, Default)]
pub struct UsageReport {
    pub screen_time: f64,
    pub productive_time: Option<f64>,
    pub productive_apps: BTreeMap<String, u32>,
    pub social_apps: BTreeMap<String, u32>,
}

/// A single app-usage increment from the live endpoint
#[derive(Debug, Clone)]
pub struct UsageTick {
    pub app_name: String,
    pub minutes: f64,
    pub category: UsageCategory,
}

fn minutes(value: f64, field: &str) -> Result<u32> {
    if !value.is_finite() {
        return Err(Error::InvalidInput(format!("{} must be a finite number", field)));
    }
    Ok(value.max(0.0).min(u32::MAX as f64).round() as u32)
}

/// Build the entry for a batch report, scored with [`ReportedProductiveTime`]
///
/// Productive time falls back to the productive-app breakdown when not given
/// and is clamped into `[0, screenTime]`.
pub fn build_reported_usage(
    student_id: &str,
    date: NaiveDate,
    report: UsageReport,
) -> Result<MobileUsageEntry> {
    let total = minutes(report.screen_time, "screenTime")?;
    let raw_productive = match report.productive_time {
        Some(value) => minutes(value, "productiveTime")?,
        None => report
            .productive_apps
            .values()
            .fold(0u32, |acc, m| acc.saturating_add(*m)),
    };
    let policy = ReportedProductiveTime(raw_productive.min(total));

    let mut entry = MobileUsageEntry::empty(student_id, date);
    entry.total_screen_time = total;
    entry.productive_apps = report.productive_apps;
    entry.social_apps = report.social_apps;
    entry.productive_time = Some(policy.0);
    entry.productivity_score = policy.score(&entry);
    Ok(entry)
}

/// Fold a tick into a day's buckets and rescore with [`AppBuckets`]
pub fn apply_usage_tick(entry: &mut MobileUsageEntry, tick: &UsageTick) -> Result<()> {
    let app_name = tick.app_name.trim();
    if app_name.is_empty() {
        return Err(Error::InvalidInput("appName is required".to_string()));
    }
    let mins = minutes(tick.minutes, "minutes")?;

    entry.total_screen_time = entry.total_screen_time.saturating_add(mins);
    let bucket = match tick.category {
        UsageCategory::Productive => &mut entry.productive_apps,
        UsageCategory::Social => &mut entry.social_apps,
    };
    let slot = bucket.entry(app_name.to_string()).or_insert(0);
    *slot = slot.saturating_add(mins);

    // The bucket is now authoritative for this day
    entry.productive_time = None;
    entry.productivity_score = AppBuckets.score(entry);
    Ok(())
}

// ============================================================================
// Aggregates
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlatformSummary {
    pub platform: Platform,
    pub profiles: usize,
    pub average_problems_solved: f64,
}

/// Mean overall productivity, 0 for an empty roster
pub fn average_overall_productivity(students: &[Student]) -> f64 {
    if students.is_empty() {
        return 0.0;
    }
    students
        .iter()
        .map(|s| s.overall_productivity as f64)
        .sum::<f64>()
        / students.len() as f64
}

/// Average problems solved per platform, platforms without profiles omitted
pub fn platform_summaries(records: &[CodingProgress]) -> Vec<PlatformSummary> {
    [Platform::LeetCode, Platform::CodeChef, Platform::HackerRank]
        .into_iter()
        .filter_map(|platform| {
            let solved: Vec<u32> = records
                .iter()
                .filter(|r| r.profile.platform() == platform)
                .map(|r| r.profile.problems_solved())
                .collect();
            if solved.is_empty() {
                return None;
            }
            Some(PlatformSummary {
                platform,
                profiles: solved.len(),
                average_problems_solved: solved.iter().map(|s| *s as f64).sum::<f64>()
                    / solved.len() as f64,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        AcademicInfo, CourseStatus, HackerRankProfile, PersonalInfo, CodingProfile,
    };
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn usage(d: u32, total: u32, productive: u32) -> MobileUsageEntry {
        let mut entry = MobileUsageEntry::empty("STU1", day(d));
        entry.total_screen_time = total;
        entry.productive_apps.insert("VS Code".to_string(), productive);
        entry
    }

    fn student(id: &str, score: u8) -> Student {
        Student {
            student_id: id.to_string(),
            personal_info: PersonalInfo {
                name: id.to_string(),
                email: format!("{}@example.com", id.to_lowercase()),
                phone: String::new(),
                course: "Engineering".to_string(),
                semester: 1,
                university: "Anna University".to_string(),
                join_date: day(1),
            },
            academic_info: AcademicInfo {
                cgpa: 7.5,
                attendance: 80,
                completed_courses: 2,
                current_courses: 1,
                certificates: vec![],
            },
            overall_productivity: score,
        }
    }

    fn course(id: &str, progress: u8, status: CourseStatus) -> CourseEnrollment {
        CourseEnrollment {
            student_id: "STU1".to_string(),
            course_id: id.to_string(),
            course_name: format!("Course {}", id),
            category: "Engineering".to_string(),
            progress,
            status,
            start_date: day(1),
            instructor: "Dr. Kumar".to_string(),
        }
    }

    #[test]
    fn ratio_score_zero_total_is_zero() {
        assert_eq!(ratio_score(0, 0), 0);
        assert_eq!(ratio_score(50, 0), 0);
        assert_eq!(ratio_score(30, 40), 75);
        assert_eq!(ratio_score(150, 100), 100);
    }

    #[test]
    fn overall_productivity_uses_latest_seven_days() {
        // Oldest day is fully unproductive and must fall out of the window
        let mut entries = vec![usage(1, 100, 0)];
        for d in 2..=8 {
            entries.push(usage(d, 100, 50));
        }
        assert_eq!(overall_productivity(&entries), 50);
    }

    #[test]
    fn overall_productivity_without_screen_time_is_zero() {
        let entries = vec![usage(1, 0, 0), usage(2, 0, 0)];
        assert_eq!(overall_productivity(&entries), 0);
        assert_eq!(overall_productivity(std::iter::empty::<&MobileUsageEntry>()), 0);
    }

    #[test]
    fn overall_productivity_clamps_inconsistent_days() {
        let mut entry = usage(1, 60, 0);
        entry.productive_time = Some(500);
        assert_eq!(overall_productivity([&entry]), 100);
    }

    #[test]
    fn ranking_is_stable_for_ties() {
        let students = vec![student("A", 90), student("B", 90), student("C", 70)];
        let ranks = rank_students(&students);

        let ids: Vec<&str> = ranks.iter().map(|r| r.student_id.as_str()).collect();
        let positions: Vec<usize> = ranks.iter().map(|r| r.rank).collect();
        assert_eq!(ids, vec!["A", "B", "C"]);
        assert_eq!(positions, vec![1, 2, 3]);
    }

    #[test]
    fn ranking_orders_descending() {
        let students = vec![student("A", 10), student("B", 95), student("C", 40)];
        let ids: Vec<String> = rank_students(&students)
            .into_iter()
            .map(|r| r.student_id)
            .collect();
        assert_eq!(ids, vec!["B", "C", "A"]);
    }

    #[test]
    fn prediction_empty_series_is_neutral() {
        let forecast = predict_productivity(&[]);
        assert_eq!(forecast.predicted, 0);
        assert_eq!(forecast.trend, Trend::Stable);
        assert_eq!(forecast.samples, 0);
    }

    #[test]
    fn prediction_single_point_has_no_trend() {
        let forecast = predict_productivity(&[72]);
        assert_eq!(forecast.slope, 0.0);
        assert_eq!(forecast.trend, Trend::Stable);
        assert_eq!(forecast.predicted, 72);
    }

    #[test]
    fn prediction_improving_series() {
        // mean 70, slope (80-60)/3, predicted 70 + 46.67 = 116.67 -> 100
        let forecast = predict_productivity(&[60, 70, 80]);
        assert_eq!(forecast.trend, Trend::Improving);
        assert_eq!(forecast.predicted, 100);
    }

    #[test]
    fn prediction_declining_series_stays_in_range() {
        let forecast = predict_productivity(&[90, 5, 0]);
        assert_eq!(forecast.trend, Trend::Declining);
        assert_eq!(forecast.predicted, 0);
    }

    #[test]
    fn prediction_window_uses_last_seven() {
        // Only the last seven (all 50) count
        let forecast = predict_productivity(&[0, 0, 50, 50, 50, 50, 50, 50, 50]);
        assert_eq!(forecast.samples, 7);
        assert_eq!(forecast.average, 50.0);
        assert_eq!(forecast.trend, Trend::Stable);
    }

    #[test]
    fn prediction_bounds_hold_for_any_short_series() {
        let series: [&[u8]; 5] = [&[100], &[0, 100], &[100, 0], &[100, 100, 0, 100], &[0; 7]];
        for scores in series {
            let forecast = predict_productivity(scores);
            assert!(forecast.predicted <= 100);
        }
    }

    #[test]
    fn course_completion_extrapolates_from_average() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        // average progress 50 -> remaining 50 takes one day
        let courses = vec![
            course("CRS1", 100, CourseStatus::Completed),
            course("CRS2", 50, CourseStatus::InProgress),
            course("CRS3", 0, CourseStatus::InProgress),
        ];
        let forecasts = predict_course_completion(&courses, now);

        assert_eq!(forecasts[0].predicted_completion, CompletionEstimate::Completed);
        assert_eq!(
            forecasts[1].predicted_completion,
            CompletionEstimate::Expected(now + Duration::days(1))
        );
        assert_eq!(
            forecasts[2].predicted_completion,
            CompletionEstimate::Expected(now + Duration::days(2))
        );
    }

    #[test]
    fn course_completion_zero_average_is_unbounded() {
        let now = Utc::now();
        let courses = vec![course("CRS1", 0, CourseStatus::InProgress)];
        let forecasts = predict_course_completion(&courses, now);
        assert_eq!(forecasts[0].predicted_completion, CompletionEstimate::Unbounded);
        assert_eq!(
            serde_json::to_value(&forecasts[0].predicted_completion).unwrap(),
            serde_json::json!("Unbounded")
        );
        assert!(predict_course_completion(&[], now).is_empty());
    }

    #[test]
    fn tick_path_scores_from_buckets() {
        let mut entry = MobileUsageEntry::empty("STU1", day(1));
        apply_usage_tick(
            &mut entry,
            &UsageTick {
                app_name: "VSCode".to_string(),
                minutes: 30.0,
                category: UsageCategory::Productive,
            },
        )
        .unwrap();
        apply_usage_tick(
            &mut entry,
            &UsageTick {
                app_name: "WhatsApp".to_string(),
                minutes: 10.0,
                category: UsageCategory::Social,
            },
        )
        .unwrap();

        assert_eq!(entry.total_screen_time, 40);
        assert_eq!(entry.productivity_score, 75);
        assert_eq!(entry.productive_apps["VSCode"], 30);
        assert_eq!(entry.social_apps["WhatsApp"], 10);
    }

    #[test]
    fn tick_path_ignores_negative_minutes_and_rejects_blank_app() {
        let mut entry = MobileUsageEntry::empty("STU1", day(1));
        let tick = UsageTick {
            app_name: "Chess".to_string(),
            minutes: -5.0,
            category: UsageCategory::Social,
        };
        apply_usage_tick(&mut entry, &tick).unwrap();
        assert_eq!(entry.total_screen_time, 0);
        assert_eq!(entry.productivity_score, 0);

        let blank = UsageTick {
            app_name: "  ".to_string(),
            ..tick
        };
        assert!(apply_usage_tick(&mut entry, &blank).is_err());
    }

    #[test]
    fn batch_path_clamps_reported_time() {
        let entry = build_reported_usage(
            "STU1",
            day(1),
            UsageReport {
                screen_time: 100.0,
                productive_time: Some(150.0),
                ..Default::default()
            },
        )
        .unwrap();

        assert_eq!(entry.productive_time, Some(100));
        assert_eq!(entry.productivity_score, 100);
    }

    #[test]
    fn batch_path_falls_back_to_app_breakdown() {
        let mut productive_apps = BTreeMap::new();
        productive_apps.insert("Coursera".to_string(), 20);
        let entry = build_reported_usage(
            "STU1",
            day(1),
            UsageReport {
                screen_time: 80.0,
                productive_time: None,
                productive_apps,
                social_apps: BTreeMap::new(),
            },
        )
        .unwrap();

        assert_eq!(entry.productive_time, Some(20));
        assert_eq!(entry.productivity_score, 25);
    }

    #[test]
    fn batch_and_tick_policies_disagree_on_the_same_day() {
        // Reported time says 90 productive, buckets say 10
        let mut productive_apps = BTreeMap::new();
        productive_apps.insert("Anki".to_string(), 10);
        let entry = build_reported_usage(
            "STU1",
            day(1),
            UsageReport {
                screen_time: 100.0,
                productive_time: Some(90.0),
                productive_apps,
                social_apps: BTreeMap::new(),
            },
        )
        .unwrap();

        assert_eq!(ReportedProductiveTime(90).score(&entry), 90);
        assert_eq!(AppBuckets.score(&entry), 10);
    }

    #[test]
    fn batch_path_zero_screen_time() {
        let entry = build_reported_usage(
            "STU1",
            day(1),
            UsageReport {
                screen_time: 0.0,
                productive_time: Some(30.0),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(entry.productivity_score, 0);
        assert_eq!(entry.productive_time, Some(0));
    }

    #[test]
    fn batch_path_rejects_non_finite_numbers() {
        let result = build_reported_usage(
            "STU1",
            day(1),
            UsageReport {
                screen_time: f64::NAN,
                ..Default::default()
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn aggregates_summarize_roster() {
        let students = vec![student("A", 80), student("B", 60)];
        assert_eq!(average_overall_productivity(&students), 70.0);
        assert_eq!(average_overall_productivity(&[]), 0.0);

        let records = vec![
            CodingProgress {
                student_id: "A".to_string(),
                profile: CodingProfile::HackerRank(HackerRankProfile {
                    problems_solved: 10,
                    badges: 1,
                    skills: vec![],
                }),
            },
            CodingProgress {
                student_id: "B".to_string(),
                profile: CodingProfile::HackerRank(HackerRankProfile {
                    problems_solved: 30,
                    badges: 2,
                    skills: vec![],
                }),
            },
        ];
        let summaries = platform_summaries(&records);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].platform, Platform::HackerRank);
        assert_eq!(summaries[0].average_problems_solved, 20.0);
    }
}
