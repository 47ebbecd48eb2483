//! Record models for the aggregate store
//!
//! The store is one JSON document holding parallel arrays. Every per-student
//! record carries a `student_id` foreign key; orphans are tolerated.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::identity::Identity;
use crate::metrics;
use crate::{Error, Result};

// ============================================================================
// Students
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub personal_info: PersonalInfo,
    pub academic_info: AcademicInfo,
    /// Derived from the last 7 mobile-usage days, rewritten on every usage mutation
    #[serde(default)]
    pub overall_productivity: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalInfo {
    pub name: String,
    /// Normalized identity; the external key
    pub email: String,
    pub phone: String,
    /// Academic domain (also the course catalog key)
    pub course: String,
    pub semester: u8,
    pub university: String,
    pub join_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicInfo {
    pub cgpa: f64,
    /// Attendance percentage
    pub attendance: u8,
    pub completed_courses: u32,
    pub current_courses: u32,
    pub certificates: Vec<String>,
}

// ============================================================================
// Daily productivity
// ============================================================================

/// One day of study tracking; times are minutes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductivityEntry {
    pub student_id: String,
    pub date: NaiveDate,
    pub study_time: u32,
    /// Expected to be <= study_time, not enforced
    pub productive_time: u32,
    pub productivity_score: u8,
    pub tasks_completed: u32,
    pub focus_sessions: u32,
    pub breaks_taken: u32,
}

// ============================================================================
// Coding progress
// ============================================================================

/// Coding judge platforms with a profile shape of their own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    LeetCode,
    CodeChef,
    HackerRank,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LeetCode => "LeetCode",
            Platform::CodeChef => "CodeChef",
            Platform::HackerRank => "HackerRank",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "leetcode" => Ok(Platform::LeetCode),
            "codechef" => Ok(Platform::CodeChef),
            "hackerrank" => Ok(Platform::HackerRank),
            other => Err(Error::InvalidInput(format!("unsupported platform: {}", other))),
        }
    }
}

/// CodeChef star rank, stored as `"3★"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StarRating(u8);

impl StarRating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 7;

    /// Clamp into the 1..=7 star range
    pub fn clamped(stars: u8) -> Self {
        Self(stars.clamp(Self::MIN, Self::MAX))
    }

    pub fn stars(&self) -> u8 {
        self.0
    }
}

impl Serialize for StarRating {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}★", self.0))
    }
}

impl<'de> Deserialize<'de> for StarRating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(u8),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(stars) => Ok(StarRating::clamped(stars)),
            Raw::Text(text) => {
                let digits: String = text.chars().take_while(|c| c.is_ascii_digit()).collect();
                digits
                    .parse::<u8>()
                    .map(StarRating::clamped)
                    .map_err(|_| D::Error::custom(format!("invalid star rating: {}", text)))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeetCodeProfile {
    pub problems_solved: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easy: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_streak: Option<u32>,
    pub global_rank: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_rating: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChefProfile {
    pub problems_solved: u32,
    pub rating: StarRating,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contest_rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contests_joined: Option<u32>,
    pub global_rank: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HackerRankProfile {
    pub problems_solved: u32,
    pub badges: u32,
    pub skills: Vec<String>,
}

/// Platform-specific profile, tagged by `platform` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "platform")]
pub enum CodingProfile {
    LeetCode(LeetCodeProfile),
    CodeChef(CodeChefProfile),
    HackerRank(HackerRankProfile),
}

impl CodingProfile {
    pub fn platform(&self) -> Platform {
        match self {
            CodingProfile::LeetCode(_) => Platform::LeetCode,
            CodingProfile::CodeChef(_) => Platform::CodeChef,
            CodingProfile::HackerRank(_) => Platform::HackerRank,
        }
    }

    pub fn problems_solved(&self) -> u32 {
        match self {
            CodingProfile::LeetCode(p) => p.problems_solved,
            CodingProfile::CodeChef(p) => p.problems_solved,
            CodingProfile::HackerRank(p) => p.problems_solved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodingProgress {
    pub student_id: String,
    #[serde(flatten)]
    pub profile: CodingProfile,
}

// ============================================================================
// Courses
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CourseStatus {
    Completed,
    #[serde(rename = "In Progress")]
    InProgress,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseEnrollment {
    pub student_id: String,
    pub course_id: String,
    pub course_name: String,
    pub category: String,
    /// Percent complete, 0-100
    pub progress: u8,
    pub status: CourseStatus,
    pub start_date: NaiveDate,
    pub instructor: String,
}

impl CourseEnrollment {
    pub fn is_complete(&self) -> bool {
        self.status == CourseStatus::Completed || self.progress >= 100
    }
}

// ============================================================================
// Mobile usage
// ============================================================================

/// App usage bucket a tick is accounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageCategory {
    Productive,
    Social,
}

/// One day of phone usage; all values are minutes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobileUsageEntry {
    pub student_id: String,
    pub date: NaiveDate,
    pub total_screen_time: u32,
    #[serde(default)]
    pub productive_apps: BTreeMap<String, u32>,
    #[serde(default)]
    pub social_apps: BTreeMap<String, u32>,
    pub productivity_score: u8,
    /// Caller-reported productive minutes (batch path only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub productive_time: Option<u32>,
}

impl MobileUsageEntry {
    /// Fresh bucket for a day with no usage yet
    pub fn empty(student_id: &str, date: NaiveDate) -> Self {
        Self {
            student_id: student_id.to_string(),
            date,
            total_screen_time: 0,
            productive_apps: BTreeMap::new(),
            social_apps: BTreeMap::new(),
            productivity_score: 0,
            productive_time: None,
        }
    }

    pub fn productive_app_minutes(&self) -> u32 {
        self.productive_apps.values().fold(0u32, |acc, m| acc.saturating_add(*m))
    }

    /// Reported productive time if present, else the productive bucket, never above the total
    pub fn productive_minutes(&self) -> u32 {
        self.productive_time
            .unwrap_or_else(|| self.productive_app_minutes())
            .min(self.total_screen_time)
    }
}

// ============================================================================
// Events and activities
// ============================================================================

/// Campus event from the seeded catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    pub event_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub date: NaiveDate,
    pub status: String,
    pub participants: u32,
    pub duration: String,
}

/// Event pushed through the live tracking endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub email: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Entry of the shared `events` sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventRecord {
    Tracked(TrackedEvent),
    Scheduled(ScheduledEvent),
}

impl EventRecord {
    /// Scheduled events are visible to everyone, tracked ones only to their owner
    pub fn visible_to(&self, identity: &Identity) -> bool {
        match self {
            EventRecord::Scheduled(_) => true,
            EventRecord::Tracked(event) => identity.matches(&event.email),
        }
    }
}

/// Append-only activity log entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub email: String,
    pub activity: String,
    /// Minutes
    pub duration: u32,
    pub category: String,
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Store document
// ============================================================================

/// Full record set produced for a new identity
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedProfile {
    pub student: Student,
    pub productivity: Vec<ProductivityEntry>,
    pub coding: Vec<CodingProgress>,
    pub courses: Vec<CourseEnrollment>,
    pub mobile_usage: Vec<MobileUsageEntry>,
}

/// Records scoped to one student, as returned by the dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudentRecords {
    pub student: Student,
    pub productivity: Vec<ProductivityEntry>,
    pub coding: Vec<CodingProgress>,
    pub courses: Vec<CourseEnrollment>,
    pub mobile_usage: Vec<MobileUsageEntry>,
    pub events: Vec<EventRecord>,
}

impl StudentRecords {
    /// Most recent productivity day (later entries win date ties)
    pub fn latest_productivity(&self) -> Option<&ProductivityEntry> {
        self.productivity.iter().max_by_key(|p| p.date)
    }

    /// Most recent mobile-usage day (later entries win date ties)
    pub fn latest_mobile_usage(&self) -> Option<&MobileUsageEntry> {
        self.mobile_usage.iter().max_by_key(|m| m.date)
    }
}

/// The persisted aggregate document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    pub students: Vec<Student>,
    pub productivity: Vec<ProductivityEntry>,
    pub coding_progress: Vec<CodingProgress>,
    pub courses: Vec<CourseEnrollment>,
    pub mobile_usage: Vec<MobileUsageEntry>,
    pub events: Vec<EventRecord>,
    pub activities: Vec<Activity>,
}

impl Store {
    pub fn find_student(&self, identity: &Identity) -> Option<&Student> {
        self.students
            .iter()
            .find(|s| identity.matches(&s.personal_info.email))
    }

    pub fn find_student_mut(&mut self, identity: &Identity) -> Option<&mut Student> {
        self.students
            .iter_mut()
            .find(|s| identity.matches(&s.personal_info.email))
    }

    /// Look up a student, failing with NotFound
    pub fn require_student(&self, identity: &Identity) -> Result<&Student> {
        self.find_student(identity)
            .ok_or_else(|| Error::NotFound(format!("student {}", identity)))
    }

    /// Append a generated record set
    ///
    /// Rejects a profile whose email or student_id is already present, keeping
    /// both keys unique.
    pub fn insert_profile(&mut self, profile: GeneratedProfile) -> Result<()> {
        let student = &profile.student;
        let duplicate = self.students.iter().any(|s| {
            s.student_id == student.student_id
                || s.personal_info
                    .email
                    .eq_ignore_ascii_case(&student.personal_info.email)
        });
        if duplicate {
            return Err(Error::InvalidInput(format!(
                "student already exists: {}",
                student.personal_info.email
            )));
        }

        self.students.push(profile.student);
        self.productivity.extend(profile.productivity);
        self.coding_progress.extend(profile.coding);
        self.courses.extend(profile.courses);
        self.mobile_usage.extend(profile.mobile_usage);
        Ok(())
    }

    /// Seed the scheduled-event catalog when the store has none
    pub fn ensure_event_catalog(&mut self, catalog: impl FnOnce() -> Vec<ScheduledEvent>) {
        let has_scheduled = self
            .events
            .iter()
            .any(|e| matches!(e, EventRecord::Scheduled(_)));
        if !has_scheduled {
            self.events
                .extend(catalog().into_iter().map(EventRecord::Scheduled));
        }
    }

    /// Copy out every record belonging to `identity`
    pub fn records_for(&self, identity: &Identity) -> Option<StudentRecords> {
        let student = self.find_student(identity)?;
        let id = student.student_id.as_str();

        Some(StudentRecords {
            student: student.clone(),
            productivity: self
                .productivity
                .iter()
                .filter(|p| p.student_id == id)
                .cloned()
                .collect(),
            coding: self
                .coding_progress
                .iter()
                .filter(|c| c.student_id == id)
                .cloned()
                .collect(),
            courses: self
                .courses
                .iter()
                .filter(|c| c.student_id == id)
                .cloned()
                .collect(),
            mobile_usage: self
                .mobile_usage
                .iter()
                .filter(|m| m.student_id == id)
                .cloned()
                .collect(),
            events: self
                .events
                .iter()
                .filter(|e| e.visible_to(identity))
                .cloned()
                .collect(),
        })
    }

    /// Mobile-usage days for a student, newest first
    pub fn recent_mobile_usage(&self, student_id: &str, days: usize) -> Vec<MobileUsageEntry> {
        let mut entries: Vec<MobileUsageEntry> = self
            .mobile_usage
            .iter()
            .filter(|m| m.student_id == student_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries.truncate(days);
        entries
    }

    /// Productivity days for a student, oldest first
    pub fn productivity_series(&self, student_id: &str) -> Vec<&ProductivityEntry> {
        let mut entries: Vec<&ProductivityEntry> = self
            .productivity
            .iter()
            .filter(|p| p.student_id == student_id)
            .collect();
        entries.sort_by_key(|p| p.date);
        entries
    }

    /// Today's mobile-usage bucket, created empty when missing
    pub fn usage_entry_mut(&mut self, student_id: &str, date: NaiveDate) -> &mut MobileUsageEntry {
        let position = self
            .mobile_usage
            .iter()
            .position(|m| m.student_id == student_id && m.date == date);

        let index = match position {
            Some(index) => index,
            None => {
                self.mobile_usage.push(MobileUsageEntry::empty(student_id, date));
                self.mobile_usage.len() - 1
            }
        };
        &mut self.mobile_usage[index]
    }

    /// Recompute and persist a student's overall productivity
    pub fn refresh_overall_productivity(&mut self, student_id: &str) -> u8 {
        let score = metrics::overall_productivity(
            self.mobile_usage.iter().filter(|m| m.student_id == student_id),
        );

        if let Some(student) = self.students.iter_mut().find(|s| s.student_id == student_id) {
            student.overall_productivity = score;
        }
        score
    }

    /// Replace the student's profile for the same platform, or append it
    pub fn upsert_coding_profile(&mut self, student_id: &str, profile: CodingProfile) {
        let platform = profile.platform();
        let record = CodingProgress {
            student_id: student_id.to_string(),
            profile,
        };

        match self
            .coding_progress
            .iter_mut()
            .find(|c| c.student_id == student_id && c.profile.platform() == platform)
        {
            Some(existing) => *existing = record,
            None => self.coding_progress.push(record),
        }
    }
}
