//! Chat assistant
//!
//! Questions about a student's own numbers are answered straight from the
//! stored records. Anything else goes to an optional chat model; when no model
//! is configured or the call fails, the configured fixed response is returned.

mod openai;

pub use openai::OpenAiClient;

use futures::future::BoxFuture;
use spt_common::models::{CodingProfile, CourseStatus, EventRecord, StudentRecords};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Answer used when nothing better is available
pub const DEFAULT_FIXED_RESPONSE: &str = "This is the only approved response.";

/// Chat model failure
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Chat API error: {0}")]
    Api(String),

    #[error("Unexpected response: {0}")]
    Parse(String),
}

/// Free-form question answering backend
pub trait ChatModel: Send + Sync {
    fn complete<'a>(&'a self, message: &'a str) -> BoxFuture<'a, Result<String, ChatError>>;
}

/// Fallback chain for questions the records cannot answer
#[derive(Clone)]
pub struct Assistant {
    fixed_response: String,
    model: Option<Arc<dyn ChatModel>>,
}

impl Assistant {
    pub fn new(fixed_response: impl Into<String>) -> Self {
        Self {
            fixed_response: fixed_response.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Arc<dyn ChatModel>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn fixed_response(&self) -> &str {
        &self.fixed_response
    }

    /// Ask the chat model, keeping only the first line of its answer
    ///
    /// A missing model, a failed call and an empty answer all yield the fixed
    /// response.
    pub async fn fallback(&self, message: &str) -> String {
        let Some(model) = &self.model else {
            debug!("No chat model configured, using fixed response");
            return self.fixed_response.clone();
        };
        if message.is_empty() {
            return self.fixed_response.clone();
        }

        match model.complete(message).await {
            Ok(content) => {
                let line = content.lines().next().unwrap_or_default().trim();
                if line.is_empty() {
                    self.fixed_response.clone()
                } else {
                    line.to_string()
                }
            }
            Err(e) => {
                warn!("Chat model call failed: {}", e);
                self.fixed_response.clone()
            }
        }
    }
}

impl Default for Assistant {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_RESPONSE)
    }
}

/// Answer a question from the student's own records
///
/// Rules are tried in order; the first one that matches and has data wins.
/// `None` when no rule applies.
pub fn record_answer(records: &StudentRecords, message: &str) -> Option<String> {
    let msg = message.to_lowercase();
    let has = |word: &str| msg.contains(word);
    let today = records.latest_mobile_usage();

    if let Some(today) = today {
        if has("productivity") && has("today") {
            return Some(format!(
                "Today's productivity is {}%.",
                today.productivity_score
            ));
        }
    }

    if has("average") && has("productivity") && !records.productivity.is_empty() {
        let total: f64 = records
            .productivity
            .iter()
            .map(|p| p.productivity_score as f64)
            .sum();
        let average = (total / records.productivity.len() as f64).round() as u32;
        return Some(format!("Your 7-day average productivity is {}%.", average));
    }

    if let Some(today) = today {
        if (has("screen") || has("usage")) && has("today") {
            return Some(format!(
                "Today's screen time is {} minutes.",
                today.total_screen_time
            ));
        }

        if (has("top") || has("most")) && has("app") {
            // First app wins ties
            let top = today
                .productive_apps
                .iter()
                .reduce(|best, app| if app.1 > best.1 { app } else { best });
            if let Some((app, minutes)) = top {
                return Some(format!(
                    "Top productive app today is {} with {} minutes.",
                    app, minutes
                ));
            }
        }
    }

    if has("leetcode") {
        let leetcode = records.coding.iter().find_map(|c| match &c.profile {
            CodingProfile::LeetCode(profile) => Some(profile),
            _ => None,
        });
        if let Some(profile) = leetcode {
            if has("problem") {
                return Some(format!(
                    "LeetCode problems solved: {}.",
                    profile.problems_solved
                ));
            }
            if has("rank") {
                return Some(format!("LeetCode global rank is {}.", profile.global_rank));
            }
        }
    }

    if has("course") {
        let count = |status: CourseStatus| {
            records
                .courses
                .iter()
                .filter(|c| c.status == status)
                .count()
        };
        return Some(format!(
            "Courses completed {}, in progress {}.",
            count(CourseStatus::Completed),
            count(CourseStatus::InProgress)
        ));
    }

    if has("event") {
        let next = records
            .events
            .iter()
            .filter_map(|e| match e {
                EventRecord::Scheduled(event) => Some(event),
                EventRecord::Tracked(_) => None,
            })
            .min_by_key(|event| event.date);
        if let Some(event) = next {
            return Some(format!("Next event is {} on {}.", event.name, event.date));
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use futures::FutureExt;
    use spt_common::models::{
        AcademicInfo, CodingProgress, CourseEnrollment, HackerRankProfile, LeetCodeProfile,
        MobileUsageEntry, PersonalInfo, ProductivityEntry, ScheduledEvent, Student,
        TrackedEvent,
    };
    use std::collections::BTreeMap;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    fn productivity(d: u32, score: u8) -> ProductivityEntry {
        ProductivityEntry {
            student_id: "STU1".to_string(),
            date: day(d),
            study_time: 240,
            productive_time: 180,
            productivity_score: score,
            tasks_completed: 4,
            focus_sessions: 3,
            breaks_taken: 2,
        }
    }

    fn usage(d: u32, total: u32, apps: &[(&str, u32)], score: u8) -> MobileUsageEntry {
        MobileUsageEntry {
            student_id: "STU1".to_string(),
            date: day(d),
            total_screen_time: total,
            productive_apps: apps
                .iter()
                .map(|(name, minutes)| (name.to_string(), *minutes))
                .collect::<BTreeMap<_, _>>(),
            social_apps: BTreeMap::new(),
            productivity_score: score,
            productive_time: None,
        }
    }

    fn course(id: &str, status: CourseStatus) -> CourseEnrollment {
        CourseEnrollment {
            student_id: "STU1".to_string(),
            course_id: id.to_string(),
            course_name: format!("Course {}", id),
            category: "Computer Science".to_string(),
            progress: if status == CourseStatus::Completed { 100 } else { 40 },
            status,
            start_date: day(1),
            instructor: "Dr. Kumar".to_string(),
        }
    }

    fn scheduled(id: &str, name: &str, d: u32) -> EventRecord {
        EventRecord::Scheduled(ScheduledEvent {
            event_id: id.to_string(),
            name: name.to_string(),
            kind: "Coding Competition".to_string(),
            date: day(d),
            status: "registered".to_string(),
            participants: 100,
            duration: "3 hours".to_string(),
        })
    }

    fn records() -> StudentRecords {
        StudentRecords {
            student: Student {
                student_id: "STU1".to_string(),
                personal_info: PersonalInfo {
                    name: "Alice Student".to_string(),
                    email: "alice@example.com".to_string(),
                    phone: "+911234567890".to_string(),
                    course: "Computer Science".to_string(),
                    semester: 3,
                    university: "VIT University".to_string(),
                    join_date: day(1),
                },
                academic_info: AcademicInfo {
                    cgpa: 8.4,
                    attendance: 91,
                    completed_courses: 2,
                    current_courses: 1,
                    certificates: vec![],
                },
                overall_productivity: 60,
            },
            productivity: vec![productivity(1, 70), productivity(2, 80), productivity(3, 91)],
            coding: vec![
                CodingProgress {
                    student_id: "STU1".to_string(),
                    profile: CodingProfile::HackerRank(HackerRankProfile {
                        problems_solved: 12,
                        badges: 2,
                        skills: vec![],
                    }),
                },
                CodingProgress {
                    student_id: "STU1".to_string(),
                    profile: CodingProfile::LeetCode(LeetCodeProfile {
                        problems_solved: 412,
                        easy: None,
                        medium: None,
                        hard: None,
                        current_streak: None,
                        global_rank: 51234,
                        contest_rating: None,
                    }),
                },
            ],
            courses: vec![
                course("CRS1", CourseStatus::Completed),
                course("CRS2", CourseStatus::Completed),
                course("CRS3", CourseStatus::InProgress),
            ],
            mobile_usage: vec![
                usage(3, 240, &[("Anki", 30), ("VS Code", 90), ("Notion", 90)], 88),
                usage(1, 100, &[("Anki", 10)], 10),
            ],
            events: vec![
                scheduled("EVT002", "Tech Hackathon 2024", 5),
                EventRecord::Tracked(TrackedEvent {
                    id: uuid::Uuid::new_v4(),
                    timestamp: chrono::Utc::now(),
                    email: "alice@example.com".to_string(),
                    kind: "focus_start".to_string(),
                    payload: serde_json::Value::Null,
                }),
                scheduled("EVT001", "Monthly Contest", 2),
            ],
        }
    }

    fn answer(message: &str) -> Option<String> {
        record_answer(&records(), message)
    }

    #[test]
    fn productivity_today_uses_latest_usage_day() {
        assert_eq!(
            answer("What is my Productivity TODAY?").as_deref(),
            Some("Today's productivity is 88%.")
        );
    }

    #[test]
    fn average_productivity_is_rounded_mean() {
        assert_eq!(
            answer("average productivity please").as_deref(),
            Some("Your 7-day average productivity is 80%.")
        );
    }

    #[test]
    fn screen_time_today() {
        assert_eq!(
            answer("how much screen time today").as_deref(),
            Some("Today's screen time is 240 minutes.")
        );
        assert_eq!(
            answer("phone usage today?").as_deref(),
            Some("Today's screen time is 240 minutes.")
        );
    }

    #[test]
    fn top_app_keeps_first_of_equal_minutes() {
        assert_eq!(
            answer("which app did I use most").as_deref(),
            Some("Top productive app today is Notion with 90 minutes.")
        );
    }

    #[test]
    fn leetcode_problems_and_rank() {
        assert_eq!(
            answer("LeetCode problems solved?").as_deref(),
            Some("LeetCode problems solved: 412.")
        );
        assert_eq!(
            answer("what's my leetcode ranking").as_deref(),
            Some("LeetCode global rank is 51234.")
        );
        assert!(answer("tell me about leetcode").is_none());
    }

    #[test]
    fn course_counts_by_status() {
        assert_eq!(
            answer("how are my courses going").as_deref(),
            Some("Courses completed 2, in progress 1.")
        );
    }

    #[test]
    fn next_event_is_earliest_scheduled() {
        assert_eq!(
            answer("when is the next event").as_deref(),
            Some("Next event is Monthly Contest on 2024-10-02.")
        );
    }

    #[test]
    fn unrelated_question_has_no_record_answer() {
        assert!(answer("what is the capital of France").is_none());
    }

    #[test]
    fn usage_rules_need_usage_data() {
        let mut records = records();
        records.mobile_usage.clear();
        assert!(record_answer(&records, "productivity today").is_none());
        assert!(record_answer(&records, "screen time today").is_none());
        assert!(record_answer(&records, "top app").is_none());
    }

    struct Canned(Result<&'static str, &'static str>);

    impl ChatModel for Canned {
        fn complete<'a>(&'a self, _message: &'a str) -> BoxFuture<'a, Result<String, ChatError>> {
            let result = self
                .0
                .map(str::to_string)
                .map_err(|e| ChatError::Api(e.to_string()));
            async move { result }.boxed()
        }
    }

    #[tokio::test]
    async fn fallback_without_model_is_fixed() {
        let assistant = Assistant::new("Ask later.");
        assert_eq!(assistant.fallback("hello").await, "Ask later.");
    }

    #[tokio::test]
    async fn fallback_keeps_first_line_of_model_answer() {
        let assistant =
            Assistant::new("Ask later.").with_model(Arc::new(Canned(Ok("  Paris.  \nMore text"))));
        assert_eq!(assistant.fallback("capital of France?").await, "Paris.");
    }

    #[tokio::test]
    async fn fallback_on_model_error_or_empty_answer_is_fixed() {
        let failing = Assistant::new("Ask later.").with_model(Arc::new(Canned(Err("quota"))));
        assert_eq!(failing.fallback("hi").await, "Ask later.");

        let empty = Assistant::new("Ask later.").with_model(Arc::new(Canned(Ok("\n"))));
        assert_eq!(empty.fallback("hi").await, "Ask later.");
    }
}
