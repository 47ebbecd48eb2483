//! Synthetic profile generator
//!
//! Every identity that reaches the service without a stored student gets a
//! complete, plausible record set: one student, seven days of productivity and
//! phone usage ending today, three coding profiles and four courses from the
//! student's domain.

use chrono::Duration;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use spt_common::identity::Identity;
use spt_common::metrics::{self, AppBuckets, ScoringPolicy};
use spt_common::models::{
    AcademicInfo, CodeChefProfile, CodingProfile, CodingProgress, CourseEnrollment, CourseStatus,
    GeneratedProfile, HackerRankProfile, LeetCodeProfile, MobileUsageEntry, PersonalInfo,
    ProductivityEntry, ScheduledEvent, StarRating, Student,
};
use spt_common::time;
use std::collections::BTreeMap;
use std::sync::Mutex;

const DOMAINS: [&str; 4] = [
    "Computer Science",
    "Data Science",
    "Engineering",
    "Business Administration",
];

const UNIVERSITIES: [&str; 4] = [
    "Anna University",
    "SRM University",
    "VIT University",
    "Amrita University",
];

const INSTRUCTORS: [&str; 4] = ["Kumar", "Sharma", "Patel", "Reddy"];

/// Courses generated per student
pub const COURSES_PER_STUDENT: usize = 4;

/// Leading courses that are generated already completed
pub const COMPLETED_COURSES: usize = 2;

/// Generated history length, days
pub const HISTORY_DAYS: u32 = 7;

/// Course catalog of a domain; unknown domains study Computer Science courses
pub fn domain_courses(domain: &str) -> [&'static str; COURSES_PER_STUDENT] {
    match domain {
        "Data Science" => [
            "Python Programming",
            "Statistics",
            "Machine Learning",
            "Data Visualization",
        ],
        "Engineering" => [
            "Mathematics",
            "Physics",
            "Digital Electronics",
            "Programming Fundamentals",
        ],
        "Business Administration" => ["Marketing", "Finance", "Management", "Economics"],
        _ => [
            "Data Structures",
            "Algorithms",
            "Web Development",
            "Database Systems",
        ],
    }
}

/// Campus events seeded into an empty store
pub fn scheduled_event_catalog() -> Vec<ScheduledEvent> {
    [
        ("EVT001", "CodeChef Monthly Contest", "Coding Competition", (2024, 10, 25), "registered", 1500, "3 hours"),
        ("EVT002", "Tech Hackathon 2024", "Hackathon", (2024, 11, 5), "upcoming", 200, "48 hours"),
        ("EVT003", "LeetCode Weekly Contest", "Coding Competition", (2024, 10, 28), "registered", 8000, "1.5 hours"),
    ]
    .into_iter()
    .filter_map(|(id, name, kind, (y, m, d), status, participants, duration)| {
        Some(ScheduledEvent {
            event_id: id.to_string(),
            name: name.to_string(),
            kind: kind.to_string(),
            date: chrono::NaiveDate::from_ymd_opt(y, m, d)?,
            status: status.to_string(),
            participants,
            duration: duration.to_string(),
        })
    })
    .collect()
}

/// Caller-supplied values that replace generated ones (registration)
#[derive(Debug, Clone, Default)]
pub struct ProfileOverrides {
    pub name: Option<String>,
    pub course: Option<String>,
}

/// Produces the initial record set for a new identity
pub trait ProfileGenerator: Send + Sync {
    fn generate(&self, identity: &Identity, overrides: &ProfileOverrides) -> GeneratedProfile;

    /// Scheduled events seeded when the store has none
    fn event_catalog(&self) -> Vec<ScheduledEvent> {
        scheduled_event_catalog()
    }
}

/// Random generator backed by a seedable RNG
pub struct RandomProfileGenerator {
    rng: Mutex<StdRng>,
}

impl RandomProfileGenerator {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence of profiles
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomProfileGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileGenerator for RandomProfileGenerator {
    fn generate(&self, identity: &Identity, overrides: &ProfileOverrides) -> GeneratedProfile {
        // A poisoned RNG is still a usable RNG
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let rng = &mut *rng;

        let today = time::today();
        let student_id = format!(
            "STU-{}",
            uuid::Builder::from_random_bytes(rng.gen()).into_uuid().simple()
        );

        let domain = overrides
            .course
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| pick(rng, &DOMAINS).to_string());

        let name = overrides
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_name(identity));

        let mobile_usage = mobile_history(rng, &student_id, today);

        let student = Student {
            student_id: student_id.clone(),
            personal_info: PersonalInfo {
                name,
                email: identity.as_str().to_string(),
                phone: format!("+91{}", rng.gen_range(1_000_000_000u64..=9_999_999_999)),
                course: domain.clone(),
                semester: rng.gen_range(1..=8),
                university: pick(rng, &UNIVERSITIES).to_string(),
                join_date: today - Duration::days(rng.gen_range(0..365)),
            },
            academic_info: AcademicInfo {
                cgpa: (rng.gen_range(7.0..9.0_f64) * 10.0).round() / 10.0,
                attendance: rng.gen_range(75..95),
                completed_courses: rng.gen_range(2..6),
                current_courses: rng.gen_range(1..4),
                certificates: vec![
                    format!("{} Fundamentals", domain),
                    "Programming Basics".to_string(),
                    "Web Development".to_string(),
                ],
            },
            overall_productivity: metrics::overall_productivity(&mobile_usage),
        };

        GeneratedProfile {
            productivity: productivity_history(rng, &student_id, today),
            coding: coding_profiles(rng, &student_id),
            courses: courses(rng, &student_id, &domain, today),
            mobile_usage,
            student,
        }
    }
}

fn pick<'a>(rng: &mut StdRng, items: &'a [&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// "alice.w@x.org" → "Alice.w Student"
fn default_name(identity: &Identity) -> String {
    let local = identity.local_part();
    let mut chars = local.chars();
    let capitalized: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    format!("{} Student", capitalized)
}

fn productivity_history(
    rng: &mut StdRng,
    student_id: &str,
    today: chrono::NaiveDate,
) -> Vec<ProductivityEntry> {
    time::trailing_days(today, HISTORY_DAYS)
        .into_iter()
        .map(|date| {
            let study_time: u32 = rng.gen_range(120..360);
            ProductivityEntry {
                student_id: student_id.to_string(),
                date,
                study_time,
                productive_time: rng.gen_range(100..300u32).min(study_time),
                productivity_score: rng.gen_range(65..95),
                tasks_completed: rng.gen_range(3..11),
                focus_sessions: rng.gen_range(1..6),
                breaks_taken: rng.gen_range(2..8),
            }
        })
        .collect()
}

fn coding_profiles(rng: &mut StdRng, student_id: &str) -> Vec<CodingProgress> {
    let profiles = [
        CodingProfile::LeetCode(LeetCodeProfile {
            problems_solved: rng.gen_range(50..250),
            easy: Some(rng.gen_range(30..130)),
            medium: Some(rng.gen_range(20..140)),
            hard: Some(rng.gen_range(5..35)),
            current_streak: Some(rng.gen_range(5..50)),
            global_rank: rng.gen_range(1_000..16_000),
            contest_rating: None,
        }),
        CodingProfile::CodeChef(CodeChefProfile {
            problems_solved: rng.gen_range(20..100),
            rating: StarRating::clamped(rng.gen_range(1..=4)),
            contest_rating: None,
            contests_joined: Some(rng.gen_range(5..30)),
            global_rank: rng.gen_range(2_000..12_000),
        }),
        CodingProfile::HackerRank(HackerRankProfile {
            problems_solved: rng.gen_range(30..180),
            badges: rng.gen_range(5..15),
            skills: ["Python", "Java", "SQL", "Problem Solving"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }),
    ];

    profiles
        .into_iter()
        .map(|profile| CodingProgress {
            student_id: student_id.to_string(),
            profile,
        })
        .collect()
}

fn courses(
    rng: &mut StdRng,
    student_id: &str,
    domain: &str,
    today: chrono::NaiveDate,
) -> Vec<CourseEnrollment> {
    domain_courses(domain)
        .iter()
        .enumerate()
        .map(|(index, course_name)| {
            let completed = index < COMPLETED_COURSES;
            CourseEnrollment {
                student_id: student_id.to_string(),
                course_id: format!("CRS{}", index + 1),
                course_name: course_name.to_string(),
                category: domain.to_string(),
                progress: if completed { 100 } else { rng.gen_range(30..80) },
                status: if completed {
                    CourseStatus::Completed
                } else {
                    CourseStatus::InProgress
                },
                start_date: today - Duration::days(rng.gen_range(0..90)),
                instructor: format!("Dr. {}", pick(rng, &INSTRUCTORS)),
            }
        })
        .collect()
}

fn mobile_history(
    rng: &mut StdRng,
    student_id: &str,
    today: chrono::NaiveDate,
) -> Vec<MobileUsageEntry> {
    time::trailing_days(today, HISTORY_DAYS)
        .into_iter()
        .map(|date| {
            let productive_apps: BTreeMap<String, u32> = BTreeMap::from([
                ("VS Code".to_string(), rng.gen_range(20..80)),
                ("LeetCode".to_string(), rng.gen_range(15..60)),
                ("Coursera".to_string(), rng.gen_range(10..40)),
            ]);
            let social_apps: BTreeMap<String, u32> = BTreeMap::from([
                ("WhatsApp".to_string(), rng.gen_range(10..50)),
                ("Instagram".to_string(), rng.gen_range(5..35)),
                ("YouTube".to_string(), rng.gen_range(10..60)),
            ]);

            let mut entry = MobileUsageEntry::empty(student_id, date);
            // Buckets plus untracked apps
            entry.total_screen_time = productive_apps.values().sum::<u32>()
                + social_apps.values().sum::<u32>()
                + rng.gen_range(0..30);
            entry.productive_apps = productive_apps;
            entry.social_apps = social_apps;
            entry.productivity_score = AppBuckets.score(&entry);
            entry
        })
        .collect()
}
