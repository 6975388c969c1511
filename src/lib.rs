//! Exam-entry eligibility checks for a student portal.
//!
//! [`eligibility::EligibilityEvaluator`] decides whether a student may enter
//! an exam from four read-only lookups: the exam catalog, the registration
//! roster, attendance records and fee status. [`dataset::Dataset`] serves
//! those lookups from memory or CSV, and [`db`] loads per-scan snapshots
//! from Postgres.

pub mod config;
pub mod dataset;
pub mod db;
pub mod eligibility;
pub mod logging;
pub mod models;
pub mod report;

pub use dataset::Dataset;
pub use eligibility::{
    DecisionKind, EligibilityError, EligibilityEvaluator, Rejection, VerificationResult,
    MIN_ATTENDANCE_REQUIRED,
};
