use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A scheduled exam. `id` is the value encoded in the exam's QR/barcode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exam {
    pub id: String,
    pub course_code: String,
    pub course_title: String,
    pub date: NaiveDate,
    pub time: String,
    pub room: String,
    pub semester: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamRegistration {
    pub student_email: String,
    pub exam_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub student_email: String,
    pub course_code: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeStatus {
    pub student_email: String,
    pub is_defaulter: bool,
}

/// Normalizes a student email the way accounts store it: trimmed, lower case.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
