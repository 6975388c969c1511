//! Exam-entry eligibility decisions.
//!
//! A scan is checked against four read-only collaborators in a fixed order:
//!
//! 1. the exam exists in the catalog,
//! 2. the student is registered for it,
//! 3. the student's attendance in the exam's course meets the threshold,
//! 4. the student is not a fee defaulter.
//!
//! The first failing check decides the verdict and later checks are skipped.
//! A missing attendance record fails check 3; a missing fee record passes
//! check 4.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::debug;

use crate::models::{Exam, FeeStatus};

/// Minimum attendance percentage required to sit an exam.
pub const MIN_ATTENDANCE_REQUIRED: f64 = 75.0;

pub trait ExamCatalog {
    fn find_exam_by_id(&self, id: &str) -> Option<Exam>;
}

pub trait RegistrationRoster {
    fn is_registered(&self, student_email: &str, exam_id: &str) -> bool;
}

pub trait AttendanceLedger {
    /// Attendance percentage for a student in a course, if recorded.
    fn attendance(&self, student_email: &str, course_code: &str) -> Option<f64>;
}

pub trait FeeLedger {
    fn fee_status(&self, student_email: &str) -> Option<FeeStatus>;
}

impl<T: ExamCatalog + ?Sized> ExamCatalog for &T {
    fn find_exam_by_id(&self, id: &str) -> Option<Exam> {
        (**self).find_exam_by_id(id)
    }
}

impl<T: RegistrationRoster + ?Sized> RegistrationRoster for &T {
    fn is_registered(&self, student_email: &str, exam_id: &str) -> bool {
        (**self).is_registered(student_email, exam_id)
    }
}

impl<T: AttendanceLedger + ?Sized> AttendanceLedger for &T {
    fn attendance(&self, student_email: &str, course_code: &str) -> Option<f64> {
        (**self).attendance(student_email, course_code)
    }
}

impl<T: FeeLedger + ?Sized> FeeLedger for &T {
    fn fee_status(&self, student_email: &str) -> Option<FeeStatus> {
        (**self).fee_status(student_email)
    }
}

/// Caller contract violations. Business rejections are never errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EligibilityError {
    #[error("student email must not be empty")]
    MissingStudentEmail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DecisionKind {
    Eligible,
    ExamNotFound,
    NotRegistered,
    InsufficientAttendance,
    FeeDefaulter,
}

impl DecisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionKind::Eligible => "eligible",
            DecisionKind::ExamNotFound => "exam_not_found",
            DecisionKind::NotRegistered => "not_registered",
            DecisionKind::InsufficientAttendance => "insufficient_attendance",
            DecisionKind::FeeDefaulter => "fee_defaulter",
        }
    }
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a scan was turned away. `Display` renders the message shown to the student.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    ExamNotFound,
    NotRegistered { course_code: String },
    InsufficientAttendance { course_code: String, required: f64 },
    FeeDefaulter,
}

impl Rejection {
    pub fn kind(&self) -> DecisionKind {
        match self {
            Rejection::ExamNotFound => DecisionKind::ExamNotFound,
            Rejection::NotRegistered { .. } => DecisionKind::NotRegistered,
            Rejection::InsufficientAttendance { .. } => DecisionKind::InsufficientAttendance,
            Rejection::FeeDefaulter => DecisionKind::FeeDefaulter,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::ExamNotFound => write!(f, "Invalid Exam QR Code. Exam not found."),
            Rejection::NotRegistered { course_code } => {
                write!(f, "You are not registered for the {course_code} exam.")
            }
            Rejection::InsufficientAttendance {
                course_code,
                required,
            } => write!(
                f,
                "Short attendance in {course_code}. Minimum {required}% required."
            ),
            Rejection::FeeDefaulter => {
                write!(f, "You are a fee defaulter. Please clear your dues.")
            }
        }
    }
}

/// The verdict for one scan.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationResult {
    Eligible(Exam),
    Rejected(Rejection),
}

impl VerificationResult {
    pub fn success(&self) -> bool {
        matches!(self, VerificationResult::Eligible(_))
    }

    pub fn kind(&self) -> DecisionKind {
        match self {
            VerificationResult::Eligible(_) => DecisionKind::Eligible,
            VerificationResult::Rejected(rejection) => rejection.kind(),
        }
    }

    /// Student-facing reason, present only on rejection.
    pub fn reason(&self) -> Option<String> {
        match self {
            VerificationResult::Eligible(_) => None,
            VerificationResult::Rejected(rejection) => Some(rejection.to_string()),
        }
    }

    /// The matched exam, present only on success.
    pub fn exam_details(&self) -> Option<&Exam> {
        match self {
            VerificationResult::Eligible(exam) => Some(exam),
            VerificationResult::Rejected(_) => None,
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            VerificationResult::Eligible(_) => None,
            VerificationResult::Rejected(rejection) => Some(rejection),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VerificationRecord<'a> {
    success: bool,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exam_details: Option<&'a Exam>,
}

impl Serialize for VerificationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        VerificationRecord {
            success: self.success(),
            kind: self.kind().as_str(),
            reason: self.reason(),
            exam_details: self.exam_details(),
        }
        .serialize(serializer)
    }
}

/// Decides exam entry from the four lookup collaborators. Holds no state of
/// its own, so repeated calls over unchanged data return identical verdicts.
#[derive(Debug, Clone)]
pub struct EligibilityEvaluator<C, R, A, F> {
    catalog: C,
    roster: R,
    attendance: A,
    fees: F,
}

impl<C, R, A, F> EligibilityEvaluator<C, R, A, F>
where
    C: ExamCatalog,
    R: RegistrationRoster,
    A: AttendanceLedger,
    F: FeeLedger,
{
    pub fn new(catalog: C, roster: R, attendance: A, fees: F) -> Self {
        Self {
            catalog,
            roster,
            attendance,
            fees,
        }
    }

    /// `student_email` must already be normalized; it is matched verbatim.
    pub fn evaluate(
        &self,
        exam_id: &str,
        student_email: &str,
    ) -> Result<VerificationResult, EligibilityError> {
        if student_email.trim().is_empty() {
            return Err(EligibilityError::MissingStudentEmail);
        }

        let Some(exam) = self.catalog.find_exam_by_id(exam_id) else {
            debug!(exam_id, "exam not found");
            return Ok(VerificationResult::Rejected(Rejection::ExamNotFound));
        };

        if !self.roster.is_registered(student_email, exam_id) {
            debug!(exam_id, student_email, "student not registered");
            return Ok(VerificationResult::Rejected(Rejection::NotRegistered {
                course_code: exam.course_code,
            }));
        }

        let percentage = self.attendance.attendance(student_email, &exam.course_code);
        if !meets_attendance_threshold(percentage) {
            debug!(
                exam_id,
                student_email,
                course_code = %exam.course_code,
                ?percentage,
                "attendance below threshold"
            );
            return Ok(VerificationResult::Rejected(
                Rejection::InsufficientAttendance {
                    course_code: exam.course_code,
                    required: MIN_ATTENDANCE_REQUIRED,
                },
            ));
        }

        if let Some(status) = self.fees.fee_status(student_email) {
            if status.is_defaulter {
                debug!(student_email, "student is a fee defaulter");
                return Ok(VerificationResult::Rejected(Rejection::FeeDefaulter));
            }
        }

        debug!(exam_id, student_email, "student eligible");
        Ok(VerificationResult::Eligible(exam))
    }
}

/// Missing and non-finite percentages fail.
fn meets_attendance_threshold(percentage: Option<f64>) -> bool {
    matches!(percentage, Some(value) if value.is_finite() && value >= MIN_ATTENDANCE_REQUIRED)
}
