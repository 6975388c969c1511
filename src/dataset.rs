use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::eligibility::{
    AttendanceLedger, EligibilityEvaluator, ExamCatalog, FeeLedger, RegistrationRoster,
};
use crate::models::{normalize_email, AttendanceRecord, Exam, ExamRegistration, FeeStatus};

pub const EXAMS_FILE: &str = "exams.csv";
pub const REGISTRATIONS_FILE: &str = "registrations.csv";
pub const ATTENDANCE_FILE: &str = "attendance.csv";
pub const FEE_STATUS_FILE: &str = "fee_status.csv";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("attendance for {student_email} in {course_code} is {percentage}, expected 0-100")]
    AttendanceOutOfRange {
        student_email: String,
        course_code: String,
        percentage: f64,
    },
}

/// Exams, registrations, attendance and fee records held in memory.
///
/// Lookups scan the tables in order and the first matching row wins.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub exams: Vec<Exam>,
    pub registrations: Vec<ExamRegistration>,
    pub attendance: Vec<AttendanceRecord>,
    pub fee_statuses: Vec<FeeStatus>,
}

impl ExamCatalog for Dataset {
    fn find_exam_by_id(&self, id: &str) -> Option<Exam> {
        self.exams.iter().find(|exam| exam.id == id).cloned()
    }
}

impl RegistrationRoster for Dataset {
    fn is_registered(&self, student_email: &str, exam_id: &str) -> bool {
        self.registrations
            .iter()
            .any(|reg| reg.student_email == student_email && reg.exam_id == exam_id)
    }
}

impl AttendanceLedger for Dataset {
    fn attendance(&self, student_email: &str, course_code: &str) -> Option<f64> {
        self.attendance
            .iter()
            .find(|att| att.student_email == student_email && att.course_code == course_code)
            .map(|att| att.percentage)
    }
}

impl FeeLedger for Dataset {
    fn fee_status(&self, student_email: &str) -> Option<FeeStatus> {
        self.fee_statuses
            .iter()
            .find(|fee| fee.student_email == student_email)
            .cloned()
    }
}

impl<'a> EligibilityEvaluator<&'a Dataset, &'a Dataset, &'a Dataset, &'a Dataset> {
    /// Evaluator backed entirely by one dataset.
    pub fn over(dataset: &'a Dataset) -> Self {
        EligibilityEvaluator::new(dataset, dataset, dataset, dataset)
    }
}

const REFERENCE_EXAMS: &str = "\
id,course_code,course_title,date,time,room,semester
exam_cs101_midterm_fall2025,CS101,Programming Fundamentals,2025-08-10,09:00 AM,Lab 101,Fall 2025
exam_ma201_final_fall2025,MA201,Calculus I,2025-08-12,02:00 PM,Auditorium A,Fall 2025
exam_ph101_midterm_fall2025,PH101,Applied Physics,2025-08-15,09:00 AM,Hall B,Fall 2025
";

const REFERENCE_REGISTRATIONS: &str = "\
student_email,exam_id
test@university.edu.pk,exam_cs101_midterm_fall2025
test@university.edu.pk,exam_ma201_final_fall2025
another@university.edu.pk,exam_cs101_midterm_fall2025
";

const REFERENCE_ATTENDANCE: &str = "\
student_email,course_code,percentage
test@university.edu.pk,CS101,90
test@university.edu.pk,MA201,60
test@university.edu.pk,PH101,85
another@university.edu.pk,CS101,88
";

const REFERENCE_FEE_STATUS: &str = "\
student_email,is_defaulter
test@university.edu.pk,false
another@university.edu.pk,true
";

impl Dataset {
    /// Fall 2025 reference data used by `seed`, `--reference` and tests.
    pub fn reference() -> Result<Self, DatasetError> {
        Self::from_readers(
            REFERENCE_EXAMS.as_bytes(),
            REFERENCE_REGISTRATIONS.as_bytes(),
            REFERENCE_ATTENDANCE.as_bytes(),
            REFERENCE_FEE_STATUS.as_bytes(),
        )
    }

    /// Loads `exams.csv`, `registrations.csv`, `attendance.csv` and
    /// `fee_status.csv` from `dir`.
    pub fn from_csv_dir(dir: &Path) -> Result<Self, DatasetError> {
        let open = |name: &str| {
            let path = dir.join(name);
            std::fs::File::open(&path).map_err(|source| DatasetError::Open {
                path: path.display().to_string(),
                source,
            })
        };

        let dataset = Self::from_readers(
            open(EXAMS_FILE)?,
            open(REGISTRATIONS_FILE)?,
            open(ATTENDANCE_FILE)?,
            open(FEE_STATUS_FILE)?,
        )?;

        info!(
            dir = %dir.display(),
            exams = dataset.exams.len(),
            registrations = dataset.registrations.len(),
            attendance = dataset.attendance.len(),
            fee_statuses = dataset.fee_statuses.len(),
            "dataset loaded"
        );
        Ok(dataset)
    }

    pub fn from_readers<E, R, A, F>(
        exams: E,
        registrations: R,
        attendance: A,
        fee_statuses: F,
    ) -> Result<Self, DatasetError>
    where
        E: Read,
        R: Read,
        A: Read,
        F: Read,
    {
        Ok(Dataset {
            exams: read_exams(exams)?,
            registrations: read_registrations(registrations)?,
            attendance: read_attendance(attendance)?,
            fee_statuses: read_fee_statuses(fee_statuses)?,
        })
    }
}

#[derive(Deserialize)]
struct ExamRow {
    id: String,
    course_code: String,
    course_title: String,
    date: NaiveDate,
    time: String,
    room: String,
    semester: String,
}

#[derive(Deserialize)]
struct RegistrationRow {
    student_email: String,
    exam_id: String,
}

#[derive(Deserialize)]
struct AttendanceRow {
    student_email: String,
    course_code: String,
    percentage: f64,
}

#[derive(Deserialize)]
struct FeeStatusRow {
    student_email: String,
    is_defaulter: bool,
}

pub fn read_exams<R: Read>(reader: R) -> Result<Vec<Exam>, DatasetError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut exams = Vec::new();

    for result in reader.deserialize::<ExamRow>() {
        let row = result?;
        exams.push(Exam {
            id: row.id,
            course_code: row.course_code,
            course_title: row.course_title,
            date: row.date,
            time: row.time,
            room: row.room,
            semester: row.semester,
        });
    }

    Ok(exams)
}

pub fn read_registrations<R: Read>(reader: R) -> Result<Vec<ExamRegistration>, DatasetError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut registrations = Vec::new();

    for result in reader.deserialize::<RegistrationRow>() {
        let row = result?;
        registrations.push(ExamRegistration {
            student_email: normalize_email(&row.student_email),
            exam_id: row.exam_id,
        });
    }

    Ok(registrations)
}

pub fn read_attendance<R: Read>(reader: R) -> Result<Vec<AttendanceRecord>, DatasetError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();

    for result in reader.deserialize::<AttendanceRow>() {
        let row = result?;
        let student_email = normalize_email(&row.student_email);
        if !(0.0..=100.0).contains(&row.percentage) {
            return Err(DatasetError::AttendanceOutOfRange {
                student_email,
                course_code: row.course_code,
                percentage: row.percentage,
            });
        }
        records.push(AttendanceRecord {
            student_email,
            course_code: row.course_code,
            percentage: row.percentage,
        });
    }

    Ok(records)
}

pub fn read_fee_statuses<R: Read>(reader: R) -> Result<Vec<FeeStatus>, DatasetError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut statuses = Vec::new();

    for result in reader.deserialize::<FeeStatusRow>() {
        let row = result?;
        statuses.push(FeeStatus {
            student_email: normalize_email(&row.student_email),
            is_defaulter: row.is_defaulter,
        });
    }

    Ok(statuses)
}
