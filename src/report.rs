use std::collections::{HashMap, HashSet};
use std::fmt::Write;

use crate::eligibility::{
    AttendanceLedger, DecisionKind, EligibilityError, EligibilityEvaluator, ExamCatalog,
    FeeLedger, RegistrationRoster, VerificationResult,
};
use crate::models::Exam;

#[derive(Debug, Clone)]
pub struct ExamVerdict {
    pub exam: Exam,
    pub result: VerificationResult,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionSummary {
    pub kind: DecisionKind,
    pub count: usize,
}

/// Runs the evaluator for every exam, earliest exam first. Rows repeating an
/// exam id are skipped; the catalog resolves an id to its first row.
pub fn evaluate_all<C, R, A, F>(
    evaluator: &EligibilityEvaluator<C, R, A, F>,
    exams: &[Exam],
    student_email: &str,
) -> Result<Vec<ExamVerdict>, EligibilityError>
where
    C: ExamCatalog,
    R: RegistrationRoster,
    A: AttendanceLedger,
    F: FeeLedger,
{
    let mut seen = HashSet::new();
    let mut ordered: Vec<Exam> = exams
        .iter()
        .filter(|exam| seen.insert(exam.id.as_str()))
        .cloned()
        .collect();
    ordered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    let mut verdicts = Vec::with_capacity(ordered.len());
    for exam in ordered {
        let result = evaluator.evaluate(&exam.id, student_email)?;
        let exam = result.exam_details().cloned().unwrap_or(exam);
        verdicts.push(ExamVerdict { exam, result });
    }

    Ok(verdicts)
}

pub fn summarize_rejections(verdicts: &[ExamVerdict]) -> Vec<RejectionSummary> {
    let mut map: HashMap<DecisionKind, usize> = HashMap::new();

    for verdict in verdicts {
        if let Some(rejection) = verdict.result.rejection() {
            *map.entry(rejection.kind()).or_insert(0) += 1;
        }
    }

    let mut summaries: Vec<RejectionSummary> = map
        .into_iter()
        .map(|(kind, count)| RejectionSummary { kind, count })
        .collect();

    summaries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.kind.cmp(&b.kind)));
    summaries
}

pub fn build_report(student_email: &str, verdicts: &[ExamVerdict]) -> String {
    let summaries = summarize_rejections(verdicts);
    let (cleared, blocked): (Vec<&ExamVerdict>, Vec<&ExamVerdict>) =
        verdicts.iter().partition(|verdict| verdict.result.success());

    let mut output = String::new();

    let _ = writeln!(output, "# Exam Entry Eligibility Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} scheduled exams)",
        student_email,
        verdicts.len()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Cleared Exams");

    if cleared.is_empty() {
        let _ = writeln!(output, "No exams cleared for entry.");
    } else {
        for verdict in cleared {
            let exam = &verdict.exam;
            let _ = writeln!(
                output,
                "- {} {}: {} at {}, {}",
                exam.course_code, exam.course_title, exam.date, exam.time, exam.room
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Blocked Exams");

    if blocked.is_empty() {
        let _ = writeln!(output, "No exams blocked.");
    } else {
        for verdict in blocked {
            let _ = writeln!(
                output,
                "- {} ({}): {}",
                verdict.exam.course_code,
                verdict.exam.date,
                verdict.result.reason().unwrap_or_default()
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Rejection Mix");

    if summaries.is_empty() {
        let _ = writeln!(output, "No rejections.");
    } else {
        for summary in summaries.iter() {
            let _ = writeln!(output, "- {}: {}", summary.kind, summary.count);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;

    #[test]
    fn evaluates_every_exam_in_date_order() {
        let dataset = Dataset::reference().unwrap();
        let evaluator = EligibilityEvaluator::over(&dataset);
        let mut exams = dataset.exams.clone();
        exams.reverse();

        let verdicts = evaluate_all(&evaluator, &exams, "test@university.edu.pk").unwrap();
        let codes: Vec<&str> = verdicts
            .iter()
            .map(|verdict| verdict.exam.course_code.as_str())
            .collect();
        assert_eq!(codes, vec!["CS101", "MA201", "PH101"]);
        assert!(verdicts[0].result.success());
        assert_eq!(verdicts[1].result.kind(), DecisionKind::InsufficientAttendance);
        assert_eq!(verdicts[2].result.kind(), DecisionKind::NotRegistered);
    }

    #[test]
    fn duplicate_exam_ids_yield_one_consistent_verdict() {
        let mut dataset = Dataset::reference().unwrap();
        let mut shadow = dataset.exams[0].clone();
        shadow.course_code = "CS999".to_string();
        shadow.room = "Annex".to_string();
        dataset.exams.push(shadow);

        let evaluator = EligibilityEvaluator::over(&dataset);
        let verdicts =
            evaluate_all(&evaluator, &dataset.exams, "test@university.edu.pk").unwrap();

        let cs101: Vec<&ExamVerdict> = verdicts
            .iter()
            .filter(|verdict| verdict.exam.id == "exam_cs101_midterm_fall2025")
            .collect();
        assert_eq!(cs101.len(), 1);
        assert_eq!(cs101[0].exam.course_code, "CS101");
        assert_eq!(cs101[0].result.exam_details(), Some(&cs101[0].exam));
        assert_eq!(verdicts.len(), 3);
    }

    #[test]
    fn rejection_mix_counts_by_kind() {
        let dataset = Dataset::reference().unwrap();
        let evaluator = EligibilityEvaluator::over(&dataset);
        let verdicts =
            evaluate_all(&evaluator, &dataset.exams, "newcomer@university.edu.pk").unwrap();

        let summaries = summarize_rejections(&verdicts);
        assert_eq!(
            summaries,
            vec![RejectionSummary {
                kind: DecisionKind::NotRegistered,
                count: 3
            }]
        );
    }

    #[test]
    fn report_lists_cleared_and_blocked_exams() {
        let dataset = Dataset::reference().unwrap();
        let evaluator = EligibilityEvaluator::over(&dataset);
        let verdicts = evaluate_all(&evaluator, &dataset.exams, "test@university.edu.pk").unwrap();

        let report = build_report("test@university.edu.pk", &verdicts);
        assert!(report.starts_with("# Exam Entry Eligibility Report"));
        assert!(report.contains("Generated for test@university.edu.pk (3 scheduled exams)"));
        assert!(report
            .contains("- CS101 Programming Fundamentals: 2025-08-10 at 09:00 AM, Lab 101"));
        assert!(report
            .contains("- MA201 (2025-08-12): Short attendance in MA201. Minimum 75% required."));
        assert!(report.contains("- PH101 (2025-08-15): You are not registered for the PH101 exam."));
        assert!(report.contains("- not_registered: 1"));
        assert!(report.contains("- insufficient_attendance: 1"));
    }

    #[test]
    fn empty_report_has_placeholders() {
        let report = build_report("test@university.edu.pk", &[]);
        assert!(report.contains("No exams cleared for entry."));
        assert!(report.contains("No exams blocked."));
        assert!(report.contains("No rejections."));
    }
}
