use exam_entry::{
    Dataset, DecisionKind, EligibilityEvaluator, Rejection, VerificationResult,
};

const TEST_STUDENT: &str = "test@university.edu.pk";
const ANOTHER_STUDENT: &str = "another@university.edu.pk";

fn verify(exam_id: &str, student_email: &str) -> VerificationResult {
    let dataset = Dataset::reference().unwrap();
    EligibilityEvaluator::over(&dataset)
        .evaluate(exam_id, student_email)
        .expect("inputs are well-formed")
}

#[test]
fn registered_student_with_attendance_is_admitted() {
    let result = verify("exam_cs101_midterm_fall2025", TEST_STUDENT);
    assert!(result.success());
    assert_eq!(result.reason(), None);
    let exam = result.exam_details().expect("exam details on success");
    assert_eq!(exam.course_code, "CS101");
    assert_eq!(exam.room, "Lab 101");
}

#[test]
fn short_attendance_is_rejected() {
    let result = verify("exam_ma201_final_fall2025", TEST_STUDENT);
    assert!(!result.success());
    assert!(result.exam_details().is_none());
    assert_eq!(
        result.reason().as_deref(),
        Some("Short attendance in MA201. Minimum 75% required.")
    );
}

#[test]
fn unregistered_student_is_rejected_despite_attendance() {
    let result = verify("exam_ph101_midterm_fall2025", TEST_STUDENT);
    assert_eq!(
        result,
        VerificationResult::Rejected(Rejection::NotRegistered {
            course_code: "PH101".to_string()
        })
    );
    assert_eq!(
        result.reason().as_deref(),
        Some("You are not registered for the PH101 exam.")
    );
}

#[test]
fn unknown_exam_code_is_rejected() {
    let result = verify("invalid_exam_id", TEST_STUDENT);
    assert_eq!(result.kind(), DecisionKind::ExamNotFound);
    assert_eq!(
        result.reason().as_deref(),
        Some("Invalid Exam QR Code. Exam not found.")
    );
}

#[test]
fn fee_defaulter_is_rejected_after_other_checks_pass() {
    let result = verify("exam_cs101_midterm_fall2025", ANOTHER_STUDENT);
    assert_eq!(result.kind(), DecisionKind::FeeDefaulter);
    assert_eq!(
        result.reason().as_deref(),
        Some("You are a fee defaulter. Please clear your dues.")
    );
}

#[test]
fn evaluator_is_shareable_across_threads() {
    let dataset = Dataset::reference().unwrap();
    let evaluator = EligibilityEvaluator::over(&dataset);

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    evaluator
                        .evaluate("exam_ma201_final_fall2025", TEST_STUDENT)
                        .map(|result| result.kind())
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(
                handle.join().unwrap(),
                Ok(DecisionKind::InsufficientAttendance)
            );
        }
    });
}
