// Role capability table.
//
// One declarative mapping from role to allowed operations, applied
// uniformly by handlers through `require`. There is no role hierarchy;
// the table below is the entire policy. Denial taxonomy: a missing
// session is 401 (handled by the session middleware before this gate
// runs), a wrong role is 403.

use crate::error::ApiError;
use crate::middleware::SessionUser;
use crate::types::Role;

/// Operations a route can demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageTimetables,
    ViewTimetables,
    ManageStudents,
    ViewStudents,
    ManageTeachers,
    ViewTeachers,
    CreateAssignments,
    ViewAssignments,
    SubmitWork,
    GradeSubmissions,
    ViewSubmissions,
    InitiatePayment,
    VerifyPayment,
    ViewTransactions,
    RecordTransactions,
    PublishContent,
    ViewContent,
    SendMessages,
    GiveFeedback,
    ViewFeedback,
    ManageFees,
    ViewFees,
    ManageAcademicConfig,
    UseAiTools,
}

/// The capability table.
pub fn allowed(role: Role, action: Action) -> bool {
    use Action::*;
    use Role::*;

    match action {
        ManageTimetables => matches!(role, SuperAdmin | SubAdmin),
        ViewTimetables => true,
        ManageStudents => matches!(role, SuperAdmin | SubAdmin),
        ViewStudents => matches!(role, SuperAdmin | SubAdmin | Teacher),
        ManageTeachers => matches!(role, SuperAdmin | SubAdmin),
        ViewTeachers => matches!(role, SuperAdmin | SubAdmin),
        CreateAssignments => matches!(role, SuperAdmin | SubAdmin | Teacher),
        ViewAssignments => true,
        SubmitWork => matches!(role, Student),
        GradeSubmissions => matches!(role, Teacher),
        ViewSubmissions => matches!(role, SuperAdmin | SubAdmin | Teacher | Student),
        InitiatePayment => matches!(role, Student | Parent),
        VerifyPayment => matches!(role, Student | Parent),
        ViewTransactions => matches!(role, SuperAdmin | SubAdmin),
        RecordTransactions => matches!(role, SuperAdmin | SubAdmin),
        PublishContent => matches!(role, SuperAdmin | SubAdmin | Teacher),
        ViewContent => true,
        SendMessages => true,
        GiveFeedback => true,
        ViewFeedback => matches!(role, SuperAdmin | SubAdmin),
        ManageFees => matches!(role, SuperAdmin | SubAdmin),
        ViewFees => true,
        ManageAcademicConfig => matches!(role, SuperAdmin),
        UseAiTools => matches!(role, SuperAdmin | SubAdmin | Teacher),
    }
}

/// Authorization gate: allow or end the pipeline with 403.
pub fn require(user: &SessionUser, action: Action) -> Result<(), ApiError> {
    if allowed(user.role, action) {
        Ok(())
    } else {
        tracing::debug!(role = user.role.as_str(), ?action, "authorization denied");
        Err(ApiError::forbidden("You do not have access to this operation"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ObjectId;

    fn session(role: Role) -> SessionUser {
        SessionUser {
            user_id: ObjectId::new(),
            school_id: ObjectId::new(),
            role,
            name: "test".to_string(),
        }
    }

    #[test]
    fn admins_manage_timetables_students_do_not() {
        assert!(allowed(Role::SuperAdmin, Action::ManageTimetables));
        assert!(allowed(Role::SubAdmin, Action::ManageTimetables));
        assert!(!allowed(Role::Teacher, Action::ManageTimetables));
        assert!(!allowed(Role::Student, Action::ManageTimetables));
        assert!(!allowed(Role::Parent, Action::ManageTimetables));
    }

    #[test]
    fn every_role_views_timetables() {
        for role in [Role::SuperAdmin, Role::SubAdmin, Role::Teacher, Role::Student, Role::Parent] {
            assert!(allowed(role, Action::ViewTimetables));
        }
    }

    #[test]
    fn only_students_and_parents_pay() {
        assert!(allowed(Role::Student, Action::InitiatePayment));
        assert!(allowed(Role::Parent, Action::InitiatePayment));
        assert!(!allowed(Role::Teacher, Action::InitiatePayment));
        assert!(!allowed(Role::SuperAdmin, Action::InitiatePayment));
    }

    #[test]
    fn grading_is_teacher_only() {
        assert!(allowed(Role::Teacher, Action::GradeSubmissions));
        assert!(!allowed(Role::SubAdmin, Action::GradeSubmissions));
        assert!(!allowed(Role::Student, Action::GradeSubmissions));
    }

    #[test]
    fn content_publishing_excludes_students_and_parents() {
        assert!(allowed(Role::Teacher, Action::PublishContent));
        assert!(!allowed(Role::Student, Action::PublishContent));
        assert!(!allowed(Role::Parent, Action::PublishContent));

        for role in [Role::SuperAdmin, Role::SubAdmin, Role::Teacher, Role::Student, Role::Parent] {
            assert!(allowed(role, Action::ViewContent));
            assert!(allowed(role, Action::SendMessages));
            assert!(allowed(role, Action::GiveFeedback));
            assert!(allowed(role, Action::ViewFees));
        }
    }

    #[test]
    fn finance_and_academic_config_are_admin_only() {
        assert!(allowed(Role::SubAdmin, Action::ManageFees));
        assert!(!allowed(Role::Teacher, Action::ManageFees));
        assert!(allowed(Role::SubAdmin, Action::ViewFeedback));
        assert!(!allowed(Role::Teacher, Action::ViewFeedback));
        assert!(allowed(Role::SuperAdmin, Action::ManageAcademicConfig));
        assert!(!allowed(Role::SubAdmin, Action::ManageAcademicConfig));
    }

    #[test]
    fn require_maps_denial_to_forbidden() {
        assert!(require(&session(Role::SubAdmin), Action::ManageStudents).is_ok());

        let err = require(&session(Role::Parent), Action::UseAiTools).unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
    }
}
