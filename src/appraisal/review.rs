//! Edit/view rules for appraisal reviews.
//!
//! All decisions are pure functions over the cycle dates, the answer row's
//! submission timestamps, and the viewer's relationship to the employee, so
//! the same rules back both question rendering and the submission gate.

use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use uuid::Uuid;

pub const GROUP_GROWTH: &str = "growth_and_development";
pub const GROUP_VALUES: &str = "company_values";
pub const GROUP_COMPETENCIES: &str = "competencies";
pub const GROUP_PRIVATE_MANAGER: &str = "private_manager_assessment";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewType {
    SelfReview,
    Manager,
}

/// Everything the rules need to know about one (viewer, employee, cycle,
/// answer) combination.
#[derive(Debug, Clone)]
pub struct ReviewContext {
    pub viewer_contract_id: Uuid,
    pub employee_contract_id: Uuid,
    pub employee_manager_id: Option<Uuid>,
    pub self_review_due_date: NaiveDate,
    pub manager_review_due_date: NaiveDate,
    pub employee_submission_date: Option<DateTime<Utc>>,
    pub manager_submission_date: Option<DateTime<Utc>>,
    pub today: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditDenied {
    DueDatePassed,
    ManagerReviewSubmitted,
    AlreadySubmitted,
    NotTheEmployee,
    NotTheManager,
}

impl fmt::Display for EditDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DueDatePassed => write!(f, "due date passed"),
            Self::ManagerReviewSubmitted => {
                write!(f, "manager review has been submitted; self review is locked")
            }
            Self::AlreadySubmitted => write!(f, "review has already been submitted"),
            Self::NotTheEmployee => write!(f, "only the employee can edit the self review"),
            Self::NotTheManager => {
                write!(f, "only the employee's manager can edit the manager review")
            }
        }
    }
}

impl ReviewContext {
    pub fn is_self(&self) -> bool {
        self.viewer_contract_id == self.employee_contract_id
    }

    pub fn is_manager(&self) -> bool {
        self.employee_manager_id == Some(self.viewer_contract_id)
    }

    fn due_date(&self, review_type: ReviewType) -> NaiveDate {
        match review_type {
            ReviewType::SelfReview => self.self_review_due_date,
            ReviewType::Manager => self.manager_review_due_date,
        }
    }

    pub fn due_date_passed(&self, review_type: ReviewType) -> bool {
        self.today > self.due_date(review_type)
    }

    /// First matching rule wins; callers surface the variant's message as-is.
    pub fn can_edit(&self, review_type: ReviewType) -> Result<(), EditDenied> {
        if self.due_date_passed(review_type) {
            return Err(EditDenied::DueDatePassed);
        }
        match review_type {
            ReviewType::SelfReview => {
                if !self.is_self() {
                    return Err(EditDenied::NotTheEmployee);
                }
                // Manager sign-off freezes the self review even before its
                // own due date.
                if self.manager_submission_date.is_some() {
                    return Err(EditDenied::ManagerReviewSubmitted);
                }
                Ok(())
            }
            ReviewType::Manager => {
                if !self.is_manager() {
                    return Err(EditDenied::NotTheManager);
                }
                if self.manager_submission_date.is_some() {
                    return Err(EditDenied::AlreadySubmitted);
                }
                Ok(())
            }
        }
    }

    pub fn can_view(&self, review_type: ReviewType) -> bool {
        match review_type {
            ReviewType::SelfReview => self.is_self() || self.employee_submission_date.is_some(),
            ReviewType::Manager => self.is_manager() || self.manager_submission_date.is_some(),
        }
    }

    /// The private manager group never appears in the self-review flow and is
    /// only served to the employee's manager.
    pub fn group_visible(&self, group: &str, review_type: ReviewType) -> bool {
        if group == GROUP_PRIVATE_MANAGER {
            review_type == ReviewType::Manager && self.is_manager()
        } else {
            true
        }
    }
}

/// Team/employee targeting on individual questions. An empty restriction
/// list means "everyone".
pub fn question_targets_employee(
    team_ids: Option<&[Uuid]>,
    contract_ids: Option<&[Uuid]>,
    employee_team_id: Option<Uuid>,
    employee_contract_id: Uuid,
) -> bool {
    let team_ok = match team_ids {
        None => true,
        Some(ids) if ids.is_empty() => true,
        Some(ids) => employee_team_id.map(|t| ids.contains(&t)).unwrap_or(false),
    };
    let contract_ok = match contract_ids {
        None => true,
        Some(ids) if ids.is_empty() => true,
        Some(ids) => ids.contains(&employee_contract_id),
    };
    team_ok && contract_ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ctx() -> ReviewContext {
        ReviewContext {
            viewer_contract_id: Uuid::new_v4(),
            employee_contract_id: Uuid::new_v4(),
            employee_manager_id: Some(Uuid::new_v4()),
            self_review_due_date: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            manager_review_due_date: NaiveDate::from_ymd_opt(2026, 7, 15).unwrap(),
            employee_submission_date: None,
            manager_submission_date: None,
            today: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
        }
    }

    fn submitted_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn employee_can_edit_own_open_self_review() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_contract_id;
        assert!(c.can_edit(ReviewType::SelfReview).is_ok());
    }

    #[test]
    fn self_review_locks_after_due_date() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_contract_id;
        c.today = NaiveDate::from_ymd_opt(2026, 7, 1).unwrap();
        assert_eq!(
            c.can_edit(ReviewType::SelfReview),
            Err(EditDenied::DueDatePassed)
        );
    }

    #[test]
    fn due_date_itself_is_still_editable() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_contract_id;
        c.today = c.self_review_due_date;
        assert!(c.can_edit(ReviewType::SelfReview).is_ok());
    }

    #[test]
    fn manager_submission_locks_self_review_before_due_date() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_contract_id;
        c.manager_submission_date = Some(submitted_at());
        assert_eq!(
            c.can_edit(ReviewType::SelfReview),
            Err(EditDenied::ManagerReviewSubmitted)
        );
    }

    #[test]
    fn employee_own_submission_does_not_lock_self_review() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_contract_id;
        c.employee_submission_date = Some(submitted_at());
        assert!(c.can_edit(ReviewType::SelfReview).is_ok());
    }

    #[test]
    fn only_manager_edits_manager_review() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_contract_id;
        assert_eq!(
            c.can_edit(ReviewType::Manager),
            Err(EditDenied::NotTheManager)
        );

        c.viewer_contract_id = c.employee_manager_id.unwrap();
        assert!(c.can_edit(ReviewType::Manager).is_ok());

        c.manager_submission_date = Some(submitted_at());
        assert_eq!(
            c.can_edit(ReviewType::Manager),
            Err(EditDenied::AlreadySubmitted)
        );
    }

    #[test]
    fn due_date_rule_beats_role_rules() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_manager_id.unwrap();
        c.today = NaiveDate::from_ymd_opt(2026, 8, 1).unwrap();
        assert_eq!(
            c.can_edit(ReviewType::Manager),
            Err(EditDenied::DueDatePassed)
        );
    }

    #[test]
    fn self_answers_visible_to_others_only_after_submission() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_manager_id.unwrap();
        assert!(!c.can_view(ReviewType::SelfReview));
        c.employee_submission_date = Some(submitted_at());
        assert!(c.can_view(ReviewType::SelfReview));
    }

    #[test]
    fn manager_answers_hidden_until_manager_submits() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_contract_id;
        assert!(!c.can_view(ReviewType::Manager));
        c.manager_submission_date = Some(submitted_at());
        assert!(c.can_view(ReviewType::Manager));
    }

    #[test]
    fn private_group_only_in_manager_flow() {
        let mut c = ctx();
        c.viewer_contract_id = c.employee_manager_id.unwrap();
        assert!(c.group_visible(GROUP_PRIVATE_MANAGER, ReviewType::Manager));
        assert!(!c.group_visible(GROUP_PRIVATE_MANAGER, ReviewType::SelfReview));

        c.viewer_contract_id = c.employee_contract_id;
        assert!(!c.group_visible(GROUP_PRIVATE_MANAGER, ReviewType::Manager));
        assert!(c.group_visible(GROUP_GROWTH, ReviewType::SelfReview));
    }

    #[test]
    fn question_targeting() {
        let team = Uuid::new_v4();
        let employee = Uuid::new_v4();

        assert!(question_targets_employee(None, None, Some(team), employee));
        assert!(question_targets_employee(
            Some(&[team]),
            None,
            Some(team),
            employee
        ));
        assert!(!question_targets_employee(
            Some(&[Uuid::new_v4()]),
            None,
            Some(team),
            employee
        ));
        assert!(!question_targets_employee(
            Some(&[team]),
            None,
            None,
            employee
        ));
        assert!(question_targets_employee(
            None,
            Some(&[employee]),
            None,
            employee
        ));
        assert!(!question_targets_employee(
            None,
            Some(&[Uuid::new_v4()]),
            None,
            employee
        ));
        // empty restriction lists mean unrestricted
        assert!(question_targets_employee(Some(&[]), Some(&[]), None, employee));
    }
}
