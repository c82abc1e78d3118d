diesel::table! {
    appraisal_cycles (id) {
        id -> Uuid,
        org_id -> Uuid,
        name -> Varchar,
        start_date -> Date,
        end_date -> Date,
        self_review_due_date -> Date,
        manager_review_due_date -> Date,
        template_id -> Uuid,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    question_templates (id) {
        id -> Uuid,
        org_id -> Uuid,
        name -> Varchar,
        group_names -> Jsonb,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    template_questions (id) {
        id -> Uuid,
        template_id -> Uuid,
        group -> Varchar,
        position -> Int4,
        self_text -> Text,
        manager_text -> Text,
        answer_type -> Varchar,
        options -> Nullable<Jsonb>,
        required -> Bool,
        team_ids -> Nullable<Jsonb>,
        contract_ids -> Nullable<Jsonb>,
        scale_labels -> Nullable<Jsonb>,
    }
}

diesel::table! {
    appraisal_answers (id) {
        id -> Uuid,
        org_id -> Uuid,
        cycle_id -> Uuid,
        contract_id -> Uuid,
        status -> Varchar,
        answers -> Jsonb,
        manager_answers -> Jsonb,
        self_direct_score -> Nullable<Int4>,
        manager_direct_score -> Nullable<Int4>,
        objectives -> Jsonb,
        employee_goal_scores -> Jsonb,
        manager_goal_scores -> Jsonb,
        employee_submission_date -> Nullable<Timestamptz>,
        manager_submission_date -> Nullable<Timestamptz>,
        revision -> Int8,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(template_questions -> question_templates (template_id));
diesel::joinable!(appraisal_answers -> appraisal_cycles (cycle_id));

diesel::allow_tables_to_appear_in_same_query!(
    appraisal_cycles,
    question_templates,
    template_questions,
    appraisal_answers,
);
