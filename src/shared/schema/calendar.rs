diesel::table! {
    calendar_events (id) {
        id -> Uuid,
        org_id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        start_time -> Timestamptz,
        end_time -> Timestamptz,
        location -> Nullable<Varchar>,
        attendee_contract_ids -> Jsonb,
        organizer_contract_id -> Uuid,
        recurrence_rule -> Nullable<Text>,
        external_event_id -> Nullable<Varchar>,
        meeting_link -> Nullable<Varchar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    reminders (id) {
        id -> Uuid,
        org_id -> Uuid,
        contract_id -> Uuid,
        title -> Varchar,
        due_date -> Date,
        done -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::allow_tables_to_appear_in_same_query!(calendar_events, reminders);
