diesel::table! {
    time_off (id) {
        id -> Uuid,
        org_id -> Uuid,
        contract_id -> Uuid,
        leave_type -> Varchar,
        status -> Varchar,
        start_date -> Date,
        end_date -> Date,
        reason -> Nullable<Text>,
        approvals -> Jsonb,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    leave_balances (id) {
        id -> Uuid,
        org_id -> Uuid,
        contract_id -> Uuid,
        leave_type -> Varchar,
        year -> Int4,
        allotment -> Numeric,
        used -> Numeric,
    }
}

diesel::allow_tables_to_appear_in_same_query!(time_off, leave_balances);
