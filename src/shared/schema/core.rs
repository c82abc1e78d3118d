diesel::table! {
    organizations (id) {
        id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    teams (id) {
        id -> Uuid,
        org_id -> Uuid,
        name -> Varchar,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    contracts (id) {
        id -> Uuid,
        org_id -> Uuid,
        user_id -> Nullable<Uuid>,
        full_name -> Varchar,
        email -> Nullable<Varchar>,
        job_title -> Nullable<Varchar>,
        team_id -> Nullable<Uuid>,
        manager_id -> Nullable<Uuid>,
        role -> Varchar,
        birthday -> Nullable<Date>,
        start_date -> Nullable<Date>,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(teams -> organizations (org_id));
diesel::joinable!(contracts -> organizations (org_id));

diesel::allow_tables_to_appear_in_same_query!(organizations, teams, contracts);
