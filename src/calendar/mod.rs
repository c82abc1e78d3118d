//! Calendar events plus the merged per-day view (events, approved leave,
//! reminders, birthdays).

pub mod recurrence;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use diesel::prelude::*;
use icalendar::{Component, Event as IcalEvent, EventLike};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::shared::schema::{calendar_events, contracts, reminders, time_off};
use crate::shared::state::AppState;
use crate::shared::utils::{db_conn, parse_date, viewer_contract_id};
use recurrence::RecurrenceConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable, AsChangeset)]
#[diesel(table_name = calendar_events)]
pub struct CalendarEvent {
    pub id: Uuid,
    pub org_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    pub attendee_contract_ids: Value,
    pub organizer_contract_id: Uuid,
    pub recurrence_rule: Option<String>,
    pub external_event_id: Option<String>,
    pub meeting_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Insertable)]
#[diesel(table_name = reminders)]
pub struct Reminder {
    pub id: Uuid,
    pub org_id: Uuid,
    pub contract_id: Uuid,
    pub title: String,
    pub due_date: NaiveDate,
    pub done: bool,
    pub created_at: DateTime<Utc>,
}

impl CalendarEvent {
    pub fn to_ical(&self) -> IcalEvent {
        let mut event = IcalEvent::new();
        event.uid(&self.id.to_string());
        event.summary(&self.title);
        event.starts(self.start_time);
        event.ends(self.end_time);
        if let Some(ref desc) = self.description {
            event.description(desc);
        }
        if let Some(ref location) = self.location {
            event.location(location);
        }
        if let Some(ref rrule) = self.recurrence_rule {
            event.add_property("RRULE", rrule);
        }
        event.done()
    }
}

#[derive(Debug, Deserialize)]
pub struct CalendarEventInput {
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub location: Option<String>,
    #[serde(default)]
    pub attendee_contract_ids: Vec<Uuid>,
    pub recurrence_rule: Option<String>,
}

/// An unmirrored event is created remotely; a mirrored one is updated in
/// place so no duplicate remote event appears.
fn mirror_endpoint(base: &str, external_id: Option<&str>) -> (reqwest::Method, String) {
    match external_id {
        Some(id) => (reqwest::Method::PUT, format!("{base}/events/{id}")),
        None => (reqwest::Method::POST, format!("{base}/events")),
    }
}

/// Mirrors an event to the external calendar API. Best effort: any failure
/// is logged and the local row stands on its own.
async fn mirror_event(
    state: &AppState,
    event: &CalendarEvent,
) -> Option<(String, Option<String>)> {
    let base = state.config.calendar_api_base.as_ref()?;
    let client = reqwest::Client::new();
    let payload = serde_json::json!({
        "summary": event.title,
        "description": event.description,
        "start": event.start_time.to_rfc3339(),
        "end": event.end_time.to_rfc3339(),
        "recurrence": event.recurrence_rule,
    });

    let (method, url) = mirror_endpoint(base, event.external_event_id.as_deref());
    let response = client.request(method, url).json(&payload).send().await;

    match response {
        Ok(resp) if resp.status().is_success() => {
            let body: Value = resp.json().await.ok()?;
            // Update responses may omit the id; the known one stands.
            let remote_id = body
                .get("id")
                .and_then(|v| v.as_str())
                .map(String::from)
                .or_else(|| event.external_event_id.clone())?;
            let link = body
                .get("meetingLink")
                .and_then(|v| v.as_str())
                .map(String::from)
                .or_else(|| event.meeting_link.clone());
            Some((remote_id, link))
        }
        Ok(resp) => {
            error!("external calendar rejected event {}: {}", event.id, resp.status());
            None
        }
        Err(e) => {
            error!("external calendar unreachable for event {}: {e}", event.id);
            None
        }
    }
}

async fn mirror_event_delete(state: &AppState, external_id: &str) {
    let Some(base) = state.config.calendar_api_base.as_ref() else {
        return;
    };
    let client = reqwest::Client::new();
    if let Err(e) = client
        .delete(format!("{base}/events/{external_id}"))
        .send()
        .await
    {
        error!("external calendar delete failed for {external_id}: {e}");
    }
}

pub async fn create_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(input): Json<CalendarEventInput>,
) -> Result<Json<CalendarEvent>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    if let Some(ref rule) = input.recurrence_rule {
        RecurrenceConfig::parse(rule)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid recurrence rule: {e}")))?;
    }
    if input.end_time <= input.start_time {
        return Err((
            StatusCode::BAD_REQUEST,
            "end_time must be after start_time".to_string(),
        ));
    }

    let org_id: Uuid = contracts::table
        .filter(contracts::id.eq(viewer))
        .select(contracts::org_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let now = Utc::now();
    let mut event = CalendarEvent {
        id: Uuid::new_v4(),
        org_id,
        title: input.title,
        description: input.description,
        start_time: input.start_time,
        end_time: input.end_time,
        location: input.location,
        attendee_contract_ids: serde_json::json!(input.attendee_contract_ids),
        organizer_contract_id: viewer,
        recurrence_rule: input.recurrence_rule,
        external_event_id: None,
        meeting_link: None,
        created_at: now,
        updated_at: now,
    };

    if let Some((remote_id, link)) = mirror_event(&state, &event).await {
        event.external_event_id = Some(remote_id);
        event.meeting_link = link;
    }

    diesel::insert_into(calendar_events::table)
        .values(&event)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    info!("calendar event '{}' created by {viewer}", event.title);
    Ok(Json(event))
}

pub async fn update_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(input): Json<CalendarEventInput>,
) -> Result<Json<CalendarEvent>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let existing: CalendarEvent = calendar_events::table
        .filter(calendar_events::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Event not found".to_string()))?;

    if existing.organizer_contract_id != viewer {
        return Err((
            StatusCode::FORBIDDEN,
            "only the organizer can edit this event".to_string(),
        ));
    }
    if let Some(ref rule) = input.recurrence_rule {
        RecurrenceConfig::parse(rule)
            .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid recurrence rule: {e}")))?;
    }

    let now = Utc::now();
    diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
        .set((
            calendar_events::title.eq(&input.title),
            calendar_events::description.eq(&input.description),
            calendar_events::start_time.eq(input.start_time),
            calendar_events::end_time.eq(input.end_time),
            calendar_events::location.eq(&input.location),
            calendar_events::attendee_contract_ids.eq(serde_json::json!(input.attendee_contract_ids)),
            calendar_events::recurrence_rule.eq(&input.recurrence_rule),
            calendar_events::updated_at.eq(now),
        ))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    let mut updated: CalendarEvent = calendar_events::table
        .filter(calendar_events::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Event not found".to_string()))?;

    // Push the new shape to the external calendar; an event that never got
    // mirrored gets another chance here.
    if let Some((remote_id, link)) = mirror_event(&state, &updated).await {
        if updated.external_event_id.as_deref() != Some(remote_id.as_str())
            || updated.meeting_link != link
        {
            diesel::update(calendar_events::table.filter(calendar_events::id.eq(id)))
                .set((
                    calendar_events::external_event_id.eq(Some(remote_id.clone())),
                    calendar_events::meeting_link.eq(&link),
                ))
                .execute(&mut conn)
                .map_err(|e| {
                    (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}"))
                })?;
            updated.external_event_id = Some(remote_id);
            updated.meeting_link = link;
        }
    }

    Ok(Json(updated))
}

pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let existing: CalendarEvent = calendar_events::table
        .filter(calendar_events::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Event not found".to_string()))?;

    if existing.organizer_contract_id != viewer {
        return Err((
            StatusCode::FORBIDDEN,
            "only the organizer can delete this event".to_string(),
        ));
    }

    diesel::delete(calendar_events::table.filter(calendar_events::id.eq(id)))
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Delete error: {e}")))?;

    if let Some(ref external_id) = existing.external_event_id {
        mirror_event_delete(&state, external_id).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_event_ical(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<String, (StatusCode, String)> {
    let mut conn = db_conn(&state.conn)?;

    let event: CalendarEvent = calendar_events::table
        .filter(calendar_events::id.eq(id))
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Event not found".to_string()))?;

    let calendar: icalendar::Calendar = [event.to_ical()].into_iter().collect();
    Ok(calendar.to_string())
}

/// Whether an event shows up on `date`. A plain event covers every day of
/// its `[first, last]` span; a recurring one follows its rule, with each
/// occurrence anchored at the span's first day.
fn event_occurs_on(
    first: NaiveDate,
    last: NaiveDate,
    rule: Option<&str>,
    date: NaiveDate,
) -> bool {
    match rule {
        Some(rule) => match RecurrenceConfig::parse(rule) {
            Ok(config) => !config.occurrences_between(first, date, date).is_empty(),
            Err(_) => first <= date && date <= last,
        },
        None => first <= date && date <= last,
    }
}

#[derive(Debug, Deserialize)]
pub struct DayViewQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct DayEventEntry {
    pub event_id: Uuid,
    pub title: String,
    pub meeting_link: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DayLeaveEntry {
    pub contract_id: Uuid,
    pub leave_type: String,
}

#[derive(Debug, Serialize)]
pub struct DayReminderEntry {
    pub reminder_id: Uuid,
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct DayBirthdayEntry {
    pub contract_id: Uuid,
    pub full_name: String,
}

#[derive(Debug, Serialize)]
pub struct DayView {
    pub date: NaiveDate,
    pub events: Vec<DayEventEntry>,
    pub leave: Vec<DayLeaveEntry>,
    pub reminders: Vec<DayReminderEntry>,
    pub birthdays: Vec<DayBirthdayEntry>,
}

/// Merges events (with recurrence expanded), approved leave, reminders and
/// birthdays into one entry per day of the window.
pub async fn day_view(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<DayViewQuery>,
) -> Result<Json<Vec<DayView>>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let from = parse_date(&query.from, "from")?;
    let to = parse_date(&query.to, "to")?;
    if to < from || (to - from).num_days() > 366 {
        return Err((StatusCode::BAD_REQUEST, "Invalid date window".to_string()));
    }

    let org_id: Uuid = contracts::table
        .filter(contracts::id.eq(viewer))
        .select(contracts::org_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let events: Vec<CalendarEvent> = calendar_events::table
        .filter(calendar_events::org_id.eq(org_id))
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let approved_leave: Vec<crate::timeoff::TimeOff> = time_off::table
        .filter(time_off::org_id.eq(org_id))
        .filter(time_off::status.eq("approved"))
        .filter(time_off::start_date.le(to))
        .filter(time_off::end_date.ge(from))
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let due_reminders: Vec<Reminder> = reminders::table
        .filter(reminders::org_id.eq(org_id))
        .filter(reminders::done.eq(false))
        .filter(reminders::due_date.ge(from))
        .filter(reminders::due_date.le(to))
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let people: Vec<(Uuid, String, Option<NaiveDate>)> = contracts::table
        .filter(contracts::org_id.eq(org_id))
        .filter(contracts::is_active.eq(true))
        .select((contracts::id, contracts::full_name, contracts::birthday))
        .load(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Query error: {e}")))?;

    let mut days = vec![];
    let mut date = from;
    while date <= to {
        let mut day = DayView {
            date,
            events: vec![],
            leave: vec![],
            reminders: vec![],
            birthdays: vec![],
        };

        for event in &events {
            let occurs = event_occurs_on(
                event.start_time.date_naive(),
                event.end_time.date_naive(),
                event.recurrence_rule.as_deref(),
                date,
            );
            if occurs {
                day.events.push(DayEventEntry {
                    event_id: event.id,
                    title: event.title.clone(),
                    meeting_link: event.meeting_link.clone(),
                });
            }
        }

        for request in &approved_leave {
            if request.start_date <= date && date <= request.end_date {
                day.leave.push(DayLeaveEntry {
                    contract_id: request.contract_id,
                    leave_type: request.leave_type.clone(),
                });
            }
        }

        for reminder in &due_reminders {
            if reminder.due_date == date {
                day.reminders.push(DayReminderEntry {
                    reminder_id: reminder.id,
                    title: reminder.title.clone(),
                });
            }
        }

        for (contract_id, full_name, birthday) in &people {
            if let Some(birthday) = birthday {
                if birthday.month() == date.month() && birthday.day() == date.day() {
                    day.birthdays.push(DayBirthdayEntry {
                        contract_id: *contract_id,
                        full_name: full_name.clone(),
                    });
                }
            }
        }

        days.push(day);
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    Ok(Json(days))
}

#[derive(Debug, Deserialize)]
pub struct CreateReminderRequest {
    pub title: String,
    pub due_date: NaiveDate,
}

pub async fn create_reminder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateReminderRequest>,
) -> Result<Json<Reminder>, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let org_id: Uuid = contracts::table
        .filter(contracts::id.eq(viewer))
        .select(contracts::org_id)
        .first(&mut conn)
        .map_err(|_| (StatusCode::NOT_FOUND, "Contract not found".to_string()))?;

    let reminder = Reminder {
        id: Uuid::new_v4(),
        org_id,
        contract_id: viewer,
        title: req.title,
        due_date: req.due_date,
        done: false,
        created_at: Utc::now(),
    };

    diesel::insert_into(reminders::table)
        .values(&reminder)
        .execute(&mut conn)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Insert error: {e}")))?;

    Ok(Json(reminder))
}

pub async fn complete_reminder(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    let viewer = viewer_contract_id(&headers)?;
    let mut conn = db_conn(&state.conn)?;

    let updated = diesel::update(
        reminders::table
            .filter(reminders::id.eq(id))
            .filter(reminders::contract_id.eq(viewer)),
    )
    .set(reminders::done.eq(true))
    .execute(&mut conn)
    .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("Update error: {e}")))?;

    if updated == 0 {
        return Err((StatusCode::NOT_FOUND, "Reminder not found".to_string()));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn configure_calendar_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/calendar/events", post(create_event))
        .route(
            "/api/calendar/events/:id",
            axum::routing::put(update_event).delete(delete_event),
        )
        .route("/api/calendar/events/:id/ical", get(get_event_ical))
        .route("/api/calendar/day-view", get(day_view))
        .route("/api/calendar/reminders", post(create_reminder))
        .route("/api/calendar/reminders/:id/done", axum::routing::put(complete_reminder))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrored_events_are_updated_in_place() {
        let (method, url) = mirror_endpoint("https://cal.example", Some("remote-42"));
        assert_eq!(method, reqwest::Method::PUT);
        assert_eq!(url, "https://cal.example/events/remote-42");
    }

    #[test]
    fn unmirrored_events_are_created_remotely() {
        let (method, url) = mirror_endpoint("https://cal.example", None);
        assert_eq!(method, reqwest::Method::POST);
        assert_eq!(url, "https://cal.example/events");
    }

    #[test]
    fn multi_day_event_appears_on_every_day_of_its_span() {
        let first = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let last = NaiveDate::from_ymd_opt(2026, 6, 3).unwrap();

        assert!(event_occurs_on(first, last, None, first));
        assert!(event_occurs_on(
            first,
            last,
            None,
            NaiveDate::from_ymd_opt(2026, 6, 2).unwrap()
        ));
        assert!(event_occurs_on(first, last, None, last));
        assert!(!event_occurs_on(
            first,
            last,
            None,
            NaiveDate::from_ymd_opt(2026, 6, 4).unwrap()
        ));
    }

    #[test]
    fn single_day_event_appears_once() {
        let day = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        assert!(event_occurs_on(day, day, None, day));
        assert!(!event_occurs_on(day, day, None, day.succ_opt().unwrap()));
    }

    #[test]
    fn recurring_event_follows_its_rule() {
        // Mondays, starting Monday 2026-06-01
        let first = NaiveDate::from_ymd_opt(2026, 6, 1).unwrap();
        let rule = Some("FREQ=WEEKLY;BYDAY=MO");
        assert!(event_occurs_on(first, first, rule, first));
        assert!(event_occurs_on(
            first,
            first,
            rule,
            NaiveDate::from_ymd_opt(2026, 6, 8).unwrap()
        ));
        assert!(!event_occurs_on(
            first,
            first,
            rule,
            NaiveDate::from_ymd_opt(2026, 6, 2).unwrap()
        ));
    }
}
