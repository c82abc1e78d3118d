//! Outbound notification email. Sends are best effort: callers fire and
//! forget, and failures end up in the log rather than in the response.

use diesel::prelude::*;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use log::{error, info};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::MailConfig;
use crate::shared::schema::contracts;
use crate::shared::state::AppState;

#[derive(Debug)]
pub struct EmailError(pub String);

impl fmt::Display for EmailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for EmailError {}

pub fn send_mail(
    config: &MailConfig,
    to: &str,
    subject: &str,
    body: &str,
) -> Result<(), EmailError> {
    let email = Message::builder()
        .from(
            config
                .from_address
                .parse()
                .map_err(|e| EmailError(format!("Invalid from address: {e}")))?,
        )
        .to(to
            .parse()
            .map_err(|e| EmailError(format!("Invalid to address: {e}")))?)
        .subject(subject)
        .body(body.to_string())
        .map_err(|e| EmailError(format!("Failed to build email: {e}")))?;

    let creds = Credentials::new(config.username.clone(), config.password.clone());
    let mailer = SmtpTransport::relay(&config.server)
        .map_err(|e| EmailError(format!("Failed to create SMTP transport: {e}")))?
        .port(config.port)
        .credentials(creds)
        .build();

    mailer
        .send(&email)
        .map_err(|e| EmailError(format!("Failed to send email: {e}")))?;

    Ok(())
}

/// Emails every admin of the org in the background. The triggering request
/// never waits on, or fails because of, delivery.
pub fn notify_admins(state: Arc<AppState>, org_id: Uuid, subject: String, body: String) {
    tokio::task::spawn_blocking(move || {
        let mut conn = match state.conn.get() {
            Ok(conn) => conn,
            Err(e) => {
                error!("admin notification skipped, no db connection: {e}");
                return;
            }
        };

        let recipients: Vec<Option<String>> = contracts::table
            .filter(contracts::org_id.eq(org_id))
            .filter(contracts::role.eq("admin"))
            .filter(contracts::is_active.eq(true))
            .select(contracts::email)
            .load(&mut conn)
            .unwrap_or_default();

        let mut sent = 0;
        for to in recipients.into_iter().flatten() {
            match send_mail(&state.config.mail, &to, &subject, &body) {
                Ok(()) => sent += 1,
                Err(e) => error!("notification to {to} failed: {e}"),
            }
        }
        info!("'{subject}' sent to {sent} admin(s) of org {org_id}");
    });
}
