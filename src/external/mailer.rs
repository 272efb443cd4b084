use crate::config::EmailConfig;
use crate::error::{AppError, AppResult};
use crate::services::sinks::{AbsenceNotice, EmailSender};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SendMailRequest<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub subject: String,
    pub text: String,
}

/// Delivers mail through an HTTP relay; with no relay configured it only logs.
#[derive(Clone)]
pub struct MailerService {
    client: Client,
    config: EmailConfig,
}

impl MailerService {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.config.api_url.trim().is_empty()
    }
}

pub fn absence_subject(notice: &AbsenceNotice) -> String {
    format!("{} missed {}", notice.student_name, notice.lesson_title)
}

pub fn absence_body(notice: &AbsenceNotice) -> String {
    let when = notice.lesson_start.format("%Y-%m-%d %H:%M");
    match notice.reason.as_deref() {
        Some(reason) => format!(
            "Dear {}, you were marked absent from \"{}\" on {} (reason: {}).",
            notice.student_name, notice.lesson_title, when, reason
        ),
        None => format!(
            "Dear {}, you were marked absent from \"{}\" on {}.",
            notice.student_name, notice.lesson_title, when
        ),
    }
}

#[async_trait]
impl EmailSender for MailerService {
    async fn send_absence_notice(&self, notice: AbsenceNotice) -> AppResult<()> {
        if !self.is_enabled() {
            log::info!(
                "Email relay not configured, absence notice for {} not sent",
                notice.to
            );
            return Ok(());
        }

        let request = SendMailRequest {
            from: &self.config.from_address,
            to: &notice.to,
            subject: absence_subject(&notice),
            text: absence_body(&notice),
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if response.status().is_success() {
            log::info!("Absence notice sent to {} (tenant {})", notice.to, notice.tenant);
            Ok(())
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("Absence notice to {} failed: {}", notice.to, error_text);
            Err(AppError::ExternalApiError(format!(
                "Email sending failed: {error_text}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn notice(reason: Option<&str>) -> AbsenceNotice {
        AbsenceNotice {
            tenant: "default".into(),
            to: "ali@example.com".into(),
            student_name: "Ali".into(),
            lesson_title: "English B1".into(),
            lesson_start: NaiveDate::from_ymd_opt(2024, 6, 3)
                .unwrap()
                .and_hms_opt(15, 0, 0)
                .unwrap(),
            reason: reason.map(str::to_string),
        }
    }

    #[test]
    fn test_absence_body() {
        assert_eq!(
            absence_body(&notice(Some("sick"))),
            "Dear Ali, you were marked absent from \"English B1\" on 2024-06-03 15:00 (reason: sick)."
        );
        assert!(!absence_body(&notice(None)).contains("reason"));
        assert_eq!(absence_subject(&notice(None)), "Ali missed English B1");
    }

    #[tokio::test]
    async fn test_disabled_mailer_succeeds() {
        let mailer = MailerService::new(EmailConfig::default());
        assert!(!mailer.is_enabled());
        assert!(mailer.send_absence_notice(notice(None)).await.is_ok());
    }
}
