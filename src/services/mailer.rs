use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::services::report::{DailyReport, MonthlyReport};

/// Per-recipient outcome. Failures are carried as data and accumulated by the
/// batch driver; they never abort a run.
#[derive(Debug, Clone)]
pub struct SendResult {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("SMTP_EMAIL e SMTP_PASSWORD devem ser configurados no .env")]
    NotConfigured,
    #[error("endereço de email inválido: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("falha ao montar a mensagem: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("falha no envio SMTP: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

struct SmtpReady {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

/// Outbound email dispatcher. Without the SMTP credential pair only dry-run
/// sends succeed; real sends fail per-recipient with a configuration message.
pub struct Mailer {
    smtp: Option<SmtpReady>,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        let smtp = Self::build_smtp(config);
        if smtp.is_none() {
            info!("SMTP não configurado — apenas dry-run disponível");
        }
        Self { smtp }
    }

    /// A mailer with no transport; every real send reports the configuration
    /// failure.
    pub fn unconfigured() -> Self {
        Self { smtp: None }
    }

    pub fn is_configured(&self) -> bool {
        self.smtp.is_some()
    }

    fn build_smtp(config: &Config) -> Option<SmtpReady> {
        let email = config.smtp_email.clone()?;
        let password = config.smtp_password.clone()?;

        let creds = Credentials::new(email.clone(), password);
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
            .ok()?
            .port(config.smtp_port)
            .credentials(creds)
            .build();
        let from: Mailbox = email.parse().ok()?;

        Some(SmtpReady { transport, from })
    }

    /// Daily reminder: one message per tutor about a single pet's treatments
    /// scheduled for tomorrow.
    pub async fn send_daily_reminder(
        &self,
        to_email: &str,
        to_name: &str,
        report: &DailyReport,
        dry_run: bool,
    ) -> SendResult {
        if dry_run {
            info!("[DRY RUN] Email seria enviado para {to_email}");
            return SendResult {
                success: true,
                message: format!("[DRY RUN] Email preparado para {to_email}"),
            };
        }

        let subject = format!(
            "🐾 Lembrete: Tratamentos agendados para {} amanhã",
            report.pet_name
        );
        let text = daily_email_text(to_name, report);
        let html = build_daily_email_html(to_name, report);

        match self.deliver(to_email, to_name, &subject, &text, &html).await {
            Ok(()) => {
                info!("Email enviado com sucesso para {to_email}");
                SendResult {
                    success: true,
                    message: format!("Email enviado para {to_email}"),
                }
            }
            Err(DispatchError::NotConfigured) => SendResult {
                success: false,
                message: DispatchError::NotConfigured.to_string(),
            },
            Err(e) => {
                error!("Erro ao enviar email para {to_email}: {e}");
                SendResult {
                    success: false,
                    message: format!("Erro ao enviar email para {to_email}: {e}"),
                }
            }
        }
    }

    /// Monthly digest: one consolidated message per tutor covering all their
    /// pets.
    pub async fn send_monthly_digest(
        &self,
        to_email: &str,
        to_name: &str,
        report: &MonthlyReport,
        dry_run: bool,
    ) -> SendResult {
        if dry_run {
            info!(
                "[DRY RUN] Relatório mensal consolidado seria enviado para {to_email} ({} pets)",
                report.total_pets
            );
            return SendResult {
                success: true,
                message: format!("[DRY RUN] Relatório consolidado preparado para {to_email}"),
            };
        }

        let subject = format!(
            "📋 Relatório Mensal Consolidado - {} pets ({})",
            report.total_pets, report.current_month
        );
        let text = monthly_email_text(to_name, report);
        let html = build_monthly_email_html(to_name, report);

        match self.deliver(to_email, to_name, &subject, &text, &html).await {
            Ok(()) => {
                info!("Relatório mensal consolidado enviado com sucesso para {to_email}");
                SendResult {
                    success: true,
                    message: format!("Relatório consolidado enviado para {to_email}"),
                }
            }
            Err(DispatchError::NotConfigured) => SendResult {
                success: false,
                message: DispatchError::NotConfigured.to_string(),
            },
            Err(e) => {
                error!("Erro ao enviar relatório consolidado para {to_email}: {e}");
                SendResult {
                    success: false,
                    message: format!("Erro ao enviar relatório consolidado para {to_email}: {e}"),
                }
            }
        }
    }

    async fn deliver(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        text: &str,
        html: &str,
    ) -> Result<(), DispatchError> {
        let smtp = self.smtp.as_ref().ok_or(DispatchError::NotConfigured)?;

        let to: Mailbox = match format!("{to_name} <{to_email}>").parse() {
            Ok(m) => m,
            Err(_) => to_email.parse()?,
        };

        let email = Message::builder()
            .message_id(Some(new_message_id(&smtp.from)))
            .from(smtp.from.clone())
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html.to_string()),
                    ),
            )?;

        smtp.transport.send(email).await?;
        Ok(())
    }
}

fn new_message_id(from: &Mailbox) -> String {
    format!("<{}@{}>", Uuid::new_v4(), from.email.domain())
}

// ─── Corpos de email ─────────────────────────────────────────────────────────

fn daily_email_text(tutor_name: &str, report: &DailyReport) -> String {
    let mut text = format!(
        "Olá {tutor_name},\n\n\
         {} ({}) tem {} tratamento(s) agendado(s) para amanhã, {}:\n\n",
        report.pet_name, report.pet_nickname, report.total_treatments, report.date
    );
    for t in &report.treatments {
        text.push_str(&format!(
            "- {} ({}) às {} — aplicação: {}\n",
            t.name, t.category, t.time, t.applier_type
        ));
    }
    text.push_str("\nPet Control");
    text
}

fn monthly_email_text(tutor_name: &str, report: &MonthlyReport) -> String {
    format!(
        "Olá {tutor_name},\n\n\
         Relatório mensal de {}: {} pet(s), {} tratamento(s) agendado(s) no mês, \
         {} tratamento(s) expirado(s).\n\n\
         Veja os detalhes na versão HTML deste email.\n\n\
         Pet Control",
        report.current_month,
        report.total_pets,
        report.total_current_treatments,
        report.total_expired_treatments
    )
}

/// Wraps inner HTML content in the shared email layout.
fn wrap_html(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <title>{title}</title>
</head>
<body style="margin:0;padding:0;background-color:#f1f5f9;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,Helvetica,Arial,sans-serif">
  <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="background-color:#f1f5f9;padding:40px 16px">
    <tr>
      <td align="center">
        <table role="presentation" width="100%" cellpadding="0" cellspacing="0" style="max-width:560px">
          <tr>
            <td align="center" style="padding-bottom:28px">
              <p style="margin:0;font-size:20px;font-weight:700;color:#0f172a;text-align:center">🐾 Pet Control</p>
            </td>
          </tr>
          <tr>
            <td style="background:#ffffff;border-radius:12px;padding:36px;box-shadow:0 1px 3px rgba(0,0,0,0.08),0 8px 24px rgba(0,0,0,0.04)">
              {content}
            </td>
          </tr>
          <tr>
            <td align="center" style="padding-top:20px">
              <p style="margin:0;font-size:12px;color:#94a3b8">Pet Control — lembretes automáticos de tratamentos</p>
            </td>
          </tr>
        </table>
      </td>
    </tr>
  </table>
</body>
</html>"#
    )
}

fn treatment_rows(lines: &[crate::services::report::TreatmentLine]) -> String {
    let mut rows = String::new();
    for t in lines {
        let applier = if t.applier_name.is_empty() {
            t.applier_type.clone()
        } else {
            format!("{} ({})", t.applier_name, t.applier_type)
        };
        rows.push_str(&format!(
            r#"  <tr>
    <td style="padding:10px 12px;border-bottom:1px solid #f1f5f9;font-size:14px;color:#0f172a;font-weight:600">{}</td>
    <td style="padding:10px 12px;border-bottom:1px solid #f1f5f9;font-size:14px;color:#64748b">{}</td>
    <td style="padding:10px 12px;border-bottom:1px solid #f1f5f9;font-size:14px;color:#64748b">{}</td>
    <td style="padding:10px 12px;border-bottom:1px solid #f1f5f9;font-size:14px;color:#64748b">{}</td>
  </tr>
"#,
            t.name, t.category, t.time, applier
        ));
    }
    rows
}

pub fn build_daily_email_html(tutor_name: &str, report: &DailyReport) -> String {
    let content = format!(
        r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">Tratamentos agendados para amanhã</h1>
<p style="margin:0 0 24px 0;font-size:15px;color:#64748b;line-height:1.6">Olá <strong style="color:#334155">{tutor_name}</strong>,<br><br><strong style="color:#334155">{pet}</strong> <span style="font-family:monospace;color:#94a3b8">({nickname})</span> tem <strong>{total}</strong> tratamento(s) agendado(s) para <strong>{date}</strong>.</p>
<table role="presentation" width="100%" cellpadding="0" cellspacing="0">
  <tr>
    <th align="left" style="padding:8px 12px;font-size:12px;color:#94a3b8;text-transform:uppercase;letter-spacing:0.05em">Tratamento</th>
    <th align="left" style="padding:8px 12px;font-size:12px;color:#94a3b8;text-transform:uppercase;letter-spacing:0.05em">Categoria</th>
    <th align="left" style="padding:8px 12px;font-size:12px;color:#94a3b8;text-transform:uppercase;letter-spacing:0.05em">Horário</th>
    <th align="left" style="padding:8px 12px;font-size:12px;color:#94a3b8;text-transform:uppercase;letter-spacing:0.05em">Aplicação</th>
  </tr>
{rows}</table>"#,
        tutor_name = tutor_name,
        pet = report.pet_name,
        nickname = report.pet_nickname,
        total = report.total_treatments,
        date = report.date,
        rows = treatment_rows(&report.treatments),
    );
    wrap_html("Lembrete de tratamentos", &content)
}

fn monthly_rows(lines: &[crate::services::report::MonthlyLine]) -> String {
    let mut rows = String::new();
    for t in lines {
        let status = match t.days_late {
            Some(days) => format!(
                r#"<span style="color:#dc2626;font-weight:600">{} ({} dias de atraso)</span>"#,
                t.status, days
            ),
            None => format!(r#"<span style="color:#16a34a;font-weight:600">{}</span>"#, t.status),
        };
        rows.push_str(&format!(
            r#"  <tr>
    <td style="padding:8px 12px;border-bottom:1px solid #f1f5f9;font-size:14px;color:#0f172a;font-weight:600">{}</td>
    <td style="padding:8px 12px;border-bottom:1px solid #f1f5f9;font-size:14px;color:#64748b">{}</td>
    <td style="padding:8px 12px;border-bottom:1px solid #f1f5f9;font-size:14px;color:#64748b">{}</td>
    <td style="padding:8px 12px;border-bottom:1px solid #f1f5f9;font-size:14px">{}</td>
  </tr>
"#,
            t.name, t.category, t.date, status
        ));
    }
    rows
}

pub fn build_monthly_email_html(tutor_name: &str, report: &MonthlyReport) -> String {
    let mut pets_html = String::new();
    for pet in &report.pets {
        pets_html.push_str(&format!(
            r#"<h2 style="margin:28px 0 8px 0;font-size:17px;font-weight:700;color:#0f172a">{} <span style="font-family:monospace;font-weight:400;color:#94a3b8">({})</span></h2>
"#,
            pet.pet_name, pet.pet_nickname
        ));

        if pet.has_current_treatments {
            pets_html.push_str(&format!(
                r#"<p style="margin:12px 0 4px 0;font-size:13px;font-weight:600;color:#64748b;text-transform:uppercase;letter-spacing:0.05em">Agendados para o mês</p>
<table role="presentation" width="100%" cellpadding="0" cellspacing="0">
{}</table>
"#,
                monthly_rows(&pet.current_month_treatments)
            ));
        }

        if pet.has_expired_treatments {
            pets_html.push_str(&format!(
                r#"<p style="margin:12px 0 4px 0;font-size:13px;font-weight:600;color:#dc2626;text-transform:uppercase;letter-spacing:0.05em">Expirados</p>
<table role="presentation" width="100%" cellpadding="0" cellspacing="0">
{}</table>
"#,
                monthly_rows(&pet.expired_treatments)
            ));
        }
    }

    let content = format!(
        r#"<h1 style="margin:0 0 8px 0;font-size:22px;font-weight:700;color:#0f172a">Relatório mensal — {month}</h1>
<p style="margin:0 0 20px 0;font-size:15px;color:#64748b;line-height:1.6">Olá <strong style="color:#334155">{tutor_name}</strong>, este é o resumo de {month} dos seus {total_pets} pet(s): <strong style="color:#16a34a">{current}</strong> tratamento(s) agendado(s) e <strong style="color:#dc2626">{expired}</strong> expirado(s).</p>
{pets}
<p style="margin:28px 0 0 0;font-size:13px;color:#94a3b8;border-top:1px solid #f1f5f9;padding-top:16px">Relatório gerado em {report_date}.</p>"#,
        month = report.current_month,
        tutor_name = tutor_name,
        total_pets = report.total_pets,
        current = report.total_current_treatments,
        expired = report.total_expired_treatments,
        pets = pets_html,
        report_date = report.report_date,
    );
    wrap_html("Relatório mensal de tratamentos", &content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::report::{daily_report, monthly_report};
    use crate::services::treatments::{PetDue, PetMonthly};
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn sample_daily() -> DailyReport {
        let tomorrow = d(2025, 8, 9);
        let pet = PetDue {
            pet_id: Uuid::new_v4(),
            name: "Rex".into(),
            nickname: "rex_1234".into(),
            accessor_ids: vec![],
            treatments: vec![crate::models::treatment::Treatment {
                id: Uuid::new_v4(),
                pet_id: Uuid::new_v4(),
                category: "Vacinas".into(),
                name: "Antirrábica".into(),
                description: None,
                date: tomorrow,
                time: None,
                done: false,
                applier_type: "Tutor".into(),
                applier_name: None,
                applier_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }],
        };
        daily_report(&pet, tomorrow)
    }

    #[tokio::test]
    async fn test_dry_run_never_fails_and_is_tagged() {
        let mailer = Mailer::unconfigured();
        let result = mailer
            .send_daily_reminder("joao@email.com", "João", &sample_daily(), true)
            .await;

        assert!(result.success);
        assert!(result.message.starts_with("[DRY RUN]"));
        assert!(result.message.contains("joao@email.com"));
    }

    #[tokio::test]
    async fn test_real_send_without_credentials_fails_with_config_message() {
        let mailer = Mailer::unconfigured();
        let result = mailer
            .send_daily_reminder("joao@email.com", "João", &sample_daily(), false)
            .await;

        assert!(!result.success);
        assert!(result.message.contains("SMTP_EMAIL"));
        assert!(result.message.contains("SMTP_PASSWORD"));
    }

    #[tokio::test]
    async fn test_monthly_dry_run_tagged() {
        let mailer = Mailer::unconfigured();
        let report = monthly_report(&[], d(2025, 8, 8));
        let result = mailer
            .send_monthly_digest("maria@email.com", "Maria", &report, true)
            .await;

        assert!(result.success);
        assert!(result.message.starts_with("[DRY RUN]"));
    }

    #[test]
    fn test_daily_html_contains_pet_and_treatments() {
        let html = build_daily_email_html("João", &sample_daily());
        assert!(html.contains("Rex"));
        assert!(html.contains("rex_1234"));
        assert!(html.contains("Antirrábica"));
        assert!(html.contains("09/08/2025"));
    }

    #[test]
    fn test_monthly_html_shows_days_late_and_hides_empty_sections() {
        let today = d(2025, 8, 8);
        let pet = PetMonthly {
            pet_id: Uuid::new_v4(),
            name: "Mia".into(),
            nickname: "mia_9999".into(),
            accessor_ids: vec![],
            current_month: vec![],
            expired: vec![crate::models::treatment::Treatment {
                id: Uuid::new_v4(),
                pet_id: Uuid::new_v4(),
                category: "Vermífugo".into(),
                name: "Drontal".into(),
                description: None,
                date: today - chrono::Duration::days(40),
                time: None,
                done: false,
                applier_type: "Tutor".into(),
                applier_name: None,
                applier_id: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }],
        };
        let report = monthly_report(&[pet], today);
        let html = build_monthly_email_html("Maria", &report);

        assert!(html.contains("40 dias de atraso"));
        assert!(html.contains("Expirados"));
        assert!(!html.contains("Agendados para o mês"));
    }
}
