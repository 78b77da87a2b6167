/// Monthly consolidated treatment report: one email per tutor covering all
/// their pets' current-month and overdue treatments.
/// Run on the first day of each month via cron, e.g.: 0 8 1 * * /app/monthly-check
///
/// Usage: monthly-check [--dry-run] [--verbose]

use clap::Parser;

use petcontrol_api::config::Config;
use petcontrol_api::db;
use petcontrol_api::services::mailer::Mailer;
use petcontrol_api::services::notifications::{MonthlySummary, NotificationService};

#[derive(Parser)]
#[command(
    name = "monthly-check",
    about = "Relatório mensal de tratamentos agendados e expirados"
)]
struct Args {
    /// Executa em modo simulação (não envia emails)
    #[arg(long)]
    dry_run: bool,

    /// Exibe logs detalhados
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .init();

    println!("📋 PET CONTROL - RELATÓRIO MENSAL DE TRATAMENTOS");
    println!("{}", "=".repeat(55));
    if args.dry_run {
        println!("⚠️  MODO DRY-RUN ATIVADO - Emails não serão enviados");
    }

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let mailer = Mailer::from_config(&config);

    let summary = NotificationService::run_monthly(&pool, &mailer, args.dry_run).await;
    print_summary(&summary);

    std::process::exit(if summary.success { 0 } else { 1 });
}

fn print_summary(summary: &MonthlySummary) {
    println!();
    println!("{}", "=".repeat(65));
    println!("           RESUMO DA EXECUÇÃO - RELATÓRIOS MENSAIS");
    println!("{}", "=".repeat(65));

    let status = if summary.success { "✅ SUCESSO" } else { "❌ ERRO" };
    println!("Status: {status}");

    let mode = if summary.dry_run {
        "🔍 DRY RUN (Simulação)"
    } else {
        "📧 EXECUÇÃO REAL"
    };
    println!("Modo: {mode}");

    println!("Total de pets com tratamentos: {}", summary.total_pets);
    println!("Total de tutores únicos: {}", summary.total_tutors);
    println!(
        "Relatórios consolidados enviados/simulados: {}",
        summary.emails_sent
    );
    println!(
        "Tratamentos do mês atual: {}",
        summary.total_current_treatments
    );
    println!("Tratamentos expirados: {}", summary.total_expired_treatments);
    println!("Erros encontrados: {}", summary.errors.len());
    println!("\nMensagem: {}", summary.message);

    if !summary.errors.is_empty() {
        println!("\n🚨 ERROS ENCONTRADOS:");
        for (i, error) in summary.errors.iter().enumerate() {
            println!("  {}. {error}", i + 1);
        }
    }

    println!("{}", "=".repeat(65));
}
