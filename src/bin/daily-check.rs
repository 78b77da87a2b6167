/// Daily treatment reminder: emails every tutor of every pet with a pending
/// treatment scheduled for tomorrow.
/// Run once a day via cron, e.g.: 0 7 * * * /app/daily-check
///
/// Usage: daily-check [--dry-run] [--verbose]

use clap::Parser;

use petcontrol_api::config::Config;
use petcontrol_api::db;
use petcontrol_api::services::mailer::Mailer;
use petcontrol_api::services::notifications::{DailySummary, NotificationService};

#[derive(Parser)]
#[command(
    name = "daily-check",
    about = "Verificação diária de tratamentos agendados para amanhã"
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

    println!("🐾 PET CONTROL - VERIFICAÇÃO DIÁRIA DE TRATAMENTOS");
    println!("{}", "=".repeat(55));
    if args.dry_run {
        println!("⚠️  MODO DRY-RUN ATIVADO - Emails não serão enviados");
    }

    let config = Config::from_env()?;
    let pool = db::create_pool(&config.database_url).await?;
    let mailer = Mailer::from_config(&config);

    let summary = NotificationService::run_daily(&pool, &mailer, args.dry_run).await;
    print_summary(&summary);

    std::process::exit(if summary.success { 0 } else { 1 });
}

fn print_summary(summary: &DailySummary) {
    println!();
    println!("{}", "=".repeat(65));
    println!("           RESUMO DA EXECUÇÃO - LEMBRETES DIÁRIOS");
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
    println!("Emails enviados/simulados: {}", summary.emails_sent);
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
