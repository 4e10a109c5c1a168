use chrono::Utc;
use club_treasury::{
    config::{catalog, database},
    core::{finance, period::YearMonth, report, status},
    errors::Result,
};
use dotenvy::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the catalog configuration (config.toml or $CLUB_CONFIG)
    let catalog_config = catalog::load_default_config()
        .inspect_err(|e| error!("Failed to load catalog configuration: {}", e))?;

    // 4. Connect and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database schema ready."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed fine causes, expense categories and the dues price
    catalog::seed_catalog(&db, &catalog_config)
        .await
        .inspect_err(|e| error!("Failed to seed catalog: {}", e))?;

    // 6. Report
    let today = Utc::now().date_naive();

    let statement = finance::team_statement(&db, &finance::DateWindow::all_time()).await?;
    info!(
        "Team statement: income {} (dues {}, fines {}, contributions {}), expenses {}, balance {}",
        report::format_amount(statement.total_income),
        report::format_amount(statement.income.dues),
        report::format_amount(statement.income.fines),
        report::format_amount(statement.income.contributions),
        report::format_amount(statement.total_expenses),
        report::format_amount(statement.balance)
    );
    for category in &statement.categories {
        info!(
            "  {}: {} in {} expense(s)",
            category.name,
            report::format_amount(category.total),
            category.count
        );
    }

    let month = finance::monthly_summary(&db, YearMonth::from_date(today)).await?;
    info!(
        "{}: income {}, expenses {}, difference {}",
        month.period,
        report::format_amount(month.total_income),
        report::format_amount(month.total_expenses),
        report::format_amount(month.difference)
    );

    let dashboard = report::dashboard_summary(&db, today).await?;
    info!(
        "{} active of {} player(s), {} up to date, {} with pending fines ({})",
        dashboard.active_players,
        dashboard.total_players,
        dashboard.up_to_date,
        dashboard.with_pending_fines,
        report::format_amount(dashboard.pending_fines_amount)
    );

    for player_status in status::list_player_statuses(&db, true, today).await? {
        info!("{}", report::format_status_line(&player_status));
    }

    Ok(())
}
