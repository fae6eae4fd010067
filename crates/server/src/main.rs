use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use api::mailer::EmailRelay;
use api::{build_schema, seed_hr_demo, AppSchema};
use clap::{Parser, Subcommand, ValueEnum};
use migration::{Migrator, MigratorTrait};
use platform_obs::{init_tracing, ObsConfig};
use sea_orm::{Database, DatabaseConnection};
use tokio::net::TcpListener;
use tracing::info;

mod config;
mod http;

use config::AppConfig;
use http::{app_router, shutdown_signal, AppState};

#[derive(Parser, Debug)]
#[command(name = "smartemployee360", version, about = "SmartEmployee360 HR backend")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Apply pending migrations and run the HTTP server
    Serve {
        /// Overrides BIND from the environment
        #[arg(long)]
        bind: Option<String>,
    },
    /// Run migrations
    Migrate {
        #[arg(long, value_enum, default_value_t = MigrateAction::Up)]
        action: MigrateAction,
    },
    /// Insert the demo HR dataset
    Seed,
    /// Print GraphQL SDL
    PrintSchema,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MigrateAction {
    Up,
    Down,
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load().context("loading configuration")?;
    let _obs = init_tracing(ObsConfig {
        otlp_endpoint: config.otlp_endpoint.clone(),
        ..ObsConfig::default()
    })?;

    match cli.cmd {
        Cmd::PrintSchema => {
            let AppSchema(schema) = build_schema(
                Arc::new(DatabaseConnection::Disconnected),
                Arc::new(config.auth.clone()),
                Arc::new(config.hr.clone()),
                Arc::new(EmailRelay::new(config.mailer.clone())?),
            );
            println!("{}", schema.sdl());
            Ok(())
        }
        Cmd::Migrate { action } => {
            let db = connect(&config).await?;
            match action {
                MigrateAction::Up => Migrator::up(&db, None).await?,
                MigrateAction::Down => Migrator::down(&db, None).await?,
                MigrateAction::Reset => Migrator::reset(&db).await?,
            }
            info!(?action, "migrations applied");
            Ok(())
        }
        Cmd::Seed => {
            let db = connect(&config).await?;
            let seeded = seed_hr_demo(&db).await.context("seeding demo data")?;
            info!(
                departments = seeded.departments.len(),
                employees = seeded.employees.len(),
                cycle = %seeded.cycle.name,
                "demo data ready"
            );
            Ok(())
        }
        Cmd::Serve { bind } => {
            let db = Arc::new(connect(&config).await?);
            Migrator::up(db.as_ref(), None)
                .await
                .context("applying migrations")?;
            let auth = Arc::new(config.auth.clone());
            let mailer = Arc::new(EmailRelay::new(config.mailer.clone())?);
            if !mailer.is_configured() {
                tracing::warn!("RESEND_API_KEY is not set; email relay will answer UNAVAILABLE");
            }
            let AppSchema(schema) = build_schema(
                db.clone(),
                auth.clone(),
                Arc::new(config.hr.clone()),
                mailer.clone(),
            );
            let state = AppState {
                schema,
                db,
                auth,
                mailer,
            };
            let app = app_router(state, &config.cors_origins);

            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let addr: SocketAddr = bind
                .parse()
                .with_context(|| format!("invalid bind address {bind:?}"))?;
            let listener = TcpListener::bind(addr).await?;
            info!("listening on http://{}", addr);
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(shutdown_signal())
            .await?;
            Ok(())
        }
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<DatabaseConnection> {
    Database::connect(&config.database_url)
        .await
        .context("connecting to the HR database")
}
