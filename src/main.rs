use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use tokengate::auth::AuthService;
use tokengate::configuration::get_configuration;
use tokengate::startup::run;
use tokengate::store::Stores;
use tokengate::telemetry::{init_telemetry, DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry(DEFAULT_LOG_FILTER);

    tracing::info!("Starting application");

    // A bad configuration (including a blank signing key) is fatal
    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let stores = if configuration.application.in_memory {
        tracing::warn!("Running with the in-memory store; data is lost on exit");
        Stores::in_memory()
    } else {
        tracing::info!("Attempting to connect to database");
        let pool = PgPoolOptions::new()
            .max_connections(configuration.database.max_connections)
            .connect(&configuration.database.connection_string())
            .await
            .map_err(|e| {
                tracing::error!("Failed to create connection pool: {}", e);
                std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "Database connection error",
                )
            })?;
        tracing::info!("Database connection pool created successfully");
        Stores::postgres(pool)
    };

    let auth = AuthService::new(&stores, &configuration.auth).map_err(|e| {
        tracing::error!("Failed to initialise authentication: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, stores, auth, &configuration.rate_limit)?.await
}
