mod cli;
mod infra;
mod routes;
mod schema;
mod server;

use fraud_decision::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
