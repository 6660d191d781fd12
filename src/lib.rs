mod cli;
pub mod infra;
pub mod routes;
mod server;

use metrolist::error::AppError;

pub async fn run() -> Result<(), AppError> {
    cli::run().await
}
