/// Liveness probe; reports `ok` whenever the process can serve requests
pub async fn health_handler() -> &'static str {
    "ok"
}
