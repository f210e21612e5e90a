/// Database layer for TaskHub
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: Embedded migration runner
///
/// Models and their queries are in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
