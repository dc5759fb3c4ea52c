//! A toy user service shipping its logs to VictoriaLogs.
//!
//! Configure with `VICTORIA_LOGS_URL` and the other `LOG_SHIPPER_*`
//! variables; by default entries go to `http://localhost:9428/insert/jsonline`.

use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::time::{sleep, Duration};

use log_shipper::env::env_or;
use log_shipper::init::init_from_env;
use log_shipper::{fields, Context, Logger};

struct User {
    id: String,
    username: String,
    email: String,
}

struct UserService {
    logger: Logger,
}

impl UserService {
    fn new(logger: &Logger) -> Self {
        UserService {
            logger: logger.with_service("user-service"),
        }
    }

    async fn create_user(&self, ctx: &Context, user: &User) -> Result<(), String> {
        let start = Instant::now();
        self.logger.info(
            ctx,
            "Create new User",
            fields! {
                "user_id" => user.id,
                "username" => user.username,
                "email" => user.email,
                "action" => "create_user_start",
            },
        );

        sleep(Duration::from_millis(100)).await;

        if user.username == "invalid" {
            self.logger.error(
                ctx,
                "Failed to create user",
                fields! {
                    "user_id" => user.id,
                    "action" => "create_user_error",
                    "duration_ms" => start.elapsed().as_millis() as u64,
                },
            );
            return Err("failed to create user".to_string());
        }

        self.logger.info(
            ctx,
            "Create new User",
            fields! {
                "user_id" => user.id,
                "action" => "create_user_success",
                "duration_ms" => start.elapsed().as_millis() as u64,
            },
        );
        Ok(())
    }
}

/// Stand-in for the HTTP middleware: every request gets a fresh trace id.
fn request_context() -> Context {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    Context::background().with_trace_id(format!("trace_{nanos:x}"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logger = init_from_env()?;
    let service = UserService::new(&logger);

    let port = env_or("PORT", "8080");
    tracing::info!(target: "user_service", port = %port, "Starting server");

    for (i, name) in ["johndoe", "invalid", "janedoe"].iter().enumerate() {
        let ctx = request_context().with_user_id(format!("admin-{i}"));
        let user = User {
            id: format!("user_{i}"),
            username: name.to_string(),
            email: format!("{name}@example.com"),
        };
        if let Err(e) = service.create_user(&ctx, &user).await {
            logger.warn(&ctx, "request failed", fields! { "error" => e });
        }
    }

    logger.info(&Context::background(), "Shutting down server", fields! {});
    logger.flush().await?;
    logger.close().await?;
    Ok(())
}
