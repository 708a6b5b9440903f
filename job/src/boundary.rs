//! Process-level panic boundary for the binary.

use std::future::Future;
use tokio::task::JoinError;

/// Exit code used when the job body panics outside the controller.
pub const PANIC_EXIT_CODE: i32 = 1;

/// Run the job body in its own task and return its exit code.
///
/// A panic anywhere in `body` (startup, wiring, writing the report) maps to
/// [`PANIC_EXIT_CODE`] instead of the runtime's default abort code.
pub async fn exit_code_of<F>(body: F) -> i32
where
    F: Future<Output = i32> + Send + 'static,
{
    tokio::spawn(body).await.unwrap_or_else(|e| panicked(&e))
}

fn panicked(error: &JoinError) -> i32 {
    tracing::error!(error = %error, "Booking lifecycle job aborted");
    PANIC_EXIT_CODE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn body_exit_code_is_passed_through() {
        assert_eq!(exit_code_of(async { 0 }).await, 0);
        assert_eq!(exit_code_of(async { 1 }).await, 1);
    }

    #[allow(clippy::panic)]
    fn failing_wiring() -> i32 {
        panic!("collaborator construction failed")
    }

    #[tokio::test]
    async fn panic_outside_the_controller_exits_one() {
        let code = exit_code_of(async { failing_wiring() }).await;

        assert_eq!(code, PANIC_EXIT_CODE);
    }
}
