//! Call-scoped acting-user identity.
//!
//! The identity attributed to writes is ambient, task-local state rather than
//! an argument threaded through every call. Wrap the unit of work in
//! [`with_acting_user`]; anything underneath it (including the bulk upsert
//! engine) picks the identity up via [`current_user`].

use std::future::Future;

tokio::task_local! {
    static ACTING_USER: String;
}

/// Runs `scope` with the given identity attributed to all audited writes
/// performed inside it.
pub async fn with_acting_user<F>(user: impl Into<String>, scope: F) -> F::Output
where
    F: Future,
{
    ACTING_USER.scope(user.into(), scope).await
}

/// Best-effort lookup of the acting user. Returns `None` outside any
/// [`with_acting_user`] scope - audit stamping is skipped, never failed, when
/// no identity is available.
pub fn current_user() -> Option<String> {
    ACTING_USER.try_with(|user| user.clone()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_current_user_inside_and_outside_scope() {
        assert_eq!(current_user(), None);

        let seen = with_acting_user("user@test.com", async { current_user() }).await;
        assert_eq!(seen, Some("user@test.com".to_string()));

        assert_eq!(current_user(), None);
    }

    #[tokio::test]
    async fn test_scopes_nest_innermost_wins() {
        let seen = with_acting_user("outer@test.com", async {
            with_acting_user("inner@test.com", async { current_user() }).await
        })
        .await;

        assert_eq!(seen, Some("inner@test.com".to_string()));
    }
}
