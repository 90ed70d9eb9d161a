//! Liveness probe: `GET /healthz`.
//!
//! Unauthenticated and does not touch the store.

pub async fn healthz() -> &'static str {
    "OK"
}
