//! V3 gating and CLI-shared-mode access control (`spec.md` §4.5).

use crate::db::{Db, SystemSettings, User};
use crate::error::ApiError;
use crate::router::auth::AuthContext;

/// V3 models require ADMIN, an ADMIN key, an owned V3-capable credential, or
/// the system-wide open-access toggle.
pub async fn check_v3(db: &Db, ctx: &AuthContext, settings: &SystemSettings) -> Result<(), ApiError> {
    if settings.enable_gemini3_open_access || ctx.is_admin() {
        return Ok(());
    }
    let (_total, v3) = db.count_google_credentials_for_owner(ctx.user.id).await?;
    if v3 >= 1 {
        return Ok(());
    }
    Err(ApiError::forbidden(
        "This model requires a Gemini-3-capable credential.",
    ))
}

/// With CLI-shared mode off, a non-admin caller must own at least one active
/// credential to use the shared pool at all.
pub async fn check_cli_shared(db: &Db, user: &User, settings: &SystemSettings) -> Result<(), ApiError> {
    if settings.cli_shared_mode || user.is_admin() {
        return Ok(());
    }
    let (total, _v3) = db.count_google_credentials_for_owner(user.id).await?;
    if total >= 1 {
        return Ok(());
    }
    Err(ApiError::forbidden(
        "CLI shared mode is disabled; bring your own credential.",
    ))
}
