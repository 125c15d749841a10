//! RPC method handler for the Smart Bookmark JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested. `handle_method`
//! dispatches one call against the `App`.

use serde_json::{json, Value};

use crate::app::{App, Route};
use crate::services::identity::IdentityProviderTrait;
use crate::types::session::AuthCallback;

fn str_param<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(|v| v.as_str())
}

/// Dispatch a JSON-RPC method call.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(app: &mut App, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Auth ───
        "auth.callback" => {
            let callback = AuthCallback {
                code: str_param(params, "code").map(str::to_string),
                error: str_param(params, "error").map(str::to_string),
                email: str_param(params, "email").unwrap_or_default().to_string(),
                avatar_url: str_param(params, "avatar_url").map(str::to_string),
            };
            let user = app.complete_sign_in(&callback).await.map_err(|e| e.to_string())?;
            Ok(json!({"user": user}))
        }
        "auth.user" => {
            let user = app.identity.current_user().await.map_err(|e| e.to_string())?;
            Ok(json!({"user": user}))
        }
        "auth.sign_out" => {
            app.sign_out().await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        // ─── View ───
        "view.render" => serde_json::to_value(app.render()).map_err(|e| e.to_string()),
        "view.navigate" => {
            let path = str_param(params, "path").ok_or("missing path")?;
            let route = Route::parse(path).ok_or_else(|| format!("unknown route: {}", path))?;
            app.navigate(route);
            if route == Route::Home {
                app.refresh().await;
            }
            Ok(json!({"path": route.path()}))
        }

        // ─── Bookmarks ───
        "form.submit" => {
            let title = str_param(params, "title").unwrap_or_default();
            let url = str_param(params, "url").unwrap_or_default();
            let bookmark = app
                .submit_bookmark(title, url)
                .await
                .map_err(|e| e.to_string())?;
            Ok(json!({"id": bookmark.id}))
        }
        "bookmark.delete" => {
            let id = str_param(params, "id").ok_or("missing id")?;
            app.delete_bookmark(id).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "feed.poll" => Ok(json!({"applied": app.poll_feed()})),

        _ => Err(format!("unknown method: {}", method)),
    }
}
