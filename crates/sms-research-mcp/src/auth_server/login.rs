//! HTML login page for the authorization server.

/// Render the login page shown during an authorization request.
///
/// All parameters are HTML-escaped to prevent XSS.
#[must_use]
pub fn render_login_page(client_name: &str, txn: &str, error_message: Option<&str>) -> String {
    let error_html = error_message
        .map(|msg| {
            format!(
                r#"<div style="background:#fee;border:1px solid #c00;color:#c00;padding:10px;border-radius:4px;margin-bottom:16px">{}</div>"#,
                html_escape(msg)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>Sign in - SMS &amp; Research MCP</title>
<style>
body {{ font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif; background: #f5f5f5; margin: 0; display: flex; justify-content: center; align-items: center; min-height: 100vh; }}
.card {{ background: #fff; border-radius: 8px; box-shadow: 0 2px 8px rgba(0,0,0,0.1); padding: 32px; max-width: 400px; width: 100%; }}
h1 {{ font-size: 20px; margin: 0 0 8px; color: #333; }}
.subtitle {{ color: #666; font-size: 14px; margin: 0 0 24px; }}
label {{ display: block; font-size: 14px; font-weight: 500; margin-bottom: 6px; color: #333; }}
input[type="text"], input[type="password"] {{ width: 100%; padding: 10px; border: 1px solid #ddd; border-radius: 4px; font-size: 14px; box-sizing: border-box; margin-bottom: 12px; }}
input:focus {{ outline: none; border-color: #4a90d9; box-shadow: 0 0 0 2px rgba(74,144,217,0.2); }}
button {{ width: 100%; padding: 10px; background: #4a90d9; color: #fff; border: none; border-radius: 4px; font-size: 14px; font-weight: 500; cursor: pointer; margin-top: 8px; }}
button:hover {{ background: #357abd; }}
</style>
</head>
<body>
<div class="card">
<h1>SMS &amp; Research MCP</h1>
<p class="subtitle"><strong>{client_name}</strong> is requesting access</p>
{error_html}
<form method="POST" action="/login/callback">
<input type="hidden" name="txn" value="{txn_escaped}">
<label for="username">Username</label>
<input type="text" id="username" name="username" placeholder="demo_user" required autofocus>
<label for="password">Password</label>
<input type="password" id="password" name="password" placeholder="Password" required>
<button type="submit">Sign in and approve</button>
</form>
</div>
</body>
</html>"#,
        client_name = html_escape(client_name),
        error_html = error_html,
        txn_escaped = html_escape(txn),
    )
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_escape() {
        assert_eq!(
            html_escape(r#"<script>alert("xss")</script>"#),
            "&lt;script&gt;alert(&quot;xss&quot;)&lt;/script&gt;"
        );
    }

    #[test]
    fn test_render_without_error() {
        let html = render_login_page("Test App", "txn123", None);
        assert!(html.contains("Test App"));
        assert!(html.contains("txn123"));
        assert!(!html.contains("background:#fee"));
    }

    #[test]
    fn test_render_with_error() {
        let html = render_login_page("App", "txn1", Some("Invalid username or password"));
        assert!(html.contains("Invalid username or password"));
        assert!(html.contains("background:#fee"));
    }

    #[test]
    fn test_render_escapes_client_name() {
        let html = render_login_page("<script>", "txn1", None);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }
}
