use axum::response::Html;

const INDEX: &str = r#"<!DOCTYPE html>
<html>
<head><title>Holochat</title></head>
<body>
<h1 style="color:DeepSkyBlue">Holochat</h1>
<p>REST backend for the Holochat app.</p>
<ul>
  <li><code>POST /auth</code> register, <code>GET /auth</code> sign in</li>
  <li><code>GET /service?token=</code> verify email</li>
  <li><code>GET|POST /changePassword</code>, <code>POST /changeNickname</code></li>
  <li><code>/contacts</code> and <code>/weather/{location}</code> (bearer token)</li>
</ul>
</body>
</html>
"#;

const VERIFICATION_SUCCESS: &str = r#"<!DOCTYPE html>
<html>
<head><title>Holochat : Email Verified</title></head>
<body>
<h1>Your email has been verified!</h1>
<p>You can now sign in to Holochat.</p>
<p>Regards,<br>The Holochat team.</p>
</body>
</html>
"#;

pub async fn index() -> Html<&'static str> {
    Html(INDEX)
}

pub async fn verification_success() -> Html<&'static str> {
    Html(VERIFICATION_SUCCESS)
}
