//! Server-rendered HTML pages.
//!
//! The sign-in page uses the Supabase JS client in the browser; the obtained
//! access token is then posted to `/session`, which sets the HttpOnly cookies.
//! Provider settings are injected as JSON string literals so that no value can
//! break out of the surrounding `<script>` element.

/// Values injected into the rendered pages.
#[derive(Debug, Clone, Default)]
pub struct PageConfig {
    /// Supabase project URL
    pub supabase_url: String,

    /// Supabase anonymous (public) key
    pub supabase_anon_key: String,
}

impl PageConfig {
    pub fn new(supabase_url: impl Into<String>, supabase_anon_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            supabase_anon_key: supabase_anon_key.into(),
        }
    }
}

/// Escape HTML special characters to prevent XSS attacks.
fn html_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&#x27;"),
            _ => result.push(c),
        }
    }
    result
}

/// Encode `s` as a JavaScript string literal safe to place inside `<script>`.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string())
        .to_string()
        .replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

const STYLE: &str = r#"
    * { margin: 0; padding: 0; box-sizing: border-box; }
    body {
        background: #0f172a;
        color: #e2e8f0;
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
        min-height: 100vh;
    }
    header {
        display: flex;
        justify-content: space-between;
        align-items: center;
        padding: 16px 32px;
        border-bottom: 1px solid #1e293b;
    }
    header a, header button {
        color: #93c5fd;
        background: none;
        border: none;
        font-size: 15px;
        cursor: pointer;
        text-decoration: none;
    }
    main { max-width: 880px; margin: 48px auto; padding: 0 24px; }
    h1 { font-size: 32px; margin-bottom: 16px; }
    h2 { font-size: 20px; margin-bottom: 12px; }
    p { color: #94a3b8; line-height: 1.6; margin-bottom: 16px; }
    .card {
        background: #1e293b;
        border-radius: 12px;
        padding: 24px;
        margin-bottom: 24px;
    }
    .btn {
        display: inline-block;
        background: #2563eb;
        color: #fff;
        border: none;
        border-radius: 8px;
        padding: 10px 20px;
        font-size: 15px;
        cursor: pointer;
        text-decoration: none;
    }
    .btn:disabled { opacity: 0.5; cursor: default; }
    input[type=email], input[type=password], textarea {
        width: 100%;
        background: #0f172a;
        color: #e2e8f0;
        border: 1px solid #334155;
        border-radius: 8px;
        padding: 10px;
        margin-bottom: 12px;
        font-size: 15px;
    }
    img.preview { max-width: 100%; max-height: 320px; border-radius: 8px; margin: 12px 0; }
    .result { font-size: 24px; font-weight: 600; margin-top: 12px; }
    .error { color: #f87171; }
    .reply { white-space: pre-wrap; margin-top: 12px; color: #e2e8f0; }
"#;

fn layout(title: &str, nav: &str, body: &str, script: &str) -> String {
    let title = html_escape(title);
    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} - PneumoScan</title>
    <style>{STYLE}</style>
</head>
<body>
    <header>
        <a href="/"><strong>PneumoScan</strong></a>
        <nav>{nav}</nav>
    </header>
    <main>
{body}
    </main>
{script}
</body>
</html>"##
    )
}

/// `GET /` landing page.
pub fn landing_page(_config: &PageConfig) -> String {
    layout(
        "Home",
        r#"<a href="/auth">Sign in</a>"#,
        r#"        <h1>Chest X-ray pneumonia screening</h1>
        <p>Upload a chest radiograph and get an instant PNEUMONIA / NORMAL screening result
        from a convolutional classifier, then ask follow-up questions to an AI assistant.</p>
        <p>Results are a screening aid only and are not a medical diagnosis.</p>
        <a class="btn" href="/auth">Get started</a>"#,
        "",
    )
}

/// `GET /auth` sign-in page.
///
/// Signs in with email and password through Supabase, then posts the access
/// token to `/session` and moves on to `/dashboard`.
pub fn auth_page(config: &PageConfig) -> String {
    let supabase_url = js_string(&config.supabase_url);
    let supabase_anon_key = js_string(&config.supabase_anon_key);

    let script = format!(
        r##"    <script src="https://cdn.jsdelivr.net/npm/@supabase/supabase-js@2"></script>
    <script>
        const SUPABASE_URL = {supabase_url};
        const SUPABASE_ANON_KEY = {supabase_anon_key};
        const client = window.supabase.createClient(SUPABASE_URL, SUPABASE_ANON_KEY);
        const form = document.getElementById('auth-form');
        const message = document.getElementById('auth-message');

        async function startSession(session) {{
            const res = await fetch('/session', {{
                method: 'POST',
                headers: {{ 'Content-Type': 'application/json' }},
                body: JSON.stringify({{ access_token: session.access_token }})
            }});
            if (!res.ok) {{
                const body = await res.json().catch(() => ({{}}));
                throw new Error(body.error || 'Could not start session');
            }}
            window.location.href = '/dashboard';
        }}

        async function submit(mode) {{
            message.textContent = '';
            const email = document.getElementById('email').value;
            const password = document.getElementById('password').value;
            try {{
                const {{ data, error }} = mode === 'signup'
                    ? await client.auth.signUp({{ email, password }})
                    : await client.auth.signInWithPassword({{ email, password }});
                if (error) throw error;
                if (!data.session) {{
                    message.textContent = 'Check your inbox to confirm your account.';
                    return;
                }}
                await startSession(data.session);
            }} catch (err) {{
                message.textContent = err.message;
                message.className = 'error';
            }}
        }}

        form.addEventListener('submit', (e) => {{ e.preventDefault(); submit('signin'); }});
        document.getElementById('signup').addEventListener('click', () => submit('signup'));
    </script>"##
    );

    layout(
        "Sign in",
        r#"<a href="/">Home</a>"#,
        r#"        <div class="card">
            <h2>Sign in</h2>
            <form id="auth-form">
                <input type="email" id="email" placeholder="Email" required>
                <input type="password" id="password" placeholder="Password" required>
                <button class="btn" type="submit">Sign in</button>
                <button class="btn" type="button" id="signup">Create account</button>
            </form>
            <p id="auth-message"></p>
        </div>"#,
        &script,
    )
}

/// `GET /dashboard` upload and chat page.
pub fn dashboard_page(_config: &PageConfig) -> String {
    let script = r##"    <script>
        const fileInput = document.getElementById('xray');
        const preview = document.getElementById('preview');
        const predictBtn = document.getElementById('predict');
        const result = document.getElementById('result');
        let encoded = null;

        fileInput.addEventListener('change', () => {
            const file = fileInput.files[0];
            if (!file) return;
            const reader = new FileReader();
            reader.onload = () => {
                encoded = reader.result;
                preview.src = encoded;
                preview.hidden = false;
                predictBtn.disabled = false;
                result.textContent = '';
            };
            reader.readAsDataURL(file);
        });

        predictBtn.addEventListener('click', async () => {
            predictBtn.disabled = true;
            result.className = 'result';
            result.textContent = 'Analyzing...';
            try {
                const res = await fetch('/predict', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ image: encoded })
                });
                const body = await res.json();
                if (res.status === 401) { window.location.href = '/'; return; }
                if (!res.ok) throw new Error(body.error || 'Prediction failed');
                result.textContent = body.result;
            } catch (err) {
                result.className = 'result error';
                result.textContent = err.message;
            } finally {
                predictBtn.disabled = false;
            }
        });

        document.getElementById('chat-form').addEventListener('submit', async (e) => {
            e.preventDefault();
            const input = document.getElementById('message');
            const reply = document.getElementById('reply');
            const message = input.value.trim();
            if (!message) return;
            reply.className = 'reply';
            reply.textContent = 'Thinking...';
            try {
                const res = await fetch('/gemini', {
                    method: 'POST',
                    headers: { 'Content-Type': 'application/json' },
                    body: JSON.stringify({ message })
                });
                const body = await res.json();
                if (res.status === 401) { window.location.href = '/'; return; }
                if (!res.ok) throw new Error(body.error || 'Chat request failed');
                reply.textContent = body.reply;
            } catch (err) {
                reply.className = 'reply error';
                reply.textContent = err.message;
            }
        });

        document.getElementById('logout').addEventListener('click', async () => {
            await fetch('/logout', { method: 'POST' });
            window.location.href = '/';
        });
    </script>"##;

    layout(
        "Dashboard",
        r#"<button id="logout">Log out</button>"#,
        r#"        <div class="card">
            <h2>Chest X-ray screening</h2>
            <p>Select a JPEG or PNG radiograph.</p>
            <input type="file" id="xray" accept="image/*">
            <img id="preview" class="preview" alt="X-ray preview" hidden>
            <div><button class="btn" id="predict" disabled>Analyze</button></div>
            <div id="result" class="result"></div>
        </div>
        <div class="card">
            <h2>Ask the assistant</h2>
            <form id="chat-form">
                <textarea id="message" rows="3" placeholder="What does this result mean?"></textarea>
                <button class="btn" type="submit">Send</button>
            </form>
            <div id="reply" class="reply"></div>
        </div>"#,
        script,
    )
}
