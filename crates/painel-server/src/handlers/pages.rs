//! Server-rendered page shells.
//!
//! Gated routes reach these handlers only through
//! [`page_gate`](crate::gatekeeper::page_gate), which puts the actor into the
//! request extensions. Navigation lists only what the actor can open.

use axum::{
    Extension,
    extract::{Path, Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use painel_authz::Actor;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::me::landing_module;
use crate::server::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

pub async fn root() -> Redirect {
    Redirect::to("/dashboard")
}

/// GET /login
pub async fn login_page(State(state): State<AppState>, Query(query): Query<LoginQuery>) -> Html<String> {
    let next = safe_next(query.next.as_deref());
    let title = state.settings.get().title;
    let body = format!(
        r#"<form id="login">
<label>Usuário <input name="username" autocomplete="username"></label>
<label>Senha <input name="password" type="password" autocomplete="current-password"></label>
<button type="submit">Entrar</button>
</form>
<script>
document.getElementById("login").addEventListener("submit", async (e) => {{
  e.preventDefault();
  const form = new FormData(e.target);
  const res = await fetch("/api/auth/login", {{
    method: "POST",
    headers: {{ "content-type": "application/json" }},
    body: JSON.stringify({{ username: form.get("username"), password: form.get("password") }}),
  }});
  if (res.ok) {{ window.location = {next}; }}
}});
</script>"#,
        next = js_string(next)
    );
    Html(layout(&title, "Entrar", &[], &body))
}

/// GET /dashboard
pub async fn dashboard_index(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Response {
    let modules = state
        .evaluator
        .accessible_modules(&actor.role, &actor.permissions);
    match landing_module(&state, &modules) {
        Some(module) => Redirect::to(&format!("/dashboard/{module}")).into_response(),
        None => {
            let title = state.settings.get().title;
            Html(layout(
                &title,
                "Painel",
                &[],
                "<p>Nenhum módulo disponível para o seu perfil.</p>",
            ))
            .into_response()
        }
    }
}

/// GET /dashboard/{module}
pub async fn dashboard_module(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(module): Path<String>,
) -> Result<Html<String>, ApiError> {
    let registry = state.evaluator.registry();
    let info = registry
        .get(&module)
        .ok_or_else(|| ApiError::not_found(format!("Unknown module '{module}'")))?;
    let nav = navigation(&state, &actor);
    let settings = state.settings.get();
    let body = format!(
        r#"<section data-module="{id}" data-refresh-minutes="{refresh}"></section>"#,
        id = escape_html(&info.id),
        refresh = settings.refresh_minutes
    );
    Ok(Html(layout(&settings.title, &info.label, &nav, &body)))
}

/// GET /admin/users
pub async fn admin_users(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Html<String> {
    let nav = navigation(&state, &actor);
    let title = state.settings.get().title;
    Html(layout(
        &title,
        "Usuários",
        &nav,
        r#"<section data-api="/api/admin/users"></section>"#,
    ))
}

/// GET /admin/config
pub async fn admin_config(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> Html<String> {
    let nav = navigation(&state, &actor);
    let settings = state.settings.get();
    let editable = state
        .evaluator
        .capabilities(&actor.role, &actor.permissions)
        .edit_config;
    let body = format!(
        r#"<dl>
<dt>Título</dt><dd>{title}</dd>
<dt>Atualização (min)</dt><dd>{refresh}</dd>
</dl>
<section data-api="/api/admin/config" data-editable="{editable}"></section>"#,
        title = escape_html(&settings.title),
        refresh = settings.refresh_minutes,
    );
    Html(layout(&settings.title, "Configuração", &nav, &body))
}

/// Links the actor may follow: accessible modules, then admin pages.
fn navigation(state: &AppState, actor: &Actor) -> Vec<(String, String)> {
    let evaluator = &state.evaluator;
    let mut links: Vec<(String, String)> = evaluator
        .registry()
        .modules()
        .iter()
        .filter(|m| evaluator.can_access_module(&actor.role, &actor.permissions, &m.id))
        .map(|m| (format!("/dashboard/{}", m.id), m.label.clone()))
        .collect();

    let capabilities = evaluator.capabilities(&actor.role, &actor.permissions);
    if capabilities.manage_users {
        links.push(("/admin/users".to_string(), "Usuários".to_string()));
    }
    if capabilities.view_config {
        links.push(("/admin/config".to_string(), "Configuração".to_string()));
    }
    links
}

fn layout(site_title: &str, heading: &str, nav: &[(String, String)], body: &str) -> String {
    let links: String = nav
        .iter()
        .map(|(href, label)| {
            format!(
                r#"<li><a href="{}">{}</a></li>"#,
                escape_html(href),
                escape_html(label)
            )
        })
        .collect();
    format!(
        r#"<!doctype html>
<html lang="pt-BR">
<head><meta charset="utf-8"><title>{site} · {heading}</title></head>
<body>
<nav><ul>{links}</ul></nav>
<main><h1>{heading}</h1>
{body}
</main>
</body>
</html>"#,
        site = escape_html(site_title),
        heading = escape_html(heading),
    )
}

/// Only same-site absolute paths are followed after login.
///
/// Browsers read `\` as `/` and drop tabs and newlines from URLs, so any
/// backslash, whitespace or control character rejects the target.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path
                    .chars()
                    .any(|c| c == '\\' || c.is_whitespace() || c.is_control()) =>
        {
            path
        }
        _ => "/dashboard",
    }
}

/// JSON string literal that is safe inside a `<script>` element.
fn js_string(input: &str) -> String {
    serde_json::to_string(input)
        .unwrap_or_else(|_| "\"/dashboard\"".to_string())
        .replace("</", "<\\/")
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
