mod common;

use common::{CRON_SECRET, start_server, test_config};
use painel_server::storage::RunLog;
use serde_json::{Value, json};

#[tokio::test]
async fn user_management_requires_manage_permission() {
    let server = start_server(test_config()).await;
    server.seed_user("admin", "senha", "ADM", &[]).await;
    server.seed_user("mkt", "senha", "Marketing", &[]).await;
    // Extra grant on top of a narrow role
    server
        .seed_user("gerente", "senha", "Comercial", &["admin:users:manage"])
        .await;

    let mkt = server.login("mkt", "senha").await;
    let resp = server
        .client
        .get(server.url("/api/admin/users"))
        .bearer_auth(&mkt)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");

    let gerente = server.login("gerente", "senha").await;
    let resp = server
        .client
        .get(server.url("/api/admin/users"))
        .bearer_auth(&gerente)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let admin = server.login("admin", "senha").await;
    let resp = server
        .client
        .get(server.url("/api/admin/users"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let users: Value = resp.json().await.unwrap();
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 3);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));

    server.stop().await;
}

#[tokio::test]
async fn create_update_and_delete_users() {
    let server = start_server(test_config()).await;
    let admin_user = server.seed_user("admin", "senha", "ADM", &[]).await;
    let admin = server.login("admin", "senha").await;

    // Create
    let resp = server
        .client
        .post(server.url("/api/admin/users"))
        .bearer_auth(&admin)
        .json(&json!({
            "username": "rita",
            "password": "senha-rita",
            "role": "Marketing",
            "extra_permissions": ["module:financeiro:view"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let created: Value = resp.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(
        created["effective_permissions"],
        json!([
            "module:marketing:view",
            "activity:view:own",
            "module:financeiro:view"
        ])
    );

    // The new user can log in and sees both modules
    let resp = server
        .client
        .post(server.url("/api/auth/login"))
        .json(&json!({ "username": "rita", "password": "senha-rita" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["modules"], json!(["marketing", "financeiro"]));

    // Duplicate username
    let resp = server
        .client
        .post(server.url("/api/admin/users"))
        .bearer_auth(&admin)
        .json(&json!({ "username": "rita", "password": "x", "role": "Marketing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Unknown role
    let resp = server
        .client
        .post(server.url("/api/admin/users"))
        .bearer_auth(&admin)
        .json(&json!({ "username": "novo", "password": "x", "role": "Estagiário" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Malformed extra permission
    let resp = server
        .client
        .post(server.url("/api/admin/users"))
        .bearer_auth(&admin)
        .json(&json!({
            "username": "novo",
            "password": "x",
            "role": "Marketing",
            "extra_permissions": ["module:financeiro"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Update role
    let resp = server
        .client
        .put(server.url(&format!("/api/admin/users/{id}")))
        .bearer_auth(&admin)
        .json(&json!({ "role": "Customer Care", "extra_permissions": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["role"], "Customer Care");

    // Self protection
    let resp = server
        .client
        .put(server.url(&format!("/api/admin/users/{}", admin_user.id)))
        .bearer_auth(&admin)
        .json(&json!({ "active": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let resp = server
        .client
        .delete(server.url(&format!("/api/admin/users/{}", admin_user.id)))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Delete
    let resp = server
        .client
        .delete(server.url(&format!("/api/admin/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
    let resp = server
        .client
        .get(server.url(&format!("/api/admin/users/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    server.stop().await;
}

#[tokio::test]
async fn managers_cannot_grant_beyond_their_own_permissions() {
    let server = start_server(test_config()).await;
    let admin_user = server.seed_user("admin", "senha", "ADM", &[]).await;
    let gestor = server
        .seed_user("gestor", "senha", "Marketing", &["admin:users:manage"])
        .await;
    let board = server.seed_user("diretor", "senha", "Diretoria", &[]).await;
    let token = server.login("gestor", "senha").await;

    // Self promotion to the super-admin role
    let resp = server
        .client
        .put(server.url(&format!("/api/admin/users/{}", gestor.id)))
        .bearer_auth(&token)
        .json(&json!({ "role": "ADM" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Wildcard and codes the manager does not hold
    for extra in [json!(["*"]), json!(["admin:config:edit"]), json!(["module:*:view"])] {
        let resp = server
            .client
            .put(server.url(&format!("/api/admin/users/{}", gestor.id)))
            .bearer_auth(&token)
            .json(&json!({ "extra_permissions": extra }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 403, "granting {extra}");
    }

    // A role carrying more than the manager holds
    let resp = server
        .client
        .post(server.url("/api/admin/users"))
        .bearer_auth(&token)
        .json(&json!({ "username": "novo", "password": "x", "role": "Diretoria" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let resp = server
        .client
        .post(server.url("/api/admin/users"))
        .bearer_auth(&token)
        .json(&json!({ "username": "root2", "password": "x", "role": "ADM" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Within its own grants the manager works normally
    let resp = server
        .client
        .post(server.url("/api/admin/users"))
        .bearer_auth(&token)
        .json(&json!({ "username": "novo", "password": "x", "role": "Marketing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Roles cannot be widened or the super-admin role touched
    let resp = server
        .client
        .put(server.url("/api/admin/roles/Marketing"))
        .bearer_auth(&token)
        .json(&json!({ "permissions": ["module:marketing:view", "module:financeiro:view"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let resp = server
        .client
        .put(server.url("/api/admin/roles/ADM"))
        .bearer_auth(&token)
        .json(&json!({ "permissions": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let resp = server
        .client
        .post(server.url("/api/admin/roles"))
        .bearer_auth(&token)
        .json(&json!({ "name": "Tudo", "permissions": ["*"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Accounts with more power than the manager are out of reach
    let resp = server
        .client
        .put(server.url(&format!("/api/admin/users/{}", admin_user.id)))
        .bearer_auth(&token)
        .json(&json!({ "password": "tomada" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let resp = server
        .client
        .delete(server.url(&format!("/api/admin/users/{}", board.id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    // Nothing changed for the manager
    let token = server.login("gestor", "senha").await;
    let me: Value = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["role"], "Marketing");
    assert_eq!(me["capabilities"]["edit_config"], false);

    // The super-admin may still hand out the super-admin role
    let admin = server.login("admin", "senha").await;
    let resp = server
        .client
        .put(server.url(&format!("/api/admin/users/{}", gestor.id)))
        .bearer_auth(&admin)
        .json(&json!({ "role": "ADM" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    server.stop().await;
}

#[tokio::test]
async fn role_lifecycle() {
    let server = start_server(test_config()).await;
    server.seed_user("admin", "senha", "ADM", &[]).await;
    let admin = server.login("admin", "senha").await;

    let resp = server
        .client
        .get(server.url("/api/admin/roles"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    let roles: Value = resp.json().await.unwrap();
    assert_eq!(roles.as_array().unwrap().len(), 6);

    // Malformed code
    let resp = server
        .client
        .post(server.url("/api/admin/roles"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Financeiro", "permissions": ["financeiro"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = server
        .client
        .post(server.url("/api/admin/roles"))
        .bearer_auth(&admin)
        .json(&json!({
            "name": "Financeiro",
            "description": "Time financeiro",
            "permissions": ["module:financeiro:view"],
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);

    // Duplicate
    let resp = server
        .client
        .post(server.url("/api/admin/roles"))
        .bearer_auth(&admin)
        .json(&json!({ "name": "Financeiro", "permissions": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = server
        .client
        .put(server.url("/api/admin/roles/Financeiro"))
        .bearer_auth(&admin)
        .json(&json!({ "permissions": ["module:financeiro:view", "module:cobranca:view"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let role: Value = resp.json().await.unwrap();
    assert_eq!(role["description"], "Time financeiro");
    assert_eq!(role["permissions"].as_array().unwrap().len(), 2);

    // Roles in use cannot be deleted
    server.seed_user("fin", "senha", "Financeiro", &[]).await;
    let resp = server
        .client
        .delete(server.url("/api/admin/roles/Financeiro"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // Built-in roles cannot be deleted either
    let resp = server
        .client
        .delete(server.url("/api/admin/roles/Marketing"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    let resp = server
        .client
        .delete(server.url("/api/admin/roles/Inexistente"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // The super-admin bypass does not depend on the role's grants
    let resp = server
        .client
        .put(server.url("/api/admin/roles/ADM"))
        .bearer_auth(&admin)
        .json(&json!({ "permissions": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let admin = server.login("admin", "senha").await;
    let me: Value = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["permissions"], json!([]));
    assert_eq!(me["modules"].as_array().unwrap().len(), 7);
    let resp = server
        .client
        .get(server.url("/api/admin/roles"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    server.stop().await;
}

#[tokio::test]
async fn permission_catalog_and_expansion() {
    let server = start_server(test_config()).await;
    server.seed_user("admin", "senha", "ADM", &[]).await;
    server.seed_user("cc", "senha", "Customer Care", &[]).await;
    let admin = server.login("admin", "senha").await;
    let cc = server.login("cc", "senha").await;

    let resp = server
        .client
        .get(server.url("/api/permissions/catalog"))
        .bearer_auth(&cc)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let catalog: Value = server
        .client
        .get(server.url("/api/permissions/catalog"))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(catalog["roles"][0]["name"], "ADM");
    let codes: Vec<&str> = catalog["permissions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["code"].as_str().unwrap())
        .collect();
    assert!(codes.contains(&"module:cobranca:view"));
    assert!(codes.contains(&"admin:users:manage"));

    let expanded: Value = server
        .client
        .post(server.url("/api/permissions/expand"))
        .bearer_auth(&admin)
        .json(&json!({ "permissions": ["module:*:view", "activity:view:own"] }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let expanded = expanded["permissions"].as_array().unwrap();
    assert_eq!(expanded.len(), 8);
    assert_eq!(expanded[0], "module:visao-geral:view");
    assert_eq!(expanded[7], "activity:view:own");

    server.stop().await;
}

#[tokio::test]
async fn activities_are_scoped_by_permission() {
    let server = start_server(test_config()).await;
    let mkt_user = server.seed_user("mkt", "senha", "Marketing", &[]).await;
    server.seed_user("diretor", "senha", "Diretoria", &[]).await;
    server.seed_user("cc", "senha", "Customer Care", &[]).await;
    let mkt = server.login("mkt", "senha").await;
    let diretor = server.login("diretor", "senha").await;
    server.login("cc", "senha").await;

    let own: Value = server
        .client
        .get(server.url("/api/activities"))
        .bearer_auth(&mkt)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let own = own.as_array().unwrap();
    assert_eq!(own.len(), 1);
    assert_eq!(own[0]["user_id"], mkt_user.id.as_str());
    assert_eq!(own[0]["action"], "login");

    let all: Value = server
        .client
        .get(server.url("/api/activities?limit=2"))
        .bearer_auth(&diretor)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 2);
    // Newest first
    assert_eq!(all[0]["username"], "cc");

    server.stop().await;
}

#[tokio::test]
async fn config_read_and_edit() {
    let server = start_server(test_config()).await;
    server.seed_user("admin", "senha", "ADM", &[]).await;
    server.seed_user("diretor", "senha", "Diretoria", &[]).await;
    server.seed_user("mkt", "senha", "Marketing", &[]).await;
    let admin = server.login("admin", "senha").await;
    let diretor = server.login("diretor", "senha").await;
    let mkt = server.login("mkt", "senha").await;

    let resp = server
        .client
        .get(server.url("/api/admin/config"))
        .bearer_auth(&mkt)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = server
        .client
        .get(server.url("/api/admin/config"))
        .bearer_auth(&diretor)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let settings: Value = resp.json().await.unwrap();
    assert_eq!(settings["refresh_minutes"], 15);

    let next = json!({
        "title": "Painel da Diretoria",
        "refresh_minutes": 5,
        "default_module": "financeiro",
    });
    let resp = server
        .client
        .put(server.url("/api/admin/config"))
        .bearer_auth(&diretor)
        .json(&next)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);

    let resp = server
        .client
        .put(server.url("/api/admin/config"))
        .bearer_auth(&admin)
        .json(&next)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The default module now drives the board's landing page
    let me: Value = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(&diretor)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["landing_module"], "financeiro");

    let resp = server
        .client
        .put(server.url("/api/admin/config"))
        .bearer_auth(&admin)
        .json(&json!({ "title": "x", "refresh_minutes": 5, "default_module": "rh" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    server.stop().await;
}

#[tokio::test]
async fn cron_track_checks_secret_and_records_runs() {
    let server = start_server(test_config()).await;

    let resp = server
        .client
        .post(server.url("/api/cron/track"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = server
        .client
        .post(server.url("/api/cron/track"))
        .header("x-cron-secret", "wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    server.seed_user("mkt", "senha", "Marketing", &[]).await;
    server.login("mkt", "senha").await;

    let resp = server
        .client
        .post(server.url("/api/cron/track"))
        .header("x-cron-secret", CRON_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["job"], "activity-summary");
    assert_eq!(body["status"], "success");
    assert_eq!(body["processed"], 1);

    let runs = server.state.runs.list_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].id, body["run_id"].as_str().unwrap());

    server.stop().await;

    // Without a configured secret the endpoint does not exist
    let mut cfg = test_config();
    cfg.cron.secret = None;
    let server = start_server(cfg).await;
    let resp = server
        .client
        .post(server.url("/api/cron/track"))
        .header("x-cron-secret", CRON_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    server.stop().await;
}
