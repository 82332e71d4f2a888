//src/main.rs

use std::net::SocketAddr;

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::middleware::{auth::auth_guard, rate_limit::lookup_rate_limit};

/// Rotas sem token. Dividem prefixos com as protegidas; o `merge` junta os métodos por path.
fn public_routes(app_state: &AppState) -> Router<AppState> {
    let lookup_routes = Router::new()
        .route(
            "/api/pacientes/cedula/{cedula}",
            get(handlers::patients::lookup_by_cedula),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            lookup_rate_limit,
        ));

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        // Auth
        .route("/api/usuarios", post(handlers::auth::register))
        .route("/api/usuarios/check", get(handlers::auth::check_username))
        .route("/api/usuarios/login", post(handlers::auth::login))
        .route("/api/usuarios/reset-request", post(handlers::auth::request_password_reset))
        .route("/api/usuarios/reset", post(handlers::auth::reset_password))
        .route("/api/usuarios/public", get(handlers::users::public_doctors))
        .route("/api/usuarios/public/{id}", get(handlers::doctor_profiles::public_card))
        // Catálogo
        .route("/api/clinicas", get(handlers::clinics::list_clinics))
        .route("/api/clinicas/{id}", get(handlers::clinics::get_clinic))
        .route("/api/planes", get(handlers::plans::list_plans))
        .route(
            "/api/doctor_profiles/{user_id}/public",
            get(handlers::doctor_profiles::public_profile),
        )
        .merge(lookup_routes)
}

fn protected_routes(app_state: &AppState) -> Router<AppState> {
    let user_routes = Router::new()
        .route("/api/usuarios", get(handlers::users::list_users))
        .route("/api/usuarios/mis-datos", get(handlers::users::account_summary))
        .route("/api/usuarios/vincular-dueno", post(handlers::linking::link_owner))
        .route(
            "/api/usuarios/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::delete_user),
        )
        .route("/api/usuarios_admin", post(handlers::users::create_user));

    let clinic_routes = Router::new()
        .route("/api/clinicas", post(handlers::clinics::create_clinic))
        .route("/api/clinicas/{id}", delete(handlers::clinics::delete_clinic))
        .route("/api/clinicas/{id}/perfil", put(handlers::clinics::update_clinic_profile));

    let profile_routes = Router::new()
        .route(
            "/{user_id}",
            get(handlers::doctor_profiles::get_profile).put(handlers::doctor_profiles::upsert_profile),
        )
        .route(
            "/{user_id}/documentos",
            get(handlers::doctor_profiles::list_documents).post(handlers::doctor_profiles::add_documents),
        );

    let branch_routes = Router::new()
        .route("/vincular", post(handlers::branches::link_branch))
        .route("/{clinica_principal_id}", get(handlers::branches::list_branches));

    let plan_routes = Router::new()
        .route("/api/planes", post(handlers::plans::create_plan))
        .route("/api/clinica_planes/asignar", post(handlers::plans::assign_plan))
        .route("/api/clinica_planes/{clinica_id}", get(handlers::plans::active_plan))
        .route("/api/clinica_planes/{clinica_id}/historial", get(handlers::plans::plan_history))
        .route("/api/clinica_planes/{clinica_id}/cambiar", post(handlers::plans::change_plan));

    let purchase_routes = Router::new()
        .route("/comprar-slot", post(handlers::purchases::buy_doctor_slot))
        .route("/validar/{clinica_id}", get(handlers::purchases::validate_doctor_limit))
        .route("/usuarios/{clinica_id}", get(handlers::purchases::doctor_slot_purchasers))
        .route("/{clinica_id}", get(handlers::purchases::doctor_slot_total));

    let patient_purchase_routes = Router::new()
        .route("/comprar", post(handlers::purchases::buy_patient_slot))
        .route("/validar-individual", get(handlers::purchases::validate_individual_limit))
        .route("/validar/{clinica_id}", get(handlers::purchases::validate_patient_limit))
        .route("/{clinica_id}", get(handlers::purchases::patient_slot_total));

    let linking_routes = Router::new()
        .route("/vincular-doctor", post(handlers::linking::link_doctor))
        .route("/desvincular-doctor", post(handlers::linking::unlink_doctor));

    let patient_routes = Router::new()
        .route(
            "/",
            get(handlers::patients::list_patients).post(handlers::patients::create_patient),
        )
        .route(
            "/{id}",
            get(handlers::patients::get_patient)
                .put(handlers::patients::update_patient)
                .delete(handlers::patients::delete_patient),
        );

    let appointment_routes = Router::new()
        .route(
            "/",
            get(handlers::appointments::list_appointments).post(handlers::appointments::create_appointment),
        )
        .route(
            "/{id}",
            get(handlers::appointments::get_appointment)
                .put(handlers::appointments::update_appointment)
                .delete(handlers::appointments::delete_appointment),
        );

    let history_routes = Router::new()
        .route(
            "/",
            get(handlers::history::list_history).post(handlers::history::create_history),
        )
        .route("/paciente/{id}", get(handlers::history::list_history_by_patient))
        .route(
            "/{id}",
            get(handlers::history::get_history)
                .put(handlers::history::update_history)
                .delete(handlers::history::delete_history),
        );

    Router::new()
        .merge(user_routes)
        .merge(clinic_routes)
        .merge(plan_routes)
        .nest("/api/doctor_profiles", profile_routes)
        .nest("/api/sucursales", branch_routes)
        .nest("/api/compras_doctores", purchase_routes)
        .nest("/api/compras_pacientes", patient_purchase_routes)
        .nest("/api/vinculacion_doctor", linking_routes)
        .nest("/api/pacientes", patient_routes)
        .nest("/api/citas", appointment_routes)
        .nest("/api/historial", history_routes)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ))
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public_routes(&app_state))
        .merge(protected_routes(&app_state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let app_state = AppState::new()
        .await
        .context("Falha ao inicializar o estado da aplicação.")?;

    sqlx::migrate!()
        .run(&app_state.db_pool)
        .await
        .context("Falha ao rodar as migrações do banco de dados.")?;

    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let addr = SocketAddr::from(([0, 0, 0, 0], app_state.config.port));
    let app = build_router(app_state);

    let listener = TcpListener::bind(addr)
        .await
        .context("Falha ao iniciar o listener TCP")?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);

    // ConnectInfo alimenta a chave do rate limit da busca por cédula
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .context("Erro no servidor Axum")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::config::test_support::lazy_state;

    #[tokio::test]
    async fn health_is_public() {
        let response = build_router(lazy_state())
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_token() {
        for uri in [
            "/api/usuarios",
            "/api/pacientes",
            "/api/citas",
            "/api/compras_pacientes/validar-individual",
            "/api/doctor_profiles/6f1c2a8e-0d4b-4f7a-9c3e-2b5d8a1e7f40",
            "/api/sucursales/6f1c2a8e-0d4b-4f7a-9c3e-2b5d8a1e7f40",
        ] {
            let response = build_router(lazy_state())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
