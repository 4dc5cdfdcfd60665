// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::HeaderName,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        gate::ACCESS_TOKEN_RESPONSE_HEADER,
        message::ChainLabel,
        middleware::{
            require_roles, require_sdk_api_key, require_sdk_app, resolve_caller, RouteGuard,
        },
        AuthenticatedUser, Nonce, Role, SiweMessage, SiwsMessage, TokenClaims, TokenPair,
        TokenPayload, TokenVerification,
    },
    models::{
        CreateAppRequest, CurrentSessionResponse, DevLoginRequest, DevSessionResponse,
        MessageResponse, RegisterDevRequest, SdkUserListResponse, SdkWhoAmIResponse,
        SessionListResponse, SiweLoginRequest, SiwsLoginRequest, VerifyJwtRequest,
    },
    state::AppState,
    storage::{App, AppGating, AppLog, DevResponse, LogStatus, SdkUser, Session, User},
};

pub mod app;
pub mod dev;
pub mod health;
pub mod misc;
pub mod sdk;
pub mod session;
pub mod user;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

fn roles(allowed: &'static [Role]) -> RouteGuard {
    RouteGuard::new(allowed)
}

pub fn router(state: AppState) -> Router {
    let session_routes = Router::new()
        .route("/session/nonce/{address}", get(session::get_nonce))
        .route(
            "/session/current",
            get(session::current_session)
                .route_layer(from_fn_with_state(roles(Role::ALL), require_roles)),
        )
        .route(
            "/session",
            get(session::list_sessions)
                .delete(session::logout)
                .route_layer(from_fn_with_state(roles(Role::ALL), require_roles)),
        );

    let user_routes = Router::new()
        .route("/user/login", post(user::login))
        .route(
            "/user/current",
            get(user::current_user)
                .route_layer(from_fn_with_state(roles(&[Role::User]), require_roles)),
        );

    let dev_routes = Router::new()
        .route("/dev", post(dev::register))
        .route("/dev/login", post(dev::login))
        .route(
            "/dev/current",
            get(dev::current_dev).route_layer(from_fn_with_state(roles(&[Role::Dev]), require_roles)),
        );

    let app_routes = Router::new()
        .route(
            "/app",
            get(app::list_apps)
                .post(app::create_app)
                .route_layer(from_fn_with_state(roles(&[Role::Dev]), require_roles)),
        )
        .route(
            "/app/{app_id}",
            delete(app::delete_app)
                .route_layer(from_fn_with_state(roles(&[Role::Dev]), require_roles)),
        )
        .route(
            "/app/{app_id}/gating",
            put(app::update_gating)
                .route_layer(from_fn_with_state(roles(&[Role::Dev]), require_roles)),
        )
        .route(
            "/app/{app_id}/logs",
            get(app::list_logs).route_layer(from_fn_with_state(roles(&[Role::Dev]), require_roles)),
        );

    // The app check is layered last so it runs before the role check
    let sdk_routes = Router::new()
        .route(
            "/sdk/login",
            post(sdk::login).route_layer(from_fn(require_sdk_app)),
        )
        .route(
            "/sdk/whoami",
            get(sdk::whoami)
                .route_layer(from_fn_with_state(roles(&[Role::SdkUser]), require_roles))
                .route_layer(from_fn(require_sdk_app)),
        )
        .route(
            "/sdk/disconnect",
            delete(sdk::disconnect)
                .route_layer(from_fn_with_state(roles(&[Role::SdkUser]), require_roles))
                .route_layer(from_fn(require_sdk_app)),
        )
        .route(
            "/sdk/users",
            get(sdk::list_users).route_layer(from_fn(require_sdk_api_key)),
        );

    let api_routes = Router::new()
        .route("/healthz", get(health::health))
        .route("/misc/verify-jwt", post(misc::verify_jwt))
        .merge(session_routes)
        .merge(user_routes)
        .merge(dev_routes)
        .merge(app_routes)
        .merge(sdk_routes)
        .layer(from_fn_with_state(state.clone(), resolve_caller))
        .with_state(state);

    // Cookies travel cross-origin, so origins are mirrored rather than wildcarded
    let cors = CorsLayer::very_permissive()
        .expose_headers([ACCESS_TOKEN_RESPONSE_HEADER, REQUEST_ID_HEADER]);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
                .layer(cors),
        )
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        session::get_nonce,
        session::current_session,
        session::list_sessions,
        session::logout,
        user::login,
        user::current_user,
        sdk::login,
        sdk::whoami,
        sdk::disconnect,
        sdk::list_users,
        dev::register,
        dev::login,
        dev::current_dev,
        app::create_app,
        app::list_apps,
        app::update_gating,
        app::delete_app,
        app::list_logs,
        misc::verify_jwt
    ),
    components(
        schemas(
            health::HealthResponse,
            Nonce,
            Role,
            SiweMessage,
            SiwsMessage,
            ChainLabel,
            SiweLoginRequest,
            SiwsLoginRequest,
            TokenPair,
            TokenPayload,
            TokenClaims,
            TokenVerification,
            AuthenticatedUser,
            Session,
            User,
            SdkUser,
            App,
            AppGating,
            AppLog,
            LogStatus,
            DevResponse,
            CurrentSessionResponse,
            SessionListResponse,
            MessageResponse,
            RegisterDevRequest,
            DevLoginRequest,
            DevSessionResponse,
            CreateAppRequest,
            SdkWhoAmIResponse,
            SdkUserListResponse,
            VerifyJwtRequest
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "Health", description = "Liveness"),
        (name = "Session", description = "Nonce challenge, current session and logout"),
        (name = "User", description = "End-user wallet sign-in"),
        (name = "SDK", description = "Embedded SDK sign-in, scoped to an app"),
        (name = "Developer", description = "Developer accounts"),
        (name = "Apps", description = "SDK app registration and gating"),
        (name = "Misc", description = "Token inspection")
    )
)]
struct ApiDoc;
