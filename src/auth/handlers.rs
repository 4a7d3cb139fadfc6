use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            LoginFailure, LoginRequest, LoginResponse, MessageResponse, ProfileEditResponse,
            ProfileUpdate, RegisterRequest,
        },
        repo_types::{Identity, Profile},
        services::{
            check_password_policy, hash_password, is_valid_email, normalize_birth_date,
            verify_password, AuthUser, JwtKeys,
        },
    },
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/profile", get(get_profile))
        .route("/auth/profileEdit", post(edit_profile))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.email.is_empty() || payload.password.trim().is_empty() {
        warn!("blank email or password");
        return Err((
            StatusCode::BAD_REQUEST,
            "Email and password are required.".into(),
        ));
    }

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email.".into()));
    }

    let violations = check_password_policy(&payload.password);
    if !violations.is_empty() {
        warn!("password policy violated");
        let message = violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        return Err((StatusCode::BAD_REQUEST, message));
    }

    // Pre-check for the common sequential case; the unique constraint
    // below still catches the concurrent one.
    match Identity::find_by_email(&state.db, &payload.email).await {
        Ok(Some(_)) => {
            warn!(email = %payload.email, "email already registered");
            return Err((StatusCode::CONFLICT, "Email is already in use.".into()));
        }
        Ok(None) => {}
        Err(e) => return Err(internal(e)),
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => return Err(internal(e)),
    };

    // The display name defaults to the email, as the original identity
    // store did.
    let identity =
        match Identity::create_with_profile(&state.db, &payload.email, &payload.email, &hash)
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                let unique_violation = e
                    .downcast_ref::<sqlx::Error>()
                    .and_then(|e| e.as_database_error())
                    .is_some_and(|d| d.is_unique_violation());
                if unique_violation {
                    warn!(email = %payload.email, "email registration race lost");
                    return Err((StatusCode::CONFLICT, "Email is already in use.".into()));
                }
                return Err(internal(e));
            }
        };

    info!(user_id = %identity.id, email = %identity.email, "user registered");
    Ok(Json(MessageResponse {
        message: "User registered successfully.".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, (StatusCode, Json<LoginFailure>)> {
    payload.email = payload.email.trim().to_lowercase();

    let identity = match Identity::find_by_email(&state.db, &payload.email).await {
        Ok(Some(identity)) => Some(identity),
        Ok(None) => None,
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(login_internal());
        }
    };

    // Unknown email and wrong password take the same exit so the two are
    // indistinguishable to the caller.
    let identity = match identity {
        Some(identity) => {
            match verify_password(&payload.password, &identity.password_hash) {
                Ok(true) => Some(identity),
                Ok(false) => None,
                Err(e) => {
                    error!(error = %e, "verify_password failed");
                    return Err(login_internal());
                }
            }
        }
        None => None,
    };

    let Some(identity) = identity else {
        warn!(email = %payload.email, "login rejected");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(LoginFailure {
                success: false,
                message: "Invalid credentials.".into(),
            }),
        ));
    };

    let keys = JwtKeys::from_ref(&state);
    let (token, expiration) = match keys.sign(&identity.email, &identity.user_name) {
        Ok(pair) => pair,
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            return Err(login_internal());
        }
    };

    info!(user_id = %identity.id, email = %identity.email, "user logged in");
    Ok(Json(LoginResponse {
        token,
        expiration,
        user_name: identity.user_name,
        email: identity.email,
    }))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Profile>, (StatusCode, String)> {
    let profile = Profile::find_by_email(&state.db, &claims.sub)
        .await
        .map_err(internal)?;

    match profile {
        Some(profile) => Ok(Json(profile)),
        None => Err((StatusCode::NOT_FOUND, "User not found.".into())),
    }
}

#[instrument(skip(state, patch))]
pub async fn edit_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(mut patch): Json<ProfileUpdate>,
) -> Result<Json<ProfileEditResponse>, (StatusCode, String)> {
    patch.date_of_birth = normalize_birth_date(patch.date_of_birth);

    // The target email comes from the token claims, never from the body:
    // a caller can only edit their own profile.
    let updated = Profile::update(&state.db, &claims.sub, &patch)
        .await
        .map_err(internal)?;

    match updated {
        Some(profile) => {
            info!(email = %profile.email, "profile updated");
            Ok(Json(ProfileEditResponse {
                message: "Profile updated successfully".into(),
                updated_user: profile,
            }))
        }
        None => Err((StatusCode::NOT_FOUND, "User not found.".into())),
    }
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error.".into())
}

fn login_internal() -> (StatusCode, Json<LoginFailure>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(LoginFailure {
            success: false,
            message: "Internal server error.".into(),
        }),
    )
}

#[cfg(test)]
mod dto_tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn login_response_uses_wire_field_names() {
        let response = LoginResponse {
            token: "abc".into(),
            expiration: datetime!(2026-01-01 12:00 UTC),
            user_name: "reader@example.com".into(),
            email: "reader@example.com".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("token").is_some());
        assert!(json.get("expiration").is_some());
        assert!(json.get("userName").is_some());
        assert!(json.get("email").is_some());
    }

    #[test]
    fn login_failure_shape() {
        let failure = LoginFailure {
            success: false,
            message: "Invalid credentials.".into(),
        };
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Invalid credentials.");
    }

    #[test]
    fn profile_serializes_camel_case_with_rfc3339_birth_date() {
        let profile = Profile {
            email: "reader@example.com".into(),
            first_name: Some("Ada".into()),
            last_name: None,
            phone_number: None,
            gender: None,
            date_of_birth: Some(datetime!(1990-05-01 10:00 UTC)),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert!(json["lastName"].is_null());
        assert_eq!(json["dateOfBirth"], "1990-05-01T10:00:00Z");
    }

    #[test]
    fn profile_update_with_omitted_birth_date_deserializes_to_none() {
        let patch: ProfileUpdate =
            serde_json::from_str(r#"{"firstName": "Ada", "gender": "female"}"#).unwrap();
        assert_eq!(patch.first_name.as_deref(), Some("Ada"));
        assert!(patch.date_of_birth.is_none());
    }
}
