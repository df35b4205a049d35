use axum::extract::State;
use axum::response::IntoResponse;
use profile_api::Payload;
use profile_api::profile::{ProfileForm, SavedProfile};
use serde_json::{Map, Value};

use crate::net::error;
use crate::profile::RequestContext;
use crate::sec::authn::initiator::Initiator;
use crate::state::{ArcShared, Shared};
use crate::user::User;

pub async fn retrieve(
    State(state): State<ArcShared>,
    initiator: Initiator,
) -> error::Result<impl IntoResponse> {
    Ok(Payload::new(profile_form(&state, initiator.user())?))
}

pub async fn update(
    State(state): State<ArcShared>,
    initiator: Initiator,
    axum::Json(json): axum::Json<Map<String, Value>>,
) -> error::Result<impl IntoResponse> {
    Ok(Payload::new(save_profile(&state, initiator.user(), json)?))
}

/// the edit form for the user, filled with the data of a previously failed
/// save when there is one
pub fn profile_form(state: &Shared, user: &User) -> error::Result<ProfileForm> {
    let profiles = state.profiles();
    let mut ctx = RequestContext::from(user);

    let prior = state.form_data().get(&ctx.user_id);
    let form = profiles.prepare_form(&mut ctx, prior)?;

    let oteps = if user.otp.is_enabled() {
        user.otp.otep.clone()
    } else {
        Vec::new()
    };

    Ok(ProfileForm {
        form: form.descriptor,
        data: form.data,
        twofactor: profiles.two_factor_methods(user),
        oteps,
    })
}

/// validates the submission against the prepared form and saves it. a
/// submission that fails is kept for the next form
pub fn save_profile(
    state: &Shared,
    user: &User,
    json: Map<String, Value>
) -> error::Result<SavedProfile> {
    let profiles = state.profiles();
    let mut ctx = RequestContext::from(user);

    let form = profiles.prepare_form(&mut ctx, None)?;

    if let Err(err) = form.descriptor.validate(&json) {
        tracing::debug!("user {} profile submission is invalid: {err}", ctx.user_id);

        state.form_data().store(ctx.user_id, json);

        return Err(err.into());
    }

    match profiles.save(&mut ctx, json.clone()) {
        Ok(saved) => {
            state.form_data().clear(&ctx.user_id);

            Ok(SavedProfile {
                user: saved.to_profile(),
            })
        },
        Err(err) => {
            tracing::info!("user {} profile save failed: {err}", ctx.user_id);

            state.form_data().store(ctx.user_id, json);

            Err(err.into())
        }
    }
}
