use axum::{
    Extension, Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::info;

use barter_types::api::{AdForm, AdListQuery, Claims};

use crate::auth::{AppState, current_user};
use crate::forms::{self, FormErrors};
use crate::extract::RowId;
use crate::{AppError, blocking, pages, redirect};

pub const ADS_PER_PAGE: u32 = 10;

/// GET /ads/: public search, filter and pagination.
pub async fn list(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<AdListQuery>,
) -> Result<Html<String>, AppError> {
    let user = current_user(&jar, &state);
    let q = query.clone();
    let page = blocking(&state, move |db| Ok(db.list_ads(&q, ADS_PER_PAGE)?)).await?;
    Ok(pages::ad_list(user.as_ref(), &page, &query))
}

/// GET /ads/{id}/
pub async fn detail(
    State(state): State<AppState>,
    jar: CookieJar,
    RowId(id): RowId,
) -> Result<Html<String>, AppError> {
    let user = current_user(&jar, &state);
    let ad = blocking(&state, move |db| Ok(db.get_ad(id)?))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(pages::ad_detail(user.as_ref(), &ad))
}

pub async fn create_page(Extension(claims): Extension<Claims>) -> Html<String> {
    pages::ad_form(
        Some(&claims),
        "Post an ad",
        "/ads/create/",
        &AdForm::default(),
        &FormErrors::default(),
    )
}

/// POST /ads/create/: the new ad always belongs to the requester.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<AdForm>,
) -> Result<Response, AppError> {
    let fields = match forms::clean_ad(&form) {
        Ok(fields) => fields,
        Err(errors) => {
            return Ok(
                pages::ad_form(Some(&claims), "Post an ad", "/ads/create/", &form, &errors)
                    .into_response(),
            );
        }
    };

    let owner_id = claims.sub.to_string();
    let ad_id = blocking(&state, move |db| Ok(db.insert_ad(&owner_id, &fields)?)).await?;

    info!(ad_id, owner = %claims.username, "Ad created");
    Ok(redirect(format!("/ads/{ad_id}/")))
}

pub async fn edit_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    RowId(id): RowId,
) -> Result<Html<String>, AppError> {
    let owner_id = claims.sub.to_string();
    let ad = blocking(&state, move |db| Ok(db.get_owned_ad(id, &owner_id)?))
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(pages::ad_form(
        Some(&claims),
        "Edit ad",
        &format!("/ads/{id}/edit/"),
        &forms::ad_form_from(&ad),
        &FormErrors::default(),
    ))
}

/// POST /ads/{id}/edit/: 404 for anyone but the owner, before the form is even looked at.
pub async fn edit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    RowId(id): RowId,
    Form(form): Form<AdForm>,
) -> Result<Response, AppError> {
    let owner_id = claims.sub.to_string();
    let cleaned = forms::clean_ad(&form);

    let outcome = blocking(&state, move |db| {
        if db.get_owned_ad(id, &owner_id)?.is_none() {
            return Err(AppError::NotFound);
        }
        match cleaned {
            Ok(fields) => {
                db.update_ad(id, &owner_id, &fields)?;
                Ok(None)
            }
            Err(errors) => Ok(Some(errors)),
        }
    })
    .await?;

    match outcome {
        None => {
            info!(ad_id = id, owner = %claims.username, "Ad updated");
            Ok(redirect(format!("/ads/{id}/")))
        }
        Some(errors) => Ok(pages::ad_form(
            Some(&claims),
            "Edit ad",
            &format!("/ads/{id}/edit/"),
            &form,
            &errors,
        )
        .into_response()),
    }
}

pub async fn delete_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    RowId(id): RowId,
) -> Result<Html<String>, AppError> {
    let owner_id = claims.sub.to_string();
    let ad = blocking(&state, move |db| Ok(db.get_owned_ad(id, &owner_id)?))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(pages::ad_delete(Some(&claims), &ad))
}

/// POST /ads/{id}/delete/: removes the ad and, by cascade, its proposals.
pub async fn delete(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    RowId(id): RowId,
) -> Result<Response, AppError> {
    let owner_id = claims.sub.to_string();
    let deleted = blocking(&state, move |db| Ok(db.delete_ad(id, &owner_id)?)).await?;
    if !deleted {
        return Err(AppError::NotFound);
    }

    info!(ad_id = id, owner = %claims.username, "Ad deleted");
    Ok(redirect("/ads/"))
}
