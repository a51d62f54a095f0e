use axum::{
    Extension, Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use tracing::{info, warn};

use barter_db::StoreError;
use barter_types::api::{
    Claims, ProposalCreateQuery, ProposalForm, ProposalListQuery, ProposalStatusForm,
};
use barter_types::models::ProposalStatus;

use crate::auth::AppState;
use crate::forms::{self, DUPLICATE_PROPOSAL, FormErrors};
use crate::extract::RowId;
use crate::{AppError, blocking, pages, redirect};

/// GET /proposals/: everything the requester sends or receives.
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ProposalListQuery>,
) -> Result<Html<String>, AppError> {
    let user_id = claims.sub.to_string();
    let q = query.clone();
    let proposals =
        blocking(&state, move |db| Ok(db.list_proposals_for_user(&user_id, &q)?)).await?;
    Ok(pages::proposal_list(Some(&claims), &proposals, &query))
}

pub async fn create_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<ProposalCreateQuery>,
) -> Result<Html<String>, AppError> {
    let ads = blocking(&state, |db| Ok(db.list_all_ads()?)).await?;
    let form = ProposalForm {
        ad_receiver: query.ad_receiver.unwrap_or_default(),
        ..Default::default()
    };
    Ok(pages::proposal_form(
        Some(&claims),
        &ads,
        &form,
        &FormErrors::default(),
    ))
}

/// POST /proposals/create/: new proposals always start out pending.
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Form(form): Form<ProposalForm>,
) -> Result<Response, AppError> {
    let submitted = form.clone();
    let outcome = blocking(&state, move |db| {
        let errors = match forms::clean_proposal(db, &submitted)? {
            Ok(input) => {
                match db.insert_proposal(input.sender_id, input.receiver_id, &input.comment) {
                    Ok(id) => return Ok(Ok(id)),
                    // Lost a race with an identical submission
                    Err(StoreError::DuplicateProposal) => {
                        FormErrors::with_non_field(DUPLICATE_PROPOSAL)
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(errors) => errors,
        };
        Ok(Err((errors, db.list_all_ads()?)))
    })
    .await?;

    match outcome {
        Ok(proposal_id) => {
            info!(proposal_id, by = %claims.username, "Proposal created");
            Ok(redirect(format!("/proposals/{proposal_id}/")))
        }
        Err((errors, ads)) => {
            Ok(pages::proposal_form(Some(&claims), &ads, &form, &errors).into_response())
        }
    }
}

/// GET /proposals/{id}/: visible to any logged-in user.
pub async fn detail(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    RowId(id): RowId,
) -> Result<Html<String>, AppError> {
    let proposal = blocking(&state, move |db| Ok(db.get_proposal(id)?))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(pages::proposal_detail(Some(&claims), &proposal))
}

pub async fn update_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    RowId(id): RowId,
) -> Result<Html<String>, AppError> {
    let proposal = blocking(&state, move |db| Ok(db.get_proposal(id)?))
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(pages::proposal_update(
        Some(&claims),
        &proposal,
        &FormErrors::default(),
    ))
}

/// POST /proposals/{id}/update/: an unknown status just shows the form again.
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    RowId(id): RowId,
    Form(form): Form<ProposalStatusForm>,
) -> Result<Response, AppError> {
    let status = form.status.parse::<ProposalStatus>().ok();

    let outcome = blocking(&state, move |db| {
        let Some(proposal) = db.get_proposal(id)? else {
            return Err(AppError::NotFound);
        };
        let Some(status) = status else {
            return Ok(Err((proposal, FormErrors::default())));
        };
        match db.update_proposal_status(id, status) {
            Ok(true) => Ok(Ok(status)),
            Ok(false) => Err(AppError::NotFound),
            Err(StoreError::DuplicateProposal) => {
                let proposal = db.get_proposal(id)?.ok_or(AppError::NotFound)?;
                Ok(Err((proposal, FormErrors::with_non_field(DUPLICATE_PROPOSAL))))
            }
            Err(e) => Err(e.into()),
        }
    })
    .await?;

    match outcome {
        Ok(status) => {
            info!(proposal_id = id, %status, by = %claims.username, "Proposal status changed");
            Ok(redirect(format!("/proposals/{id}/")))
        }
        Err((proposal, errors)) => {
            if !errors.is_empty() {
                warn!(proposal_id = id, "Status change would reopen a duplicate proposal");
            }
            Ok(pages::proposal_update(Some(&claims), &proposal, &errors).into_response())
        }
    }
}
