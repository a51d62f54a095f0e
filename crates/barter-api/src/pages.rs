//! Server-rendered HTML pages.

use axum::response::Html;
use maud::{DOCTYPE, Markup, html};

use barter_db::models::{AdRow, Page, ProposalRow};
use barter_types::api::{
    AdForm, AdListQuery, Claims, LoginForm, ProposalForm, ProposalListQuery, SignupForm, present,
};
use barter_types::models::{Condition, ProposalStatus};

use crate::forms::FormErrors;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

fn layout(title: &str, user: Option<&Claims>, content: Markup) -> Html<String> {
    let page = html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) " | Barter" }
                link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css";
            }
            body {
                nav class="navbar navbar-expand bg-light mb-4" {
                    div class="container" {
                        a class="navbar-brand" href="/ads/" { "Barter" }
                        ul class="navbar-nav ms-auto" {
                            @if let Some(user) = user {
                                li class="nav-item" { a class="nav-link" href="/ads/create/" { "Post an ad" } }
                                li class="nav-item" { a class="nav-link" href="/proposals/" { "My proposals" } }
                                li class="nav-item" {
                                    form method="post" action="/logout/" {
                                        button class="btn btn-link nav-link" type="submit" {
                                            "Log out (" (user.username) ")"
                                        }
                                    }
                                }
                            } @else {
                                li class="nav-item" { a class="nav-link" href="/login/" { "Log in" } }
                                li class="nav-item" { a class="nav-link" href="/signup/" { "Sign up" } }
                            }
                        }
                    }
                }
                main class="container" { (content) }
            }
        }
    };
    Html(page.into_string())
}

// -- Form widgets --

fn field_errors(errors: &FormErrors, field: &str) -> Markup {
    html! {
        @for message in errors.field(field) {
            div class="invalid-feedback d-block" { (message) }
        }
    }
}

fn non_field_errors(errors: &FormErrors) -> Markup {
    html! {
        @if !errors.non_field().is_empty() {
            div class="alert alert-danger" role="alert" {
                @for message in errors.non_field() {
                    p class="mb-0" { (message) }
                }
            }
        }
    }
}

fn input(
    label: &str,
    name: &str,
    kind: &str,
    value: &str,
    placeholder: Option<&str>,
    errors: &FormErrors,
) -> Markup {
    html! {
        div class="mb-3" {
            label class="form-label" for=(name) { (label) }
            input type=(kind) class="form-control" id=(name) name=(name) value=(value)
                placeholder=[placeholder];
            (field_errors(errors, name))
        }
    }
}

fn textarea(label: &str, name: &str, value: &str, placeholder: &str, errors: &FormErrors) -> Markup {
    html! {
        div class="mb-3" {
            label class="form-label" for=(name) { (label) }
            textarea class="form-control" id=(name) name=(name) rows="4" placeholder=(placeholder) { (value) }
            (field_errors(errors, name))
        }
    }
}

fn ad_select(label: &str, name: &str, ads: &[AdRow], selected: &str, errors: &FormErrors) -> Markup {
    html! {
        div class="mb-3" {
            label class="form-label" for=(name) { (label) }
            select class="form-select" id=(name) name=(name) {
                option value="" { "---------" }
                @for ad in ads {
                    @let value = ad.id.to_string();
                    option value=(value) selected[value == selected] {
                        (ad.title) " (" (ad.owner_username) ")"
                    }
                }
            }
            (field_errors(errors, name))
        }
    }
}

// -- Ads --

fn ad_page_link(query: &AdListQuery, page: u32) -> String {
    let mut params = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in [
        ("q", &query.q),
        ("category", &query.category),
        ("condition", &query.condition),
    ] {
        if let Some(value) = present(value) {
            params.append_pair(key, value);
        }
    }
    params.append_pair("page", &page.to_string());
    format!("/ads/?{}", params.finish())
}

pub fn ad_list(user: Option<&Claims>, page: &Page<AdRow>, query: &AdListQuery) -> Html<String> {
    let condition = present(&query.condition).unwrap_or_default();
    let content = html! {
        h1 class="mb-3" { "Listings" }
        form method="get" action="/ads/" class="row g-2 mb-4" {
            div class="col-md-5" {
                input type="search" class="form-control" name="q"
                    placeholder="Search title or description" value=[query.q.as_deref()];
            }
            div class="col-md-3" {
                input type="text" class="form-control" name="category"
                    placeholder="Category" value=[query.category.as_deref()];
            }
            div class="col-md-2" {
                select class="form-select" name="condition" {
                    option value="" { "Any condition" }
                    @for choice in Condition::ALL {
                        option value=(choice.as_str())
                            selected[choice.as_str().eq_ignore_ascii_case(condition)] {
                            (choice.label())
                        }
                    }
                }
            }
            div class="col-md-2" {
                button class="btn btn-primary w-100" type="submit" { "Search" }
            }
        }
        @if page.items.is_empty() {
            p class="text-muted" { "No ads match your search." }
        } @else {
            p class="text-muted" {
                (page.total) @if page.total == 1 { " listing" } @else { " listings" }
            }
            div class="list-group mb-3" {
                @for ad in &page.items {
                    a class="list-group-item list-group-item-action" href=(format!("/ads/{}/", ad.id)) {
                        h5 class="mb-1" { (ad.title) }
                        small class="text-muted" {
                            (ad.category) " · " (ad.condition.label()) " · by " (ad.owner_username)
                        }
                    }
                }
            }
        }
        @if page.num_pages > 1 {
            nav {
                ul class="pagination" {
                    @if page.has_previous() {
                        li class="page-item" { a class="page-link" href=(ad_page_link(query, 1)) { "« first" } }
                        li class="page-item" { a class="page-link" href=(ad_page_link(query, page.number - 1)) { "previous" } }
                    }
                    li class="page-item disabled" {
                        span class="page-link" { "Page " (page.number) " of " (page.num_pages) }
                    }
                    @if page.has_next() {
                        li class="page-item" { a class="page-link" href=(ad_page_link(query, page.number + 1)) { "next" } }
                        li class="page-item" { a class="page-link" href=(ad_page_link(query, page.num_pages)) { "last »" } }
                    }
                }
            }
        }
    };
    layout("Listings", user, content)
}

pub fn ad_detail(user: Option<&Claims>, ad: &AdRow) -> Html<String> {
    let is_owner = user.is_some_and(|u| u.sub.to_string() == ad.owner_id);
    let content = html! {
        div class="card" {
            @if let Some(url) = &ad.image_url {
                img class="card-img-top" src=(url) alt=(ad.title);
            }
            div class="card-body" {
                h1 class="card-title" { (ad.title) }
                p class="card-text" { (ad.description) }
                ul class="list-unstyled" {
                    li { strong { "Category: " } (ad.category) }
                    li { strong { "Condition: " } (ad.condition.label()) }
                    li { strong { "Posted by: " } (ad.owner_username) }
                    li { strong { "Posted: " } (ad.created_at.format(TIMESTAMP_FORMAT).to_string()) }
                }
                @if is_owner {
                    a class="btn btn-outline-primary me-2" href=(format!("/ads/{}/edit/", ad.id)) { "Edit" }
                    a class="btn btn-outline-danger" href=(format!("/ads/{}/delete/", ad.id)) { "Delete" }
                } @else if user.is_some() {
                    a class="btn btn-primary" href=(format!("/proposals/create/?ad_receiver={}", ad.id)) {
                        "Propose an exchange"
                    }
                } @else {
                    a href=(format!("/login/?next=/ads/{}/", ad.id)) { "Log in to propose an exchange" }
                }
            }
        }
        p class="mt-3" { a href="/ads/" { "Back to listings" } }
    };
    layout(&ad.title, user, content)
}

pub fn ad_form(
    user: Option<&Claims>,
    heading: &str,
    action: &str,
    form: &AdForm,
    errors: &FormErrors,
) -> Html<String> {
    let content = html! {
        h1 class="mb-3" { (heading) }
        form method="post" action=(action) {
            (non_field_errors(errors))
            (input("Title", "title", "text", &form.title, None, errors))
            (textarea("Description", "description", &form.description, "Describe your item…", errors))
            (input("Image URL", "image_url", "url", &form.image_url, None, errors))
            (input("Category", "category", "text", &form.category, None, errors))
            div class="mb-3" {
                label class="form-label" for="condition" { "Condition" }
                select class="form-select" id="condition" name="condition" {
                    option value="" { "---------" }
                    @for choice in Condition::ALL {
                        option value=(choice.as_str()) selected[form.condition == choice.as_str()] {
                            (choice.label())
                        }
                    }
                }
                (field_errors(errors, "condition"))
            }
            button class="btn btn-primary" type="submit" { "Save" }
        }
    };
    layout(heading, user, content)
}

pub fn ad_delete(user: Option<&Claims>, ad: &AdRow) -> Html<String> {
    let content = html! {
        h1 class="mb-3" { "Delete ad" }
        p { "Are you sure you want to delete “" (ad.title) "”? Proposals involving it are deleted too." }
        form method="post" action=(format!("/ads/{}/delete/", ad.id)) {
            button class="btn btn-danger me-2" type="submit" { "Delete" }
            a class="btn btn-secondary" href=(format!("/ads/{}/", ad.id)) { "Cancel" }
        }
    };
    layout("Delete ad", user, content)
}

// -- Exchange proposals --

fn status_badge(status: ProposalStatus) -> Markup {
    let class = match status {
        ProposalStatus::Pending => "badge text-bg-secondary",
        ProposalStatus::Accepted => "badge text-bg-success",
        ProposalStatus::Rejected => "badge text-bg-danger",
    };
    html! { span class=(class) { (status.label()) } }
}

pub fn proposal_form(
    user: Option<&Claims>,
    ads: &[AdRow],
    form: &ProposalForm,
    errors: &FormErrors,
) -> Html<String> {
    let content = html! {
        h1 class="mb-3" { "Propose an exchange" }
        form method="post" action="/proposals/create/" {
            (non_field_errors(errors))
            (ad_select("Your ad", "ad_sender", ads, &form.ad_sender, errors))
            (ad_select("Ad you want", "ad_receiver", ads, &form.ad_receiver, errors))
            (textarea("Comment", "comment", &form.comment, "comment…", errors))
            button class="btn btn-primary" type="submit" { "Send proposal" }
        }
    };
    layout("Propose an exchange", user, content)
}

pub fn proposal_detail(user: Option<&Claims>, proposal: &ProposalRow) -> Html<String> {
    let content = html! {
        h1 class="mb-3" {
            "Proposal from " (proposal.sender.title) " to " (proposal.receiver.title)
        }
        ul class="list-unstyled" {
            li {
                strong { "Offered: " }
                a href=(format!("/ads/{}/", proposal.sender.id)) { (proposal.sender.title) }
                " by " (proposal.sender.owner_username)
            }
            li {
                strong { "Requested: " }
                a href=(format!("/ads/{}/", proposal.receiver.id)) { (proposal.receiver.title) }
                " by " (proposal.receiver.owner_username)
            }
            li { strong { "Status: " } (status_badge(proposal.status)) }
            li { strong { "Sent: " } (proposal.created_at.format(TIMESTAMP_FORMAT).to_string()) }
        }
        blockquote class="border-start ps-3" { (proposal.comment) }
        a class="btn btn-outline-primary me-2" href=(format!("/proposals/{}/update/", proposal.id)) {
            "Change status"
        }
        a class="btn btn-link" href="/proposals/" { "All proposals" }
    };
    layout("Proposal", user, content)
}

pub fn proposal_update(
    user: Option<&Claims>,
    proposal: &ProposalRow,
    errors: &FormErrors,
) -> Html<String> {
    let content = html! {
        h1 class="mb-3" {
            "Proposal from " (proposal.sender.title) " to " (proposal.receiver.title)
        }
        p { "Current status: " (status_badge(proposal.status)) }
        form method="post" action=(format!("/proposals/{}/update/", proposal.id)) {
            (non_field_errors(errors))
            div class="mb-3" {
                label class="form-label" for="status" { "Status" }
                select class="form-select" id="status" name="status" {
                    @for choice in ProposalStatus::ALL {
                        option value=(choice.as_str()) selected[choice == proposal.status] {
                            (choice.label())
                        }
                    }
                }
            }
            button class="btn btn-primary me-2" type="submit" { "Update" }
            a class="btn btn-secondary" href=(format!("/proposals/{}/", proposal.id)) { "Cancel" }
        }
    };
    layout("Update proposal", user, content)
}

pub fn proposal_list(
    user: Option<&Claims>,
    proposals: &[ProposalRow],
    query: &ProposalListQuery,
) -> Html<String> {
    let status = present(&query.status).unwrap_or_default();
    let content = html! {
        h1 class="mb-3" { "Exchange proposals" }
        form method="get" action="/proposals/" class="row g-2 mb-4" {
            div class="col-md-4" {
                input type="text" class="form-control" name="sender"
                    placeholder="Sender username" value=[query.sender.as_deref()];
            }
            div class="col-md-4" {
                input type="text" class="form-control" name="receiver"
                    placeholder="Receiver username" value=[query.receiver.as_deref()];
            }
            div class="col-md-2" {
                select class="form-select" name="status" {
                    option value="" { "Any status" }
                    @for choice in ProposalStatus::ALL {
                        option value=(choice.as_str()) selected[choice.as_str() == status] {
                            (choice.label())
                        }
                    }
                }
            }
            div class="col-md-2" {
                button class="btn btn-primary w-100" type="submit" { "Filter" }
            }
        }
        @if proposals.is_empty() {
            p class="text-muted" { "No proposals found." }
        } @else {
            table class="table" {
                thead {
                    tr { th { "From" } th { "To" } th { "Comment" } th { "Status" } th {} }
                }
                tbody {
                    @for p in proposals {
                        tr {
                            td { (p.sender.title) " (" (p.sender.owner_username) ")" }
                            td { (p.receiver.title) " (" (p.receiver.owner_username) ")" }
                            td { (p.comment) }
                            td { (status_badge(p.status)) }
                            td { a href=(format!("/proposals/{}/", p.id)) { "View" } }
                        }
                    }
                }
            }
        }
    };
    layout("Exchange proposals", user, content)
}

// -- Accounts --

pub fn signup(user: Option<&Claims>, form: &SignupForm, errors: &FormErrors) -> Html<String> {
    let content = html! {
        h1 class="mb-3" { "Sign up" }
        form method="post" action="/signup/" {
            (non_field_errors(errors))
            (input("Username", "username", "text", &form.username, Some("Username"), errors))
            (input("Email", "email", "email", &form.email, Some("Email"), errors))
            (input("Password", "password1", "password", "", Some("Password"), errors))
            (input("Password confirmation", "password2", "password", "", Some("Confirm password"), errors))
            button class="btn btn-primary" type="submit" { "Create account" }
        }
        p class="mt-3" { "Already registered? " a href="/login/" { "Log in" } }
    };
    layout("Sign up", user, content)
}

pub fn login(user: Option<&Claims>, form: &LoginForm, errors: &FormErrors) -> Html<String> {
    let content = html! {
        h1 class="mb-3" { "Log in" }
        form method="post" action="/login/" {
            (non_field_errors(errors))
            (input("Username", "username", "text", &form.username, None, errors))
            (input("Password", "password", "password", "", None, errors))
            input type="hidden" name="next" value=(form.next);
            button class="btn btn-primary" type="submit" { "Log in" }
        }
        p class="mt-3" { "New here? " a href="/signup/" { "Create an account" } }
    };
    layout("Log in", user, content)
}

// -- Errors --

pub fn not_found() -> Html<String> {
    layout(
        "Not found",
        None,
        html! {
            h1 { "Not found" }
            p { "The page you asked for does not exist." }
            a href="/ads/" { "Back to listings" }
        },
    )
}

pub fn server_error() -> Html<String> {
    layout(
        "Server error",
        None,
        html! {
            h1 { "Something went wrong" }
            p { "Please try again in a moment." }
        },
    )
}
