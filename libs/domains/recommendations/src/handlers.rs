use std::sync::Arc;

use axum::{
    Form, Router,
    extract::{State, rejection::FormRejection},
    response::Html,
    routing::{get, post},
};
use axum_helpers::AppError;
use tracing::warn;

use crate::models::RecommendationForm;
use crate::retriever::Retriever;
use crate::service::RecommendationService;
use crate::templates::Views;

/// Prefix of the inline message shown when retrieval fails
pub const RETRIEVAL_ERROR_PREFIX: &str = "Error getting recommendations";

struct HandlerState<R: Retriever> {
    service: RecommendationService<R>,
    views: Views,
}

/// Create the recommendation router with the form and results pages
pub fn router<R: Retriever + 'static>(service: RecommendationService<R>, views: Views) -> Router {
    let shared_state = Arc::new(HandlerState { service, views });

    Router::new()
        .route("/", get(index::<R>))
        .route("/recommendations", post(recommendations::<R>))
        .with_state(shared_state)
}

/// Render the search form
async fn index<R: Retriever>(
    State(state): State<Arc<HandlerState<R>>>,
) -> Result<Html<String>, AppError> {
    Ok(Html(state.views.render_form(None)?))
}

/// Validate the form, retrieve similar books and render them
///
/// Invalid input is a 400. A failed retrieval re-renders the form with the
/// failure inline and still answers 200.
async fn recommendations<R: Retriever>(
    State(state): State<Arc<HandlerState<R>>>,
    form: Result<Form<RecommendationForm>, FormRejection>,
) -> Result<Html<String>, AppError> {
    let Form(form) = form?;
    let request = state.service.validate(&form)?;

    let html = match state.service.recommend(&request).await {
        Ok(items) => state.views.render_results(request.query.as_str(), &items)?,
        Err(e) => {
            warn!(error = %e, "Retrieval failed, showing inline error");
            let message = format!("{}: {}", RETRIEVAL_ERROR_PREFIX, e);
            state.views.render_form(Some(&message))?
        }
    };

    Ok(Html(html))
}
