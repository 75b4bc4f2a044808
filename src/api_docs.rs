use crate::api;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::health::health_check,
        api::progress::record_completion,
        api::quest::advance_condition,
        // Add other endpoints here as we document them
    ),
    tags(
        (name = "lingopath", description = "Lingopath progress & reward ledger API")
    )
)]
pub struct ApiDoc;
