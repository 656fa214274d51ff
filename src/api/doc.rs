use utoipa::OpenApi;

use super::handlers::{self, HealthResponse, ProcessRequest, ProcessResponse};
use crate::store::Message;

#[derive(OpenApi)]
#[openapi(
    info(title = "Observability Demo", version = "0.1.0"),
    paths(handlers::health, handlers::process, handlers::get_message),
    components(schemas(HealthResponse, ProcessRequest, ProcessResponse, Message))
)]
pub struct ApiDoc;
