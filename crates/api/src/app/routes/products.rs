use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::Value;

use pricebook_products::{ProductFields, ProductId};

use crate::app::dto::{self, ListProductsQuery, Paging, ProductBody};
use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product)
                .put(update_product)
                .patch(update_product)
                .delete(delete_product),
        )
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(paging): Extension<Paging>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<ListProductsQuery>,
) -> axum::response::Response {
    let request = paging.request(&query);
    match services.list_products(request, ctx.customer()).await {
        Ok(page) => Json(dto::page_to_json(&page, &paging)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::not_found();
    };

    match services.get_product(id, ctx.customer()).await {
        Ok(priced) => Json(dto::product_to_json(&priced)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    ProductBody(body): ProductBody,
) -> axum::response::Response {
    let fields = match parse_body(&body) {
        Ok(fields) => fields,
        Err(resp) => return resp,
    };

    match services.create_product(fields, ctx.customer()).await {
        Ok(priced) => (StatusCode::CREATED, Json(dto::product_to_json(&priced))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Serves both `PUT` and `PATCH`; either way every field is replaced.
pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    ProductBody(body): ProductBody,
) -> axum::response::Response {
    let fields = match parse_body(&body) {
        Ok(fields) => fields,
        Err(resp) => return resp,
    };
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::not_found();
    };

    match services.update_product(id, fields, ctx.customer()).await {
        Ok(priced) => Json(dto::product_to_json(&priced)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let Ok(id) = id.parse::<ProductId>() else {
        return errors::not_found();
    };

    match services.delete_product(id).await {
        Ok(()) => Json(serde_json::json!({
            "message": "Product deleted successfully",
        }))
        .into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

fn parse_body(body: &Value) -> Result<ProductFields, axum::response::Response> {
    dto::product_fields_from_json(body).map_err(|e| errors::validation_error(&e))
}
