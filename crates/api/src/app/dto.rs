use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, Request},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use pricebook_core::ValidationErrors;
use pricebook_infra::{Page, PageRequest};
use pricebook_products::{rules, ProductFields};

use crate::app::errors;
use crate::app::services::PricedProduct;

/// Most significant digits a `Decimal` holds.
const MAX_DECIMAL_DIGITS: usize = 28;

/// Path the product collection is mounted at; used for paginator links.
pub const PRODUCTS_PATH: &str = "/api/products";

// -------------------------
// Request DTOs
// -------------------------

/// `?page=N&per_page=M`. Kept as strings so junk values fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListProductsQuery {
    pub page: Option<String>,
    pub per_page: Option<String>,
}

/// Page-size settings shared by the list handler.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Paging {
    pub default_per_page: u64,
    pub max_per_page: u64,
}

impl Paging {
    pub fn request(&self, query: &ListProductsQuery) -> PageRequest {
        let page = parse_positive(query.page.as_deref()).unwrap_or(1);
        let per_page = parse_positive(query.per_page.as_deref())
            .unwrap_or(self.default_per_page)
            .min(self.max_per_page);
        PageRequest::new(page, per_page)
    }
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    raw?.trim().parse::<u64>().ok().filter(|n| *n > 0)
}

/// Create/update body as loosely typed JSON.
///
/// Accepts `application/json` and `application/x-www-form-urlencoded`. A body
/// sent without a content type is read as JSON, and an empty one as `{}`, so
/// both end up in field validation rather than a media-type error.
#[derive(Debug)]
pub struct ProductBody(pub Value);

#[axum::async_trait]
impl<S> FromRequest<S> for ProductBody
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let mime = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase());

        match mime.as_deref() {
            Some("application/x-www-form-urlencoded") => {
                let Form(fields) = Form::<HashMap<String, String>>::from_request(req, state)
                    .await
                    .map_err(|e| errors::json_error(e.status(), "invalid_form", e.body_text()))?;
                let fields = fields
                    .into_iter()
                    .map(|(k, v)| (k, Value::String(v)))
                    .collect();
                Ok(Self(Value::Object(fields)))
            }
            Some(m) if m != "application/json" && !m.ends_with("+json") => Err(errors::json_error(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "invalid_json",
                "Expected request with `Content-Type: application/json`",
            )),
            _ => {
                let bytes = Bytes::from_request(req, state)
                    .await
                    .map_err(IntoResponse::into_response)?;
                json_body(&bytes).map(Self)
            }
        }
    }
}

fn json_body(bytes: &[u8]) -> Result<Value, Response> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    serde_json::from_slice(bytes).map_err(|e| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_json",
            format!("Failed to parse the request body as JSON: {e}"),
        )
    })
}

/// Parse a create/update body into product fields.
///
/// Collects every field failure (type and range) before giving up, so one
/// response lists all of them. Numeric fields accept JSON numbers or numeric
/// strings.
pub fn product_fields_from_json(body: &Value) -> Result<ProductFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let title = required_string(body, rules::TITLE, &mut errors);
    if let Some(title) = &title {
        rules::check_title(title, &mut errors);
    }

    let description = required_string(body, rules::DESCRIPTION, &mut errors);
    if let Some(description) = &description {
        rules::check_description(description, &mut errors);
    }

    let price = match decimal_field(body, rules::PRICE) {
        DecimalField::Value(price) => {
            rules::check_price(price, &mut errors);
            Some(price)
        }
        DecimalField::Absent => {
            errors.add(rules::PRICE, rules::required(rules::PRICE));
            None
        }
        DecimalField::NotANumber => {
            errors.add(rules::PRICE, rules::must_be_number(rules::PRICE));
            None
        }
    };

    let category = required_string(body, rules::CATEGORY, &mut errors);
    if let Some(category) = &category {
        rules::check_category(category, &mut errors);
    }

    let promotion_percentage = match decimal_field(body, rules::PROMOTION_PERCENTAGE) {
        DecimalField::Value(pct) => {
            rules::check_promotion_percentage(Some(pct), &mut errors);
            Some(pct)
        }
        DecimalField::Absent => None,
        DecimalField::NotANumber => {
            errors.add(
                rules::PROMOTION_PERCENTAGE,
                rules::must_be_number(rules::PROMOTION_PERCENTAGE),
            );
            None
        }
    };

    match (title, description, price, category) {
        (Some(title), Some(description), Some(price), Some(category)) if errors.is_empty() => {
            Ok(ProductFields {
                title,
                description,
                price,
                category,
                promotion_percentage,
            })
        }
        _ => Err(errors),
    }
}

/// A present, non-blank string (trimmed), or a recorded failure.
fn required_string(body: &Value, field: &str, errors: &mut ValidationErrors) -> Option<String> {
    match body.get(field) {
        None | Some(Value::Null) => {
            errors.add(field, rules::required(field));
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            errors.add(field, rules::required(field));
            None
        }
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            errors.add(field, rules::must_be_string(field));
            None
        }
    }
}

enum DecimalField {
    Value(Decimal),
    /// Missing, `null`, or a blank string.
    Absent,
    NotANumber,
}

fn decimal_field(body: &Value, field: &str) -> DecimalField {
    match body.get(field) {
        None | Some(Value::Null) => DecimalField::Absent,
        Some(Value::Number(n)) => parse_decimal(&n.to_string()),
        Some(Value::String(s)) if s.trim().is_empty() => DecimalField::Absent,
        Some(Value::String(s)) => parse_decimal(s.trim()),
        Some(_) => DecimalField::NotANumber,
    }
}

/// Plain or scientific decimal literal: `[+-]digits[.digits][(e|E)[+-]digits]`.
///
/// Magnitudes beyond `Decimal` saturate to `Decimal::MAX`/`MIN`, and values
/// below 1e-28 keep their sign at 1e-28, so the range rules still report them.
fn parse_decimal(raw: &str) -> DecimalField {
    let Some(literal) = split_literal(raw) else {
        return DecimalField::NotANumber;
    };
    DecimalField::Value(literal.to_decimal())
}

struct Literal<'a> {
    negative: bool,
    int_digits: &'a str,
    frac_digits: &'a str,
    exponent: i64,
}

fn split_literal(raw: &str) -> Option<Literal<'_>> {
    let (negative, rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let (mantissa, exponent) = match rest.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, parse_exponent(exponent)?),
        None => (rest, 0),
    };
    let (int_digits, frac_digits) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if (int_digits.is_empty() && frac_digits.is_empty())
        || !all_digits(int_digits)
        || !all_digits(frac_digits)
    {
        return None;
    }

    Some(Literal {
        negative,
        int_digits,
        frac_digits,
        exponent,
    })
}

fn parse_exponent(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix(['+', '-']).unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(raw.parse().unwrap_or(if raw.starts_with('-') { i64::MIN } else { i64::MAX }))
}

impl Literal<'_> {
    fn to_decimal(&self) -> Decimal {
        let joined = format!("{}{}", self.int_digits, self.frac_digits);
        let digits = joined.trim_start_matches('0');
        if digits.is_empty() {
            return Decimal::ZERO;
        }

        // value = digits * 10^-scale
        let mut scale = (self.frac_digits.len() as i64).saturating_sub(self.exponent);
        let integer_digits = (digits.len() as i64).saturating_sub(scale);
        if integer_digits > MAX_DECIMAL_DIGITS as i64 {
            return if self.negative { Decimal::MIN } else { Decimal::MAX };
        }

        let excess = (scale - MAX_DECIMAL_DIGITS as i64)
            .max(digits.len() as i64 - MAX_DECIMAL_DIGITS as i64)
            .max(0);
        if excess >= digits.len() as i64 {
            return self.signed(Decimal::new(1, MAX_DECIMAL_DIGITS as u32));
        }
        let mut digits = digits[..digits.len() - excess as usize].to_string();
        scale -= excess;
        if scale < 0 {
            digits.extend(std::iter::repeat_n('0', scale.unsigned_abs() as usize));
            scale = 0;
        }

        let mantissa = digits.parse::<i128>().unwrap_or(i128::MAX);
        let mantissa = if self.negative { -mantissa } else { mantissa };
        Decimal::try_from_i128_with_scale(mantissa, scale as u32).unwrap_or(if self.negative {
            Decimal::MIN
        } else {
            Decimal::MAX
        })
    }

    fn signed(&self, magnitude: Decimal) -> Decimal {
        if self.negative { -magnitude } else { magnitude }
    }
}

// -------------------------
// Response mapping
// -------------------------

pub fn product_to_json(priced: &PricedProduct) -> Value {
    let p = &priced.product;
    serde_json::json!({
        "id": p.id().0.get(),
        "title": p.title(),
        "description": p.description(),
        "price": decimal_to_json(p.price()),
        "category": p.category(),
        "promotion_percentage": p.promotion_percentage().map(decimal_to_json),
        "created_at": timestamp(p.created_at()),
        "updated_at": timestamp(p.updated_at()),
        "final_price": decimal_to_json(priced.final_price),
    })
}

/// Paginated collection in the shape front-end paginators expect.
pub fn page_to_json(page: &Page<PricedProduct>, paging: &Paging) -> Value {
    let url = |n: u64| page_url(n, page.per_page, paging);
    let last_page = page.last_page();
    let next_page_url = page.has_more_pages().then(|| url(page.current_page + 1));
    let prev_page_url = (page.current_page > 1).then(|| url(page.current_page - 1));

    serde_json::json!({
        "current_page": page.current_page,
        "data": page.items.iter().map(product_to_json).collect::<Vec<_>>(),
        "first_page_url": url(1),
        "from": page.from(),
        "last_page": last_page,
        "last_page_url": url(last_page),
        "next_page_url": next_page_url,
        "path": PRODUCTS_PATH,
        "per_page": page.per_page,
        "prev_page_url": prev_page_url,
        "to": page.to(),
        "total": page.total,
    })
}

fn page_url(page: u64, per_page: u64, paging: &Paging) -> String {
    if per_page == paging.default_per_page {
        format!("{PRODUCTS_PATH}?page={page}")
    } else {
        format!("{PRODUCTS_PATH}?page={page}&per_page={per_page}")
    }
}

fn decimal_to_json(value: Decimal) -> Value {
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map_or(Value::Null, Value::Number)
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}
