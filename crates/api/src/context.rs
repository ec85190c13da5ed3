use pricebook_products::CustomerContext;

/// Per-request context, inserted by [`crate::middleware::request_context_middleware`].
///
/// The request id is not carried here; it lives on the request span and the
/// `x-request-id` response header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    customer: CustomerContext,
}

impl RequestContext {
    pub fn new(customer: CustomerContext) -> Self {
        Self { customer }
    }

    /// Who the request is priced for.
    pub fn customer(&self) -> &CustomerContext {
        &self.customer
    }
}
