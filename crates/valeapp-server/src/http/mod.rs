pub(crate) mod admin;
pub(crate) mod auth;
pub(crate) mod request_tracing;
pub(crate) mod response_contract;
pub(crate) mod session;
pub(crate) mod system;
pub(crate) mod vouchers;
