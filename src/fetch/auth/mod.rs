//! Decorators that attach provider credentials to outgoing requests.

mod url_param;

pub use url_param::UrlParam;
