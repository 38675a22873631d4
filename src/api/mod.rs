pub mod client;
pub mod endpoint;
pub mod transport;

pub use client::ChatApi;
pub use endpoint::{combine_url, EndpointResolver};
pub use transport::{ApiReply, ApiRequest, ApiTransport, HttpTransport, Method};
