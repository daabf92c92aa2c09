pub mod ip_extraction;
pub mod multipart;
pub mod request_context;
