pub mod audit;
pub mod rate_limit;

pub use rate_limit::upload_rate_limit_middleware;
