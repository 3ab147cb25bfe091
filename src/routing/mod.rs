//! 가상 호스트 라우팅.
//!
//! Host 헤더의 호스트 이름으로 도메인 파이프라인을 고릅니다.

mod error;
mod host;
mod pipeline;
mod table;

pub use error::RoutingError;
pub use host::HostInfo;
pub use pipeline::{http_pipeline, https_pipeline};
pub use table::VirtualHostTable;
