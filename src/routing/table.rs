use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::{HostInfo, RoutingError};
use crate::middleware::DomainPipeline;

/// 호스트 이름 → 도메인 파이프라인.
///
/// 시작 시 한 번 만들어진 뒤 읽기 전용으로 공유됩니다. 호스트 이름은
/// 정확히 일치해야 하며 와일드카드는 지원하지 않습니다.
#[derive(Debug, Default, Clone)]
pub struct VirtualHostTable {
    hosts: HashMap<String, Arc<DomainPipeline>>,
}

impl VirtualHostTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pipeline: DomainPipeline) {
        let name = pipeline.domain().to_ascii_lowercase();
        info!(domain = %name, stages = ?pipeline.stage_names(), "도메인 파이프라인 등록");
        self.hosts.insert(name, Arc::new(pipeline));
    }

    pub fn get(&self, host: &str) -> Option<&Arc<DomainPipeline>> {
        self.hosts.get(&host.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn domains(&self) -> Vec<&str> {
        let mut domains: Vec<_> = self.hosts.keys().map(String::as_str).collect();
        domains.sort_unstable();
        domains
    }

    /// 요청의 Host 헤더로 파이프라인을 찾습니다.
    pub fn route<B>(&self, req: &hyper::Request<B>) -> Result<(HostInfo, Arc<DomainPipeline>), RoutingError> {
        let host = HostInfo::from_request(req)?;
        match self.hosts.get(&host.name) {
            Some(pipeline) => {
                debug!(host = %host.name, "도메인 파이프라인 찾음");
                Ok((host, Arc::clone(pipeline)))
            }
            None => {
                debug!(host = %host.name, available = ?self.domains(), "등록되지 않은 호스트");
                Err(RoutingError::UnknownHost { host: host.name })
            }
        }
    }
}
