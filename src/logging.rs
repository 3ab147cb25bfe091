use std::path::Path;
use std::time::Instant;

use tracing::{info, warn, error, Level, span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::settings::{LogFormat, LogOutput, LogSettings};

/// 전역 subscriber를 설치합니다.
///
/// 파일 출력일 때 반환되는 guard는 프로세스가 끝날 때까지 유지해야
/// 버퍼에 남은 로그가 기록됩니다.
pub fn init_logging(settings: &LogSettings) -> Option<WorkerGuard> {
    // RUST_LOG 지시자가 설정된 레벨 위에 덧붙음
    let filter = EnvFilter::builder()
        .with_default_directive(settings.level.into())
        .from_env_lossy();

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_else(|| "gateway-lite.log".into());
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
        }
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(matches!(settings.output, LogOutput::Stdout));

    let result = match settings.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Text => builder.try_init(),
    };
    if let Err(e) = result {
        eprintln!("로깅 초기화 실패: {}", e);
        return None;
    }

    Some(guard)
}

/// 요청 하나에 대한 요약 로그
#[derive(Debug)]
pub struct RequestLog {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub host: String,
    pub status_code: u16,
    pub duration_ms: u64,
    pub mount: Option<String>,
    pub downstream: Option<String>,
    pub error: Option<String>,
    started: Instant,
}

impl RequestLog {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            method: String::new(),
            path: String::new(),
            host: String::new(),
            status_code: 0,
            duration_ms: 0,
            mount: None,
            downstream: None,
            error: None,
            started: Instant::now(),
        }
    }

    pub fn with_request<B>(&mut self, req: &hyper::Request<B>) {
        self.method = req.method().to_string();
        self.path = req.uri().path().to_string();
        if let Some(host) = req.headers().get(hyper::header::HOST) {
            self.host = host.to_str().unwrap_or_default().to_string();
        }
    }

    pub fn with_response(&mut self, status: hyper::StatusCode) {
        self.status_code = status.as_u16();
        self.duration_ms = self.started.elapsed().as_millis() as u64;
    }

    pub fn with_forward(&mut self, mount: &str, downstream: &str) {
        self.mount = Some(mount.to_string());
        self.downstream = Some(downstream.to_string());
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        self.error = Some(error.to_string());
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new()
    }
}

pub fn log_request(log: &RequestLog) {
    let level = if log.error.is_some() || log.status_code >= 500 {
        Level::ERROR
    } else if log.status_code >= 400 {
        Level::WARN
    } else {
        Level::INFO
    };

    let span = span!(
        Level::INFO,
        "request",
        request_id = %log.request_id,
        method = %log.method,
        path = %log.path,
        host = %log.host,
        status = %log.status_code,
        duration_ms = %log.duration_ms
    );
    let _enter = span.enter();

    match level {
        Level::ERROR => error!(
            mount = ?log.mount,
            downstream = ?log.downstream,
            error = ?log.error,
            "Request failed"
        ),
        Level::WARN => warn!(
            mount = ?log.mount,
            downstream = ?log.downstream,
            "Request completed with warning"
        ),
        _ => info!(
            mount = ?log.mount,
            downstream = ?log.downstream,
            "Request completed successfully"
        ),
    }
}
