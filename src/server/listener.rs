use std::net::SocketAddr;
use std::sync::Arc;

use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, error, info};

use super::error::Error;
use super::handler::RequestHandler;
use super::Result;

/// 모든 인터페이스의 포트에 바인딩합니다.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await.map_err(|source| {
        error!(error = %source, port, "포트 바인딩 실패");
        Error::Bind { port, source }
    })?;
    info!(addr = %listener.local_addr()?, "리스너 시작");
    Ok(listener)
}

/// 평문 HTTP 연결 수락 루프
pub async fn serve_http(listener: TcpListener, handler: Arc<RequestHandler>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, client_addr)) => {
                let handler = handler.clone();
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);
                    if let Err(err) = handler.handle_connection(io, client_addr).await {
                        debug!(error = %err, client = %client_addr, "HTTP 연결 처리 실패");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "HTTP 연결 수락 실패");
            }
        }
    }
}

/// HTTPS 연결 수락 루프. 핸드셰이크 실패는 해당 연결만 닫습니다.
pub async fn serve_https(listener: TcpListener, acceptor: TlsAcceptor, handler: Arc<RequestHandler>) -> Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, client_addr)) => {
                let handler = handler.clone();
                let acceptor = acceptor.clone();

                tokio::spawn(async move {
                    match acceptor.accept(stream).await {
                        Ok(tls_stream) => {
                            let io = TokioIo::new(tls_stream);
                            if let Err(err) = handler.handle_connection(io, client_addr).await {
                                debug!(error = %err, client = %client_addr, "HTTPS 연결 처리 실패");
                            }
                        }
                        Err(e) => {
                            debug!(error = %e, client = %client_addr, "TLS 핸드셰이크 실패");
                        }
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "HTTPS 연결 수락 실패");
            }
        }
    }
}
