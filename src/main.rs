use clap::Parser;
use tracing::{error, info};

use gateway_lite::logging::init_logging;
use gateway_lite::server::Gateway;
use gateway_lite::settings::{Cli, Settings};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let settings = match Settings::load(&cli) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("설정 오류: {}", e);
            std::process::exit(1);
        }
    };

    // 파일 출력이면 guard가 살아 있는 동안만 기록됨
    let guard = init_logging(&settings.logging);

    info!(
        domain_dir = %settings.server.domain_dir.display(),
        http_port = settings.server.http_port,
        https_enabled = settings.server.https_enabled,
        https_port = settings.server.https_port,
        acme = settings.acme.enabled,
        "게이트웨이 시작"
    );

    if let Err(e) = Gateway::new(settings).run().await {
        error!(error = %e, "게이트웨이 실행 실패");
        eprintln!("{}", e);
        drop(guard);
        std::process::exit(1);
    }

    info!("게이트웨이 종료");
}
