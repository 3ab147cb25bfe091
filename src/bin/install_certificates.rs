//! 갱신된 인증서를 각 도메인의 sni 디렉토리에 설치합니다.
//!
//! 적용하려면 설치 후 게이트웨이를 재시작해야 합니다.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::error;

use gateway_lite::acme::install_certificates;
use gateway_lite::logging::init_logging;
use gateway_lite::settings::LogSettings;

#[derive(Debug, Parser)]
#[command(name = "install-certificates", version, about = "Copy renewed certificates into each domain's sni directory")]
struct Args {
    /// 모든 도메인 디렉토리의 기본 경로
    #[arg(value_name = "DOMAIN_DIR")]
    domain_dir: PathBuf,

    /// ACME 클라이언트의 인증서 저장소
    #[arg(long = "live-dir", env = "GATEWAY_LIVE_DIR", default_value = "/etc/letsencrypt/live")]
    live_dir: PathBuf,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::from(1);
        }
    };

    let _guard = init_logging(&LogSettings::default());

    match install_certificates(&args.domain_dir, &args.live_dir) {
        Ok(report) if report.count() > 0 => {
            println!("Installed {} certificates", report.count());
            ExitCode::SUCCESS
        }
        Ok(_) => {
            println!("Installed 0 certificates");
            ExitCode::from(2)
        }
        Err(e) => {
            error!(error = %e, "인증서 설치 실패");
            eprintln!("{}", e);
            ExitCode::from(3)
        }
    }
}
