//! 인증서 수명 주기: 시작 시 확보, 주기적 갱신, 수동 설치

mod client;
mod error;
mod install;
mod lifecycle;
mod schedule;

pub use client::{AcmeClient, CertbotClient, ObtainRequest, RenewOutput};
pub use error::CertificateError;
pub use install::{install_certificates, InstallReport};
pub use lifecycle::{copy_from_live, pem_count, CertOutcome, CertificateManager, LIVE_FULLCHAIN, LIVE_PRIVKEY};
pub use schedule::{next_tick_after, random_jitter, run_renewal, RenewalSchedule, MAX_JITTER};
