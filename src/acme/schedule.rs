use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use time::{OffsetDateTime, Time};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::client::AcmeClient;

/// 갱신 타이머 간격. 매일 00:00, 12:00 UTC에 실행됩니다.
pub const RENEWAL_INTERVAL_HOURS: i64 = 12;

/// 최대 지연 시간 (틱 간격과 같음)
pub const MAX_JITTER: Duration = Duration::from_secs(RENEWAL_INTERVAL_HOURS as u64 * 3600);

/// `now` 이후 첫 번째 00:00 또는 12:00 UTC 시각
pub fn next_tick_after(now: OffsetDateTime) -> OffsetDateTime {
    let now = now.to_offset(time::UtcOffset::UTC);
    let midnight = now.replace_time(Time::MIDNIGHT);
    let noon = midnight + time::Duration::hours(RENEWAL_INTERVAL_HOURS);

    if now < noon {
        noon
    } else {
        midnight + time::Duration::days(1)
    }
}

/// `[0, 12h)` 구간의 균등 난수 지연
pub fn random_jitter() -> Duration {
    let millis = rand::thread_rng().gen_range(0..MAX_JITTER.as_millis() as u64);
    Duration::from_millis(millis)
}

/// 주기적으로 `renew`를 실행하는 백그라운드 작업.
///
/// 여러 인스턴스가 동시에 ACME 서버에 몰리지 않도록 틱마다 무작위로 기다린 뒤 실행합니다.
pub struct RenewalSchedule<C> {
    client: Arc<C>,
}

impl<C: AcmeClient + 'static> RenewalSchedule<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let now = OffsetDateTime::now_utc();
                let tick = next_tick_after(now);
                let until_tick = Duration::try_from(tick - now).unwrap_or_default();
                info!(next = %tick, "다음 인증서 갱신 예정");
                tokio::time::sleep(until_tick).await;

                let jitter = random_jitter();
                info!(delay_secs = jitter.as_secs(), "인증서 갱신 전 대기");
                tokio::time::sleep(jitter).await;

                run_renewal(self.client.as_ref()).await;
            }
        })
    }
}

/// 갱신을 한 번 실행하고 결과를 로그로 남깁니다. 실패해도 프로세스에는 영향이 없습니다.
pub async fn run_renewal<C: AcmeClient + ?Sized>(client: &C) -> bool {
    match client.renew_all().await {
        Ok(output) => {
            if output.success() {
                info!(
                    code = ?output.code,
                    stdout = %output.stdout.trim(),
                    stderr = %output.stderr.trim(),
                    "인증서 갱신 완료"
                );
                true
            } else {
                warn!(
                    code = ?output.code,
                    stdout = %output.stdout.trim(),
                    stderr = %output.stderr.trim(),
                    "인증서 갱신 실패"
                );
                false
            }
        }
        Err(e) => {
            error!(error = %e, "인증서 갱신 명령 실행 실패");
            false
        }
    }
}
