use std::path::PathBuf;
use tokio::sync::mpsc;
use notify::{RecommendedWatcher, RecursiveMode, Watcher, Event, Result as NotifyResult};
use crate::settings::{Result, error::SettingsError};
use tracing::{debug, error, warn};

/// 도메인 디렉토리 변경 이벤트 타입
#[derive(Debug, PartialEq, Clone)]
pub enum DomainDirEvent {
    /// 파일이 수정됨
    Modified(PathBuf),
    /// 파일이 생성됨
    Created(PathBuf),
    /// 파일이 삭제됨
    Deleted(PathBuf),
}

impl DomainDirEvent {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Modified(p) | Self::Created(p) | Self::Deleted(p) => p,
        }
    }
}

/// 도메인 디렉토리 감시자.
///
/// 설정을 다시 읽지는 않습니다. 변경이 반영되려면 재시작이 필요합니다.
pub struct DomainDirWatcher {
    path: PathBuf,
    event_tx: mpsc::Sender<DomainDirEvent>,
    event_rx: mpsc::Receiver<DomainDirEvent>,
    watcher: Option<RecommendedWatcher>,
}

impl DomainDirWatcher {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let (event_tx, event_rx) = mpsc::channel(32);
        Self {
            path: path.into(),
            event_tx,
            event_rx,
            watcher: None,
        }
    }

    /// 테스트용 이벤트 송신자 반환
    #[cfg(test)]
    pub fn get_sender(&self) -> mpsc::Sender<DomainDirEvent> {
        self.event_tx.clone()
    }

    /// 감시 시작
    pub fn start(&mut self) -> Result<()> {
        let event_tx = self.event_tx.clone();

        let mut watcher: RecommendedWatcher = notify::recommended_watcher(move |res: NotifyResult<Event>| {
            match res {
                Ok(event) => {
                    use notify::EventKind::*;

                    for path in event.paths {
                        let event = match event.kind {
                            Modify(_) => DomainDirEvent::Modified(path),
                            Create(_) => DomainDirEvent::Created(path),
                            Remove(_) => DomainDirEvent::Deleted(path),
                            _ => continue,
                        };
                        // 감시 스레드에서 호출되므로 가득 찬 경우 버림
                        let _ = event_tx.try_send(event);
                    }
                }
                Err(e) => error!("감시 오류: {}", e),
            }
        }).map_err(|e| SettingsError::WatchError(e.to_string()))?;

        debug!("경로 감시 시작: {}", self.path.display());
        watcher.watch(&self.path, RecursiveMode::Recursive)
            .map_err(|e| SettingsError::WatchError(e.to_string()))?;

        self.watcher = Some(watcher);
        Ok(())
    }

    /// 이벤트 수신 대기
    pub async fn watch(&mut self) -> Option<DomainDirEvent> {
        self.event_rx.recv().await
    }

    /// 감시를 시작하고, 변경마다 재시작이 필요하다는 경고를 남기는 태스크를 띄웁니다.
    pub fn spawn(mut self) -> Result<tokio::task::JoinHandle<()>> {
        self.start()?;
        Ok(tokio::spawn(async move {
            while let Some(event) = self.watch().await {
                warn!(
                    path = %event.path().display(),
                    event = ?event,
                    "도메인 디렉토리가 변경되었습니다. 적용하려면 재시작이 필요합니다"
                );
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn test_domain_dir_watcher_channel() {
        let mut watcher = DomainDirWatcher::new("/tmp");
        let tx = watcher.get_sender();
        let test_path = Path::new("/srv/domain/example.com/proxy.json").to_path_buf();

        let events = vec![
            DomainDirEvent::Created(test_path.clone()),
            DomainDirEvent::Modified(test_path.clone()),
            DomainDirEvent::Deleted(test_path.clone()),
        ];
        for event in events.clone() {
            tx.send(event).await.unwrap();
        }

        for expected_event in events {
            match watcher.watch().await {
                Some(event) => assert_eq!(event, expected_event),
                None => panic!("이벤트를 받지 못했습니다"),
            }
        }
    }

    #[tokio::test]
    async fn test_start_on_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut watcher = DomainDirWatcher::new(dir.path());
        assert!(watcher.start().is_ok());

        let mut missing = DomainDirWatcher::new(dir.path().join("missing"));
        assert!(missing.start().is_err());
    }
}
