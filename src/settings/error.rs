use std::fmt;

#[derive(Debug)]
pub enum SettingsError {
    MissingValue {
        name: String,
    },
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
    FileError {
        path: String,
        error: std::io::Error,
    },
    ParseError {
        source: toml::de::Error,
    },
    SpecError {
        name: String,
        source: serde_json::Error,
    },
    WatchError(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingValue { name } =>
                write!(f, "설정 값 누락: {}", name),
            Self::InvalidValue { name, value, reason } =>
                write!(f, "설정 {} 값 {} 오류: {}", name, value, reason),
            Self::FileError { path, error } =>
                write!(f, "설정 파일 {} 오류: {}", path, error),
            Self::ParseError { source } =>
                write!(f, "설정 파싱 오류: {}", source),
            Self::SpecError { name, source } =>
                write!(f, "{} 스펙 파싱 오류: {}", name, source),
            Self::WatchError(msg) =>
                write!(f, "디렉토리 감시 오류: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ParseError { source } => Some(source),
            Self::FileError { error, .. } => Some(error),
            Self::SpecError { source, .. } => Some(source),
            _ => None,
        }
    }
}
