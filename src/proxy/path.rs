//! 마운트 경로 매칭과 다운스트림 경로 계산

/// 끝의 `/`를 제거한 마운트 경로. 루트 마운트는 빈 문자열이 됩니다.
pub fn normalize_mount(mount: &str) -> &str {
    mount.trim_end_matches('/')
}

/// 경로가 마운트와 같거나 `마운트/`로 시작하면 일치합니다. 대소문자는 구분하지 않습니다.
pub fn mount_matches(mount: &str, path: &str) -> bool {
    let mount = normalize_mount(mount);
    if mount.is_empty() {
        return true;
    }
    match strip_prefix_ignore_case(path, mount) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// 마운트 부분을 제거한 나머지 경로. 빈 문자열이거나 `/`로 시작합니다.
pub fn strip_mount<'a>(mount: &str, path: &'a str) -> &'a str {
    strip_prefix_ignore_case(path, normalize_mount(mount)).unwrap_or(path)
}

fn strip_prefix_ignore_case<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let head = path.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &path[prefix.len()..])
}

/// 다운스트림 경로 접두사와 나머지 경로를 `/` 하나로 잇습니다.
pub fn join_downstream_path(prefix: &str, rest: &str) -> String {
    let base = prefix.trim_end_matches('/');
    if rest.is_empty() {
        if base.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else {
        format!("{}{}", base, rest)
    }
}

/// 다운스트림으로 보낼 경로와 쿼리
pub fn outbound_path_and_query(mount: &str, prefix: &str, path: &str, query: Option<&str>) -> String {
    let mut target = join_downstream_path(prefix, strip_mount(mount, path));
    if let Some(query) = query {
        target.push('?');
        target.push_str(query);
    }
    target
}
