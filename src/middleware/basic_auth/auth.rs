use std::collections::HashMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use pbkdf2::pbkdf2_hmac;
use serde::Deserialize;
use sha1::Sha1;
use sha2::Sha512;
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::domain::Credential;

/// 인증 실패 사유. 모두 401로 응답됩니다.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization 헤더가 없거나 잘못됨")]
    MissingCredentials,

    #[error("알 수 없는 사용자: {0}")]
    UnknownUser(String),

    #[error("비밀번호 불일치")]
    Mismatch,

    #[error("해시 검증 실패: {0}")]
    HashVerify(String),
}

/// 소문자 사용자 이름 → 자격증명
#[derive(Debug, Clone, Default)]
pub struct UserTable {
    users: HashMap<String, Credential>,
}

impl UserTable {
    pub fn new(users: HashMap<String, Credential>) -> Self {
        Self { users }
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// 사용자 이름은 대소문자를 구분하지 않습니다.
    pub async fn verify(&self, username: &str, password: &str) -> Result<(), AuthError> {
        let username = username.to_lowercase();
        let credential = self
            .users
            .get(&username)
            .ok_or_else(|| AuthError::UnknownUser(username.clone()))?;

        match credential {
            Credential::Plain(expected) => {
                debug!(user = %username, "평문 비밀번호 검사");
                if bool::from(expected.as_bytes().ct_eq(password.as_bytes())) {
                    Ok(())
                } else {
                    Err(AuthError::Mismatch)
                }
            }
            Credential::Hashed(hash) => {
                debug!(user = %username, "해시 비밀번호 검사");
                verify_hash(hash.clone(), password.to_string()).await
            }
        }
    }
}

/// 해시 검증은 CPU를 오래 쓰므로 blocking 풀에서 실행합니다.
async fn verify_hash(hash: Vec<u8>, password: String) -> Result<(), AuthError> {
    let matched = tokio::task::spawn_blocking(move || verify_stored(&hash, &password))
        .await
        .map_err(|e| AuthError::HashVerify(e.to_string()))??;

    if matched {
        Ok(())
    } else {
        Err(AuthError::Mismatch)
    }
}

/// JSON 형식의 pbkdf2 자격증명이면 pbkdf2로, 아니면 bcrypt 해시로 검증합니다.
fn verify_stored(hash: &[u8], password: &str) -> Result<bool, AuthError> {
    if let Ok(stored) = serde_json::from_slice::<StoredPbkdf2>(hash) {
        return stored.verify(password);
    }
    let hash = std::str::from_utf8(hash).map_err(|e| AuthError::HashVerify(e.to_string()))?;
    bcrypt::verify(password, hash).map_err(|e| AuthError::HashVerify(e.to_string()))
}

const MAX_KEY_LENGTH: usize = 1024;

type Prf = fn(&[u8], &[u8], u32, &mut [u8]);

/// `{hash, salt, keyLength, hashMethod, iterations}` 형식의 저장된 자격증명.
///
/// 솔트는 base64 문자열 그대로 키 유도에 쓰이고, 결과는 base64로 비교합니다.
/// 형식에 PRF가 기록되지 않으므로 HMAC-SHA1과 HMAC-SHA512를 모두 시도합니다.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredPbkdf2 {
    hash: String,
    salt: String,
    key_length: usize,
    hash_method: String,
    iterations: u32,
}

impl StoredPbkdf2 {
    fn verify(&self, password: &str) -> Result<bool, AuthError> {
        if self.hash_method != "pbkdf2" {
            return Err(AuthError::HashVerify(format!("지원하지 않는 해시 방식: {}", self.hash_method)));
        }
        if self.iterations == 0 || self.key_length == 0 || self.key_length > MAX_KEY_LENGTH {
            return Err(AuthError::HashVerify("잘못된 pbkdf2 매개변수".to_string()));
        }

        let prfs: [Prf; 2] = [pbkdf2_hmac::<Sha1>, pbkdf2_hmac::<Sha512>];
        let mut derived = vec![0u8; self.key_length];
        let mut matched = false;
        for prf in prfs {
            prf(password.as_bytes(), self.salt.as_bytes(), self.iterations, &mut derived);
            let encoded = BASE64.encode(&derived);
            matched |= bool::from(encoded.as_bytes().ct_eq(self.hash.as_bytes()));
        }
        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // {"hash":..,"salt":"c2FsdHlzYWx0c2FsdHlzYWx0c2FsdHk=","keyLength":66,"hashMethod":"pbkdf2","iterations":1000}
    // 비밀번호 "hunter2", HMAC-SHA1
    const PBKDF2_SHA1: &str = "eyJoYXNoIjoiK1N5TzVSZ3VYMWs3WDlJMlduU1dNM1EzbWJLZGltQ0NOWlZxN3hFbWRpWTF2aUp6U1VFK2dIS1VHUXVPQUErMmhERDNZem1oNUZneTZhZmlOaFB3R3NSLyIsInNhbHQiOiJjMkZzZEhsellXeDBjMkZzZEhsellXeDBjMkZzZEhrPSIsImtleUxlbmd0aCI6NjYsImhhc2hNZXRob2QiOiJwYmtkZjIiLCJpdGVyYXRpb25zIjoxMDAwfQ==";
    // 같은 비밀번호와 솔트, HMAC-SHA512
    const PBKDF2_SHA512: &str = "eyJoYXNoIjoiSVZlK2dNaW15RGxCTTJjV1VaMXBjK216MmZEdGtlVjY1cE5CYkNhZ3J5N2F1WEx1dklRMUVMcENoTjVTa3RYdWJ0d0Z2Zk9wc1pTMTZ3QnJvNlhncmdGRiIsInNhbHQiOiJjMkZzZEhsellXeDBjMkZzZEhsellXeDBjMkZzZEhrPSIsImtleUxlbmd0aCI6NjYsImhhc2hNZXRob2QiOiJwYmtkZjIiLCJpdGVyYXRpb25zIjoxMDAwfQ==";

    fn table() -> UserTable {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        let encoded = BASE64.encode(hash);
        let mut users = HashMap::new();
        users.insert("alice".to_string(), Credential::classify("secret").unwrap());
        users.insert("bob".to_string(), Credential::classify(&encoded).unwrap());
        UserTable::new(users)
    }

    #[tokio::test]
    async fn test_plain_credential() {
        let table = table();
        assert!(table.verify("alice", "secret").await.is_ok());
        assert!(table.verify("ALICE", "secret").await.is_ok());
        assert!(matches!(table.verify("alice", "wrong").await, Err(AuthError::Mismatch)));
    }

    #[tokio::test]
    async fn test_hashed_credential() {
        let table = table();
        assert!(table.verify("bob", "hunter2").await.is_ok());
        assert!(matches!(table.verify("bob", "nope").await, Err(AuthError::Mismatch)));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let table = table();
        assert!(matches!(table.verify("carol", "secret").await, Err(AuthError::UnknownUser(_))));
    }

    #[tokio::test]
    async fn test_garbage_hash_is_auth_failure() {
        let mut users = HashMap::new();
        users.insert("eve".to_string(), Credential::Hashed(b"not a bcrypt hash at all".to_vec()));
        let table = UserTable::new(users);
        assert!(matches!(table.verify("eve", "x").await, Err(AuthError::HashVerify(_))));
    }

    #[tokio::test]
    async fn test_pbkdf2_json_credential() {
        let mut users = HashMap::new();
        users.insert("alice".to_string(), Credential::classify(PBKDF2_SHA1).unwrap());
        users.insert("carol".to_string(), Credential::classify(PBKDF2_SHA512).unwrap());
        let table = UserTable::new(users);

        assert!(table.verify("alice", "hunter2").await.is_ok());
        assert!(table.verify("Carol", "hunter2").await.is_ok());
        assert!(matches!(table.verify("alice", "hunter3").await, Err(AuthError::Mismatch)));
        assert!(matches!(table.verify("carol", "").await, Err(AuthError::Mismatch)));
    }

    #[tokio::test]
    async fn test_unknown_json_hash_method_is_auth_failure() {
        let blob = br#"{"hash":"AAAA","salt":"x","keyLength":3,"hashMethod":"scrypt","iterations":1}"#;
        let mut users = HashMap::new();
        users.insert("dave".to_string(), Credential::Hashed(blob.to_vec()));
        let table = UserTable::new(users);
        assert!(matches!(table.verify("dave", "x").await, Err(AuthError::HashVerify(_))));
    }
}
