//! 使えるモデル名の決定
//!
//! 順番:
//! 1. 有効期間内のキャッシュ（再確認しない）
//! 2. 設定の候補リスト（順番通り）
//! 3. モデル一覧APIから生成可能なものを優先順に
//!
//! 各候補には "hi" を送り、空でない返答が来た最初のものを採用する。

use super::VisionBackend;
use crate::config::Config;
use crate::error::{CactusError, Result};
use cactus_common::{rank_models, RankPolicy, SMOKE_TEST_PROMPT};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct CachedModel {
    name: String,
    resolved_at: Instant,
}

#[derive(Debug, Clone)]
pub struct ModelResolver {
    candidates: Vec<String>,
    policy: RankPolicy,
    ttl: Duration,
    cached: Option<CachedModel>,
}

impl ModelResolver {
    pub fn new(candidates: Vec<String>, policy: RankPolicy, ttl: Duration) -> Self {
        Self {
            candidates,
            policy,
            ttl,
            cached: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.model_candidates.clone(),
            config.rank_policy.clone(),
            Duration::from_secs(config.model_cache_ttl_seconds),
        )
    }

    /// 有効期間内のキャッシュ
    pub fn cached(&self) -> Option<&str> {
        self.cached
            .as_ref()
            .filter(|c| c.resolved_at.elapsed() < self.ttl)
            .map(|c| c.name.as_str())
    }

    /// 実呼び出しが失敗したときに呼ぶ
    pub fn invalidate(&mut self) {
        if let Some(c) = self.cached.take() {
            log::info!("モデルキャッシュを破棄: {}", c.name);
        }
    }

    fn remember(&mut self, name: &str) {
        self.cached = Some(CachedModel {
            name: name.to_string(),
            resolved_at: Instant::now(),
        });
    }

    /// 設定の候補（除外マーカー適用後）
    pub fn static_candidates(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for c in &self.candidates {
            let c = c.trim();
            if c.is_empty() || self.policy.is_skipped(c) || out.iter().any(|x| x == c) {
                continue;
            }
            out.push(c.to_string());
        }
        out
    }

    /// 一覧APIの結果を優先順に（失敗時は空）
    pub async fn live_candidates(&self, backend: &dyn VisionBackend) -> Vec<String> {
        match backend.list_models().await {
            Ok(models) => rank_models(&models, &self.policy),
            Err(e) => {
                log::warn!("モデル一覧の取得に失敗: {}", e);
                Vec::new()
            }
        }
    }

    /// 使えるモデル名を返す
    pub async fn resolve(&mut self, backend: &dyn VisionBackend) -> Result<String> {
        if let Some(name) = self.cached() {
            log::debug!("キャッシュ済みモデルを使用: {}", name);
            return Ok(name.to_string());
        }

        let mut tried: Vec<String> = Vec::new();

        for candidate in self.static_candidates() {
            tried.push(candidate.clone());
            if smoke_test(backend, &candidate).await {
                self.remember(&candidate);
                return Ok(candidate);
            }
        }

        for candidate in self.live_candidates(backend).await {
            if tried.contains(&candidate) {
                continue;
            }
            tried.push(candidate.clone());
            if smoke_test(backend, &candidate).await {
                self.remember(&candidate);
                return Ok(candidate);
            }
        }

        Err(CactusError::NoWorkingModel { tried: tried.len() })
    }
}

async fn smoke_test(backend: &dyn VisionBackend, model: &str) -> bool {
    match backend.generate(model, SMOKE_TEST_PROMPT, None).await {
        Ok(reply) if !reply.trim().is_empty() => {
            log::info!("モデル採用: {}", model);
            true
        }
        Ok(_) => {
            log::debug!("モデル {}: 空の返答", model);
            false
        }
        Err(e) => {
            log::debug!("モデル {} は使用不可: {}", model, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::PreparedImage;
    use async_trait::async_trait;
    use cactus_common::ModelInfo;
    use std::sync::Mutex;

    /// 指定したモデルだけが応答する偽バックエンド
    struct FakeBackend {
        working: Vec<&'static str>,
        listed: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
        list_calls: Mutex<usize>,
    }

    impl FakeBackend {
        fn new(working: &[&'static str], listed: &[&'static str]) -> Self {
            Self {
                working: working.to_vec(),
                listed: listed.to_vec(),
                calls: Mutex::new(Vec::new()),
                list_calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl VisionBackend for FakeBackend {
        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            *self.list_calls.lock().unwrap() += 1;
            Ok(self
                .listed
                .iter()
                .map(|n| ModelInfo {
                    name: format!("models/{}", n),
                    display_name: String::new(),
                    supported_generation_methods: vec!["generateContent".into()],
                })
                .collect())
        }

        async fn generate(&self, model: &str, _: &str, _: Option<&PreparedImage>) -> Result<String> {
            self.calls.lock().unwrap().push(model.to_string());
            if self.working.contains(&model) {
                Ok("Hello!".into())
            } else {
                Err(CactusError::ApiCall(format!("404 {}", model)))
            }
        }
    }

    fn resolver(candidates: &[&str]) -> ModelResolver {
        ModelResolver::new(
            candidates.iter().map(|c| c.to_string()).collect(),
            RankPolicy::default(),
            Duration::from_secs(600),
        )
    }

    #[tokio::test]
    async fn test_first_working_candidate_stops_the_ladder() {
        let backend = FakeBackend::new(&["c", "d"], &[]);
        let mut r = resolver(&["a", "b", "c", "d"]);

        assert_eq!(r.resolve(&backend).await.unwrap(), "c");
        assert_eq!(backend.calls(), vec!["a", "b", "c"]);
        assert_eq!(*backend.list_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cached_model_not_reverified() {
        let backend = FakeBackend::new(&["a"], &[]);
        let mut r = resolver(&["a"]);

        r.resolve(&backend).await.unwrap();
        r.resolve(&backend).await.unwrap();
        assert_eq!(backend.calls().len(), 1);
        assert_eq!(r.cached(), Some("a"));
    }

    #[tokio::test]
    async fn test_invalidate_forces_reresolve() {
        let backend = FakeBackend::new(&["a"], &[]);
        let mut r = resolver(&["a"]);

        r.resolve(&backend).await.unwrap();
        r.invalidate();
        assert_eq!(r.cached(), None);
        r.resolve(&backend).await.unwrap();
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_expired_cache_is_ignored() {
        let backend = FakeBackend::new(&["a"], &[]);
        let mut r = ModelResolver::new(vec!["a".into()], RankPolicy::default(), Duration::ZERO);

        r.resolve(&backend).await.unwrap();
        assert_eq!(r.cached(), None);
        r.resolve(&backend).await.unwrap();
        assert_eq!(backend.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_falls_back_to_ranked_live_models() {
        let backend = FakeBackend::new(
            &["gemini-1.5-pro", "gemini-2.0-flash-exp"],
            &["gemini-1.5-pro", "gemini-2.0-flash-exp", "static-one"],
        );
        let mut r = resolver(&["static-one"]);

        // flash系が先、static-oneは試行済みなので再試行しない
        assert_eq!(r.resolve(&backend).await.unwrap(), "gemini-2.0-flash-exp");
        assert_eq!(backend.calls(), vec!["static-one", "gemini-2.0-flash-exp"]);
    }

    #[tokio::test]
    async fn test_no_working_model() {
        let backend = FakeBackend::new(&[], &["x", "y"]);
        let mut r = resolver(&["a"]);

        let err = r.resolve(&backend).await.unwrap_err();
        assert!(matches!(err, CactusError::NoWorkingModel { tried: 3 }));
    }

    #[test]
    fn test_static_candidates_apply_skip_markers() {
        let policy = RankPolicy {
            skip_markers: vec!["1.0".into()],
            ..Default::default()
        };
        let r = ModelResolver::new(
            vec!["gemini-1.0-pro".into(), "gemini-1.5-flash".into(), "gemini-1.5-flash".into(), " ".into()],
            policy,
            Duration::from_secs(1),
        );
        assert_eq!(r.static_candidates(), vec!["gemini-1.5-flash"]);
    }
}
