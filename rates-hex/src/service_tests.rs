//! RateService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::str::FromStr;
    use std::sync::Arc;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use rates_repo::InMemoryRateCache;
    use rates_types::{
        ApiKeyRecord, AppError, CacheError, ConvertRequest, HistoricalRateRecord, RateCache,
        RateMap, RateRecord, RateRepository, RepoError, Role, SupportedCurrency, SyncBatch,
        UpdateRatesRequest,
    };
    use rates_upstream::FixedRateGateway;

    use crate::{RateService, ServiceConfig};

    type Pair = (String, String);

    /// Simple in-memory repository for testing the application layer.
    pub struct MockRepo {
        current: Mutex<BTreeMap<Pair, RateRecord>>,
        history: Mutex<Vec<HistoricalRateRecord>>,
        api_keys: Mutex<HashMap<String, Role>>,
        fail_writes: AtomicBool,
        fail_next: AtomicUsize,
        batch_times: Mutex<Vec<tokio::time::Instant>>,
    }

    impl MockRepo {
        pub fn new() -> Self {
            Self {
                current: Mutex::new(BTreeMap::new()),
                history: Mutex::new(Vec::new()),
                api_keys: Mutex::new(HashMap::new()),
                fail_writes: AtomicBool::new(false),
                fail_next: AtomicUsize::new(0),
                batch_times: Mutex::new(Vec::new()),
            }
        }

        pub fn with_api_key(self, key: &str, role: Role) -> Self {
            self.api_keys.lock().unwrap().insert(key.to_string(), role);
            self
        }

        /// Makes every write fail until switched off.
        pub fn fail_writes(&self, fail: bool) {
            self.fail_writes.store(fail, Ordering::SeqCst);
        }

        /// Makes the next `n` writes fail.
        pub fn fail_next_writes(&self, n: usize) {
            self.fail_next.store(n, Ordering::SeqCst);
        }

        pub fn current_rate(&self, base: &str, currency: &str) -> Option<Decimal> {
            self.current
                .lock()
                .unwrap()
                .get(&(base.to_string(), currency.to_string()))
                .map(|r| r.rate)
        }

        pub fn history_len(&self) -> usize {
            self.history.lock().unwrap().len()
        }

        pub fn history_dates(&self) -> Vec<NaiveDate> {
            self.history.lock().unwrap().iter().map(|h| h.date).collect()
        }

        /// Number of `apply_sync_batch` calls, failed ones included.
        pub fn batch_attempts(&self) -> usize {
            self.batch_times.lock().unwrap().len()
        }

        pub fn batch_attempt_times(&self) -> Vec<tokio::time::Instant> {
            self.batch_times.lock().unwrap().clone()
        }

        fn check_write(&self) -> Result<(), RepoError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(RepoError::Database("database is locked".into()));
            }
            let remaining = self.fail_next.load(Ordering::SeqCst);
            if remaining > 0 {
                self.fail_next.store(remaining - 1, Ordering::SeqCst);
                return Err(RepoError::Database("database is locked".into()));
            }
            Ok(())
        }

        fn upsert(&self, base: &str, currency: &str, rate: Decimal) {
            self.current.lock().unwrap().insert(
                (base.to_string(), currency.to_string()),
                RateRecord {
                    base_currency: base.to_string(),
                    currency: currency.to_string(),
                    rate,
                    updated_at: Utc::now(),
                },
            );
        }
    }

    #[async_trait]
    impl RateRepository for MockRepo {
        async fn apply_sync_batch(&self, batch: &SyncBatch) -> Result<usize, RepoError> {
            self.batch_times
                .lock()
                .unwrap()
                .push(tokio::time::Instant::now());
            self.check_write()?;

            for obs in &batch.observations {
                let mut history = self.history.lock().unwrap();
                let seen = history.iter().any(|h| {
                    h.base_currency == obs.base_currency
                        && h.currency == obs.currency
                        && h.date == batch.date
                });
                if !seen {
                    history.push(HistoricalRateRecord {
                        base_currency: obs.base_currency.clone(),
                        currency: obs.currency.clone(),
                        rate: obs.rate,
                        date: batch.date,
                    });
                }
                drop(history);
                self.upsert(&obs.base_currency, &obs.currency, obs.rate);
            }
            Ok(batch.len())
        }

        async fn upsert_rates(
            &self,
            base_currency: &str,
            rates: &RateMap,
        ) -> Result<usize, RepoError> {
            self.check_write()?;
            for (currency, rate) in rates {
                self.upsert(base_currency, currency, *rate);
            }
            Ok(rates.len())
        }

        async fn historical_rates(
            &self,
            base_currency: &str,
            limit: i64,
        ) -> Result<Vec<HistoricalRateRecord>, RepoError> {
            let mut rows: Vec<_> = self
                .history
                .lock()
                .unwrap()
                .iter()
                .filter(|h| h.base_currency == base_currency)
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.currency.cmp(&b.currency)));
            rows.truncate(limit.max(0) as usize);
            Ok(rows)
        }

        async fn supported_currencies(&self) -> Result<Vec<SupportedCurrency>, RepoError> {
            Ok(vec![SupportedCurrency {
                code: "USD".into(),
                name: "US Dollar".into(),
            }])
        }

        async fn find_api_key(
            &self,
            key_value: &str,
        ) -> Result<Option<ApiKeyRecord>, RepoError> {
            Ok(self
                .api_keys
                .lock()
                .unwrap()
                .get(key_value)
                .map(|role| ApiKeyRecord::new(key_value, *role)))
        }
    }

    /// Cache whose every operation fails.
    struct BrokenCache;

    #[async_trait]
    impl RateCache for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<RateMap>, CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }

        async fn set(&self, _key: &str, _rates: &RateMap, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".into()))
        }
    }

    const LIVE: &str = "http://live.test/latest/{base}";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rates(pairs: &[(&str, &str)]) -> RateMap {
        pairs
            .iter()
            .map(|(c, r)| (c.to_string(), dec(r)))
            .collect()
    }

    fn service_with(
        repo: MockRepo,
        gateway: Arc<FixedRateGateway>,
        cache: Arc<dyn RateCache>,
    ) -> RateService<MockRepo> {
        RateService::new(
            Arc::new(repo),
            gateway,
            cache,
            ServiceConfig {
                live_rates_url: LIVE.to_string(),
                ..ServiceConfig::default()
            },
        )
    }

    fn usd_gateway() -> Arc<FixedRateGateway> {
        Arc::new(
            FixedRateGateway::new()
                .with_rates("http://live.test/latest/USD", rates(&[("EUR", "0.92")])),
        )
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Read path
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_get_rates_cache_aside() {
        let gateway = usd_gateway();
        let cache = Arc::new(InMemoryRateCache::new());
        let service = service_with(MockRepo::new(), gateway.clone(), cache.clone());

        let first = service.get_rates("USD").await.unwrap();
        assert_eq!(first, rates(&[("EUR", "0.92")]));
        assert_eq!(gateway.calls(), 1);
        assert_eq!(
            cache.get("exchange_rates:USD").await.unwrap(),
            Some(rates(&[("EUR", "0.92")]))
        );

        let second = service.get_rates("USD").await.unwrap();
        assert_eq!(second, first);
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_rates_upstream_failure_not_cached() {
        let gateway = Arc::new(FixedRateGateway::new().with_status("http://live.test/latest/USD", 503));
        let cache = Arc::new(InMemoryRateCache::new());
        let service = service_with(MockRepo::new(), gateway.clone(), cache.clone());

        let err = service.get_rates("USD").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::UpstreamUnavailable { status: Some(503) }
        ));
        assert!(cache.is_empty());

        // Nothing negative was cached: the next call goes upstream again.
        let _ = service.get_rates("USD").await;
        assert_eq!(gateway.calls(), 2);
    }

    #[tokio::test]
    async fn test_get_rates_survives_broken_cache() {
        let gateway = usd_gateway();
        let service = service_with(MockRepo::new(), gateway.clone(), Arc::new(BrokenCache));

        let result = service.get_rates("USD").await.unwrap();

        assert_eq!(result, rates(&[("EUR", "0.92")]));
        assert_eq!(gateway.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_rates_rejects_bad_base() {
        let gateway = usd_gateway();
        let service = service_with(MockRepo::new(), gateway.clone(), Arc::new(InMemoryRateCache::new()));

        for base in ["", "US D", "../x", "ABCDEFGHIJK"] {
            let err = service.get_rates(base).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "base {base:?}");
        }
        assert_eq!(gateway.calls(), 0);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Conversion
    // ─────────────────────────────────────────────────────────────────────────────

    fn convert_req(from: &str, to: &str, amount: &str) -> ConvertRequest {
        ConvertRequest {
            from_currency: Some(from.into()),
            to_currency: Some(to.into()),
            amount: Some(dec(amount)),
        }
    }

    #[tokio::test]
    async fn test_convert_uses_live_rate() {
        let gateway = usd_gateway();
        let cache = Arc::new(InMemoryRateCache::new());
        let service = service_with(MockRepo::new(), gateway.clone(), cache.clone());

        let result = service.convert(convert_req("USD", "EUR", "100")).await.unwrap();

        assert_eq!(result.converted_amount, dec("92.0"));
        assert_eq!(result.rate, dec("0.92"));

        // Bypasses the cache in both directions.
        service.convert(convert_req("USD", "EUR", "1")).await.unwrap();
        assert_eq!(gateway.calls(), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_convert_unsupported_currency() {
        let service = service_with(
            MockRepo::new(),
            usd_gateway(),
            Arc::new(InMemoryRateCache::new()),
        );

        let err = service
            .convert(convert_req("USD", "ZZZ", "100"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::UnsupportedCurrency(code) if code == "ZZZ"));
    }

    #[tokio::test]
    async fn test_convert_missing_fields() {
        let gateway = usd_gateway();
        let service = service_with(MockRepo::new(), gateway.clone(), Arc::new(InMemoryRateCache::new()));

        let cases = [
            ConvertRequest {
                from_currency: None,
                ..convert_req("USD", "EUR", "1")
            },
            ConvertRequest {
                to_currency: Some(String::new()),
                ..convert_req("USD", "EUR", "1")
            },
            ConvertRequest {
                amount: None,
                ..convert_req("USD", "EUR", "1")
            },
            convert_req("USD", "EUR", "0"),
        ];

        for req in cases {
            let err = service.convert(req).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(gateway.calls(), 0);
    }

    #[tokio::test]
    async fn test_convert_upstream_down() {
        let service = service_with(
            MockRepo::new(),
            Arc::new(FixedRateGateway::new()),
            Arc::new(InMemoryRateCache::new()),
        );

        let err = service
            .convert(convert_req("USD", "EUR", "100"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::UpstreamUnavailable { status: Some(404) }
        ));
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Admin update
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_update_rates_upserts_current_only() {
        let repo = MockRepo::new();
        let service = service_with(repo, usd_gateway(), Arc::new(InMemoryRateCache::new()));

        let resp = service
            .update_rates(UpdateRatesRequest {
                base_currency: Some("THB".into()),
                rates: Some(rates(&[("USD", "0.028"), ("EUR", "0.026")])),
            })
            .await
            .unwrap();

        assert_eq!(resp.updated, 2);
        assert_eq!(resp.message, "Exchange rates updated successfully");
        assert_eq!(service.repo().current_rate("THB", "USD"), Some(dec("0.028")));
        assert_eq!(service.repo().history_len(), 0);
    }

    #[tokio::test]
    async fn test_update_rates_requires_base_and_rates() {
        let service = service_with(
            MockRepo::new(),
            usd_gateway(),
            Arc::new(InMemoryRateCache::new()),
        );

        let missing_base = service
            .update_rates(UpdateRatesRequest {
                base_currency: None,
                rates: Some(rates(&[("USD", "1")])),
            })
            .await
            .unwrap_err();
        assert!(matches!(missing_base, AppError::Validation(_)));

        let empty_rates = service
            .update_rates(UpdateRatesRequest {
                base_currency: Some("THB".into()),
                rates: Some(RateMap::new()),
            })
            .await
            .unwrap_err();
        assert!(matches!(empty_rates, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_rates_storage_error() {
        let repo = MockRepo::new();
        repo.fail_writes(true);
        let service = service_with(repo, usd_gateway(), Arc::new(InMemoryRateCache::new()));

        let err = service
            .update_rates(UpdateRatesRequest {
                base_currency: Some("THB".into()),
                rates: Some(rates(&[("USD", "0.028")])),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(_)));
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Guard
    // ─────────────────────────────────────────────────────────────────────────────

    fn guarded_service() -> RateService<MockRepo> {
        let repo = MockRepo::new()
            .with_api_key("user-key", Role::User)
            .with_api_key("admin-key", Role::Admin);
        service_with(repo, usd_gateway(), Arc::new(InMemoryRateCache::new()))
    }

    #[tokio::test]
    async fn test_guard_missing_credential() {
        let service = guarded_service();

        for credential in [None, Some("")] {
            let err = service
                .guard()
                .authorize(credential, Some(Role::User))
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::MissingCredential));
        }
    }

    #[tokio::test]
    async fn test_guard_unknown_key() {
        let err = guarded_service()
            .guard()
            .authorize(Some("nope"), None)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidCredential));
    }

    #[tokio::test]
    async fn test_guard_role_is_strict() {
        let service = guarded_service();

        let err = service
            .guard()
            .authorize(Some("admin-key"), Some(Role::User))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::RoleMismatch {
                required: Role::User,
                actual: Role::Admin
            }
        ));

        let record = service
            .guard()
            .authorize(Some("user-key"), Some(Role::User))
            .await
            .unwrap();
        assert_eq!(record.user_role, Role::User);

        // No required role: any valid key passes.
        let record = service
            .guard()
            .authorize(Some("admin-key"), None)
            .await
            .unwrap();
        assert_eq!(record.user_role, Role::Admin);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Reference data
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_historical_rates_limited_to_thirty() {
        let repo = MockRepo::new();
        for day in 1..=31 {
            let mut batch = SyncBatch::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap());
            batch.extend_from_rates("THB", &rates(&[("USD", "0.028")]));
            repo.apply_sync_batch(&batch).await.unwrap();
        }
        let service = service_with(repo, usd_gateway(), Arc::new(InMemoryRateCache::new()));

        let history = service.historical_rates("THB").await.unwrap();

        assert_eq!(history.len(), 30);
        assert_eq!(history[0].date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(history[29].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }
}
