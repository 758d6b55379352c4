use crate::domain::accrual::{AccrualState, tick_interval};
use crate::domain::currency::Currency;
use crate::domain::period::PayPeriod;
use crate::domain::ports::{SettingKey, SettingsStoreBox};
use crate::domain::wage::Wage;
use crate::error::{Result, WatchError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// The configured wage, pay period, and currency selection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WageConfig {
    pub wage: Wage,
    pub period: PayPeriod,
    pub currency_index: usize,
}

impl WageConfig {
    /// Currency units earned per elapsed second under this configuration.
    pub fn rate_per_second(&self) -> f64 {
        self.wage.per_second(self.period)
    }
}

/// What the engine republishes to its observers on every tick and every
/// transition.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSnapshot {
    pub earnings: f64,
    pub running: bool,
    pub wage: f64,
    pub period: PayPeriod,
    pub currency: Currency,
}

struct EngineInner {
    config: WageConfig,
    state: AccrualState,
    ticker: Option<JoinHandle<()>>,
}

/// The main entry point: the earnings-accrual engine.
///
/// `AccrualEngine` owns the accrual state machine and the settings store it
/// persists through. All operations go through one instance, and the
/// recomputation timer exists iff the state is Running. Observers subscribe
/// to a `watch` channel rather than sharing any mutable state.
pub struct AccrualEngine {
    store: SettingsStoreBox,
    currencies: Arc<Vec<Currency>>,
    inner: Arc<RwLock<EngineInner>>,
    publisher: watch::Sender<EngineSnapshot>,
}

impl AccrualEngine {
    /// Reconstructs the engine from persisted settings.
    ///
    /// Missing or corrupt values fall back to defaults: wage 0 reads as
    /// unset, out-of-range indices clamp, a negative banked amount reads as
    /// zero. If a start timestamp is persisted the engine comes up Running
    /// with a live ticker, so the value keeps advancing across restarts.
    pub async fn load(store: SettingsStoreBox, currencies: Vec<Currency>) -> Result<Self> {
        if currencies.is_empty() {
            return Err(WatchError::Validation(
                "currency list must not be empty".to_string(),
            ));
        }

        let raw_wage = store.get_number(SettingKey::Wage).await?;
        let wage = if raw_wage > 0.0 {
            Wage::new(raw_wage)?
        } else {
            Wage::default()
        };
        let period =
            PayPeriod::from_index(store.get_number(SettingKey::Period).await? as usize);
        let currency_index =
            (store.get_number(SettingKey::Currency).await? as usize).min(currencies.len() - 1);

        let accumulated = store.get_number(SettingKey::Earned).await?.max(0.0);
        let started_at = store.get_timestamp(SettingKey::StartDate).await?;
        let state = AccrualState::from_persisted(accumulated, started_at);

        let config = WageConfig {
            wage,
            period,
            currency_index,
        };
        let currencies = Arc::new(currencies);
        let initial = snapshot_of(&config, &state, &currencies, Utc::now());
        let (publisher, _) = watch::channel(initial);

        let engine = Self {
            store,
            currencies,
            inner: Arc::new(RwLock::new(EngineInner {
                config,
                state,
                ticker: None,
            })),
            publisher,
        };

        if started_at.is_some() {
            let mut inner = engine.inner.write().await;
            info!(accumulated, "resuming persisted run");
            engine.spawn_ticker(&mut inner);
        }

        Ok(engine)
    }

    /// Subscribes to the published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<EngineSnapshot> {
        self.publisher.subscribe()
    }

    /// The current snapshot, computed at `Utc::now()`.
    pub async fn snapshot(&self) -> EngineSnapshot {
        let inner = self.inner.read().await;
        snapshot_of(&inner.config, &inner.state, &self.currencies, Utc::now())
    }

    /// Derived earnings at an explicit instant.
    pub async fn earnings_at(&self, now: DateTime<Utc>) -> f64 {
        let inner = self.inner.read().await;
        inner.state.derived_earnings(inner.config.rate_per_second(), now)
    }

    pub async fn is_running(&self) -> bool {
        self.inner.read().await.state.is_running()
    }

    /// Begins accruing. No-op when already running.
    pub async fn start(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        match inner.state.start(now) {
            Ok(()) => {}
            Err(WatchError::Transition(_)) => {
                debug!("start ignored, already running");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        self.store.set_timestamp(SettingKey::StartDate, now).await?;
        info!(%now, "accrual started");
        self.spawn_ticker(&mut inner);
        self.publish(&inner, now);
        Ok(())
    }

    /// Stops accruing, banking the elapsed accrual. No-op when idle.
    ///
    /// The ticker is cancelled before any state mutation, so no tick can
    /// observe a half-applied transition.
    pub async fn stop(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        if !inner.state.is_running() {
            debug!("stop ignored, not running");
            return Ok(());
        }
        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
        }

        let now = Utc::now();
        let rate = inner.config.rate_per_second();
        let banked = inner.state.stop(rate, now)?;

        self.store.set_number(SettingKey::Earned, banked).await?;
        self.store.remove(SettingKey::StartDate).await?;
        info!(banked, "accrual stopped");
        self.publish(&inner, now);
        Ok(())
    }

    /// Zeroes the banked amount. Only permitted while idle with a positive
    /// balance; otherwise a no-op.
    pub async fn reset(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.state.reset() {
            Ok(()) => {}
            Err(WatchError::Transition(reason)) => {
                debug!(%reason, "reset ignored");
                return Ok(());
            }
            Err(e) => return Err(e),
        }

        self.store.set_number(SettingKey::Earned, 0.0).await?;
        info!("accumulated earnings reset");
        self.publish(&inner, Utc::now());
        Ok(())
    }

    /// Reconfigures the wage rate, persisting immediately.
    ///
    /// While running, the accrual earned so far is folded into the banked
    /// amount at the old rate first, so the change never reprices a
    /// completed segment; the ticker restarts at the recomputed cadence.
    pub async fn set_wage(&self, wage: Wage) -> Result<()> {
        let mut inner = self.inner.write().await;
        let now = self.fold_elapsed(&mut inner).await?;
        inner.config.wage = wage;
        self.store.set_number(SettingKey::Wage, wage.value()).await?;
        self.respawn_ticker(&mut inner);
        self.publish(&inner, now);
        Ok(())
    }

    /// Reconfigures the pay period, persisting immediately. Same folding
    /// policy as `set_wage`.
    pub async fn set_period(&self, period: PayPeriod) -> Result<()> {
        let mut inner = self.inner.write().await;
        let now = self.fold_elapsed(&mut inner).await?;
        inner.config.period = period;
        self.store
            .set_number(SettingKey::Period, period.index() as f64)
            .await?;
        self.respawn_ticker(&mut inner);
        self.publish(&inner, now);
        Ok(())
    }

    /// Selects a currency by index into the injected list.
    pub async fn set_currency(&self, index: usize) -> Result<()> {
        if index >= self.currencies.len() {
            return Err(WatchError::Validation(format!(
                "currency index {index} out of range (0..{})",
                self.currencies.len()
            )));
        }
        let mut inner = self.inner.write().await;
        inner.config.currency_index = index;
        self.store
            .set_number(SettingKey::Currency, index as f64)
            .await?;
        self.publish(&inner, Utc::now());
        Ok(())
    }

    /// The injected currency list this engine indexes into.
    pub fn currencies(&self) -> &[Currency] {
        &self.currencies
    }

    /// Folds elapsed accrual into the banked amount at the current rate and
    /// restamps the run, persisting both scalars. Returns the fold instant.
    async fn fold_elapsed(&self, inner: &mut EngineInner) -> Result<DateTime<Utc>> {
        let now = Utc::now();
        let rate = inner.config.rate_per_second();
        if let Some(banked) = inner.state.rebase(rate, now) {
            self.store.set_number(SettingKey::Earned, banked).await?;
            self.store.set_timestamp(SettingKey::StartDate, now).await?;
            debug!(banked, "elapsed accrual folded before reconfiguration");
        }
        Ok(now)
    }

    fn respawn_ticker(&self, inner: &mut EngineInner) {
        if let Some(ticker) = inner.ticker.take() {
            ticker.abort();
        }
        if inner.state.is_running() {
            self.spawn_ticker(inner);
        }
    }

    fn spawn_ticker(&self, inner: &mut EngineInner) {
        let interval = tick_interval(inner.config.rate_per_second());
        let shared = Arc::clone(&self.inner);
        let currencies = Arc::clone(&self.currencies);
        let publisher = self.publisher.clone();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let inner = shared.read().await;
                let snapshot =
                    snapshot_of(&inner.config, &inner.state, &currencies, Utc::now());
                let _ = publisher.send(snapshot);
            }
        });
        inner.ticker = Some(handle);
    }

    fn publish(&self, inner: &EngineInner, now: DateTime<Utc>) {
        let snapshot = snapshot_of(&inner.config, &inner.state, &self.currencies, now);
        let _ = self.publisher.send(snapshot);
    }
}

impl Drop for AccrualEngine {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_write()
            && let Some(ticker) = inner.ticker.take()
        {
            ticker.abort();
        }
    }
}

fn snapshot_of(
    config: &WageConfig,
    state: &AccrualState,
    currencies: &[Currency],
    now: DateTime<Utc>,
) -> EngineSnapshot {
    EngineSnapshot {
        earnings: state.derived_earnings(config.rate_per_second(), now),
        running: state.is_running(),
        wage: config.wage.value(),
        period: config.period,
        currency: currencies[config.currency_index].clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::currency::builtin_currencies;
    use crate::domain::ports::SettingsStore;
    use crate::domain::wage::DEFAULT_WAGE;
    use crate::infrastructure::in_memory::InMemorySettingsStore;
    use chrono::TimeDelta;
    use std::time::Duration;

    async fn engine_with(store: InMemorySettingsStore) -> AccrualEngine {
        AccrualEngine::load(Box::new(store), builtin_currencies())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_load_defaults_from_empty_store() {
        let engine = engine_with(InMemorySettingsStore::new()).await;
        let snapshot = engine.snapshot().await;

        assert!(!snapshot.running);
        assert_eq!(snapshot.earnings, 0.0);
        assert_eq!(snapshot.wage, DEFAULT_WAGE);
        assert_eq!(snapshot.period, PayPeriod::Hour);
        assert_eq!(snapshot.currency.code, "USD");
    }

    #[tokio::test]
    async fn test_load_persisted_idle_state() {
        let store = InMemorySettingsStore::new();
        store.set_number(SettingKey::Wage, 10.0).await.unwrap();
        store.set_number(SettingKey::Period, 0.0).await.unwrap();
        store.set_number(SettingKey::Earned, 5.5).await.unwrap();

        let engine = engine_with(store).await;
        let snapshot = engine.snapshot().await;

        assert!(!snapshot.running);
        assert_eq!(snapshot.earnings, 5.5);
        assert_eq!(snapshot.wage, 10.0);
    }

    #[tokio::test]
    async fn test_resume_on_load() {
        let store = InMemorySettingsStore::new();
        let started = Utc::now() - TimeDelta::seconds(3_600);
        store
            .set_timestamp(SettingKey::StartDate, started)
            .await
            .unwrap();

        let engine = engine_with(store).await;
        assert!(engine.is_running().await);

        // Default wage 7.25/hour, one hour elapsed.
        let earned = engine.earnings_at(started + TimeDelta::seconds(3_600)).await;
        assert!((earned - 7.25).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_start_persists_and_stop_banks() {
        let store = InMemorySettingsStore::new();
        let engine = engine_with(store.clone()).await;

        engine.start().await.unwrap();
        assert!(engine.is_running().await);
        assert!(
            store
                .get_timestamp(SettingKey::StartDate)
                .await
                .unwrap()
                .is_some()
        );

        engine.stop().await.unwrap();
        assert!(!engine.is_running().await);
        assert!(
            store
                .get_timestamp(SettingKey::StartDate)
                .await
                .unwrap()
                .is_none()
        );

        // Near-zero elapsed time: banked stays within a display increment.
        let banked = store.get_number(SettingKey::Earned).await.unwrap();
        assert!((0.0..0.01).contains(&banked));
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let store = InMemorySettingsStore::new();
        let engine = engine_with(store.clone()).await;

        engine.start().await.unwrap();
        let first = store
            .get_timestamp(SettingKey::StartDate)
            .await
            .unwrap()
            .unwrap();

        engine.start().await.unwrap();
        let second = store
            .get_timestamp(SettingKey::StartDate)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_stop_while_idle_is_noop() {
        let store = InMemorySettingsStore::new();
        store.set_number(SettingKey::Earned, 3.0).await.unwrap();
        let engine = engine_with(store.clone()).await;

        engine.stop().await.unwrap();
        assert_eq!(store.get_number(SettingKey::Earned).await.unwrap(), 3.0);
    }

    #[tokio::test]
    async fn test_reset_only_when_idle_with_balance() {
        let store = InMemorySettingsStore::new();
        store.set_number(SettingKey::Earned, 4.2).await.unwrap();
        let engine = engine_with(store.clone()).await;

        engine.reset().await.unwrap();
        assert_eq!(engine.snapshot().await.earnings, 0.0);
        assert_eq!(store.get_number(SettingKey::Earned).await.unwrap(), 0.0);

        // Nothing banked: reset is a no-op, not an error.
        engine.reset().await.unwrap();

        // While running, reset must not touch the banked amount.
        engine.start().await.unwrap();
        engine.reset().await.unwrap();
        assert!(engine.is_running().await);
    }

    #[tokio::test]
    async fn test_set_wage_folds_at_old_rate() {
        let store = InMemorySettingsStore::new();
        let started = Utc::now() - TimeDelta::seconds(3_600);
        store
            .set_timestamp(SettingKey::StartDate, started)
            .await
            .unwrap();

        // Running for an hour at the default 7.25/hour.
        let engine = engine_with(store.clone()).await;
        engine.set_wage(Wage::new(1_000_000.0).unwrap()).await.unwrap();

        // The hour already run is priced at the old rate, not the new one.
        let banked = store.get_number(SettingKey::Earned).await.unwrap();
        assert!((banked - 7.25).abs() < 0.5, "banked = {banked}");

        // The run was restamped at the fold instant.
        let restamped = store
            .get_timestamp(SettingKey::StartDate)
            .await
            .unwrap()
            .unwrap();
        assert!(restamped > started);

        assert_eq!(store.get_number(SettingKey::Wage).await.unwrap(), 1_000_000.0);
        assert!(engine.is_running().await);
    }

    #[tokio::test]
    async fn test_set_period_persists_index() {
        let store = InMemorySettingsStore::new();
        let engine = engine_with(store.clone()).await;

        engine.set_period(PayPeriod::Month).await.unwrap();
        assert_eq!(store.get_number(SettingKey::Period).await.unwrap(), 2.0);
        assert_eq!(engine.snapshot().await.period, PayPeriod::Month);
    }

    #[tokio::test]
    async fn test_set_currency_bounds() {
        let store = InMemorySettingsStore::new();
        let engine = engine_with(store.clone()).await;

        engine.set_currency(1).await.unwrap();
        assert_eq!(store.get_number(SettingKey::Currency).await.unwrap(), 1.0);
        assert_eq!(engine.snapshot().await.currency.code, "EUR");

        assert!(matches!(
            engine.set_currency(9_999).await,
            Err(WatchError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_ticker_republishes_snapshots() {
        let engine = engine_with(InMemorySettingsStore::new()).await;

        // 36000/hour is 10 units per second; the tick interval clamps to the
        // 50 ms floor, so changes arrive quickly.
        engine.set_wage(Wage::new(36_000.0).unwrap()).await.unwrap();
        let mut rx = engine.subscribe();
        engine.start().await.unwrap();

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("no snapshot published")
            .unwrap();
        let first = rx.borrow_and_update().clone();
        assert!(first.running);

        tokio::time::timeout(Duration::from_secs(2), rx.changed())
            .await
            .expect("no second snapshot published")
            .unwrap();
        let second = rx.borrow_and_update().clone();
        assert!(second.earnings >= first.earnings);

        engine.stop().await.unwrap();
        let stopped = engine.snapshot().await;
        assert!(!stopped.running);
    }
}
