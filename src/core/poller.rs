//! Background loop that keeps sending the "off" signal while the room is bright.
//!
//! The loop runs on a fixed interval with a fixed attempt budget. It stops
//! when the illumination drops below the threshold, when the budget runs
//! out, after too many consecutive failed reads (if configured), or when the
//! handle's cancellation token fires. Failed calls inside a tick are logged
//! and never leave the task.

use crate::config::PollerConfig;
use crate::domain::model::{Device, Signal, Target};
use crate::domain::ports::HubApi;
use crate::utils::error::TickError;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PollOutcome {
    /// Illumination fell below the threshold.
    Dark,
    /// The attempt budget ran out while the room was still bright.
    Exhausted,
    /// Too many consecutive device refreshes failed.
    ReadFailures,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollReport {
    pub outcome: PollOutcome,
    /// Ticks that consumed a unit of the budget.
    pub ticks: u32,
    pub signals_sent: u32,
    pub send_failures: u32,
    pub read_failures: u32,
    pub last_illumination: Option<f64>,
}

/// Mutable per-run state, owned by the poll task.
#[derive(Debug)]
struct PollState {
    remaining: u32,
    ticks: u32,
    signals_sent: u32,
    send_failures: u32,
    read_failures: u32,
    consecutive_read_failures: u32,
    last_illumination: Option<f64>,
}

impl PollState {
    fn new(budget: u32) -> Self {
        Self {
            remaining: budget,
            ticks: 0,
            signals_sent: 0,
            send_failures: 0,
            read_failures: 0,
            consecutive_read_failures: 0,
            last_illumination: None,
        }
    }

    fn into_report(self, outcome: PollOutcome) -> PollReport {
        PollReport {
            outcome,
            ticks: self.ticks,
            signals_sent: self.signals_sent,
            send_failures: self.send_failures,
            read_failures: self.read_failures,
            last_illumination: self.last_illumination,
        }
    }
}

/// Handle to a spawned poll task. Dropping it detaches the task.
#[derive(Debug)]
pub struct PollHandle {
    task: JoinHandle<PollReport>,
    cancel: CancellationToken,
}

impl PollHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn join(self) -> Result<PollReport, JoinError> {
        self.task.await
    }
}

pub struct DarknessPoller<H: HubApi + ?Sized> {
    api: Arc<H>,
    device: Device,
    signal: Signal,
    config: PollerConfig,
}

impl<H> DarknessPoller<H>
where
    H: HubApi + ?Sized + 'static,
{
    pub fn new(api: Arc<H>, target: Target, config: PollerConfig) -> Self {
        Self {
            api,
            device: target.device,
            signal: target.signal,
            config,
        }
    }

    /// Starts the loop on the tokio runtime and returns immediately.
    pub fn spawn(self) -> PollHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(self.run(cancel.clone()));
        PollHandle { task, cancel }
    }

    pub async fn run(mut self, cancel: CancellationToken) -> PollReport {
        let period = self.config.interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut state = PollState::new(self.config.retry_budget);
        tracing::info!(
            "⏱️ Polling device '{}' every {:?} (threshold {}, budget {})",
            self.device.id,
            period,
            self.config.threshold,
            self.config.retry_budget
        );

        let outcome = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Polling cancelled");
                    break PollOutcome::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            if let Some(outcome) = self.tick(&mut state).await {
                break outcome;
            }
        };

        // The timer goes away with the task on every exit path.
        drop(ticker);
        let report = state.into_report(outcome);
        tracing::info!(
            "🏁 Polling stopped: {:?} after {} ticks, {} signals sent",
            report.outcome,
            report.ticks,
            report.signals_sent
        );
        report
    }

    async fn tick(&mut self, state: &mut PollState) -> Option<PollOutcome> {
        if state.remaining == 0 {
            tracing::info!("Exceed counts");
            return Some(PollOutcome::Exhausted);
        }
        state.remaining -= 1;
        state.ticks += 1;

        if self.config.refresh_each_tick {
            match self.api.refresh_device(&self.device).await {
                Ok(device) => {
                    self.device = device;
                    state.consecutive_read_failures = 0;
                }
                Err(source) => {
                    let err = TickError::Refresh {
                        device_id: self.device.id.clone(),
                        source,
                    };
                    tracing::error!("{}", err);
                    state.read_failures += 1;
                    state.consecutive_read_failures += 1;

                    return match self.config.max_consecutive_read_failures {
                        Some(limit) if state.consecutive_read_failures >= limit => {
                            tracing::warn!("Giving up after {} failed reads in a row", limit);
                            Some(PollOutcome::ReadFailures)
                        }
                        _ => None,
                    };
                }
            }
        }

        let illumination = self.device.illumination();
        state.last_illumination = Some(illumination);
        tracing::info!("Illumination value : {}", illumination);

        if illumination < self.config.threshold {
            tracing::info!("🌙 A room gets dark");
            return Some(PollOutcome::Dark);
        }

        match self.api.send_signal(&self.signal).await {
            Ok(()) => {
                state.signals_sent += 1;
                tracing::debug!("Signal '{}' sent", self.signal.name);
            }
            Err(source) => {
                let err = TickError::Send {
                    signal_id: self.signal.id.clone(),
                    source,
                };
                tracing::error!("{}", err);
                state.send_failures += 1;
            }
        }
        None
    }
}

/// Spawns a [`DarknessPoller`] for `target`.
pub fn spawn_poller<H>(api: Arc<H>, target: Target, config: PollerConfig) -> PollHandle
where
    H: HubApi + ?Sized + 'static,
{
    DarknessPoller::new(api, target, config).spawn()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Appliance, SensorEvent};
    use crate::utils::error::{LightsOutError, Result};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;
    use std::time::Duration;

    const INTERVAL: Duration = Duration::from_secs(15);

    /// `None` in the script makes that refresh fail. The last entry repeats.
    struct ScriptedHub {
        readings: Mutex<VecDeque<Option<f64>>>,
        last: Mutex<Option<f64>>,
        refreshes: Mutex<u32>,
        sends: Mutex<u32>,
        fail_sends: bool,
    }

    impl ScriptedHub {
        fn new(readings: &[Option<f64>]) -> Self {
            Self {
                readings: Mutex::new(readings.iter().copied().collect()),
                last: Mutex::new(readings.last().copied().flatten()),
                refreshes: Mutex::new(0),
                sends: Mutex::new(0),
                fail_sends: false,
            }
        }

        fn failing_sends(mut self) -> Self {
            self.fail_sends = true;
            self
        }

        fn refreshes(&self) -> u32 {
            *self.refreshes.lock().unwrap()
        }

        fn sends(&self) -> u32 {
            *self.sends.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl HubApi for ScriptedHub {
        async fn list_devices(&self) -> Result<Vec<Device>> {
            Ok(vec![])
        }

        async fn list_appliances(&self) -> Result<Vec<Appliance>> {
            Ok(vec![])
        }

        async fn refresh_device(&self, device: &Device) -> Result<Device> {
            *self.refreshes.lock().unwrap() += 1;
            let next = self.readings.lock().unwrap().pop_front();
            let reading = match next {
                Some(reading) => reading,
                None => *self.last.lock().unwrap(),
            };
            match reading {
                Some(value) => Ok(device_with(&device.id, Some(value))),
                None => Err(scripted_failure("refresh")),
            }
        }

        async fn send_signal(&self, _signal: &Signal) -> Result<()> {
            *self.sends.lock().unwrap() += 1;
            if self.fail_sends {
                return Err(scripted_failure("send"));
            }
            Ok(())
        }
    }

    fn scripted_failure(call: &str) -> LightsOutError {
        std::io::Error::other(format!("scripted {call} failure")).into()
    }

    fn device_with(id: &str, illumination: Option<f64>) -> Device {
        let mut newest_events = HashMap::new();
        if let Some(value) = illumination {
            newest_events.insert(
                "il".to_string(),
                SensorEvent {
                    value,
                    created_at: None,
                },
            );
        }
        Device {
            id: id.to_string(),
            name: "Remo".to_string(),
            firmware_version: "Remo/1.0.62".to_string(),
            newest_events,
        }
    }

    fn target(initial: Option<f64>) -> Target {
        let signal = Signal {
            id: "sig-off".to_string(),
            name: "off".to_string(),
            image: String::new(),
        };
        Target {
            device: device_with("dev-1", initial),
            appliance: Appliance {
                id: "app-1".to_string(),
                nickname: "Light".to_string(),
                signals: vec![signal.clone()],
            },
            signal,
        }
    }

    fn config(threshold: f64, budget: u32) -> PollerConfig {
        PollerConfig::default()
            .with_threshold(threshold)
            .with_interval(INTERVAL)
            .with_retry_budget(budget)
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_room_gets_dark() {
        let hub = Arc::new(ScriptedHub::new(&[Some(120.0), Some(80.0), Some(15.0)]));
        let handle = spawn_poller(hub.clone(), target(Some(200.0)), config(50.0, 10));

        let report = handle.join().await.unwrap();

        assert_eq!(report.outcome, PollOutcome::Dark);
        assert_eq!(report.ticks, 3);
        assert_eq!(report.signals_sent, 2);
        assert_eq!(report.last_illumination, Some(15.0));
        assert_eq!(hub.sends(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_higher_threshold_stops_one_tick_earlier() {
        let hub = Arc::new(ScriptedHub::new(&[Some(120.0), Some(80.0), Some(15.0)]));
        let report = spawn_poller(hub.clone(), target(None), config(100.0, 10))
            .join()
            .await
            .unwrap();

        assert_eq!(report.outcome, PollOutcome::Dark);
        assert_eq!(report.ticks, 2);
        assert_eq!(report.signals_sent, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reading_equal_to_threshold_counts_as_bright() {
        let hub = Arc::new(ScriptedHub::new(&[Some(120.0), Some(100.0), Some(99.9)]));
        let report = spawn_poller(hub.clone(), target(None), config(100.0, 10))
            .join()
            .await
            .unwrap();

        assert_eq!(report.outcome, PollOutcome::Dark);
        assert_eq!(report.signals_sent, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_constant_brightness_exhausts_budget() {
        let hub = Arc::new(ScriptedHub::new(&[Some(150.0)]));
        let report = spawn_poller(hub.clone(), target(None), config(100.0, 10))
            .join()
            .await
            .unwrap();

        assert_eq!(report.outcome, PollOutcome::Exhausted);
        assert_eq!(report.ticks, 10);
        assert_eq!(report.signals_sent, 10);
        assert_eq!(hub.sends(), 10);
        assert_eq!(hub.refreshes(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_skips_tick_but_consumes_budget() {
        let hub = Arc::new(ScriptedHub::new(&[
            Some(150.0),
            Some(150.0),
            None,
            Some(150.0),
            Some(150.0),
        ]));
        let report = spawn_poller(hub.clone(), target(None), config(100.0, 5))
            .join()
            .await
            .unwrap();

        assert_eq!(report.outcome, PollOutcome::Exhausted);
        assert_eq!(report.ticks, 5);
        assert_eq!(report.read_failures, 1);
        assert_eq!(report.signals_sent, 4);
        assert_eq!(hub.sends(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failures_do_not_stop_the_loop() {
        let hub = Arc::new(ScriptedHub::new(&[Some(150.0), Some(150.0), Some(10.0)]).failing_sends());
        let report = spawn_poller(hub.clone(), target(None), config(100.0, 10))
            .join()
            .await
            .unwrap();

        assert_eq!(report.outcome, PollOutcome::Dark);
        assert_eq!(report.signals_sent, 0);
        assert_eq!(report.send_failures, 2);
        assert_eq!(hub.sends(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_reading_is_treated_as_dark() {
        let hub = Arc::new(ScriptedHub::new(&[Some(150.0)]));
        let report = spawn_poller(
            hub.clone(),
            target(None),
            config(50.0, 10).with_refresh_each_tick(false),
        )
        .join()
        .await
        .unwrap();

        assert_eq!(report.outcome, PollOutcome::Dark);
        assert_eq!(report.last_illumination, Some(0.0));
        assert_eq!(hub.refreshes(), 0);
        assert_eq!(hub.sends(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_snapshot_is_reused_without_refresh() {
        let hub = Arc::new(ScriptedHub::new(&[Some(0.0)]));
        let report = spawn_poller(
            hub.clone(),
            target(Some(150.0)),
            config(100.0, 3).with_refresh_each_tick(false),
        )
        .join()
        .await
        .unwrap();

        assert_eq!(report.outcome, PollOutcome::Exhausted);
        assert_eq!(report.signals_sent, 3);
        assert_eq!(hub.refreshes(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_read_failures_stop_when_limited() {
        let hub = Arc::new(ScriptedHub::new(&[Some(150.0), None, None, None]));
        let report = spawn_poller(
            hub.clone(),
            target(None),
            config(100.0, 10).with_max_consecutive_read_failures(Some(3)),
        )
        .join()
        .await
        .unwrap();

        assert_eq!(report.outcome, PollOutcome::ReadFailures);
        assert_eq!(report.ticks, 4);
        assert_eq!(report.read_failures, 3);
        assert_eq!(report.signals_sent, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_waits_one_interval() {
        let hub = Arc::new(ScriptedHub::new(&[Some(150.0)]));
        let handle = spawn_poller(hub.clone(), target(None), config(100.0, 10));

        tokio::time::sleep(INTERVAL - Duration::from_millis(1)).await;
        assert_eq!(hub.refreshes(), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(hub.refreshes(), 1);

        handle.cancel();
        let report = handle.join().await.unwrap();
        assert_eq!(report.outcome, PollOutcome::Cancelled);
        assert_eq!(report.ticks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_token_stops_task() {
        let hub = Arc::new(ScriptedHub::new(&[Some(150.0)]));
        let handle = spawn_poller(hub.clone(), target(None), config(100.0, 10));
        let token = handle.cancellation_token();

        tokio::time::sleep(INTERVAL * 3 + Duration::from_millis(1)).await;
        token.cancel();

        let report = handle.join().await.unwrap();
        assert_eq!(report.outcome, PollOutcome::Cancelled);
        assert_eq!(report.ticks, 3);
        assert_eq!(hub.sends(), 3);
    }
}
