//! One wake of the appliance, from boot to the sleep hand-off
//!
//! ```text
//! Boot ─► Connecting ─┬─► SyncingTime ─► Fetching ─► Rendering ─► Sleeping
//!                     └───────────── portal timeout ─┘
//! ```
//!
//! Every path ends in exactly one render followed by sleep. Nothing carries
//! over to the next wake except what the settings store persisted.

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::info;

use crate::app_state::WakePhase;
use crate::config::{Settings, SettingsStorage, SettingsStore};
use crate::connectivity::{
    ConnectivityManager, ConnectivityOutcome, NetworkLink, PORTAL_TIMEOUT, ProvisioningPortal,
};
use crate::mode::Mode;
use crate::power::{DeepSleep, PowerCycleController, compute_sleep_microseconds};
use crate::render::{Acquisition, RenderDispatcher, RenderError, Renderer, ViewModel};
use crate::time_sync::{NetworkClock, TimeSync, Timestamp};
use crate::weather::{HttpClient, WeatherClient};

/// Upper bound on phases visited in one wake
const MAX_PHASES: usize = 6;

/// What a wake did, for logging and tests
#[derive(Debug, Clone, PartialEq)]
pub struct WakeReport {
    pub view: ViewModel,
    /// `None` when connectivity failed before a mode was chosen
    pub mode: Option<Mode>,
    pub synced_at: Option<Timestamp>,
    pub render: Result<(), RenderError>,
    pub sleep_micros: u64,
    pub phases: heapless::Vec<WakePhase, MAX_PHASES>,
}

pub struct WakeCycle<S, L, P, C, D, H, R> {
    store: SettingsStore<S>,
    connectivity: ConnectivityManager<L, P>,
    clock: C,
    delay: D,
    weather: WeatherClient<H>,
    renderer: R,
    time_sync: TimeSync,
    portal_timeout: Duration,
    phases: heapless::Vec<WakePhase, MAX_PHASES>,
}

impl<S, L, P, C, D, H, R> WakeCycle<S, L, P, C, D, H, R>
where
    S: SettingsStorage,
    L: NetworkLink,
    P: ProvisioningPortal,
    C: NetworkClock,
    D: DelayNs,
    H: HttpClient,
    R: Renderer,
{
    pub fn new(
        store: SettingsStore<S>,
        connectivity: ConnectivityManager<L, P>,
        clock: C,
        delay: D,
        weather: WeatherClient<H>,
        renderer: R,
    ) -> Self {
        Self {
            store,
            connectivity,
            clock,
            delay,
            weather,
            renderer,
            time_sync: TimeSync::new(),
            portal_timeout: PORTAL_TIMEOUT,
            phases: heapless::Vec::new(),
        }
    }

    pub fn with_portal_timeout(mut self, timeout: Duration) -> Self {
        self.portal_timeout = timeout;
        self
    }

    fn enter(&mut self, phase: WakePhase) {
        info!("Wake phase: {}", phase.label());
        // Each phase is entered at most once per wake
        let _ = self.phases.push(phase);
    }

    /// Run one full cycle up to, but not including, the suspend.
    pub async fn run(&mut self) -> WakeReport {
        self.phases.clear();
        self.enter(WakePhase::Boot);
        let stored = self.store.load().await;

        self.enter(WakePhase::Connecting);
        let outcome = self
            .connectivity
            .ensure_connected(stored.clone(), self.portal_timeout, &mut self.store)
            .await;

        let (settings, mode, synced_at, acquisition) = match outcome {
            ConnectivityOutcome::PortalTimeout => (stored, None, None, Acquisition::NoConnectivity),
            ConnectivityOutcome::Connected(settings) => {
                let (mode, now, acquisition) = self.acquire(&settings).await;
                (settings, Some(mode), now, acquisition)
            }
        };

        self.enter(WakePhase::Rendering);
        let view = RenderDispatcher::dispatch(&settings, acquisition);
        let render = RenderDispatcher::present(&mut self.renderer, &view);

        self.enter(WakePhase::Sleeping);
        WakeReport {
            view,
            mode,
            synced_at,
            render,
            sleep_micros: compute_sleep_microseconds(settings.update_interval_hours),
            phases: self.phases.clone(),
        }
    }

    async fn acquire(&mut self, settings: &Settings) -> (Mode, Option<Timestamp>, Acquisition) {
        self.enter(WakePhase::SyncingTime);
        let now = self
            .time_sync
            .sync(&mut self.clock, &mut self.delay)
            .await
            .timestamp();

        let mode = Mode::select(now, settings);
        info!("Mode: {:?}", mode);

        self.enter(WakePhase::Fetching);
        let current = self.weather.fetch_current(settings, now).await;
        let acquisition = match mode {
            Mode::Day => Acquisition::Day { current },
            Mode::Night => {
                let forecast = self.weather.fetch_forecast(settings).await;
                Acquisition::Night { current, forecast }
            }
        };

        (mode, now, acquisition)
    }

    /// Run one cycle and suspend. Execution resumes at the next boot.
    pub async fn run_to_sleep<Z: DeepSleep>(mut self, power: &mut PowerCycleController<Z>) -> ! {
        let report = self.run().await;
        power.suspend_for(report.sleep_micros)
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn store(&self) -> &SettingsStore<S> {
        &self.store
    }

    pub fn weather(&self) -> &WeatherClient<H> {
        &self.weather
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_state::FromTruncated;
    use crate::config::{FieldString, MemoryStorage};
    use crate::connectivity::{LinkError, PortalError, PortalForm, PortalSubmission};
    use crate::icons::IconFamily;
    use crate::time_sync::ClockError;
    use crate::weather::{HttpResponse, TransportError};
    use alloc::string::{String, ToString};
    use alloc::vec::Vec;
    use embassy_futures::block_on;

    // 2025-01-01T10:00Z and 20:00Z, i.e. 12:00 and 22:00 at the default +2h
    const NOON_LOCAL: u64 = 1_735_725_600;
    const TEN_PM_LOCAL: u64 = 1_735_761_600;

    const CURRENT: &str = r#"{"weather":[{"id":800,"main":"Clear","description":"clear sky","icon":"01d"}],
        "main":{"temp":24.5,"feels_like":23.0,"temp_min":20.0,"temp_max":27.0}}"#;
    const FORECAST: &str = r#"{"list":[{"main":{"temp_min":14.0,"temp_max":16.5},
        "weather":[{"id":500,"main":"Rain","icon":"10n"}]}]}"#;

    struct Link(Result<(), LinkError>);

    impl NetworkLink for Link {
        async fn connect(&mut self) -> Result<(), LinkError> {
            self.0
        }
    }

    enum Portal {
        Accept(&'static str, &'static str),
        Hang,
        Unused,
    }

    impl ProvisioningPortal for Portal {
        async fn serve(&mut self, _form: &PortalForm) -> Result<PortalSubmission, PortalError> {
            match self {
                Portal::Accept(key, city) => Ok(PortalSubmission {
                    api_key: key.to_string(),
                    city: city.to_string(),
                }),
                Portal::Hang => core::future::pending().await,
                Portal::Unused => panic!("portal opened while the link was up"),
            }
        }
    }

    struct Clock {
        now: u64,
    }

    impl Clock {
        fn at(now: u64) -> Self {
            Self { now }
        }
    }

    impl NetworkClock for Clock {
        async fn start_sync(&mut self) -> Result<(), ClockError> {
            Ok(())
        }

        fn now_unix(&mut self) -> u64 {
            self.now
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    /// Answers by endpoint, records every URL
    struct Api {
        current: Result<&'static str, u16>,
        forecast: Result<&'static str, u16>,
        urls: Vec<String>,
    }

    impl Api {
        fn healthy() -> Self {
            Self {
                current: Ok(CURRENT),
                forecast: Ok(FORECAST),
                urls: Vec::new(),
            }
        }
    }

    impl HttpClient for Api {
        async fn get(&mut self, url: &str) -> Result<HttpResponse, TransportError> {
            self.urls.push(url.to_string());
            let answer = if url.contains("/forecast") {
                self.forecast
            } else {
                self.current
            };
            Ok(match answer {
                Ok(body) => HttpResponse { status: 200, body: body.as_bytes().to_vec() },
                Err(status) => HttpResponse { status, body: Vec::new() },
            })
        }
    }

    #[derive(Default)]
    struct Screen {
        presented: Vec<ViewModel>,
        broken: bool,
    }

    impl Renderer for Screen {
        fn present(&mut self, view: &ViewModel) -> Result<(), RenderError> {
            self.presented.push(view.clone());
            if self.broken { Err(RenderError::Panel) } else { Ok(()) }
        }
    }

    fn provisioned_store() -> SettingsStore<MemoryStorage> {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let settings = Settings {
            api_key: FieldString::from_truncated("KEY"),
            ..Settings::default()
        };
        block_on(store.save(&settings)).unwrap();
        store
    }

    type TestCycle = WakeCycle<MemoryStorage, Link, Portal, Clock, NoDelay, Api, Screen>;

    fn cycle(store: SettingsStore<MemoryStorage>, link: Link, portal: Portal, clock: Clock, api: Api) -> TestCycle {
        WakeCycle::new(
            store,
            ConnectivityManager::new(link, portal),
            clock,
            NoDelay,
            WeatherClient::new(api),
            Screen::default(),
        )
        .with_portal_timeout(Duration::from_millis(50))
    }

    fn all_phases() -> [WakePhase; 6] {
        [
            WakePhase::Boot,
            WakePhase::Connecting,
            WakePhase::SyncingTime,
            WakePhase::Fetching,
            WakePhase::Rendering,
            WakePhase::Sleeping,
        ]
    }

    #[test]
    fn daytime_wake_shows_day_detail() {
        let mut wake = cycle(
            provisioned_store(),
            Link(Ok(())),
            Portal::Unused,
            Clock::at(NOON_LOCAL),
            Api::healthy(),
        );
        let report = block_on(wake.run());

        assert_eq!(report.mode, Some(Mode::Day));
        assert_eq!(report.phases.as_slice(), all_phases());
        assert_eq!(report.sleep_micros, 43_200_000_000);
        assert_eq!(report.render, Ok(()));

        let ViewModel::DayDetail(view) = &report.view else {
            panic!("expected DayDetailView, got {}", report.view.name());
        };
        assert_eq!(view.temp, Some(24.5));
        assert_eq!(view.icon, IconFamily::Clear);
        assert_eq!(alloc::format!("{}", view.updated.unwrap()), "12:00");

        // Day mode issues the current request only
        assert_eq!(wake.weather().urls().len(), 1);
        assert_eq!(wake.renderer().presented, [report.view.clone()]);
    }

    #[test]
    fn night_wake_fetches_both_and_splits() {
        let mut wake = cycle(
            provisioned_store(),
            Link(Ok(())),
            Portal::Unused,
            Clock::at(TEN_PM_LOCAL),
            Api::healthy(),
        );
        let report = block_on(wake.run());

        assert_eq!(report.mode, Some(Mode::Night));
        let ViewModel::NightSplit(view) = &report.view else {
            panic!("expected NightSplitView, got {}", report.view.name());
        };
        assert_eq!(view.next.icon, IconFamily::Rain);

        let urls = wake.weather().urls();
        assert_eq!(urls.len(), 2);
        assert!(urls[0].contains("/weather?"), "current is fetched first");
        assert!(urls[1].contains("/forecast?"));
    }

    #[test]
    fn night_forecast_failure_falls_back_to_day_detail() {
        let mut api = Api::healthy();
        api.forecast = Err(500);
        let mut wake = cycle(provisioned_store(), Link(Ok(())), Portal::Unused, Clock::at(TEN_PM_LOCAL), api);

        let report = block_on(wake.run());
        assert!(matches!(report.view, ViewModel::DayDetail(_)));
    }

    #[test]
    fn night_current_failure_still_attempts_forecast() {
        let mut api = Api::healthy();
        api.current = Err(401);
        let mut wake = cycle(provisioned_store(), Link(Ok(())), Portal::Unused, Clock::at(TEN_PM_LOCAL), api);

        let report = block_on(wake.run());
        assert!(matches!(report.view, ViewModel::Error(_)));
        assert_eq!(wake.weather().urls().len(), 2);
    }

    #[test]
    fn portal_timeout_skips_straight_to_no_wifi() {
        let mut wake = cycle(
            provisioned_store(),
            Link(Err(LinkError::Association)),
            Portal::Hang,
            Clock::at(NOON_LOCAL),
            Api::healthy(),
        );

        let report = block_on(wake.run());
        assert!(matches!(report.view, ViewModel::NoWifi(_)));
        assert_eq!(report.mode, None);
        assert_eq!(
            report.phases.as_slice(),
            [WakePhase::Boot, WakePhase::Connecting, WakePhase::Rendering, WakePhase::Sleeping]
        );
        assert!(wake.weather().urls().is_empty());
        assert_eq!(wake.renderer().presented.len(), 1);
        // Sleep still follows the stored interval
        assert_eq!(report.sleep_micros, 43_200_000_000);
    }

    #[test]
    fn unsynced_clock_defaults_to_day() {
        let mut wake = cycle(provisioned_store(), Link(Ok(())), Portal::Unused, Clock::at(42), Api::healthy());

        let report = block_on(wake.run());
        assert_eq!(report.synced_at, None);
        assert_eq!(report.mode, Some(Mode::Day));
        let ViewModel::DayDetail(view) = &report.view else {
            panic!("expected DayDetailView");
        };
        assert_eq!(view.updated, None);
    }

    #[test]
    fn provisioned_key_is_used_and_persisted() {
        let store = SettingsStore::new(MemoryStorage::new());
        let mut wake = cycle(
            store,
            Link(Err(LinkError::NoCredentials)),
            Portal::Accept(" fresh-key ", ""),
            Clock::at(NOON_LOCAL),
            Api::healthy(),
        );

        let report = block_on(wake.run());
        assert!(matches!(report.view, ViewModel::DayDetail(_)));
        assert!(wake.weather().urls()[0].contains("appid=fresh-key&"));
        assert_eq!(wake.store().storage().write_count(), 1);
    }

    #[test]
    fn missing_key_renders_error_without_requests() {
        let mut wake = cycle(
            SettingsStore::new(MemoryStorage::new()),
            Link(Ok(())),
            Portal::Unused,
            Clock::at(NOON_LOCAL),
            Api::healthy(),
        );

        let report = block_on(wake.run());
        assert!(matches!(report.view, ViewModel::Error(_)));
        assert!(wake.weather().urls().is_empty());
    }

    #[test]
    fn render_failure_still_reaches_sleep() {
        let mut store = SettingsStore::new(MemoryStorage::new());
        let settings = Settings {
            api_key: FieldString::from_truncated("KEY"),
            update_interval_hours: 3,
            ..Settings::default()
        };
        block_on(store.save(&settings)).unwrap();

        let mut wake = cycle(store, Link(Ok(())), Portal::Unused, Clock::at(NOON_LOCAL), Api::healthy());
        wake.renderer.broken = true;

        let report = block_on(wake.run());
        assert_eq!(report.render, Err(RenderError::Panel));
        assert_eq!(report.phases.last(), Some(&WakePhase::Sleeping));
        assert_eq!(report.sleep_micros, 3 * 3_600_000_000);
        assert_eq!(wake.renderer().presented.len(), 1);
    }

    impl WeatherClient<Api> {
        fn urls(&self) -> &[String] {
            &self.http().urls
        }
    }
}
