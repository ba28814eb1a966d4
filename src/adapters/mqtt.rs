//! Backend uplink over MQTT (Azure IoT Hub device endpoint).
//!
//! ```text
//!  ┌───────────────┐  OUTBOX   ┌──────────────────────────────────────┐
//!  │ control loop  │ ────────▶ │ uplink thread (edge-executor)        │
//!  │  AppService   │           │  ├─ pump:       OUTBOX → publish     │
//!  │               │ ◀──────── │  └─ supervisor: WiFi + subscription  │
//!  └───────────────┘  INBOX    ├──────────────────────────────────────┤
//!         ▲                    │ mqtt-rx thread: conn.next() loop     │
//!         └── LINK_UP ──────── │  method calls → route_method_call    │
//!                              └──────────────────────────────────────┘
//! ```
//!
//! The control loop never blocks on the network: it only touches the
//! bounded channels and the [`LINK_UP`] flag.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF WiFi STA, SNTP and `EspMqttClient`.
//! - **all other targets**: only the link bookkeeping below, for tests.
//!
//! ## Reconnection policy
//!
//! WiFi association is retried with exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s).  The MQTT client reconnects on its own; the
//! method subscription is renewed after every (re)connect.

use core::sync::atomic::{AtomicBool, Ordering};

/// Broker session is up.  Written by the rx thread, read by the control loop.
pub static LINK_UP: AtomicBool = AtomicBool::new(false);

/// Set on every (re)connect; the supervisor renews the subscription.
static NEEDS_SUBSCRIBE: AtomicBool = AtomicBool::new(false);

const MIN_BACKOFF_SECS: u32 = 2;
const MAX_BACKOFF_SECS: u32 = 60;

// ───────────────────────────────────────────────────────────────
// Settings
// ───────────────────────────────────────────────────────────────

/// Credentials and endpoint, baked in at build time.
///
/// `FEEDER_WIFI_SSID`, `FEEDER_WIFI_PASS`, `FEEDER_MQTT_URL`,
/// `FEEDER_MQTT_USER` and `FEEDER_MQTT_PASS` (the SAS token) are read from
/// the build environment.
#[derive(Debug, Clone, Copy)]
pub struct NetworkSettings {
    pub wifi_ssid: &'static str,
    pub wifi_pass: &'static str,
    /// e.g. `mqtts://my-hub.azure-devices.net:8883`
    pub broker_url: &'static str,
    pub username: &'static str,
    pub password: &'static str,
}

impl NetworkSettings {
    pub fn from_build_env() -> Self {
        Self {
            wifi_ssid: option_env!("FEEDER_WIFI_SSID").unwrap_or(""),
            wifi_pass: option_env!("FEEDER_WIFI_PASS").unwrap_or(""),
            broker_url: option_env!("FEEDER_MQTT_URL").unwrap_or(""),
            username: option_env!("FEEDER_MQTT_USER").unwrap_or(""),
            password: option_env!("FEEDER_MQTT_PASS").unwrap_or(""),
        }
    }

    /// Enough to attempt a connection.  Username/password may be empty.
    pub fn is_complete(&self) -> bool {
        !self.wifi_ssid.is_empty() && !self.broker_url.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Link bookkeeping (all targets)
// ───────────────────────────────────────────────────────────────

/// Record a broker connect or disconnect.
pub fn set_link(up: bool) {
    let was = LINK_UP.swap(up, Ordering::AcqRel);
    if up && !was {
        NEEDS_SUBSCRIBE.store(true, Ordering::Release);
    }
}

/// Control-loop side edge detector over [`LINK_UP`].
pub struct LinkMonitor {
    last: bool,
}

impl LinkMonitor {
    pub fn new() -> Self {
        Self { last: false }
    }

    /// `Some(state)` when the link changed since the previous call.
    pub fn poll(&mut self) -> Option<bool> {
        let now = LINK_UP.load(Ordering::Acquire);
        if now == self.last {
            return None;
        }
        self.last = now;
        Some(now)
    }
}

impl Default for LinkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Exponential reconnect delay.
#[derive(Debug, Clone, Copy)]
pub struct ReconnectBackoff {
    secs: u32,
}

impl ReconnectBackoff {
    pub fn new() -> Self {
        Self {
            secs: MIN_BACKOFF_SECS,
        }
    }

    /// Delay before the next attempt; doubles each call up to the cap.
    pub fn next_delay_secs(&mut self) -> u32 {
        let d = self.secs;
        self.secs = (self.secs * 2).min(MAX_BACKOFF_SECS);
        d
    }

    pub fn reset(&mut self) {
        self.secs = MIN_BACKOFF_SECS;
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF implementation
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub use esp::start;

#[cfg(target_os = "espidf")]
mod esp {
    use core::sync::atomic::Ordering;
    use core::time::Duration;
    use std::sync::{Arc, Mutex};
    use std::thread;

    use anyhow::{anyhow, Context};
    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::modem::Modem;
    use esp_idf_svc::mqtt::client::{
        Details, EspMqttClient, EspMqttConnection, EventPayload, MqttClientConfiguration, QoS,
    };
    use esp_idf_svc::nvs::EspDefaultNvsPartition;
    use esp_idf_svc::sntp::EspSntp;
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
    use log::{info, warn};

    use super::{set_link, NetworkSettings, ReconnectBackoff, NEEDS_SUBSCRIBE};
    use crate::error::{CommsError, Error};
    use crate::remote::{route_method_call, INBOX, METHODS_FILTER};
    use crate::telemetry::{pump, MessagePublisher, OUTBOX};

    type SharedClient = Arc<Mutex<EspMqttClient<'static>>>;
    type Wifi = BlockingWifi<EspWifi<'static>>;

    struct MqttPublisher {
        client: SharedClient,
    }

    impl MessagePublisher for MqttPublisher {
        fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
            if !super::LINK_UP.load(Ordering::Acquire) {
                return Err(CommsError::MqttPublishFailed);
            }
            let mut client = self.client.lock().map_err(|_| CommsError::MqttPublishFailed)?;
            client
                .publish(topic, QoS::AtLeastOnce, false, payload)
                .map(|_| ())
                .map_err(|_| CommsError::MqttPublishFailed)
        }
    }

    /// Bring up WiFi, SNTP and the broker session, then spawn the
    /// network threads.  Returns once the threads are running.
    pub fn start(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        settings: NetworkSettings,
        client_id: &str,
    ) -> anyhow::Result<()> {
        if !settings.is_complete() {
            return Err(anyhow!("network settings missing at build time"));
        }

        let wifi = connect_wifi(modem, sys_loop, nvs, &settings)?;
        let sntp = EspSntp::new_default().context("failed to start SNTP")?;
        info!("Uplink: SNTP started");

        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            username: (!settings.username.is_empty()).then_some(settings.username),
            password: (!settings.password.is_empty()).then_some(settings.password),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            keep_alive_interval: Some(Duration::from_secs(60)),
            ..Default::default()
        };
        let (client, conn) = EspMqttClient::new(settings.broker_url, &conf)
            .map_err(|_| Error::from(CommsError::MqttConnectFailed))?;
        let client: SharedClient = Arc::new(Mutex::new(client));
        info!("Uplink: MQTT client created for {}", settings.broker_url);

        spawn_receiver(conn)?;
        spawn_uplink(client, wifi, sntp, settings)?;
        Ok(())
    }

    fn connect_wifi(
        modem: Modem,
        sys_loop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
        settings: &NetworkSettings,
    ) -> anyhow::Result<Wifi> {
        let esp_wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sys_loop)?;

        let auth_method = if settings.wifi_pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: settings
                .wifi_ssid
                .try_into()
                .map_err(|_| anyhow!("wifi ssid too long"))?,
            password: settings
                .wifi_pass
                .try_into()
                .map_err(|_| anyhow!("wifi password too long"))?,
            auth_method,
            ..Default::default()
        }))?;
        wifi.start()?;

        // First association is attempted here; failures are retried by
        // the supervisor so the feeder still runs offline.
        match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
            Ok(()) => info!("Uplink: WiFi connected to '{}'", settings.wifi_ssid),
            Err(e) => warn!("Uplink: WiFi connect failed ({}), retrying in background", e),
        }
        Ok(wifi)
    }

    fn spawn_receiver(mut conn: EspMqttConnection) -> anyhow::Result<()> {
        thread::Builder::new()
            .name("mqtt-rx".into())
            .stack_size(8 * 1024)
            .spawn(move || {
                loop {
                    match conn.next() {
                        Ok(event) => match event.payload() {
                            EventPayload::Connected(_) => {
                                info!("Uplink: broker connected");
                                set_link(true);
                            }
                            EventPayload::Disconnected => {
                                warn!("Uplink: broker disconnected");
                                set_link(false);
                            }
                            EventPayload::Received {
                                topic: Some(topic),
                                details,
                                ..
                            } => {
                                if !matches!(details, Details::Complete) {
                                    continue;
                                }
                                if let Err(e) = route_method_call(topic, &INBOX, &OUTBOX) {
                                    warn!("Uplink: method call on '{}' dropped: {}", topic, e);
                                }
                            }
                            _ => {}
                        },
                        Err(e) => {
                            warn!("Uplink: receive loop ended: {:?}", e);
                            set_link(false);
                            break;
                        }
                    }
                }
            })?;
        Ok(())
    }

    fn spawn_uplink(
        client: SharedClient,
        wifi: Wifi,
        sntp: EspSntp<'static>,
        settings: NetworkSettings,
    ) -> anyhow::Result<()> {
        thread::Builder::new()
            .name("uplink".into())
            .stack_size(12 * 1024)
            .spawn(move || {
                let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

                let mut publisher = MqttPublisher {
                    client: client.clone(),
                };
                executor
                    .spawn(async move { pump(&OUTBOX, &mut publisher).await })
                    .detach();
                executor
                    .spawn(supervise(client, wifi, sntp, settings))
                    .detach();

                info!("Uplink task started");
                futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
            })?;
        Ok(())
    }

    /// Keeps WiFi associated and the method subscription current.
    async fn supervise(client: SharedClient, mut wifi: Wifi, _sntp: EspSntp<'static>, settings: NetworkSettings) {
        let mut backoff = ReconnectBackoff::new();
        loop {
            if !wifi.is_connected().unwrap_or(false) {
                set_link(false);
                let delay = backoff.next_delay_secs();
                match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
                    Ok(()) => {
                        info!("Uplink: WiFi re-associated with '{}'", settings.wifi_ssid);
                        backoff.reset();
                    }
                    Err(e) => {
                        warn!("Uplink: WiFi reconnect failed ({}), next try in {}s", e, delay);
                        async_io_mini::Timer::after(Duration::from_secs(u64::from(delay))).await;
                        continue;
                    }
                }
            }

            if NEEDS_SUBSCRIBE.swap(false, Ordering::AcqRel) {
                let result = client
                    .lock()
                    .map_err(|_| CommsError::MqttSubscribeFailed)
                    .and_then(|mut c| {
                        c.subscribe(METHODS_FILTER, QoS::AtMostOnce)
                            .map_err(|_| CommsError::MqttSubscribeFailed)
                    });
                match result {
                    Ok(_) => info!("Uplink: subscribed to {}", METHODS_FILTER),
                    Err(e) => {
                        warn!("Uplink: {}", e);
                        NEEDS_SUBSCRIBE.store(true, Ordering::Release);
                    }
                }
            }

            async_io_mini::Timer::after(Duration::from_secs(1)).await;
        }
    }
}
