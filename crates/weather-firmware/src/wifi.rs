//! Wi-Fi station bring-up and the background tasks that keep it up

use embassy_executor::Spawner;
use embassy_net::{Runner, Stack, StackResources};
use embassy_time::{Duration, Timer};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::wifi::{
    ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent, WifiStaState,
};
use log::{error, info, warn};
use static_cell::StaticCell;

const RECONNECT_DELAY: Duration = Duration::from_millis(5_000);

/// Sockets: DHCP, DNS and one TCP connection at a time, plus headroom.
const SOCKET_COUNT: usize = 4;

/// Start the radio, the network stack and the tasks that drive them.
///
/// Returns immediately; the link comes up in the background and
/// reconnects on its own after a drop.
pub fn start(
    spawner: Spawner,
    wifi: WIFI<'static>,
    ssid: &'static str,
    password: &'static str,
) -> Stack<'static> {
    static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static RESOURCES: StaticCell<StackResources<SOCKET_COUNT>> = StaticCell::new();

    let radio = RADIO.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));
    let (controller, interfaces) = esp_radio::wifi::new(radio, wifi, Default::default())
        .expect("Failed to initialize Wi-Fi controller");

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());

    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        RESOURCES.init(StackResources::new()),
        seed,
    );

    if let Err(e) = spawner.spawn(connection(controller, ssid, password)) {
        error!("Failed to spawn Wi-Fi task: {:?}", e);
    }
    if let Err(e) = spawner.spawn(net_task(runner)) {
        error!("Failed to spawn network task: {:?}", e);
    }

    stack
}

#[embassy_executor::task]
async fn connection(
    mut controller: WifiController<'static>,
    ssid: &'static str,
    password: &'static str,
) {
    loop {
        if esp_radio::wifi::sta_state() == WifiStaState::Connected {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            warn!("Wi-Fi disconnected");
            Timer::after(RECONNECT_DELAY).await;
        }

        if !matches!(controller.is_started(), Ok(true)) {
            let config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(ssid.into())
                    .with_password(password.into()),
            );
            if let Err(e) = controller.set_config(&config) {
                error!("Wi-Fi configuration rejected: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
            info!("Starting Wi-Fi");
            if let Err(e) = controller.start_async().await {
                error!("Wi-Fi start failed: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
        }

        info!("Connecting to {}", ssid);
        match controller.connect_async().await {
            Ok(()) => info!("Wi-Fi connected"),
            Err(e) => {
                warn!("Wi-Fi connect failed: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
            }
        }
    }
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
