use crate::config::PollerConfig;
use crate::domain::model::{Appliance, Device, Signal, Target};
use crate::domain::ports::HubApi;
use crate::utils::error::{ResolveError, Result};

/// Locates the sensor device and the appliance signal the poller will drive.
///
/// Ties are broken by policy: the first capable device wins, while the last
/// appliance and the last signal with a matching name win.
pub async fn resolve<H>(api: &H, config: &PollerConfig) -> Result<Target>
where
    H: HubApi + ?Sized,
{
    let devices = api.list_devices().await?;
    tracing::info!("Num devices : {}", devices.len());
    let device = select_device(devices, config)?;
    tracing::info!(
        "📡 Using device '{}' ({}, firmware {})",
        device.name,
        device.id,
        device.firmware_version
    );

    let appliances = api.list_appliances().await?;
    tracing::info!("Num appliances : {}", appliances.len());
    let appliance = select_appliance(appliances, &config.appliance_name)?;
    let signal = select_signal(&appliance, &config.signal_name)?;
    tracing::info!(
        "💡 Using signal '{}' ({}) of appliance '{}'",
        signal.name,
        signal.id,
        appliance.nickname
    );

    Ok(Target {
        device,
        appliance,
        signal,
    })
}

pub fn select_device(devices: Vec<Device>, config: &PollerConfig) -> Result<Device> {
    if !config.firmware_mini_filter_enabled {
        return devices
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NoDevicesFound.into());
    }

    if devices.is_empty() {
        return Err(ResolveError::NoDevicesFound.into());
    }

    let marker = config.mini_firmware_marker.as_str();
    devices
        .into_iter()
        .find(|device| {
            let limited = device.firmware_contains(marker);
            if limited {
                tracing::warn!(
                    "Skipping device '{}': firmware {} does not support illumination value",
                    device.id,
                    device.firmware_version
                );
            }
            !limited
        })
        .ok_or_else(|| {
            ResolveError::NoCapableDeviceFound {
                marker: marker.to_string(),
            }
            .into()
        })
}

pub fn select_appliance(appliances: Vec<Appliance>, nickname: &str) -> Result<Appliance> {
    if appliances.is_empty() {
        return Err(ResolveError::NoAppliancesFound.into());
    }

    appliances
        .into_iter()
        .rev()
        .find(|appliance| appliance.nickname == nickname)
        .ok_or_else(|| {
            ResolveError::ApplianceNotFound {
                nickname: nickname.to_string(),
            }
            .into()
        })
}

pub fn select_signal(appliance: &Appliance, name: &str) -> Result<Signal> {
    appliance
        .signals
        .iter()
        .rev()
        .find(|signal| signal.name == name)
        .cloned()
        .ok_or_else(|| {
            ResolveError::SignalNotFound {
                appliance: appliance.nickname.clone(),
                signal: name.to_string(),
            }
            .into()
        })
}
