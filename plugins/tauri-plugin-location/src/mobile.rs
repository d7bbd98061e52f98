//! Android-specific implementation using Tauri's mobile plugin system
//!
//! The Kotlin side wraps `LocationManager`. Live updates and provider
//! callbacks come back over a channel opened per subscription, tagged with
//! the session id so `removeUpdates` can drop all of a session's listeners.

use location_bridge::location::{
    Fix, LocationSource, PermissionStatus, Provider, SessionEvents, SourceEvent,
};
use location_bridge::LocationError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tauri::ipc::{Channel, InvokeResponseBody};
use tauri::plugin::{PermissionState, PluginApi, PluginHandle};
use tauri::Runtime;

const PLUGIN_IDENTIFIER: &str = "io.kristal.location";

/// Empty response for commands that return JSObject() from Kotlin
#[derive(Deserialize)]
struct EmptyResponse {}

#[derive(Deserialize)]
struct ProvidersResponse {
    providers: Vec<String>,
}

#[derive(Deserialize)]
struct PermissionResponse {
    location: PermissionState,
}

#[derive(Deserialize)]
struct LastKnownResponse {
    #[serde(default)]
    location: Option<Fix>,
}

#[derive(Serialize)]
struct PermissionArgs {
    permissions: Vec<&'static str>,
}

#[derive(Serialize)]
struct ProviderArgs {
    provider: &'static str,
}

#[derive(Serialize)]
struct SubscribeArgs {
    id: u64,
    provider: &'static str,
    interval: u64,
    channel: Channel,
}

#[derive(Serialize)]
struct UnsubscribeArgs {
    id: u64,
}

/// Location source backed by the Android `LocationPlugin`
pub struct AndroidLocationSource<R: Runtime> {
    handle: Arc<PluginHandle<R>>,
}

impl<R: Runtime> AndroidLocationSource<R> {
    pub fn register<C: DeserializeOwned>(
        api: PluginApi<R, C>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let handle = api.register_android_plugin(PLUGIN_IDENTIFIER, "LocationPlugin")?;
        Ok(Self {
            handle: Arc::new(handle),
        })
    }
}

fn permission_status(state: &PermissionState) -> PermissionStatus {
    match state {
        PermissionState::Granted => PermissionStatus::Granted,
        PermissionState::Denied => PermissionStatus::Denied,
        _ => PermissionStatus::Prompt,
    }
}

impl<R: Runtime> LocationSource for AndroidLocationSource<R> {
    fn enabled_providers(&self) -> Vec<Provider> {
        match self
            .handle
            .run_mobile_plugin::<ProvidersResponse>("enabledProviders", ())
        {
            Ok(response) => response
                .providers
                .iter()
                .filter_map(|name| name.parse().ok())
                .collect(),
            Err(e) => {
                log::error!("Failed to query enabled providers: {}", e);
                Vec::new()
            }
        }
    }

    fn check_permission(&self) -> PermissionStatus {
        match self
            .handle
            .run_mobile_plugin::<PermissionResponse>("checkPermissions", ())
        {
            Ok(response) => permission_status(&response.location),
            Err(e) => {
                log::error!("Failed to check location permission: {}", e);
                PermissionStatus::Denied
            }
        }
    }

    fn request_permission(&self, events: SessionEvents) {
        let handle = self.handle.clone();
        // The prompt blocks until the user answers
        tauri::async_runtime::spawn_blocking(move || {
            let granted = match handle.run_mobile_plugin::<PermissionResponse>(
                "requestPermissions",
                PermissionArgs {
                    permissions: vec!["location"],
                },
            ) {
                Ok(response) => {
                    permission_status(&response.location) == PermissionStatus::Granted
                }
                Err(e) => {
                    log::error!("Failed to request location permission: {}", e);
                    false
                }
            };
            events.on_permission_result(granted);
        });
    }

    fn last_known_fix(&self, provider: Provider) -> Option<Fix> {
        match self.handle.run_mobile_plugin::<LastKnownResponse>(
            "lastKnownLocation",
            ProviderArgs {
                provider: provider.as_str(),
            },
        ) {
            Ok(response) => response.location.map(|mut fix| {
                fix.provider.get_or_insert_with(|| provider.as_str().to_string());
                fix
            }),
            Err(e) => {
                log::warn!("No last known location from {}: {}", provider, e);
                None
            }
        }
    }

    fn subscribe(
        &self,
        provider: Provider,
        interval_ms: u64,
        events: SessionEvents,
    ) -> Result<(), LocationError> {
        let id = events.session_id().0;
        let channel = Channel::new(move |body| {
            if let InvokeResponseBody::Json(payload) = body {
                match serde_json::from_str::<SourceEvent>(&payload) {
                    Ok(event) => events.dispatch(event),
                    Err(e) => log::warn!("Undecodable location callback: {}", e),
                }
            }
            Ok(())
        });

        let _: EmptyResponse = self
            .handle
            .run_mobile_plugin(
                "requestLocationUpdates",
                SubscribeArgs {
                    id,
                    provider: provider.as_str(),
                    interval: interval_ms,
                    channel,
                },
            )
            .map_err(|e| {
                LocationError::Source(format!(
                    "Failed to request updates from {}: {}",
                    provider, e
                ))
            })?;

        Ok(())
    }

    fn unsubscribe(&self, events: &SessionEvents) {
        let result: Result<EmptyResponse, _> = self.handle.run_mobile_plugin(
            "removeUpdates",
            UnsubscribeArgs {
                id: events.session_id().0,
            },
        );
        if let Err(e) = result {
            log::warn!("Failed to remove updates of session {}: {}", events.session_id(), e);
        }
    }
}
