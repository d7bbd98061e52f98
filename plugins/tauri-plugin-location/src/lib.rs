//! Tauri plugin for device location
//!
//! Web views call `start_location` / `stop_location` and receive
//! `location:message` events whose `action` is `onLocationChanged` or
//! `onStatusChanged`. Each web view has at most one session; starting again
//! replaces it. On Android the fixes come from the platform location manager
//! through the Kotlin side of this plugin. Other platforms have no location
//! service, so sessions end at once with status `disabled`.

use location_bridge::config::{self, CONFIG_FILE_NAME};
use location_bridge::location::{LocationSource, SessionEnv, SessionSnapshot, Sink};
use location_bridge::logging::{self, ForwardAppender};
use location_bridge::{LocationPlugin, PluginConfig, StartLocationArgs};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tauri::{
    plugin::{Builder, TauriPlugin},
    AppHandle, Emitter, Manager, RunEvent, Runtime, Webview, WindowEvent,
};

#[cfg(not(target_os = "android"))]
mod desktop;
#[cfg(target_os = "android")]
mod mobile;
mod webview;

pub use webview::{WebviewSink, MESSAGE_EVENT};

/// Event carrying forwarded location logs
pub const LOG_EVENT: &str = "location:log";

/// Plugin state: the sessions, and one sink per web view label
///
/// Sessions only hold weak references to sinks, so dropping a sink here when
/// its window is destroyed is enough to end that window's session.
struct LocationState<R: Runtime> {
    plugin: LocationPlugin,
    sinks: Mutex<HashMap<String, Arc<WebviewSink<R>>>>,
}

impl<R: Runtime> LocationState<R> {
    fn sink_for(&self, app: &AppHandle<R>, label: &str) -> Weak<dyn Sink> {
        let mut sinks = self.sinks.lock().unwrap_or_else(PoisonError::into_inner);
        let sink: Arc<dyn Sink> = sinks
            .entry(label.to_string())
            .or_insert_with(|| Arc::new(WebviewSink::new(app.clone(), label)))
            .clone();
        Arc::downgrade(&sink)
    }

    fn forget(&self, label: &str) {
        let removed = self
            .sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(label);
        if removed.is_some() {
            // The session would stop on its next emission; stop it now instead
            self.plugin.stop_location(label);
        }
    }
}

/// Start a location session for the calling web view
/// Missing options take the plugin defaults
#[tauri::command]
async fn start_location<R: Runtime>(
    app: AppHandle<R>,
    webview: Webview<R>,
    options: Option<StartLocationArgs>,
) -> Result<(), String> {
    let state = app
        .try_state::<LocationState<R>>()
        .ok_or("Location plugin not initialized")?;

    let options = options.unwrap_or_default();
    options.validate().map_err(|e| e.to_string())?;

    let label = webview.label().to_string();
    let sink = state.sink_for(&app, &label);
    let session = state.plugin.start_location(&label, &options, sink);
    log::debug!(
        "start_location from {} -> session {} ({:?})",
        label,
        session.id(),
        session.status()
    );

    Ok(())
}

/// Stop the calling web view's location session
#[tauri::command]
async fn stop_location<R: Runtime>(app: AppHandle<R>, webview: Webview<R>) -> Result<(), String> {
    let state = app
        .try_state::<LocationState<R>>()
        .ok_or("Location plugin not initialized")?;

    state.plugin.stop_location(webview.label());
    Ok(())
}

/// Get the calling web view's session, if one is still listening
#[tauri::command]
async fn get_location_status<R: Runtime>(
    app: AppHandle<R>,
    webview: Webview<R>,
) -> Result<Option<SessionSnapshot>, String> {
    let state = app
        .try_state::<LocationState<R>>()
        .ok_or("Location plugin not initialized")?;

    Ok(state.plugin.snapshot(webview.label()))
}

/// Load the plugin config from the app config dir, falling back to the user config dir
fn load_config<R: Runtime>(app: &AppHandle<R>) -> PluginConfig {
    let config_path = app
        .path()
        .app_config_dir()
        .ok()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .or_else(config::default_config_path);
    config::load_or_default(config_path.as_deref())
}

/// Initialize logging for the app, forwarding location logs to web views as `location:log`
///
/// The level comes from the plugin config's `logLevel`. Call once from the
/// application's setup, before any session starts.
pub fn init_logging<R: Runtime>(app: &AppHandle<R>, log_dir: PathBuf) -> Result<(), String> {
    let config = load_config(app);
    let handle = app.clone();
    let forward = ForwardAppender::new(move |event| {
        let _ = handle.emit(LOG_EVENT, event);
    });

    logging::init_logger(log_dir, &config, Some(forward))
        .map(|_| ())
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}

/// Initialize the location plugin
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("location")
        .invoke_handler(tauri::generate_handler![
            start_location,
            stop_location,
            get_location_status
        ])
        .setup(|app, api| {
            let config = load_config(app);

            #[cfg(target_os = "android")]
            let source: Arc<dyn LocationSource> =
                Arc::new(mobile::AndroidLocationSource::register(api)?);

            #[cfg(not(target_os = "android"))]
            let source: Arc<dyn LocationSource> = {
                let _ = api;
                Arc::new(desktop::UnavailableSource)
            };

            let env = SessionEnv::new(tauri::async_runtime::handle().inner().clone());
            app.manage(LocationState::<R> {
                plugin: LocationPlugin::new(source, env, config),
                sinks: Mutex::new(HashMap::new()),
            });

            Ok(())
        })
        .on_event(|app, event| match event {
            RunEvent::WindowEvent {
                label,
                event: WindowEvent::Destroyed,
                ..
            } => {
                if let Some(state) = app.try_state::<LocationState<R>>() {
                    state.forget(label);
                }
            }
            RunEvent::Exit => {
                if let Some(state) = app.try_state::<LocationState<R>>() {
                    state.plugin.stop_all();
                }
            }
            _ => {}
        })
        .build()
}
