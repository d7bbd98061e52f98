const COMMANDS: &[&str] = &["start_location", "stop_location", "get_location_status"];

fn main() {
    tauri_plugin::Builder::new(COMMANDS)
        .android_path("android")
        .build();
}
