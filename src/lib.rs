use std::fs;
use std::path::PathBuf;

use tauri::{AppHandle, Manager};

pub mod credentials;
pub mod enhance;

use credentials::{CredentialStore, CredentialSummary};
use enhance::remote::DEFAULT_SERVICE_URL;
use enhance::{BatchCandidate, BatchOptions, BatchOutcome, RemoteUpscaleClient};

#[derive(Debug)]
struct AppState {
    db_path: PathBuf,
}

#[tauri::command]
fn list_batch_candidates(directory: PathBuf) -> Result<Vec<BatchCandidate>, String> {
    enhance::list_batch_candidates(&directory).map_err(|err| err.to_string())
}

#[tauri::command]
async fn run_enhance_batch(
    app: AppHandle,
    state: tauri::State<'_, AppState>,
    mut options: BatchOptions,
) -> Result<BatchOutcome, String> {
    // Fall back to the persisted credential when the caller did not supply one.
    let key_missing = options
        .api_key
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .is_empty();
    if key_missing {
        if let Some(provider) = options.mode.credential_provider() {
            let store = CredentialStore::new(state.db_path.clone());
            options.api_key = store.load(provider).map_err(|err| err.to_string())?;
        }
    }

    let service_url = options
        .service_url
        .clone()
        .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());

    let outcome = tauri::async_runtime::spawn_blocking(move || {
        let client = RemoteUpscaleClient::new(service_url);
        enhance::run_batch(Some(&app), &client, options)
    })
    .await
    .map_err(|err| err.to_string())?;

    outcome.map_err(|err| err.to_string())
}

#[tauri::command]
fn save_api_credential(
    state: tauri::State<AppState>,
    provider: String,
    api_key: String,
) -> Result<(), String> {
    CredentialStore::new(state.db_path.clone())
        .save(&provider, &api_key)
        .map_err(|err| err.to_string())
}

#[tauri::command]
fn load_api_credential(
    state: tauri::State<AppState>,
    provider: String,
) -> Result<Option<String>, String> {
    CredentialStore::new(state.db_path.clone())
        .load(&provider)
        .map_err(|err| err.to_string())
}

#[tauri::command]
fn list_api_credentials(state: tauri::State<AppState>) -> Result<Vec<CredentialSummary>, String> {
    CredentialStore::new(state.db_path.clone())
        .list_masked()
        .map_err(|err| err.to_string())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::default()
        .setup(|app| {
            let app_data_dir = app.path().app_data_dir()?;
            fs::create_dir_all(&app_data_dir)?;
            let db_path = credentials::default_db_path(&app_data_dir);
            app.manage(AppState { db_path });
            Ok(())
        })
        .plugin(tauri_plugin_opener::init())
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            list_batch_candidates,
            run_enhance_batch,
            save_api_credential,
            load_api_credential,
            list_api_credentials
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application")
}
