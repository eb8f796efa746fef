mod ask;
mod config;
mod reset;
mod serve;
mod session;
mod status;
mod upload;

pub use ask::AskArgs;
pub use config::ConfigCommand;
pub use reset::ResetArgs;
pub use serve::ServeArgs;
pub use session::SessionArgs;
pub use upload::UploadArgs;

pub use ask::handle_ask;
pub use config::handle_config;
pub use reset::handle_reset;
pub use serve::handle_serve;
pub use session::handle_session;
pub use status::handle_status;
pub use upload::handle_upload;

use crate::models::Config;

/// Read the most recently used session id, written after each upload.
pub(crate) fn load_last_session() -> Option<String> {
    let path = Config::last_session_path()?;
    let id = std::fs::read_to_string(path).ok()?;
    let id = id.trim().to_string();
    if id.is_empty() { None } else { Some(id) }
}

pub(crate) fn save_last_session(id: &str) {
    if let Some(path) = Config::last_session_path() {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(path, id);
    }
}
