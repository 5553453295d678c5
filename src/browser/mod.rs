pub mod launcher;
pub mod profile;
pub mod session;

pub use launcher::{BrowserContext, BrowserLauncher, ChromiumLauncher, LaunchOptions, Viewport};
pub use profile::{clear_credentials, clear_lock_artifacts, ProfileDir, ProfileStore};
pub use session::{SessionLease, SessionManager};
