//! Process-wide file-import lock.
//!
//! The device accepts only one file import at a time, across every
//! session. All import uploads in this process serialize on one lock
//! (a single category, "import file"); contention here is unavoidable
//! and accepted. The guard is held across the await points of the
//! upload sequence and released on every exit path, including errors,
//! when it drops.

use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

static IMPORT_FILE_LOCK: Mutex<()> = Mutex::const_new(());

/// Acquires the "import file" lock, waiting for any in-flight import.
pub async fn acquire_import_lock() -> MutexGuard<'static, ()> {
    debug!("waiting for import file lock");
    let guard = IMPORT_FILE_LOCK.lock().await;
    debug!("import file lock acquired");
    guard
}
