use anyhow::Result;
use log::{debug, error};
use std::time::Instant;

/// Runs `f`, logging how long it took. Failures are logged with their full
/// context chain and handed back to the caller untouched.
pub fn logged<T, F>(operation: &str, f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let start = Instant::now();
    match f() {
        Ok(value) => {
            debug!("{} finished in {:.2?}", operation, start.elapsed());
            Ok(value)
        }
        Err(e) => {
            error!(
                "Raised in {}: {:#}\n------------------------------------------------",
                operation, e
            );
            Err(e)
        }
    }
}
