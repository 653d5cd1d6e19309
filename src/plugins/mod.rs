//! Built-in plugins.

pub mod auth;
pub mod datetime;
pub mod logger;
pub mod seen;

use crate::error::RegistryError;
use crate::registry::Registry;

/// Startup registration table. Runs before the connection handles any line.
pub fn register_all(registry: &mut Registry) -> Result<(), RegistryError> {
    test::register(registry)?;
    seen::register(registry)?;
    logger::register(registry)?;
    auth::register(registry)?;
    datetime::register(registry)?;
    Ok(())
}
