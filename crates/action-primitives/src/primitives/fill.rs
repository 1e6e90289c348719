//! Fill primitive - clear an input and write a value

use crate::errors::ActionError;
use cdp_adapter::{ElementHandle, Page};
use tracing::debug;

/// Clear existing content and write `value`.
///
/// The value is never logged; fill targets include password fields.
pub async fn execute_fill(
    page: &dyn Page,
    handle: &ElementHandle,
    value: &str,
) -> Result<(), ActionError> {
    debug!(node = %handle.node, chars = value.chars().count(), "Executing fill primitive");
    page.fill(handle, value).await?;
    Ok(())
}
