//! Click primitive - primary activation of an element

use crate::errors::ActionError;
use cdp_adapter::{ElementHandle, Page};
use tracing::debug;

pub async fn execute_click(page: &dyn Page, handle: &ElementHandle) -> Result<(), ActionError> {
    debug!(node = %handle.node, "Executing click primitive");
    page.click(handle).await?;
    Ok(())
}
