//! Select primitives - keyed selection in combo boxes and paging inputs
//!
//! The portal's combo boxes filter their option list as the user types and
//! commit the highlighted option on Enter, so selection is expressed as
//! keyboard input rather than picking an `<option>`.

use crate::errors::ActionError;
use cdp_adapter::{ElementHandle, Key, Page};
use tracing::debug;

/// Activate the control, type `value`, confirm with Enter.
pub async fn execute_select_and_confirm(
    page: &dyn Page,
    handle: &ElementHandle,
    value: &str,
) -> Result<(), ActionError> {
    debug!(node = %handle.node, value = %value, "Executing select-and-confirm primitive");
    page.click(handle).await?;
    page.keyboard_type(value).await?;
    page.keyboard_press(Key::Enter).await?;
    Ok(())
}

/// Activate the control, select its content, overwrite with `value`, confirm.
pub async fn execute_replace_and_confirm(
    page: &dyn Page,
    handle: &ElementHandle,
    value: &str,
) -> Result<(), ActionError> {
    debug!(node = %handle.node, value = %value, "Executing replace-and-confirm primitive");
    page.click(handle).await?;
    page.keyboard_press(Key::SelectAll).await?;
    page.keyboard_type(value).await?;
    page.keyboard_press(Key::Enter).await?;
    Ok(())
}
