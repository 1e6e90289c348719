//! Action primitives implementation
//!
//! Four actions built from the page's input primitives:
//! 1. fill - clear and write a value
//! 2. click - primary activation
//! 3. select_and_confirm - activate, type, Enter
//! 4. replace_and_confirm - activate, select all, type, Enter

mod click;
mod fill;
mod select;

pub use click::*;
pub use fill::*;
pub use select::*;

use cdp_adapter::{ElementHandle, Page};

use crate::{errors::ActionError, types::StepAction};

/// Dispatch `action` against an already resolved element.
pub async fn apply_action(
    page: &dyn Page,
    handle: &ElementHandle,
    action: &StepAction,
) -> Result<(), ActionError> {
    match action {
        StepAction::Fill(value) => execute_fill(page, handle, value).await,
        StepAction::Click => execute_click(page, handle).await,
        StepAction::SelectAndConfirm(value) => execute_select_and_confirm(page, handle, value).await,
        StepAction::ReplaceAndConfirm(value) => {
            execute_replace_and_confirm(page, handle, value).await
        }
    }
}
