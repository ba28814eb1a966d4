//! Inbound commands to the application service.
//!
//! These represent actions requested by the outside world (buttons,
//! backend) that the [`AppService`](super::service::AppService)
//! interprets and acts upon.  Scheduled feeds are raised internally.

use crate::feeding::Origin;

/// Commands that adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Button 2, or any other caller wanting a portion now.
    Dispense(Origin),

    /// Button 1.
    ToggleRefillMode,

    /// Enable or disable the daily time-table.
    SetAutoFeeding(bool),

    /// Broker link came up or went down.
    SetBackendConnected(bool),
}

impl AppCommand {
    /// Raised by a front-panel button (gets the acknowledgement pulse).
    pub fn is_button(&self) -> bool {
        matches!(self, Self::ToggleRefillMode | Self::Dispense(Origin::Manual))
    }
}
