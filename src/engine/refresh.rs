//! Illumination pushes after load and table swaps

use super::DispatchEngine;
use crate::color::{ColorValue, DeviceColorCommand};
use crate::config::MacroTable;
use crate::device::ControlId;
use std::collections::BTreeSet;
use tracing::{debug, warn};

impl DispatchEngine {
    /// Push the color of every control in `table`
    pub async fn refresh_all(&self, table: &MacroTable) {
        let ids: BTreeSet<ControlId> = table.control_ids().collect();
        self.push_colors(&ids, table).await;
    }

    /// Refresh every id known to either table; ids only in `previous` go dark
    pub(crate) async fn refresh_after_swap(&self, previous: &MacroTable, current: &MacroTable) {
        let ids: BTreeSet<ControlId> = previous.control_ids().chain(current.control_ids()).collect();
        self.push_colors(&ids, current).await;
    }

    async fn push_colors(&self, ids: &BTreeSet<ControlId>, table: &MacroTable) {
        let profile = self.surface.profile();
        let mut sent = 0usize;

        for &id in ids {
            let color = table.color_for(id).unwrap_or(ColorValue::BLACK);
            let command = profile.encode(id, color);
            if command == DeviceColorCommand::NoOp {
                continue;
            }
            // One dead LED must not block the rest of the refresh
            match self.surface.set_illumination(id, command).await {
                Ok(()) => sent += 1,
                Err(e) => warn!(control_id = id, "[LED] {:#}", e),
            }
        }

        debug!(
            "[LED] Refreshed {} of {} controls on '{}'",
            sent,
            ids.len(),
            self.surface.name()
        );
    }
}
