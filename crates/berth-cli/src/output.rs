//! Formatted output helpers for CLI commands.

use std::fmt::Write;

use berth_compose::model::DockerEnvironment;
use berth_compose::strategy::StartupOrder;

/// Renders launch batches with the image of each container.
#[must_use]
pub fn format_plan(order: &StartupOrder, environment: &DockerEnvironment) -> String {
    let mut out = String::new();
    for (weight, batch) in order.batches().into_iter().enumerate() {
        let _ = writeln!(out, "  weight {weight}:");
        for name in batch {
            let image = environment
                .containers
                .get(name)
                .and_then(|c| c.image.as_deref())
                .unwrap_or("<build>");
            let _ = writeln!(out, "    + {name:<20} {image}");
        }
    }
    out
}
