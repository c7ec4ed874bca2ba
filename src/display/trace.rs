use crate::compute::Snapshot;
use crate::graph::{Direction, Transform};
use crate::store::UnitId;
use std::fmt::Write;

/// Renders the chosen conversion path between two units, hop by hop.
pub fn format_trace(snapshot: &Snapshot, source: UnitId, destination: UnitId) -> String {
    let mut output = String::new();
    let name = |id: UnitId| {
        snapshot
            .graph()
            .node_of(id)
            .map(|node| snapshot.graph().unit(node).name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    };

    let _ = writeln!(output, "CONVERSION TRACE '{}' -> '{}':", name(source), name(destination));
    let _ = writeln!(output, "--------------------------------------------------");

    let steps = match snapshot.path(source, destination) {
        Ok(steps) => steps,
        Err(e) => {
            let _ = writeln!(output, "Error: {}", e);
            return output;
        }
    };

    if steps.is_empty() {
        let _ = writeln!(output, "(same unit, identity)");
    }

    for (i, step) in steps.iter().enumerate() {
        let how = match step.direction {
            Direction::Forward => format!("x{} + {}", fmt_num(step.recorded.slope), fmt_num(step.recorded.intercept)),
            Direction::Inverse => format!(
                "(x - {}) / {}  [inverse]",
                fmt_num(step.recorded.intercept),
                fmt_num(step.recorded.slope)
            ),
        };
        let _ = writeln!(output, "[{}] {} -> {} : {}", i + 1, name(step.from), name(step.to), how);
    }

    let _ = writeln!(output, "--------------------------------------------------");
    let total = snapshot.transform(source, destination).unwrap_or(Transform::IDENTITY);
    let _ = writeln!(output, "= x{} + {}", fmt_num(total.slope), fmt_num(total.intercept));
    output
}

fn fmt_num(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 { format!("{}", v) } else { format!("{:.6}", v) }
}
