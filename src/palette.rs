//! Stable colors for surface categories.
//!
//! The same label gets the same color on every load. Within one mesh, labels that hash onto an
//! already used slot move to the next free one so neighbouring groups stay distinguishable.

/// Linear RGB, 0..1.
pub type Rgb = [f32; 3];

const PALETTE: [Rgb; 12] = [
    [0.29, 0.56, 0.89], // blue
    [0.95, 0.61, 0.07], // orange
    [0.36, 0.72, 0.36], // green
    [0.85, 0.33, 0.31], // red
    [0.61, 0.45, 0.80], // violet
    [0.26, 0.74, 0.75], // teal
    [0.93, 0.80, 0.25], // yellow
    [0.80, 0.47, 0.65], // pink
    [0.55, 0.55, 0.55], // grey
    [0.62, 0.42, 0.27], // brown
    [0.58, 0.80, 0.93], // light blue
    [0.70, 0.87, 0.48], // lime
];

/// Labels the CAD pipeline emits most often get fixed slots.
fn well_known_slot(label: &str) -> Option<usize> {
    let slot = match label.to_ascii_lowercase().as_str() {
        "planar" | "plane" => 0,
        "cylindrical" | "cylinder" => 1,
        "conical" | "cone" => 2,
        "spherical" | "sphere" => 3,
        "toroidal" | "torus" => 4,
        "bspline" | "b-spline" | "bezier" => 5,
        "revolution" => 6,
        "extrusion" => 7,
        "default" | "other" => 8,
        _ => return None,
    };
    Some(slot)
}

fn fnv1a(label: &str) -> u64 {
    label.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

/// Preferred palette slot for a label, before collision handling.
pub fn slot_for(label: &str) -> usize {
    well_known_slot(label).unwrap_or_else(|| (fnv1a(label) % PALETTE.len() as u64) as usize)
}

/// Colors for a set of distinct labels, in the order given.
pub fn assign(labels: &[String]) -> Vec<Rgb> {
    let mut used = [false; PALETTE.len()];
    let mut taken = 0;
    labels
        .iter()
        .map(|label| {
            let mut slot = slot_for(label);
            if taken < PALETTE.len() {
                while used[slot] {
                    slot = (slot + 1) % PALETTE.len();
                }
                used[slot] = true;
                taken += 1;
            }
            PALETTE[slot]
        })
        .collect()
}
