/// Unweighted mean of the first `lane_count` cells
///
/// Cells past `lane_count` are padding and never read.
pub fn lane_mean(cells: &[f32], lane_count: usize) -> f32 {
    let lanes = &cells[..lane_count];
    if lanes.is_empty() {
        return 0.0;
    }
    let sum: f64 = lanes.iter().map(|&c| c as f64).sum();
    (sum / lanes.len() as f64) as f32
}
