use nback::scoring::ScoreRecord;

/// A level needs this many sessions before its trend is charted
pub const MIN_SESSIONS_FOR_CHART: usize = 3;

/// Scores as chart points: x is the 1-based session number, y the percentage
pub fn score_points(scores: &[ScoreRecord]) -> Vec<(f64, f64)> {
    scores
        .iter()
        .enumerate()
        .map(|(i, s)| ((i + 1) as f64, s.percent() as f64))
        .collect()
}

/// Compute X (sessions) and Y (percent) bounds for the history chart
pub fn compute_chart_params(series: &[&[(f64, f64)]]) -> (f64, f64) {
    let mut last_session = 0.0;
    for points in series {
        if let Some(&(x, _)) = points.last() {
            if x > last_session {
                last_session = x;
            }
        }
    }
    if last_session < 2.0 {
        last_session = 2.0;
    }

    (last_session, 100.0)
}

/// Format a simple numeric label consistently
pub fn format_label(val: f64) -> String {
    if (val - val.round()).abs() < f64::EPSILON {
        format!("{}", val.round())
    } else {
        format!("{val:.2}")
    }
}
