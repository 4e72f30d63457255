use serde::Serialize;

/// One step of the score-over-time chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScorePoint {
    pub t: f64,
    pub score: u32,
}

impl ScorePoint {
    pub fn new(t: f64, score: u32) -> Self {
        Self { t, score }
    }
}

impl From<(f64, u32)> for ScorePoint {
    fn from(v: (f64, u32)) -> Self {
        ScorePoint {
            t: v.0,
            score: v.1,
        }
    }
}

/// Step series: starts at `(0, 0)`, one point per hit, and is closed at
/// `(duration_s, final_score)` when the last hit came before the end.
pub fn score_steps(
    hits: impl IntoIterator<Item = (f64, u32)>,
    duration_s: f64,
    final_score: u32,
) -> Vec<ScorePoint> {
    let mut points = vec![ScorePoint::new(0.0, 0)];
    points.extend(hits.into_iter().map(ScorePoint::from));
    if points.last().is_some_and(|p| p.t < duration_s) {
        points.push(ScorePoint::new(duration_s, final_score));
    }
    points
}
