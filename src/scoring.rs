use serde::{Deserialize, Serialize};
use std::fmt;

/// Percentage of scoreable attempts answered correctly, always within 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreRecord(u8);

impl ScoreRecord {
    pub fn new(percent: u8) -> Self {
        Self(percent.min(100))
    }

    pub fn percent(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for ScoreRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Scores of both modalities for one completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionScore {
    pub n_back: usize,
    pub visual: ScoreRecord,
    pub audio: ScoreRecord,
}

/// Agreements between response and ground truth over `[n_back, len)`
pub fn count_matches(ground_truth: &[bool], response: &[bool], n_back: usize) -> usize {
    ground_truth
        .iter()
        .zip(response)
        .skip(n_back)
        .filter(|(truth, answer)| truth == answer)
        .count()
}

/// Percentage score, rounded up so partial credit goes to the player
pub fn score(
    ground_truth: &[bool],
    response: &[bool],
    n_back: usize,
    attempt_count: usize,
) -> ScoreRecord {
    if attempt_count == 0 {
        return ScoreRecord::new(0);
    }
    let matches = count_matches(ground_truth, response, n_back).min(attempt_count);
    let percent = (100 * matches).div_ceil(attempt_count);
    ScoreRecord::new(percent as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn truth_with_repeats(len: usize, repeats: &[usize]) -> Vec<bool> {
        (0..len).map(|i| repeats.contains(&i)).collect()
    }

    #[test]
    fn test_all_false_responses() {
        // 20 attempts at 2-back, three actual repeats: 17 of 20 correct rejections
        let truth = truth_with_repeats(22, &[4, 9, 15]);
        let response = vec![false; 22];
        assert_eq!(count_matches(&truth, &response, 2), 17);
        assert_eq!(score(&truth, &response, 2, 20).percent(), 85);
    }

    #[test]
    fn test_perfect_session() {
        let truth = truth_with_repeats(22, &[3, 7]);
        assert_eq!(score(&truth, &truth, 2, 20).percent(), 100);
    }

    #[test]
    fn test_lead_in_is_excluded() {
        let truth = vec![false; 22];
        let mut response = vec![false; 22];
        response[0] = true;
        response[1] = true;
        assert_eq!(score(&truth, &response, 2, 20).percent(), 100);
    }

    #[test]
    fn test_rounds_up() {
        // 1 of 3 correct is 33.3%, reported as 34
        let truth = vec![false, false, true, true, true];
        let response = vec![false, false, true, false, false];
        assert_eq!(score(&truth, &response, 2, 3).percent(), 34);
    }

    #[test]
    fn test_everything_wrong() {
        let truth = truth_with_repeats(22, &[2, 3]);
        let response: Vec<bool> = truth.iter().map(|t| !t).collect();
        assert_eq!(score(&truth, &response, 2, 20).percent(), 0);
    }

    #[test]
    fn test_score_bounds() {
        for attempts in 20..=40 {
            let len = attempts + 3;
            let truth = truth_with_repeats(len, &[5, 6, 20]);
            for flip in 0..len {
                let response: Vec<bool> = (0..len).map(|i| i < flip).collect();
                let s = score(&truth, &response, 3, attempts).percent();
                assert!(s <= 100);
            }
        }
    }

    #[test]
    fn test_zero_attempts() {
        assert_eq!(score(&[], &[], 2, 0).percent(), 0);
    }

    #[test]
    fn test_score_record_clamps() {
        assert_eq!(ScoreRecord::new(150).percent(), 100);
        assert_eq!(ScoreRecord::new(42).to_string(), "42%");
    }
}
