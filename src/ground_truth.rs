/// Marks every index whose stimulus equals the one `n_back` positions earlier.
///
/// The first `n_back` entries have nothing to compare against and are always false.
pub fn compute_ground_truth<T: PartialEq>(sequence: &[T], n_back: usize) -> Vec<bool> {
    (0..sequence.len())
        .map(|i| i >= n_back && sequence[i] == sequence[i - n_back])
        .collect()
}

/// Number of actual repeats inside the scoreable range
pub fn count_repeats(ground_truth: &[bool]) -> usize {
    ground_truth.iter().filter(|&&t| t).count()
}
