// src/engine/randomizer.rs

use rand::Rng;

/// Returns the questions in a uniformly random order (Fisher-Yates).
///
/// Called once per session; the resulting order is what every question
/// index of that session refers to.
pub fn shuffle_questions<T, R: Rng + ?Sized>(mut questions: Vec<T>, rng: &mut R) -> Vec<T> {
    for i in (1..questions.len()).rev() {
        let j = rng.gen_range(0..=i);
        questions.swap(i, j);
    }
    questions
}
