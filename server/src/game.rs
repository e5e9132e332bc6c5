use log::debug;
use rand::seq::SliceRandom;
use rand::Rng;
use shared::{Question, Traversal, Tree, GAME_DURATION_SECS, GLOBAL_LEADERBOARD_SIZE};
use std::time::Duration;

/// Tuning knobs for a game. `Default` gives the standard five question round.
#[derive(Debug, Clone)]
pub struct GameSettings {
    pub normal_questions: usize,
    pub normal_depth: u32,
    pub difficult_questions: usize,
    pub difficult_depth: u32,
    pub duration: Duration,
    pub global_leaderboard_size: usize,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            normal_questions: 4,
            normal_depth: 2,
            difficult_questions: 1,
            difficult_depth: 5,
            duration: Duration::from_secs(GAME_DURATION_SECS),
            global_leaderboard_size: GLOBAL_LEADERBOARD_SIZE,
        }
    }
}

/// The questions of one game, shared by every player in the lobby.
#[derive(Debug, Clone, Default)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Normal questions first, then the difficult ones.
    pub fn generate<R: Rng + ?Sized>(settings: &GameSettings, rng: &mut R) -> Self {
        let depths = std::iter::repeat(settings.normal_depth)
            .take(settings.normal_questions)
            .chain(std::iter::repeat(settings.difficult_depth).take(settings.difficult_questions));

        let questions = depths
            .enumerate()
            .map(|(id, depth)| generate_question(id, depth, rng))
            .collect();

        Self { questions }
    }

    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

fn generate_question<R: Rng + ?Sized>(id: usize, max_depth: u32, rng: &mut R) -> Question {
    let traversal = *Traversal::ALL
        .choose(rng)
        .unwrap_or(&Traversal::PreorderDfs);
    let tree = Tree::generate(max_depth, || rng.gen::<f64>());
    let solution = traversal.solve(&tree);

    debug!(
        "Question {}: {} over {} nodes",
        id,
        traversal.title(),
        tree.node_count()
    );

    Question {
        id,
        title: traversal.title().to_string(),
        tree,
        solution,
    }
}
