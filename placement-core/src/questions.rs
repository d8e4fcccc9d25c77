//! Grammar & vocabulary question bank for the multiple-choice section.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Questions shown per test.
pub const DEFAULT_DRAW: usize = 5;

/// One multiple-choice item; `correct` indexes into `options`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Question {
    pub question: &'static str,
    pub options: [&'static str; 4],
    pub correct: usize,
}

const fn q(question: &'static str, options: [&'static str; 4], correct: usize) -> Question {
    Question {
        question,
        options,
        correct,
    }
}

/// Ordered roughly from basic to advanced.
pub static QUESTION_BANK: [Question; 50] = [
    q("He _____ to the market yesterday.", ["go", "goes", "went", "gone"], 2),
    q("The book is _____ the table.", ["on", "in", "at", "with"], 0),
    q("She _____ a student of English.", ["are", "am", "is", "be"], 2),
    q("_____ many people at the party last night?", ["Was there", "Were there", "Is there", "Are there"], 1),
    q("I don't have _____ money with me.", ["some", "any", "no", "many"], 1),
    q("We _____ to the cinema last night.", ["go", "are going", "went", "have gone"], 2),
    q("What time _____ the train leave?", ["do", "is", "does", "are"], 2),
    q("He lives _____ Amritsar.", ["at", "on", "in", "by"], 2),
    q("She speaks English very _____.", ["good", "well", "best", "better"], 1),
    q("My birthday is _____ September.", ["on", "at", "in", "with"], 2),
    q("She is the _____ girl in the class.", ["tall", "taller", "tallest", "more tall"], 2),
    q("I have never _____ to Mumbai before.", ["be", "was", "been", "being"], 2),
    q("If you study hard, you _____ pass the exam.", ["will", "would", "were", "could"], 0),
    q("The opposite of 'expensive' is _____.", ["cheap", "small", "beautiful", "far"], 0),
    q("He is interested _____ learning French.", ["in", "on", "at", "for"], 0),
    q("My keys are not on the table, so I must have _____ them at work.", ["leave", "left", "leaving", "leaves"], 1),
    q("What _____ you do if you won the lottery?", ["will", "would", "are", "do"], 1),
    q("A person who writes books is called an _____.", ["author", "artist", "actor", "athlete"], 0),
    q("She has been waiting for the bus _____ two hours.", ["since", "for", "at", "from"], 1),
    q("The train was late _____ the bad weather.", ["because of", "so", "but", "although"], 0),
    q("I prefer tea _____ coffee.", ["than", "from", "to", "over"], 2),
    q("This is the _____ movie I have ever seen.", ["good", "better", "best", "most good"], 2),
    q("I haven't seen him _____ last year.", ["for", "since", "from", "at"], 1),
    q("You _____ see a doctor if you feel unwell.", ["should", "can", "are", "have"], 0),
    q("The word 'brave' is a synonym for _____.", ["scared", "courageous", "clever", "calm"], 1),
    q("Can you tell me where _____?", ["is the library", "the library is", "is library", "the library"], 1),
    q("Neither my brother _____ my sister likes spinach.", ["or", "and", "but", "nor"], 3),
    q("By this time tomorrow, I _____ my exams.", ["will finish", "will be finishing", "will have finished", "finish"], 2),
    q("The meeting was _____ due to the manager's illness.", ["put on", "put up", "put off", "put in"], 2),
    q("He _____ live in London before he moved to Amritsar.", ["used to", "is used to", "was using to", "use to"], 0),
    q("Despite _____ hard, he failed the test.", ["studying", "he studied", "to study", "was studying"], 0),
    q("The problem was _____ difficult for anyone to solve.", ["so", "such", "very", "too"], 3),
    q("I wish I _____ more time to travel.", ["have", "had", "will have", "am having"], 1),
    q("Not only _____ sing, but she also plays the piano.", ["she can", "can she", "she does", "does she"], 1),
    q("The word 'ubiquitous' means _____.", ["rare", "powerful", "present everywhere", "expensive"], 2),
    q("Had I known you were coming, I _____ a cake.", ["would bake", "would have baked", "will bake", "baked"], 1),
    q("He was accused _____ stealing the money.", ["for", "with", "of", "to"], 2),
    q("The government has implemented _____ new policies.", ["a number of", "the number of", "a number", "the number"], 0),
    q("This gadget is far _____ to the older model.", ["more superior", "superior", "superior than", "most superior"], 1),
    q("She works as a teacher, _____ she?", ["is", "isn't", "does", "doesn't"], 3),
    q("Which of these is a 'phrasal verb'?", ["look after", "beautiful", "quickly", "on the table"], 0),
    q("The patient had _____ before the doctor arrived.", ["died", "die", "dead", "dying"], 0),
    q("I'm looking forward _____ you again soon.", ["to seeing", "to see", "seeing", "see"], 0),
    q("By the time we arrived, the movie _____.", ["already started", "had already started", "has already started", "is already starting"], 1),
    q("The _____ of the mountain was covered in snow.", ["peek", "peak", "pick", "peck"], 1),
    q("He couldn't _____ laughing at the joke.", ["help", "stop", "allow", "get"], 0),
    q("It's a secret, so you _____ tell anyone.", ["must", "mustn't", "have to", "don't have to"], 1),
    q("The city's infrastructure needs _____.", ["to improve", "improving", "improved", "an improvement"], 1),
    q("_____ being very rich, he is not happy.", ["Although", "Despite", "However", "In spite"], 1),
    q("This is the house _____ I was born.", ["which", "that", "where", "when"], 2),];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BankError {
    #[error("question {index} has correct answer {correct} outside its options")]
    CorrectOutOfRange { index: usize, correct: usize },
    #[error("question {index} has an empty prompt")]
    EmptyQuestion { index: usize },
}

/// Check every item in a bank is answerable.
pub fn validate(bank: &[Question]) -> Result<(), BankError> {
    for (index, item) in bank.iter().enumerate() {
        if item.question.trim().is_empty() {
            return Err(BankError::EmptyQuestion { index });
        }
        if item.correct >= item.options.len() {
            return Err(BankError::CorrectOutOfRange {
                index,
                correct: item.correct,
            });
        }
    }
    Ok(())
}

/// Draw up to `n` distinct questions from the bank, uniformly at random.
pub fn draw<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<Question> {
    QUESTION_BANK.choose_multiple(rng, n).copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn bank_is_valid() {
        assert_eq!(validate(&QUESTION_BANK), Ok(()));
    }

    #[test]
    fn validate_flags_bad_index() {
        let bank = [q("x _____ y", ["a", "b", "c", "d"], 4)];
        assert_eq!(
            validate(&bank),
            Err(BankError::CorrectOutOfRange {
                index: 0,
                correct: 4
            })
        );
    }

    #[test]
    fn draw_returns_distinct_questions() {
        let mut rng = StdRng::seed_from_u64(7);
        let picked = draw(DEFAULT_DRAW, &mut rng);
        assert_eq!(picked.len(), DEFAULT_DRAW);
        let unique: HashSet<_> = picked.iter().map(|q| q.question).collect();
        assert_eq!(unique.len(), DEFAULT_DRAW);
    }

    #[test]
    fn draw_caps_at_bank_size() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(draw(500, &mut rng).len(), QUESTION_BANK.len());
        assert!(draw(0, &mut rng).is_empty());
    }

    #[test]
    fn same_seed_same_draw() {
        let a = draw(5, &mut StdRng::seed_from_u64(42));
        let b = draw(5, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
