//! Race text generation.
//!
//! Each difficulty tier has a fixed vocabulary. A race text is `n` words
//! drawn uniformly and independently from that vocabulary (so repeats are
//! normal), joined by single spaces.

use keyrace_protocol::Difficulty;
use rand::Rng;

// ---------------------------------------------------------------------------
// Vocabularies
// ---------------------------------------------------------------------------

const BEGINNER: &[&str] = &[
    "a", "an", "and", "as", "at", "be", "by", "can", "cat", "day", "do", "dog", "for", "fun",
    "get", "go", "he", "her", "him", "his", "if", "in", "is", "it", "me", "my", "no", "not",
    "of", "on", "or", "run", "see", "she", "so", "sun", "the", "to", "up", "us", "we", "yes",
];

const EASY: &[&str] = &[
    "about", "after", "again", "also", "back", "because", "come", "could", "every", "find",
    "first", "from", "give", "good", "great", "have", "here", "home", "just", "know", "like",
    "little", "long", "look", "make", "many", "more", "most", "much", "never", "only", "other",
    "over", "people", "place", "right", "same", "small", "some", "still", "take", "than",
    "that", "their", "there", "thing", "think", "time", "water", "where", "which", "world",
    "would", "year",
];

const MEDIUM: &[&str] = &[
    "ability", "account", "address", "against", "already", "another", "answer", "balance",
    "between", "brought", "capture", "certain", "chapter", "company", "control", "country",
    "current", "develop", "example", "explain", "feature", "general", "history", "imagine",
    "journey", "kitchen", "library", "machine", "measure", "message", "morning", "natural",
    "network", "nothing", "picture", "present", "problem", "process", "quality", "quickly",
    "reading", "because", "science", "several", "special", "student", "through", "thought",
    "usually", "weather", "welcome", "whether", "without", "writing",
];

const HARD: &[&str] = &[
    "abandonment", "acknowledge", "acquisition", "administer", "ambiguous", "approximate",
    "articulate", "bureaucracy", "circumstance", "collaborate", "conscience", "consequence",
    "deliberate", "demonstrate", "discrepancy", "distinguish", "efficiency", "embarrass",
    "environment", "exaggerate", "hierarchy", "hypothesis", "independent", "infrastructure",
    "intermediate", "jurisdiction", "legitimate", "maintenance", "manufacture", "mischievous",
    "negotiation", "occasionally", "parliament", "perseverance", "phenomenon", "questionnaire",
    "recommend", "rhythm", "significant", "sophisticated", "successful", "surveillance",
    "threshold", "vulnerable",
];

const EXPERT: &[&str] = &[
    "acquiescence", "anachronistic", "antidisestablishment", "bourgeoisie", "chrysanthemum",
    "conscientious", "counterintuitive", "idiosyncratic", "incomprehensible", "indefatigable",
    "juxtaposition", "kaleidoscope", "labyrinthine", "magnanimous", "mellifluous",
    "onomatopoeia", "ostentatious", "paraphernalia", "perspicacious", "pharmaceutical",
    "phosphorescence", "psychotherapy", "quintessential", "reconnaissance", "rhododendron",
    "sesquipedalian", "surreptitious", "synchronization", "thermodynamics", "ubiquitous",
    "unprecedented", "verisimilitude", "xylophonist", "zealousness",
];

/// The fixed word list for a tier.
pub fn vocabulary(difficulty: Difficulty) -> &'static [&'static str] {
    match difficulty {
        Difficulty::Beginner => BEGINNER,
        Difficulty::Easy => EASY,
        Difficulty::Medium => MEDIUM,
        Difficulty::Hard => HARD,
        Difficulty::Expert => EXPERT,
    }
}

// ---------------------------------------------------------------------------
// RaceTextGenerator
// ---------------------------------------------------------------------------

/// Builds race texts from a random source.
///
/// Generic over the RNG so tests can pass a seeded `StdRng`; the default
/// uses the thread-local generator.
#[derive(Debug, Clone, Default)]
pub struct RaceTextGenerator<R = ThreadLocal> {
    rng: R,
}

/// Marker for "use `rand::rng()` on each call".
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadLocal;

impl RaceTextGenerator {
    pub fn new() -> Self {
        Self { rng: ThreadLocal }
    }

    pub fn generate(&mut self, difficulty: Difficulty, word_count: usize) -> String {
        words_from(&mut rand::rng(), difficulty, word_count)
    }

    /// Like [`generate`](Self::generate) but takes a tier name; unknown
    /// names fall back to medium.
    pub fn generate_named(&mut self, difficulty: &str, word_count: usize) -> String {
        self.generate(Difficulty::parse_lenient(difficulty), word_count)
    }
}

impl<R: Rng> RaceTextGenerator<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate_with_rng(&mut self, difficulty: Difficulty, word_count: usize) -> String {
        words_from(&mut self.rng, difficulty, word_count)
    }
}

fn words_from<R: Rng + ?Sized>(rng: &mut R, difficulty: Difficulty, word_count: usize) -> String {
    let vocabulary = vocabulary(difficulty);
    let mut text = String::with_capacity(word_count * 8);
    for i in 0..word_count {
        if i > 0 {
            text.push(' ');
        }
        text.push_str(vocabulary[rng.random_range(0..vocabulary.len())]);
    }
    text
}
