pub mod lexicon;
pub mod processor;

pub use lexicon::{AddressTerm, EventVerb, Lexicons, StateDelta};
pub use processor::{Dialogue, ProcessedChapter, TextProcessor};
