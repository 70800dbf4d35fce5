pub use input::{InputEntry, InputList};
pub use matching::ConfigMatching;

mod input;
mod matching;
