pub mod assembler;
pub mod choice;
pub mod markov;
pub mod pipeline;
pub mod token;
