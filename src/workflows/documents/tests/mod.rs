mod common;
mod gate;
mod matching;
