pub mod linescore;
