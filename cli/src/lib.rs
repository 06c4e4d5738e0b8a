pub mod board;

pub use board::LostFoundCli;
pub use board::run;
