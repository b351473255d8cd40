pub mod command_reader;
pub mod state_writer;
